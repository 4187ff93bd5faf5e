// src/player/playback_starter.rs
use crate::player::progress_task::{spawn_progress_task, ProgressTaskSpec};
use crate::player::{ControllerError, PlaybackController, PLAYER_LOG_TARGET};
use crate::session::{ActivePlayback, SessionState, SharedSession};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Retires `current` into history and starts the next pending track.
///
/// A track the player refuses to start is reported and skipped; the loop
/// keeps going until something plays or the queue runs dry.
#[instrument(skip_all, fields(session = %state.key()))]
pub(super) async fn advance(ctl: &PlaybackController, session: &SharedSession, state: &mut SessionState) {
    state.cancel_progress_task();
    state.active = None;

    loop {
        let next = match state.promote_next().cloned() {
            Some(track) => track,
            None => {
                state.reset_timing();
                info!(target: PLAYER_LOG_TARGET, session = %state.key(), history = state.history().len(), "Queue exhausted, session idle.");
                ctl.reporter.report_queue_finished(state.key());
                return;
            }
        };

        match start_current(ctl, session, state).await {
            Ok(()) => return,
            Err(e) => {
                error!(target: PLAYER_LOG_TARGET, session = %state.key(), title = %next.title(), "Skipping track that failed to start: {}", e);
                ctl.reporter.report_track_failed(state.key(), next.title(), e.to_string());
            }
        }
    }
}

/// Starts external playback of `current` under a fresh generation and
/// (re)starts the progress reporter for it.
///
/// On failure the session is left with `current` set and nothing active;
/// the caller decides whether to advance past it.
#[instrument(skip_all, fields(session = %state.key()))]
pub(super) async fn start_current(
    ctl: &PlaybackController,
    session: &SharedSession,
    state: &mut SessionState,
) -> Result<(), ControllerError> {
    let key = state.key();
    let track = state
        .current
        .clone()
        .ok_or_else(|| ControllerError::invalid("Nothing to start"))?;

    state.cancel_progress_task();
    state.active = None;
    state.generation += 1;
    let generation = state.generation;

    debug!(target: PLAYER_LOG_TARGET, session = %key, generation, source = %track.source_ref(), "Requesting playback start.");
    let on_complete = ctl.completions.callback(key, generation);
    let handle = match ctl.player.start(track.source_ref(), on_complete).await {
        Ok(handle) => handle,
        Err(e) => {
            state.reset_timing();
            return Err(ControllerError::PlaybackStartFailed(format!("{}: {}", track.title(), e)));
        }
    };

    state.reset_for_new_track(Instant::now());
    state.active = Some(ActivePlayback { handle, generation });
    info!(target: PLAYER_LOG_TARGET, session = %key, generation, %handle, title = %track.title(), "Playback started.");

    if let Err(e) = ctl.player.set_volume(handle, state.volume).await {
        warn!(target: PLAYER_LOG_TARGET, session = %key, %handle, "Failed to apply session volume: {}", e);
    }

    ctl.reporter.report_now_playing(key, &track);

    let task = spawn_progress_task(ProgressTaskSpec {
        key,
        generation,
        handle,
        session: session.clone(),
        player: ctl.player.clone(),
        reporter: ctl.reporter.clone(),
        period: ctl.options.progress_interval,
    });
    state.install_progress_task(task);
    Ok(())
}
