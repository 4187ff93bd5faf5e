use super::playback_starter::{advance, start_current};
use super::{CommandOutcome, CompletionEvent, ControllerError, PlaybackController, QueueView, PLAYER_LOG_TARGET, QUEUE_VIEW_LIMIT};
use crate::session::{PlaybackState, SessionState, SharedSession, TrackDescriptor};
use rand::seq::SliceRandom;
use rand::thread_rng;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

#[instrument(skip_all, fields(session = %state.key(), count = tracks.len(), at_front = at_front))]
pub async fn handle_enqueue(
    ctl: &PlaybackController,
    session: &SharedSession,
    state: &mut SessionState,
    tracks: Vec<TrackDescriptor>,
    at_front: bool,
) -> Result<CommandOutcome, ControllerError> {
    let first = match tracks.first() {
        Some(track) => track.title().to_string(),
        None => return Err(ControllerError::invalid("No tracks to enqueue")),
    };
    let count = tracks.len();
    let position = if at_front { 1 } else { state.pending().len() + 1 };
    info!(target: PLAYER_LOG_TARGET, "Enqueueing {} track(s) at position {}.", count, position);
    state.enqueue(tracks, at_front);

    if state.playback_state() != PlaybackState::Idle {
        return Ok(CommandOutcome::Queued { title: first, count, position, started: false });
    }

    advance(ctl, session, state).await;
    match state.current() {
        Some(current) if state.active().is_some() => Ok(CommandOutcome::Queued {
            title: current.title().to_string(),
            count,
            position,
            started: true,
        }),
        _ => Err(ControllerError::PlaybackStartFailed(format!("no queued track could be started (first was {})", first))),
    }
}

/// Applies one completion. Completions whose generation no longer matches the
/// active playback are rejected without touching the session.
#[instrument(skip_all, fields(session = %event.key, generation = event.generation))]
pub async fn handle_track_completed(
    ctl: &PlaybackController,
    session: &SharedSession,
    state: &mut SessionState,
    event: CompletionEvent,
) -> Result<(), ControllerError> {
    let active_generation = state.active().map(|a| a.generation);
    if active_generation != Some(event.generation) {
        debug!(target: PLAYER_LOG_TARGET, active = ?active_generation, "Ignoring stale completion.");
        return Err(ControllerError::StaleCompletion { generation: event.generation });
    }

    state.cancel_progress_task();
    state.active = None;

    match &event.error {
        Some(e) => {
            warn!(target: PLAYER_LOG_TARGET, "Playback ended with error: {}", e);
            if let Some(track) = state.current() {
                let title = track.title().to_string();
                ctl.reporter.report_track_failed(event.key, &title, e.to_string());
            }
        }
        None if state.is_looping() => {
            // Replays without a history entry; the eventual non-looping completion records it once.
            if let Some(track) = state.current.take() {
                debug!(target: PLAYER_LOG_TARGET, title = %track.title(), "Looping current track.");
                state.pending.push_front(track);
            }
        }
        None => {}
    }

    advance(ctl, session, state).await;
    Ok(())
}

pub async fn handle_pause(ctl: &PlaybackController, state: &mut SessionState) -> Result<CommandOutcome, ControllerError> {
    let active = match (state.playback_state(), state.active()) {
        (PlaybackState::Playing, Some(active)) => active,
        _ => return Err(ControllerError::invalid("Nothing to pause")),
    };
    ctl.player.pause(active.handle).await?;
    state.on_pause(Instant::now());
    info!(target: PLAYER_LOG_TARGET, session = %state.key(), elapsed = ?state.elapsed(), "Paused.");
    Ok(CommandOutcome::Paused)
}

pub async fn handle_resume(ctl: &PlaybackController, state: &mut SessionState) -> Result<CommandOutcome, ControllerError> {
    let active = match (state.playback_state(), state.active()) {
        (PlaybackState::Paused, Some(active)) => active,
        _ => return Err(ControllerError::invalid("Nothing to resume")),
    };
    ctl.player.resume(active.handle).await?;
    state.on_resume(Instant::now());
    info!(target: PLAYER_LOG_TARGET, session = %state.key(), "Resumed.");
    Ok(CommandOutcome::Resumed)
}

pub async fn handle_play_pause_toggle(ctl: &PlaybackController, state: &mut SessionState) -> Result<CommandOutcome, ControllerError> {
    match state.playback_state() {
        PlaybackState::Playing => handle_pause(ctl, state).await,
        PlaybackState::Paused => handle_resume(ctl, state).await,
        _ => Err(ControllerError::invalid("Nothing playing")),
    }
}

/// Only asks the player to stop; the completion that follows does the advancing.
pub async fn handle_skip(ctl: &PlaybackController, state: &mut SessionState) -> Result<CommandOutcome, ControllerError> {
    let active = state.active().ok_or_else(|| ControllerError::invalid("Nothing to skip"))?;
    info!(target: PLAYER_LOG_TARGET, session = %state.key(), generation = active.generation, "Skip requested.");
    if let Err(e) = ctl.player.stop(active.handle).await {
        // The playback already ended; its completion is on the way.
        debug!(target: PLAYER_LOG_TARGET, session = %state.key(), "Stop during skip reported: {}", e);
    }
    Ok(CommandOutcome::SkipRequested)
}

#[instrument(skip_all, fields(session = %state.key()))]
pub async fn handle_previous(
    ctl: &PlaybackController,
    session: &SharedSession,
    state: &mut SessionState,
) -> Result<CommandOutcome, ControllerError> {
    if state.history().is_empty() {
        return Err(ControllerError::invalid("No history"));
    }

    let replaced = state.active.take();
    state.cancel_progress_task();
    let title = match state.step_back() {
        Some(track) => track.title().to_string(),
        None => return Err(ControllerError::invalid("No history")),
    };

    if let Some(old) = replaced {
        if let Err(e) = ctl.player.stop(old.handle).await {
            debug!(target: PLAYER_LOG_TARGET, handle = %old.handle, "Stopping replaced playback reported: {}", e);
        }
    }

    info!(target: PLAYER_LOG_TARGET, title = %title, "Going back to previous track.");
    match start_current(ctl, session, state).await {
        Ok(()) => Ok(CommandOutcome::Rewound { title }),
        Err(e) => {
            ctl.reporter.report_track_failed(state.key(), &title, e.to_string());
            advance(ctl, session, state).await;
            Err(e)
        }
    }
}

pub async fn handle_stop(ctl: &PlaybackController, state: &mut SessionState) -> Result<CommandOutcome, ControllerError> {
    let key = state.key();
    let stopped = state.active.take();
    let removed = state.clear();

    if let Some(old) = stopped {
        if let Err(e) = ctl.player.stop(old.handle).await {
            debug!(target: PLAYER_LOG_TARGET, session = %key, handle = %old.handle, "Stop reported: {}", e);
        }
    }
    info!(target: PLAYER_LOG_TARGET, session = %key, removed, "Stopped and cleared session.");
    ctl.reporter.report_stopped(key);
    Ok(CommandOutcome::Stopped { removed })
}

pub fn handle_shuffle(state: &mut SessionState) -> Result<CommandOutcome, ControllerError> {
    if state.pending().is_empty() {
        return Err(ControllerError::invalid("Queue is empty"));
    }
    state.pending.make_contiguous().shuffle(&mut thread_rng());
    let count = state.pending().len();
    info!(target: PLAYER_LOG_TARGET, session = %state.key(), count, "Shuffled queue.");
    Ok(CommandOutcome::Shuffled(count))
}

pub fn handle_clear_queue(state: &mut SessionState) -> Result<CommandOutcome, ControllerError> {
    let removed = state.pending().len();
    state.pending.clear();
    info!(target: PLAYER_LOG_TARGET, session = %state.key(), removed, "Cleared pending queue.");
    Ok(CommandOutcome::Cleared(removed))
}

pub fn handle_remove(state: &mut SessionState, position: usize) -> Result<CommandOutcome, ControllerError> {
    let len = state.pending().len();
    if position == 0 || position > len {
        return Err(ControllerError::InvalidOperation(format!("Invalid position! Queue has {} songs", len)));
    }
    let removed = state
        .pending
        .remove(position - 1)
        .ok_or_else(|| ControllerError::invalid("Queue changed while removing"))?;
    info!(target: PLAYER_LOG_TARGET, session = %state.key(), position, title = %removed.title(), "Removed pending track.");
    Ok(CommandOutcome::Removed { title: removed.title().to_string() })
}

pub fn session_stats(state: &SessionState) -> CommandOutcome {
    let pending = state.pending();
    CommandOutcome::Stats {
        pending: pending.len(),
        total_pending_seconds: pending.iter().map(|t| u64::from(t.duration_seconds())).sum(),
        volume: state.volume,
        history_len: state.history().len(),
    }
}

pub fn queue_view(state: &SessionState) -> QueueView {
    let pending = state.pending();
    QueueView {
        current: state.current().cloned(),
        up_next: pending.iter().take(QUEUE_VIEW_LIMIT).cloned().collect(),
        remaining: pending.len().saturating_sub(QUEUE_VIEW_LIMIT),
        total_pending_seconds: pending.iter().map(|t| u64::from(t.duration_seconds())).sum(),
        looping: state.is_looping(),
    }
}

pub async fn handle_set_volume(
    ctl: &PlaybackController,
    state: &mut SessionState,
    volume: f32,
) -> Result<CommandOutcome, ControllerError> {
    if !volume.is_finite() {
        return Err(ControllerError::invalid("Volume must be a number"));
    }
    let volume = volume.clamp(0.0, 1.0);
    state.volume = volume;
    if let Some(active) = state.active() {
        if let Err(e) = ctl.player.set_volume(active.handle, volume).await {
            warn!(target: PLAYER_LOG_TARGET, session = %state.key(), "Failed to apply volume: {}", e);
        }
    }
    info!(target: PLAYER_LOG_TARGET, session = %state.key(), volume, "Volume set.");
    Ok(CommandOutcome::Volume(volume))
}
