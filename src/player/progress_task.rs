// src/player/progress_task.rs

use crate::audio::{ExternalPlayer, PlayHandle};
use crate::player::PLAYER_LOG_TARGET;
use crate::presentation::SessionReporter;
use crate::session::{SessionKey, SharedSession};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, instrument, trace};

/// Handle to the periodic progress reporter of one playback generation.
///
/// Dropping the handle closes the shutdown channel, which stops the task just
/// like `cancel`.
#[derive(Debug)]
pub struct ProgressTask {
    task_handle: JoinHandle<()>,
    shutdown_tx: broadcast::Sender<()>,
    key: SessionKey,
    generation: u64,
}

impl ProgressTask {
    /// Sends the shutdown signal; the task exits at its next wake-up.
    fn signal_shutdown(&self) {
        debug!(target: PLAYER_LOG_TARGET, session = %self.key, generation = self.generation, "Sending shutdown signal to progress task.");
        if let Err(e) = self.shutdown_tx.send(()) {
            // Expected when the task already terminated on its own.
            trace!(target: PLAYER_LOG_TARGET, session = %self.key, "Failed to send shutdown signal (receiver likely dropped): {}", e);
        }
    }

    /// Stops the reporter. Safe to call on a task that already exited.
    pub fn cancel(self) {
        self.signal_shutdown();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.task_handle.is_finished()
    }
}

/// Everything a reporter task needs, captured at spawn time.
pub(crate) struct ProgressTaskSpec {
    pub key: SessionKey,
    pub generation: u64,
    pub handle: PlayHandle,
    pub session: SharedSession,
    pub player: Arc<dyn ExternalPlayer>,
    pub reporter: SessionReporter,
    pub period: StdDuration,
}

/// Spawns the reporter for one playback generation.
///
/// Each tick it asks the player whether the handle is still playing or
/// paused, then re-checks under the session lock that it still owns the
/// session's progress slot. If the player is done it clears the slot and
/// exits without waiting to be cancelled.
#[instrument(skip(spec), fields(session = %spec.key, generation = spec.generation))]
pub(crate) fn spawn_progress_task(spec: ProgressTaskSpec) -> ProgressTask {
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
    let ProgressTaskSpec { key, generation, handle, session, player, reporter, period } = spec;

    debug!(target: PLAYER_LOG_TARGET, session = %key, generation, ?period, "Spawning progress task.");
    let task_handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    trace!(target: PLAYER_LOG_TARGET, session = %key, generation, "[Progress Task] Shutdown received.");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let still_active = player.is_playing(handle).await || player.is_paused(handle).await;

            let snapshot = {
                let mut state = session.lock().await;
                let owns_slot = state.progress_task.as_ref().map(|t| t.generation()) == Some(generation);
                if !owns_slot {
                    trace!(target: PLAYER_LOG_TARGET, session = %key, generation, "[Progress Task] Superseded, exiting.");
                    break;
                }
                let current_generation = state.active().map(|a| a.generation);
                if !still_active || current_generation != Some(generation) {
                    debug!(target: PLAYER_LOG_TARGET, session = %key, generation, "[Progress Task] Playback no longer active, clearing own handle.");
                    state.progress_task = None;
                    break;
                }
                state.snapshot(Instant::now())
            };

            if let Some(snapshot) = snapshot {
                reporter.report_progress(key, snapshot);
            }
        }
        trace!(target: PLAYER_LOG_TARGET, session = %key, generation, "[Progress Task] Finished.");
    });

    ProgressTask {
        task_handle,
        shutdown_tx,
        key,
        generation,
    }
}
