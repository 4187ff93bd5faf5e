//! Playback controller: the per-session state machine that advances the
//! queue, drives the external player and reacts to completions.

use crate::audio::ExternalPlayer;
use crate::presentation::{PresentationSink, SessionReporter};
use crate::session::{SessionKey, SessionRegistry, SharedSession};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{debug, info, instrument};

mod command_handler;
mod completion;
mod playback_starter;
mod progress_task;
mod run_loop;
mod state;

pub use completion::{completion_channel, CompletionBridge, CompletionEvent, CompletionSender};
pub use progress_task::ProgressTask;
pub use run_loop::{run_control_loop, spawn_control_loop, ControlHandle};
pub use state::{
    CommandOutcome, ControlMessage, ControllerError, QueueView, SessionCommand, QUEUE_VIEW_LIMIT,
};

pub(crate) const PLAYER_LOG_TARGET: &str = "r_jukebox::player";

/// Tunables for the controller.
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub progress_interval: StdDuration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            progress_interval: StdDuration::from_secs(1),
        }
    }
}

/// Orchestrates playback for every session in the registry.
///
/// Each operation takes the session's mutex for its whole duration, so
/// commands and completion-driven advances on one session never interleave.
pub struct PlaybackController {
    registry: Arc<SessionRegistry>,
    player: Arc<dyn ExternalPlayer>,
    reporter: SessionReporter,
    completions: CompletionSender,
    options: ControllerOptions,
}

impl PlaybackController {
    /// Creates the controller and the receiving end of its completion bridge.
    /// The bridge must be drained (see `run_control_loop`) for sessions to advance.
    pub fn new(
        registry: Arc<SessionRegistry>,
        player: Arc<dyn ExternalPlayer>,
        sink: Arc<dyn PresentationSink>,
        options: ControllerOptions,
    ) -> (Self, CompletionBridge) {
        let (completions, bridge) = completion_channel();
        let controller = PlaybackController {
            registry,
            player,
            reporter: SessionReporter::new(sink),
            completions,
            options,
        };
        (controller, bridge)
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    fn session(&self, key: SessionKey) -> SharedSession {
        self.registry.get(key)
    }

    /// Runs one command against a session.
    #[instrument(skip(self, command), fields(session = %key))]
    pub async fn execute(&self, key: SessionKey, command: SessionCommand) -> Result<CommandOutcome, ControllerError> {
        debug!(target: PLAYER_LOG_TARGET, session = %key, "Executing {:?}", command);
        match command {
            SessionCommand::Enqueue { tracks, at_front } => self.enqueue(key, tracks, at_front).await,
            SessionCommand::Pause => self.pause(key).await,
            SessionCommand::Resume => self.resume(key).await,
            SessionCommand::PlayPauseToggle => self.toggle_pause(key).await,
            SessionCommand::Skip => self.skip(key).await,
            SessionCommand::Previous => self.previous(key).await,
            SessionCommand::Stop => self.stop(key).await,
            SessionCommand::SetLooping(flag) => self.set_looping(key, flag).await,
            SessionCommand::ToggleLooping => self.toggle_looping(key).await,
            SessionCommand::Shuffle => self.shuffle(key).await,
            SessionCommand::ClearQueue => self.clear_queue(key).await,
            SessionCommand::Remove(position) => self.remove(key, position).await,
            SessionCommand::ShowQueue => self.queue(key).await,
            SessionCommand::Stats => self.stats(key).await,
            SessionCommand::NowPlaying => self.now_playing(key).await,
            SessionCommand::SetVolume(volume) => self.set_volume(key, volume).await,
            SessionCommand::AdjustVolume(delta) => self.adjust_volume(key, delta).await,
        }
    }

    /// Adds tracks to the queue, starting playback if the session is idle.
    pub async fn enqueue(
        &self,
        key: SessionKey,
        tracks: Vec<crate::session::TrackDescriptor>,
        at_front: bool,
    ) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        command_handler::handle_enqueue(self, &session, &mut state, tracks, at_front).await
    }

    pub async fn pause(&self, key: SessionKey) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        command_handler::handle_pause(self, &mut state).await
    }

    pub async fn resume(&self, key: SessionKey) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        command_handler::handle_resume(self, &mut state).await
    }

    pub async fn toggle_pause(&self, key: SessionKey) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        command_handler::handle_play_pause_toggle(self, &mut state).await
    }

    /// Asks the player to stop the current item; the resulting completion advances the queue.
    pub async fn skip(&self, key: SessionKey) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        command_handler::handle_skip(self, &mut state).await
    }

    pub async fn previous(&self, key: SessionKey) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        command_handler::handle_previous(self, &session, &mut state).await
    }

    pub async fn stop(&self, key: SessionKey) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        command_handler::handle_stop(self, &mut state).await
    }

    pub async fn set_looping(&self, key: SessionKey, flag: bool) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        state.looping = flag;
        info!(target: PLAYER_LOG_TARGET, session = %key, looping = flag, "Loop flag set.");
        Ok(CommandOutcome::Looping(flag))
    }

    pub async fn toggle_looping(&self, key: SessionKey) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        state.looping = !state.looping;
        info!(target: PLAYER_LOG_TARGET, session = %key, looping = state.looping, "Loop flag toggled.");
        Ok(CommandOutcome::Looping(state.looping))
    }

    pub async fn shuffle(&self, key: SessionKey) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        command_handler::handle_shuffle(&mut state)
    }

    pub async fn clear_queue(&self, key: SessionKey) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        command_handler::handle_clear_queue(&mut state)
    }

    /// Removes the pending track at a 1-based `position`.
    pub async fn remove(&self, key: SessionKey, position: usize) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        command_handler::handle_remove(&mut state, position)
    }

    pub async fn stats(&self, key: SessionKey) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let state = session.lock().await;
        Ok(command_handler::session_stats(&state))
    }

    pub async fn queue(&self, key: SessionKey) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let state = session.lock().await;
        Ok(CommandOutcome::Queue(command_handler::queue_view(&state)))
    }

    pub async fn now_playing(&self, key: SessionKey) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let state = session.lock().await;
        state
            .snapshot(tokio::time::Instant::now())
            .map(CommandOutcome::NowPlaying)
            .ok_or_else(|| ControllerError::invalid("Nothing playing"))
    }

    pub async fn set_volume(&self, key: SessionKey, volume: f32) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        command_handler::handle_set_volume(self, &mut state, volume).await
    }

    pub async fn adjust_volume(&self, key: SessionKey, delta: f32) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(key);
        let mut state = session.lock().await;
        let target = state.volume + delta;
        command_handler::handle_set_volume(self, &mut state, target).await
    }

    /// Applies a completion delivered through the bridge. Returns
    /// `ControllerError::StaleCompletion` when the playback it refers to was
    /// already discarded by `stop`, `previous` or a newer start.
    pub async fn handle_completion(&self, event: CompletionEvent) -> Result<(), ControllerError> {
        let session = self.session(event.key);
        let mut state = session.lock().await;
        command_handler::handle_track_completed(self, &session, &mut state, event).await
    }

    /// Waits until every announcement and snapshot reported so far reached the sink.
    pub async fn flush_presentation(&self) {
        self.reporter.flush().await;
    }

    /// Stops every session; used when the control loop shuts down.
    pub async fn stop_all(&self) {
        for key in self.registry.keys() {
            let session = self.session(key);
            let mut state = session.lock().await;
            if state.active().is_some() || !state.pending().is_empty() {
                if let Err(e) = command_handler::handle_stop(self, &mut state).await {
                    debug!(target: PLAYER_LOG_TARGET, session = %key, "Stop during shutdown failed: {}", e);
                }
            }
        }
    }
}
