// src/player/run_loop.rs
use super::{CommandOutcome, CompletionBridge, ControlMessage, ControllerError, PlaybackController, SessionCommand, PLAYER_LOG_TARGET};
use crate::session::SessionKey;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, trace, warn};

const COMMAND_BUFFER: usize = 64;
const PRESENTATION_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// The single control context: drains completions and user commands, one at
/// a time, until shut down. Every session is stopped on exit, and pending
/// presentation reports get a bounded chance to reach the sink.
pub async fn run_control_loop(
    controller: Arc<PlaybackController>,
    mut bridge: CompletionBridge,
    mut command_rx: mpsc::Receiver<ControlMessage>,
) {
    info!(target: PLAYER_LOG_TARGET, "Control loop started.");

    loop {
        tokio::select! {
            biased; // Completions first so a finished track advances before the next command sees it.

            Some(event) = bridge.recv() => {
                trace!(target: PLAYER_LOG_TARGET, session = %event.key, generation = event.generation, "Received completion.");
                match controller.handle_completion(event).await {
                    Ok(()) => {}
                    Err(ControllerError::StaleCompletion { generation }) => {
                        trace!(target: PLAYER_LOG_TARGET, generation, "Stale completion discarded.");
                    }
                    Err(e) => warn!(target: PLAYER_LOG_TARGET, "Completion handling failed: {}", e),
                }
            }

            message = command_rx.recv() => {
                match message {
                    Some(ControlMessage::Execute { key, command, reply }) => {
                        let result = controller.execute(key, command).await;
                        if reply.send(result).is_err() {
                            debug!(target: PLAYER_LOG_TARGET, session = %key, "Command issuer went away before the reply.");
                        }
                    }
                    Some(ControlMessage::Shutdown) => {
                        info!(target: PLAYER_LOG_TARGET, "Shutdown command received. Exiting control loop.");
                        break;
                    }
                    None => {
                        info!(target: PLAYER_LOG_TARGET, "All command senders dropped. Exiting control loop.");
                        break;
                    }
                }
            }
        }
    }

    controller.stop_all().await;
    if timeout(PRESENTATION_FLUSH_TIMEOUT, controller.flush_presentation()).await.is_err() {
        warn!(target: PLAYER_LOG_TARGET, "Presentation sink did not drain before shutdown.");
    }
    info!(target: PLAYER_LOG_TARGET, "Control loop finished.");
}

/// Cloneable front door to a running control loop.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlMessage>,
}

impl ControlHandle {
    pub async fn execute(&self, key: SessionKey, command: SessionCommand) -> Result<CommandOutcome, ControllerError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(ControlMessage::Execute { key, command, reply })
            .await
            .map_err(|_| ControllerError::ChannelClosed)?;
        response.await.map_err(|_| ControllerError::ChannelClosed)?
    }

    pub async fn shutdown(&self) {
        if self.tx.send(ControlMessage::Shutdown).await.is_err() {
            debug!(target: PLAYER_LOG_TARGET, "Control loop already stopped.");
        }
    }
}

/// Spawns `run_control_loop` on the current runtime.
pub fn spawn_control_loop(controller: Arc<PlaybackController>, bridge: CompletionBridge) -> (ControlHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let join = tokio::spawn(run_control_loop(controller, bridge, rx));
    (ControlHandle { tx }, join)
}
