// src/player/completion.rs
//! Hand-off of playback completions from the player's own threads back to
//! the controller's context. The callback side only sends a message; the
//! receiving side is the only code that mutates session state.

use crate::audio::{OnComplete, PlayerError};
use crate::player::PLAYER_LOG_TARGET;
use crate::session::SessionKey;
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// One completion, stamped with the playback generation it belongs to.
#[derive(Debug)]
pub struct CompletionEvent {
    pub key: SessionKey,
    pub generation: u64,
    pub error: Option<PlayerError>,
}

/// Cloneable producer side; builds the callbacks handed to the player.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<CompletionEvent>,
}

impl CompletionSender {
    /// Builds the `on_complete` for one `start` call. The unbounded channel
    /// makes the send non-blocking and callable from any thread.
    pub fn callback(&self, key: SessionKey, generation: u64) -> OnComplete {
        let tx = self.tx.clone();
        Box::new(move |error: Option<PlayerError>| {
            trace!(target: PLAYER_LOG_TARGET, session = %key, generation, failed = error.is_some(), "Playback completion signalled.");
            if tx.send(CompletionEvent { key, generation, error }).is_err() {
                warn!(target: PLAYER_LOG_TARGET, session = %key, generation, "Completion dropped: controller is gone.");
            }
        })
    }
}

/// Consumer side, owned by whoever drives the controller (normally the control loop).
#[derive(Debug)]
pub struct CompletionBridge {
    rx: mpsc::UnboundedReceiver<CompletionEvent>,
}

impl CompletionBridge {
    pub async fn recv(&mut self) -> Option<CompletionEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<CompletionEvent> {
        self.rx.try_recv().ok()
    }
}

pub fn completion_channel() -> (CompletionSender, CompletionBridge) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionSender { tx }, CompletionBridge { rx })
}
