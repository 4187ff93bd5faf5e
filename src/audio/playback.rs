use crate::audio::error::PlayerError;
use async_trait::async_trait;
use std::fmt;

/// Callback a player invokes exactly once when a started item stops playing,
/// whether it finished, was stopped, or failed. May run on any thread.
pub type OnComplete = Box<dyn FnOnce(Option<PlayerError>) + Send + 'static>;

/// Opaque reference to one `start` call on a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayHandle(pub u64);

impl fmt::Display for PlayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "play#{}", self.0)
    }
}

/// Controls for the audio backend that actually renders tracks.
///
/// The player runs playback on its own execution context. It must invoke the
/// `on_complete` passed to a successful `start` exactly once. When `start`
/// returns an error the callback is dropped without being called.
#[async_trait]
pub trait ExternalPlayer: Send + Sync {
    async fn start(&self, source_ref: &str, on_complete: OnComplete) -> Result<PlayHandle, PlayerError>;

    async fn stop(&self, handle: PlayHandle) -> Result<(), PlayerError>;

    async fn pause(&self, handle: PlayHandle) -> Result<(), PlayerError>;

    async fn resume(&self, handle: PlayHandle) -> Result<(), PlayerError>;

    async fn is_playing(&self, handle: PlayHandle) -> bool;

    async fn is_paused(&self, handle: PlayHandle) -> bool;

    /// `volume` is in `0.0..=1.0`.
    async fn set_volume(&self, handle: PlayHandle, volume: f32) -> Result<(), PlayerError>;
}
