use super::PlayHandle;
use std::error::Error;
use std::io;

/// Errors reported by an external player.
#[derive(Debug)]
pub enum PlayerError {
    StartFailed(String),
    InvalidHandle(PlayHandle),
    Playback(String),
    Io(io::Error),
}

impl std::fmt::Display for PlayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerError::StartFailed(e) => write!(f, "Failed to start playback: {}", e),
            PlayerError::InvalidHandle(h) => write!(f, "Unknown or finished playback handle: {}", h),
            PlayerError::Playback(e) => write!(f, "Playback error: {}", e),
            PlayerError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for PlayerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PlayerError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PlayerError {
    fn from(e: io::Error) -> Self {
        PlayerError::Io(e)
    }
}
