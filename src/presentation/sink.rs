use crate::session::{SessionKey, TrackDescriptor};
use async_trait::async_trait;
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::io;

/// Point-in-time view of a session's playback, published once per progress tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub title: String,
    pub elapsed_seconds: f64,
    /// 0 when unknown.
    pub duration_seconds: u32,
    pub queue_length: usize,
    pub volume: f32,
    pub is_paused: bool,
    pub thumbnail_ref: Option<String>,
}

impl PlaybackSnapshot {
    /// Fraction of the track played, 0.0 when the duration is unknown.
    pub fn progress_fraction(&self) -> f64 {
        if self.duration_seconds == 0 {
            return 0.0;
        }
        (self.elapsed_seconds / f64::from(self.duration_seconds)).clamp(0.0, 1.0)
    }

    /// Ten-cell text bar, e.g. `███░░░░░░░`.
    pub fn progress_bar(&self) -> String {
        let filled = (self.progress_fraction() * 10.0) as usize;
        format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
    }

    /// `elapsed / total`, e.g. `1:05 / 3:20`.
    pub fn time_label(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.elapsed_seconds as u64),
            format_clock(u64::from(self.duration_seconds))
        )
    }
}

/// One-off events for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Announcement {
    NowPlaying(TrackDescriptor),
    QueueFinished,
    TrackFailed { title: String, reason: String },
    Stopped,
}

/// Errors a sink may report; they are logged and never affect playback.
#[derive(Debug)]
pub enum SinkError {
    Unavailable(String),
    Io(io::Error),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Unavailable(msg) => write!(f, "Presentation sink unavailable: {}", msg),
            SinkError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for SinkError {}

impl From<io::Error> for SinkError {
    fn from(e: io::Error) -> Self {
        SinkError::Io(e)
    }
}

/// Fire-and-forget destination for playback presentation.
#[async_trait]
pub trait PresentationSink: Send + Sync {
    async fn publish(&self, key: SessionKey, snapshot: PlaybackSnapshot) -> Result<(), SinkError>;

    async fn announce(&self, key: SessionKey, announcement: Announcement) -> Result<(), SinkError>;
}

/// Formats whole seconds as `m:ss`.
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
