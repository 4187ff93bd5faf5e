use crate::audio::PlayerError;
use crate::presentation::{format_clock, PlaybackSnapshot};
use crate::session::{SessionKey, TrackDescriptor};
use std::error::Error;
use std::fmt;
use tokio::sync::oneshot;

/// Operations the command surface can issue against one session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Enqueue { tracks: Vec<TrackDescriptor>, at_front: bool },
    Pause,
    Resume,
    PlayPauseToggle,
    Skip,
    Previous,
    Stop,
    SetLooping(bool),
    ToggleLooping,
    Shuffle,
    ClearQueue,
    /// 1-based position in the pending queue.
    Remove(usize),
    ShowQueue,
    Stats,
    NowPlaying,
    SetVolume(f32),
    /// Signed step, clamped into `0.0..=1.0` after applying.
    AdjustVolume(f32),
}

/// Messages accepted by the control loop.
#[derive(Debug)]
pub enum ControlMessage {
    Execute {
        key: SessionKey,
        command: SessionCommand,
        reply: oneshot::Sender<Result<CommandOutcome, ControllerError>>,
    },
    Shutdown,
}

/// Listing of a session's queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueView {
    pub current: Option<TrackDescriptor>,
    pub up_next: Vec<TrackDescriptor>,
    /// Pending tracks not included in `up_next`.
    pub remaining: usize,
    pub total_pending_seconds: u64,
    pub looping: bool,
}

pub const QUEUE_VIEW_LIMIT: usize = 10;

/// Successful result of a controller operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Queued { title: String, count: usize, position: usize, started: bool },
    Paused,
    Resumed,
    SkipRequested,
    Rewound { title: String },
    Stopped { removed: usize },
    Looping(bool),
    Shuffled(usize),
    Cleared(usize),
    Removed { title: String },
    Queue(QueueView),
    Stats { pending: usize, total_pending_seconds: u64, volume: f32, history_len: usize },
    NowPlaying(PlaybackSnapshot),
    Volume(f32),
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Queued { title, count, started: true, .. } if *count > 1 => {
                write!(f, "Playing {} and queued {} more", title, count - 1)
            }
            CommandOutcome::Queued { title, started: true, .. } => write!(f, "Playing {}", title),
            CommandOutcome::Queued { title, count, position, .. } if *count > 1 => {
                write!(f, "Added {} tracks starting with {} at position {}", count, title, position)
            }
            CommandOutcome::Queued { title, position, .. } => {
                write!(f, "Added to queue: {} (position {})", title, position)
            }
            CommandOutcome::Paused => write!(f, "Paused"),
            CommandOutcome::Resumed => write!(f, "Resumed"),
            CommandOutcome::SkipRequested => write!(f, "Skipped"),
            CommandOutcome::Rewound { title } => write!(f, "Back to {}", title),
            CommandOutcome::Stopped { .. } => write!(f, "Stopped and cleared queue"),
            CommandOutcome::Looping(true) => write!(f, "Loop enabled"),
            CommandOutcome::Looping(false) => write!(f, "Loop disabled"),
            CommandOutcome::Shuffled(n) => write!(f, "Shuffled {} songs", n),
            CommandOutcome::Cleared(n) => write!(f, "Removed {} songs from queue", n),
            CommandOutcome::Removed { title } => write!(f, "Removed from queue: {}", title),
            CommandOutcome::Queue(view) => write_queue(f, view),
            CommandOutcome::Stats { pending, total_pending_seconds, volume, history_len } => write!(
                f,
                "{} songs in queue | {}h {}m total | vol {}% | {} in history",
                pending,
                total_pending_seconds / 3600,
                (total_pending_seconds % 3600) / 60,
                (volume * 100.0).round() as u32,
                history_len
            ),
            CommandOutcome::NowPlaying(s) => {
                write!(f, "Now playing: {} {} {}", s.title, s.progress_bar(), s.time_label())?;
                write!(f, " | {} in queue | vol {}%", s.queue_length, (s.volume * 100.0).round() as u32)
            }
            CommandOutcome::Volume(v) => write!(f, "Volume {}%", (v * 100.0).round() as u32),
        }
    }
}

fn write_queue(f: &mut fmt::Formatter<'_>, view: &QueueView) -> fmt::Result {
    if view.current.is_none() && view.up_next.is_empty() {
        return write!(f, "Queue is empty");
    }
    if let Some(current) = &view.current {
        writeln!(f, "Now playing: {} [{}]", current.title(), duration_label(current))?;
    }
    if !view.up_next.is_empty() {
        writeln!(
            f,
            "Up next: {} tracks, {} total",
            view.up_next.len() + view.remaining,
            format_clock(view.total_pending_seconds)
        )?;
        for (i, track) in view.up_next.iter().enumerate() {
            writeln!(f, "  {}. {} [{}]", i + 1, track.title(), duration_label(track))?;
        }
    }
    if view.remaining > 0 {
        writeln!(f, "  + {} more songs in queue", view.remaining)?;
    }
    if view.looping {
        write!(f, "Loop: on")?;
    }
    Ok(())
}

fn duration_label(track: &TrackDescriptor) -> String {
    match track.duration_seconds() {
        0 => "?".to_string(),
        secs => format_clock(u64::from(secs)),
    }
}

/// Failure of a controller operation. Never fatal: the command surface turns
/// it into a reply.
#[derive(Debug)]
pub enum ControllerError {
    ResolutionFailed(String),
    PlaybackStartFailed(String),
    InvalidOperation(String),
    StaleCompletion { generation: u64 },
    Player(PlayerError),
    ChannelClosed,
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ResolutionFailed(msg) => write!(f, "Could not resolve track: {}", msg),
            ControllerError::PlaybackStartFailed(msg) => write!(f, "Could not start playback: {}", msg),
            ControllerError::InvalidOperation(msg) => write!(f, "{}", msg),
            ControllerError::StaleCompletion { generation } => {
                write!(f, "Ignored completion for discarded playback generation {}", generation)
            }
            ControllerError::Player(e) => write!(f, "Player error: {}", e),
            ControllerError::ChannelClosed => write!(f, "Playback controller is not running"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ControllerError::Player(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PlayerError> for ControllerError {
    fn from(e: PlayerError) -> Self {
        ControllerError::Player(e)
    }
}

impl ControllerError {
    pub(crate) fn invalid(msg: &str) -> Self {
        ControllerError::InvalidOperation(msg.to_string())
    }
}
