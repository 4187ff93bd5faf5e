//! Per-channel session state: pending queue, bounded history, elapsed-time
//! accounting and the process-wide registry that hands sessions out.

mod elapsed;
mod history;
mod registry;
mod state;
mod track;

pub use history::History;
pub use registry::{SessionRegistry, SharedSession};
pub use state::{ActivePlayback, PlaybackState, SessionKey, SessionState, DEFAULT_HISTORY_CAPACITY};
pub use track::TrackDescriptor;

pub(crate) const SESSION_LOG_TARGET: &str = "r_jukebox::session";
