//! Presentation boundary: snapshots and announcements pushed to whatever
//! renders "now playing" for a session.

mod console;
mod reporter;
mod sink;

pub use console::{ConsoleSink, LogSink};
pub use reporter::SessionReporter;
pub use sink::{format_clock, Announcement, PlaybackSnapshot, PresentationSink, SinkError};
