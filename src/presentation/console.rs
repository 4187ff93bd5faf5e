//! Terminal sinks: an indicatif progress bar per session, and a plain tracing sink.

use crate::presentation::sink::{format_clock, Announcement, PlaybackSnapshot, PresentationSink, SinkError};
use crate::session::SessionKey;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

const LOG_TARGET: &str = "r_jukebox::presentation::console";

/// Renders one progress bar per session on stderr.
pub struct ConsoleSink {
    bars: Mutex<HashMap<SessionKey, ProgressBar>>,
    hidden: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self { bars: Mutex::new(HashMap::new()), hidden: false }
    }

    /// A sink whose bars never draw; used when stderr is not a terminal or in tests.
    pub fn hidden() -> Self {
        Self { bars: Mutex::new(HashMap::new()), hidden: true }
    }

    fn new_bar(&self, length: u64) -> ProgressBar {
        let bar = ProgressBar::new(length);
        if self.hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        let style = ProgressStyle::with_template("[{bar:20.green/white}] {prefix} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉░");
        bar.set_style(style);
        bar
    }

    fn with_bars<R>(&self, f: impl FnOnce(&mut HashMap<SessionKey, ProgressBar>) -> R) -> R {
        let mut bars = match self.bars.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut bars)
    }

    /// Current bar position for a session, if it has one.
    pub fn position(&self, key: SessionKey) -> Option<u64> {
        self.with_bars(|bars| bars.get(&key).map(|b| b.position()))
    }

    fn print_line(&self, key: SessionKey, line: String) {
        if self.hidden {
            return;
        }
        self.with_bars(|bars| match bars.get(&key) {
            Some(bar) => bar.println(line),
            None => eprintln!("{}", line),
        });
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresentationSink for ConsoleSink {
    async fn publish(&self, key: SessionKey, snapshot: PlaybackSnapshot) -> Result<(), SinkError> {
        let length = u64::from(snapshot.duration_seconds);
        self.with_bars(|bars| {
            let bar = bars.entry(key).or_insert_with(|| self.new_bar(length));
            if bar.length() != Some(length) {
                bar.set_length(length);
            }
            bar.set_position(snapshot.elapsed_seconds as u64);
            bar.set_prefix(snapshot.time_label());
            let state = if snapshot.is_paused { " (paused)" } else { "" };
            bar.set_message(format!(
                "[{}] {}{} | {} queued | vol {}%",
                key,
                snapshot.title,
                state,
                snapshot.queue_length,
                (snapshot.volume * 100.0).round() as u32
            ));
        });
        Ok(())
    }

    async fn announce(&self, key: SessionKey, announcement: Announcement) -> Result<(), SinkError> {
        match announcement {
            Announcement::NowPlaying(track) => {
                let length = u64::from(track.duration_seconds());
                self.with_bars(|bars| {
                    if let Some(old) = bars.insert(key, self.new_bar(length)) {
                        old.finish_and_clear();
                    }
                });
                self.print_line(
                    key,
                    format!(
                        "[{}] Now playing: {} [{}]",
                        key,
                        track.title(),
                        format_clock(u64::from(track.duration_seconds()))
                    ),
                );
            }
            Announcement::QueueFinished => {
                self.with_bars(|bars| {
                    if let Some(bar) = bars.remove(&key) {
                        bar.finish_and_clear();
                    }
                });
                self.print_line(key, format!("[{}] Queue finished. Use play to add more songs.", key));
            }
            Announcement::TrackFailed { title, reason } => {
                self.print_line(key, format!("[{}] Error playing {}, skipping: {}", key, title, reason));
            }
            Announcement::Stopped => {
                self.with_bars(|bars| {
                    if let Some(bar) = bars.remove(&key) {
                        bar.finish_and_clear();
                    }
                });
                self.print_line(key, format!("[{}] Stopped.", key));
            }
        }
        Ok(())
    }
}

/// Sink that only writes tracing events; for headless runs.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl PresentationSink for LogSink {
    async fn publish(&self, key: SessionKey, snapshot: PlaybackSnapshot) -> Result<(), SinkError> {
        info!(
            target: LOG_TARGET,
            session = %key,
            title = %snapshot.title,
            queue = snapshot.queue_length,
            "{} {}",
            snapshot.progress_bar(),
            snapshot.time_label()
        );
        Ok(())
    }

    async fn announce(&self, key: SessionKey, announcement: Announcement) -> Result<(), SinkError> {
        info!(target: LOG_TARGET, session = %key, "{:?}", announcement);
        Ok(())
    }
}
