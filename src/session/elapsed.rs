//! Elapsed-time accounting. Pure bookkeeping over `SessionState`; callers
//! pass `now` so the arithmetic never reads a clock itself.

use super::SessionState;
use tokio::time::{Duration, Instant};

impl SessionState {
    /// Closes the running play segment. Returns `false` when no segment was open.
    pub fn on_pause(&mut self, now: Instant) -> bool {
        match self.play_started_at.take() {
            Some(started) => {
                self.elapsed += now.saturating_duration_since(started);
                true
            }
            None => false,
        }
    }

    /// Opens a new play segment. Returns `false` (and changes nothing) when one is already open.
    pub fn on_resume(&mut self, now: Instant) -> bool {
        if self.play_started_at.is_some() {
            return false;
        }
        self.play_started_at = Some(now);
        true
    }

    pub fn snapshot_elapsed(&self, now: Instant) -> Duration {
        let running = self
            .play_started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or(Duration::ZERO);
        self.elapsed + running
    }

    pub fn reset_for_new_track(&mut self, now: Instant) {
        self.elapsed = Duration::ZERO;
        self.play_started_at = Some(now);
    }

    pub(crate) fn reset_timing(&mut self) {
        self.elapsed = Duration::ZERO;
        self.play_started_at = None;
    }
}
