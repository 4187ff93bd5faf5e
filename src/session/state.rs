use super::{History, TrackDescriptor, SESSION_LOG_TARGET};
use crate::audio::PlayHandle;
use crate::player::ProgressTask;
use crate::presentation::PlaybackSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tokio::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Identifies one independent playback destination (a guild/channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey(pub u64);

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionKey {
    fn from(id: u64) -> Self {
        SessionKey(id)
    }
}

/// Controller-visible playback state, derived from the session fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    /// A track was retired but its successor has not been started yet.
    Advancing,
}

/// The external playback currently bound to this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePlayback {
    pub handle: PlayHandle,
    pub generation: u64,
}

/// Mutable aggregate for one session. Always accessed through the
/// registry's per-session mutex.
#[derive(Debug)]
pub struct SessionState {
    key: SessionKey,
    pub(crate) pending: VecDeque<TrackDescriptor>,
    pub(crate) history: History,
    pub(crate) current: Option<TrackDescriptor>,
    pub(crate) elapsed: Duration,
    pub(crate) play_started_at: Option<Instant>,
    pub(crate) looping: bool,
    pub(crate) volume: f32,
    pub(crate) generation: u64,
    pub(crate) active: Option<ActivePlayback>,
    pub(crate) progress_task: Option<ProgressTask>,
}

impl SessionState {
    pub fn new(key: SessionKey, history_capacity: usize, volume: f32) -> Self {
        Self {
            key,
            pending: VecDeque::new(),
            history: History::new(history_capacity),
            current: None,
            elapsed: Duration::ZERO,
            play_started_at: None,
            looping: false,
            volume: volume.clamp(0.0, 1.0),
            generation: 0,
            active: None,
            progress_task: None,
        }
    }

    pub fn key(&self) -> SessionKey {
        self.key
    }

    pub fn pending(&self) -> &VecDeque<TrackDescriptor> {
        &self.pending
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current(&self) -> Option<&TrackDescriptor> {
        self.current.as_ref()
    }

    /// Accumulated seconds of closed play segments; see `snapshot_elapsed` for the live value.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn play_started_at(&self) -> Option<Instant> {
        self.play_started_at
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active(&self) -> Option<ActivePlayback> {
        self.active
    }

    pub fn has_progress_task(&self) -> bool {
        self.progress_task.is_some()
    }

    pub fn playback_state(&self) -> PlaybackState {
        match (self.active, &self.current) {
            (Some(_), _) if self.play_started_at.is_some() => PlaybackState::Playing,
            (Some(_), _) => PlaybackState::Paused,
            (None, Some(_)) => PlaybackState::Advancing,
            (None, None) => PlaybackState::Idle,
        }
    }

    /// Adds tracks to the pending queue. `at_front` keeps the given order
    /// ahead of everything already queued.
    pub(crate) fn enqueue(&mut self, tracks: Vec<TrackDescriptor>, at_front: bool) {
        if at_front {
            for track in tracks.into_iter().rev() {
                self.pending.push_front(track);
            }
        } else {
            self.pending.extend(tracks);
        }
    }

    /// Moves `current` into history and promotes the head of the queue.
    pub(crate) fn promote_next(&mut self) -> Option<&TrackDescriptor> {
        if let Some(finished) = self.current.take() {
            self.history.push(finished);
        }
        self.current = self.pending.pop_front();
        self.current.as_ref()
    }

    /// Pops the most recent history entry into `current`, parking the old
    /// current track at the front of the queue.
    pub(crate) fn step_back(&mut self) -> Option<&TrackDescriptor> {
        let previous = self.history.pop()?;
        if let Some(displaced) = self.current.take() {
            self.pending.push_front(displaced);
        }
        self.current = Some(previous);
        self.current.as_ref()
    }

    pub(crate) fn cancel_progress_task(&mut self) {
        if let Some(task) = self.progress_task.take() {
            debug!(target: SESSION_LOG_TARGET, session = %self.key, generation = task.generation(), "Cancelling progress reporter.");
            task.cancel();
        }
    }

    pub(crate) fn install_progress_task(&mut self, task: ProgressTask) {
        self.cancel_progress_task();
        self.progress_task = Some(task);
    }

    /// Returns the number of pending tracks that were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.pending.len();
        self.pending.clear();
        self.current = None;
        self.active = None;
        self.reset_timing();
        self.cancel_progress_task();
        removed
    }

    /// Builds the view the presentation sink receives. `None` when nothing is loaded.
    pub fn snapshot(&self, now: Instant) -> Option<PlaybackSnapshot> {
        let track = self.current.as_ref()?;
        let mut elapsed = self.snapshot_elapsed(now);
        if let Some(duration) = track.duration() {
            elapsed = elapsed.min(duration);
        }
        Some(PlaybackSnapshot {
            title: track.title().to_string(),
            elapsed_seconds: elapsed.as_secs_f64(),
            duration_seconds: track.duration_seconds(),
            queue_length: self.pending.len(),
            volume: self.volume,
            is_paused: self.playback_state() == PlaybackState::Paused,
            thumbnail_ref: track.thumbnail_ref().map(str::to_string),
        })
    }
}
