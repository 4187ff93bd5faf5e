//! Bounded playback history backing "previous".

use super::TrackDescriptor;
use std::collections::VecDeque;

/// Ring of recently played tracks, most recent at the back.
#[derive(Debug, Clone)]
pub struct History {
    tracks: VecDeque<TrackDescriptor>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            tracks: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Appends a track, evicting the oldest entry once at capacity.
    pub fn push(&mut self, track: TrackDescriptor) {
        if self.max_size == 0 {
            return;
        }
        if self.tracks.len() >= self.max_size {
            self.tracks.pop_front();
        }
        self.tracks.push_back(track);
    }

    pub fn peek(&self) -> Option<&TrackDescriptor> {
        self.tracks.back()
    }

    pub fn pop(&mut self) -> Option<TrackDescriptor> {
        self.tracks.pop_back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TrackDescriptor> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(super::DEFAULT_HISTORY_CAPACITY)
    }
}
