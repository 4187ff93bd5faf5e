use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable metadata for one playable item.
///
/// Fields are only readable; a descriptor moves between the pending queue,
/// the current slot and the history by value.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    source_ref: String,
    title: String,
    /// Whole seconds, 0 when unknown.
    #[serde(default)]
    duration_seconds: u32,
    #[serde(default)]
    thumbnail_ref: Option<String>,
}

impl TrackDescriptor {
    pub fn new(source_ref: impl Into<String>, title: impl Into<String>, duration_seconds: u32) -> Self {
        Self {
            source_ref: source_ref.into(),
            title: title.into(),
            duration_seconds,
            thumbnail_ref: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail_ref: impl Into<String>) -> Self {
        self.thumbnail_ref = Some(thumbnail_ref.into());
        self
    }

    pub fn source_ref(&self) -> &str {
        &self.source_ref
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    pub fn thumbnail_ref(&self) -> Option<&str> {
        self.thumbnail_ref.as_deref()
    }

    /// Known length of the track, `None` when the resolver could not tell.
    pub fn duration(&self) -> Option<Duration> {
        (self.duration_seconds > 0).then(|| Duration::from_secs(u64::from(self.duration_seconds)))
    }
}
