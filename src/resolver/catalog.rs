use super::{ResolveError, TrackResolver};
use crate::session::TrackDescriptor;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

const LOG_TARGET: &str = "r_jukebox::resolver::catalog";

/// Prefix that asks for every matching track instead of the best one,
/// the way a playlist link expands to all of its entries.
pub const LIST_PREFIX: &str = "list:";

/// Resolves queries against an in-memory catalog, usually loaded from a JSON
/// array of track descriptors.
#[derive(Debug, Clone, Default)]
pub struct CatalogResolver {
    tracks: Vec<TrackDescriptor>,
}

impl CatalogResolver {
    pub fn new(tracks: Vec<TrackDescriptor>) -> Self {
        Self { tracks }
    }

    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let content = fs::read_to_string(path)?;
        let tracks: Vec<TrackDescriptor> = serde_json::from_str(&content)?;
        if tracks.iter().any(|t| t.source_ref().trim().is_empty()) {
            return Err(ResolveError::Catalog(format!(
                "{} contains a track without a source reference",
                path.display()
            )));
        }
        info!(target: LOG_TARGET, "Loaded {} catalog tracks from {}", tracks.len(), path.display());
        Ok(Self { tracks })
    }

    pub fn tracks(&self) -> &[TrackDescriptor] {
        &self.tracks
    }

    /// Known play lengths keyed by source reference, for players that need them.
    pub fn lengths(&self) -> HashMap<String, Duration> {
        self.tracks
            .iter()
            .filter_map(|t| t.duration().map(|d| (t.source_ref().to_string(), d)))
            .collect()
    }

    fn matching<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a TrackDescriptor> + 'a {
        self.tracks
            .iter()
            .filter(move |t| t.title().to_lowercase().contains(needle))
    }
}

#[async_trait]
impl TrackResolver for CatalogResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, query: &str) -> Result<Vec<TrackDescriptor>, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::NotFound(String::new()));
        }

        if let Some(exact) = self.tracks.iter().find(|t| t.source_ref() == query) {
            debug!(target: LOG_TARGET, "Exact source match for {}", query);
            return Ok(vec![exact.clone()]);
        }

        let (needle, want_all) = match query.strip_prefix(LIST_PREFIX) {
            Some(rest) => (rest.trim().to_lowercase(), true),
            None => (query.to_lowercase(), false),
        };
        if needle.is_empty() {
            return Err(ResolveError::NotFound(query.to_string()));
        }

        let found: Vec<TrackDescriptor> = if want_all {
            self.matching(&needle).cloned().collect()
        } else {
            self.matching(&needle).take(1).cloned().collect()
        };

        if found.is_empty() {
            Err(ResolveError::NotFound(query.to_string()))
        } else {
            debug!(target: LOG_TARGET, "Resolved {} to {} track(s)", query, found.len());
            Ok(found)
        }
    }
}
