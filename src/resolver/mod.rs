//! Track resolution boundary. The controller only ever sees resolved
//! descriptors; the command surface resolves queries before enqueueing.

mod catalog;

pub use catalog::CatalogResolver;

use crate::session::TrackDescriptor;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::io;

/// Errors from resolving a user query into tracks.
#[derive(Debug)]
pub enum ResolveError {
    NotFound(String),
    Catalog(String),
    Io(io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound(query) => write!(f, "No results found for: {}", query),
            ResolveError::Catalog(msg) => write!(f, "Catalog error: {}", msg),
            ResolveError::Io(e) => write!(f, "I/O error: {}", e),
            ResolveError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ResolveError::Io(e) => Some(e),
            ResolveError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ResolveError {
    fn from(e: io::Error) -> Self {
        ResolveError::Io(e)
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(e: serde_json::Error) -> Self {
        ResolveError::Parse(e)
    }
}

/// Turns a search query or source reference into playable tracks.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Returns one track for a plain query, or several for a list query.
    /// Fails with `ResolveError::NotFound` when nothing matches.
    async fn resolve(&self, query: &str) -> Result<Vec<TrackDescriptor>, ResolveError>;
}
