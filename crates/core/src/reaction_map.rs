use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

pub type ReactionMap = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum MapStoreError {
    #[error("could not serialize reaction map: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("could not write reaction map `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("`git {step}` failed: {detail}")]
    Git { step: &'static str, detail: String },
}

/// Mirrors a map update into version control. The server crate implements
/// this over the `git` CLI; tests use the in-memory noop.
#[async_trait]
pub trait MapPublisher: Send + Sync {
    async fn publish(&self, path: &Path, key: &str, value: &str) -> Result<(), PublishError>;
}

#[derive(Default)]
pub struct NoopMapPublisher;

#[async_trait]
impl MapPublisher for NoopMapPublisher {
    async fn publish(&self, _path: &Path, _key: &str, _value: &str) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Result of a `set`: the file write succeeded either way, publication may
/// not have.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Published,
    SavedLocally { reason: String },
}

/// Flat-file keyword -> emoji store.
///
/// Reads fall back to an empty map on any failure. Writes rewrite the whole
/// file as pretty-printed JSON and then hand the change to the publisher.
/// Access is serialized through an async mutex so interleaved admin edits
/// cannot tear the read-modify-write cycle.
pub struct ReactionMapStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl ReactionMapStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> ReactionMap {
        let _lock = self.guard.lock().await;
        self.read_or_empty()
    }

    pub async fn set(
        &self,
        key: &str,
        value: &str,
        publisher: &dyn MapPublisher,
    ) -> Result<UpdateOutcome, MapStoreError> {
        let _lock = self.guard.lock().await;

        let mut map = self.read_or_empty();
        map.insert(key.to_owned(), value.to_owned());

        let rendered = render_map(&map)?;
        fs::write(&self.path, rendered)
            .map_err(|source| MapStoreError::Write { path: self.path.clone(), source })?;

        match publisher.publish(&self.path, key, value).await {
            Ok(()) => Ok(UpdateOutcome::Published),
            Err(error) => {
                warn!(%key, %error, "reaction map saved locally but not published");
                Ok(UpdateOutcome::SavedLocally { reason: error.to_string() })
            }
        }
    }

    fn read_or_empty(&self) -> ReactionMap {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(path = %self.path.display(), %error, "reaction map unreadable; starting empty");
                return ReactionMap::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(error) => {
                warn!(path = %self.path.display(), %error, "reaction map unparsable; starting empty");
                ReactionMap::new()
            }
        }
    }
}

/// Commit message used when mirroring an update into version control.
pub fn commit_message(key: &str, value: &str) -> String {
    format!("Update reactionMap.json: {key}: {value}")
}

fn render_map(map: &ReactionMap) -> Result<String, MapStoreError> {
    // serde_json's pretty printer emits the 2-space indentation the file
    // format requires.
    serde_json::to_string_pretty(map).map_err(MapStoreError::Serialize)
}

/// Renders the map the way `/showmap` displays it.
pub fn render_for_display(map: &ReactionMap) -> String {
    serde_json::to_string_pretty(map).unwrap_or_else(|_| "{}".to_owned())
}
