//! Local filesystem snapshot store.
//!
//! A single JSON document is rewritten in full on every run:
//!
//! ```text
//! {
//!   "repos": {
//!     "owner/name": { "stargazers": ["login", ...], "forks": [...], ... }
//!   },
//!   "last_run": "2026-08-29T06:00:00Z"
//! }
//! ```
//!
//! Writes go to a temp file first and are renamed into place, so the
//! persisted file always represents a complete run. Readers additionally
//! tolerate the legacy per-repo shape — a bare stargazer login list —
//! upgrading it in memory at load time.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::CollectionKind;

use super::{KindSets, Snapshot};

/// On-disk snapshot document.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDoc {
    #[serde(default)]
    repos: BTreeMap<String, RepoEntry>,

    #[serde(default)]
    last_run: Option<DateTime<Utc>>,
}

/// Per-repo entry as stored on disk.
///
/// Resolved into the canonical [`KindSets`] exactly once at load time; the
/// rest of the pipeline never branches on shape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RepoEntry {
    /// Current shape: kind → identity list
    CurrentMap(BTreeMap<CollectionKind, BTreeSet<String>>),

    /// Legacy shape: a bare stargazer login list from before per-kind
    /// tracking existed
    LegacyList(Vec<String>),
}

impl RepoEntry {
    fn resolve(self) -> KindSets {
        match self {
            RepoEntry::CurrentMap(map) => map.into_iter().collect(),
            RepoEntry::LegacyList(logins) => {
                let mut sets = KindSets::default();
                sets.set(CollectionKind::Stargazers, logins.into_iter().collect());
                sets
            }
        }
    }
}

impl From<SnapshotDoc> for Snapshot {
    fn from(doc: SnapshotDoc) -> Self {
        let repos = doc
            .repos
            .into_iter()
            .map(|(key, entry)| (key, entry.resolve()))
            .collect();
        Snapshot::from_parts(repos, doc.last_run)
    }
}

impl From<&Snapshot> for SnapshotDoc {
    fn from(snapshot: &Snapshot) -> Self {
        let repos = snapshot
            .repos()
            .iter()
            .map(|(key, sets)| {
                let map: BTreeMap<CollectionKind, BTreeSet<String>> =
                    sets.iter().map(|(kind, ids)| (kind, ids.clone())).collect();
                (key.clone(), RepoEntry::CurrentMap(map))
            })
            .collect();
        Self {
            repos,
            last_run: snapshot.last_run,
        }
    }
}

/// Snapshot store backed by a local JSON file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the snapshot.
    ///
    /// A missing file means a bootstrap run and yields an empty snapshot;
    /// any other read or parse failure is fatal.
    pub async fn load(&self) -> Result<Snapshot> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let doc: SnapshotDoc = serde_json::from_slice(&bytes)?;
                Ok(doc.into())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "No snapshot at {}, treating as bootstrap run",
                    self.path.display()
                );
                Ok(Snapshot::default())
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Stamp `last_run` and rewrite the snapshot file in full, atomically.
    ///
    /// Any failure here is a [`AppError::Persistence`]: losing state
    /// silently would duplicate every notification on the next run.
    pub async fn persist(&self, snapshot: &mut Snapshot) -> Result<()> {
        snapshot.last_run = Some(Utc::now());

        let doc = SnapshotDoc::from(&*snapshot);
        let bytes = serde_json::to_vec_pretty(&doc)
            .map_err(|e| AppError::persistence(format!("serialize snapshot: {e}")))?;

        self.write_atomic(&bytes)
            .await
            .map_err(|e| AppError::persistence(format!("write {}: {e}", self.path.display())))
    }

    /// Write bytes to a temp file, then rename into place.
    async fn write_atomic(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await
    }
}
