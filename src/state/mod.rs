// src/state/mod.rs

//! Snapshot state: the membership known as of the last successful run.
//!
//! The canonical in-memory shape is always "repo → kind → identity set";
//! legacy on-disk shapes are upgraded once at load time and never leak
//! into the pipeline.

pub mod local;

pub use local::SnapshotStore;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::models::CollectionKind;

/// Known membership for one repository, kind → identity set.
///
/// A kind that has never been tracked has no entry at all; that absence is
/// what gates first-time dependents notifications.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KindSets {
    sets: BTreeMap<CollectionKind, BTreeSet<String>>,
}

impl KindSets {
    pub fn get(&self, kind: CollectionKind) -> Option<&BTreeSet<String>> {
        self.sets.get(&kind)
    }

    /// Whether this kind was being tracked before this run.
    pub fn contains_kind(&self, kind: CollectionKind) -> bool {
        self.sets.contains_key(&kind)
    }

    pub fn set(&mut self, kind: CollectionKind, identities: BTreeSet<String>) {
        self.sets.insert(kind, identities);
    }

    pub fn iter(&self) -> impl Iterator<Item = (CollectionKind, &BTreeSet<String>)> {
        self.sets.iter().map(|(k, v)| (*k, v))
    }
}

impl FromIterator<(CollectionKind, BTreeSet<String>)> for KindSets {
    fn from_iter<T: IntoIterator<Item = (CollectionKind, BTreeSet<String>)>>(iter: T) -> Self {
        Self {
            sets: iter.into_iter().collect(),
        }
    }
}

/// In-memory snapshot of all known membership plus the last run timestamp.
///
/// Loaded once at run start, mutated per (repo, kind) as reconciliation
/// completes, written back in full at run end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    repos: BTreeMap<String, KindSets>,
    pub last_run: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// A run with no prior snapshot records state but suppresses
    /// notifications.
    pub fn is_bootstrap(&self) -> bool {
        self.last_run.is_none()
    }

    /// The identity set known for a (repo, kind) entry; empty when the
    /// repo or kind has never been seen.
    pub fn known(&self, repo_key: &str, kind: CollectionKind) -> BTreeSet<String> {
        self.repos
            .get(repo_key)
            .and_then(|sets| sets.get(kind))
            .cloned()
            .unwrap_or_default()
    }

    /// Whether this (repo, kind) entry existed before this run.
    pub fn was_tracked(&self, repo_key: &str, kind: CollectionKind) -> bool {
        self.repos
            .get(repo_key)
            .is_some_and(|sets| sets.contains_kind(kind))
    }

    /// Commit the reconciled identity set for one (repo, kind) entry.
    pub fn commit(&mut self, repo_key: &str, kind: CollectionKind, identities: BTreeSet<String>) {
        self.repos
            .entry(repo_key.to_string())
            .or_default()
            .set(kind, identities);
    }

    pub fn repos(&self) -> &BTreeMap<String, KindSets> {
        &self.repos
    }

    pub fn from_parts(
        repos: BTreeMap<String, KindSets>,
        last_run: Option<DateTime<Utc>>,
    ) -> Self {
        Self { repos, last_run }
    }
}
