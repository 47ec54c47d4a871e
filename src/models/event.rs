//! Run-scoped event and statistics types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{CollectionKind, MemberRecord, Repo};

/// A newly observed membership, produced by reconciliation and consumed
/// by the notifier. Never persisted.
#[derive(Debug, Clone)]
pub struct Event {
    pub repo: Repo,
    pub kind: CollectionKind,
    pub member: MemberRecord,
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    /// Repositories scanned this run
    pub repo_count: usize,

    /// New-member events found (including suppressed ones)
    pub events_found: usize,

    /// Notifications actually delivered
    pub notifications_sent: usize,

    /// (repo, kind) entries whose fetch failed and kept previous state
    pub fetch_failures: usize,

    /// (repo, kind) entries held back by the suspicious-empty guard
    pub suspicious_empties: usize,

    /// Whether this was a bootstrap run (no prior snapshot)
    pub bootstrap: bool,
}

impl RunStats {
    pub fn duration_secs(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }
}
