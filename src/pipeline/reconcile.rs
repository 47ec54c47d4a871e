//! Set reconciliation for one (repo, kind) entry.
//!
//! Turns "current collection" vs "known collection" into new-member events
//! and the next snapshot state. Two situations keep the previous state
//! untouched: a failed fetch, and a suspiciously empty result. Neither is
//! ever confused with a legitimately empty collection.

use std::collections::BTreeSet;

use crate::error::{AppError, Result};
use crate::models::MemberRecord;

/// Result of reconciling one (repo, kind) entry.
#[derive(Debug)]
pub enum Outcome {
    /// Fetch succeeded; membership converged to `next` and `events` holds
    /// the newly observed members in fetched order.
    Reconciled {
        events: Vec<MemberRecord>,
        next: BTreeSet<String>,
    },

    /// Fetch nominally succeeded but returned nothing while members were
    /// previously known. Symptomatic of an upstream format change or
    /// partial outage; previous state is kept rather than emitting a false
    /// "everyone left" signal.
    SuspiciousEmpty,

    /// Fetch failed; previous state is kept.
    FetchFailed(AppError),
}

/// Reconcile freshly fetched members against the known identity set.
///
/// Pure with respect to everything but its inputs: callers commit `next`
/// and log warnings for the degenerate outcomes.
///
/// Known limitation: the suspicious-empty guard only looks at emptiness.
/// A full evacuation replaced by an equal-sized new membership passes the
/// guard and emits events for the rotated members.
pub fn reconcile(known: &BTreeSet<String>, fetched: Result<Vec<MemberRecord>>) -> Outcome {
    let records = match fetched {
        Ok(records) => records,
        Err(error) => return Outcome::FetchFailed(error),
    };

    let current: BTreeSet<String> = records.iter().map(|r| r.identity.clone()).collect();

    if current.is_empty() && !known.is_empty() {
        return Outcome::SuspiciousEmpty;
    }

    // New members in fetched order, duplicates collapsed to their first
    // occurrence.
    let mut seen = BTreeSet::new();
    let events = records
        .into_iter()
        .filter(|r| !known.contains(&r.identity) && seen.insert(r.identity.clone()))
        .collect();

    Outcome::Reconciled {
        events,
        next: current,
    }
}
