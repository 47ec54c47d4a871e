//! Run driver: one poll-diff-notify pass over all repositories.
//!
//! Strictly sequential phases: Loading, Reconciling, Notifying,
//! Persisting, Done. Collection fetches fan out over a bounded worker
//! pool, but reconciliation results are re-ordered deterministically
//! (repository listing order, then kind order) before any notification is
//! rendered, and the snapshot is written exactly once at the very end.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::config::Credentials;
use crate::error::Result;
use crate::fetch::{ACCEPT_JSON, FetchDescriptor, GithubClient, build_sources};
use crate::models::{CollectionKind, Config, Event, MemberRecord, Repo, RunStats};
use crate::pipeline::notify::{Notifier, RunContext, plan, render};
use crate::pipeline::reconcile::{Outcome, reconcile};
use crate::state::{Snapshot, SnapshotStore};
use crate::utils::log as console;

/// An event plus the policy decision whether it may be rendered.
struct PendingEvent {
    event: Event,
    notify: bool,
}

/// Execute one complete run.
pub async fn run(config: &Config, credentials: &Credentials, dry_run: bool) -> Result<RunStats> {
    let start_time = Utc::now();

    // Loading
    console::step(1, 5, "Load - Reading snapshot and repository listing");
    let store = SnapshotStore::new(&config.state.file);
    let mut snapshot = store.load().await?;
    let bootstrap = snapshot.is_bootstrap();

    let client = Arc::new(GithubClient::new(
        &config.github,
        &config.fetch,
        &credentials.github_token,
    )?);
    let repos = org_repos(&client, config).await?;
    log::info!(
        "Watching {} public repositories in {}",
        repos.len(),
        config.github.org
    );

    // Reconciling
    console::step(2, 5, "Reconcile - Fetching and diffing collections");
    let sources = build_sources(Arc::clone(&client), config);

    let jobs: Vec<_> = repos
        .iter()
        .cloned()
        .enumerate()
        .flat_map(|(repo_idx, repo)| {
            sources
                .iter()
                .cloned()
                .map(move |source| (repo_idx, repo.clone(), source))
        })
        .collect();

    let mut fetched: Vec<(usize, CollectionKind, Result<Vec<MemberRecord>>)> = stream::iter(jobs)
        .map(|(repo_idx, repo, source)| async move {
            let result = source.members(&repo).await;
            (repo_idx, source.kind(), result)
        })
        .buffer_unordered(config.fetch.max_concurrent)
        .collect()
        .await;

    // Deterministic event order: repository listing order, then kind order.
    fetched.sort_by_key(|(repo_idx, kind, _)| (*repo_idx, *kind));

    let mut pending: Vec<PendingEvent> = Vec::new();
    let mut events_found = 0;
    let mut fetch_failures = 0;
    let mut suspicious_empties = 0;

    for (repo_idx, kind, result) in fetched {
        let repo = &repos[repo_idx];
        let key = repo.full_name.as_str();
        let known = snapshot.known(key, kind);
        let tracked_before = snapshot.was_tracked(key, kind);

        match reconcile(&known, result) {
            Outcome::FetchFailed(error) => {
                fetch_failures += 1;
                log::warn!("Fetch failed for {key} {kind}, keeping previous state: {error}");
            }
            Outcome::SuspiciousEmpty => {
                suspicious_empties += 1;
                log::warn!(
                    "Suspicious empty {kind} result for {key} ({} known members), keeping previous state",
                    known.len()
                );
            }
            Outcome::Reconciled { events, next } => {
                // The listing's counters can be stale or absent; render
                // with the size of the collection just fetched.
                let repo_view = repo.with_member_count(kind, next.len() as u64);
                for member in events {
                    events_found += 1;
                    pending.push(PendingEvent {
                        notify: should_notify(bootstrap, kind, tracked_before),
                        event: Event {
                            repo: repo_view.clone(),
                            kind,
                            member,
                        },
                    });
                }
                snapshot.commit(key, kind, next);
            }
        }
    }

    // Notifying
    console::step(3, 5, "Notify - Rendering and sending notifications");
    let mut context = RunContext::new();
    let mut messages = Vec::new();
    for entry in pending.iter().filter(|p| p.notify) {
        let profile = if should_enrich(
            entry.event.kind,
            messages.len(),
            config.notify.max_notifications,
        ) {
            context.profile(&client, &entry.event.member.identity).await
        } else {
            None
        };
        messages.push(render(&entry.event, profile.as_ref()));
    }

    let suppressed = pending.len() - messages.len();
    if bootstrap {
        log::info!("Initial run: indexed {events_found} existing members, notifications suppressed");
    } else if suppressed > 0 {
        log::info!("{suppressed} event(s) counted but held back by notification policy");
    }

    let planned = plan(
        messages,
        config.notify.max_notifications,
        &config.notify.run_log_url,
    );
    let notifications_sent = if planned.is_empty() {
        0
    } else {
        let notifier = Notifier::new(
            credentials.webhook_url.clone(),
            config.fetch.timeout_secs,
            dry_run,
        )?;
        notifier.send_all(&planned).await
    };

    // Persisting
    console::step(4, 5, "Persist - Writing snapshot");
    persist_phase(&store, &mut snapshot, dry_run).await?;

    // Done
    console::step(5, 5, "Done");
    Ok(RunStats {
        start_time,
        end_time: Utc::now(),
        repo_count: repos.len(),
        events_found,
        notifications_sent,
        fetch_failures,
        suspicious_empties,
        bootstrap,
    })
}

/// Whether a message at this position merits a profile lookup: only
/// user-identity kinds, and only within the notification cap, since
/// everything past the cap collapses into the summary message.
fn should_enrich(kind: CollectionKind, position: usize, cap: usize) -> bool {
    if position >= cap {
        return false;
    }
    matches!(
        kind,
        CollectionKind::Stargazers | CollectionKind::Watchers
    )
}

/// Write the snapshot, unless this is a dry run.
///
/// A dry run leaves the snapshot untouched so that members first seen
/// during it are still notified by the next real run.
async fn persist_phase(
    store: &SnapshotStore,
    snapshot: &mut Snapshot,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        log::info!("Dry run: snapshot left untouched");
        return Ok(());
    }
    store.persist(snapshot).await
}

/// Whether an event for this (kind, tracking) situation may be rendered.
///
/// Bootstrap runs suppress everything; dependents additionally stay quiet
/// the first time the kind is tracked for a repo, so enabling the feature
/// on an existing deployment does not announce every pre-existing
/// dependent.
fn should_notify(bootstrap: bool, kind: CollectionKind, tracked_before: bool) -> bool {
    if bootstrap {
        return false;
    }
    match kind {
        CollectionKind::Dependents => tracked_before,
        _ => true,
    }
}

/// Fetch all public repositories of the configured organization.
async fn org_repos(client: &GithubClient, config: &Config) -> Result<Vec<Repo>> {
    let url = client.api_url(&format!(
        "/orgs/{}/repos?type=public&per_page={}",
        config.github.org, config.github.per_page
    ));
    let descriptor = FetchDescriptor::new(url, ACCEPT_JSON, config.fetch.max_retries);
    let records = client.fetch_paginated(&descriptor).await?;

    let mut repos = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::from_value::<Repo>(record) {
            Ok(repo) => repos.push(repo),
            Err(error) => log::warn!("Skipping malformed repository record: {error}"),
        }
    }
    Ok(repos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_suppresses_all_kinds() {
        for kind in CollectionKind::ALL {
            assert!(!should_notify(true, kind, true));
            assert!(!should_notify(true, kind, false));
        }
    }

    #[test]
    fn test_dependents_gated_on_prior_tracking() {
        assert!(!should_notify(false, CollectionKind::Dependents, false));
        assert!(should_notify(false, CollectionKind::Dependents, true));
    }

    #[test]
    fn test_other_kinds_ignore_tracking_flag() {
        assert!(should_notify(false, CollectionKind::Stargazers, false));
        assert!(should_notify(false, CollectionKind::Forks, false));
        assert!(should_notify(false, CollectionKind::Watchers, false));
    }

    #[test]
    fn test_enrichment_stops_at_the_notification_cap() {
        assert!(should_enrich(CollectionKind::Stargazers, 0, 20));
        assert!(should_enrich(CollectionKind::Watchers, 19, 20));
        // Positions past the cap collapse into the summary message and
        // get no lookup.
        assert!(!should_enrich(CollectionKind::Stargazers, 20, 20));
        assert!(!should_enrich(CollectionKind::Stargazers, 500, 20));
    }

    #[test]
    fn test_repo_identity_kinds_are_never_enriched() {
        assert!(!should_enrich(CollectionKind::Forks, 0, 20));
        assert!(!should_enrich(CollectionKind::Dependents, 0, 20));
    }

    #[tokio::test]
    async fn test_dry_run_leaves_snapshot_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = SnapshotStore::new(&path);

        let mut snapshot = Snapshot::default();
        snapshot.commit(
            "o/r",
            CollectionKind::Stargazers,
            std::collections::BTreeSet::from(["a".to_string()]),
        );

        persist_phase(&store, &mut snapshot, true).await.unwrap();
        assert!(!path.exists());
        assert!(snapshot.last_run.is_none());

        persist_phase(&store, &mut snapshot, false).await.unwrap();
        assert!(path.exists());
        assert!(snapshot.last_run.is_some());
    }

    #[test]
    fn test_fetch_results_sort_into_notification_order() {
        let mut results: Vec<(usize, CollectionKind, Result<Vec<MemberRecord>>)> = vec![
            (1, CollectionKind::Stargazers, Ok(Vec::new())),
            (0, CollectionKind::Dependents, Ok(Vec::new())),
            (0, CollectionKind::Stargazers, Ok(Vec::new())),
            (0, CollectionKind::Forks, Ok(Vec::new())),
        ];
        results.sort_by_key(|(idx, kind, _)| (*idx, *kind));

        let order: Vec<_> = results.iter().map(|(idx, kind, _)| (*idx, *kind)).collect();
        assert_eq!(
            order,
            vec![
                (0, CollectionKind::Stargazers),
                (0, CollectionKind::Forks),
                (0, CollectionKind::Dependents),
                (1, CollectionKind::Stargazers),
            ]
        );
    }
}
