//! API-backed collection sources.
//!
//! Every collection kind hides behind the same [`CollectionSource`]
//! capability, so the reconciler never knows whether members came from the
//! structured API or from page scraping.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{CollectionKind, Config, MemberRecord, Repo};

use super::client::{ACCEPT_JSON, ACCEPT_STAR, FetchDescriptor, GithubClient};
use super::dependents::DependentSource;

/// Uniform "fetch a named collection for a named subject" capability.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// The collection kind this source serves.
    fn kind(&self) -> CollectionKind;

    /// Fetch all current members of this collection for `repo`, in
    /// source order. Any error is a terminal fetch failure for this
    /// (repo, kind) entry.
    async fn members(&self, repo: &Repo) -> Result<Vec<MemberRecord>>;
}

/// Build one source per collection kind, in notification order.
pub fn build_sources(
    client: Arc<GithubClient>,
    config: &Config,
) -> Vec<Arc<dyn CollectionSource>> {
    vec![
        Arc::new(StargazerSource {
            client: Arc::clone(&client),
            per_page: config.github.per_page,
            max_retries: config.fetch.max_retries,
        }),
        Arc::new(ForkSource {
            client: Arc::clone(&client),
            per_page: config.github.per_page,
            max_retries: config.fetch.max_retries,
        }),
        Arc::new(WatcherSource {
            client: Arc::clone(&client),
            per_page: config.github.per_page,
            max_retries: config.fetch.max_retries,
        }),
        Arc::new(DependentSource::new(
            client,
            &config.github.html_base,
            config.fetch.max_retries,
        )),
    ]
}

/// Stargazers of a repository.
pub struct StargazerSource {
    client: Arc<GithubClient>,
    per_page: u32,
    max_retries: u32,
}

#[async_trait]
impl CollectionSource for StargazerSource {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Stargazers
    }

    async fn members(&self, repo: &Repo) -> Result<Vec<MemberRecord>> {
        let url = self.client.api_url(&format!(
            "/repos/{}/stargazers?per_page={}",
            repo.full_name, self.per_page
        ));
        let descriptor = FetchDescriptor::new(url, ACCEPT_STAR, self.max_retries);
        let records = self.client.fetch_paginated(&descriptor).await?;

        // The star+json media type nests the user under "user".
        Ok(extract_members(&records, repo, |record| {
            user_member(record.get("user")?)
        }))
    }
}

/// Forks of a repository; member identity is the fork's `owner/name`.
pub struct ForkSource {
    client: Arc<GithubClient>,
    per_page: u32,
    max_retries: u32,
}

#[async_trait]
impl CollectionSource for ForkSource {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Forks
    }

    async fn members(&self, repo: &Repo) -> Result<Vec<MemberRecord>> {
        let url = self.client.api_url(&format!(
            "/repos/{}/forks?per_page={}",
            repo.full_name, self.per_page
        ));
        let descriptor = FetchDescriptor::new(url, ACCEPT_JSON, self.max_retries);
        let records = self.client.fetch_paginated(&descriptor).await?;

        Ok(extract_members(&records, repo, |record| {
            let full_name = record.get("full_name")?.as_str()?;
            let html_url = record.get("html_url").and_then(Value::as_str)?;
            let mut member = MemberRecord::new(full_name, html_url);
            member.avatar_url = record
                .pointer("/owner/avatar_url")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(member)
        }))
    }
}

/// Watchers (subscribers) of a repository.
pub struct WatcherSource {
    client: Arc<GithubClient>,
    per_page: u32,
    max_retries: u32,
}

#[async_trait]
impl CollectionSource for WatcherSource {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Watchers
    }

    async fn members(&self, repo: &Repo) -> Result<Vec<MemberRecord>> {
        let url = self.client.api_url(&format!(
            "/repos/{}/subscribers?per_page={}",
            repo.full_name, self.per_page
        ));
        let descriptor = FetchDescriptor::new(url, ACCEPT_JSON, self.max_retries);
        let records = self.client.fetch_paginated(&descriptor).await?;

        Ok(extract_members(&records, repo, user_member))
    }
}

/// Turn raw records into member records, skipping malformed entries with
/// a warning instead of failing the whole collection.
fn extract_members(
    records: &[Value],
    repo: &Repo,
    extract: impl Fn(&Value) -> Option<MemberRecord>,
) -> Vec<MemberRecord> {
    let mut members = Vec::with_capacity(records.len());
    for record in records {
        match extract(record) {
            Some(member) => members.push(member),
            None => log::warn!("Skipping malformed member record for {}", repo.full_name),
        }
    }
    members
}

/// Member record from a GitHub user object.
fn user_member(user: &Value) -> Option<MemberRecord> {
    let login = user.get("login")?.as_str()?;
    let html_url = user
        .get("html_url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://github.com/{login}"));
    let mut member = MemberRecord::new(login, html_url);
    member.avatar_url = user
        .get("avatar_url")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(member)
}
