// src/fetch/mod.rs

//! Resilient paginated fetching of remote collections.

mod client;
mod dependents;
mod retry;
mod sources;

pub use client::{ACCEPT_JSON, ACCEPT_STAR, FetchDescriptor, GithubClient, parse_next_link};
pub use dependents::DependentSource;
pub use retry::{RetryPolicy, Verdict, parse_retry_after};
pub use sources::{CollectionSource, ForkSource, StargazerSource, WatcherSource, build_sources};
