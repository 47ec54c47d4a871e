// src/models/mod.rs

//! Domain models for the watcher application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod event;
mod kind;
mod member;
mod repo;

// Re-export all public types
pub use config::{Config, FetchConfig, GithubConfig, LoggingConfig, NotifyConfig, StateConfig};
pub use event::{Event, RunStats};
pub use kind::CollectionKind;
pub use member::{MemberRecord, Profile};
pub use repo::Repo;
