// src/pipeline/mod.rs

//! Reconciliation and notification pipeline.

pub mod notify;
pub mod reconcile;
pub mod run;

pub use notify::{MatrixMessage, Notifier, RunContext, plan, render};
pub use reconcile::{Outcome, reconcile};
pub use run::run;
