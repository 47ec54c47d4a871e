// src/lib.rs

//! starwatch Library

pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod state;
pub mod utils;
