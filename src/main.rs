// src/main.rs

//! starwatch: GitHub organization collection watcher CLI
//!
//! Polls stargazers, forks, watchers and dependents for every public
//! repository of an organization, diffs against the persisted snapshot and
//! notifies a Matrix webhook about new members.

use std::path::Path;

use clap::{Parser, Subcommand};

use starwatch::config::{Credentials, load_config};
use starwatch::error::Result;
use starwatch::models::CollectionKind;
use starwatch::pipeline;
use starwatch::state::SnapshotStore;
use starwatch::utils::log as console;

#[derive(Parser, Debug)]
#[command(
    name = "starwatch",
    version,
    about = "GitHub organization collection watcher"
)]

/// CLI Arguments
struct Cli {
    #[arg(short, long, default_value = "data/config.toml")]
    config: String,

    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

/// CLI Commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Poll all collections, notify new members, update the snapshot
    Run {
        /// Render and log notifications without delivering them or
        /// updating the snapshot
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate configuration and credentials
    Validate,
    /// Print a summary of the persisted snapshot
    ShowState,
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(Path::new(&cli.config));

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.logging.level),
    )
    .init();

    match cli.command {
        Command::Run { dry_run } => {
            config.validate()?;
            let credentials = Credentials::from_env()?;
            if !dry_run {
                credentials.require_webhook()?;
            }

            if !cli.quiet {
                console::header("starwatch - polling collections");
            }

            let stats = pipeline::run(&config, &credentials, dry_run).await?;

            if !cli.quiet {
                console::summary(
                    "Run complete",
                    &[
                        ("Repositories", stats.repo_count.to_string()),
                        ("New-member events", stats.events_found.to_string()),
                        ("Notifications sent", stats.notifications_sent.to_string()),
                        ("Fetch failures", stats.fetch_failures.to_string()),
                        ("Suspicious empties", stats.suspicious_empties.to_string()),
                        ("Bootstrap", stats.bootstrap.to_string()),
                        ("Duration (s)", stats.duration_secs().to_string()),
                    ],
                );
            }
        }
        Command::Validate => {
            config.validate()?;
            Credentials::from_env()?;
            console::success("Configuration and credentials look valid");
        }
        Command::ShowState => {
            let store = SnapshotStore::new(&config.state.file);
            let snapshot = store.load().await?;

            match snapshot.last_run {
                Some(ts) => console::success(&format!("Last run: {ts}")),
                None => console::success("No previous run (bootstrap pending)"),
            }
            for (key, sets) in snapshot.repos() {
                let counts: Vec<String> = CollectionKind::ALL
                    .iter()
                    .filter_map(|kind| {
                        sets.get(*kind)
                            .map(|ids| format!("{} {}", ids.len(), kind.as_str()))
                    })
                    .collect();
                console::sub_item(&format!("{}: {}", key, counts.join(", ")));
            }
        }
    }

    Ok(())
}
