//! Public share operator tool
//!
//! Runs share operations directly against a local metadata store, bypassing
//! any gateway. Every command prints its result as JSON on stdout; logs go
//! to stderr.
//!
//! Usage:
//!   pubshare --store shares.db create storage-1!doc-42 --password secret
//!   pubshare --store shares.db list
//!   pubshare --store old.db dump --output shares.jsonl
//!   pubshare --disk /srv/meta load --input shares.jsonl
//!
//! No permission service is attached, so `list` only returns the acting
//! user's own links.

use anyhow::Result;
use clap::Parser;
use pubshare_cli::{execute, load_config, open_storage, Cli};
use pubshare_manager::{DenyAllPermissions, PublicShareManager};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = load_config(cli.config.as_deref())?;
    let storage = open_storage(cli.store.as_deref(), cli.disk.as_deref())?;
    debug!(store = ?cli.store, disk = ?cli.disk, "store opened");

    let manager = PublicShareManager::new(storage, Arc::new(DenyAllPermissions), config);
    let user = cli.acting_user();
    let output = execute(&manager, &user, cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
