mod action;
mod changeset;
mod cli;
mod command;
mod constants;
mod context;
mod git;
mod oauth;
mod tweet;
mod ui;

use crate::action::Registry;
use crate::changeset::FileStatus;
use crate::cli::Cli;
use crate::constants::{TWEET_ACTION, TWEET_ENDPOINT};
use crate::context::RunContext;
use crate::oauth::Credentials;
use crate::tweet::TwitterConfig;
use anyhow::{Context, Result};
use std::time::Duration;

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut ctx = RunContext::from_cli(Cli::parse_args())?;
    let registry = build_registry(ctx.twitter.take(), ctx.cmd_timeout);

    status!("starting gitops-actions in {}", ctx.repo_url);
    info!("base commit SHA: {}", ctx.base_sha);
    info!("event commit SHA: {}", ctx.event_sha);

    let changeset = ctx
        .git()
        .extract(&ctx.extract_request())
        .with_context(|| format!("error collecting changes from {}", ctx.repo_url))?;
    info!(
        "changed files found in {}: {} ({} added, {} modified, {} deleted)",
        changeset.clone_dir.display(),
        changeset.files.len(),
        changeset.count(FileStatus::Added),
        changeset.count(FileStatus::Modified),
        changeset.count(FileStatus::Deleted)
    );

    let actions = action::build_actions(&registry, &ctx.action_dir, &changeset.files)
        .context("error building actions")?;

    if ctx.dry_run {
        for action in &actions {
            info!("would run: {}", action.describe());
        }
        status!("dry run: {} actions not executed", actions.len());
        return Ok(());
    }

    status!("starting executing actions");
    let executed = action::run_actions(&actions).context("error running actions")?;
    status!("total actions executed: {}", executed);

    Ok(())
}

/// register every action kind that is configured
fn build_registry(twitter: Option<Credentials>, timeout: Duration) -> Registry {
    let mut registry = Registry::new();
    match twitter {
        Some(credentials) => {
            registry.add(
                TWEET_ACTION,
                TwitterConfig::new(credentials, TWEET_ENDPOINT, timeout),
            );
        }
        None => warning!("twitter credentials not configured: {} action disabled", TWEET_ACTION),
    }
    registry
}
