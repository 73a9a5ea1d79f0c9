use crate::constants::{
    DEFAULT_ACTION_DIR, DEFAULT_CLONE_DIR, DEFAULT_CMD_TIMEOUT, DEFAULT_GIT_PROGRAM,
};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// gitops-actions: run an action for every new file pushed under an action folder
///
/// every option can also be set through its `GOA_` environment variable
#[derive(Parser, Debug)]
#[command(
    name = "gitops-actions",
    about,
    long_about = None,
    disable_version_flag = true
)]
#[allow(clippy::struct_field_names)]
pub struct Cli {
    /// commit the diff starts from
    #[arg(long, env = "GOA_BASE_SHA")]
    pub base_sha: String,

    /// commit the diff ends at
    #[arg(long, env = "GOA_EVENT_SHA")]
    pub event_sha: String,

    /// ref checked out after cloning
    #[arg(long, env = "GOA_EVENT_REF_NAME")]
    pub event_ref_name: Option<String>,

    /// repository to clone
    #[arg(long, env = "GOA_REPO_URL")]
    pub repo_url: String,

    /// folder whose subfolders name the actions
    #[arg(long, env = "GOA_ACTION_DIR", default_value = DEFAULT_ACTION_DIR)]
    pub action_dir: String,

    /// where the repository is cloned to
    #[arg(long, env = "GOA_CLONE_DIR", default_value = DEFAULT_CLONE_DIR)]
    pub clone_dir: PathBuf,

    /// timeout for each git command (e.g. 40s, 2m); 0s waits forever
    #[arg(
        long,
        env = "GOA_CMD_TIMEOUT",
        default_value = DEFAULT_CMD_TIMEOUT,
        value_parser = humantime::parse_duration
    )]
    pub cmd_timeout: Duration,

    /// git binary, optionally followed by global arguments
    #[arg(long, env = "GOA_GIT_PROGRAM", default_value = DEFAULT_GIT_PROGRAM)]
    pub git_program: String,

    /// only consider added files (`--diff-filter=A`)
    #[arg(long, env = "GOA_ADDED_ONLY")]
    pub added_only: bool,

    /// build and list actions without executing them
    #[arg(long, env = "GOA_DRY_RUN")]
    pub dry_run: bool,

    #[arg(long, env = "GOA_TWITTER_CONSUMER_KEY", hide_env_values = true)]
    pub twitter_consumer_key: Option<String>,

    #[arg(long, env = "GOA_TWITTER_CONSUMER_SECRET", hide_env_values = true)]
    pub twitter_consumer_secret: Option<String>,

    #[arg(long, env = "GOA_TWITTER_ACCESS_TOKEN", hide_env_values = true)]
    pub twitter_access_token: Option<String>,

    #[arg(long, env = "GOA_TWITTER_ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub twitter_access_token_secret: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
