use crate::cli::Cli;
use crate::git::{DiffMode, ExtractRequest, Git};
use crate::oauth::Credentials;
use anyhow::{Result, bail};
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

/// settings for one run, resolved from the command line and environment
pub struct RunContext {
    /// commit the diff starts from
    pub base_sha: String,

    /// commit the diff ends at
    pub event_sha: String,

    /// ref to check out after cloning, if any
    pub ref_name: Option<String>,

    pub repo_url: String,

    /// folder whose subfolders name the actions
    pub action_dir: String,

    pub clone_dir: PathBuf,

    /// bound on every git invocation, zero for none
    pub cmd_timeout: Duration,

    /// git binary followed by its global arguments
    git_command: Vec<String>,

    pub diff_mode: DiffMode,

    pub dry_run: bool,

    /// `None` when no twitter credentials were configured
    pub twitter: Option<Credentials>,
}

impl RunContext {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let git_command = match shlex::split(&cli.git_program) {
            Some(words) if !words.is_empty() => words,
            _ => bail!("invalid git program: {:?}", cli.git_program),
        };

        let twitter = twitter_credentials(
            cli.twitter_consumer_key,
            cli.twitter_consumer_secret,
            cli.twitter_access_token,
            cli.twitter_access_token_secret,
        )?;

        Ok(Self {
            base_sha: cli.base_sha,
            event_sha: cli.event_sha,
            ref_name: cli.event_ref_name.filter(|name| !name.is_empty()),
            repo_url: cli.repo_url,
            action_dir: cli.action_dir,
            clone_dir: cli.clone_dir,
            cmd_timeout: cli.cmd_timeout,
            git_command,
            diff_mode: if cli.added_only {
                DiffMode::AddedOnly
            } else {
                DiffMode::NameStatus
            },
            dry_run: cli.dry_run,
            twitter,
        })
    }

    pub fn git(&self) -> Git {
        let (program, args) = self
            .git_command
            .split_first()
            .map_or(("git", &[][..]), |(program, args)| (program.as_str(), args));
        Git::new(program, self.cmd_timeout).with_prefix_args(args.to_vec())
    }

    pub fn extract_request(&self) -> ExtractRequest<'_> {
        ExtractRequest {
            repo_url: &self.repo_url,
            clone_dir: &self.clone_dir,
            ref_name: self.ref_name.as_deref(),
            from: &self.base_sha,
            to: &self.event_sha,
            mode: self.diff_mode,
        }
    }
}

/// all four values or none of them
fn twitter_credentials(
    consumer_key: Option<String>,
    consumer_secret: Option<String>,
    access_token: Option<String>,
    access_token_secret: Option<String>,
) -> Result<Option<Credentials>> {
    match (consumer_key, consumer_secret, access_token, access_token_secret) {
        (None, None, None, None) => Ok(None),
        (Some(consumer_key), Some(consumer_secret), Some(token), Some(token_secret)) => {
            Ok(Some(Credentials {
                consumer_key,
                consumer_secret: SecretString::from(consumer_secret),
                token,
                token_secret: SecretString::from(token_secret),
            }))
        }
        (consumer_key, consumer_secret, access_token, access_token_secret) => {
            let missing: Vec<&str> = [
                ("GOA_TWITTER_CONSUMER_KEY", consumer_key.is_none()),
                ("GOA_TWITTER_CONSUMER_SECRET", consumer_secret.is_none()),
                ("GOA_TWITTER_ACCESS_TOKEN", access_token.is_none()),
                ("GOA_TWITTER_ACCESS_TOKEN_SECRET", access_token_secret.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, is_missing)| is_missing.then_some(name))
            .collect();
            bail!("incomplete twitter credentials, missing {}", missing.join(", "))
        }
    }
}
