use crate::changeset::{ChangeSet, FileChange, FileStatus};
use crate::command::{self, CommandSpec, ProcessError, ProcessResult};
use crate::debug;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// git invocation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Version,
    Clone,
    Checkout,
    Diff,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Version => "version",
            Self::Clone => "clone",
            Self::Checkout => "checkout",
            Self::Diff => "diff",
        })
    }
}

#[derive(Debug, Error)]
#[error("git {step} failed")]
pub struct GitError {
    pub step: Step,
    #[source]
    pub source: ProcessError,
}

/// which diff shape to ask git for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMode {
    /// `--name-status`: added, modified and deleted files
    NameStatus,
    /// `--diff-filter=A --name-only`: added paths only
    AddedOnly,
}

/// everything needed to clone a repository and diff two revisions
#[derive(Debug)]
pub struct ExtractRequest<'a> {
    pub repo_url: &'a str,
    pub clone_dir: &'a Path,
    pub ref_name: Option<&'a str>,
    pub from: &'a str,
    pub to: &'a str,
    pub mode: DiffMode,
}

/// wrapper around the git binary, every call bounded by `timeout`
#[derive(Debug, Clone)]
pub struct Git {
    program: String,
    prefix_args: Vec<String>,
    timeout: Duration,
}

impl Git {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
            timeout,
        }
    }

    /// arguments placed before every subcommand (e.g. `-c core.quotepath=off`)
    pub fn with_prefix_args(mut self, args: Vec<String>) -> Self {
        self.prefix_args = args;
        self
    }

    fn command(&self) -> CommandSpec {
        self.prefix_args
            .iter()
            .fold(CommandSpec::new(&self.program), |spec, arg| spec.arg(arg))
    }

    fn exec(&self, step: Step, spec: &CommandSpec) -> Result<ProcessResult, GitError> {
        command::run(spec, self.timeout)
            .check()
            .map_err(|source| GitError { step, source })
    }

    /// check git is present and runnable, returning its version line
    pub fn version(&self) -> Result<String, GitError> {
        let result = self.exec(Step::Version, &self.command().arg("version"))?;
        Ok(result.stdout.trim().to_string())
    }

    pub fn clone_repo(&self, repo_url: &str, clone_dir: &Path) -> Result<(), GitError> {
        let spec = self
            .command()
            .arg("clone")
            .arg(repo_url)
            .arg(clone_dir);
        self.exec(Step::Clone, &spec)?;
        Ok(())
    }

    pub fn checkout(&self, clone_dir: &Path, ref_name: &str) -> Result<(), GitError> {
        let spec = self
            .command()
            .arg("checkout")
            .arg(ref_name)
            .current_dir(clone_dir);
        self.exec(Step::Checkout, &spec)?;
        Ok(())
    }

    /// paths added between `from` and `to`
    pub fn added_files(&self, clone_dir: &Path, from: &str, to: &str) -> Result<Vec<String>, GitError> {
        let spec = self
            .command()
            .arg("diff")
            .arg("--diff-filter=A")
            .arg("--name-only")
            .arg(revision_range(from, to))
            .current_dir(clone_dir);
        let result = self.exec(Step::Diff, &spec)?;
        Ok(parse_name_only(&result.stdout))
    }

    /// added, modified and deleted files between `from` and `to`
    pub fn changed_files(&self, clone_dir: &Path, from: &str, to: &str) -> Result<Vec<FileChange>, GitError> {
        let spec = self
            .command()
            .arg("diff")
            .arg("--name-status")
            .arg(revision_range(from, to))
            .current_dir(clone_dir);
        let result = self.exec(Step::Diff, &spec)?;
        Ok(parse_name_status(clone_dir, &result.stdout))
    }

    /// version check, clone, optional checkout, then diff
    ///
    /// stops at the first failing step
    pub fn extract(&self, request: &ExtractRequest) -> Result<ChangeSet, GitError> {
        let version = self.version()?;
        debug!("{}", version);

        self.clone_repo(request.repo_url, request.clone_dir)?;

        if let Some(ref_name) = request.ref_name {
            self.checkout(request.clone_dir, ref_name)?;
        }

        let files = match request.mode {
            DiffMode::NameStatus => {
                self.changed_files(request.clone_dir, request.from, request.to)?
            }
            DiffMode::AddedOnly => self
                .added_files(request.clone_dir, request.from, request.to)?
                .into_iter()
                .map(|path| FileChange::new(path, request.clone_dir, FileStatus::Added))
                .collect(),
        };

        Ok(ChangeSet {
            clone_dir: PathBuf::from(request.clone_dir),
            files,
        })
    }
}

fn revision_range(from: &str, to: &str) -> String {
    format!("{from}..{to}")
}

/// parse `git diff --name-status` output
///
/// only two-field lines with an A, M or D code produce a record; renames,
/// copies and any other code are dropped rather than reported as errors
pub fn parse_name_status(clone_dir: &Path, output: &str) -> Vec<FileChange> {
    let mut files = Vec::new();

    for line in output.split('\n') {
        let fields: Vec<&str> = line.split('\t').collect();
        let [code, path] = fields.as_slice() else {
            if !line.is_empty() {
                debug!("skipping diff line: {:?}", line);
            }
            continue;
        };

        match FileStatus::from_code(code) {
            Some(status) if !path.is_empty() => {
                files.push(FileChange::new(*path, clone_dir, status));
            }
            _ => debug!("skipping diff line: {:?}", line),
        }
    }

    files
}

/// parse `git diff --name-only` output, one path per line
pub fn parse_name_only(output: &str) -> Vec<String> {
    output
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
