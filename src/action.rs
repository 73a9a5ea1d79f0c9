use crate::changeset::{FileChange, FileStatus};
use crate::{info, status, warning};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;

/// a unit of work triggered by a new file under an action folder
pub trait Action {
    /// one-line summary used in logs
    fn describe(&self) -> String;

    fn execute(&self) -> Result<()>;
}

/// builds one action per matched file
pub trait ActionFactory {
    /// `content` holds the file's bytes, `None` for deleted files
    fn new_action(&self, file: FileChange, content: Option<Vec<u8>>) -> Result<Box<dyn Action>>;
}

/// action name to factory table, built once before dispatch
#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, Box<dyn ActionFactory>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// register a factory, replacing any previous one under the same name
    pub fn add(&mut self, name: impl Into<String>, factory: impl ActionFactory + 'static) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ActionFactory> {
        self.factories.get(name).map(Box::as_ref)
    }
}

/// action name for `<action_dir>/<name>/<file...>` paths
///
/// files directly inside the action directory name no action
pub fn action_name<'a>(action_dir: &str, path: &'a str) -> Option<&'a str> {
    let rest = path
        .strip_prefix(action_dir.trim_end_matches('/'))?
        .strip_prefix('/')?;
    let mut segments = rest.split('/');
    let name = segments.next()?;
    segments.next()?;
    Some(name)
}

/// match changed files against the registry and build their actions
///
/// unknown action folders are skipped, but a matched file that cannot be read
/// aborts the whole batch
pub fn build_actions(
    registry: &Registry,
    action_dir: &str,
    files: &[FileChange],
) -> Result<Vec<Box<dyn Action>>> {
    info!("building actions for {} files", files.len());

    let mut actions = Vec::new();
    for file in files {
        let Some(name) = action_name(action_dir, file.path()) else {
            continue;
        };
        let Some(factory) = registry.get(name) else {
            warning!(
                "action {:?} not found in registry: skipping file {}",
                name,
                file.path()
            );
            continue;
        };

        // deleted files no longer exist in the clone
        let content = if file.status() == FileStatus::Deleted {
            None
        } else {
            let full_path = file.full_path();
            let bytes = fs::read(&full_path)
                .with_context(|| format!("failed to read file {}", full_path.display()))?;
            Some(bytes)
        };

        let action = factory
            .new_action(file.clone(), content)
            .with_context(|| format!("failed to build {name} action for {}", file.path()))?;
        info!("{} action created for {} file {}", name, file.status(), file.path());
        actions.push(action);
    }

    Ok(actions)
}

/// execute actions in order, stopping at the first failure
///
/// already executed actions are not rolled back. returns the number executed
pub fn run_actions(actions: &[Box<dyn Action>]) -> Result<usize> {
    let total = actions.len();
    for (index, action) in actions.iter().enumerate() {
        let description = action.describe();
        status!("[{}/{}] {}", index + 1, total, description);
        action
            .execute()
            .with_context(|| format!("action {} of {} failed: {}", index + 1, total, description))?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests;
