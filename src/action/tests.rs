use super::*;
use anyhow::bail;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use tempfile::TempDir;

type Log = Rc<RefCell<Vec<String>>>;

/// factory recording what it was built from; actions record their execution
struct RecordingFactory {
    label: &'static str,
    built: Log,
    executed: Log,
}

struct RecordingAction {
    description: String,
    fail: bool,
    executed: Log,
}

impl ActionFactory for RecordingFactory {
    fn new_action(&self, file: FileChange, content: Option<Vec<u8>>) -> Result<Box<dyn Action>> {
        let content = content.map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
        self.built
            .borrow_mut()
            .push(format!("{}:{}:{:?}", self.label, file.path(), content));
        Ok(Box::new(RecordingAction {
            description: file.path().to_string(),
            fail: false,
            executed: Rc::clone(&self.executed),
        }))
    }
}

impl Action for RecordingAction {
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn execute(&self) -> Result<()> {
        self.executed.borrow_mut().push(self.description.clone());
        if self.fail {
            bail!("{} exploded", self.description);
        }
        Ok(())
    }
}

fn recording(label: &'static str) -> (RecordingFactory, Log, Log) {
    let built = Log::default();
    let executed = Log::default();
    let factory = RecordingFactory {
        label,
        built: Rc::clone(&built),
        executed: Rc::clone(&executed),
    };
    (factory, built, executed)
}

/// helper to lay files out under a fake clone directory
fn clone_with(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full = temp_dir.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }
    temp_dir
}

fn added(clone_dir: &Path, path: &str) -> FileChange {
    FileChange::new(path, clone_dir, FileStatus::Added)
}

#[test]
fn test_registry_last_write_wins() {
    let (first, first_built, _) = recording("first");
    let (second, second_built, _) = recording("second");
    let mut registry = Registry::new();
    registry.add("tweet", first);
    registry.add("tweet", second);

    assert!(registry.get("missing").is_none());
    let factory = registry.get("tweet").unwrap();
    factory
        .new_action(FileChange::new("x", "/tmp", FileStatus::Added), None)
        .unwrap();

    assert!(first_built.borrow().is_empty());
    assert_eq!(second_built.borrow().len(), 1);
}

#[test]
fn test_action_name() {
    assert_eq!(action_name("go-actions", "go-actions/tweet/file.txt"), Some("tweet"));
    assert_eq!(action_name("go-actions", "go-actions/tweet/nested/file.txt"), Some("tweet"));
    assert_eq!(action_name("go-actions/", "go-actions/tweet/file.txt"), Some("tweet"));
    assert_eq!(action_name("go-actions", "go-actions/file.txt"), None);
    assert_eq!(action_name("go-actions", "go-actions-old/tweet/file.txt"), None);
    assert_eq!(action_name("go-actions", "docs/go-actions/tweet/file.txt"), None);
    assert_eq!(action_name("go-actions", "README.md"), None);
}

#[test]
fn test_dispatch_builds_action_from_file_content() {
    let clone = clone_with(&[("go-actions/tweet/file.txt", "hello")]);
    let (factory, built, _) = recording("tweet");
    let mut registry = Registry::new();
    registry.add("tweet", factory);

    let files = vec![added(clone.path(), "go-actions/tweet/file.txt")];
    let actions = build_actions(&registry, "go-actions", &files).unwrap();

    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].describe(), "go-actions/tweet/file.txt");
    assert_eq!(
        *built.borrow(),
        vec![r#"tweet:go-actions/tweet/file.txt:Some("hello")"#]
    );
}

#[test]
fn test_dispatch_skips_files_naming_no_action() {
    let clone = clone_with(&[
        ("go-actions/file.txt", "top level"),
        ("go-actions/unknown/file.txt", "nobody home"),
        ("src/main.rs", "fn main() {}"),
    ]);
    let (factory, built, _) = recording("tweet");
    let mut registry = Registry::new();
    registry.add("tweet", factory);

    let files = vec![
        added(clone.path(), "go-actions/file.txt"),
        added(clone.path(), "go-actions/unknown/file.txt"),
        added(clone.path(), "src/main.rs"),
    ];
    let actions = build_actions(&registry, "go-actions", &files).unwrap();

    assert!(actions.is_empty());
    assert!(built.borrow().is_empty());
}

#[test]
fn test_dispatch_preserves_order_across_factories() {
    let clone = clone_with(&[
        ("go-actions/tweet/1.txt", "one"),
        ("go-actions/toot/2.txt", "two"),
        ("go-actions/tweet/3.txt", "three"),
    ]);
    let (tweet, tweet_built, _) = recording("tweet");
    let (toot, toot_built, _) = recording("toot");
    let mut registry = Registry::new();
    registry.add("tweet", tweet);
    registry.add("toot", toot);

    let files = vec![
        added(clone.path(), "go-actions/tweet/1.txt"),
        added(clone.path(), "go-actions/toot/2.txt"),
        added(clone.path(), "go-actions/tweet/3.txt"),
    ];
    let actions = build_actions(&registry, "go-actions", &files).unwrap();

    let described: Vec<String> = actions.iter().map(|a| a.describe()).collect();
    assert_eq!(
        described,
        vec!["go-actions/tweet/1.txt", "go-actions/toot/2.txt", "go-actions/tweet/3.txt"]
    );
    assert_eq!(tweet_built.borrow().len(), 2);
    assert_eq!(toot_built.borrow().len(), 1);
}

#[test]
fn test_dispatch_passes_no_content_for_deleted_files() {
    let clone = clone_with(&[]);
    let (factory, built, _) = recording("tweet");
    let mut registry = Registry::new();
    registry.add("tweet", factory);

    let files = vec![FileChange::new(
        "go-actions/tweet/gone.txt",
        clone.path(),
        FileStatus::Deleted,
    )];
    let actions = build_actions(&registry, "go-actions", &files).unwrap();

    assert_eq!(actions.len(), 1);
    assert_eq!(*built.borrow(), vec!["tweet:go-actions/tweet/gone.txt:None"]);
}

#[test]
fn test_dispatch_unreadable_file_aborts_batch() {
    let clone = clone_with(&[("go-actions/tweet/1.txt", "one")]);
    let (factory, _, _) = recording("tweet");
    let mut registry = Registry::new();
    registry.add("tweet", factory);

    let files = vec![
        added(clone.path(), "go-actions/tweet/1.txt"),
        added(clone.path(), "go-actions/tweet/missing.txt"),
    ];
    let err = build_actions(&registry, "go-actions", &files).err().unwrap();

    assert!(err.to_string().contains("missing.txt"), "{err}");
}

fn scripted_actions(count: usize, failing: Option<usize>, executed: &Log) -> Vec<Box<dyn Action>> {
    (1..=count)
        .map(|n| {
            Box::new(RecordingAction {
                description: format!("action-{n}"),
                fail: failing == Some(n),
                executed: Rc::clone(executed),
            }) as Box<dyn Action>
        })
        .collect()
}

#[test]
fn test_run_stops_at_first_failure() {
    let executed = Log::default();
    let actions = scripted_actions(5, Some(3), &executed);

    let err = run_actions(&actions).unwrap_err();

    assert_eq!(*executed.borrow(), vec!["action-1", "action-2", "action-3"]);
    assert_eq!(err.to_string(), "action 3 of 5 failed: action-3");
    assert_eq!(err.root_cause().to_string(), "action-3 exploded");
}

#[test]
fn test_run_executes_everything_in_order() {
    let executed = Log::default();
    let actions = scripted_actions(3, None, &executed);

    assert_eq!(run_actions(&actions).unwrap(), 3);
    assert_eq!(*executed.borrow(), vec!["action-1", "action-2", "action-3"]);
    assert_eq!(run_actions(&[]).unwrap(), 0);
}
