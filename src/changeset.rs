use std::fmt;
use std::path::PathBuf;

/// kind of change a diff reports for a file
///
/// closed set: any other diff code is dropped while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
}

impl FileStatus {
    /// map a `--name-status` code, `None` for anything outside A/M/D
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(Self::Added),
            "M" => Some(Self::Modified),
            "D" => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        })
    }
}

/// a single file change between two revisions, fixed once built
#[derive(Debug, Clone)]
pub struct FileChange {
    path: String,
    status: FileStatus,
    clone_dir: PathBuf,
}

impl FileChange {
    pub fn new(path: impl Into<String>, clone_dir: impl Into<PathBuf>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
            clone_dir: clone_dir.into(),
        }
    }

    /// repository-relative, `/` separated
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    /// location of the file inside the clone
    pub fn full_path(&self) -> PathBuf {
        self.clone_dir.join(&self.path)
    }
}

// the full path is derived from the clone root, so it takes no part in equality
impl PartialEq for FileChange {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.status == other.status
    }
}

impl Eq for FileChange {}

/// changes between two revisions of a cloned repository
#[derive(Debug)]
pub struct ChangeSet {
    pub clone_dir: PathBuf,
    pub files: Vec<FileChange>,
}

impl ChangeSet {
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status() == status).count()
    }
}
