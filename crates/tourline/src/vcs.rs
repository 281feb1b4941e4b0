use crate::address::HistoricalAddress;
use std::path::{Path, PathBuf};

/// Errors from a version-control backend.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("not a repository: {0}")]
    NotARepository(PathBuf),

    #[error("ref not found: {0}")]
    RefNotFound(String),

    #[error("{path} does not exist at {git_ref}")]
    PathNotFound { path: PathBuf, git_ref: String },

    #[error("backend error: {0}")]
    Backend(String),
}

/// Whether a ref is a branch or a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Branch,
    Tag,
}

/// The checked-out position of a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Head {
    /// Branch name; `None` when detached.
    pub name: Option<String>,
    /// Full commit id; `None` on an unborn branch.
    pub commit: Option<String>,
}

/// A named branch or tag and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    pub name: String,
    pub commit: Option<String>,
    pub kind: RefKind,
}

/// Snapshot of a repository's HEAD and refs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryState {
    pub head: Option<Head>,
    pub refs: Vec<GitRef>,
}

impl RepositoryState {
    /// Commit a named ref currently points at.
    pub fn ref_commit(&self, name: &str) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.name == name)
            .and_then(|r| r.commit.as_deref())
    }

    /// Tag names, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self
            .refs
            .iter()
            .filter(|r| r.kind == RefKind::Tag)
            .map(|r| r.name.as_str())
            .collect();
        tags.sort_unstable();
        tags
    }
}

/// One repository, as seen by tour content resolution.
pub trait VcsRepository {
    /// Current HEAD and refs.
    fn state(&self) -> Result<RepositoryState, VcsError>;

    /// Address of `path` as of `git_ref`.
    fn historical_address(&self, path: &Path, git_ref: &str) -> HistoricalAddress;

    /// Read the text stored at a historical address.
    fn read_at(&self, address: &HistoricalAddress) -> Result<String, VcsError>;
}

/// Locates the repository that owns a path.
///
/// Returning `None` means "not under version control" and is never an error.
pub trait VcsProvider {
    fn repository(&self, path: &Path) -> Option<Box<dyn VcsRepository>>;
}

/// Provider used when no version-control backend is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVcs;

impl VcsProvider for NoVcs {
    fn repository(&self, _path: &Path) -> Option<Box<dyn VcsRepository>> {
        None
    }
}
