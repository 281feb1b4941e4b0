#![doc = include_str!("../README.md")]

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use git2::{ObjectType, Oid, Repository};
use std::path::{Path, PathBuf};
use tourline::v1::{
    GitRef, Head, HistoricalAddress, NO_PIN_REF, RefKind, RepositoryState, VcsError, VcsProvider,
    VcsRepository,
};

// ============================================================================
// Provider
// ============================================================================

/// [`VcsProvider`] backed by libgit2.
///
/// Any path inside a worktree (file or directory, existing or not) resolves
/// to the repository that owns it.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitProvider;

impl GitProvider {
    pub fn new() -> Self {
        Self
    }
}

impl VcsProvider for GitProvider {
    fn repository(&self, path: &Path) -> Option<Box<dyn VcsRepository>> {
        match GitRepository::discover(path) {
            Ok(repo) => Some(Box::new(repo)),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no git repository");
                None
            }
        }
    }
}

// ============================================================================
// Repository
// ============================================================================

/// A git repository opened for tour resolution.
pub struct GitRepository {
    repo: Repository,
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl GitRepository {
    /// Find the repository containing `path`, searching upward.
    pub fn discover(path: &Path) -> Result<Self> {
        let start = nearest_existing_dir(path)
            .with_context(|| format!("no existing ancestor for {}", path.display()))?;
        let repo = Repository::discover(&start)
            .with_context(|| format!("no repository at {}", start.display()))?;
        Ok(Self { repo })
    }

    pub fn from_repository(repo: Repository) -> Self {
        Self { repo }
    }

    pub fn inner(&self) -> &Repository {
        &self.repo
    }

    /// HEAD plus every local branch and tag.
    pub fn read_state(&self) -> Result<RepositoryState> {
        Ok(RepositoryState {
            head: Some(read_head(&self.repo)?),
            refs: read_refs(&self.repo)?,
        })
    }

    /// Text of `path` as of `git_ref`.
    pub fn read_file_at(&self, path: &Path, git_ref: &str) -> std::result::Result<String, VcsError> {
        let object = self
            .repo
            .revparse_single(git_ref)
            .map_err(|_| VcsError::RefNotFound(git_ref.to_string()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|e| VcsError::Backend(e.to_string()))?;
        let tree = commit
            .tree()
            .map_err(|e| VcsError::Backend(e.to_string()))?;

        let not_found = || VcsError::PathNotFound {
            path: path.to_path_buf(),
            git_ref: git_ref.to_string(),
        };
        let relative = self.worktree_relative(path).ok_or_else(not_found)?;
        let entry = tree.get_path(&relative).map_err(|_| not_found())?;
        if entry.kind() != Some(ObjectType::Blob) {
            return Err(not_found());
        }
        let blob = self
            .repo
            .find_blob(entry.id())
            .map_err(|e| VcsError::Backend(e.to_string()))?;
        Ok(String::from_utf8_lossy(blob.content()).into_owned())
    }

    fn worktree_relative(&self, path: &Path) -> Option<PathBuf> {
        let workdir = self.repo.workdir()?;
        if path.is_relative() {
            return Some(path.to_path_buf());
        }
        if let Ok(rel) = path.strip_prefix(workdir) {
            return Some(rel.to_path_buf());
        }
        // Symlinked temp dirs and the like: compare canonical forms.
        let workdir = workdir.canonicalize().ok()?;
        let parent = nearest_existing_dir(path)?.canonicalize().ok()?;
        let suffix = path.strip_prefix(nearest_existing_dir(path)?).ok()?;
        parent
            .join(suffix)
            .strip_prefix(&workdir)
            .ok()
            .map(Path::to_path_buf)
    }
}

impl VcsRepository for GitRepository {
    fn state(&self) -> std::result::Result<RepositoryState, VcsError> {
        self.read_state()
            .map_err(|e| VcsError::Backend(format!("{:#}", e)))
    }

    fn historical_address(&self, path: &Path, git_ref: &str) -> HistoricalAddress {
        HistoricalAddress::new(path, git_ref)
    }

    fn read_at(&self, address: &HistoricalAddress) -> std::result::Result<String, VcsError> {
        self.read_file_at(&address.path, &address.git_ref)
    }
}

// ============================================================================
// Ref choices
// ============================================================================

/// A ref a new tour can be pinned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefChoice {
    pub label: String,
    pub description: String,
    /// Value stored in the tour's `ref` field.
    pub git_ref: String,
}

/// Choices offered when recording a tour: no pin, the current branch, the
/// current commit, then every tag in name order.
pub fn ref_choices(repo: &GitRepository) -> Result<Vec<RefChoice>> {
    let state = repo.read_state()?;
    let head = state.head.clone().unwrap_or_default();

    let mut choices = vec![RefChoice {
        label: "None".to_string(),
        description: "Apply the tour to all versions of this repository".to_string(),
        git_ref: NO_PIN_REF.to_string(),
    }];

    if let Some(branch) = &head.name {
        choices.push(RefChoice {
            label: format!("Current branch ({})", branch),
            description: "Apply the tour to all versions of this branch".to_string(),
            git_ref: branch.clone(),
        });
    }

    if let Some(commit) = &head.commit {
        choices.push(RefChoice {
            label: format!("Current commit ({})", safe_prefix(commit, 8)),
            description: "Keep the tour associated with a specific commit".to_string(),
            git_ref: commit.clone(),
        });
    }

    for tag in state.tags() {
        choices.push(RefChoice {
            label: format!("Tag {}", tag),
            description: "Keep the tour associated with a specific tag".to_string(),
            git_ref: tag.to_string(),
        });
    }

    Ok(choices)
}

/// Summary information about a local branch or tag.
#[derive(Debug, Clone)]
pub struct RefInfo {
    /// Short ref name (e.g., "main", "v1.0").
    pub name: String,
    pub kind: RefKind,
    /// Short (8-char) hex of the target commit.
    pub head_short: String,
    /// Full hex OID of the target commit.
    pub head: String,
    /// First line of the target commit message.
    pub subject: String,
    /// ISO 8601 timestamp of the target commit.
    pub timestamp: String,
}

/// List local branches and tags with summary metadata, sorted by name.
pub fn list_refs(repo: &GitRepository) -> Result<Vec<RefInfo>> {
    let repo = &repo.repo;
    let mut refs = Vec::new();

    for reference in repo.references()? {
        let reference = reference?;
        let kind = if reference.is_branch() {
            RefKind::Branch
        } else if reference.is_tag() {
            RefKind::Tag
        } else {
            continue;
        };
        let Some(name) = reference.shorthand() else {
            continue;
        };
        let Ok(commit) = reference.peel_to_commit() else {
            continue;
        };

        let time = commit.time();
        let timestamp = DateTime::<Utc>::from_timestamp(time.seconds(), 0)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string());

        let subject = commit
            .message()
            .unwrap_or("")
            .lines()
            .next()
            .unwrap_or("")
            .to_string();

        refs.push(RefInfo {
            name: name.to_string(),
            kind,
            head_short: short_oid(commit.id()),
            head: commit.id().to_string(),
            subject,
            timestamp,
        });
    }

    refs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(refs)
}

// ============================================================================
// Private helpers
// ============================================================================

fn read_head(repo: &Repository) -> Result<Head> {
    match repo.head() {
        Ok(head) => {
            let name = if head.is_branch() {
                head.shorthand().map(str::to_string)
            } else {
                None
            };
            let commit = head.peel_to_commit().ok().map(|c| c.id().to_string());
            Ok(Head { name, commit })
        }
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
            // HEAD names a branch with no commits yet.
            let head_ref = repo.find_reference("HEAD")?;
            let name = head_ref
                .symbolic_target()
                .map(|t| t.trim_start_matches("refs/heads/").to_string());
            Ok(Head { name, commit: None })
        }
        Err(e) => Err(e).context("failed to read HEAD"),
    }
}

fn read_refs(repo: &Repository) -> Result<Vec<GitRef>> {
    let mut refs = Vec::new();
    for reference in repo.references()? {
        let reference = reference?;
        let kind = if reference.is_branch() {
            RefKind::Branch
        } else if reference.is_tag() {
            RefKind::Tag
        } else {
            continue;
        };
        let Some(name) = reference.shorthand() else {
            continue;
        };
        let commit = reference
            .peel_to_commit()
            .ok()
            .map(|c| c.id().to_string());
        refs.push(GitRef {
            name: name.to_string(),
            commit,
            kind,
        });
    }
    Ok(refs)
}

fn nearest_existing_dir(path: &Path) -> Option<PathBuf> {
    let mut current = Some(path);
    while let Some(p) = current {
        if p.is_dir() {
            return Some(p.to_path_buf());
        }
        current = p.parent();
    }
    None
}

fn short_oid(oid: Oid) -> String {
    safe_prefix(&oid.to_string(), 8)
}

/// Return the first `n` characters of a string, safe for any UTF-8 content.
fn safe_prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── helpers ────────────────────────────────────────────────────────

    #[test]
    fn test_safe_prefix_ascii() {
        assert_eq!(safe_prefix("abcdef12345", 8), "abcdef12");
    }

    #[test]
    fn test_safe_prefix_multibyte() {
        assert_eq!(safe_prefix("日本語テスト", 3), "日本語");
    }

    #[test]
    fn test_short_oid() {
        let oid = Oid::from_str("abcdef1234567890abcdef1234567890abcdef12").unwrap();
        assert_eq!(short_oid(oid), "abcdef12");
    }

    // ── Integration tests with temp git repo ───────────────────────────

    fn init_temp_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();

        (dir, repo)
    }

    fn create_commit(
        repo: &Repository,
        message: &str,
        file_name: &str,
        content: &str,
        parent: Option<&git2::Commit>,
    ) -> Oid {
        let mut index = repo.index().unwrap();
        let file_path = repo.workdir().unwrap().join(file_name);
        if let Some(dir) = file_path.parent() {
            std::fs::create_dir_all(dir).unwrap();
        }
        std::fs::write(&file_path, content).unwrap();
        index.add_path(Path::new(file_name)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = repo.signature().unwrap();
        let parents: Vec<&git2::Commit> = parent.into_iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    #[test]
    fn test_provider_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GitProvider::new().repository(dir.path()).is_none());
    }

    #[test]
    fn test_provider_discovers_from_missing_file() {
        let (dir, repo) = init_temp_repo();
        create_commit(&repo, "initial", "a.txt", "one", None);
        let found = GitProvider::new().repository(&dir.path().join("src/not-yet.rs"));
        assert!(found.is_some());
    }

    #[test]
    fn test_state_reports_head_and_refs() {
        let (dir, repo) = init_temp_repo();
        let oid = create_commit(&repo, "initial", "a.txt", "one", None);
        let commit = repo.find_commit(oid).unwrap();
        repo.tag_lightweight("v1", commit.as_object(), false)
            .unwrap();
        repo.branch("feature", &commit, false).unwrap();

        let git = GitRepository::discover(dir.path()).unwrap();
        let state = git.read_state().unwrap();
        let head = state.head.clone().unwrap();
        assert_eq!(head.commit.as_deref(), Some(oid.to_string().as_str()));
        assert!(matches!(head.name.as_deref(), Some("main") | Some("master")));

        assert_eq!(state.ref_commit("v1"), Some(oid.to_string().as_str()));
        assert_eq!(state.ref_commit("feature"), Some(oid.to_string().as_str()));
        assert_eq!(state.tags(), vec!["v1"]);
    }

    #[test]
    fn test_state_unborn_branch() {
        let (dir, _repo) = init_temp_repo();
        let git = GitRepository::discover(dir.path()).unwrap();
        let head = git.read_state().unwrap().head.unwrap();
        assert!(head.commit.is_none());
        assert!(head.name.is_some());
    }

    #[test]
    fn test_annotated_tag_peels_to_commit() {
        let (dir, repo) = init_temp_repo();
        let oid = create_commit(&repo, "initial", "a.txt", "one", None);
        let commit = repo.find_commit(oid).unwrap();
        let sig = repo.signature().unwrap();
        repo.tag("v2", commit.as_object(), &sig, "release", false)
            .unwrap();

        let git = GitRepository::discover(dir.path()).unwrap();
        let state = git.read_state().unwrap();
        assert_eq!(state.ref_commit("v2"), Some(oid.to_string().as_str()));
    }

    #[test]
    fn test_read_file_at_tag() {
        let (dir, repo) = init_temp_repo();
        let oid1 = create_commit(&repo, "first", "src/a.txt", "old", None);
        let c1 = repo.find_commit(oid1).unwrap();
        repo.tag_lightweight("v1", c1.as_object(), false).unwrap();
        create_commit(&repo, "second", "src/a.txt", "new", Some(&c1));

        let git = GitRepository::discover(dir.path()).unwrap();
        let path = dir.path().join("src/a.txt");
        assert_eq!(git.read_file_at(&path, "v1").unwrap(), "old");
        assert_eq!(git.read_file_at(&path, "HEAD").unwrap(), "new");

        let addr = git.historical_address(&path, "v1");
        assert_eq!(git.read_at(&addr).unwrap(), "old");
    }

    #[test]
    fn test_read_file_at_unknown_ref() {
        let (dir, repo) = init_temp_repo();
        create_commit(&repo, "first", "a.txt", "x", None);
        let git = GitRepository::discover(dir.path()).unwrap();
        let err = git
            .read_file_at(&dir.path().join("a.txt"), "no-such-ref")
            .unwrap_err();
        assert!(matches!(err, VcsError::RefNotFound(_)));
    }

    #[test]
    fn test_read_file_at_missing_path() {
        let (dir, repo) = init_temp_repo();
        create_commit(&repo, "first", "a.txt", "x", None);
        let git = GitRepository::discover(dir.path()).unwrap();
        let err = git
            .read_file_at(&dir.path().join("b.txt"), "HEAD")
            .unwrap_err();
        assert!(matches!(err, VcsError::PathNotFound { .. }));
    }

    #[test]
    fn test_ref_choices() {
        let (dir, repo) = init_temp_repo();
        let oid = create_commit(&repo, "initial", "a.txt", "one", None);
        let commit = repo.find_commit(oid).unwrap();
        repo.tag_lightweight("v2", commit.as_object(), false)
            .unwrap();
        repo.tag_lightweight("v1", commit.as_object(), false)
            .unwrap();

        let git = GitRepository::discover(dir.path()).unwrap();
        let choices = ref_choices(&git).unwrap();
        let refs: Vec<&str> = choices.iter().map(|c| c.git_ref.as_str()).collect();
        assert_eq!(refs[0], "HEAD");
        assert!(matches!(refs[1], "main" | "master"));
        assert_eq!(refs[2], oid.to_string());
        assert_eq!(&refs[3..], &["v1", "v2"]);
    }

    #[test]
    fn test_list_refs_sorted() {
        let (dir, repo) = init_temp_repo();
        let oid = create_commit(&repo, "initial commit", "a.txt", "one", None);
        let commit = repo.find_commit(oid).unwrap();
        repo.branch("b-beta", &commit, false).unwrap();
        repo.branch("a-alpha", &commit, false).unwrap();
        repo.tag_lightweight("v1", commit.as_object(), false)
            .unwrap();

        let git = GitRepository::discover(dir.path()).unwrap();
        let refs = list_refs(&git).unwrap();
        let names: Vec<&str> = refs.iter().map(|r| r.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let tag = refs.iter().find(|r| r.name == "v1").unwrap();
        assert_eq!(tag.kind, RefKind::Tag);
        assert_eq!(tag.subject, "initial commit");
        assert_eq!(tag.head_short.len(), 8);
        assert!(tag.timestamp.ends_with('Z'));
    }
}
