use crate::error::{EngineError, Result};
use std::path::Path;
use tourline::v1::{
    ContentAddress, HistoricalAddress, RepositoryState, Step, Tour, VcsError, VcsProvider,
    join_relative,
};

/// Decides where a step's bytes come from.
///
/// Priority: embedded `contents`, then `uri`, then `file` joined onto the
/// workspace root. A live file address is then pinned to a historical
/// snapshot when the tour's ref is not what the worktree already has
/// checked out.
pub struct RefResolver<'a> {
    vcs: &'a dyn VcsProvider,
    no_pin_ref: &'a str,
}

impl<'a> RefResolver<'a> {
    pub fn new(vcs: &'a dyn VcsProvider, no_pin_ref: &'a str) -> Self {
        Self { vcs, no_pin_ref }
    }

    pub fn resolve(
        &self,
        step: &Step,
        workspace_root: Option<&Path>,
        git_ref: Option<&str>,
    ) -> Result<ContentAddress> {
        if let Some(contents) = &step.contents {
            return Ok(ContentAddress::embedded(step.file.as_deref(), contents.as_str()));
        }

        let live = if let Some(uri) = &step.uri {
            ContentAddress::from_address(uri)
        } else if let Some(file) = &step.file {
            let root = workspace_root.ok_or_else(|| EngineError::NoWorkspaceRoot(file.clone()))?;
            ContentAddress::from_address(&join_relative(&root.to_string_lossy(), file))
        } else {
            return Err(EngineError::StepHasNoLocation);
        };

        Ok(self.pin(live, git_ref))
    }

    fn pin(&self, address: ContentAddress, git_ref: Option<&str>) -> ContentAddress {
        let Some(git_ref) = git_ref.filter(|r| *r != self.no_pin_ref) else {
            return address;
        };
        let ContentAddress::File(path) = &address else {
            return address;
        };
        let Some(repo) = self.vcs.repository(path) else {
            tracing::trace!(path = %path.display(), "not under version control, ref ignored");
            return address;
        };
        let state = match repo.state() {
            Ok(state) => state,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "repository state unavailable, ref ignored");
                return address;
            }
        };

        if worktree_is_at(&state, git_ref) {
            return address;
        }
        ContentAddress::Historical(repo.historical_address(path, git_ref))
    }

    /// Read the text behind an address.
    pub fn read(&self, address: &ContentAddress) -> Result<String> {
        match address {
            ContentAddress::Embedded { contents, .. } => Ok(contents.clone()),
            ContentAddress::File(path) => Ok(std::fs::read_to_string(path)?),
            ContentAddress::Uri(uri) => Err(EngineError::UnsupportedAddress(uri.clone())),
            ContentAddress::Historical(historical) => self.read_historical(historical),
        }
    }

    fn read_historical(&self, address: &HistoricalAddress) -> Result<String> {
        let repo = self
            .vcs
            .repository(&address.path)
            .ok_or_else(|| VcsError::NotARepository(address.path.clone()))?;
        Ok(repo.read_at(address)?)
    }

    /// Self-contained copy of `tour`: every step carries its text in
    /// `contents`, and `id` and `ref` are dropped.
    pub fn export(&self, tour: &Tour, workspace_root: Option<&Path>) -> Result<Tour> {
        let mut exported = tour.clone();
        for step in &mut exported.steps {
            if step.contents.is_some() && step.uri.is_some() {
                continue;
            }
            let address = self.resolve(step, workspace_root, tour.git_ref.as_deref())?;
            step.contents = Some(self.read(&address)?);
        }
        exported.id.clear();
        exported.git_ref = None;
        Ok(exported)
    }
}

/// Whether the worktree already holds the content `git_ref` names.
///
/// True when `git_ref` is the checked-out branch, the HEAD commit, or a
/// branch/tag pointing at the HEAD commit. A repository with no HEAD at all
/// counts as live.
pub fn worktree_is_at(state: &RepositoryState, git_ref: &str) -> bool {
    let Some(head) = &state.head else {
        return true;
    };
    head.name.as_deref() == Some(git_ref)
        || head.commit.as_deref() == Some(git_ref)
        || state.ref_commit(git_ref) == head.commit.as_deref()
}
