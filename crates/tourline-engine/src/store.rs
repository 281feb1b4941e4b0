use serde::Serialize;
use std::cell::{Ref, RefCell, RefMut};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tourline::v1::{Step, Tour};

/// Shared handle to a loaded tour.
///
/// The canonical set and the active session hold clones of the same handle,
/// so an in-place update made during reconciliation is seen by both.
/// Only the engine mutates through a handle.
#[derive(Debug, Clone)]
pub struct TourHandle(Rc<RefCell<Tour>>);

impl TourHandle {
    pub fn new(tour: Tour) -> Self {
        Self(Rc::new(RefCell::new(tour)))
    }

    pub fn read(&self) -> Ref<'_, Tour> {
        self.0.borrow()
    }

    pub(crate) fn write(&self) -> RefMut<'_, Tour> {
        self.0.borrow_mut()
    }

    pub fn id(&self) -> String {
        self.read().id.clone()
    }

    pub fn title(&self) -> String {
        self.read().title.clone()
    }

    pub fn step_count(&self) -> usize {
        self.read().steps.len()
    }

    pub fn step(&self, index: usize) -> Option<Step> {
        self.read().steps.get(index).cloned()
    }

    /// Owned copy of the tour as it is right now.
    pub fn snapshot(&self) -> Tour {
        self.read().clone()
    }

    /// Whether both handles point at the same live tour.
    pub fn same_as(&self, other: &TourHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Identifies one run of a session.
///
/// Work started on behalf of a session carries its token; when the work
/// finishes, the engine ignores it unless the token is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(pub(crate) u64);

/// The single in-progress tour.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub(crate) tour: TourHandle,
    pub(crate) step: Option<usize>,
    pub(crate) workspace_root: Option<PathBuf>,
    pub(crate) recording: bool,
    pub(crate) can_edit: bool,
    /// The tour file was created by this recording and is discarded if the
    /// recording is cancelled.
    pub(crate) ephemeral: bool,
    pub(crate) token: SessionToken,
}

impl ActiveSession {
    pub fn tour(&self) -> &TourHandle {
        &self.tour
    }

    /// Current step index; `None` when the tour has no steps.
    pub fn step(&self) -> Option<usize> {
        self.step
    }

    /// Current step as a signed number, `-1` meaning "no step".
    pub fn step_number(&self) -> i64 {
        self.step.map_or(-1, |s| s as i64)
    }

    pub fn current_step(&self) -> Option<Step> {
        self.step.and_then(|i| self.tour.step(i))
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn can_edit(&self) -> bool {
        self.can_edit
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn has_previous(&self) -> bool {
        matches!(self.step, Some(i) if i > 0)
    }

    pub fn has_next(&self) -> bool {
        matches!(self.step, Some(i) if i + 1 < self.tour.step_count())
    }

    /// Keep the current index inside the tour after its steps changed.
    pub(crate) fn clamp_step(&mut self) {
        let len = self.tour.step_count();
        self.step = match (self.step, len) {
            (_, 0) => None,
            (None, _) => Some(0),
            (Some(i), len) if i >= len => Some(len - 1),
            (keep, _) => keep,
        };
    }
}

/// Snapshot of the flags UI surfaces key their enablement off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContextFlags {
    pub has_tours: bool,
    pub in_tour: bool,
    pub can_edit_tour: bool,
    pub recording: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(steps: usize, step: Option<usize>) -> ActiveSession {
        let mut tour = Tour::new("T").with_id("t");
        for i in 0..steps {
            tour.steps.push(Step::new(format!("s{}", i)));
        }
        ActiveSession {
            tour: TourHandle::new(tour),
            step,
            workspace_root: None,
            recording: false,
            can_edit: true,
            ephemeral: false,
            token: SessionToken(1),
        }
    }

    #[test]
    fn test_handle_shares_updates() {
        let a = TourHandle::new(Tour::new("Before"));
        let b = a.clone();
        a.write().title = "After".into();
        assert_eq!(b.title(), "After");
        assert!(a.same_as(&b));
        assert!(!a.same_as(&TourHandle::new(Tour::new("After"))));
    }

    #[test]
    fn test_step_number_sentinel() {
        assert_eq!(session(0, None).step_number(), -1);
        assert_eq!(session(3, Some(2)).step_number(), 2);
    }

    #[test]
    fn test_has_previous_next() {
        let s = session(3, Some(0));
        assert!(!s.has_previous());
        assert!(s.has_next());
        let s = session(3, Some(2));
        assert!(s.has_previous());
        assert!(!s.has_next());
        let s = session(0, None);
        assert!(!s.has_previous());
        assert!(!s.has_next());
    }

    #[test]
    fn test_clamp_step() {
        let mut s = session(2, Some(5));
        s.clamp_step();
        assert_eq!(s.step, Some(1));

        let mut s = session(0, Some(0));
        s.clamp_step();
        assert_eq!(s.step, None);

        let mut s = session(2, None);
        s.clamp_step();
        assert_eq!(s.step, Some(0));

        let mut s = session(3, Some(1));
        s.clamp_step();
        assert_eq!(s.step, Some(1));
    }

    #[test]
    fn test_current_step() {
        let s = session(2, Some(1));
        assert_eq!(s.current_step().unwrap().description, "s1");
        assert!(session(0, None).current_step().is_none());
    }
}
