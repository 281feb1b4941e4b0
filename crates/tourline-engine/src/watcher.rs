//! Polling change detection for tour sources.
//!
//! Keeps a fingerprint (path, size, modification time) of every discovery
//! candidate and reports when it differs from the previous poll. Creating,
//! editing, or deleting a tour file all change the fingerprint.

use crate::paths::DiscoveryLocations;
use std::path::PathBuf;
use std::time::SystemTime;

type Fingerprint = Vec<(PathBuf, u64, Option<SystemTime>)>;

/// Detects changes to tour sources by polling.
///
/// # Example
///
/// ```rust,no_run
/// use tourline_engine::{DiscoveryLocations, TourEngine, TourWatcher};
///
/// let roots = vec![std::path::PathBuf::from("/path/to/workspace")];
/// let mut engine = TourEngine::new(roots.clone());
/// let mut watcher = TourWatcher::new(roots, DiscoveryLocations::default());
/// engine.discover();
///
/// loop {
///     std::thread::sleep(std::time::Duration::from_secs(1));
///     if watcher.poll() {
///         engine.discover();
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TourWatcher {
    roots: Vec<PathBuf>,
    locations: DiscoveryLocations,
    last: Fingerprint,
}

impl TourWatcher {
    /// Create a watcher whose baseline is the current state on disk.
    pub fn new(roots: Vec<PathBuf>, locations: DiscoveryLocations) -> Self {
        let mut watcher = Self {
            roots,
            locations,
            last: Vec::new(),
        };
        watcher.last = watcher.fingerprint();
        watcher
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Number of candidate files in the current baseline.
    pub fn tracked_count(&self) -> usize {
        self.last.len()
    }

    /// Whether anything changed since the last poll. The new state becomes
    /// the baseline either way.
    pub fn poll(&mut self) -> bool {
        let current = self.fingerprint();
        if current == self.last {
            return false;
        }
        tracing::debug!(
            before = self.last.len(),
            after = current.len(),
            "tour sources changed"
        );
        self.last = current;
        true
    }

    /// Swap the watched roots; the next poll compares against the old
    /// baseline, so a root change that adds tours is reported.
    pub fn set_roots(&mut self, roots: Vec<PathBuf>) {
        self.roots = roots;
    }

    fn fingerprint(&self) -> Fingerprint {
        self.roots
            .iter()
            .flat_map(|root| self.locations.candidates(root))
            .map(|path| {
                let meta = std::fs::metadata(&path).ok();
                let len = meta.as_ref().map_or(0, |m| m.len());
                let modified = meta.and_then(|m| m.modified().ok());
                (path, len, modified)
            })
            .collect()
    }
}
