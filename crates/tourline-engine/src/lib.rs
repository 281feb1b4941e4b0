#![doc = include_str!("../README.md")]

#[cfg(feature = "watcher")]
pub mod async_watcher;
pub mod discovery;
pub mod error;
pub mod events;
pub mod io;
pub mod paths;
pub mod reader;
pub mod resolver;
pub mod session;
pub mod store;
pub mod tree;
pub mod watcher;

#[cfg(feature = "watcher")]
pub use async_watcher::{AsyncTourWatcher, WatchEvent, WatcherConfig, WatcherHandle};
pub use discovery::{DiscoveryPass, PublishOutcome, ScanResult, compare_titles, sort_tours};
pub use error::{EngineError, Result};
pub use events::{EndReason, EventBus, TourEvent};
pub use paths::DiscoveryLocations;
pub use reader::{TourReader, tour_id};
pub use resolver::{RefResolver, worktree_is_at};
pub use session::{SaveOutcome, StartOptions, TourProperty};
pub use store::{ActiveSession, ContextFlags, SessionToken, TourHandle};
pub use tree::{TreeNode, status_text, step_label};
pub use watcher::TourWatcher;

use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tourline::v1::{ContentAddress, NO_PIN_REF, NoVcs, Tour, VcsProvider};

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Where tours are discovered under each workspace root.
    pub locations: DiscoveryLocations,
    /// Directory, relative to a workspace root, new recordings are written to.
    pub new_tour_directory: String,
    /// Ref value meaning "not pinned".
    pub no_pin_ref: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locations: DiscoveryLocations::default(),
            new_tour_directory: ".tours".to_string(),
            no_pin_ref: NO_PIN_REF.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_locations(mut self, locations: DiscoveryLocations) -> Self {
        self.locations = locations;
        self
    }

    pub fn with_new_tour_directory<S: Into<String>>(mut self, dir: S) -> Self {
        self.new_tour_directory = dir.into();
        self
    }

    pub fn with_no_pin_ref<S: Into<String>>(mut self, no_pin_ref: S) -> Self {
        self.no_pin_ref = no_pin_ref.into();
        self
    }
}

/// Owner of the canonical tour set and the active session.
///
/// All mutation goes through the engine's methods; collaborators read
/// through the accessors and subscribe to [`TourEvent`]s to learn when to
/// read again. The engine is meant to live on one task; only
/// [`DiscoveryPass`] is handed off to other threads.
///
/// # Example
///
/// ```rust,no_run
/// use tourline_engine::TourEngine;
///
/// let mut engine = TourEngine::new(vec!["/path/to/workspace".into()]);
/// engine.discover();
///
/// for tour in engine.tours() {
///     println!("{} ({} steps)", tour.title(), tour.step_count());
/// }
///
/// if let Some(first) = engine.tours().first().cloned() {
///     engine.start(&first, Default::default())?;
///     engine.step_forward()?;
/// }
/// # Ok::<(), tourline_engine::EngineError>(())
/// ```
pub struct TourEngine {
    config: EngineConfig,
    roots: Vec<PathBuf>,
    vcs: Box<dyn VcsProvider>,
    tours: Vec<TourHandle>,
    pub(crate) active: Option<ActiveSession>,
    started_generation: u64,
    published_generation: u64,
    next_token: u64,
    pub(crate) events: EventBus,
}

impl std::fmt::Debug for TourEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TourEngine")
            .field("roots", &self.roots)
            .field("tours", &self.tours.len())
            .field("active", &self.active.as_ref().map(|a| a.tour.id()))
            .field("published_generation", &self.published_generation)
            .finish()
    }
}

impl TourEngine {
    /// Engine over `roots` with default settings and no version control.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self::with_config(roots, EngineConfig::default())
    }

    pub fn with_config(roots: Vec<PathBuf>, config: EngineConfig) -> Self {
        Self {
            config,
            roots,
            vcs: Box::new(NoVcs),
            tours: Vec::new(),
            active: None,
            started_generation: 0,
            published_generation: 0,
            next_token: 0,
            events: EventBus::new(),
        }
    }

    /// Use `vcs` for ref pinning and historical reads.
    pub fn with_vcs(mut self, vcs: Box<dyn VcsProvider>) -> Self {
        self.vcs = vcs;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// The canonical tour set, sorted by title.
    pub fn tours(&self) -> &[TourHandle] {
        &self.tours
    }

    pub fn has_tours(&self) -> bool {
        !self.tours.is_empty()
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.recording)
    }

    pub fn context(&self) -> ContextFlags {
        ContextFlags {
            has_tours: self.has_tours(),
            in_tour: self.active.is_some(),
            can_edit_tour: self.active.as_ref().is_some_and(|a| a.can_edit),
            recording: self.is_recording(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TourEvent> {
        self.events.subscribe()
    }

    pub fn find_tour(&self, id: &str) -> Option<&TourHandle> {
        self.tours.iter().find(|t| t.read().id == id)
    }

    /// First tour with exactly this title.
    pub fn find_by_title(&self, title: &str) -> Option<&TourHandle> {
        self.tours.iter().find(|t| t.read().title == title)
    }

    /// The workspace root a path lives under; the deepest one wins.
    pub fn workspace_root_for(&self, path: &Path) -> Option<PathBuf> {
        self.roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .cloned()
    }

    /// Replace the workspace roots and rediscover.
    pub fn set_workspace_roots(&mut self, roots: Vec<PathBuf>) -> PublishOutcome {
        tracing::info!(roots = roots.len(), "workspace roots changed");
        self.roots = roots;
        self.discover()
    }

    // ── Discovery ───────────────────────────────────────────────────

    /// Start a pass under a new generation. The pass can be scanned on any
    /// thread; hand its result back to [`TourEngine::publish`].
    pub fn begin_discovery(&mut self) -> DiscoveryPass {
        self.started_generation += 1;
        DiscoveryPass::new(
            self.started_generation,
            self.roots.clone(),
            self.config.locations.clone(),
        )
    }

    /// Scan and publish in one go.
    pub fn discover(&mut self) -> PublishOutcome {
        let pass = self.begin_discovery();
        self.publish(pass.scan())
    }

    /// Replace the canonical set with a scan's tours and reconcile the
    /// active session against it.
    ///
    /// If the active tour is still present and differs, the session's tour
    /// is updated in place and the new set shares its handle. If it is gone,
    /// the session ends. A result from a pass older than the last published
    /// one changes nothing.
    pub fn publish(&mut self, result: ScanResult) -> PublishOutcome {
        let generation = result.generation();
        if generation <= self.published_generation {
            tracing::debug!(
                generation,
                current = self.published_generation,
                "discarding stale discovery pass"
            );
            return PublishOutcome::Stale {
                generation,
                current: self.published_generation,
            };
        }
        self.published_generation = generation;

        let mut tours: Vec<TourHandle> = result
            .into_tours()
            .into_iter()
            .map(TourHandle::new)
            .collect();
        let mut session_updated = false;
        let mut session_ended = false;

        if let Some(active) = &mut self.active {
            let id = active.tour.id();
            match tours.iter_mut().find(|t| t.read().id == id) {
                Some(slot) => {
                    if *slot.read() != *active.tour.read() {
                        active.tour.write().assign_from(&slot.read());
                        active.clamp_step();
                        session_updated = true;
                    }
                    *slot = active.tour.clone();
                }
                None => session_ended = true,
            }
        }

        self.tours = tours;
        let count = self.tours.len();
        tracing::info!(generation, count, "published tours");
        self.events.publish(TourEvent::ToursChanged {
            count,
            has_tours: count > 0,
        });

        if session_updated && let Some(active) = &self.active {
            tracing::info!(tour = %active.tour.id(), "active tour changed on disk");
            self.events.publish(TourEvent::TourUpdated {
                tour_id: active.tour.id(),
            });
        }
        if session_ended {
            self.end_with(EndReason::SourceRemoved);
        }

        PublishOutcome::Published {
            count,
            session_updated,
            session_ended,
        }
    }

    // ── Content ─────────────────────────────────────────────────────

    pub fn resolver(&self) -> RefResolver<'_> {
        RefResolver::new(self.vcs.as_ref(), &self.config.no_pin_ref)
    }

    /// Workspace root steps of `tour` resolve against: the active session's
    /// root when `tour` is active, otherwise the root containing its source.
    pub fn root_for_tour(&self, tour: &TourHandle) -> Option<PathBuf> {
        if let Some(active) = &self.active
            && active.tour.same_as(tour)
            && let Some(root) = &active.workspace_root
        {
            return Some(root.clone());
        }
        self.workspace_root_for(Path::new(&tour.read().id))
    }

    /// Content address for step `index` of `tour`.
    pub fn resolve_step(&self, tour: &TourHandle, index: usize) -> Result<ContentAddress> {
        let len = tour.step_count();
        let step = tour.step(index).ok_or(EngineError::StepOutOfRange {
            index: index as i64,
            len,
        })?;
        let root = self.root_for_tour(tour);
        let git_ref = tour.read().git_ref.clone();
        self.resolver()
            .resolve(&step, root.as_deref(), git_ref.as_deref())
    }

    /// Content address for the active session's current step.
    pub fn resolve_current(&self) -> Result<ContentAddress> {
        let active = self.active.as_ref().ok_or(EngineError::NoActiveSession)?;
        let index = active.step.ok_or(EngineError::StepOutOfRange {
            index: -1,
            len: active.tour.step_count(),
        })?;
        self.resolve_step(&active.tour, index)
    }

    pub fn read_content(&self, address: &ContentAddress) -> Result<String> {
        self.resolver().read(address)
    }

    /// Portable copy of `tour` with every step's content inlined.
    pub fn export_tour(&self, tour: &Tour) -> Result<Tour> {
        let root = self
            .workspace_root_for(Path::new(&tour.id))
            .or_else(|| self.roots.first().cloned());
        self.resolver().export(tour, root.as_deref())
    }

    /// [`TourEngine::export_tour`] serialized as a pretty-printed document.
    pub fn export_document(&self, tour: &Tour) -> Result<String> {
        Ok(self.export_tour(tour)?.to_json_pretty()?)
    }

    pub(crate) fn next_token(&mut self) -> SessionToken {
        self.next_token += 1;
        SessionToken(self.next_token)
    }
}
