//! Async Tour Watcher
//!
//! Event-driven watching of tour locations across workspace roots. Uses the
//! `notify` crate for filesystem events with a periodic fallback poll, and
//! reports that discovery should run again.

use crate::error::Result;
use crate::paths::DiscoveryLocations;
use crate::watcher::TourWatcher;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Configuration for the async watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Fallback poll interval (safety net for missed events)
    pub poll_interval: Duration,
    /// Quiet period that coalesces bursts of events into one notification
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            debounce: Duration::from_millis(100),
        }
    }
}

/// Why the watcher thinks tours need rediscovering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Filesystem events touched these tour sources.
    Changed(Vec<PathBuf>),
    /// The fallback poll saw a difference events didn't report.
    Rescan,
}

/// Async tour watcher that uses filesystem events
/// with a periodic fallback poll for reliability.
pub struct AsyncTourWatcher {
    roots: Vec<PathBuf>,
    locations: DiscoveryLocations,
    config: WatcherConfig,
}

impl AsyncTourWatcher {
    pub fn new(
        roots: Vec<PathBuf>,
        locations: DiscoveryLocations,
        config: Option<WatcherConfig>,
    ) -> Self {
        Self {
            roots,
            locations,
            config: config.unwrap_or_default(),
        }
    }

    /// Whether a changed `path` can affect discovery.
    ///
    /// Main files count as-is; inside tour directories only `.json` and
    /// `.tour` files do. A tour directory itself, or a directory on the way
    /// to one, counts when it appears or disappears.
    pub fn is_tour_path(&self, path: &Path) -> bool {
        is_tour_path(&self.roots, &self.locations, path)
    }

    /// Start watching and send a [`WatchEvent`] whenever tours should be
    /// rediscovered. This spawns a background task that:
    /// 1. Watches tour locations for create/modify/remove events
    /// 2. Polls periodically as a safety fallback
    ///
    /// Returns a handle that can be used to stop the watcher.
    pub async fn start(self, tx: mpsc::Sender<WatchEvent>) -> Result<WatcherHandle> {
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let poll_interval = self.config.poll_interval;
        let debounce = self.config.debounce;

        // Channel for filesystem events
        let (event_tx, mut event_rx) = mpsc::channel::<Vec<PathBuf>>(64);

        let roots = self.roots.clone();
        let locations = self.locations.clone();
        let watcher_result: std::result::Result<RecommendedWatcher, notify::Error> =
            notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
                let Ok(event) = res else {
                    return;
                };
                if !(event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove()) {
                    return;
                }
                let paths: Vec<PathBuf> = event
                    .paths
                    .into_iter()
                    .filter(|p| is_tour_path(&roots, &locations, p))
                    .collect();
                if !paths.is_empty() {
                    let _ = event_tx.blocking_send(paths);
                }
            });

        let mut watched = HashSet::new();
        let mut watcher = match watcher_result {
            Ok(mut w) => {
                if let Err(e) =
                    watch_locations(&mut w, &self.roots, &self.locations, &mut watched)
                {
                    tracing::warn!(error = %e, "some tour locations could not be watched");
                }
                Some(w)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to create file watcher, using poll-only mode");
                None
            }
        };

        let roots = self.roots.clone();
        let locations = self.locations.clone();
        let mut poller = TourWatcher::new(self.roots.clone(), self.locations.clone());

        let handle = tokio::spawn(async move {
            let mut poll_timer = tokio::time::interval(poll_interval);
            // The first tick completes immediately; the baseline is already fresh.
            poll_timer.tick().await;

            loop {
                tokio::select! {
                    _ = stop_rx.recv() => {
                        break;
                    }

                    Some(mut paths) = event_rx.recv() => {
                        tokio::time::sleep(debounce).await;
                        while let Ok(more) = event_rx.try_recv() {
                            paths.extend(more);
                        }
                        paths.sort();
                        paths.dedup();
                        // Tour directories created since the last batch need their own watch.
                        if let Some(w) = watcher.as_mut()
                            && let Err(e) = watch_locations(w, &roots, &locations, &mut watched)
                        {
                            tracing::debug!(error = %e, "new tour location could not be watched");
                        }
                        // Events already cover this change; don't report it again on the next poll.
                        poller.poll();
                        if tx.send(WatchEvent::Changed(paths)).await.is_err() {
                            break; // Receiver dropped
                        }
                    }

                    _ = poll_timer.tick() => {
                        if !poller.poll() {
                            continue;
                        }
                        if let Some(w) = watcher.as_mut()
                            && let Err(e) = watch_locations(w, &roots, &locations, &mut watched)
                        {
                            tracing::debug!(error = %e, "new tour location could not be watched");
                        }
                        if tx.send(WatchEvent::Rescan).await.is_err() {
                            break; // Receiver dropped
                        }
                    }
                }
            }

            drop(watcher.take());
        });

        Ok(WatcherHandle {
            stop_tx,
            _task: handle,
        })
    }
}

/// Watch every location that exists and isn't watched yet: each root
/// non-recursively, each main file's directory, each tour directory
/// recursively, and the existing parents of tour directories that don't
/// exist yet so their creation is seen.
fn watch_locations(
    watcher: &mut RecommendedWatcher,
    roots: &[PathBuf],
    locations: &DiscoveryLocations,
    watched: &mut HashSet<PathBuf>,
) -> Result<()> {
    // A removed directory loses its watch; watch it again if it comes back.
    watched.retain(|p| p.is_dir());
    let mut add = |path: PathBuf, mode: RecursiveMode| -> Result<()> {
        if path.is_dir() && !watched.contains(&path) {
            watcher.watch(&path, mode)?;
            watched.insert(path);
        }
        Ok(())
    };

    for root in roots {
        add(root.clone(), RecursiveMode::NonRecursive)?;
        for file in &locations.main_files {
            if let Some(dir) = root.join(file).parent() {
                add(dir.to_path_buf(), RecursiveMode::NonRecursive)?;
            }
        }
        for dir in &locations.directories {
            let dir = root.join(dir);
            if dir.is_dir() {
                add(dir, RecursiveMode::Recursive)?;
            } else {
                for parent in dir.ancestors().skip(1) {
                    if parent == root.as_path() || !parent.starts_with(root) {
                        break;
                    }
                    add(parent.to_path_buf(), RecursiveMode::NonRecursive)?;
                }
            }
        }
    }
    Ok(())
}

fn is_tour_path(roots: &[PathBuf], locations: &DiscoveryLocations, path: &Path) -> bool {
    roots.iter().any(|root| {
        // A tour directory, or a directory on the way to one, appearing.
        let opens_tour_dir = path != root.as_path()
            && locations
                .directories
                .iter()
                .any(|d| root.join(d).starts_with(path));
        if opens_tour_dir {
            return true;
        }
        if !locations.covers(root, path) {
            return false;
        }
        let is_main = locations
            .main_files
            .iter()
            .any(|f| path == root.join(f));
        is_main
            || path
                .extension()
                .is_some_and(|ext| ext == "json" || ext == "tour")
    })
}

/// Handle to control a running watcher
pub struct WatcherHandle {
    stop_tx: mpsc::Sender<()>,
    _task: tokio::task::JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop the watcher
    pub async fn stop(self) {
        let _ = self.stop_tx.send(()).await;
    }
}
