//! Scan, parse and order tours across workspace roots.
//!
//! A pass is split in two so the slow half can run off the engine's task:
//! [`DiscoveryPass::scan`] only touches the filesystem and owns everything it
//! needs, and the engine later publishes the [`ScanResult`] it produced.
//! Each pass carries the generation it was started under. A result older
//! than the last published one is discarded, so overlapping passes can't
//! roll the tour set back.

use crate::paths::DiscoveryLocations;
use crate::reader::TourReader;
use std::cmp::Ordering;
use std::path::PathBuf;
use tourline::v1::Tour;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// A discovery pass that has been started but not yet scanned.
#[derive(Debug, Clone)]
pub struct DiscoveryPass {
    generation: u64,
    roots: Vec<PathBuf>,
    locations: DiscoveryLocations,
}

impl DiscoveryPass {
    pub(crate) fn new(generation: u64, roots: Vec<PathBuf>, locations: DiscoveryLocations) -> Self {
        Self {
            generation,
            roots,
            locations,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Read every candidate under every root and order the result by title.
    ///
    /// Candidates that can't be read or parsed are dropped. Never fails.
    pub fn scan(self) -> ScanResult {
        let mut tours = Vec::new();
        for root in &self.roots {
            let candidates = self.locations.candidates(root);
            tracing::trace!(root = %root.display(), candidates = candidates.len(), "scanning");
            tours.extend(TourReader::read_candidates(&candidates));
        }
        sort_tours(&mut tours);

        tracing::debug!(
            generation = self.generation,
            tours = tours.len(),
            "discovery scan finished"
        );
        ScanResult {
            generation: self.generation,
            tours,
        }
    }
}

/// The tours one pass found, already sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    generation: u64,
    tours: Vec<Tour>,
}

impl ScanResult {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tours(&self) -> &[Tour] {
        &self.tours
    }

    pub(crate) fn into_tours(self) -> Vec<Tour> {
        self.tours
    }
}

/// What publishing a scan did to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The tour set was replaced.
    Published {
        count: usize,
        /// The active tour changed on disk and was updated in place.
        session_updated: bool,
        /// The active tour's source is gone and its session was ended.
        session_ended: bool,
    },
    /// A newer pass already published; nothing changed.
    Stale { generation: u64, current: u64 },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

/// Title order, the way a reader expects a list of titles to be sorted.
///
/// Letters compare without accents or case first, so `"Élan"` sorts
/// between `"apple"` and `"Zeta"`. Ties fall back to accents (unaccented
/// first), then case (lowercase first).
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(&base_letters(b))
        .then_with(|| accented(a).cmp(&accented(b)))
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
}

fn base_letters(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn accented(s: &str) -> String {
    s.nfd().flat_map(char::to_lowercase).collect()
}

/// Stable sort by [`compare_titles`]; equal titles keep discovery order.
pub fn sort_tours(tours: &mut [Tour]) {
    tours.sort_by(|a, b| compare_titles(&a.title, &b.title));
}
