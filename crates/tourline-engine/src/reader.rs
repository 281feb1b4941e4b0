use crate::error::{EngineError, Result};
use std::path::Path;
use tourline::v1::Tour;

pub struct TourReader;

impl TourReader {
    /// Read and validate a tour document, stamping its `id` with `path`.
    pub fn read_tour<P: AsRef<Path>>(path: P) -> Result<Tour> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse_tour(path, &content)
    }

    /// Validate `content` as a tour loaded from `path`.
    pub fn parse_tour(path: &Path, content: &str) -> Result<Tour> {
        let mut tour = Tour::from_json(content).map_err(|source| EngineError::InvalidTour {
            path: path.to_path_buf(),
            source,
        })?;
        tour.id = tour_id(path);
        Ok(tour)
    }

    /// Read every candidate, dropping the ones that fail to load.
    pub fn read_candidates(paths: &[impl AsRef<Path>]) -> Vec<Tour> {
        paths
            .iter()
            .filter_map(|path| match Self::read_tour(path) {
                Ok(tour) => Some(tour),
                Err(e) => {
                    tracing::debug!(path = %path.as_ref().display(), error = %e, "skipping tour candidate");
                    None
                }
            })
            .collect()
    }
}

/// Identifier for a tour loaded from `path`.
pub fn tour_id(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
