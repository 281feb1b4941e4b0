use std::path::PathBuf;
use thiserror::Error;
use tourline::v1::VcsError;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{} doesn't appear to be a valid tour: {source}", path.display())]
    InvalidTour {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No tour is active")]
    NoActiveSession,

    #[error("Step {index} is out of range for a tour with {len} steps")]
    StepOutOfRange { index: i64, len: usize },

    #[error("Tour not found: {0}")]
    TourNotFound(String),

    #[error("A tour file already exists at {0}")]
    TourExists(PathBuf),

    #[error("The active tour is not being recorded")]
    NotRecording,

    #[error("The recording already has saved steps")]
    RecordingHasSteps,

    #[error("Step has no file, uri, or contents")]
    StepHasNoLocation,

    #[error("No workspace root to resolve {0}")]
    NoWorkspaceRoot(String),

    #[error("Unsupported content address: {0}")]
    UnsupportedAddress(String),

    #[error("Version control error: {0}")]
    Vcs(#[from] VcsError),

    #[cfg(feature = "watcher")]
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}
