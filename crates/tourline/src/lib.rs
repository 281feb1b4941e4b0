#![doc = include_str!("../README.md")]

mod address;
mod types;
mod vcs;

pub mod v1 {
    //! Versioned public API for tour documents.
    //!
    //! # Documents
    //!
    //! - [`Tour`]: an ordered walk, loaded from and saved to a JSON document
    //! - [`Step`]: one stop: a location, optional [`Selection`], and a note
    //!
    //! # Content addressing
    //!
    //! - [`ContentAddress`]: where a step's text comes from
    //! - [`HistoricalAddress`]: a path pinned to a ref
    //! - [`join_relative`]: resolve a workspace-relative file
    //!
    //! # Version control
    //!
    //! The narrow capability tour resolution consumes:
    //!
    //! - [`VcsProvider`] / [`VcsRepository`]: implemented by a backend
    //! - [`RepositoryState`], [`Head`], [`GitRef`], [`RefKind`]
    //! - [`NoVcs`]: the "capability absent" provider
    //!
    //! # Example: build and serialize a tour
    //!
    //! ```
    //! use tourline::v1::*;
    //!
    //! let tour = Tour::new("Getting started")
    //!     .with_id("/repo/.tours/getting-started.tour")
    //!     .with_step(Step::new("The entry point").with_file("src/main.rs").with_line(1));
    //!
    //! let json = tour.to_json_pretty().unwrap();
    //! assert!(json.contains("src/main.rs"));
    //! assert!(!json.contains("getting-started.tour"));
    //!
    //! let back = Tour::from_json(&json).unwrap();
    //! assert_eq!(back.steps, tour.steps);
    //! ```

    pub use crate::address::{
        ContentAddress, EMBEDDED_SCHEME, HistoricalAddress, embedded_address, join_relative,
    };
    pub use crate::types::{NO_PIN_REF, Position, Selection, Step, Tour};
    pub use crate::vcs::{
        GitRef, Head, NoVcs, RefKind, RepositoryState, VcsError, VcsProvider, VcsRepository,
    };
}
