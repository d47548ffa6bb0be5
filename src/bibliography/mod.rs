//! Bibliography support
//!
//! - [`BibliographyStore`]: BibTeX records keyed by citation key
//! - [`CitationRegistry`]: footnote ids for cited keys and the footer they render to

pub mod registry;
pub mod store;

pub use registry::{footnote_marker, CitationRegistry};
pub use store::{BibliographyEntry, BibliographyStore};
