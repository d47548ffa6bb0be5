//! latex2md - Single-pass LaTeX to Markdown converter
//!
//! Converts a constrained subset of LaTeX (sectioning, itemize/enumerate,
//! citations, equations) to Markdown in one forward pass over the input.
//! Anything it cannot translate is preserved literally and reported.
//!
//! # Example
//!
//! ```
//! use latex2md::latex_to_markdown;
//!
//! let output = latex_to_markdown("\\section{Intro}\nHello\n").unwrap();
//! assert!(output.starts_with("## Intro\nHello\n"));
//! ```
//!
//! Citations are resolved against a BibTeX source and become footnotes:
//!
//! ```
//! use latex2md::{latex_to_markdown_with_options, BibliographyStore, L2MOptions};
//!
//! let bib = BibliographyStore::parse(Some(
//!     "@book{knuth,\n  author = {Knuth},\n  year = {1984},\n}\n",
//! ))
//! .unwrap();
//! let output = latex_to_markdown_with_options("See \\cite{knuth} ", &bib, L2MOptions::default())
//!     .unwrap();
//! assert!(output.contains("See [^1]"));
//! assert!(output.contains("[^1]: Knuth, 1984, "));
//! ```

pub mod bibliography;
pub mod core;
pub mod utils;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use crate::bibliography::{BibliographyEntry, BibliographyStore, CitationRegistry};
pub use crate::core::latex2md::{
    convert_with_renderer, latex_to_markdown, latex_to_markdown_with_options,
    latex_to_markdown_with_report, normalize_line_endings, ConversionReport, L2MOptions,
    LatexConverter, MissingCitationPolicy, ParserState,
};
pub use crate::utils::error::{ConversionError, ConversionResult};
pub use crate::utils::loss::{LossKind, LossReport};
pub use crate::utils::postprocess::strip_list_indentation;
pub use crate::utils::render::{EquationRenderer, RecordingRenderer, RenderRequest};
