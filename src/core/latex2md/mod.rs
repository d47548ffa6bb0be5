//! LaTeX to Markdown converter
//!
//! This module implements the single-pass LaTeX to Markdown converter.
//! Input is consumed one character at a time by a small state machine;
//! completed commands are evaluated into Markdown fragments, unknown
//! environments are copied verbatim and equations are handed to a renderer.

mod block_copy;
mod commands;
pub mod context;

pub use block_copy::{BlockCopyBuffer, BlockEvent};
pub use commands::{
    is_list_environment, is_separator, BlockContext, Command, CommandEvaluator, LIST_ENVIRONMENTS,
};
pub use context::{L2MOptions, LatexConverter, MissingCitationPolicy, ParserState};

use serde::Serialize;

use crate::bibliography::BibliographyStore;
use crate::utils::error::ConversionResult;
use crate::utils::loss::LossReport;
use crate::utils::render::{EquationRenderer, RecordingRenderer, RenderRequest};

/// Result of a conversion together with everything it left for the caller
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    /// The converted Markdown, footer included
    pub content: String,
    /// Degraded output produced along the way
    pub report: LossReport,
    /// Equations to render, in document order
    pub render_requests: Vec<RenderRequest>,
    /// Asset paths that should receive the manual-conversion sentinel
    pub sentinels: Vec<String>,
    /// Last footnote id used; pass it as the next document's start for continuous numbering
    pub citation_counter: usize,
}

/// Normalise line endings the way the converter expects them.
pub fn normalize_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Convert a LaTeX document without a bibliography.
pub fn latex_to_markdown(input: &str) -> ConversionResult<String> {
    let bibliography = BibliographyStore::empty();
    latex_to_markdown_with_options(input, &bibliography, L2MOptions::default())
}

/// Convert a LaTeX document, citing from `bibliography`.
pub fn latex_to_markdown_with_options(
    input: &str,
    bibliography: &BibliographyStore,
    options: L2MOptions,
) -> ConversionResult<String> {
    latex_to_markdown_with_report(input, bibliography, options).map(|r| r.content)
}

/// Convert and collect the loss report and rendering requests.
///
/// # Example
///
/// ```
/// use latex2md::{latex_to_markdown_with_report, BibliographyStore, L2MOptions};
///
/// let bib = BibliographyStore::empty();
/// let result = latex_to_markdown_with_report(
///     "\\begin{equation}\nx^2\n\\end{equation}\n",
///     &bib,
///     L2MOptions::default(),
/// )
/// .unwrap();
/// assert_eq!(result.render_requests[0].asset_path, "assets/equation_0.svg");
/// ```
pub fn latex_to_markdown_with_report(
    input: &str,
    bibliography: &BibliographyStore,
    options: L2MOptions,
) -> ConversionResult<ConversionReport> {
    let mut renderer = RecordingRenderer::new();
    let (content, report, citation_counter) =
        convert_with_renderer(input, bibliography, options, &mut renderer)?;
    Ok(ConversionReport {
        content,
        report,
        render_requests: renderer.requests,
        sentinels: renderer.sentinels,
        citation_counter,
    })
}

/// Convert, rendering equations through `renderer` as they close.
///
/// Returns the content, the loss report and the last footnote id.
pub fn convert_with_renderer(
    input: &str,
    bibliography: &BibliographyStore,
    options: L2MOptions,
    renderer: &mut dyn EquationRenderer,
) -> ConversionResult<(String, LossReport, usize)> {
    let input = normalize_line_endings(input);
    let mut converter = LatexConverter::new(bibliography, options, renderer);
    let content = converter.convert_document(&input)?;
    let counter = converter.citations().counter();
    Ok((content, converter.into_losses(), counter))
}
