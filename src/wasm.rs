//! WASM bindings for latex2md
//!
//! This module provides JavaScript-accessible functions for LaTeX → Markdown conversion.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::utils::render::RenderRequest;
use crate::{
    latex_to_markdown_with_report, strip_list_indentation, BibliographyStore, ConversionReport,
    L2MOptions, MissingCitationPolicy,
};

/// Conversion options (exposed to WASM)
#[derive(Serialize, Deserialize, Default)]
pub struct L2MConvertOptions {
    /// BibTeX source used for `\cite`
    #[serde(default)]
    pub bibliography: Option<String>,
    /// Footnote ids start after this value
    #[serde(default)]
    pub citation_start: usize,
    /// Keep unknown citation keys literally instead of failing
    #[serde(default)]
    pub literal_missing_citations: bool,
    /// Fail on unterminated input
    #[serde(default)]
    pub strict: bool,
    /// Pull indented list items back to column zero
    #[serde(default = "default_true")]
    pub strip_list_indentation: bool,
}

fn default_true() -> bool {
    true
}

/// Conversion result with additional metadata
#[derive(Serialize, Deserialize)]
pub struct ConvertResult {
    /// The converted output
    pub output: String,
    /// Whether the conversion was successful
    pub success: bool,
    /// Error message if conversion failed
    pub error: Option<String>,
    /// Loss messages produced during conversion
    pub warnings: Vec<String>,
    /// Equations the caller should render, in document order
    pub equations: Vec<RenderRequest>,
}

impl ConvertResult {
    fn success(output: String, report: ConversionReport) -> Self {
        ConvertResult {
            output,
            success: true,
            error: None,
            warnings: report.report.losses.iter().map(|l| l.message.clone()).collect(),
            equations: report.render_requests,
        }
    }

    fn failure(message: String) -> Self {
        ConvertResult {
            output: String::new(),
            success: false,
            error: Some(message),
            warnings: vec![],
            equations: vec![],
        }
    }
}

/// Safely serialize a value to JsValue, returning an error object on failure.
fn to_js_value<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or_else(|e| {
        let error_obj = ConvertResult::failure(format!("Serialization error: {}", e));
        serde_wasm_bindgen::to_value(&error_obj).unwrap_or(JsValue::NULL)
    })
}

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Convert a LaTeX document to Markdown with default options.
///
/// Returns a `ConvertResult` object; `success` is false when the conversion fails.
#[wasm_bindgen(js_name = "latexToMarkdown")]
pub fn latex_to_markdown_wasm(input: &str) -> JsValue {
    to_js_value(&convert_default(input))
}

fn convert_default(input: &str) -> ConvertResult {
    match latex_to_markdown_with_report(input, &BibliographyStore::empty(), L2MOptions::default())
    {
        Ok(report) => ConvertResult::success(strip_list_indentation(&report.content), report),
        Err(e) => ConvertResult::failure(e.to_string()),
    }
}

/// Convert LaTeX to Markdown with options
#[wasm_bindgen(js_name = "latexToMarkdownWithOptions")]
pub fn latex_to_markdown_with_options_wasm(input: &str, options: JsValue) -> JsValue {
    let opts: L2MConvertOptions = serde_wasm_bindgen::from_value(options).unwrap_or_default();

    let bibliography = match BibliographyStore::parse(opts.bibliography.as_deref()) {
        Ok(store) => store,
        Err(e) => return to_js_value(&ConvertResult::failure(e.to_string())),
    };

    let missing_citation = if opts.literal_missing_citations {
        MissingCitationPolicy::Literal
    } else {
        MissingCitationPolicy::Fail
    };
    let l2m_opts = L2MOptions {
        citation_start: opts.citation_start,
        missing_citation,
        strict: opts.strict,
        ..Default::default()
    };

    let result = match latex_to_markdown_with_report(input, &bibliography, l2m_opts) {
        Ok(report) => {
            let output = if opts.strip_list_indentation {
                strip_list_indentation(&report.content)
            } else {
                report.content.clone()
            };
            ConvertResult::success(output, report)
        }
        Err(e) => ConvertResult::failure(e.to_string()),
    };

    to_js_value(&result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_conversion_reports_success() {
        let result = convert_default("\\section{A}\n");
        assert!(result.success);
        assert_eq!(result.output, "## A\n\n\n");
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_default_conversion_surfaces_errors() {
        let result = convert_default("\\begin{itemize}\\begin{enumerate}\n");
        assert!(!result.success);
        assert!(result.output.is_empty());
        assert!(result.error.is_some());
    }
}
