//! Error handling for latex2md conversions
//!
//! This module provides a unified error type and result type for all
//! conversion operations. Only fatal conditions live here; degraded output
//! (unknown commands, unknown environments, unsupported equations) is
//! recorded in a [`LossReport`](crate::utils::loss::LossReport) instead.

use thiserror::Error;

/// Conversion error type
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The state machine reached a state/character pair it has no rule for.
    #[error("Structural error: no transition from state {state} on {found}")]
    Structural { state: String, found: String },

    /// `\begin` was evaluated while another list block was still open.
    #[error("Nested blocks are not supported. Block type '{open}' is already open (requested '{requested}')")]
    NestedBlock { open: String, requested: String },

    /// A command that needs an argument was closed without one.
    #[error("Command '\\{command}' requires an argument")]
    MissingArgument { command: String },

    /// Input ended inside an argument or an environment (strict mode only).
    #[error("Input ended inside {what}")]
    Unterminated { what: String },

    /// A cited key is absent from the bibliography.
    #[error("Citation key '{key}' not found in bibliography")]
    MissingCitation { key: String },

    /// A bibliography record lacks the `{` or `,` delimiter.
    #[error("Malformed bibliography record: {record}")]
    MalformedRecord { record: String },

    /// The rendering collaborator failed for an asset.
    #[error("Failed to render '{path}': {message}")]
    Render { path: String, message: String },

    /// IO error (for file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    /// Errors caused by a gap in the transition rules or illegal nesting.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ConversionError::Structural { .. }
                | ConversionError::NestedBlock { .. }
                | ConversionError::MissingArgument { .. }
                | ConversionError::Unterminated { .. }
        )
    }

    /// Errors caused by bibliography lookups or bibliography syntax.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            ConversionError::MissingCitation { .. } | ConversionError::MalformedRecord { .. }
        )
    }
}

/// Result type for conversion operations
pub type ConversionResult<T> = Result<T, ConversionError>;
