//! Utility modules
//!
//! This module contains utilities and helpers:
//! - Error types and result types
//! - Loss reporting for degraded output
//! - The equation rendering collaborator
//! - Post-pass cleanup of list indentation

pub mod error;
pub mod loss;
pub mod postprocess;
pub mod render;

// Re-export commonly used items
pub use error::{ConversionError, ConversionResult};
pub use loss::{LossKind, LossRecord, LossReport, MANUAL_CONVERSION_MARKER};
pub use postprocess::strip_list_indentation;
pub use render::{
    CommandRenderer, EquationRenderer, RecordingRenderer, RenderConfig, RenderRequest,
};
