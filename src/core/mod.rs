//! Conversion core
//!
//! - [`latex2md`]: the character driven LaTeX → Markdown state machine

pub mod latex2md;
