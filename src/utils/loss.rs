//! Loss reporting for degraded conversions.
//!
//! Unknown commands, unknown environments and unsupported equations never fail
//! the conversion. Each one leaves a record here so callers can see what needs
//! manual attention.

use serde::Serialize;

/// Marker appended after every literal block that needs manual conversion.
pub const MANUAL_CONVERSION_MARKER: &str = "<!-- TODO manual conversion needed -->";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LossKind {
    UnknownCommand,
    UnknownEnvironment,
    UnsupportedEquation,
    RenderFailure,
    UnterminatedInput,
    MissingCitation,
}

#[derive(Debug, Clone, Serialize)]
pub struct LossRecord {
    pub id: String,
    pub kind: LossKind,
    pub name: Option<String>,
    pub message: String,
}

impl LossRecord {
    pub fn new(id: String, kind: LossKind, name: Option<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LossReport {
    pub source_lang: String,
    pub target_lang: String,
    pub losses: Vec<LossRecord>,
}

impl Default for LossReport {
    fn default() -> Self {
        Self {
            source_lang: "latex".to_string(),
            target_lang: "markdown".to_string(),
            losses: Vec::new(),
        }
    }
}

impl LossReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, numbering it `L0001`, `L0002`, ...
    pub fn record(&mut self, kind: LossKind, name: Option<&str>, message: impl Into<String>) {
        let id = format!("L{:04}", self.losses.len() + 1);
        self.losses
            .push(LossRecord::new(id, kind, name.map(str::to_string), message));
    }

    pub fn count(&self, kind: LossKind) -> usize {
        self.losses.iter().filter(|l| l.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let mut report = LossReport::new();
        report.record(LossKind::UnknownCommand, Some("textbf"), "rendered literally");
        report.record(LossKind::UnknownEnvironment, Some("tikzpicture"), "copied");
        assert_eq!(report.losses[0].id, "L0001");
        assert_eq!(report.losses[1].id, "L0002");
        assert_eq!(report.count(LossKind::UnknownCommand), 1);
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let mut report = LossReport::new();
        report.record(LossKind::UnsupportedEquation, None, "nested environment");
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"unsupported-equation\""));
        assert!(json.contains("\"source_lang\":\"latex\""));
    }
}
