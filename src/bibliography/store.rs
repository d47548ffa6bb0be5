//! BibTeX source parsing.
//!
//! The store is built once before conversion and only read afterwards, so a
//! single instance can back any number of conversions.

use fxhash::FxHashMap;
use tracing::debug;

use crate::utils::error::{ConversionError, ConversionResult};

/// Entry types that carry no citable record.
const NON_RECORD_TYPES: [&str; 3] = ["comment", "preamble", "string"];

/// One `@type{key, field = value, ...}` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibliographyEntry {
    pub key: String,
    pub reference_type: String,
    pub fields: FxHashMap<String, String>,
}

impl BibliographyEntry {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Read-only key → entry mapping.
#[derive(Debug, Clone, Default)]
pub struct BibliographyStore {
    entries: FxHashMap<String, BibliographyEntry>,
    /// A source was supplied, even if it held no records
    configured: bool,
}

impl BibliographyStore {
    /// An empty store. Citations against it fall through as unknown commands.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a BibTeX source. `None` yields an empty store.
    pub fn parse(source: Option<&str>) -> ConversionResult<Self> {
        let Some(source) = source else {
            return Ok(Self::empty());
        };

        let mut entries = FxHashMap::default();
        // A record starts at `@` at the beginning of a line, including the very first line.
        let normalized = format!("\n{}", source);
        for record in normalized.split("\n@").skip(1) {
            if let Some(entry) = parse_record(record)? {
                entries.insert(entry.key.clone(), entry);
            }
        }
        debug!(entries = entries.len(), "parsed bibliography");
        Ok(Self {
            entries,
            configured: true,
        })
    }

    pub fn get(&self, key: &str) -> Option<&BibliographyEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `\cite` resolves against this store. An unconfigured store
    /// leaves citations as unknown commands.
    pub fn is_configured(&self) -> bool {
        self.configured
    }
}

fn parse_record(record: &str) -> ConversionResult<Option<BibliographyEntry>> {
    let malformed = || ConversionError::MalformedRecord {
        record: record.lines().next().unwrap_or_default().to_string(),
    };

    let open = record.find('{').ok_or_else(malformed)?;
    let reference_type = record[..open].trim().to_ascii_lowercase();
    if NON_RECORD_TYPES.contains(&reference_type.as_str()) {
        return Ok(None);
    }

    let comma = record.find(',').ok_or_else(malformed)?;
    if comma < open {
        return Err(malformed());
    }
    let key = record[open + 1..comma].trim().to_string();

    let lines: Vec<&str> = record.lines().collect();
    let mut fields = FxHashMap::default();
    if lines.len() > 2 {
        for line in &lines[1..lines.len() - 1] {
            if let Some((name, value)) = parse_field(line) {
                fields.insert(name, value);
            }
        }
    }

    Ok(Some(BibliographyEntry {
        key,
        reference_type,
        fields,
    }))
}

/// Parse a `name = value` line, stripping the trailing comma and one or more
/// enclosing `{}`/`""` pairs.
fn parse_field(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once('=')?;
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }

    let mut value = value.trim();
    value = value.strip_suffix(',').unwrap_or(value).trim_end();
    loop {
        let stripped = value
            .strip_prefix('{')
            .and_then(|v| v.strip_suffix('}'))
            .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')));
        match stripped {
            Some(inner) => value = inner,
            None => break,
        }
    }

    Some((name, value.to_string()))
}
