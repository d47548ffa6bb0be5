//! Footnote numbering for citations.
//!
//! Keys are interned in first-citation order. A key's footnote id is its
//! position plus the starting counter plus one, so the id → key and key → id
//! directions are the same table and cannot drift apart.

use indexmap::IndexMap;
use tracing::debug;
use url::Url;

use super::store::BibliographyEntry;

/// Per-document citation registry.
#[derive(Debug, Clone, Default)]
pub struct CitationRegistry {
    start: usize,
    cited: IndexMap<String, BibliographyEntry>,
}

impl CitationRegistry {
    /// Create a registry whose first footnote id is `start + 1`.
    pub fn new(start: usize) -> Self {
        Self {
            start,
            cited: IndexMap::new(),
        }
    }

    /// Footnote id already assigned to `key`, if any.
    pub fn id_of(&self, key: &str) -> Option<usize> {
        self.cited.get_index_of(key).map(|idx| self.start + idx + 1)
    }

    /// Key registered under footnote `id`, if any.
    pub fn key_of(&self, id: usize) -> Option<&str> {
        id.checked_sub(self.start + 1)
            .and_then(|idx| self.cited.get_index(idx))
            .map(|(key, _)| key.as_str())
    }

    /// Return the id for `key`, allocating the next one on first use.
    pub fn intern(&mut self, key: &str, entry: &BibliographyEntry) -> usize {
        if let Some(id) = self.id_of(key) {
            return id;
        }
        self.cited.insert(key.to_string(), entry.clone());
        let id = self.start + self.cited.len();
        debug!(key, id, "allocated footnote");
        id
    }

    /// The last id handed out, or the starting counter when nothing was cited.
    pub fn counter(&self) -> usize {
        self.start + self.cited.len()
    }

    pub fn len(&self) -> usize {
        self.cited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cited.is_empty()
    }

    /// Render the footnote definitions in ascending id order.
    pub fn render_footer(&self) -> String {
        let mut output = String::from("\n");
        for (idx, entry) in self.cited.values().enumerate() {
            output.push_str(&format!("[^{}]: ", self.start + idx + 1));
            for name in ["author", "title", "year"] {
                if let Some(value) = entry.field(name) {
                    output.push_str(value);
                    output.push_str(", ");
                }
            }
            if let Some(url) = entry.field("url") {
                output.push_str(&format!("[{}]({})", hostname(url), url));
            }
            output.push_str("\n\n");
        }
        output.push('\n');
        output
    }
}

/// Link label for a URL: its host, or the URL itself when it has none.
fn hostname(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(str::to_string)
            .unwrap_or_else(|| url.to_string()),
        Err(_) => url.split('/').nth(2).unwrap_or(url).to_string(),
    }
}

/// Footnote reference for an id.
pub fn footnote_marker(id: usize) -> String {
    format!("[^{}]", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxhash::FxHashMap;

    fn entry(key: &str, fields: &[(&str, &str)]) -> BibliographyEntry {
        let fields: FxHashMap<String, String> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BibliographyEntry {
            key: key.to_string(),
            reference_type: "article".to_string(),
            fields,
        }
    }

    #[test]
    fn test_intern_is_idempotent() {
        let mut registry = CitationRegistry::new(0);
        let a = entry("a", &[]);
        assert_eq!(registry.intern("a", &a), 1);
        assert_eq!(registry.intern("a", &a), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ids_start_after_counter() {
        let mut registry = CitationRegistry::new(7);
        assert_eq!(registry.intern("a", &entry("a", &[])), 8);
        assert_eq!(registry.intern("b", &entry("b", &[])), 9);
        assert_eq!(registry.id_of("b"), Some(9));
        assert_eq!(registry.key_of(8), Some("a"));
        assert_eq!(registry.key_of(7), None);
        assert_eq!(registry.key_of(10), None);
        assert_eq!(registry.counter(), 9);
    }

    #[test]
    fn test_footer_skips_missing_fields() {
        let mut registry = CitationRegistry::new(0);
        registry.intern("a", &entry("a", &[("author", "Ada"), ("year", "1843")]));
        assert_eq!(registry.render_footer(), "\n[^1]: Ada, 1843, \n\n\n");
    }

    #[test]
    fn test_footer_link_uses_hostname() {
        let mut registry = CitationRegistry::new(0);
        registry.intern(
            "w",
            &entry(
                "w",
                &[("title", "Rust"), ("url", "https://www.rust-lang.org/learn")],
            ),
        );
        registry.intern("x", &entry("x", &[("author", "X")]));
        assert_eq!(
            registry.render_footer(),
            "\n[^1]: Rust, [www.rust-lang.org](https://www.rust-lang.org/learn)\n\n[^2]: X, \n\n\n"
        );
    }

    #[test]
    fn test_empty_footer() {
        assert_eq!(CitationRegistry::new(3).render_footer(), "\n\n");
    }
}
