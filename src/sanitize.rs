//! Header sanitization for captured request/response headers

use std::collections::BTreeMap;

/// Header fields stripped from captures unless overridden by config
pub const DEFAULT_REDACTED_HEADERS: &[&str] = &["cookie", "authorization", "set-cookie"];

/// Strips sensitive header fields from captured header maps
#[derive(Debug, Clone)]
pub struct HeaderSanitizer {
    redacted: Vec<String>,
}

impl Default for HeaderSanitizer {
    fn default() -> Self {
        Self::new(
            DEFAULT_REDACTED_HEADERS
                .iter()
                .map(|header| (*header).to_string())
                .collect(),
        )
    }
}

impl HeaderSanitizer {
    /// Create a sanitizer for the given header names (matched case-insensitively)
    #[must_use]
    pub fn new(redacted: Vec<String>) -> Self {
        let redacted = redacted
            .into_iter()
            .map(|header| header.to_ascii_lowercase())
            .collect();
        Self { redacted }
    }

    /// Return a copy of `headers` with all redacted fields removed
    #[must_use]
    pub fn sanitize(&self, headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        headers
            .iter()
            .filter(|(name, _)| !self.redacted.contains(&name.to_ascii_lowercase()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}
