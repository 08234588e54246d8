//! Caller-owned memoization of canonical TRS parsing.

use std::collections::HashMap;

use plss_shared::{Result, Trs};

/// Canonical string → [`Trs`].
///
/// Parsing is pure, so one cache may be reused across any number of
/// descriptions; give each thread its own.
#[derive(Debug, Default)]
pub struct TrsCache {
    entries: HashMap<String, Trs>,
    hits: usize,
}

impl TrsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a canonical string (`154n97w14`, `154n97w`, a sentinel), memoized.
    pub fn parse(&mut self, canonical: &str) -> Result<Trs> {
        if let Some(trs) = self.entries.get(canonical) {
            self.hits += 1;
            return Ok(*trs);
        }
        let trs: Trs = canonical.parse()?;
        self.entries.insert(canonical.to_string(), trs);
        Ok(trs)
    }

    /// TRS for a finished tract. A missing or unreadable Twp/Rge, or a
    /// missing section, becomes an error field.
    pub fn tract_trs(&mut self, twprge: Option<&str>, section: Option<u8>) -> Trs {
        twprge
            .and_then(|value| self.parse(value).ok())
            .unwrap_or_else(Trs::error)
            .with_section(section)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
    }
}
