//! Result code → verdict definitions.

use serde::{Deserialize, Serialize};

pub const OK: i64 = 0;
pub const PU: i64 = 3;
pub const PROXY: i64 = 6;
pub const BOT: i64 = 9;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictEntry {
    pub code: i64,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl VerdictEntry {
    #[must_use]
    pub fn new(code: i64, verdict: &str, name: &str) -> Self {
        Self { code, verdict: Some(verdict.to_owned()), name: Some(name.to_owned()) }
    }
}

/// Ordered table of candidate results. Order matters: v4 verification stops
/// at the first matching entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerdictTable(Vec<VerdictEntry>);

impl Default for VerdictTable {
    fn default() -> Self {
        Self(vec![
            VerdictEntry::new(OK, "ok", "Clean"),
            VerdictEntry::new(PU, "junk", "Potentially unwanted"),
            VerdictEntry::new(PROXY, "proxy", "Proxy"),
            VerdictEntry::new(BOT, "bot", "Bot"),
        ])
    }
}

impl VerdictTable {
    #[must_use]
    pub const fn new(entries: Vec<VerdictEntry>) -> Self {
        Self(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VerdictEntry> {
        self.0.iter()
    }

    #[must_use]
    pub fn get(&self, code: i64) -> Option<&VerdictEntry> {
        self.0.iter().find(|e| e.code == code)
    }

    #[must_use]
    pub fn verdict(&self, code: i64) -> Option<&str> {
        self.get(code).and_then(|e| e.verdict.as_deref())
    }

    /// Reverse lookup: verdict label → result code.
    #[must_use]
    pub fn verdict_code(&self, verdict: &str) -> Option<i64> {
        self.0.iter().find(|e| e.verdict.as_deref() == Some(verdict)).map(|e| e.code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<VerdictEntry> for VerdictTable {
    fn from_iter<T: IntoIterator<Item = VerdictEntry>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_order() {
        let codes: Vec<i64> = VerdictTable::default().iter().map(|e| e.code).collect();
        assert_eq!(codes, vec![0, 3, 6, 9]);
    }

    #[test]
    fn lookups() {
        let t = VerdictTable::default();
        assert_eq!(t.verdict(BOT), Some("bot"));
        assert_eq!(t.verdict(1), None);
        assert_eq!(t.verdict_code("junk"), Some(PU));
        assert_eq!(t.get(PROXY).and_then(|e| e.name.as_deref()), Some("Proxy"));
    }
}
