use std::collections::BTreeMap;

use crate::request::{normalize_url, url_key};
use crate::status::ProbeStatus;

/// One snapshot row: the URL as first enqueued plus its current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub url: String,
    pub status: ProbeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    display_url: String,
    status: ProbeStatus,
}

/// Mapping from normalized URL to current status.
///
/// Identity is case-insensitive: `HTTP://A.example` and `http://a.example`
/// share one entry. Last write wins; entries are never removed except by an
/// explicit [`StatusTable::clear`], which the dispatcher itself never calls.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusTable {
    // BTreeMap so snapshots iterate in a deterministic key order.
    entries: BTreeMap<String, Entry>,
}

impl StatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status for a URL, creating the entry on first write.
    ///
    /// The display URL is captured on creation and kept thereafter, so later
    /// writes under a different casing do not rename the row.
    pub fn set(&mut self, url: &str, status: ProbeStatus) {
        let key = url_key(url);
        self.entries
            .entry(key)
            .and_modify(|entry| entry.status = status.clone())
            .or_insert_with(|| Entry {
                display_url: normalize_url(url).to_string(),
                status,
            });
    }

    pub fn get(&self, url: &str) -> Option<&ProbeStatus> {
        self.entries.get(&url_key(url)).map(|entry| &entry.status)
    }

    /// All rows, ordered by normalized key.
    pub fn snapshot(&self) -> Vec<StatusRow> {
        self.entries
            .values()
            .map(|entry| StatusRow {
                url: entry.display_url.clone(),
                status: entry.status.clone(),
            })
            .collect()
    }

    /// True when every entry is `Succeeded` or `Failed`.
    ///
    /// An empty table counts as all-terminal.
    pub fn all_terminal(&self) -> bool {
        self.entries.values().all(|entry| entry.status.is_terminal())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry. Caller-driven; never invoked by the dispatcher.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
