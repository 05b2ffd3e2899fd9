use std::collections::BTreeMap;

/// Most recent progress observed for one entity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub percent: u8,
    pub status_text: String,
}

/// Transient in-memory map from entity key to its latest progress.
///
/// An entry exists exactly while the engine believes a job is in flight for
/// that key (including the post-completion settle window). The cache never
/// does I/O and is owned by a single engine instance; cross-view consistency
/// is achieved by each view re-fetching snapshots, never by sharing entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressCache {
    entries: BTreeMap<String, ProgressEntry>,
}

impl ProgressCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the entry for `key`.
    ///
    /// Returns `false` without mutating anything when `percent` is lower than
    /// the currently displayed value, so a late or duplicated event can never
    /// make the visible progress move backwards. Equal percents are accepted
    /// so that status text can still advance within one step.
    pub fn upsert(&mut self, key: &str, percent: u8, status_text: impl Into<String>) -> bool {
        if let Some(existing) = self.entries.get(key) {
            if percent < existing.percent {
                return false;
            }
        }
        self.entries.insert(
            key.to_string(),
            ProgressEntry {
                percent,
                status_text: status_text.into(),
            },
        );
        true
    }

    pub fn get(&self, key: &str) -> Option<&ProgressEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes the entry for `key`, also lifting the monotonic floor so a
    /// future job for the same key may start again from zero.
    pub fn evict(&mut self, key: &str) -> Option<ProgressEntry> {
        self.entries.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
