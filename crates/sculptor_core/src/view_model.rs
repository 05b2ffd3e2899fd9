use crate::{EngineState, EntityKind, EntityStatus};

/// Status text shown before the first event for a key arrives.
pub const QUEUED_TEXT: &str = "Queued...";
/// Status text set optimistically when a start action is accepted.
pub const STARTING_TEXT: &str = "Starting...";

/// Read-only projection of the engine state for one view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineViewModel {
    /// Snapshot source unreachable; the whole collection is degraded.
    pub degraded: bool,
    /// At least one snapshot fetch has succeeded since mount.
    pub loaded: bool,
    pub rows: Vec<EntityRowView>,
}

/// Derived view for one tracked entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRowView {
    pub key: String,
    pub kind: EntityKind,
    pub state: EntityStatus,
    pub is_processing: bool,
    pub percent: u8,
    pub status_text: String,
    pub ready: bool,
    pub thumbnail: Option<String>,
    pub path: Option<String>,
}

impl EngineViewModel {
    /// Computes the derived view. Rows come out in BTreeMap key order, so the
    /// presentation is deterministic without sorting on its side.
    pub(crate) fn project(state: &EngineState) -> Self {
        let rows = state
            .entities
            .iter()
            .map(|(key, entity)| {
                let entry = state.cache.get(key);
                EntityRowView {
                    key: key.clone(),
                    kind: entity.kind,
                    state: entity.status,
                    is_processing: !entity.authoritative_ready || entry.is_some(),
                    percent: entry.map(|e| e.percent).unwrap_or(0),
                    status_text: entry
                        .map(|e| e.status_text.clone())
                        .unwrap_or_else(|| QUEUED_TEXT.to_string()),
                    ready: entity.authoritative_ready,
                    thumbnail: entity.thumbnail.clone(),
                    path: entity.path.clone(),
                }
            })
            .collect();

        Self {
            degraded: state.degraded,
            loaded: state.loaded,
            rows,
        }
    }

    pub fn row(&self, key: &str) -> Option<&EntityRowView> {
        self.rows.iter().find(|row| row.key == key)
    }
}
