use std::collections::BTreeMap;

use crate::cache::ProgressCache;
use crate::view_model::EngineViewModel;

/// Monotonically increasing tag used to discard stale asynchronous results.
pub type Generation = u64;

/// What kind of backend job an entity key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A library media item, keyed by alias.
    MediaItem,
    /// An assembly project, keyed by project name.
    Project,
}

/// Per-entity position in the status state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityStatus {
    /// Never run, or explicitly reset.
    #[default]
    Idle,
    /// A job is in flight. `optimistic` is true while the state was entered
    /// from a user action and no server-confirmed progress exists yet; only
    /// then is a rollback to `Idle` permitted.
    Processing { optimistic: bool },
    /// The snapshot has confirmed completion.
    Ready,
}

/// Which slice of the backend one engine instance tracks.
///
/// Each open view owns its own engine and therefore its own cache; the scope
/// also decides the kind assigned to entity keys first seen on the shared
/// progress channel, whose `alias` field is overloaded across kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewScope {
    /// Every media item in the library.
    Library,
    /// One project, by name.
    Project(String),
}

impl ViewScope {
    pub fn kind(&self) -> EntityKind {
        match self {
            ViewScope::Library => EntityKind::MediaItem,
            ViewScope::Project(_) => EntityKind::Project,
        }
    }

    /// Whether a channel event for `key` concerns this scope at all.
    pub fn tracks(&self, key: &str) -> bool {
        match self {
            ViewScope::Library => true,
            ViewScope::Project(name) => name == key,
        }
    }
}

/// Authoritative per-entity state as reported by one snapshot fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySnapshot {
    pub key: String,
    pub kind: EntityKind,
    /// Backend has committed output for this entity.
    pub ready: bool,
    /// Backend reports a job still running for this entity.
    pub in_flight: bool,
    pub percent: u8,
    pub status_text: String,
    pub thumbnail: Option<String>,
    pub path: Option<String>,
}

/// One entity the engine currently knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEntity {
    pub kind: EntityKind,
    pub status: EntityStatus,
    /// Flips false -> true only via a snapshot fetch, never from an event.
    pub authoritative_ready: bool,
    pub generation: Generation,
    /// A terminal event was observed; eviction waits for a confirming fetch.
    pub settle_pending: bool,
    /// Materialized by an optimistic action and not yet seen by the backend.
    /// A rollback removes such an entity entirely instead of idling it.
    pub provisional: bool,
    pub thumbnail: Option<String>,
    pub path: Option<String>,
}

impl TrackedEntity {
    pub(crate) fn new(kind: EntityKind, generation: Generation) -> Self {
        Self {
            kind,
            status: EntityStatus::Idle,
            authoritative_ready: false,
            generation,
            settle_pending: false,
            provisional: false,
            thumbnail: None,
            path: None,
        }
    }
}

/// Whole-engine state: tracked entities, the progress cache and the
/// collection-level flags. Mutated exclusively through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineState {
    scope: ViewScope,
    pub(crate) entities: BTreeMap<String, TrackedEntity>,
    pub(crate) cache: ProgressCache,
    pub(crate) degraded: bool,
    pub(crate) loaded: bool,
    next_generation: Generation,
    dirty: bool,
}

impl EngineState {
    pub fn new(scope: ViewScope) -> Self {
        Self {
            scope,
            entities: BTreeMap::new(),
            cache: ProgressCache::new(),
            degraded: false,
            loaded: false,
            next_generation: 1,
            dirty: false,
        }
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Snapshot source unreachable; detail display is suspended until the
    /// next successful poll.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn entity(&self, key: &str) -> Option<&TrackedEntity> {
        self.entities.get(key)
    }

    pub fn cache(&self) -> &ProgressCache {
        &self.cache
    }

    /// Derived `isProcessing` for one key; also the poll-worthiness test.
    pub fn is_processing(&self, key: &str) -> bool {
        match self.entities.get(key) {
            Some(entity) => !entity.authoritative_ready || self.cache.contains(key),
            None => self.cache.contains(key),
        }
    }

    pub fn any_processing(&self) -> bool {
        self.entities.keys().any(|key| self.is_processing(key))
    }

    pub fn view(&self) -> EngineViewModel {
        EngineViewModel::project(self)
    }

    pub(crate) fn next_gen(&mut self) -> Generation {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether the state changed since the last call, clearing the
    /// flag. The runtime emits a change notification exactly when this is
    /// true after an update.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
