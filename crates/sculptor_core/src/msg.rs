use crate::{EntityKind, EntitySnapshot, Generation};

/// Result of a generation-tagged detail re-fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Snapshot(EntitySnapshot),
    /// The backend no longer knows the key (deleted elsewhere).
    NotFound,
    /// Transport failure; the entity stays processing and the fallback poll
    /// keeps trying.
    Unreachable,
}

/// Everything that can happen to the engine, from transport callbacks, the
/// poll/settle timers and user actions alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A collection snapshot fetch succeeded.
    CollectionLoaded(Vec<EntitySnapshot>),
    /// A collection snapshot fetch failed at the transport level.
    CollectionUnreachable,
    /// A settle-delay re-fetch for one key resolved.
    DetailLoaded {
        key: String,
        generation: Generation,
        outcome: DetailOutcome,
    },
    /// A progress event arrived on the shared channel. The wire carries no
    /// entity kind; the reconciler matches the key against its scope.
    ProgressEventReceived {
        key: String,
        percent: u8,
        status_text: String,
    },
    /// Fallback-poll timer fired.
    PollTick,
    /// Settle delay elapsed for a key that observed a terminal event.
    SettleElapsed { key: String, generation: Generation },
    /// User submitted a media-item ingest.
    IngestRequested {
        file_path: String,
        alias: String,
        fullname: String,
    },
    /// User started an assembly build.
    BuildRequested {
        project: String,
        sources: Vec<String>,
        audio_path: Option<String>,
    },
    /// User created a project.
    CreateProjectRequested { name: String },
    /// User confirmed deletion of an entity. The irreversibility prompt is
    /// the caller's job; by the time this message arrives it is decided.
    DeleteRequested { key: String, kind: EntityKind },
    /// User reset a ready entity back to idle. Local only.
    ResetRequested { key: String },
    /// An optimistic start action was rejected or unreachable.
    ActionRejected { key: String },
    /// A mutating action finished; re-fetch the authoritative snapshot.
    RefreshRequested,
    /// Fallback for placeholder wiring.
    NoOp,
}
