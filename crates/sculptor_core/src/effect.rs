use crate::{EntityKind, Generation};

/// Side effects requested by [`crate::update`], executed by the runtime.
///
/// Fetch results and timer expirations come back as [`crate::Msg`] values;
/// the `generation` carried by the tagged variants is echoed back so stale
/// completions can be discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the authoritative snapshot for the whole scope.
    FetchCollection,
    /// Fetch the authoritative snapshot for one key (settle re-fetch).
    FetchDetail {
        key: String,
        kind: EntityKind,
        generation: Generation,
    },
    /// Arm the one-shot settle timer for a key that just went terminal.
    ScheduleSettle { key: String, generation: Generation },
    /// POST /ingest.
    SubmitIngest {
        file_path: String,
        alias: String,
        fullname: String,
    },
    /// POST /build.
    SubmitBuild {
        project: String,
        sources: Vec<String>,
        audio_path: Option<String>,
    },
    /// POST /projects/create.
    SubmitCreateProject { name: String },
    /// DELETE /library/{alias} or /projects/{name}.
    SubmitDelete { key: String, kind: EntityKind },
}
