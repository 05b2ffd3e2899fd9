use pretty_assertions::assert_eq;
use sculptor_core::{
    update, DetailOutcome, Effect, EngineState, EntityKind, EntitySnapshot, EntityStatus, Msg,
    ViewScope, STARTING_TEXT,
};

fn project_snapshot(name: &str, status: EntityStatus) -> EntitySnapshot {
    let ready = status == EntityStatus::Ready;
    EntitySnapshot {
        key: name.to_string(),
        kind: EntityKind::Project,
        ready,
        in_flight: matches!(status, EntityStatus::Processing { .. }),
        percent: if ready { 100 } else { 0 },
        status_text: String::new(),
        thumbnail: None,
        path: None,
    }
}

fn start_build(state: EngineState, name: &str) -> (EngineState, Vec<Effect>) {
    update(
        state,
        Msg::BuildRequested {
            project: name.to_string(),
            sources: vec!["dragon".into(), "sunset".into()],
            audio_path: Some("/music/track.mp3".into()),
        },
    )
}

#[test]
fn accepted_build_is_optimistically_processing() {
    let state = EngineState::new(ViewScope::Project("Trailer".into()));
    let (state, _) = update(
        state,
        Msg::CollectionLoaded(vec![project_snapshot("Trailer", EntityStatus::Idle)]),
    );

    let (state, effects) = start_build(state, "Trailer");
    assert_eq!(
        effects,
        vec![Effect::SubmitBuild {
            project: "Trailer".into(),
            sources: vec!["dragon".into(), "sunset".into()],
            audio_path: Some("/music/track.mp3".into()),
        }]
    );

    let view = state.view();
    let row = view.row("Trailer").unwrap();
    assert_eq!(row.state, EntityStatus::Processing { optimistic: true });
    assert!(row.is_processing);
    assert_eq!(row.percent, 0);
    assert_eq!(row.status_text, STARTING_TEXT);

    // The first channel event overrides the optimistic placeholder.
    let (state, _) = update(
        state,
        Msg::ProgressEventReceived {
            key: "Trailer".into(),
            percent: 4,
            status_text: "Loading sources".into(),
        },
    );
    let view = state.view();
    let row = view.row("Trailer").unwrap();
    assert_eq!(row.state, EntityStatus::Processing { optimistic: false });
    assert_eq!(row.percent, 4);
    assert_eq!(row.status_text, "Loading sources");
}

#[test]
fn rejected_build_rolls_back_to_idle() {
    let state = EngineState::new(ViewScope::Project("Trailer".into()));
    let (state, _) = update(
        state,
        Msg::CollectionLoaded(vec![project_snapshot("Trailer", EntityStatus::Idle)]),
    );
    let (state, _) = start_build(state, "Trailer");

    let (state, effects) = update(state, Msg::ActionRejected { key: "Trailer".into() });
    assert!(effects.is_empty());

    let view = state.view();
    let row = view.row("Trailer").unwrap();
    assert_eq!(row.state, EntityStatus::Idle);
    assert_eq!(row.percent, 0);
    assert!(state.cache().get("Trailer").is_none());
}

#[test]
fn rollback_is_invalid_once_progress_is_server_confirmed() {
    let state = EngineState::new(ViewScope::Project("Trailer".into()));
    let (state, _) = start_build(state, "Trailer");
    let (state, _) = update(
        state,
        Msg::ProgressEventReceived {
            key: "Trailer".into(),
            percent: 10,
            status_text: "Cutting".into(),
        },
    );

    // A late rejection (e.g. timeout response racing a real job) must not
    // clobber confirmed progress.
    let (state, _) = update(state, Msg::ActionRejected { key: "Trailer".into() });
    let row_state = state.view().row("Trailer").unwrap().state;
    assert_eq!(row_state, EntityStatus::Processing { optimistic: false });
    assert_eq!(state.view().row("Trailer").unwrap().percent, 10);
}

#[test]
fn restart_resets_percent_despite_monotonic_floor() {
    let state = EngineState::new(ViewScope::Project("Trailer".into()));
    let (state, _) = update(
        state,
        Msg::ProgressEventReceived {
            key: "Trailer".into(),
            percent: 100,
            status_text: "Done".into(),
        },
    );

    let (state, _) = start_build(state, "Trailer");
    let row = state.view().row("Trailer").unwrap().clone();
    assert_eq!(row.percent, 0);
    assert_eq!(row.status_text, STARTING_TEXT);
}

#[test]
fn restart_invalidates_settle_timer_of_previous_run() {
    let state = EngineState::new(ViewScope::Project("Trailer".into()));
    let (state, _) = update(
        state,
        Msg::ProgressEventReceived {
            key: "Trailer".into(),
            percent: 100,
            status_text: "Done".into(),
        },
    );
    let old_generation = state.entity("Trailer").unwrap().generation;

    let (state, _) = start_build(state, "Trailer");
    let (_state, effects) = update(
        state,
        Msg::SettleElapsed {
            key: "Trailer".into(),
            generation: old_generation,
        },
    );
    assert!(effects.is_empty());
}

#[test]
fn ingest_rejection_removes_the_provisional_entity() {
    let state = EngineState::new(ViewScope::Library);
    let (state, effects) = update(
        state,
        Msg::IngestRequested {
            file_path: "/films/sunset.mkv".into(),
            alias: "sunset".into(),
            fullname: "Sunset Boulevard".into(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::SubmitIngest {
            file_path: "/films/sunset.mkv".into(),
            alias: "sunset".into(),
            fullname: "Sunset Boulevard".into(),
        }]
    );
    assert!(state.entity("sunset").is_some());

    // Alias collision: the entity never existed backend-side, so it vanishes.
    let (state, _) = update(state, Msg::ActionRejected { key: "sunset".into() });
    assert!(state.entity("sunset").is_none());
    assert!(state.cache().get("sunset").is_none());
}

#[test]
fn delete_removes_entity_and_discards_outstanding_settle_refetch() {
    let state = EngineState::new(ViewScope::Library);
    let (state, _) = update(
        state,
        Msg::ProgressEventReceived {
            key: "sunset".into(),
            percent: 100,
            status_text: "Done".into(),
        },
    );
    let generation = state.entity("sunset").unwrap().generation;

    let (state, effects) = update(
        state,
        Msg::DeleteRequested {
            key: "sunset".into(),
            kind: EntityKind::MediaItem,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::SubmitDelete {
            key: "sunset".into(),
            kind: EntityKind::MediaItem,
        }]
    );
    assert!(state.entity("sunset").is_none());
    assert!(state.cache().get("sunset").is_none());

    // The settle timer armed before the delete fires into the void.
    let (state, effects) = update(
        state,
        Msg::SettleElapsed {
            key: "sunset".into(),
            generation,
        },
    );
    assert!(effects.is_empty());

    // So does a re-fetch that was already in flight.
    let (state, _) = update(
        state,
        Msg::DetailLoaded {
            key: "sunset".into(),
            generation,
            outcome: DetailOutcome::Snapshot(project_snapshot("sunset", EntityStatus::Ready)),
        },
    );
    assert!(state.entity("sunset").is_none());
}

#[test]
fn reset_is_local_and_only_valid_from_ready() {
    let state = EngineState::new(ViewScope::Project("Trailer".into()));
    let (state, _) = update(
        state,
        Msg::CollectionLoaded(vec![project_snapshot("Trailer", EntityStatus::Ready)]),
    );
    assert_eq!(
        state.entity("Trailer").unwrap().status,
        EntityStatus::Ready
    );

    let (state, effects) = update(state, Msg::ResetRequested { key: "Trailer".into() });
    assert!(effects.is_empty());
    assert_eq!(state.entity("Trailer").unwrap().status, EntityStatus::Idle);

    // Resetting an idle entity is a no-op.
    let (mut state, _) = update(state, Msg::ResetRequested { key: "Trailer".into() });
    assert_eq!(state.entity("Trailer").unwrap().status, EntityStatus::Idle);
    state.consume_dirty();
    let (mut state, _) = update(state, Msg::ResetRequested { key: "Trailer".into() });
    assert!(!state.consume_dirty());
}

#[test]
fn detail_not_found_drops_the_entity() {
    let state = EngineState::new(ViewScope::Project("Trailer".into()));
    let (state, _) = update(
        state,
        Msg::ProgressEventReceived {
            key: "Trailer".into(),
            percent: 100,
            status_text: "Done".into(),
        },
    );
    let generation = state.entity("Trailer").unwrap().generation;

    let (state, _) = update(
        state,
        Msg::DetailLoaded {
            key: "Trailer".into(),
            generation,
            outcome: DetailOutcome::NotFound,
        },
    );
    assert!(state.entity("Trailer").is_none());
    assert!(state.cache().get("Trailer").is_none());
}

#[test]
fn refresh_and_create_emit_their_effects() {
    let state = EngineState::new(ViewScope::Library);
    let (state, effects) = update(state, Msg::RefreshRequested);
    assert_eq!(effects, vec![Effect::FetchCollection]);

    let (_state, effects) = update(
        state,
        Msg::CreateProjectRequested {
            name: "Trailer".into(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::SubmitCreateProject {
            name: "Trailer".into(),
        }]
    );
}
