use pretty_assertions::assert_eq;
use sculptor_core::{
    update, DetailOutcome, Effect, EngineState, EntityKind, EntitySnapshot, EntityStatus, Msg,
    ViewScope,
};

fn event(key: &str, percent: u8, text: &str) -> Msg {
    Msg::ProgressEventReceived {
        key: key.to_string(),
        percent,
        status_text: text.to_string(),
    }
}

fn ready_snapshot(key: &str, kind: EntityKind) -> EntitySnapshot {
    EntitySnapshot {
        key: key.to_string(),
        kind,
        ready: true,
        in_flight: false,
        percent: 100,
        status_text: String::new(),
        thumbnail: None,
        path: None,
    }
}

#[test]
fn displayed_percent_is_the_maximum_observed() {
    let mut state = EngineState::new(ViewScope::Library);
    for (percent, text) in [
        (10, "a"),
        (50, "b"),
        (30, "late"),
        (50, "c"),
        (20, "later"),
        (49, "latest"),
    ] {
        let (next, _) = update(state, event("sunset", percent, text));
        state = next;
    }

    let view = state.view();
    let row = view.row("sunset").unwrap();
    assert_eq!(row.percent, 50);
    // The last accepted event owns the text; rejected ones left no trace.
    assert_eq!(row.status_text, "c");
}

#[test]
fn terminal_event_schedules_exactly_one_settle() {
    let state = EngineState::new(ViewScope::Library);
    let (state, effects) = update(state, event("sunset", 100, "Done"));
    let generation = state.entity("sunset").unwrap().generation;
    assert_eq!(
        effects,
        vec![Effect::ScheduleSettle {
            key: "sunset".into(),
            generation,
        }]
    );

    // Duplicate terminal events must not re-arm the timer.
    let (state, effects) = update(state, event("sunset", 100, "Done"));
    assert!(effects.is_empty());
    let (_state, effects) = update(state, event("sunset", 100, "Done"));
    assert!(effects.is_empty());
}

#[test]
fn completion_converges_after_settle_and_confirming_fetch() {
    let state = EngineState::new(ViewScope::Library);
    let (state, _) = update(state, event("sunset", 100, "Done"));
    let generation = state.entity("sunset").unwrap().generation;

    let (state, effects) = update(
        state,
        Msg::SettleElapsed {
            key: "sunset".into(),
            generation,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::FetchDetail {
            key: "sunset".into(),
            kind: EntityKind::MediaItem,
            generation,
        }]
    );

    let (state, _) = update(
        state,
        Msg::DetailLoaded {
            key: "sunset".into(),
            generation,
            outcome: DetailOutcome::Snapshot(ready_snapshot("sunset", EntityKind::MediaItem)),
        },
    );

    let view = state.view();
    let row = view.row("sunset").unwrap();
    assert_eq!(row.state, EntityStatus::Ready);
    assert!(!row.is_processing);
    assert!(state.cache().get("sunset").is_none());
}

#[test]
fn unconfirmed_completion_keeps_processing_and_polling() {
    let state = EngineState::new(ViewScope::Library);
    let (state, _) = update(state, event("sunset", 100, "Done"));
    let generation = state.entity("sunset").unwrap().generation;
    let (state, _) = update(
        state,
        Msg::SettleElapsed {
            key: "sunset".into(),
            generation,
        },
    );

    // Backend has not committed yet: still processing after the re-fetch.
    let (state, _) = update(
        state,
        Msg::DetailLoaded {
            key: "sunset".into(),
            generation,
            outcome: DetailOutcome::Snapshot(EntitySnapshot {
                ready: false,
                in_flight: true,
                ..ready_snapshot("sunset", EntityKind::MediaItem)
            }),
        },
    );
    assert!(state.is_processing("sunset"));

    // The fallback poll keeps fetching while anything is processing.
    let (state, effects) = update(state, Msg::PollTick);
    assert_eq!(effects, vec![Effect::FetchCollection]);

    // Eventually the poll fetch confirms and the entry is evicted.
    let (state, _) = update(
        state,
        Msg::CollectionLoaded(vec![ready_snapshot("sunset", EntityKind::MediaItem)]),
    );
    assert_eq!(
        state.entity("sunset").unwrap().status,
        EntityStatus::Ready
    );
    assert!(state.cache().get("sunset").is_none());
}

#[test]
fn poll_is_quiet_when_nothing_is_processing() {
    let state = EngineState::new(ViewScope::Library);
    let (state, _) = update(
        state,
        Msg::CollectionLoaded(vec![ready_snapshot("dragon", EntityKind::MediaItem)]),
    );
    let (_state, effects) = update(state, Msg::PollTick);
    assert!(effects.is_empty());
}

#[test]
fn poll_retries_while_degraded() {
    let state = EngineState::new(ViewScope::Library);
    let (state, _) = update(state, Msg::CollectionUnreachable);
    let (_state, effects) = update(state, Msg::PollTick);
    assert_eq!(effects, vec![Effect::FetchCollection]);
}

#[test]
fn stale_settle_timer_is_discarded() {
    let state = EngineState::new(ViewScope::Library);
    let (state, _) = update(state, event("sunset", 100, "Done"));
    let old_generation = state.entity("sunset").unwrap().generation;

    let (_state, effects) = update(
        state,
        Msg::SettleElapsed {
            key: "sunset".into(),
            generation: old_generation + 1,
        },
    );
    assert!(effects.is_empty());
}

#[test]
fn project_scope_ignores_events_for_other_keys() {
    let state = EngineState::new(ViewScope::Project("Trailer".into()));
    let (state, effects) = update(state, event("sunset", 30, "Analyzing frames"));
    assert!(effects.is_empty());
    assert!(state.entity("sunset").is_none());

    let (state, _) = update(state, event("Trailer", 30, "Cutting"));
    let entity = state.entity("Trailer").unwrap();
    assert_eq!(entity.kind, EntityKind::Project);
    assert_eq!(state.view().row("Trailer").unwrap().percent, 30);
}

#[test]
fn event_for_unknown_key_materializes_a_tracked_entity() {
    let state = EngineState::new(ViewScope::Library);
    let (state, _) = update(state, event("fresh_ingest", 5, "Probing file"));
    let entity = state.entity("fresh_ingest").unwrap();
    assert_eq!(entity.kind, EntityKind::MediaItem);
    assert!(!entity.authoritative_ready);
    assert!(state.is_processing("fresh_ingest"));
}

#[test]
fn event_alone_never_flips_authoritative_ready() {
    let state = EngineState::new(ViewScope::Library);
    let (state, _) = update(state, event("sunset", 100, "Done"));
    let entity = state.entity("sunset").unwrap();
    assert!(!entity.authoritative_ready);
    assert!(entity.settle_pending);
    // Still displayed as processing until a snapshot confirms.
    assert!(state.is_processing("sunset"));
}
