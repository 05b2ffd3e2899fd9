use crate::state::TrackedEntity;
use crate::view_model::STARTING_TEXT;
use crate::{DetailOutcome, Effect, EngineState, EntitySnapshot, EntityStatus, Msg};

/// Pure update function: applies a message to state and returns any effects.
///
/// This is the whole reconciler. Snapshot results, channel events, timer
/// expirations and user actions all funnel through here, so every invariant
/// (monotonic display, settle-then-confirm eviction, generation-gated stale
/// discard) lives in one place and is testable without I/O.
pub fn update(mut state: EngineState, msg: Msg) -> (EngineState, Vec<Effect>) {
    let effects = match msg {
        Msg::CollectionLoaded(snapshots) => {
            apply_collection(&mut state, snapshots);
            Vec::new()
        }
        Msg::CollectionUnreachable => {
            if !state.degraded {
                state.degraded = true;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::DetailLoaded {
            key,
            generation,
            outcome,
        } => {
            apply_detail(&mut state, &key, generation, outcome);
            Vec::new()
        }
        Msg::ProgressEventReceived {
            key,
            percent,
            status_text,
        } => apply_event(&mut state, key, percent, status_text),
        Msg::PollTick => {
            if state.degraded || !state.loaded || state.any_processing() {
                vec![Effect::FetchCollection]
            } else {
                Vec::new()
            }
        }
        Msg::SettleElapsed { key, generation } => {
            // Stale timers (deleted or restarted entity) expire silently.
            match state.entities.get(&key) {
                Some(entity) if entity.generation == generation && entity.settle_pending => {
                    vec![Effect::FetchDetail {
                        key,
                        kind: entity.kind,
                        generation,
                    }]
                }
                _ => Vec::new(),
            }
        }
        Msg::IngestRequested {
            file_path,
            alias,
            fullname,
        } => {
            start_optimistic(&mut state, &alias, crate::EntityKind::MediaItem, true);
            vec![Effect::SubmitIngest {
                file_path,
                alias,
                fullname,
            }]
        }
        Msg::BuildRequested {
            project,
            sources,
            audio_path,
        } => {
            start_optimistic(&mut state, &project, crate::EntityKind::Project, false);
            vec![Effect::SubmitBuild {
                project,
                sources,
                audio_path,
            }]
        }
        Msg::CreateProjectRequested { name } => {
            vec![Effect::SubmitCreateProject { name }]
        }
        Msg::DeleteRequested { key, kind } => {
            state.entities.remove(&key);
            state.cache.evict(&key);
            state.mark_dirty();
            vec![Effect::SubmitDelete { key, kind }]
        }
        Msg::ResetRequested { key } => {
            if let Some(entity) = state.entities.get(&key) {
                if entity.status == EntityStatus::Ready {
                    let generation = state.next_gen();
                    let entity = state.entities.get_mut(&key).expect("entity present");
                    entity.status = EntityStatus::Idle;
                    entity.settle_pending = false;
                    entity.generation = generation;
                    state.cache.evict(&key);
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::ActionRejected { key } => {
            rollback(&mut state, &key);
            Vec::new()
        }
        Msg::RefreshRequested => vec![Effect::FetchCollection],
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Merges a full authoritative snapshot of the scope.
///
/// Entities absent from the snapshot are dropped unless they still have a
/// cache entry: an optimistically started job may not be visible to the
/// backend listing yet, and wiping it here would undo the optimistic state.
fn apply_collection(state: &mut EngineState, snapshots: Vec<EntitySnapshot>) {
    state.degraded = false;
    state.loaded = true;

    let seen: Vec<String> = snapshots.iter().map(|s| s.key.clone()).collect();
    for snapshot in snapshots {
        merge_snapshot(state, snapshot);
    }

    let stale: Vec<String> = state
        .entities
        .keys()
        .filter(|key| !seen.iter().any(|s| s == *key) && !state.cache.contains(key.as_str()))
        .cloned()
        .collect();
    for key in stale {
        state.entities.remove(&key);
    }

    // Every fetch completion notifies the view, even when nothing moved; the
    // presentation uses it to clear its own loading indicator.
    state.mark_dirty();
}

fn apply_detail(
    state: &mut EngineState,
    key: &str,
    generation: crate::Generation,
    outcome: DetailOutcome,
) {
    let current = match state.entities.get(key) {
        Some(entity) => entity.generation,
        // Deleted while the re-fetch was in flight: a stale completion.
        None => return,
    };
    if current != generation {
        return;
    }

    match outcome {
        DetailOutcome::Snapshot(snapshot) => {
            merge_snapshot(state, snapshot);
            state.mark_dirty();
        }
        DetailOutcome::NotFound => {
            state.entities.remove(key);
            state.cache.evict(key);
            state.mark_dirty();
        }
        // Keep processing; the fallback poll retries until the backend is
        // reachable again.
        DetailOutcome::Unreachable => {}
    }
}

/// Folds one authoritative snapshot into the tracked entity for its key.
fn merge_snapshot(state: &mut EngineState, snapshot: EntitySnapshot) {
    let generation = match state.entities.get(&snapshot.key) {
        Some(entity) => entity.generation,
        None => state.next_gen(),
    };
    let key = snapshot.key.clone();
    let entity = state
        .entities
        .entry(key.clone())
        .or_insert_with(|| TrackedEntity::new(snapshot.kind, generation));

    entity.provisional = false;
    entity.authoritative_ready = snapshot.ready;
    entity.thumbnail = snapshot.thumbnail;
    entity.path = snapshot.path;

    if snapshot.ready {
        if entity.settle_pending {
            // Terminal event observed earlier and the backend has now
            // committed: the completion settles and the entry goes away.
            entity.settle_pending = false;
            entity.status = EntityStatus::Ready;
            state.cache.evict(&key);
        } else if !state.cache.contains(&key) {
            entity.status = EntityStatus::Ready;
        }
    } else if snapshot.in_flight {
        entity.status = EntityStatus::Processing { optimistic: false };
        if snapshot.percent < 100 {
            // Restore progress lost to a missed event or a fresh mount. The
            // cache keeps the max, so a lagging snapshot cannot regress the
            // display below what events already showed.
            state
                .cache
                .upsert(&key, snapshot.percent, snapshot.status_text);
        }
    }
}

/// Applies one demultiplexed channel event.
fn apply_event(
    state: &mut EngineState,
    key: String,
    percent: u8,
    status_text: String,
) -> Vec<Effect> {
    if !state.scope().tracks(&key) {
        return Vec::new();
    }

    let kind = state.scope().kind();
    if !state.entities.contains_key(&key) {
        let generation = state.next_gen();
        state
            .entities
            .insert(key.clone(), TrackedEntity::new(kind, generation));
    }

    if !state.cache.upsert(&key, percent, status_text) {
        // Out-of-order or duplicate event below the displayed percent.
        return Vec::new();
    }

    let mut settle_generation = None;
    {
        let entity = state.entities.get_mut(&key).expect("entity present");
        // Server-sourced progress: the optimistic window closes and rollback
        // is no longer valid for this entity.
        entity.provisional = false;
        entity.status = EntityStatus::Processing { optimistic: false };
        if percent == 100 && !entity.settle_pending {
            entity.settle_pending = true;
            settle_generation = Some(entity.generation);
        }
    }
    state.mark_dirty();

    match settle_generation {
        Some(generation) => vec![Effect::ScheduleSettle { key, generation }],
        None => Vec::new(),
    }
}

/// idle -> processing on a user-initiated start, before any event arrives.
///
/// The generation bump makes any settle timer or re-fetch from a previous
/// run of the same key stale, and evicting first lets percent legitimately
/// reset to zero without fighting the monotonic floor.
fn start_optimistic(state: &mut EngineState, key: &str, kind: crate::EntityKind, provisional: bool) {
    let generation = state.next_gen();
    let is_new = !state.entities.contains_key(key);
    let entity = state
        .entities
        .entry(key.to_string())
        .or_insert_with(|| TrackedEntity::new(kind, generation));
    entity.generation = generation;
    entity.status = EntityStatus::Processing { optimistic: true };
    entity.settle_pending = false;
    if is_new {
        entity.provisional = provisional;
    }
    state.cache.evict(key);
    state.cache.upsert(key, 0, STARTING_TEXT);
    state.mark_dirty();
}

/// processing -> idle, only while the processing state is still optimistic.
fn rollback(state: &mut EngineState, key: &str) {
    let Some(entity) = state.entities.get(key) else {
        return;
    };
    if entity.status != (EntityStatus::Processing { optimistic: true }) {
        // Server-confirmed progress exists; the failed request raced a real
        // job and must not clobber it.
        return;
    }

    if entity.provisional {
        state.entities.remove(key);
    } else {
        let generation = state.next_gen();
        let entity = state.entities.get_mut(key).expect("entity present");
        entity.status = EntityStatus::Idle;
        entity.settle_pending = false;
        entity.generation = generation;
    }
    state.cache.evict(key);
    state.mark_dirty();
}
