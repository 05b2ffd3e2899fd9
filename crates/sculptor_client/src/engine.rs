//! Engine runtime: one thread, one single-threaded tokio runtime, one loop.
//!
//! The loop owns the [`sculptor_core::EngineState`] outright and is the only
//! writer. Fetches and settle timers run as spawned tasks on the same
//! current-thread runtime and report back as [`Msg`]s, so state mutation is
//! strictly sequential and needs no locks. Dropping the handle (view
//! unmount) stops the loop and the runtime, which cancels every outstanding
//! task and timer; nothing can fire after teardown.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use sculptor_core::{update, Effect, EngineState, EngineViewModel, EntityKind, Msg, ViewScope};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;

use crate::api::{ApiError, ClientSettings, HttpSnapshotApi, SnapshotApi};
use crate::channel::{ProgressFeed, ProgressUpdate, WsProgressFeed};
use crate::dto::{BuildRequestDto, IngestRequestDto};

/// User-initiated actions, forwarded from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ingest {
        file_path: String,
        alias: String,
        fullname: String,
    },
    StartBuild {
        project: String,
        sources: Vec<String>,
        audio_path: Option<String>,
    },
    CreateProject {
        name: String,
    },
    /// Deletion is irreversible; the caller must have confirmed it with the
    /// user before sending this.
    Delete {
        kind: EntityKind,
        key: String,
    },
    Reset {
        key: String,
    },
    Refresh,
    Shutdown,
}

/// Which action a failure notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Ingest,
    Build,
    CreateProject,
    Delete,
}

/// Engine-to-presentation notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Emitted on every cache mutation, state transition or fetch
    /// completion/failure that changed the derived view.
    ViewChanged(EngineViewModel),
    /// A mutating action was rejected or unreachable. Surfaced only here,
    /// to the initiating view; the reconciler has already rolled back.
    ActionFailed {
        action: ActionKind,
        key: String,
        message: String,
    },
}

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub scope: ViewScope,
    pub settings: ClientSettings,
    pub channel_url: String,
    /// Fallback-poll period while anything is processing or degraded.
    pub poll_interval: Duration,
    /// Pause between a terminal event and the confirming re-fetch, covering
    /// backend finalization latency.
    pub settle_delay: Duration,
}

impl EngineConfig {
    pub fn new(scope: ViewScope) -> Self {
        Self {
            scope,
            settings: ClientSettings::default(),
            channel_url: "ws://localhost:8000/ws/logs".to_string(),
            poll_interval: Duration::from_secs(2),
            settle_delay: Duration::from_secs(1),
        }
    }
}

/// Owning handle for one engine instance.
///
/// Construction is the view mount: it starts the loop, opens the channel and
/// issues the initial snapshot fetch. Dropping it is the unmount.
pub struct EngineHandle {
    cmd_tx: UnboundedSender<Command>,
    note_rx: mpsc::Receiver<Notification>,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    /// Starts an engine against the real HTTP and WebSocket transports.
    pub fn new(config: EngineConfig) -> Result<Self, ApiError> {
        let api: Arc<dyn SnapshotApi> = Arc::new(HttpSnapshotApi::new(config.settings.clone())?);
        Ok(Self::with_transport(config, api, None))
    }

    /// Starts an engine over caller-supplied transports. `feed: None` means
    /// connect the WebSocket named by the config; tests pass fakes for both.
    pub fn with_transport(
        config: EngineConfig,
        api: Arc<dyn SnapshotApi>,
        feed: Option<Box<dyn ProgressFeed>>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = unbounded_channel();
        let (note_tx, note_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("tokio runtime");
            runtime.block_on(async move {
                let feed = match feed {
                    Some(feed) => feed,
                    None => match WsProgressFeed::connect(&config.channel_url).await {
                        Ok(ws) => Box::new(ws) as Box<dyn ProgressFeed>,
                        Err(err) => {
                            engine_warn!("{err}; relying on snapshot polls only");
                            Box::new(SilentFeed)
                        }
                    },
                };
                run_loop(config, api, feed, cmd_rx, note_tx).await;
            });
            // Dropping the runtime here aborts outstanding fetch tasks and
            // settle timers before the thread exits.
        });

        Self {
            cmd_tx,
            note_rx,
            worker: Some(worker),
        }
    }

    pub fn send(&self, command: Command) {
        let _ = self.cmd_tx.send(command);
    }

    /// Non-blocking notification poll, for UI frame callbacks.
    pub fn try_recv(&self) -> Option<Notification> {
        self.note_rx.try_recv().ok()
    }

    /// Blocking notification poll with a deadline.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Notification> {
        self.note_rx.recv_timeout(timeout).ok()
    }

    /// Stops the loop and joins the engine thread.
    pub fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Feed used when the channel cannot be opened: never yields, never closes.
struct SilentFeed;

#[async_trait::async_trait]
impl ProgressFeed for SilentFeed {
    async fn next_update(&mut self) -> Option<ProgressUpdate> {
        std::future::pending().await
    }
}

async fn run_loop(
    config: EngineConfig,
    api: Arc<dyn SnapshotApi>,
    mut feed: Box<dyn ProgressFeed>,
    mut cmd_rx: UnboundedReceiver<Command>,
    note_tx: mpsc::Sender<Notification>,
) {
    engine_info!("engine loop started, scope {:?}", config.scope);
    let mut state = EngineState::new(config.scope.clone());
    let (msg_tx, mut msg_rx) = unbounded_channel::<Msg>();

    // First tick only after one full period; the mount fetch covers now.
    let start = tokio::time::Instant::now() + config.poll_interval;
    let mut poll = tokio::time::interval_at(start, config.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut feed_open = true;

    execute(Effect::FetchCollection, &config, &api, &msg_tx, &note_tx);

    loop {
        tokio::select! {
            command = cmd_rx.recv() => {
                match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => {
                        state = apply(state, command_msg(command), &config, &api, &msg_tx, &note_tx);
                    }
                }
            }
            update = feed.next_update(), if feed_open => {
                match update {
                    Some(ProgressUpdate { key, percent, status_text }) => {
                        state = apply(
                            state,
                            Msg::ProgressEventReceived { key, percent, status_text },
                            &config, &api, &msg_tx, &note_tx,
                        );
                    }
                    None => {
                        // No reconnect here: a fresh mount is the reconnect.
                        feed_open = false;
                        engine_info!("progress channel gone; snapshot polls carry the view");
                    }
                }
            }
            Some(msg) = msg_rx.recv() => {
                state = apply(state, msg, &config, &api, &msg_tx, &note_tx);
            }
            _ = poll.tick() => {
                state = apply(state, Msg::PollTick, &config, &api, &msg_tx, &note_tx);
            }
        }
    }
    engine_info!("engine loop stopped");
}

/// Runs one message through the reconciler, executes the returned effects
/// and emits a change notification when the view moved.
fn apply(
    state: EngineState,
    msg: Msg,
    config: &EngineConfig,
    api: &Arc<dyn SnapshotApi>,
    msg_tx: &UnboundedSender<Msg>,
    note_tx: &mpsc::Sender<Notification>,
) -> EngineState {
    let (mut state, effects) = update(state, msg);
    for effect in effects {
        execute(effect, config, api, msg_tx, note_tx);
    }
    if state.consume_dirty() {
        let _ = note_tx.send(Notification::ViewChanged(state.view()));
    }
    state
}

fn command_msg(command: Command) -> Msg {
    match command {
        Command::Ingest {
            file_path,
            alias,
            fullname,
        } => Msg::IngestRequested {
            file_path,
            alias,
            fullname,
        },
        Command::StartBuild {
            project,
            sources,
            audio_path,
        } => Msg::BuildRequested {
            project,
            sources,
            audio_path,
        },
        Command::CreateProject { name } => Msg::CreateProjectRequested { name },
        Command::Delete { kind, key } => Msg::DeleteRequested { key, kind },
        Command::Reset { key } => Msg::ResetRequested { key },
        Command::Refresh => Msg::RefreshRequested,
        Command::Shutdown => Msg::NoOp,
    }
}

/// Spawns the asynchronous half of one effect on the loop's runtime.
fn execute(
    effect: Effect,
    config: &EngineConfig,
    api: &Arc<dyn SnapshotApi>,
    msg_tx: &UnboundedSender<Msg>,
    note_tx: &mpsc::Sender<Notification>,
) {
    match effect {
        Effect::FetchCollection => {
            let api = api.clone();
            let scope = config.scope.clone();
            let msg_tx = msg_tx.clone();
            tokio::spawn(async move {
                let msg = match api.fetch_collection(&scope).await {
                    Ok(snapshots) => Msg::CollectionLoaded(snapshots),
                    Err(err) => {
                        engine_warn!("collection fetch failed: {err}");
                        Msg::CollectionUnreachable
                    }
                };
                let _ = msg_tx.send(msg);
            });
        }
        Effect::FetchDetail {
            key,
            kind,
            generation,
        } => {
            let api = api.clone();
            let msg_tx = msg_tx.clone();
            tokio::spawn(async move {
                let outcome = match api.fetch_detail(kind, &key).await {
                    Ok(Some(snapshot)) => sculptor_core::DetailOutcome::Snapshot(snapshot),
                    Ok(None) => sculptor_core::DetailOutcome::NotFound,
                    Err(err) => {
                        engine_warn!("detail fetch for '{key}' failed: {err}");
                        sculptor_core::DetailOutcome::Unreachable
                    }
                };
                let _ = msg_tx.send(Msg::DetailLoaded {
                    key,
                    generation,
                    outcome,
                });
            });
        }
        Effect::ScheduleSettle { key, generation } => {
            let delay = config.settle_delay;
            let msg_tx = msg_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = msg_tx.send(Msg::SettleElapsed { key, generation });
            });
        }
        Effect::SubmitIngest {
            file_path,
            alias,
            fullname,
        } => {
            let api = api.clone();
            let msg_tx = msg_tx.clone();
            let note_tx = note_tx.clone();
            tokio::spawn(async move {
                let request = IngestRequestDto {
                    file_path,
                    alias: alias.clone(),
                    fullname,
                };
                match api.ingest(request).await {
                    Ok(()) => {
                        engine_info!("ingest accepted for '{alias}'");
                        let _ = msg_tx.send(Msg::RefreshRequested);
                    }
                    Err(err) => {
                        let _ = note_tx.send(Notification::ActionFailed {
                            action: ActionKind::Ingest,
                            key: alias.clone(),
                            message: err.to_string(),
                        });
                        let _ = msg_tx.send(Msg::ActionRejected { key: alias });
                    }
                }
            });
        }
        Effect::SubmitBuild {
            project,
            sources,
            audio_path,
        } => {
            let api = api.clone();
            let msg_tx = msg_tx.clone();
            let note_tx = note_tx.clone();
            tokio::spawn(async move {
                let request = BuildRequestDto {
                    project_name: project.clone(),
                    sources,
                    audio_path,
                };
                match api.start_build(request).await {
                    Ok(()) => {
                        engine_info!("build accepted for '{project}'");
                        let _ = msg_tx.send(Msg::RefreshRequested);
                    }
                    Err(err) => {
                        let _ = note_tx.send(Notification::ActionFailed {
                            action: ActionKind::Build,
                            key: project.clone(),
                            message: err.to_string(),
                        });
                        let _ = msg_tx.send(Msg::ActionRejected { key: project });
                    }
                }
            });
        }
        Effect::SubmitCreateProject { name } => {
            let api = api.clone();
            let msg_tx = msg_tx.clone();
            let note_tx = note_tx.clone();
            tokio::spawn(async move {
                match api.create_project(&name).await {
                    Ok(()) => {
                        let _ = msg_tx.send(Msg::RefreshRequested);
                    }
                    Err(err) => {
                        let _ = note_tx.send(Notification::ActionFailed {
                            action: ActionKind::CreateProject,
                            key: name,
                            message: err.to_string(),
                        });
                    }
                }
            });
        }
        Effect::SubmitDelete { key, kind } => {
            let api = api.clone();
            let msg_tx = msg_tx.clone();
            let note_tx = note_tx.clone();
            tokio::spawn(async move {
                if let Err(err) = api.delete_entity(kind, &key).await {
                    let _ = note_tx.send(Notification::ActionFailed {
                        action: ActionKind::Delete,
                        key,
                        message: err.to_string(),
                    });
                }
                // Re-fetch either way: it confirms the removal, or restores
                // the entity the reconciler dropped optimistically.
                let _ = msg_tx.send(Msg::RefreshRequested);
            });
        }
    }
}
