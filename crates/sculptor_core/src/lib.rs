//! Sculptor core: pure job-progress reconciliation state machine.
//!
//! Everything in this crate is synchronous and free of I/O. The runtime in
//! `sculptor_client` feeds [`Msg`] values into [`update`] and executes the
//! returned [`Effect`]s against the backend.
mod cache;
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use cache::{ProgressCache, ProgressEntry};
pub use effect::Effect;
pub use msg::{DetailOutcome, Msg};
pub use state::{
    EngineState, EntityKind, EntitySnapshot, EntityStatus, Generation, TrackedEntity, ViewScope,
};
pub use update::update;
pub use view_model::{EngineViewModel, EntityRowView, QUEUED_TEXT, STARTING_TEXT};
