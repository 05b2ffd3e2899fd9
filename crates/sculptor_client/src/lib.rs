//! Sculptor client: transports and runtime around the pure reconciler.
//!
//! [`EngineHandle`] is the unit of lifecycle: construct it when a view
//! mounts, drop it when the view unmounts. Everything in between flows
//! through [`Command`]s in and [`Notification`]s out.
mod api;
mod channel;
mod dto;
mod engine;

pub use api::{ApiError, ClientSettings, HttpSnapshotApi, SnapshotApi};
pub use channel::{ChannelError, ProgressFeed, ProgressUpdate, WsProgressFeed};
pub use dto::{
    BuildRequestDto, ChannelMessage, IngestRequestDto, LogFrame, MediaItemDto, ProgressFrame,
    ProjectCreateDto, ProjectDetailDto, ProjectSummaryDto,
};
pub use engine::{ActionKind, Command, EngineConfig, EngineHandle, Notification};
