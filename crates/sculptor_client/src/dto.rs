//! Wire DTOs for the backend REST API and the progress channel.
//!
//! Loosely-typed JSON stops here: everything is parsed into these structs at
//! the transport boundary and converted to `sculptor_core` types before the
//! reconciler ever sees it. Non-conforming payloads are rejected by serde and
//! logged by the caller instead of propagating untyped data.

use serde::{Deserialize, Serialize};
use sculptor_core::{EntityKind, EntitySnapshot};

/// One element of `GET /library`.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaItemDto {
    pub alias: String,
    pub ready: bool,
    #[serde(default)]
    pub ingest_status: Option<String>,
    #[serde(default)]
    pub percent: u8,
    #[serde(default)]
    pub progress_text: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl From<MediaItemDto> for EntitySnapshot {
    fn from(dto: MediaItemDto) -> Self {
        EntitySnapshot {
            key: dto.alias,
            kind: EntityKind::MediaItem,
            ready: dto.ready,
            in_flight: dto.ingest_status.as_deref() == Some("processing"),
            percent: dto.percent.min(100),
            status_text: dto.progress_text,
            thumbnail: dto.thumbnail,
            path: dto.path,
        }
    }
}

/// One element of `GET /projects`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSummaryDto {
    pub name: String,
}

/// Body of `GET /projects/{name}`.
///
/// The backend answers `200` with an `error` field instead of a `404` when
/// the project is unknown; [`ProjectDetailDto::into_snapshot`] returns `None`
/// for that shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectDetailDto {
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub audio_ready: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub percent: u8,
    #[serde(default)]
    pub progress_text: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProjectDetailDto {
    pub fn into_snapshot(self, name: &str) -> Option<EntitySnapshot> {
        if self.error.is_some() {
            return None;
        }
        let status = self.status.as_deref().unwrap_or("idle");
        Some(EntitySnapshot {
            key: name.to_string(),
            kind: EntityKind::Project,
            ready: status == "ready",
            in_flight: status == "building",
            percent: self.percent.min(100),
            status_text: self.progress_text,
            thumbnail: None,
            path: None,
        })
    }
}

/// Body of `POST /ingest`.
#[derive(Debug, Clone, Serialize)]
pub struct IngestRequestDto {
    pub file_path: String,
    pub alias: String,
    pub fullname: String,
}

/// Body of `POST /build`.
#[derive(Debug, Clone, Serialize)]
pub struct BuildRequestDto {
    pub project_name: String,
    pub sources: Vec<String>,
    pub audio_path: Option<String>,
}

/// Body of `POST /projects/create`.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectCreateDto {
    pub name: String,
}

/// All known frame shapes on the shared `/ws/logs` channel.
///
/// Dispatched on the `"type"` field. The backend multiplexes job progress
/// with plain log lines over the same socket; anything else fails to parse
/// and is discarded by the consumer.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    Progress(ProgressFrame),
    Log(LogFrame),
}

/// `{"type":"progress", ...}` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressFrame {
    /// Entity key, overloaded across media aliases and project names.
    pub alias: String,
    /// Declared 0..=100; validated before leaving the transport layer.
    pub percent: i64,
    #[serde(default)]
    pub status: String,
}

/// `{"type":"log", ...}` frame emitted by the backend's log handler.
#[derive(Debug, Clone, Deserialize)]
pub struct LogFrame {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub level: String,
}
