//! REST snapshot fetcher and mutating actions.

use std::time::Duration;

use sculptor_core::{EntityKind, EntitySnapshot, ViewScope};

use crate::dto::{
    BuildRequestDto, IngestRequestDto, MediaItemDto, ProjectCreateDto, ProjectDetailDto,
    ProjectSummaryDto,
};

/// Transport-level failures of the snapshot fetcher and action submitters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// Network failure or timeout. Recovered by the next scheduled poll;
    /// degrades the view, never fatal.
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    /// The backend answered 404 for the requested key.
    #[error("not found")]
    NotFound,
    /// The backend refused a mutating action (e.g. an alias collision).
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    /// The response body did not match the expected DTO shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Whether the initiating action was refused, as opposed to never
    /// reaching the backend. Both roll an optimistic start back.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected { .. } | ApiError::NotFound)
    }
}

/// Connection parameters for [`HttpSnapshotApi`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Pull-based access to the backend's authoritative state.
///
/// All reads are idempotent and side-effect free; calling them repeatedly is
/// safe and is exactly what the fallback poll does. Mutating actions return
/// `Ok(())` on 2xx and [`ApiError::Rejected`] otherwise.
#[async_trait::async_trait]
pub trait SnapshotApi: Send + Sync {
    /// Authoritative snapshots for every entity in `scope`.
    async fn fetch_collection(&self, scope: &ViewScope) -> Result<Vec<EntitySnapshot>, ApiError>;

    /// Authoritative snapshot for one key; `None` when the backend no longer
    /// knows it.
    async fn fetch_detail(
        &self,
        kind: EntityKind,
        key: &str,
    ) -> Result<Option<EntitySnapshot>, ApiError>;

    /// Names of all projects, for the presentation's project picker. Not
    /// used by the engine loop itself.
    async fn list_projects(&self) -> Result<Vec<String>, ApiError>;

    async fn ingest(&self, request: IngestRequestDto) -> Result<(), ApiError>;
    async fn start_build(&self, request: BuildRequestDto) -> Result<(), ApiError>;
    async fn create_project(&self, name: &str) -> Result<(), ApiError>;
    async fn delete_entity(&self, kind: EntityKind, key: &str) -> Result<(), ApiError>;
}

/// [`SnapshotApi`] over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpSnapshotApi {
    settings: ClientSettings,
    client: reqwest::Client,
}

impl HttpSnapshotApi {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::Unreachable(err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(map_transport)?;
        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::Malformed(err.to_string()))
    }

    async fn post_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_transport)?;
        check_status(response).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .map_err(map_transport)?;
        check_status(response).await
    }
}

#[async_trait::async_trait]
impl SnapshotApi for HttpSnapshotApi {
    async fn fetch_collection(&self, scope: &ViewScope) -> Result<Vec<EntitySnapshot>, ApiError> {
        match scope {
            ViewScope::Library => {
                let items: Vec<MediaItemDto> = self.get_json("/library").await?;
                Ok(items.into_iter().map(EntitySnapshot::from).collect())
            }
            ViewScope::Project(name) => {
                // A deleted project yields an empty collection rather than an
                // error; the reconciler drops the tracked entity itself.
                match self.fetch_detail(EntityKind::Project, name).await? {
                    Some(snapshot) => Ok(vec![snapshot]),
                    None => Ok(Vec::new()),
                }
            }
        }
    }

    async fn fetch_detail(
        &self,
        kind: EntityKind,
        key: &str,
    ) -> Result<Option<EntitySnapshot>, ApiError> {
        match kind {
            EntityKind::MediaItem => {
                // The backend has no per-alias GET; filter the listing.
                let items: Vec<MediaItemDto> = self.get_json("/library").await?;
                Ok(items
                    .into_iter()
                    .find(|item| item.alias == key)
                    .map(EntitySnapshot::from))
            }
            EntityKind::Project => {
                let detail: ProjectDetailDto =
                    match self.get_json(&format!("/projects/{key}")).await {
                        Ok(detail) => detail,
                        Err(ApiError::NotFound) => return Ok(None),
                        Err(err) => return Err(err),
                    };
                Ok(detail.into_snapshot(key))
            }
        }
    }

    async fn list_projects(&self) -> Result<Vec<String>, ApiError> {
        let projects: Vec<ProjectSummaryDto> = self.get_json("/projects").await?;
        Ok(projects.into_iter().map(|p| p.name).collect())
    }

    async fn ingest(&self, request: IngestRequestDto) -> Result<(), ApiError> {
        self.post_json("/ingest", &request).await
    }

    async fn start_build(&self, request: BuildRequestDto) -> Result<(), ApiError> {
        self.post_json("/build", &request).await
    }

    async fn create_project(&self, name: &str) -> Result<(), ApiError> {
        self.post_json(
            "/projects/create",
            &ProjectCreateDto {
                name: name.to_string(),
            },
        )
        .await
    }

    async fn delete_entity(&self, kind: EntityKind, key: &str) -> Result<(), ApiError> {
        let path = match kind {
            EntityKind::MediaItem => format!("/library/{key}"),
            EntityKind::Project => format!("/projects/{key}"),
        };
        self.delete(&path).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Rejected {
        status: status.as_u16(),
        body,
    })
}

fn map_transport(err: reqwest::Error) -> ApiError {
    ApiError::Unreachable(err.to_string())
}
