pub mod content;
pub mod draft;
pub mod export;
pub mod generator;
pub mod html;
pub mod images;
pub mod keywords;
pub mod links;
pub mod outline;
pub mod titles;
pub mod wizard;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::state::AppState;
use draft::DraftAction;
use export::ExportFormat;
use generator::StageConfig;
use wizard::WizardSession;

pub use html::{insert_images_into_content, insert_links_into_content};
pub use outline::generate_mock_outlines;

#[derive(Debug, thiserror::Error)]
pub enum SeoError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Stage in progress: {0}")]
    StageInFlight(String),
    #[error("Cancelled: {0}")]
    Cancelled(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

#[cfg(feature = "llm")]
impl From<crate::llm::LlmError> for SeoError {
    fn from(e: crate::llm::LlmError) -> Self {
        match e {
            crate::llm::LlmError::NotConfigured(msg) => Self::Unavailable(msg),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for SeoError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::StageInFlight(_) | Self::Cancelled(_) => StatusCode::CONFLICT,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateDraftRequest {
    pub topic: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

pub async fn create_draft(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CreateDraftRequest>>,
) -> (StatusCode, Json<WizardSession>) {
    let topic = body.and_then(|Json(req)| req.topic);
    let session = state.wizard.create(topic).await;
    (StatusCode::CREATED, Json(session))
}

pub async fn get_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardSession>, SeoError> {
    Ok(Json(state.wizard.get(id).await?))
}

pub async fn delete_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, SeoError> {
    state.wizard.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn apply_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(action): Json<DraftAction>,
) -> Result<Json<WizardSession>, SeoError> {
    Ok(Json(state.wizard.apply(id, action).await?))
}

pub async fn run_stage(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(config): Json<StageConfig>,
) -> Result<Json<WizardSession>, SeoError> {
    let session = state
        .wizard
        .run_stage(
            id,
            &config,
            state.generator.as_ref(),
            &state.config.seo,
            state.config.stage_timeout(),
        )
        .await?;
    Ok(Json(session))
}

pub async fn cancel_stage(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, SeoError> {
    state.wizard.get(id).await?;
    let cancelled = state.wizard.cancel(id);
    Ok(Json(serde_json::json!({ "cancelled": cancelled })))
}

pub async fn export_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, SeoError> {
    let session = state.wizard.get(id).await?;
    if session.draft.content.trim().is_empty() {
        return Err(SeoError::Validation(
            "generate content before exporting".to_string(),
        ));
    }

    let body = export::render(&session.draft, query.format);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::file_name(&session.draft, query.format)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(query.format.content_type()),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

#[cfg(feature = "llm")]
pub async fn list_models(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<crate::llm::ModelInfo>>, SeoError> {
    let provider = state
        .llm
        .as_ref()
        .ok_or_else(|| SeoError::Unavailable("LLM is not configured".to_string()))?;
    Ok(Json(provider.list_models().await?))
}

pub fn configure_seo_routes() -> Router<Arc<AppState>> {
    let router = Router::new()
        .route("/api/seo/drafts", post(create_draft))
        .route("/api/seo/drafts/:id", get(get_draft).delete(delete_draft))
        .route("/api/seo/drafts/:id/actions", post(apply_action))
        .route(
            "/api/seo/drafts/:id/stages",
            post(run_stage).delete(cancel_stage),
        )
        .route("/api/seo/drafts/:id/export", get(export_draft));

    #[cfg(feature = "llm")]
    let router = router.route("/api/seo/models", get(list_models));

    router
}
