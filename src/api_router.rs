//! API router
//!
//! Merges the ticket and SEO wizard routes under `/api`.

use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::core::shared::state::AppState;

pub async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "growthdesk",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health_check))
        // ===== Support tickets =====
        .merge(crate::tickets::configure_tickets_routes())
        // ===== SEO content wizard =====
        .merge(crate::seo::configure_seo_routes())
}

/// Full application with state and CORS applied.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    configure_api_routes().layer(cors).with_state(state)
}
