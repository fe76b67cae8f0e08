//! Routers HTTP
//!
//! Cada operación del núcleo se expone como endpoint JSON. La identidad del
//! agente llega en `X-Officer-Id` (ver `middleware::officer`).

pub mod collection_routes;
pub mod issue_routes;
pub mod planning_routes;

use axum::{http::StatusCode, middleware, response::Json, routing::get, Router};
use serde_json::json;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::dto::ApiResponse;
use crate::middleware::{cors_layer, officer_middleware};
use crate::state::AppState;

const MAX_CONCURRENT_REQUESTS: usize = 256;

pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let api = Router::new()
        .nest("/planning", planning_routes::create_planning_router())
        .nest("/collection", collection_routes::create_collection_router())
        .nest("/issues", issue_routes::create_issue_router())
        .route_layer(middleware::from_fn(officer_middleware));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Resultado ausente → 404 con `success: false`
pub(crate) fn found_or_not<T>(value: Option<T>, missing: &str) -> (StatusCode, Json<ApiResponse<T>>) {
    match value {
        Some(data) => (StatusCode::OK, Json(ApiResponse::success(data))),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::failure(missing.to_string())),
        ),
    }
}
