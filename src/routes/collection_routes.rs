use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::collection_dto::{
    ConfirmCollectionRequest, ConfirmationOutcome, ConfirmationView, NextStopsQuery, NextStopsView,
};
use crate::dto::route_dto::DailyRoute;
use crate::dto::ApiResponse;
use crate::models::OfficerId;
use crate::routes::found_or_not;
use crate::services::collection_service::DEFAULT_NEXT_STOPS_LIMIT;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_collection_router() -> Router<AppState> {
    Router::new()
        .route("/route", get(get_daily_route))
        .route("/stops/:stop_id/confirmation", get(get_collection_confirmation))
        .route("/stops/:stop_id/confirm", post(confirm_collection))
        .route("/next-stops", get(get_next_stops))
}

async fn get_daily_route(
    State(state): State<AppState>,
    Extension(officer): Extension<OfficerId>,
) -> Result<Json<ApiResponse<DailyRoute>>, AppError> {
    let route = state.collection.get_daily_route(&officer).await?;
    Ok(Json(ApiResponse::success(route)))
}

async fn get_collection_confirmation(
    State(state): State<AppState>,
    Extension(officer): Extension<OfficerId>,
    Path(stop_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<ConfirmationView>>), AppError> {
    let view = state
        .collection
        .get_collection_confirmation(stop_id, &officer)
        .await?;
    Ok(found_or_not(view, "Parada no encontrada"))
}

async fn confirm_collection(
    State(state): State<AppState>,
    Extension(officer): Extension<OfficerId>,
    Path(stop_id): Path<Uuid>,
    Json(request): Json<ConfirmCollectionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ConfirmationOutcome>>), AppError> {
    request.validate()?;

    let outcome = state
        .collection
        .confirm_collection(
            stop_id,
            request.fill_level,
            request.remarks,
            &officer,
            request.confirmation_token,
        )
        .await?;
    Ok(found_or_not(outcome, "Parada no encontrada en la ruta de hoy"))
}

async fn get_next_stops(
    State(state): State<AppState>,
    Extension(officer): Extension<OfficerId>,
    Query(query): Query<NextStopsQuery>,
) -> Result<(StatusCode, Json<ApiResponse<NextStopsView>>), AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_NEXT_STOPS_LIMIT);
    let view = state.collection.get_next_stops(&officer, limit).await?;
    Ok(found_or_not(view, "Sin ruta pendiente para hoy"))
}
