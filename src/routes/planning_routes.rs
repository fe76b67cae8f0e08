use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::dto::planning_dto::{PlanRouteResponse, SavePlannedRoutesRequest, SavePlannedRoutesResponse};
use crate::dto::ApiResponse;
use crate::models::OfficerId;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_planning_router() -> Router<AppState> {
    Router::new()
        .route("/plan", get(plan_route))
        .route("/routes", post(save_planned_routes))
}

async fn plan_route(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PlanRouteResponse>>, AppError> {
    let stops = state.planner.plan_route().await?;
    let response = PlanRouteResponse::from_stops(&stops);
    let message = format!("{} paradas en {} rutas", response.total_stops, response.routes.len());
    Ok(Json(ApiResponse::success_with_message(response, message)))
}

async fn save_planned_routes(
    State(state): State<AppState>,
    Extension(actor): Extension<OfficerId>,
    Json(request): Json<SavePlannedRoutesRequest>,
) -> Result<Json<ApiResponse<SavePlannedRoutesResponse>>, AppError> {
    if request.stops.is_empty() && request.assignments.is_empty() {
        return Err(AppError::BadRequest("No hay rutas ni asignaciones que guardar".to_string()));
    }

    let date = request.date.unwrap_or_else(|| state.clock.today());
    let summary = state
        .reconciler
        .save_planned_routes(&request.stops, &request.assignments, actor.as_str(), date)
        .await?;

    Ok(Json(ApiResponse::success(SavePlannedRoutesResponse { date, summary })))
}
