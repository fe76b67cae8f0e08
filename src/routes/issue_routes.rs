use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::issue_dto::{IssueQuery, IssueView, SubmitIssueRequest};
use crate::dto::ApiResponse;
use crate::models::OfficerId;
use crate::services::issue_service::MSG_STOP_NOT_FOUND;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_issue_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_report_issue_view))
        .route("/", post(submit_issue))
        .route("/stops/:stop_id/progress", post(start_issue_work))
}

async fn get_report_issue_view(
    State(state): State<AppState>,
    Extension(officer): Extension<OfficerId>,
    Query(query): Query<IssueQuery>,
) -> Result<Json<ApiResponse<IssueView>>, AppError> {
    let view = state.issues.get_report_issue_view(&officer, &query).await?;
    Ok(Json(ApiResponse::success(view)))
}

async fn submit_issue(
    State(state): State<AppState>,
    Extension(officer): Extension<OfficerId>,
    Json(request): Json<SubmitIssueRequest>,
) -> Result<(StatusCode, Json<ApiResponse<bool>>), AppError> {
    request.validate()?;

    let created = state
        .issues
        .submit_issue(
            &request.bin_id,
            &request.issue_type,
            request.severity,
            &request.description,
            &officer,
        )
        .await?;

    if created {
        Ok((
            StatusCode::CREATED,
            Json(ApiResponse::success_with_message(true, "Incidencia registrada".to_string())),
        ))
    } else {
        Ok((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::failure(
                "El contenedor no está en la ruta de hoy".to_string(),
            )),
        ))
    }
}

/// El mensaje es a la vez estado ("In Progress", "Resolved") o aviso fijo
async fn start_issue_work(
    State(state): State<AppState>,
    Extension(officer): Extension<OfficerId>,
    Path(stop_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<String>>), AppError> {
    let message = state.issues.start_issue_work(stop_id, &officer).await?;

    let response = match message.as_str() {
        "In Progress" | "Resolved" => (
            StatusCode::OK,
            Json(ApiResponse::success_with_message(message.clone(), message)),
        ),
        MSG_STOP_NOT_FOUND => (StatusCode::NOT_FOUND, Json(ApiResponse::failure(message))),
        _ => (StatusCode::OK, Json(ApiResponse::failure(message))),
    };
    Ok(response)
}
