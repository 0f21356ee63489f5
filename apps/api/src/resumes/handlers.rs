use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::models::resume::ResumeDetail;
use crate::resumes::service::{self, ResumeInput};
use crate::state::AppState;

/// GET /resumes
pub async fn handle_get_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ResumeDetail>, AppError> {
    service::latest(&state.db, user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No resume written yet".to_string()))
}

/// POST /resumes
pub async fn handle_create_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<ResumeInput>,
) -> Result<(StatusCode, Json<ResumeDetail>), AppError> {
    let detail = service::create(&state.db, user.id, &input).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// PATCH /resumes/:id
pub async fn handle_update_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<ResumeInput>,
) -> Result<Json<ResumeDetail>, AppError> {
    Ok(Json(service::update(&state.db, user.id, id, &input).await?))
}

/// DELETE /resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    service::delete(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
