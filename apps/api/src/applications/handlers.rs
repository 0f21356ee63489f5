use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::applications::service::{self, ApplicationView};
use crate::auth::{CurrentCompanyUser, CurrentUser};
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::models::application::JobApplication;
use crate::models::enums::ApplicationStatus;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub job_posting_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
}

// ── Applicant side ───────────────────────────────────────────────────────────

/// POST /applications
pub async fn handle_apply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<ApplyRequest>,
) -> Result<(StatusCode, Json<JobApplication>), AppError> {
    let application = service::apply(&state.db, &user, req.job_posting_id).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /applications
pub async fn handle_list_mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ApplicationView>>, AppError> {
    Ok(Json(service::list_for_user(&state.db, user.id).await?))
}

/// GET /applications/posting/:job_posting_id
pub async fn handle_get_mine_for_posting(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(job_posting_id): ApiPath<i64>,
) -> Result<Json<ApplicationView>, AppError> {
    let view = service::find_for_user_and_posting(&state.db, user.id, job_posting_id).await?;
    Ok(Json(view))
}

/// DELETE /applications/:id
pub async fn handle_cancel(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    service::cancel(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Company side ─────────────────────────────────────────────────────────────

/// GET /applications/company
pub async fn handle_list_for_company(
    State(state): State<AppState>,
    CurrentCompanyUser(company_user): CurrentCompanyUser,
) -> Result<Json<Vec<ApplicationView>>, AppError> {
    let views = service::list_for_company(&state.db, company_user.company_id).await?;
    Ok(Json(views))
}

/// GET /applications/company/:id
pub async fn handle_get_for_company(
    State(state): State<AppState>,
    CurrentCompanyUser(company_user): CurrentCompanyUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApplicationView>, AppError> {
    let view = service::find_for_company(&state.db, company_user.company_id, id).await?;
    Ok(Json(view))
}

/// PATCH /applications/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    CurrentCompanyUser(company_user): CurrentCompanyUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<StatusUpdate>,
) -> Result<Json<JobApplication>, AppError> {
    let application =
        service::update_status(&state.db, company_user.company_id, id, req.status).await?;
    Ok(Json(application))
}
