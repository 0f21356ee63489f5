use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::favorites::service;
use crate::job_postings::favorite_flags::PostingWithFavorite;
use crate::models::favorite::Favorite;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FavoriteCreate {
    pub job_posting_id: i64,
}

/// POST /favorites
pub async fn handle_add_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<FavoriteCreate>,
) -> Result<(StatusCode, Json<Favorite>), AppError> {
    let favorite = service::add(&state.db, user.id, req.job_posting_id).await?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

/// DELETE /favorites/:job_posting_id
pub async fn handle_remove_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(job_posting_id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    service::remove(&state.db, user.id, job_posting_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /favorites
pub async fn handle_list_favorites(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<PostingWithFavorite>>, AppError> {
    Ok(Json(service::list(&state.db, user.id).await?))
}
