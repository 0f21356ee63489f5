use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::extractors::load_user;
use crate::auth::tokens::{AccountKind, TokenPair, TokenType};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;
use crate::users::service::{
    self, ensure_self, UserPasswordResetRequest, UserProfile, UserRegisterRequest,
    UserUpdateRequest,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user_id: i64,
    pub name: String,
}

/// POST /user/register
pub async fn handle_register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UserRegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let profile = service::register(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// POST /user/login
pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = service::authenticate(&state.db, &req.email, &req.password).await?;
    let tokens = state.jwt.issue_pair(AccountKind::User, user.id)?;
    Ok(Json(LoginResponse {
        tokens,
        user_id: user.id,
        name: user.name,
    }))
}

/// POST /user/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<Value>, AppError> {
    let id = state
        .jwt
        .verify(&req.refresh_token, AccountKind::User, TokenType::Refresh)?;
    load_user(&state.db, id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;
    let access_token = state.jwt.issue(AccountKind::User, id, TokenType::Access)?;
    Ok(Json(json!({ "access_token": access_token, "token_type": "bearer" })))
}

/// POST /user/logout
pub async fn handle_logout(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "message": "Logged out", "user_id": user.id }))
}

/// GET /user/:id
pub async fn handle_get_user(
    State(state): State<AppState>,
    CurrentUser(_viewer): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(service::load_profile(&state.db, id).await?))
}

/// PATCH /user/:id
pub async fn handle_update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UserUpdateRequest>,
) -> Result<Json<UserProfile>, AppError> {
    ensure_self(user.id, id)?;
    Ok(Json(service::update(&state.db, id, &req).await?))
}

/// DELETE /user/:id
pub async fn handle_delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    ensure_self(user.id, id)?;
    service::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /user/reset-password
pub async fn handle_reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UserPasswordResetRequest>,
) -> Result<Json<Value>, AppError> {
    service::reset_password(&state.db, &req).await?;
    Ok(Json(json!({ "message": "Password changed" })))
}
