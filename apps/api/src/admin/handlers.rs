use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::admin::grids::{find_grid, Grid, GRIDS};
use crate::auth::password::verify_password;
use crate::auth::tokens::{AccountKind, TokenType};
use crate::auth::AdminSession;
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::job_postings::handlers::ListParams;
use crate::job_postings::search::Page;
use crate::models::admin::AdminUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub username: String,
    pub is_superuser: bool,
}

fn grid_for(model: &str, admin: &AdminUser) -> Result<&'static Grid, AppError> {
    let grid = find_grid(model)?;
    grid.check_access(admin)?;
    Ok(grid)
}

async fn fetch_row(state: &AppState, grid: &Grid, id: i64) -> Result<Value, AppError> {
    sqlx::query_scalar::<_, Value>(&grid.get_sql())
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {id} not found", grid.model)))
}

/// POST /admin/login
pub async fn handle_admin_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>, AppError> {
    let admin = sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE username = $1")
        .bind(req.username.trim())
        .fetch_optional(&state.db)
        .await?
        .filter(|a| verify_password(&req.password, &a.password))
        .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

    let access_token = state
        .jwt
        .issue(AccountKind::Admin, admin.id, TokenType::Access)?;
    info!("Admin '{}' logged in", admin.username);

    Ok(Json(AdminLoginResponse {
        access_token,
        token_type: "bearer",
        username: admin.username,
        is_superuser: admin.is_superuser,
    }))
}

/// GET /admin/models
pub async fn handle_list_models(
    AdminSession(admin): AdminSession,
) -> Json<Vec<&'static Grid>> {
    Json(
        GRIDS
            .iter()
            .filter(|g| g.check_access(&admin).is_ok())
            .collect(),
    )
}

/// GET /admin/:model
pub async fn handle_list_rows(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    ApiPath(model): ApiPath<String>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<Value>>, AppError> {
    let grid = grid_for(&model, &admin)?;
    let Query(params) = params?;
    let (skip, limit) = params.validate()?;

    let rows: Value = sqlx::query_scalar(&grid.list_sql())
        .bind(limit)
        .bind(skip)
        .fetch_one(&state.db)
        .await?;
    let total: i64 = sqlx::query_scalar(&grid.count_sql())
        .fetch_one(&state.db)
        .await?;

    let items = match rows {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    Ok(Json(Page {
        items,
        total,
        skip,
        limit,
    }))
}

/// GET /admin/:model/:id
pub async fn handle_get_row(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    ApiPath((model, id)): ApiPath<(String, i64)>,
) -> Result<Json<Value>, AppError> {
    let grid = grid_for(&model, &admin)?;
    Ok(Json(fetch_row(&state, grid, id).await?))
}

/// POST /admin/:model
pub async fn handle_create_row(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    ApiPath(model): ApiPath<String>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let grid = grid_for(&model, &admin)?;
    let (columns, record) = grid.prepare_write(payload)?;

    let id: i64 = sqlx::query_scalar(&grid.insert_sql(&columns))
        .bind(Value::Object(record))
        .fetch_one(&state.db)
        .await?;
    info!("Admin '{}' created {} {}", admin.username, grid.model, id);

    Ok((StatusCode::CREATED, Json(fetch_row(&state, grid, id).await?)))
}

/// PATCH /admin/:model/:id
pub async fn handle_update_row(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    ApiPath((model, id)): ApiPath<(String, i64)>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<Json<Value>, AppError> {
    let grid = grid_for(&model, &admin)?;
    let (columns, record) = grid.prepare_write(payload)?;

    sqlx::query_scalar::<_, i64>(&grid.update_sql(&columns))
        .bind(Value::Object(record))
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {id} not found", grid.model)))?;
    info!("Admin '{}' updated {} {}", admin.username, grid.model, id);

    Ok(Json(fetch_row(&state, grid, id).await?))
}

/// DELETE /admin/:model/:id
pub async fn handle_delete_row(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    ApiPath((model, id)): ApiPath<(String, i64)>,
) -> Result<StatusCode, AppError> {
    let grid = grid_for(&model, &admin)?;
    if grid.model == "admin_users" && id == admin.id {
        return Err(AppError::BadRequest(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    let result = sqlx::query(&grid.delete_sql())
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("{} {id} not found", grid.model)));
    }
    info!("Admin '{}' deleted {} {}", admin.username, grid.model, id);
    Ok(StatusCode::NO_CONTENT)
}
