use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth::tokens::{AccountKind, TokenType};
use crate::errors::AppError;
use crate::models::admin::AdminUser;
use crate::models::company::CompanyUser;
use crate::models::user::User;
use crate::state::AppState;

/// An authenticated individual user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// An authenticated company account.
#[derive(Debug, Clone)]
pub struct CurrentCompanyUser(pub CompanyUser);

/// An authenticated admin console session.
#[derive(Debug, Clone)]
pub struct AdminSession(pub AdminUser);

/// The requesting user when a valid user token is present.
/// Token problems yield `None`; database failures still propagate.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn require_token(parts: &Parts) -> Result<&str, AppError> {
    bearer_token(parts).ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))
}

pub async fn load_user(db: &sqlx::PgPool, id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn load_company_user(
    db: &sqlx::PgPool,
    id: i64,
) -> Result<Option<CompanyUser>, AppError> {
    let company_user = sqlx::query_as::<_, CompanyUser>("SELECT * FROM company_users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(company_user)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = require_token(parts)?;
        let id = state.jwt.verify(token, AccountKind::User, TokenType::Access)?;
        let user = load_user(&state.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentCompanyUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = require_token(parts)?;
        let id = state
            .jwt
            .verify(token, AccountKind::Company, TokenType::Access)?;
        let company_user = load_company_user(&state.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Company user {id} not found")))?;
        Ok(CurrentCompanyUser(company_user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = require_token(parts)?;
        let id = state.jwt.verify(token, AccountKind::Admin, TokenType::Access)?;
        let admin = sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Admin {id} not found")))?;
        Ok(AdminSession(admin))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybeUser(None));
        };
        let Ok(id) = state.jwt.verify(token, AccountKind::User, TokenType::Access) else {
            return Ok(MaybeUser(None));
        };
        Ok(MaybeUser(load_user(&state.db, id).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[tokio::test]
    async fn test_maybe_user_without_token_is_none() {
        let state = AppState::for_tests();
        let mut parts = parts_with(None);
        let maybe = MaybeUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(maybe.id().is_none());
    }

    #[tokio::test]
    async fn test_maybe_user_with_bad_token_is_none() {
        let state = AppState::for_tests();
        let mut parts = parts_with(Some("Bearer garbage"));
        let maybe = MaybeUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(maybe.0.is_none());
    }

    #[tokio::test]
    async fn test_company_token_rejected_for_user() {
        let state = AppState::for_tests();
        let token = state
            .jwt
            .issue(AccountKind::Company, 1, TokenType::Access)
            .unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_missing_token_rejected_for_company() {
        let state = AppState::for_tests();
        let mut parts = parts_with(None);
        let err = CurrentCompanyUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
