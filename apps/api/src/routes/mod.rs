pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};

use crate::admin::handlers as admin;
use crate::applications::handlers as applications;
use crate::company_info::handlers as company_info;
use crate::company_users::handlers as company;
use crate::favorites::handlers as favorites;
use crate::job_postings::handlers as postings;
use crate::resumes::handlers as resumes;
use crate::state::AppState;
use crate::users::{handlers as users, interests};

/// Posting forms carry one image.
const POSTING_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::health_handler))
        .route("/health", get(health::health_handler))
        // Company accounts
        .route("/company/register", post(company::handle_register))
        .route("/company/login", post(company::handle_login))
        .route("/company/refresh", post(company::handle_refresh))
        .route("/company/logout", post(company::handle_logout))
        .route(
            "/company/me",
            get(company::handle_get_me)
                .patch(company::handle_update_me)
                .delete(company::handle_delete_me),
        )
        .route("/company/find-email", post(company::handle_find_email))
        .route(
            "/company/reset-password/verify",
            post(company::handle_reset_verify),
        )
        .route("/company/reset-password", post(company::handle_reset_password))
        .route("/company/validate-brn", post(company::handle_validate_brn))
        .route("/companies/:id", get(company_info::handle_get_company))
        // Job seekers
        .route("/user/register", post(users::handle_register))
        .route("/user/login", post(users::handle_login))
        .route("/user/refresh", post(users::handle_refresh))
        .route("/user/logout", post(users::handle_logout))
        .route("/user/reset-password", post(users::handle_reset_password))
        .route(
            "/user/:id",
            get(users::handle_get_user)
                .patch(users::handle_update_user)
                .delete(users::handle_delete_user),
        )
        .route("/interests", get(interests::handle_list_interests))
        // Postings
        .route(
            "/posting",
            get(postings::handle_list_postings).post(postings::handle_create_posting),
        )
        .route("/posting/search", get(postings::handle_search_postings))
        .route("/posting/popular", get(postings::handle_popular_postings))
        .route("/posting/popular/age", get(postings::handle_popular_by_age))
        .route("/posting/options", get(postings::handle_posting_options))
        .route(
            "/posting/:id",
            get(postings::handle_get_posting)
                .patch(postings::handle_update_posting)
                .delete(postings::handle_delete_posting),
        )
        // Favorites
        .route(
            "/favorites",
            get(favorites::handle_list_favorites).post(favorites::handle_add_favorite),
        )
        .route(
            "/favorites/:job_posting_id",
            delete(favorites::handle_remove_favorite),
        )
        // Applications
        .route(
            "/applications",
            get(applications::handle_list_mine).post(applications::handle_apply),
        )
        .route(
            "/applications/posting/:job_posting_id",
            get(applications::handle_get_mine_for_posting),
        )
        .route(
            "/applications/company",
            get(applications::handle_list_for_company),
        )
        .route(
            "/applications/company/:id",
            get(applications::handle_get_for_company),
        )
        .route("/applications/:id", delete(applications::handle_cancel))
        .route(
            "/applications/:id/status",
            patch(applications::handle_update_status),
        )
        // Resumes
        .route(
            "/resumes",
            get(resumes::handle_get_resume).post(resumes::handle_create_resume),
        )
        .route(
            "/resumes/:id",
            patch(resumes::handle_update_resume).delete(resumes::handle_delete_resume),
        )
        // Admin
        .route("/admin/login", post(admin::handle_admin_login))
        .route("/admin/models", get(admin::handle_list_models))
        .route(
            "/admin/:model",
            get(admin::handle_list_rows).post(admin::handle_create_row),
        )
        .route(
            "/admin/:model/:id",
            get(admin::handle_get_row)
                .patch(admin::handle_update_row)
                .delete(admin::handle_delete_row),
        )
        .layer(DefaultBodyLimit::max(POSTING_BODY_LIMIT))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::auth::tokens::{AccountKind, TokenType};

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let app = build_router(AppState::for_tests());
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_favorites_require_login() {
        let request = Request::post("/favorites")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"job_posting_id":1}"#))
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_user_token_cannot_edit_posting() {
        let state = AppState::for_tests();
        let token = state
            .jwt
            .issue(AccountKind::User, 1, TokenType::Access)
            .unwrap();
        let request = Request::patch("/posting/1")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"바리스타"}"#))
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let request = Request::get("/resumes")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_search_rejects_zero_limit() {
        let request = Request::get("/posting/search?limit=0")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_search_rejects_page_past_range() {
        let request = Request::get("/posting/search?page=9223372036854775807")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_json_uses_error_body() {
        let request = Request::post("/company/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{"))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_missing_content_type_is_validation_error() {
        let request = Request::post("/user/login")
            .body(Body::from(r#"{"email":"a@b.com","password":"pw"}"#))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_validation_error() {
        let (status, body) = send(Request::get("/posting/abc").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_posting_options() {
        let (status, body) =
            send(Request::get("/posting/options").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_object());
    }
}
