use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::extractors::load_company_user;
use crate::auth::tokens::{AccountKind, TokenPair, TokenType};
use crate::auth::CurrentCompanyUser;
use crate::business_registry::BrnCheck;
use crate::company_users::service::{
    self, CompanyIdentity, CompanyRegisterRequest, CompanyUpdateRequest,
};
use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::job_postings::repository;
use crate::models::company::{CompanyInfo, CompanyUser};
use crate::models::job_posting::JobPostingSummary;
use crate::state::AppState;
use crate::storage::delete_quietly;

/// Success envelope of the company endpoints.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Envelope {
            status: "success",
            message: message.into(),
            data,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CompanyProfile {
    pub company_user: CompanyUser,
    pub company: CompanyInfo,
    pub job_postings: Vec<JobPostingSummary>,
}

#[derive(Debug, Serialize)]
pub struct LoginData {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub company_user_id: i64,
    pub company_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetVerifyRequest {
    pub email: String,
    #[serde(flatten)]
    pub identity: CompanyIdentity,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub reset_token: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct BrnValidationRequest {
    pub business_reg_number: String,
    /// YYYYMMDD or YYYY-MM-DD
    pub opening_date: String,
    pub ceo_name: String,
}

/// POST /company/register
pub async fn handle_register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CompanyRegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<CompanyProfile>>), AppError> {
    let (company_user, company) = service::register(&state.db, &req).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::success(
            "Company account created",
            CompanyProfile {
                company_user,
                company,
                job_postings: Vec::new(),
            },
        ),
    ))
}

/// POST /company/login
pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<Envelope<LoginData>>, AppError> {
    let company_user = service::authenticate(&state.db, &req.email, &req.password).await?;
    let company = service::find_company(&state.db, company_user.company_id).await?;
    let tokens = state.jwt.issue_pair(AccountKind::Company, company_user.id)?;

    Ok(Envelope::success(
        "Logged in",
        LoginData {
            tokens,
            company_user_id: company_user.id,
            company_name: company.company_name,
        },
    ))
}

/// POST /company/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let id = state
        .jwt
        .verify(&req.refresh_token, AccountKind::Company, TokenType::Refresh)?;
    load_company_user(&state.db, id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;
    let access_token = state.jwt.issue(AccountKind::Company, id, TokenType::Access)?;

    Ok(Envelope::success(
        "Token refreshed",
        json!({ "access_token": access_token, "token_type": "bearer" }),
    ))
}

/// POST /company/logout
/// Tokens are stateless; the client discards them.
pub async fn handle_logout(
    CurrentCompanyUser(company_user): CurrentCompanyUser,
) -> Json<Envelope<Value>> {
    Envelope::success("Logged out", json!({ "company_user_id": company_user.id }))
}

async fn load_profile(state: &AppState, company_user: CompanyUser) -> Result<CompanyProfile, AppError> {
    let company = service::find_company(&state.db, company_user.company_id).await?;
    let job_postings = repository::summaries_for_company(&state.db, company.id).await?;
    Ok(CompanyProfile {
        company_user,
        company,
        job_postings,
    })
}

/// GET /company/me
pub async fn handle_get_me(
    State(state): State<AppState>,
    CurrentCompanyUser(company_user): CurrentCompanyUser,
) -> Result<Json<Envelope<CompanyProfile>>, AppError> {
    let profile = load_profile(&state, company_user).await?;
    Ok(Envelope::success("Company profile", profile))
}

/// PATCH /company/me
pub async fn handle_update_me(
    State(state): State<AppState>,
    CurrentCompanyUser(company_user): CurrentCompanyUser,
    ApiJson(req): ApiJson<CompanyUpdateRequest>,
) -> Result<Json<Envelope<CompanyProfile>>, AppError> {
    service::update_profile(&state.db, &company_user, &req).await?;
    let profile = load_profile(&state, company_user).await?;
    Ok(Envelope::success("Company profile updated", profile))
}

/// DELETE /company/me
pub async fn handle_delete_me(
    State(state): State<AppState>,
    CurrentCompanyUser(company_user): CurrentCompanyUser,
) -> Result<Json<Envelope<Value>>, AppError> {
    let images = repository::image_urls_for_company(&state.db, company_user.company_id).await?;
    service::delete_account(&state.db, &company_user).await?;
    for url in &images {
        delete_quietly(state.images.as_ref(), url).await;
    }
    Ok(Envelope::success(
        "Company account deleted",
        json!({ "company_user_id": company_user.id }),
    ))
}

/// POST /company/find-email
pub async fn handle_find_email(
    State(state): State<AppState>,
    ApiJson(identity): ApiJson<CompanyIdentity>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let email = service::find_email(&state.db, &identity).await?;
    Ok(Envelope::success("Email found", json!({ "email": email })))
}

/// POST /company/reset-password/verify
pub async fn handle_reset_verify(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetVerifyRequest>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let company_user = service::verify_identity(&state.db, &req.email, &req.identity).await?;
    let reset_token = state
        .jwt
        .issue(AccountKind::Company, company_user.id, TokenType::Reset)?;
    Ok(Envelope::success(
        "Identity verified",
        json!({ "reset_token": reset_token }),
    ))
}

/// POST /company/reset-password
pub async fn handle_reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let id = state
        .jwt
        .verify(&req.reset_token, AccountKind::Company, TokenType::Reset)?;
    service::reset_password(&state.db, id, &req.new_password, &req.new_password_confirm).await?;
    Ok(Envelope::success("Password changed", json!({ "company_user_id": id })))
}

/// POST /company/validate-brn
pub async fn handle_validate_brn(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<BrnValidationRequest>,
) -> Result<Json<Envelope<BrnCheck>>, AppError> {
    ensure_opening_date(&req.opening_date)?;
    let check = state
        .registry
        .validate(&req.business_reg_number, &req.opening_date, &req.ceo_name)
        .await?;
    let message = if check.is_valid {
        "Business registration number confirmed"
    } else {
        "Business registration number could not be confirmed"
    };
    Ok(Envelope::success(message, check))
}

fn ensure_opening_date(raw: &str) -> Result<(), AppError> {
    let digits = crate::business_registry::digits_only(raw);
    NaiveDate::parse_from_str(&digits, "%Y%m%d")
        .map(|_| ())
        .map_err(|_| AppError::Validation(format!("opening_date must be a date, got '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let Json(envelope) = Envelope::success("ok", json!({ "a": 1 }));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], "ok");
        assert_eq!(value["data"]["a"], 1);
    }

    #[test]
    fn test_opening_date_formats() {
        assert!(ensure_opening_date("20200131").is_ok());
        assert!(ensure_opening_date("2020-01-31").is_ok());
        assert!(ensure_opening_date("2020-13-01").is_err());
    }

    #[test]
    fn test_company_password_never_serialized() {
        let now = chrono::Utc::now();
        let user = CompanyUser {
            id: 1,
            email: "hr@example.com".into(),
            password: "$argon2id$secret".into(),
            company_id: 2,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password").is_none());
    }
}
