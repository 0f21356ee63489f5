use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use crate::auth::password::{ensure_passwords_match, hash_password, verify_password};
use crate::errors::AppError;
use crate::models::company::{CompanyInfo, CompanyUser};

#[derive(Debug, Deserialize)]
pub struct CompanyRegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub company_name: String,
    pub ceo_name: String,
    pub opening_date: NaiveDate,
    pub business_reg_number: String,
    pub company_intro: String,
    pub manager_name: String,
    pub manager_phone: String,
    pub manager_email: String,
    pub address: Option<String>,
    pub company_image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanyUpdateRequest {
    pub company_intro: Option<String>,
    pub manager_name: Option<String>,
    pub manager_phone: Option<String>,
    pub manager_email: Option<String>,
    pub address: Option<String>,
    pub company_image: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

/// Company facts a user must know to recover their login.
#[derive(Debug, Deserialize)]
pub struct CompanyIdentity {
    pub ceo_name: String,
    pub opening_date: NaiveDate,
    pub business_reg_number: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn require_email(email: &str) -> Result<String, AppError> {
    let email = normalize_email(email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::Validation(format!("Invalid email address: {email}"))),
    }
}

/// A business number or login email may only be registered once.
pub fn ensure_unregistered(brn_taken: bool, email_taken: bool) -> Result<(), AppError> {
    if brn_taken {
        return Err(AppError::Conflict(
            "Business registration number is already registered".to_string(),
        ));
    }
    if email_taken {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }
    Ok(())
}

pub async fn register(
    db: &PgPool,
    req: &CompanyRegisterRequest,
) -> Result<(CompanyUser, CompanyInfo), AppError> {
    ensure_passwords_match(&req.password, &req.password_confirm)?;
    let email = require_email(&req.email)?;
    require_email(&req.manager_email)?;
    let brn = req.business_reg_number.trim();

    let brn_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM company_info WHERE business_reg_number = $1)")
            .bind(brn)
            .fetch_one(db)
            .await?;
    let email_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM company_users WHERE email = $1)")
            .bind(&email)
            .fetch_one(db)
            .await?;
    ensure_unregistered(brn_taken, email_taken)?;

    let password_hash = hash_password(&req.password)?;

    // Rolled back on drop if either insert fails.
    let mut tx = db.begin().await?;

    let company = sqlx::query_as::<_, CompanyInfo>(
        r#"
        INSERT INTO company_info
            (company_name, business_reg_number, opening_date, company_intro, ceo_name,
             manager_name, manager_phone, manager_email, address, company_image)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(req.company_name.trim())
    .bind(brn)
    .bind(req.opening_date)
    .bind(&req.company_intro)
    .bind(req.ceo_name.trim())
    .bind(&req.manager_name)
    .bind(&req.manager_phone)
    .bind(normalize_email(&req.manager_email))
    .bind(&req.address)
    .bind(&req.company_image)
    .fetch_one(&mut *tx)
    .await?;

    let company_user = sqlx::query_as::<_, CompanyUser>(
        "INSERT INTO company_users (email, password, company_id) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&email)
    .bind(&password_hash)
    .bind(company.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        "Registered company {} ({}) with user {}",
        company.id, company.company_name, company_user.id
    );
    Ok((company_user, company))
}

pub async fn authenticate(db: &PgPool, email: &str, password: &str) -> Result<CompanyUser, AppError> {
    let company_user =
        sqlx::query_as::<_, CompanyUser>("SELECT * FROM company_users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(db)
            .await?;

    match company_user {
        Some(user) if verify_password(password, &user.password) => Ok(user),
        _ => Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        )),
    }
}

pub async fn find_company(db: &PgPool, company_id: i64) -> Result<CompanyInfo, AppError> {
    sqlx::query_as::<_, CompanyInfo>("SELECT * FROM company_info WHERE id = $1")
        .bind(company_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Company {company_id} not found")))
}

pub async fn update_profile(
    db: &PgPool,
    company_user: &CompanyUser,
    req: &CompanyUpdateRequest,
) -> Result<CompanyInfo, AppError> {
    if let Some(email) = &req.manager_email {
        require_email(email)?;
    }
    let new_password_hash = match (&req.password, &req.password_confirm) {
        (None, None) => None,
        (Some(password), Some(confirm)) => {
            ensure_passwords_match(password, confirm)?;
            Some(hash_password(password)?)
        }
        _ => {
            return Err(AppError::BadRequest(
                "password and password_confirm must be given together".to_string(),
            ))
        }
    };

    let mut tx = db.begin().await?;

    let company = sqlx::query_as::<_, CompanyInfo>(
        r#"
        UPDATE company_info SET
            company_intro = COALESCE($2, company_intro),
            manager_name = COALESCE($3, manager_name),
            manager_phone = COALESCE($4, manager_phone),
            manager_email = COALESCE($5, manager_email),
            address = COALESCE($6, address),
            company_image = COALESCE($7, company_image)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(company_user.company_id)
    .bind(&req.company_intro)
    .bind(&req.manager_name)
    .bind(&req.manager_phone)
    .bind(req.manager_email.as_deref().map(normalize_email))
    .bind(&req.address)
    .bind(&req.company_image)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Company {} not found", company_user.company_id)))?;

    if let Some(hash) = new_password_hash {
        sqlx::query("UPDATE company_users SET password = $2, updated_at = NOW() WHERE id = $1")
            .bind(company_user.id)
            .bind(hash)
            .execute(&mut *tx)
            .await?;
    } else {
        sqlx::query("UPDATE company_users SET updated_at = NOW() WHERE id = $1")
            .bind(company_user.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(company)
}

/// Deleting the company cascades to its users and postings.
pub async fn delete_account(db: &PgPool, company_user: &CompanyUser) -> Result<(), AppError> {
    sqlx::query("DELETE FROM company_info WHERE id = $1")
        .bind(company_user.company_id)
        .execute(db)
        .await?;
    info!(
        "Deleted company {} with user {}",
        company_user.company_id, company_user.id
    );
    Ok(())
}

pub async fn find_email(db: &PgPool, identity: &CompanyIdentity) -> Result<String, AppError> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT cu.email
        FROM company_users cu
        JOIN company_info ci ON ci.id = cu.company_id
        WHERE ci.ceo_name = $1 AND ci.opening_date = $2 AND ci.business_reg_number = $3
        ORDER BY cu.id
        LIMIT 1
        "#,
    )
    .bind(identity.ceo_name.trim())
    .bind(identity.opening_date)
    .bind(identity.business_reg_number.trim())
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("No company account matches these details".to_string()))
}

/// Finds the account whose email and company facts all match.
pub async fn verify_identity(
    db: &PgPool,
    email: &str,
    identity: &CompanyIdentity,
) -> Result<CompanyUser, AppError> {
    sqlx::query_as::<_, CompanyUser>(
        r#"
        SELECT cu.*
        FROM company_users cu
        JOIN company_info ci ON ci.id = cu.company_id
        WHERE cu.email = $1 AND ci.ceo_name = $2 AND ci.opening_date = $3
          AND ci.business_reg_number = $4
        "#,
    )
    .bind(normalize_email(email))
    .bind(identity.ceo_name.trim())
    .bind(identity.opening_date)
    .bind(identity.business_reg_number.trim())
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("No company account matches these details".to_string()))
}

pub async fn reset_password(
    db: &PgPool,
    company_user_id: i64,
    new_password: &str,
    confirm: &str,
) -> Result<(), AppError> {
    ensure_passwords_match(new_password, confirm)?;
    let hash = hash_password(new_password)?;
    let result =
        sqlx::query("UPDATE company_users SET password = $2, updated_at = NOW() WHERE id = $1")
            .bind(company_user_id)
            .bind(hash)
            .execute(db)
            .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Company user {company_user_id} not found"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_registration_conflicts() {
        assert!(ensure_unregistered(false, false).is_ok());

        let err = ensure_unregistered(true, false).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
        assert!(err.to_string().contains("Business registration number"));

        let err = ensure_unregistered(false, true).unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg.contains("Email")));
    }

    #[test]
    fn test_email_normalized() {
        assert_eq!(normalize_email("  HR@Example.COM "), "hr@example.com");
    }

    #[test]
    fn test_email_shape_checked() {
        assert!(require_email("hr@example.com").is_ok());
        assert!(require_email("hr@localhost").is_err());
        assert!(require_email("@example.com").is_err());
        assert!(require_email("not-an-email").is_err());
    }

    #[test]
    fn test_update_rejects_unknown_fields() {
        let parsed: Result<CompanyUpdateRequest, _> =
            serde_json::from_str(r#"{"business_reg_number": "123"}"#);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_register_password_mismatch_fails_before_database() {
        let state = crate::state::AppState::for_tests();
        let req: CompanyRegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "hr@example.com",
            "password": "one",
            "password_confirm": "two",
            "company_name": "Acme",
            "ceo_name": "Kim",
            "opening_date": "2020-01-01",
            "business_reg_number": "1234567890",
            "company_intro": "We make things",
            "manager_name": "Lee",
            "manager_phone": "010-0000-0000",
            "manager_email": "lee@example.com"
        }))
        .unwrap();
        let err = register(&state.db, &req).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
