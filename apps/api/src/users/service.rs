use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use crate::auth::password::{ensure_passwords_match, hash_password, verify_password};
use crate::company_users::service::normalize_email;
use crate::errors::AppError;
use crate::models::enums::Gender;
use crate::models::user::User;
use crate::users::interests::{interest_names_for_user, replace_user_interests};

pub const MAX_NAME_CHARS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct UserRegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: Option<String>,
    pub phone_number: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<String>,
    pub interests: Option<Vec<String>>,
    pub signup_purpose: Option<String>,
    pub referral_source: Option<String>,
    pub user_image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserUpdateRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    pub phone_number: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<String>,
    pub interests: Option<Vec<String>>,
    pub signup_purpose: Option<String>,
    pub referral_source: Option<String>,
    pub user_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserPasswordResetRequest {
    pub name: String,
    pub email: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

/// A user with the names of their interests.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub interests: Vec<String>,
}

fn validate_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::Validation(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

fn parse_gender(raw: Option<&str>) -> Result<Option<Gender>, AppError> {
    match raw.map(str::trim).filter(|g| !g.is_empty()) {
        None => Ok(None),
        Some(g) => Gender::parse_input(g)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid gender value: {g}"))),
    }
}

pub async fn register(db: &PgPool, req: &UserRegisterRequest) -> Result<UserProfile, AppError> {
    validate_name(&req.name)?;
    if let Some(confirm) = &req.password_confirm {
        ensure_passwords_match(&req.password, confirm)?;
    } else if req.password.is_empty() {
        return Err(AppError::Validation("password must not be empty".to_string()));
    }
    let gender = parse_gender(req.gender.as_deref())?;
    let email = normalize_email(&req.email);
    if !email.contains('@') {
        return Err(AppError::Validation(format!("Invalid email address: {email}")));
    }

    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(db)
        .await?;
    if taken {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let mut tx = db.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users
            (name, email, password, phone_number, birthday, gender, signup_purpose,
             referral_source, user_image)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(req.name.trim())
    .bind(&email)
    .bind(&password_hash)
    .bind(&req.phone_number)
    .bind(req.birthday)
    .bind(gender)
    .bind(&req.signup_purpose)
    .bind(&req.referral_source)
    .bind(&req.user_image)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(names) = &req.interests {
        replace_user_interests(&mut tx, user.id, names).await?;
    }
    let interests = interest_names_for_user(&mut tx, user.id).await?;

    tx.commit().await?;
    info!("Registered user {}", user.id);
    Ok(UserProfile { user, interests })
}

pub async fn authenticate(db: &PgPool, email: &str, password: &str) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(normalize_email(email))
        .fetch_optional(db)
        .await?;

    match user {
        Some(user) if user.is_active && verify_password(password, &user.password) => Ok(user),
        _ => Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        )),
    }
}

pub async fn load_profile(db: &PgPool, user_id: i64) -> Result<UserProfile, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;
    let mut conn = db.acquire().await?;
    let interests = interest_names_for_user(&mut conn, user_id).await?;
    Ok(UserProfile { user, interests })
}

/// Callers may only act on their own account.
pub fn ensure_self(current_user_id: i64, target_id: i64) -> Result<(), AppError> {
    if current_user_id != target_id {
        return Err(AppError::Forbidden(
            "You can only manage your own account".to_string(),
        ));
    }
    Ok(())
}

pub async fn update(
    db: &PgPool,
    user_id: i64,
    req: &UserUpdateRequest,
) -> Result<UserProfile, AppError> {
    if let Some(name) = &req.name {
        validate_name(name)?;
    }
    let gender = parse_gender(req.gender.as_deref())?;
    let password_hash = match (&req.password, &req.password_confirm) {
        (None, _) => None,
        (Some(password), Some(confirm)) => {
            ensure_passwords_match(password, confirm)?;
            Some(hash_password(password)?)
        }
        (Some(_), None) => {
            return Err(AppError::BadRequest(
                "password_confirm is required to change the password".to_string(),
            ))
        }
    };

    let mut tx = db.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            name = COALESCE($2, name),
            password = COALESCE($3, password),
            phone_number = COALESCE($4, phone_number),
            birthday = COALESCE($5, birthday),
            gender = COALESCE($6, gender),
            signup_purpose = COALESCE($7, signup_purpose),
            referral_source = COALESCE($8, referral_source),
            user_image = COALESCE($9, user_image),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(password_hash)
    .bind(&req.phone_number)
    .bind(req.birthday)
    .bind(gender)
    .bind(&req.signup_purpose)
    .bind(&req.referral_source)
    .bind(&req.user_image)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

    if let Some(names) = &req.interests {
        replace_user_interests(&mut tx, user_id, names).await?;
    }
    let interests = interest_names_for_user(&mut tx, user_id).await?;

    tx.commit().await?;
    Ok(UserProfile { user, interests })
}

pub async fn delete(db: &PgPool, user_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {user_id} not found")));
    }
    info!("Deleted user {}", user_id);
    Ok(())
}

pub async fn reset_password(db: &PgPool, req: &UserPasswordResetRequest) -> Result<(), AppError> {
    ensure_passwords_match(&req.new_password, &req.new_password_confirm)?;
    let hash = hash_password(&req.new_password)?;

    let result = sqlx::query(
        "UPDATE users SET password = $3, updated_at = NOW() WHERE name = $1 AND email = $2",
    )
    .bind(req.name.trim())
    .bind(normalize_email(&req.email))
    .bind(hash)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(
            "No user matches this name and email".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_ensure_self() {
        assert!(ensure_self(5, 5).is_ok());
        assert_eq!(ensure_self(5, 6).unwrap_err().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_gender_accepts_label_and_code() {
        assert_eq!(parse_gender(Some("여성")).unwrap(), Some(Gender::Female));
        assert_eq!(parse_gender(Some("male")).unwrap(), Some(Gender::Male));
        assert_eq!(parse_gender(Some(" ")).unwrap(), None);
        assert!(parse_gender(Some("robot")).is_err());
    }

    #[test]
    fn test_name_length() {
        assert!(validate_name("홍길동").is_ok());
        assert!(validate_name(&"a".repeat(51)).is_err());
        assert!(validate_name("   ").is_err());
    }

    #[tokio::test]
    async fn test_update_password_without_confirm_is_bad_request() {
        let state = crate::state::AppState::for_tests();
        let req = UserUpdateRequest {
            password: Some("new".into()),
            ..Default::default()
        };
        let err = update(&state.db, 1, &req).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
