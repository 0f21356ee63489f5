use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::job_postings::repository;
use crate::models::application::JobApplication;
use crate::models::enums::ApplicationStatus;
use crate::models::resume::ResumeDetail;
use crate::models::user::User;
use crate::resumes::service::latest;

/// An application joined with the posting it targets.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApplicationView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub application: JobApplication,
    pub job_posting_title: String,
    pub applicant_name: String,
}

const VIEW_SELECT: &str = r#"
    SELECT a.*, p.title AS job_posting_title, u.name AS applicant_name
    FROM job_applications a
    JOIN job_postings p ON p.id = a.job_posting_id
    JOIN users u ON u.id = a.user_id
"#;

/// Frozen copy of the résumé and applicant contact details at apply time.
pub fn build_snapshot(applicant: &User, resume: &ResumeDetail) -> Result<Value, AppError> {
    let resume = serde_json::to_value(resume)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Resume snapshot failed: {e}")))?;
    Ok(json!({
        "applicant": {
            "id": applicant.id,
            "name": applicant.name,
            "email": applicant.email,
            "phone_number": applicant.phone_number,
            "birthday": applicant.birthday,
            "gender": applicant.gender,
        },
        "resume": resume,
    }))
}

pub async fn apply(
    db: &PgPool,
    applicant: &User,
    job_posting_id: i64,
) -> Result<JobApplication, AppError> {
    repository::find_or_404(db, job_posting_id).await?;
    let resume = latest(db, applicant.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Write a resume before applying".to_string()))?;
    let snapshot = build_snapshot(applicant, &resume)?;

    let application = sqlx::query_as::<_, JobApplication>(
        r#"
        INSERT INTO job_applications (user_id, job_posting_id, resume_id, resumes_data)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(applicant.id)
    .bind(job_posting_id)
    .bind(resume.resume.id)
    .bind(snapshot)
    .fetch_one(db)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict(format!(
            "Already applied to job posting {job_posting_id} with this resume"
        )),
        other => other,
    })?;

    info!(
        "User {} applied to posting {} (application {})",
        applicant.id, job_posting_id, application.id
    );
    Ok(application)
}

pub async fn list_for_user(db: &PgPool, user_id: i64) -> Result<Vec<ApplicationView>, AppError> {
    let rows = sqlx::query_as::<_, ApplicationView>(&format!(
        "{VIEW_SELECT} WHERE a.user_id = $1 ORDER BY a.created_at DESC, a.id DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_for_user_and_posting(
    db: &PgPool,
    user_id: i64,
    job_posting_id: i64,
) -> Result<ApplicationView, AppError> {
    sqlx::query_as::<_, ApplicationView>(&format!(
        "{VIEW_SELECT} WHERE a.user_id = $1 AND a.job_posting_id = $2 \
         ORDER BY a.created_at DESC LIMIT 1"
    ))
    .bind(user_id)
    .bind(job_posting_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!("No application for job posting {job_posting_id}"))
    })
}

pub async fn cancel(db: &PgPool, user_id: i64, application_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM job_applications WHERE id = $1 AND user_id = $2")
        .bind(application_id)
        .bind(user_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Application {application_id} not found"
        )));
    }
    Ok(())
}

pub async fn list_for_company(
    db: &PgPool,
    company_id: i64,
) -> Result<Vec<ApplicationView>, AppError> {
    let rows = sqlx::query_as::<_, ApplicationView>(&format!(
        "{VIEW_SELECT} WHERE p.company_id = $1 ORDER BY a.created_at DESC, a.id DESC"
    ))
    .bind(company_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_for_company(
    db: &PgPool,
    company_id: i64,
    application_id: i64,
) -> Result<ApplicationView, AppError> {
    sqlx::query_as::<_, ApplicationView>(&format!(
        "{VIEW_SELECT} WHERE p.company_id = $1 AND a.id = $2"
    ))
    .bind(company_id)
    .bind(application_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Application {application_id} not found")))
}

/// Only applications to the company's own postings can change status.
pub async fn update_status(
    db: &PgPool,
    company_id: i64,
    application_id: i64,
    status: ApplicationStatus,
) -> Result<JobApplication, AppError> {
    let application = sqlx::query_as::<_, JobApplication>(
        r#"
        UPDATE job_applications a SET status = $3, updated_at = NOW()
        FROM job_postings p
        WHERE a.id = $1 AND p.id = a.job_posting_id AND p.company_id = $2
        RETURNING a.*
        "#,
    )
    .bind(application_id)
    .bind(company_id)
    .bind(status)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Application {application_id} not found")))?;

    info!(
        "Company {} set application {} to {}",
        company_id,
        application_id,
        status.code()
    );
    Ok(application)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Gender;
    use crate::models::resume::{Resume, ResumeExperience};
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_snapshot_contains_resume_and_applicant() {
        let now = Utc::now();
        let user = User {
            id: 3,
            name: "김민수".into(),
            email: "minsu@example.com".into(),
            user_image: None,
            password: "$argon2id$hash".into(),
            phone_number: Some("010-1234-5678".into()),
            birthday: NaiveDate::from_ymd_opt(1990, 5, 1),
            gender: Some(Gender::Male),
            signup_purpose: None,
            referral_source: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let detail = ResumeDetail {
            resume: Resume {
                id: 9,
                user_id: 3,
                resume_image: None,
                desired_area: Some("서울".into()),
                introduction: Some("성실합니다".into()),
                created_at: now,
                updated_at: now,
            },
            educations: vec![],
            experiences: vec![ResumeExperience {
                id: 1,
                resume_id: 9,
                company_name: "Acme".into(),
                position: Some("매니저".into()),
                start_date: None,
                end_date: None,
                description: None,
                created_at: now,
                updated_at: now,
            }],
        };

        let snapshot = build_snapshot(&user, &detail).unwrap();
        assert_eq!(snapshot["applicant"]["email"], "minsu@example.com");
        assert_eq!(snapshot["applicant"]["gender"], "male");
        assert!(snapshot["applicant"].get("password").is_none());
        assert_eq!(snapshot["resume"]["id"], 9);
        assert_eq!(snapshot["resume"]["desired_area"], "서울");
        assert_eq!(snapshot["resume"]["experiences"][0]["company_name"], "Acme");
    }
}
