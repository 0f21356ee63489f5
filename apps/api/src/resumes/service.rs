use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use tracing::info;

use crate::errors::AppError;
use crate::models::enums::{EducationStatus, EducationType};
use crate::models::resume::{Resume, ResumeDetail, ResumeEducation, ResumeExperience};

#[derive(Debug, Clone, Deserialize)]
pub struct EducationInput {
    pub education_type: Option<String>,
    pub school_name: Option<String>,
    pub education_status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperienceInput {
    pub company_name: String,
    pub position: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResumeInput {
    pub resume_image: Option<String>,
    pub desired_area: Option<String>,
    pub introduction: Option<String>,
    /// When present on update, replaces every stored education row.
    pub educations: Option<Vec<EducationInput>>,
    /// When present on update, replaces every stored experience row.
    pub experiences: Option<Vec<ExperienceInput>>,
}

/// Accepts `YYYY-MM-DD`, a datetime starting with one, or `YYYY-MM`
/// (first of the month).
pub fn parse_resume_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"))
        .map_err(|_| AppError::Validation(format!("{field} must be YYYY-MM or YYYY-MM-DD, got '{raw}'")))
}

fn optional_date(field: &str, raw: &Option<String>) -> Result<Option<NaiveDate>, AppError> {
    raw.as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| parse_resume_date(field, r))
        .transpose()
}

fn ordered(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), AppError> {
    match (start, end) {
        (Some(s), Some(e)) if s > e => Err(AppError::Validation(
            "start_date must not be after end_date".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Education row with parsed enums and dates.
#[derive(Debug, Clone, PartialEq)]
pub struct EducationRow {
    pub education_type: Option<EducationType>,
    pub school_name: Option<String>,
    pub education_status: Option<EducationStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceRow {
    pub company_name: String,
    pub position: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl EducationInput {
    pub fn parse(&self) -> Result<EducationRow, AppError> {
        let education_type = self
            .education_type
            .as_deref()
            .map(|raw| {
                EducationType::parse_input(raw)
                    .ok_or_else(|| AppError::Validation(format!("Invalid education_type: {raw}")))
            })
            .transpose()?;
        let education_status = self
            .education_status
            .as_deref()
            .map(|raw| {
                EducationStatus::parse_input(raw)
                    .ok_or_else(|| AppError::Validation(format!("Invalid education_status: {raw}")))
            })
            .transpose()?;
        let start_date = optional_date("start_date", &self.start_date)?;
        let end_date = optional_date("end_date", &self.end_date)?;
        ordered(start_date, end_date)?;

        Ok(EducationRow {
            education_type,
            school_name: self.school_name.clone(),
            education_status,
            start_date,
            end_date,
        })
    }
}

impl ExperienceInput {
    pub fn parse(&self) -> Result<ExperienceRow, AppError> {
        if self.company_name.trim().is_empty() {
            return Err(AppError::Validation(
                "company_name must not be empty".to_string(),
            ));
        }
        let start_date = optional_date("start_date", &self.start_date)?;
        let end_date = optional_date("end_date", &self.end_date)?;
        ordered(start_date, end_date)?;

        Ok(ExperienceRow {
            company_name: self.company_name.trim().to_string(),
            position: self.position.clone(),
            start_date,
            end_date,
            description: self.description.clone(),
        })
    }
}

/// Parses all child rows up front so nothing is written when one is bad.
fn parse_children(
    input: &ResumeInput,
) -> Result<(Option<Vec<EducationRow>>, Option<Vec<ExperienceRow>>), AppError> {
    let educations = input
        .educations
        .as_ref()
        .map(|list| list.iter().map(EducationInput::parse).collect::<Result<Vec<_>, _>>())
        .transpose()?;
    let experiences = input
        .experiences
        .as_ref()
        .map(|list| list.iter().map(ExperienceInput::parse).collect::<Result<Vec<_>, _>>())
        .transpose()?;
    Ok((educations, experiences))
}

async fn replace_educations(
    conn: &mut PgConnection,
    resume_id: i64,
    rows: &[EducationRow],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM resume_educations WHERE resume_id = $1")
        .bind(resume_id)
        .execute(&mut *conn)
        .await?;
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO resume_educations
                (resume_id, education_type, school_name, education_status, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(resume_id)
        .bind(row.education_type)
        .bind(&row.school_name)
        .bind(row.education_status)
        .bind(row.start_date)
        .bind(row.end_date)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn replace_experiences(
    conn: &mut PgConnection,
    resume_id: i64,
    rows: &[ExperienceRow],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM resume_experiences WHERE resume_id = $1")
        .bind(resume_id)
        .execute(&mut *conn)
        .await?;
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO resume_experiences
                (resume_id, company_name, position, start_date, end_date, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(resume_id)
        .bind(&row.company_name)
        .bind(&row.position)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(&row.description)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn load_detail(conn: &mut PgConnection, resume: Resume) -> Result<ResumeDetail, AppError> {
    let educations = sqlx::query_as::<_, ResumeEducation>(
        "SELECT * FROM resume_educations WHERE resume_id = $1 ORDER BY id",
    )
    .bind(resume.id)
    .fetch_all(&mut *conn)
    .await?;
    let experiences = sqlx::query_as::<_, ResumeExperience>(
        "SELECT * FROM resume_experiences WHERE resume_id = $1 ORDER BY id",
    )
    .bind(resume.id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ResumeDetail {
        resume,
        educations,
        experiences,
    })
}

/// The user's most recently written résumé.
pub async fn latest(db: &PgPool, user_id: i64) -> Result<Option<ResumeDetail>, AppError> {
    let mut conn = db.acquire().await?;
    let resume = sqlx::query_as::<_, Resume>(
        "SELECT * FROM resumes WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    match resume {
        Some(resume) => Ok(Some(load_detail(&mut conn, resume).await?)),
        None => Ok(None),
    }
}

pub async fn create(db: &PgPool, user_id: i64, input: &ResumeInput) -> Result<ResumeDetail, AppError> {
    let (educations, experiences) = parse_children(input)?;
    let mut tx = db.begin().await?;

    let resume = sqlx::query_as::<_, Resume>(
        r#"
        INSERT INTO resumes (user_id, resume_image, desired_area, introduction)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&input.resume_image)
    .bind(&input.desired_area)
    .bind(&input.introduction)
    .fetch_one(&mut *tx)
    .await?;

    replace_educations(&mut tx, resume.id, educations.as_deref().unwrap_or_default()).await?;
    replace_experiences(&mut tx, resume.id, experiences.as_deref().unwrap_or_default()).await?;
    let detail = load_detail(&mut tx, resume).await?;

    tx.commit().await?;
    info!("User {} created resume {}", user_id, detail.resume.id);
    Ok(detail)
}

pub async fn update(
    db: &PgPool,
    user_id: i64,
    resume_id: i64,
    input: &ResumeInput,
) -> Result<ResumeDetail, AppError> {
    let (educations, experiences) = parse_children(input)?;
    let mut tx = db.begin().await?;

    let resume = sqlx::query_as::<_, Resume>(
        r#"
        UPDATE resumes SET
            resume_image = COALESCE($3, resume_image),
            desired_area = COALESCE($4, desired_area),
            introduction = COALESCE($5, introduction),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(resume_id)
    .bind(user_id)
    .bind(&input.resume_image)
    .bind(&input.desired_area)
    .bind(&input.introduction)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    if let Some(rows) = &educations {
        replace_educations(&mut tx, resume.id, rows).await?;
    }
    if let Some(rows) = &experiences {
        replace_experiences(&mut tx, resume.id, rows).await?;
    }
    let detail = load_detail(&mut tx, resume).await?;

    tx.commit().await?;
    Ok(detail)
}

pub async fn delete(db: &PgPool, user_id: i64, resume_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(resume_id)
        .bind(user_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Resume {resume_id} not found")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_month_only_date_is_first_of_month() {
        assert_eq!(parse_resume_date("start_date", "2021-03").unwrap(), d(2021, 3, 1));
        assert_eq!(parse_resume_date("start_date", "2021-03-15").unwrap(), d(2021, 3, 15));
        assert_eq!(
            parse_resume_date("start_date", "2021-03-15T09:00:00").unwrap(),
            d(2021, 3, 15)
        );
        assert!(parse_resume_date("start_date", "March 2021").is_err());
        assert!(parse_resume_date("start_date", "2021-13").is_err());
    }

    #[test]
    fn test_education_labels_parsed() {
        let input = EducationInput {
            education_type: Some("대학교(4년)".into()),
            school_name: Some("서울대학교".into()),
            education_status: Some("graduated".into()),
            start_date: Some("2015-03".into()),
            end_date: Some("2019-02".into()),
        };
        let row = input.parse().unwrap();
        assert_eq!(row.education_type, Some(EducationType::College4));
        assert_eq!(row.education_status, Some(EducationStatus::Graduated));
        assert_eq!(row.end_date, Some(d(2019, 2, 1)));
    }

    #[test]
    fn test_reversed_experience_dates_rejected() {
        let input = ExperienceInput {
            company_name: "Acme".into(),
            position: None,
            start_date: Some("2020-05".into()),
            end_date: Some("2019-01".into()),
            description: None,
        };
        assert!(input.parse().is_err());
    }

    #[test]
    fn test_blank_company_name_rejected() {
        let input = ExperienceInput {
            company_name: "  ".into(),
            position: None,
            start_date: None,
            end_date: None,
            description: None,
        };
        assert!(input.parse().is_err());
    }

    #[test]
    fn test_children_parsed_all_or_nothing() {
        let input: ResumeInput = serde_json::from_value(serde_json::json!({
            "introduction": "hello",
            "educations": [
                { "education_type": "high_school", "school_name": "A" },
                { "education_type": "kindergarten", "school_name": "B" }
            ]
        }))
        .unwrap();
        assert!(parse_children(&input).is_err());
    }

    #[test]
    fn test_absent_children_stay_none() {
        let input = ResumeInput {
            introduction: Some("hi".into()),
            ..Default::default()
        };
        let (educations, experiences) = parse_children(&input).unwrap();
        assert!(educations.is_none());
        assert!(experiences.is_none());
    }
}
