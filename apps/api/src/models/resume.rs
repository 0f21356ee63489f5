use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::enums::{EducationStatus, EducationType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Resume {
    pub id: i64,
    pub user_id: i64,
    pub resume_image: Option<String>,
    pub desired_area: Option<String>,
    pub introduction: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeEducation {
    pub id: i64,
    pub resume_id: i64,
    pub education_type: Option<EducationType>,
    pub school_name: Option<String>,
    pub education_status: Option<EducationStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeExperience {
    pub id: i64,
    pub resume_id: i64,
    pub company_name: String,
    pub position: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A résumé together with its child rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeDetail {
    #[serde(flatten)]
    pub resume: Resume,
    pub educations: Vec<ResumeEducation>,
    pub experiences: Vec<ResumeExperience>,
}
