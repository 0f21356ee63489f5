use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::enums::{Education, JobCategory, PaymentMethod, WorkDuration};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPosting {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    pub company_id: i64,
    pub recruit_period_start: Option<NaiveDate>,
    pub recruit_period_end: Option<NaiveDate>,
    pub is_always_recruiting: bool,
    pub education: Education,
    /// 0 means "to be decided" or rolling recruitment.
    pub recruit_number: i32,
    pub benefits: Option<String>,
    pub preferred_conditions: Option<String>,
    pub other_conditions: Option<String>,
    pub work_address: String,
    pub work_place_name: String,
    pub payment_method: PaymentMethod,
    pub job_category: JobCategory,
    pub work_duration: Option<WorkDuration>,
    pub career: String,
    pub employment_type: String,
    pub salary: i32,
    pub deadline_at: NaiveDate,
    pub work_days: String,
    pub description: String,
    pub postings_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact posting view embedded in company pages.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPostingSummary {
    pub id: i64,
    pub title: String,
    pub work_address: String,
    pub is_always_recruiting: bool,
    pub deadline_at: NaiveDate,
    pub created_at: DateTime<Utc>,
}
