use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyInfo {
    pub id: i64,
    pub company_name: String,
    pub business_reg_number: String,
    pub opening_date: NaiveDate,
    pub company_intro: String,
    pub ceo_name: String,
    pub manager_name: String,
    pub manager_phone: String,
    pub manager_email: String,
    pub address: Option<String>,
    pub company_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyUser {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub company_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
