use axum::{extract::State, Json};
use serde::Serialize;

use crate::company_users::service::find_company;
use crate::errors::AppError;
use crate::extract::ApiPath;
use crate::job_postings::repository;
use crate::models::company::CompanyInfo;
use crate::models::job_posting::JobPostingSummary;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CompanyPage {
    #[serde(flatten)]
    pub company: CompanyInfo,
    pub job_postings: Vec<JobPostingSummary>,
}

/// GET /companies/:id
pub async fn handle_get_company(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CompanyPage>, AppError> {
    let company = find_company(&state.db, id).await?;
    let job_postings = repository::summaries_for_company(&state.db, id).await?;
    Ok(Json(CompanyPage {
        company,
        job_postings,
    }))
}
