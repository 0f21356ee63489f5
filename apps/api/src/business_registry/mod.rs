//! Client for the national tax service business-status API.
//!
//! A registration number is valid when the registry confirms the number,
//! opening date and representative name together (`valid == "01"`).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;

const VALID_CODE: &str = "01";

#[derive(Debug, Serialize)]
struct ValidateRequest<'a> {
    businesses: Vec<BusinessQuery<'a>>,
}

#[derive(Debug, Serialize)]
struct BusinessQuery<'a> {
    b_no: &'a str,
    /// YYYYMMDD
    start_dt: &'a str,
    p_nm: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ValidateResponse {
    #[serde(default)]
    pub data: Vec<ValidateResult>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateResult {
    pub b_no: Option<String>,
    pub valid: Option<String>,
    pub valid_msg: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrnCheck {
    pub business_reg_number: String,
    pub is_valid: bool,
    pub message: Option<String>,
}

impl ValidateResponse {
    /// Interprets the first result; an empty result list means no record.
    pub fn into_check(self, business_reg_number: &str) -> Result<BrnCheck, AppError> {
        let first = self.data.into_iter().next().ok_or_else(|| {
            AppError::Validation(format!(
                "No registry record for business number {business_reg_number}"
            ))
        })?;
        Ok(BrnCheck {
            business_reg_number: business_reg_number.to_string(),
            is_valid: first.valid.as_deref() == Some(VALID_CODE),
            message: first.valid_msg,
        })
    }
}

/// Strips the dashes users type into dates and numbers.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[derive(Clone)]
pub struct BusinessRegistryClient {
    client: Client,
    api_url: String,
    service_key: Option<String>,
}

impl BusinessRegistryClient {
    pub fn new(api_url: String, service_key: Option<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()?,
            api_url,
            service_key,
        })
    }

    pub async fn validate(
        &self,
        business_reg_number: &str,
        opening_date: &str,
        ceo_name: &str,
    ) -> Result<BrnCheck, AppError> {
        let service_key = self.service_key.as_deref().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("BRN_SERVICE_KEY is not configured"))
        })?;

        let b_no = digits_only(business_reg_number);
        let start_dt = digits_only(opening_date);
        let body = ValidateRequest {
            businesses: vec![BusinessQuery {
                b_no: &b_no,
                start_dt: &start_dt,
                p_nm: ceo_name.trim(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("serviceKey", service_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Business registry unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Business registry returned {}: {}", status, text);
            return Err(AppError::Upstream(format!(
                "Business registry returned {status}"
            )));
        }

        let parsed: ValidateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Unreadable registry response: {e}")))?;
        debug!("Business registry answered for {}", b_no);

        parsed.into_check(&b_no)
    }
}
