//! Posting input: the multipart create form and the JSON partial update.

use std::collections::HashMap;

use axum::extract::Multipart;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::job_postings::validation::{validate_fields, validate_schedule, Schedule};
use crate::models::enums::{Education, JobCategory, PaymentMethod, WorkDuration};
use crate::models::job_posting::JobPosting;
use crate::storage::UploadedImage;

pub const IMAGE_FIELD: &str = "image_file";

/// Text parts and the optional image of a multipart posting form.
#[derive(Debug, Default)]
pub struct PostingForm {
    pub fields: HashMap<String, String>,
    pub image: Option<UploadedImage>,
}

pub async fn read_posting_form(mut multipart: Multipart) -> Result<PostingForm, AppError> {
    let mut form = PostingForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?;
            // Browsers send an empty part when no file was chosen.
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            form.image = Some(UploadedImage {
                file_name,
                content_type,
                bytes,
            });
        } else {
            let value = field.text().await?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

struct Fields<'a>(&'a HashMap<String, String>);

impl<'a> Fields<'a> {
    fn optional(&self, name: &str) -> Option<&'a str> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<&'a str, AppError> {
        self.optional(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    }

    fn text(&self, name: &str) -> Result<String, AppError> {
        self.required(name).map(str::to_string)
    }

    fn date(&self, name: &str) -> Result<Option<NaiveDate>, AppError> {
        self.optional(name).map(|raw| parse_date(name, raw)).transpose()
    }

    fn int(&self, name: &str) -> Result<i32, AppError> {
        let raw = self.required(name)?;
        raw.parse::<i32>()
            .map_err(|_| AppError::Validation(format!("{name} must be a number, got '{raw}'")))
    }

    fn flag(&self, name: &str) -> Result<bool, AppError> {
        match self.optional(name).map(str::to_ascii_lowercase).as_deref() {
            None | Some("false") | Some("0") | Some("off") => Ok(false),
            Some("true") | Some("1") | Some("on") => Ok(true),
            Some(other) => Err(AppError::Validation(format!(
                "{name} must be true or false, got '{other}'"
            ))),
        }
    }
}

fn parse_date(name: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{name} must be YYYY-MM-DD, got '{raw}'")))
}

fn parse_enum<T>(name: &str, raw: &str, parse: fn(&str) -> Option<T>) -> Result<T, AppError> {
    parse(raw).ok_or_else(|| AppError::Validation(format!("Invalid {name} value: {raw}")))
}

/// A validated posting ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJobPosting {
    pub title: String,
    pub recruit_period_start: Option<NaiveDate>,
    pub recruit_period_end: Option<NaiveDate>,
    pub is_always_recruiting: bool,
    pub education: Education,
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
}

impl NewJobPosting {
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, AppError> {
        let f = Fields(fields);
        let optional_text = |name: &str| f.optional(name).map(str::to_string);

        Ok(NewJobPosting {
            title: f.text("title")?,
            recruit_period_start: f.date("recruit_period_start")?,
            recruit_period_end: f.date("recruit_period_end")?,
            is_always_recruiting: f.flag("is_always_recruiting")?,
            education: parse_enum("education", f.required("education")?, Education::parse_input)?,
            recruit_number: f.int("recruit_number")?,
            benefits: optional_text("benefits"),
            preferred_conditions: optional_text("preferred_conditions"),
            other_conditions: optional_text("other_conditions"),
            work_address: f.text("work_address")?,
            work_place_name: f.text("work_place_name")?,
            payment_method: parse_enum(
                "payment_method",
                f.required("payment_method")?,
                PaymentMethod::parse_input,
            )?,
            job_category: parse_enum(
                "job_category",
                f.required("job_category")?,
                JobCategory::parse_input,
            )?,
            work_duration: f
                .optional("work_duration")
                .map(|raw| parse_enum("work_duration", raw, WorkDuration::parse_input))
                .transpose()?,
            career: f.text("career")?,
            employment_type: f.text("employment_type")?,
            salary: f.int("salary")?,
            deadline_at: parse_date("deadline_at", f.required("deadline_at")?)?,
            work_days: f.text("work_days")?,
            description: f.text("description")?,
        })
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            is_always_recruiting: self.is_always_recruiting,
            start: self.recruit_period_start,
            end: self.recruit_period_end,
            deadline: self.deadline_at,
        }
    }

    pub fn validate(&self, today: NaiveDate) -> Result<(), AppError> {
        validate_fields(
            &self.title,
            &self.work_place_name,
            self.salary,
            self.recruit_number,
        )?;
        validate_schedule(&self.schedule(), true, today)
    }
}

impl JobPosting {
    pub fn schedule(&self) -> Schedule {
        Schedule {
            is_always_recruiting: self.is_always_recruiting,
            start: self.recruit_period_start,
            end: self.recruit_period_end,
            deadline: self.deadline_at,
        }
    }
}

/// PATCH body. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobPostingUpdate {
    pub title: Option<String>,
    pub recruit_period_start: Option<NaiveDate>,
    pub recruit_period_end: Option<NaiveDate>,
    pub is_always_recruiting: Option<bool>,
    pub education: Option<String>,
    pub recruit_number: Option<i32>,
    pub benefits: Option<String>,
    pub preferred_conditions: Option<String>,
    pub other_conditions: Option<String>,
    pub work_address: Option<String>,
    pub work_place_name: Option<String>,
    pub payment_method: Option<String>,
    pub job_category: Option<String>,
    pub work_duration: Option<String>,
    pub career: Option<String>,
    pub employment_type: Option<String>,
    pub salary: Option<i32>,
    pub deadline_at: Option<NaiveDate>,
    pub work_days: Option<String>,
    pub description: Option<String>,
}

impl JobPostingUpdate {
    /// Returns the posting with the update merged in, validated as a whole.
    pub fn merge_into(&self, existing: &JobPosting, today: NaiveDate) -> Result<JobPosting, AppError> {
        let mut merged = existing.clone();

        macro_rules! take {
            ($($field:ident),+) => {
                $(if let Some(value) = &self.$field {
                    merged.$field = value.clone();
                })+
            };
        }
        macro_rules! take_some {
            ($($field:ident),+) => {
                $(if let Some(value) = &self.$field {
                    merged.$field = Some(value.clone());
                })+
            };
        }

        take!(
            title,
            is_always_recruiting,
            recruit_number,
            work_address,
            work_place_name,
            career,
            employment_type,
            salary,
            deadline_at,
            work_days,
            description
        );
        take_some!(
            recruit_period_start,
            recruit_period_end,
            benefits,
            preferred_conditions,
            other_conditions
        );

        if let Some(raw) = &self.education {
            merged.education = parse_enum("education", raw, Education::parse_input)?;
        }
        if let Some(raw) = &self.payment_method {
            merged.payment_method = parse_enum("payment_method", raw, PaymentMethod::parse_input)?;
        }
        if let Some(raw) = &self.job_category {
            merged.job_category = parse_enum("job_category", raw, JobCategory::parse_input)?;
        }
        if let Some(raw) = &self.work_duration {
            merged.work_duration =
                Some(parse_enum("work_duration", raw, WorkDuration::parse_input)?);
        }

        validate_fields(
            &merged.title,
            &merged.work_place_name,
            merged.salary,
            merged.recruit_number,
        )?;
        validate_schedule(
            &merged.schedule(),
            self.recruit_period_start.is_some(),
            today,
        )?;

        Ok(merged)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use chrono::Utc;

    pub fn valid_fields() -> HashMap<String, String> {
        [
            ("title", "Weekend barista"),
            ("recruit_period_start", "2030-01-01"),
            ("recruit_period_end", "2030-01-31"),
            ("is_always_recruiting", "false"),
            ("education", "고졸"),
            ("recruit_number", "2"),
            ("work_address", "서울 마포구 양화로 1"),
            ("work_place_name", "Cafe Hapjeong"),
            ("payment_method", "hourly"),
            ("job_category", "food"),
            ("work_duration", "more_3_months"),
            ("career", "무관"),
            ("employment_type", "아르바이트"),
            ("salary", "12000"),
            ("deadline_at", "2030-01-20"),
            ("work_days", "토,일"),
            ("description", "Espresso bar shifts"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2029, 12, 1).unwrap()
    }

    pub fn sample_posting() -> JobPosting {
        let new = NewJobPosting::from_fields(&valid_fields()).unwrap();
        let now = Utc::now();
        JobPosting {
            id: 1,
            title: new.title,
            author_id: 10,
            company_id: 20,
            recruit_period_start: new.recruit_period_start,
            recruit_period_end: new.recruit_period_end,
            is_always_recruiting: new.is_always_recruiting,
            education: new.education,
            recruit_number: new.recruit_number,
            benefits: None,
            preferred_conditions: None,
            other_conditions: None,
            work_address: new.work_address,
            work_place_name: new.work_place_name,
            payment_method: new.payment_method,
            job_category: new.job_category,
            work_duration: new.work_duration,
            career: new.career,
            employment_type: new.employment_type,
            salary: new.salary,
            deadline_at: new.deadline_at,
            work_days: new.work_days,
            description: new.description,
            postings_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_parse_valid_form() {
        let new = NewJobPosting::from_fields(&valid_fields()).unwrap();
        assert_eq!(new.education, Education::HighSchool);
        assert_eq!(new.payment_method, PaymentMethod::Hourly);
        assert_eq!(new.salary, 12000);
        assert!(new.benefits.is_none());
        assert!(new.validate(today()).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let mut fields = valid_fields();
        fields.remove("description");
        let err = NewJobPosting::from_fields(&fields).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("description")));
    }

    #[test]
    fn test_non_numeric_salary() {
        let mut fields = valid_fields();
        fields.insert("salary".into(), "lots".into());
        assert!(NewJobPosting::from_fields(&fields).is_err());
    }

    #[test]
    fn test_bad_date_and_enum() {
        let mut fields = valid_fields();
        fields.insert("deadline_at".into(), "2030/01/20".into());
        assert!(NewJobPosting::from_fields(&fields).is_err());

        let mut fields = valid_fields();
        fields.insert("job_category".into(), "astronaut".into());
        assert!(NewJobPosting::from_fields(&fields).is_err());
    }

    #[test]
    fn test_negative_salary_fails_validation() {
        let mut fields = valid_fields();
        fields.insert("salary".into(), "-1".into());
        let new = NewJobPosting::from_fields(&fields).unwrap();
        assert!(new.validate(today()).is_err());
    }

    #[test]
    fn test_always_recruiting_flag_variants() {
        let mut fields = valid_fields();
        fields.insert("is_always_recruiting".into(), "on".into());
        fields.remove("recruit_period_start");
        fields.remove("recruit_period_end");
        let new = NewJobPosting::from_fields(&fields).unwrap();
        assert!(new.is_always_recruiting);
        assert!(new.validate(today()).is_ok());

        fields.insert("is_always_recruiting".into(), "maybe".into());
        assert!(NewJobPosting::from_fields(&fields).is_err());
    }

    #[test]
    fn test_update_merges_and_keeps_untouched_fields() {
        let existing = sample_posting();
        let update = JobPostingUpdate {
            title: Some("Morning barista".into()),
            job_category: Some("서비스".into()),
            ..Default::default()
        };
        let merged = update.merge_into(&existing, today()).unwrap();
        assert_eq!(merged.title, "Morning barista");
        assert_eq!(merged.job_category, JobCategory::Service);
        assert_eq!(merged.salary, existing.salary);
    }

    #[test]
    fn test_update_checks_ordering_against_stored_dates() {
        let existing = sample_posting();
        let update = JobPostingUpdate {
            deadline_at: NaiveDate::from_ymd_opt(2030, 3, 1),
            ..Default::default()
        };
        assert!(update.merge_into(&existing, today()).is_err());
    }

    #[test]
    fn test_update_past_start_check_only_for_new_start() {
        let existing = sample_posting();
        let later = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();

        let keep_start = JobPostingUpdate {
            salary: Some(15000),
            ..Default::default()
        };
        assert!(keep_start.merge_into(&existing, later).is_ok());

        let new_start = JobPostingUpdate {
            recruit_period_start: NaiveDate::from_ymd_opt(2030, 1, 2),
            ..Default::default()
        };
        assert!(new_start.merge_into(&existing, later).is_err());
    }

    #[test]
    fn test_update_rejects_unknown_keys() {
        let parsed: Result<JobPostingUpdate, _> =
            serde_json::from_str(r#"{"author_id": 99}"#);
        assert!(parsed.is_err());
    }
}
