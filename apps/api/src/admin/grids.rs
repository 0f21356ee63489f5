//! Static registry of admin grids, one per table.
//!
//! Column names only ever come from this registry, so the SQL built from
//! them never contains client text.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::password::hash_password;
use crate::errors::AppError;
use crate::models::admin::AdminUser;

/// Write-only key that sets a hashed password on grids that have one.
pub const PASSWORD_KEY: &str = "new_password";

#[derive(Debug, Serialize)]
pub struct Grid {
    pub model: &'static str,
    #[serde(skip)]
    pub table: &'static str,
    pub label: &'static str,
    pub list_columns: &'static [&'static str],
    pub editable_columns: &'static [&'static str],
    pub has_password: bool,
    #[serde(skip)]
    pub has_updated_at: bool,
    pub superuser_only: bool,
}

pub const GRIDS: &[Grid] = &[
    Grid {
        model: "users",
        table: "users",
        label: "일반 회원",
        list_columns: &[
            "id", "name", "email", "phone_number", "birthday", "gender", "signup_purpose",
            "referral_source", "user_image", "is_active", "created_at", "updated_at",
        ],
        editable_columns: &[
            "name", "email", "phone_number", "birthday", "gender", "signup_purpose",
            "referral_source", "user_image", "is_active",
        ],
        has_password: true,
        has_updated_at: true,
        superuser_only: false,
    },
    Grid {
        model: "company_info",
        table: "company_info",
        label: "기업 정보",
        list_columns: &[
            "id", "company_name", "business_reg_number", "opening_date", "company_intro",
            "ceo_name", "manager_name", "manager_phone", "manager_email", "address",
            "company_image",
        ],
        editable_columns: &[
            "company_name", "business_reg_number", "opening_date", "company_intro", "ceo_name",
            "manager_name", "manager_phone", "manager_email", "address", "company_image",
        ],
        has_password: false,
        has_updated_at: false,
        superuser_only: false,
    },
    Grid {
        model: "company_users",
        table: "company_users",
        label: "기업 회원",
        list_columns: &["id", "email", "company_id", "created_at", "updated_at"],
        editable_columns: &["email", "company_id"],
        has_password: true,
        has_updated_at: true,
        superuser_only: false,
    },
    Grid {
        model: "job_postings",
        table: "job_postings",
        label: "채용 공고",
        list_columns: &[
            "id", "title", "author_id", "company_id", "recruit_period_start",
            "recruit_period_end", "is_always_recruiting", "education", "recruit_number",
            "work_address", "work_place_name", "payment_method", "job_category",
            "work_duration", "career", "employment_type", "salary", "deadline_at", "work_days",
            "postings_image", "created_at", "updated_at",
        ],
        editable_columns: &[
            "title", "author_id", "company_id", "recruit_period_start", "recruit_period_end",
            "is_always_recruiting", "education", "recruit_number", "benefits",
            "preferred_conditions", "other_conditions", "work_address", "work_place_name",
            "payment_method", "job_category", "work_duration", "career", "employment_type",
            "salary", "deadline_at", "work_days", "description", "postings_image",
        ],
        has_password: false,
        has_updated_at: true,
        superuser_only: false,
    },
    Grid {
        model: "favorites",
        table: "favorites",
        label: "즐겨찾기",
        list_columns: &["id", "user_id", "job_posting_id", "created_at"],
        editable_columns: &["user_id", "job_posting_id"],
        has_password: false,
        has_updated_at: false,
        superuser_only: false,
    },
    Grid {
        model: "job_applications",
        table: "job_applications",
        label: "지원 내역",
        list_columns: &[
            "id", "user_id", "job_posting_id", "resume_id", "resumes_data", "status",
            "created_at", "updated_at",
        ],
        editable_columns: &["user_id", "job_posting_id", "resume_id", "resumes_data", "status"],
        has_password: false,
        has_updated_at: true,
        superuser_only: false,
    },
    Grid {
        model: "resumes",
        table: "resumes",
        label: "이력서",
        list_columns: &[
            "id", "user_id", "resume_image", "desired_area", "introduction", "created_at",
            "updated_at",
        ],
        editable_columns: &["user_id", "resume_image", "desired_area", "introduction"],
        has_password: false,
        has_updated_at: true,
        superuser_only: false,
    },
    Grid {
        model: "resume_educations",
        table: "resume_educations",
        label: "학력 사항",
        list_columns: &[
            "id", "resume_id", "education_type", "school_name", "education_status",
            "start_date", "end_date",
        ],
        editable_columns: &[
            "resume_id", "education_type", "school_name", "education_status", "start_date",
            "end_date",
        ],
        has_password: false,
        has_updated_at: true,
        superuser_only: false,
    },
    Grid {
        model: "resume_experiences",
        table: "resume_experiences",
        label: "경력 사항",
        list_columns: &[
            "id", "resume_id", "company_name", "position", "start_date", "end_date",
            "description",
        ],
        editable_columns: &[
            "resume_id", "company_name", "position", "start_date", "end_date", "description",
        ],
        has_password: false,
        has_updated_at: true,
        superuser_only: false,
    },
    Grid {
        model: "interests",
        table: "interests",
        label: "관심 분야",
        list_columns: &["id", "code", "name", "is_custom"],
        editable_columns: &["code", "name", "is_custom"],
        has_password: false,
        has_updated_at: false,
        superuser_only: false,
    },
    Grid {
        model: "user_interests",
        table: "user_interests",
        label: "회원 관심 분야",
        list_columns: &["id", "user_id", "interest_id"],
        editable_columns: &["user_id", "interest_id"],
        has_password: false,
        has_updated_at: false,
        superuser_only: false,
    },
    Grid {
        model: "admin_users",
        table: "admin_users",
        label: "관리자",
        list_columns: &["id", "username", "is_superuser"],
        editable_columns: &["username", "is_superuser"],
        has_password: true,
        has_updated_at: false,
        superuser_only: true,
    },
];

pub fn find_grid(model: &str) -> Result<&'static Grid, AppError> {
    GRIDS
        .iter()
        .find(|g| g.model == model)
        .ok_or_else(|| AppError::NotFound(format!("Unknown admin model: {model}")))
}

impl Grid {
    pub fn check_access(&self, admin: &AdminUser) -> Result<(), AppError> {
        if self.superuser_only && !admin.is_superuser {
            return Err(AppError::Forbidden(format!(
                "{} can only be managed by a superuser",
                self.model
            )));
        }
        Ok(())
    }

    fn select_list(&self) -> String {
        self.list_columns.join(", ")
    }

    pub fn list_sql(&self) -> String {
        format!(
            "SELECT COALESCE(json_agg(row_to_json(t)), '[]'::json) FROM \
             (SELECT {} FROM {} ORDER BY id DESC LIMIT $1 OFFSET $2) t",
            self.select_list(),
            self.table
        )
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.table)
    }

    pub fn get_sql(&self) -> String {
        format!(
            "SELECT row_to_json(t) FROM (SELECT {} FROM {} WHERE id = $1) t",
            self.select_list(),
            self.table
        )
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE id = $1", self.table)
    }

    /// `$1` is the JSON record.
    pub fn insert_sql(&self, columns: &[&'static str]) -> String {
        let cols = columns.join(", ");
        format!(
            "INSERT INTO {table} ({cols}) SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1) RETURNING id",
            table = self.table,
        )
    }

    /// `$1` is the JSON record, `$2` the row id.
    pub fn update_sql(&self, columns: &[&'static str]) -> String {
        let mut assignments: Vec<String> =
            columns.iter().map(|c| format!("{c} = r.{c}")).collect();
        if self.has_updated_at {
            assignments.push("updated_at = NOW()".to_string());
        }
        format!(
            "UPDATE {table} SET {sets} FROM jsonb_populate_record(NULL::{table}, $1) r \
             WHERE {table}.id = $2 RETURNING {table}.id",
            table = self.table,
            sets = assignments.join(", "),
        )
    }

    /// Checks a write payload against the editable columns, hashing
    /// `new_password` into the password column.
    pub fn prepare_write(
        &self,
        payload: Value,
    ) -> Result<(Vec<&'static str>, Map<String, Value>), AppError> {
        let Value::Object(input) = payload else {
            return Err(AppError::Validation(
                "Request body must be a JSON object".to_string(),
            ));
        };

        let mut columns = Vec::with_capacity(input.len());
        let mut record = Map::with_capacity(input.len());

        for (key, value) in input {
            if self.has_password && key == PASSWORD_KEY {
                let plain = value.as_str().filter(|p| !p.is_empty()).ok_or_else(|| {
                    AppError::Validation(format!("{PASSWORD_KEY} must be a non-empty string"))
                })?;
                columns.push("password");
                record.insert("password".to_string(), Value::String(hash_password(plain)?));
                continue;
            }

            let column = self
                .editable_columns
                .iter()
                .copied()
                .find(|c| *c == key)
                .ok_or_else(|| {
                    AppError::Validation(format!("{key} is not editable on {}", self.model))
                })?;
            columns.push(column);
            record.insert(key, value);
        }

        if columns.is_empty() {
            return Err(AppError::Validation("No editable fields given".to_string()));
        }
        Ok((columns, record))
    }
}
