//! Keyword search over postings with filters, sorting and pagination.
//!
//! The favorite flag comes from a LEFT JOIN on the requester's id, and the
//! total from a window count in the same statement, so every page satisfies
//! `total >= items.len()`.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::job_postings::favorite_flags::PostingWithFavorite;
use crate::models::enums::JobCategory;
use crate::models::job_posting::JobPosting;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Latest,
    Deadline,
    SalaryHigh,
    SalaryLow,
}

impl SortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "latest" => Some(SortKey::Latest),
            "deadline" => Some(SortKey::Deadline),
            "salary_high" => Some(SortKey::SalaryHigh),
            "salary_low" => Some(SortKey::SalaryLow),
            _ => None,
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            SortKey::Latest => " ORDER BY p.created_at DESC, p.id DESC",
            SortKey::Deadline => " ORDER BY p.deadline_at ASC, p.id DESC",
            SortKey::SalaryHigh => " ORDER BY p.salary DESC, p.id DESC",
            SortKey::SalaryLow => " ORDER BY p.salary ASC, p.id DESC",
        }
    }
}

/// Raw query string of `GET /posting/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub job_category: Option<String>,
    pub employment_type: Option<String>,
    pub is_always_recruiting: Option<bool>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Validated search criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub job_category: Option<JobCategory>,
    pub employment_type: Option<String>,
    pub is_always_recruiting: Option<bool>,
    pub sort: SortKey,
    pub page: i64,
    pub limit: i64,
    skip: i64,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl SearchParams {
    pub fn validate(&self) -> Result<SearchQuery, AppError> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::Validation("page must be 1 or more".to_string()));
        }
        let limit = validate_limit(self.limit)?;
        let skip = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| AppError::Validation("page is out of range".to_string()))?;

        let sort = match non_blank(&self.sort) {
            Some(raw) => SortKey::parse(&raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown sort key: {raw}")))?,
            None => SortKey::default(),
        };

        let job_category = non_blank(&self.job_category)
            .map(|raw| {
                JobCategory::parse_input(&raw)
                    .ok_or_else(|| AppError::Validation(format!("Invalid job_category value: {raw}")))
            })
            .transpose()?;

        Ok(SearchQuery {
            keyword: non_blank(&self.keyword),
            location: non_blank(&self.location),
            job_category,
            employment_type: non_blank(&self.employment_type),
            is_always_recruiting: self.is_always_recruiting,
            sort,
            page,
            limit,
            skip,
        })
    }
}

pub fn validate_limit(limit: Option<i64>) -> Result<i64, AppError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    Ok(limit)
}

impl SearchQuery {
    pub fn skip(&self) -> i64 {
        self.skip
    }
}

/// One page of results.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

/// Escapes LIKE metacharacters and wraps the term in `%`.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &SearchQuery) {
    qb.push(" WHERE TRUE");

    if let Some(keyword) = &query.keyword {
        let pattern = like_pattern(keyword);
        qb.push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(location) = &query.location {
        qb.push(" AND p.work_address ILIKE ")
            .push_bind(like_pattern(location));
    }
    if let Some(category) = query.job_category {
        qb.push(" AND p.job_category = ").push_bind(category);
    }
    if let Some(employment_type) = &query.employment_type {
        qb.push(" AND p.employment_type = ")
            .push_bind(employment_type.clone());
    }
    if let Some(always) = query.is_always_recruiting {
        qb.push(" AND p.is_always_recruiting = ").push_bind(always);
    }
}

pub fn build_search_query(query: &SearchQuery, user_id: Option<i64>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT p.*, (f.id IS NOT NULL) AS is_favorited, COUNT(*) OVER() AS total_count \
         FROM job_postings p \
         LEFT JOIN favorites f ON f.job_posting_id = p.id AND f.user_id = ",
    );
    qb.push_bind(user_id);
    push_filters(&mut qb, query);
    qb.push(query.sort.order_by());
    qb.push(" LIMIT ").push_bind(query.limit);
    qb.push(" OFFSET ").push_bind(query.skip());
    qb
}

pub fn build_count_query(query: &SearchQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM job_postings p");
    push_filters(&mut qb, query);
    qb
}

#[derive(sqlx::FromRow)]
struct SearchRow {
    #[sqlx(flatten)]
    posting: JobPosting,
    is_favorited: bool,
    total_count: i64,
}

pub async fn search_postings(
    db: &PgPool,
    query: &SearchQuery,
    user_id: Option<i64>,
) -> Result<Page<PostingWithFavorite>, AppError> {
    let rows: Vec<SearchRow> = build_search_query(query, user_id)
        .build_query_as()
        .fetch_all(db)
        .await?;

    let total = match rows.first() {
        Some(row) => row.total_count,
        // Past the last page the window count has no row to ride on.
        None => {
            build_count_query(query)
                .build_query_scalar::<i64>()
                .fetch_one(db)
                .await?
        }
    };

    let items = rows
        .into_iter()
        .map(|row| PostingWithFavorite {
            posting: row.posting,
            is_favorited: row.is_favorited,
        })
        .collect();

    Ok(Page {
        items,
        total,
        skip: query.skip(),
        limit: query.limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let query = SearchParams::default().validate().unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.sort, SortKey::Latest);
        assert_eq!(query.skip(), 0);
    }

    #[test]
    fn test_skip_from_page() {
        let params = SearchParams {
            page: Some(3),
            limit: Some(20),
            ..Default::default()
        };
        assert_eq!(params.validate().unwrap().skip(), 40);
    }

    #[test]
    fn test_invalid_page_limit_and_sort() {
        for params in [
            SearchParams { page: Some(0), ..Default::default() },
            SearchParams { limit: Some(0), ..Default::default() },
            SearchParams { limit: Some(101), ..Default::default() },
            SearchParams { sort: Some("random".into()), ..Default::default() },
            SearchParams { job_category: Some("astronaut".into()), ..Default::default() },
        ] {
            assert!(matches!(params.validate(), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn test_huge_page_is_rejected() {
        let params = SearchParams {
            page: Some(i64::MAX),
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(AppError::Validation(_))));

        let last_safe = SearchParams {
            page: Some(i64::MAX / 100),
            limit: Some(100),
            ..Default::default()
        };
        assert!(last_safe.validate().is_ok());
    }

    #[test]
    fn test_blank_filters_ignored() {
        let params = SearchParams {
            keyword: Some("   ".into()),
            location: Some(String::new()),
            ..Default::default()
        };
        let query = params.validate().unwrap();
        assert!(query.keyword.is_none());
        assert!(query.location.is_none());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("barista"), "%barista%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_search_sql_shape() {
        let query = SearchParams {
            keyword: Some("cafe".into()),
            location: Some("마포".into()),
            job_category: Some("food".into()),
            is_always_recruiting: Some(true),
            sort: Some("salary_high".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let qb = build_search_query(&query, Some(5));
        let sql = qb.sql();
        assert!(sql.contains("LEFT JOIN favorites f ON f.job_posting_id = p.id AND f.user_id = $1"));
        assert!(sql.contains("p.title ILIKE $2 OR p.description ILIKE $3"));
        assert!(sql.contains("p.work_address ILIKE $4"));
        assert!(sql.contains("p.job_category = $5"));
        assert!(sql.contains("p.is_always_recruiting = $6"));
        assert!(sql.contains("ORDER BY p.salary DESC, p.id DESC LIMIT $7 OFFSET $8"));
        assert!(sql.contains("COUNT(*) OVER()"));
    }

    #[test]
    fn test_count_sql_has_no_paging() {
        let query = SearchParams {
            employment_type: Some("정규직".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let qb = build_count_query(&query);
        let sql = qb.sql();
        assert!(sql.contains("p.employment_type = $1"));
        assert!(!sql.contains("LIMIT"));
    }
}
