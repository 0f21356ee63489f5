use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::job_postings::form::NewJobPosting;
use crate::models::job_posting::{JobPosting, JobPostingSummary};

/// A posting with how many applications it has received.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RankedPosting {
    #[sqlx(flatten)]
    pub posting: JobPosting,
    pub application_count: i64,
}

pub async fn insert(
    db: &PgPool,
    author_id: i64,
    company_id: i64,
    new: &NewJobPosting,
    image_url: Option<&str>,
) -> Result<JobPosting, AppError> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO job_postings (title, author_id, company_id, recruit_period_start, \
         recruit_period_end, is_always_recruiting, education, recruit_number, benefits, \
         preferred_conditions, other_conditions, work_address, work_place_name, payment_method, \
         job_category, work_duration, career, employment_type, salary, deadline_at, work_days, \
         description, postings_image) ",
    );
    qb.push_values(std::iter::once(new), |mut row, new| {
        row.push_bind(&new.title)
            .push_bind(author_id)
            .push_bind(company_id)
            .push_bind(new.recruit_period_start)
            .push_bind(new.recruit_period_end)
            .push_bind(new.is_always_recruiting)
            .push_bind(new.education)
            .push_bind(new.recruit_number)
            .push_bind(&new.benefits)
            .push_bind(&new.preferred_conditions)
            .push_bind(&new.other_conditions)
            .push_bind(&new.work_address)
            .push_bind(&new.work_place_name)
            .push_bind(new.payment_method)
            .push_bind(new.job_category)
            .push_bind(new.work_duration)
            .push_bind(&new.career)
            .push_bind(&new.employment_type)
            .push_bind(new.salary)
            .push_bind(new.deadline_at)
            .push_bind(&new.work_days)
            .push_bind(&new.description)
            .push_bind(image_url);
    });
    qb.push(" RETURNING *");

    let posting = qb.build_query_as::<JobPosting>().fetch_one(db).await?;
    Ok(posting)
}

pub async fn find(db: &PgPool, id: i64) -> Result<Option<JobPosting>, AppError> {
    let posting = sqlx::query_as::<_, JobPosting>("SELECT * FROM job_postings WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(posting)
}

pub async fn find_or_404(db: &PgPool, id: i64) -> Result<JobPosting, AppError> {
    find(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job posting {id} not found")))
}

/// Writes every mutable column of an already merged posting.
pub async fn update(db: &PgPool, posting: &JobPosting) -> Result<JobPosting, AppError> {
    let updated = sqlx::query_as::<_, JobPosting>(
        r#"
        UPDATE job_postings SET
            title = $2, recruit_period_start = $3, recruit_period_end = $4,
            is_always_recruiting = $5, education = $6, recruit_number = $7,
            benefits = $8, preferred_conditions = $9, other_conditions = $10,
            work_address = $11, work_place_name = $12, payment_method = $13,
            job_category = $14, work_duration = $15, career = $16,
            employment_type = $17, salary = $18, deadline_at = $19,
            work_days = $20, description = $21, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(posting.id)
    .bind(&posting.title)
    .bind(posting.recruit_period_start)
    .bind(posting.recruit_period_end)
    .bind(posting.is_always_recruiting)
    .bind(posting.education)
    .bind(posting.recruit_number)
    .bind(&posting.benefits)
    .bind(&posting.preferred_conditions)
    .bind(&posting.other_conditions)
    .bind(&posting.work_address)
    .bind(&posting.work_place_name)
    .bind(posting.payment_method)
    .bind(posting.job_category)
    .bind(posting.work_duration)
    .bind(&posting.career)
    .bind(&posting.employment_type)
    .bind(posting.salary)
    .bind(posting.deadline_at)
    .bind(&posting.work_days)
    .bind(&posting.description)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Job posting {} not found", posting.id)))?;
    Ok(updated)
}

pub async fn delete(db: &PgPool, id: i64) -> Result<(), AppError> {
    sqlx::query("DELETE FROM job_postings WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn count_all(db: &PgPool) -> Result<i64, AppError> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM job_postings")
        .fetch_one(db)
        .await?;
    Ok(total)
}

#[derive(sqlx::FromRow)]
struct CountedPosting {
    #[sqlx(flatten)]
    posting: JobPosting,
    total_count: i64,
}

#[derive(sqlx::FromRow)]
struct CountedRanked {
    #[sqlx(flatten)]
    ranked: RankedPosting,
    total_count: i64,
}

const LIST_SQL: &str = r#"
    SELECT p.*, COUNT(*) OVER() AS total_count
    FROM job_postings p
    ORDER BY p.created_at DESC, p.id DESC
    LIMIT $1 OFFSET $2
"#;

const POPULAR_SQL: &str = r#"
    SELECT p.*, COUNT(a.id) AS application_count, COUNT(*) OVER() AS total_count
    FROM job_postings p
    LEFT JOIN job_applications a ON a.job_posting_id = p.id
    GROUP BY p.id
    ORDER BY application_count DESC, p.created_at DESC, p.id DESC
    LIMIT $1 OFFSET $2
"#;

const APPLICANT_AGE: &str = "EXTRACT(YEAR FROM AGE(CURRENT_DATE, u.birthday))::int";

fn age_filter() -> String {
    format!("u.birthday IS NOT NULL AND {APPLICANT_AGE} >= $1 AND {APPLICANT_AGE} < $2")
}

fn popular_by_age_sql() -> String {
    format!(
        r#"
        SELECT p.*, COUNT(a.id) AS application_count, COUNT(*) OVER() AS total_count
        FROM job_postings p
        JOIN job_applications a ON a.job_posting_id = p.id
        JOIN users u ON u.id = a.user_id
        WHERE {}
        GROUP BY p.id
        ORDER BY application_count DESC, p.created_at DESC, p.id DESC
        LIMIT $3 OFFSET $4
        "#,
        age_filter()
    )
}

fn popular_by_age_count_sql() -> String {
    format!(
        r#"
        SELECT COUNT(DISTINCT a.job_posting_id)
        FROM job_applications a
        JOIN users u ON u.id = a.user_id
        WHERE {}
        "#,
        age_filter()
    )
}

/// Newest first, with the total taken from the same statement.
pub async fn list(
    db: &PgPool,
    skip: i64,
    limit: i64,
) -> Result<(Vec<JobPosting>, i64), AppError> {
    let rows = sqlx::query_as::<_, CountedPosting>(LIST_SQL)
        .bind(limit)
        .bind(skip)
        .fetch_all(db)
        .await?;

    let total = match rows.first() {
        Some(row) => row.total_count,
        None => count_all(db).await?,
    };
    Ok((rows.into_iter().map(|r| r.posting).collect(), total))
}

/// Most applied-to first, newest first among equals.
pub async fn list_popular(
    db: &PgPool,
    skip: i64,
    limit: i64,
) -> Result<(Vec<RankedPosting>, i64), AppError> {
    let rows = sqlx::query_as::<_, CountedRanked>(POPULAR_SQL)
        .bind(limit)
        .bind(skip)
        .fetch_all(db)
        .await?;

    let total = match rows.first() {
        Some(row) => row.total_count,
        None => count_all(db).await?,
    };
    Ok((rows.into_iter().map(|r| r.ranked).collect(), total))
}

/// Ranked by applications from users aged within `[age_start, age_end)`.
/// Postings without such applicants are left out.
pub async fn list_popular_by_age(
    db: &PgPool,
    age_start: i32,
    age_end: i32,
    skip: i64,
    limit: i64,
) -> Result<(Vec<RankedPosting>, i64), AppError> {
    let rows = sqlx::query_as::<_, CountedRanked>(&popular_by_age_sql())
        .bind(age_start)
        .bind(age_end)
        .bind(limit)
        .bind(skip)
        .fetch_all(db)
        .await?;

    let total = match rows.first() {
        Some(row) => row.total_count,
        None => {
            sqlx::query_scalar::<_, i64>(&popular_by_age_count_sql())
                .bind(age_start)
                .bind(age_end)
                .fetch_one(db)
                .await?
        }
    };
    Ok((rows.into_iter().map(|r| r.ranked).collect(), total))
}

pub async fn summaries_for_company(
    db: &PgPool,
    company_id: i64,
) -> Result<Vec<JobPostingSummary>, AppError> {
    let summaries = sqlx::query_as::<_, JobPostingSummary>(
        r#"
        SELECT id, title, work_address, is_always_recruiting, deadline_at, created_at
        FROM job_postings
        WHERE company_id = $1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(company_id)
    .fetch_all(db)
    .await?;
    Ok(summaries)
}

/// Image URLs of every posting a company owns.
pub async fn image_urls_for_company(db: &PgPool, company_id: i64) -> Result<Vec<String>, AppError> {
    let urls = sqlx::query_scalar::<_, String>(
        "SELECT postings_image FROM job_postings WHERE company_id = $1 AND postings_image IS NOT NULL",
    )
    .bind(company_id)
    .fetch_all(db)
    .await?;
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_and_total_share_one_statement() {
        for sql in [
            LIST_SQL.to_string(),
            POPULAR_SQL.to_string(),
            popular_by_age_sql(),
        ] {
            assert!(sql.contains("COUNT(*) OVER() AS total_count"));
            assert!(sql.contains("LIMIT $"));
        }
    }

    #[test]
    fn test_age_bounds_are_half_open() {
        let sql = popular_by_age_sql();
        assert!(sql.contains(">= $1"));
        assert!(sql.contains("< $2"));
        assert!(popular_by_age_count_sql().contains("COUNT(DISTINCT a.job_posting_id)"));
    }
}
