use sqlx::PgPool;

use crate::errors::AppError;
use crate::job_postings::favorite_flags::PostingWithFavorite;
use crate::job_postings::repository;
use crate::models::favorite::Favorite;

pub async fn add(db: &PgPool, user_id: i64, job_posting_id: i64) -> Result<Favorite, AppError> {
    repository::find_or_404(db, job_posting_id).await?;

    let favorite = sqlx::query_as::<_, Favorite>(
        "INSERT INTO favorites (user_id, job_posting_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(user_id)
    .bind(job_posting_id)
    .fetch_one(db)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict(format!(
            "Job posting {job_posting_id} is already in favorites"
        )),
        other => other,
    })?;
    Ok(favorite)
}

pub async fn remove(db: &PgPool, user_id: i64, job_posting_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND job_posting_id = $2")
        .bind(user_id)
        .bind(job_posting_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Job posting {job_posting_id} is not in favorites"
        )));
    }
    Ok(())
}

/// Every favorited posting of a user, most recently favorited first.
pub async fn list(db: &PgPool, user_id: i64) -> Result<Vec<PostingWithFavorite>, AppError> {
    let items = sqlx::query_as::<_, PostingWithFavorite>(
        r#"
        SELECT p.*, TRUE AS is_favorited
        FROM favorites f
        JOIN job_postings p ON p.id = f.job_posting_id
        WHERE f.user_id = $1
        ORDER BY f.created_at DESC, f.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(items)
}
