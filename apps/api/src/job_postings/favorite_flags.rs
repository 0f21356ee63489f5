use std::collections::HashSet;

use serde::Serialize;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::job_posting::JobPosting;

/// A posting as returned to clients, with the requester's favorite flag.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostingWithFavorite {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub posting: JobPosting,
    pub is_favorited: bool,
}

/// Ids among `posting_ids` that the user has favorited. One query, or none
/// when there is no user or nothing to look up.
pub async fn favorited_posting_ids(
    db: &PgPool,
    user_id: Option<i64>,
    posting_ids: &[i64],
) -> Result<HashSet<i64>, AppError> {
    let Some(user_id) = user_id else {
        return Ok(HashSet::new());
    };
    if posting_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT job_posting_id FROM favorites WHERE user_id = $1 AND job_posting_id = ANY($2)",
    )
    .bind(user_id)
    .bind(posting_ids)
    .fetch_all(db)
    .await?;

    Ok(ids.into_iter().collect())
}

pub fn attach_favorites(
    postings: Vec<JobPosting>,
    favorited: &HashSet<i64>,
) -> Vec<PostingWithFavorite> {
    postings
        .into_iter()
        .map(|posting| PostingWithFavorite {
            is_favorited: favorited.contains(&posting.id),
            posting,
        })
        .collect()
}

/// Prefetches the favorite set for `postings` and attaches the flags.
pub async fn with_favorites(
    db: &PgPool,
    user_id: Option<i64>,
    postings: Vec<JobPosting>,
) -> Result<Vec<PostingWithFavorite>, AppError> {
    let ids: Vec<i64> = postings.iter().map(|p| p.id).collect();
    let favorited = favorited_posting_ids(db, user_id, &ids).await?;
    Ok(attach_favorites(postings, &favorited))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_postings::form::tests::sample_posting;

    fn posting(id: i64) -> JobPosting {
        JobPosting {
            id,
            ..sample_posting()
        }
    }

    #[test]
    fn test_flags_follow_membership() {
        let favorited: HashSet<i64> = [2, 4].into_iter().collect();
        let items = attach_favorites(vec![posting(1), posting(2), posting(3), posting(4)], &favorited);
        let flags: Vec<(i64, bool)> = items
            .iter()
            .map(|i| (i.posting.id, i.is_favorited))
            .collect();
        assert_eq!(flags, vec![(1, false), (2, true), (3, false), (4, true)]);
    }

    #[test]
    fn test_empty_set_marks_nothing() {
        let items = attach_favorites(vec![posting(1)], &HashSet::new());
        assert!(!items[0].is_favorited);
    }

    #[test]
    fn test_flag_serialized_alongside_posting_fields() {
        let favorited: HashSet<i64> = [7].into_iter().collect();
        let items = attach_favorites(vec![posting(7)], &favorited);
        let json = serde_json::to_value(&items[0]).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["is_favorited"], true);
        assert_eq!(json["education"], "high");
    }

    #[tokio::test]
    async fn test_anonymous_lookup_skips_database() {
        let state = crate::state::AppState::for_tests();
        let ids = favorited_posting_ids(&state.db, None, &[1, 2, 3]).await.unwrap();
        assert!(ids.is_empty());
    }
}
