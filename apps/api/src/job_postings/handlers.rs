use axum::{
    extract::{rejection::QueryRejection, Multipart, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{CurrentCompanyUser, MaybeUser};
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::job_postings::favorite_flags::{with_favorites, PostingWithFavorite};
use crate::job_postings::form::{read_posting_form, JobPostingUpdate, NewJobPosting};
use crate::job_postings::repository::{self, RankedPosting};
use crate::job_postings::search::{search_postings, validate_limit, Page, SearchParams};
use crate::models::enums::PostingFormOptions;
use crate::models::job_posting::JobPosting;
use crate::state::AppState;
use crate::storage::delete_quietly;

const IMAGE_PREFIX: &str = "postings";

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ListParams {
    pub fn validate(&self) -> Result<(i64, i64), AppError> {
        let skip = self.skip.unwrap_or(0);
        if skip < 0 {
            return Err(AppError::Validation("skip must be 0 or more".to_string()));
        }
        Ok((skip, validate_limit(self.limit)?))
    }
}

#[derive(Debug, Deserialize)]
pub struct AgeRangeParams {
    pub age_start: i32,
    pub age_end: i32,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RankedItem {
    #[serde(flatten)]
    pub item: PostingWithFavorite,
    pub application_count: i64,
}

/// Only the author may change or remove a posting.
pub fn ensure_author(posting: &JobPosting, company_user_id: i64) -> Result<(), AppError> {
    if posting.author_id != company_user_id {
        return Err(AppError::Forbidden(
            "Only the author can modify this posting".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_age_range(age_start: i32, age_end: i32) -> Result<(), AppError> {
    if age_start < 0 || age_end <= age_start {
        return Err(AppError::Validation(
            "age range must satisfy 0 <= age_start < age_end".to_string(),
        ));
    }
    Ok(())
}

async fn rank_with_favorites(
    state: &AppState,
    user_id: Option<i64>,
    rows: Vec<RankedPosting>,
) -> Result<Vec<RankedItem>, AppError> {
    let counts: Vec<i64> = rows.iter().map(|r| r.application_count).collect();
    let postings = rows.into_iter().map(|r| r.posting).collect();
    let items = with_favorites(&state.db, user_id, postings).await?;
    Ok(items
        .into_iter()
        .zip(counts)
        .map(|(item, application_count)| RankedItem {
            item,
            application_count,
        })
        .collect())
}

/// POST /posting
/// Multipart form; `image_file` is optional.
pub async fn handle_create_posting(
    State(state): State<AppState>,
    CurrentCompanyUser(author): CurrentCompanyUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JobPosting>), AppError> {
    let form = read_posting_form(multipart).await?;
    let new = NewJobPosting::from_fields(&form.fields)?;
    new.validate(Utc::now().date_naive())?;

    let image_url = match form.image {
        Some(image) => Some(state.images.put(IMAGE_PREFIX, image).await?),
        None => None,
    };

    match repository::insert(
        &state.db,
        author.id,
        author.company_id,
        &new,
        image_url.as_deref(),
    )
    .await
    {
        Ok(posting) => {
            info!("Company user {} created posting {}", author.id, posting.id);
            Ok((StatusCode::CREATED, Json(posting)))
        }
        Err(e) => {
            if let Some(url) = &image_url {
                delete_quietly(state.images.as_ref(), url).await;
            }
            Err(e)
        }
    }
}

/// GET /posting
pub async fn handle_list_postings(
    State(state): State<AppState>,
    viewer: MaybeUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<PostingWithFavorite>>, AppError> {
    let Query(params) = params?;
    let (skip, limit) = params.validate()?;

    let (postings, total) = repository::list(&state.db, skip, limit).await?;
    let items = with_favorites(&state.db, viewer.id(), postings).await?;

    Ok(Json(Page {
        items,
        total,
        skip,
        limit,
    }))
}

/// GET /posting/search
pub async fn handle_search_postings(
    State(state): State<AppState>,
    viewer: MaybeUser,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Page<PostingWithFavorite>>, AppError> {
    let Query(params) = params?;
    let query = params.validate()?;
    let page = search_postings(&state.db, &query, viewer.id()).await?;
    Ok(Json(page))
}

/// GET /posting/popular
pub async fn handle_popular_postings(
    State(state): State<AppState>,
    viewer: MaybeUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<RankedItem>>, AppError> {
    let Query(params) = params?;
    let (skip, limit) = params.validate()?;

    let (rows, total) = repository::list_popular(&state.db, skip, limit).await?;
    let items = rank_with_favorites(&state, viewer.id(), rows).await?;

    Ok(Json(Page {
        items,
        total,
        skip,
        limit,
    }))
}

/// GET /posting/popular/age?age_start=20&age_end=30
pub async fn handle_popular_by_age(
    State(state): State<AppState>,
    viewer: MaybeUser,
    params: Result<Query<AgeRangeParams>, QueryRejection>,
) -> Result<Json<Page<RankedItem>>, AppError> {
    let Query(params) = params?;
    validate_age_range(params.age_start, params.age_end)?;
    let (skip, limit) = ListParams {
        skip: params.skip,
        limit: params.limit,
    }
    .validate()?;

    let (rows, total) =
        repository::list_popular_by_age(&state.db, params.age_start, params.age_end, skip, limit)
            .await?;
    let items = rank_with_favorites(&state, viewer.id(), rows).await?;

    Ok(Json(Page {
        items,
        total,
        skip,
        limit,
    }))
}

/// GET /posting/options
pub async fn handle_posting_options() -> Json<PostingFormOptions> {
    Json(PostingFormOptions::build())
}

/// GET /posting/:id
pub async fn handle_get_posting(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PostingWithFavorite>, AppError> {
    let posting = repository::find_or_404(&state.db, id).await?;
    let mut items = with_favorites(&state.db, viewer.id(), vec![posting]).await?;
    items
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job posting {id} not found")))
}

/// PATCH /posting/:id
pub async fn handle_update_posting(
    State(state): State<AppState>,
    CurrentCompanyUser(author): CurrentCompanyUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<JobPostingUpdate>,
) -> Result<Json<JobPosting>, AppError> {
    let existing = repository::find_or_404(&state.db, id).await?;
    ensure_author(&existing, author.id)?;

    let merged = update.merge_into(&existing, Utc::now().date_naive())?;
    let updated = repository::update(&state.db, &merged).await?;
    info!("Company user {} updated posting {}", author.id, id);
    Ok(Json(updated))
}

/// DELETE /posting/:id
pub async fn handle_delete_posting(
    State(state): State<AppState>,
    CurrentCompanyUser(author): CurrentCompanyUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    let existing = repository::find_or_404(&state.db, id).await?;
    ensure_author(&existing, author.id)?;

    repository::delete(&state.db, id).await?;
    if let Some(url) = &existing.postings_image {
        delete_quietly(state.images.as_ref(), url).await;
    }
    info!("Company user {} deleted posting {}", author.id, id);
    Ok(StatusCode::NO_CONTENT)
}
