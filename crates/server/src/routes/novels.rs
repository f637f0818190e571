//! Novel route handlers: home, discovery, trending and the author's
//! novel management (create, edit, publish, cover upload, delete).

use std::collections::HashSet;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use katha_vault_core::layout::{SectionKind, home_sections};
use katha_vault_core::novel::{
    DiscoverQuery, NovelDraft, NovelUpdate, TRENDING_COUNT, discover, trending, trending_ids,
};
use katha_vault_core::validation::limits;
use katha_vault_core::{
    ChapterId, Novel, NovelId, NovelStatus, User, UserId, ValidationErrors,
};

use crate::db::{LayoutRepository, NovelRepository};
use crate::error::AppError;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::services::UploadError;
use crate::services::uploads::{self, COVER_FIELD};
use crate::state::AppState;

// =============================================================================
// Response Types
// =============================================================================

/// A novel in a listing; chapter text is left out.
#[derive(Debug, Clone, Serialize)]
pub struct NovelSummary {
    pub id: NovelId,
    pub title: String,
    pub author_id: UserId,
    pub author: String,
    pub genres: Vec<String>,
    pub synopsis: String,
    pub status: NovelStatus,
    pub cover_image: Option<String>,
    pub views: u64,
    pub rating: f32,
    pub rating_count: u32,
    pub chapter_count: usize,
    pub featured_genre: Option<String>,
    /// Whether the novel is currently in the top three.
    pub trending: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NovelSummary {
    #[must_use]
    pub fn new(novel: &Novel, trending: &HashSet<NovelId>) -> Self {
        Self {
            id: novel.id,
            title: novel.title.clone(),
            author_id: novel.author_id,
            author: novel.author.clone(),
            genres: novel.genres.clone(),
            synopsis: novel.synopsis.clone(),
            status: novel.status,
            cover_image: novel.cover_image.clone(),
            views: novel.views,
            rating: novel.rating,
            rating_count: novel.rating_count,
            chapter_count: novel.chapters.len(),
            featured_genre: novel.featured_genre.clone(),
            trending: trending.contains(&novel.id),
            created_at: novel.created_at,
            updated_at: novel.updated_at,
        }
    }

    /// Summaries for a list of novels, with trending flags taken from `all`.
    #[must_use]
    pub fn many<'a>(novels: impl IntoIterator<Item = &'a Novel>, all: &[Novel]) -> Vec<Self> {
        let trending = trending_ids(all);
        novels
            .into_iter()
            .map(|n| Self::new(n, &trending))
            .collect()
    }
}

/// Table-of-contents entry.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterEntry {
    pub id: ChapterId,
    pub title: String,
}

/// Novel page: summary plus table of contents.
#[derive(Debug, Clone, Serialize)]
pub struct NovelDetail {
    #[serde(flatten)]
    pub summary: NovelSummary,
    pub chapters: Vec<ChapterEntry>,
}

impl NovelDetail {
    fn new(novel: &Novel, all: &[Novel]) -> Self {
        Self {
            summary: NovelSummary::new(novel, &trending_ids(all)),
            chapters: novel
                .chapters
                .iter()
                .map(|c| ChapterEntry {
                    id: c.id,
                    title: c.title.clone(),
                })
                .collect(),
        }
    }
}

/// One home page section.
#[derive(Debug, Clone, Serialize)]
pub struct SectionResponse {
    pub kind: SectionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    pub title: String,
    pub novels: Vec<NovelSummary>,
}

#[derive(Debug, Deserialize)]
pub struct RatingForm {
    pub rating: u8,
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub rating: f32,
    pub rating_count: u32,
}

// =============================================================================
// Helpers
// =============================================================================

/// Fail with 403 unless `user` wrote `novel`.
pub(crate) fn ensure_author(novel: &Novel, user: &User) -> Result<(), AppError> {
    if novel.author_id == user.id {
        Ok(())
    } else {
        Err(AppError::Forbidden("only the author can change this novel".to_owned()))
    }
}

/// Load a novel the viewer may see, 404 otherwise.
pub(crate) async fn visible_novel(
    state: &AppState,
    id: NovelId,
    viewer: Option<&User>,
) -> Result<(Novel, Vec<Novel>), AppError> {
    let all = NovelRepository::new(state.store()).list().await?;
    let novel = all
        .iter()
        .find(|n| n.id == id && n.visible_to(viewer.map(|u| u.id)))
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("novel {id}")))?;
    Ok((novel, all))
}

async fn detail_response(state: &AppState, novel: &Novel) -> Result<Json<NovelDetail>, AppError> {
    let all = NovelRepository::new(state.store()).list().await?;
    Ok(Json(NovelDetail::new(novel, &all)))
}

// =============================================================================
// Handlers
// =============================================================================

/// Home page sections: trending, configured genres, then all stories.
///
/// GET /api/home
///
/// # Errors
///
/// Returns `AppError` if the store cannot be read.
pub async fn home(State(state): State<AppState>) -> Result<Json<Vec<SectionResponse>>, AppError> {
    let novels = NovelRepository::new(state.store()).list().await?;
    let layout = LayoutRepository::new(state.store()).get().await?;
    let trending = trending_ids(&novels);

    let sections = home_sections(&novels, &layout)
        .into_iter()
        .map(|section| SectionResponse {
            kind: section.kind,
            genre: section.genre,
            title: section.title,
            novels: section
                .novels
                .into_iter()
                .map(|n| NovelSummary::new(n, &trending))
                .collect(),
        })
        .collect();

    Ok(Json(sections))
}

/// Search published novels.
///
/// GET /api/novels?q=&genre=&sort=
///
/// # Errors
///
/// Returns `AppError` if the store cannot be read.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<DiscoverQuery>,
) -> Result<Json<Vec<NovelSummary>>, AppError> {
    let novels = NovelRepository::new(state.store()).list().await?;
    Ok(Json(NovelSummary::many(discover(&novels, &query), &novels)))
}

/// GET /api/novels/trending
///
/// # Errors
///
/// Returns `AppError` if the store cannot be read.
pub async fn trending_novels(
    State(state): State<AppState>,
) -> Result<Json<Vec<NovelSummary>>, AppError> {
    let novels = NovelRepository::new(state.store()).list().await?;
    Ok(Json(NovelSummary::many(
        trending(&novels, TRENDING_COUNT),
        &novels,
    )))
}

/// The signed-in author's novels, drafts included, most recently updated first.
///
/// GET /api/novels/mine
///
/// # Errors
///
/// Returns `AppError` if the store cannot be read.
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<NovelSummary>>, AppError> {
    let novels = NovelRepository::new(state.store()).list().await?;
    let mut own: Vec<&Novel> = novels.iter().filter(|n| n.author_id == user.id).collect();
    own.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(Json(NovelSummary::many(own, &novels)))
}

/// Create a draft novel.
///
/// POST /api/novels
///
/// # Errors
///
/// Returns `AppError::Validation` for invalid fields.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(draft): Json<NovelDraft>,
) -> Result<(StatusCode, Json<NovelDetail>), AppError> {
    draft.validate()?;
    let novel = NovelRepository::new(state.store())
        .create(user.id, &user.name, draft)
        .await?;
    tracing::info!(novel_id = %novel.id, author_id = %user.id, "Novel created");
    Ok((StatusCode::CREATED, detail_response(&state, &novel).await?))
}

/// Novel page. Drafts are only visible to their author.
///
/// GET /api/novels/{id}
///
/// # Errors
///
/// Returns `AppError::NotFound` if the novel does not exist or is hidden.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(id): Path<NovelId>,
) -> Result<Json<NovelDetail>, AppError> {
    let (novel, all) = visible_novel(&state, id, viewer.as_ref()).await?;
    Ok(Json(NovelDetail::new(&novel, &all)))
}

/// Edit title, genres, synopsis or featured genre.
///
/// PUT /api/novels/{id}
///
/// # Errors
///
/// Returns `AppError::Validation`, `NotFound` or `Forbidden`.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NovelId>,
    Json(update): Json<NovelUpdate>,
) -> Result<Json<NovelDetail>, AppError> {
    update.validate()?;
    let novel = NovelRepository::new(state.store())
        .modify(id, |novel| {
            ensure_author(novel, &user)?;
            novel.apply(update);
            Ok::<_, AppError>(novel.clone())
        })
        .await?;
    detail_response(&state, &novel).await
}

/// Delete a novel with its chapters, chapter comments and cover.
///
/// DELETE /api/novels/{id}
///
/// # Errors
///
/// Returns `AppError::NotFound` or `Forbidden`.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NovelId>,
) -> Result<StatusCode, AppError> {
    let removed = NovelRepository::new(state.store())
        .delete(id, |novel| ensure_author(novel, &user))
        .await?;
    if let Some(cover) = &removed.cover_image {
        uploads::remove_cover(&state.config().uploads_dir, cover).await;
    }
    tracing::info!(novel_id = %id, "Novel deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn set_status(
    state: &AppState,
    user: &User,
    id: NovelId,
    status: NovelStatus,
) -> Result<Json<NovelDetail>, AppError> {
    let novel = NovelRepository::new(state.store())
        .modify(id, |novel| {
            ensure_author(novel, user)?;
            novel.status = status;
            novel.touch();
            Ok::<_, AppError>(novel.clone())
        })
        .await?;
    tracing::info!(novel_id = %id, status = %status, "Novel status changed");
    detail_response(state, &novel).await
}

/// POST /api/novels/{id}/publish
///
/// # Errors
///
/// Returns `AppError::NotFound` or `Forbidden`.
pub async fn publish(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NovelId>,
) -> Result<Json<NovelDetail>, AppError> {
    set_status(&state, &user, id, NovelStatus::Published).await
}

/// POST /api/novels/{id}/unpublish
///
/// # Errors
///
/// Returns `AppError::NotFound` or `Forbidden`.
pub async fn unpublish(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NovelId>,
) -> Result<Json<NovelDetail>, AppError> {
    set_status(&state, &user, id, NovelStatus::Draft).await
}

/// Rate a published novel 1 to 5 stars. Rating again replaces the
/// reader's earlier score; authors cannot rate their own novels.
///
/// POST /api/novels/{id}/rating
///
/// # Errors
///
/// Returns `AppError::Validation` for an out-of-range rating,
/// `AppError::Forbidden` for the author and `AppError::NotFound` for hidden
/// novels.
pub async fn rate(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NovelId>,
    Json(form): Json<RatingForm>,
) -> Result<Json<RatingResponse>, AppError> {
    let (min, max) = limits::RATING;
    if !(min..=max).contains(&form.rating) {
        return Err(ValidationErrors::single(
            "rating",
            format!("must be between {min} and {max}"),
        )
        .into());
    }

    let response = NovelRepository::new(state.store())
        .modify(id, |novel| {
            if !novel.visible_to(Some(user.id)) {
                return Err(AppError::NotFound(format!("novel {id}")));
            }
            if novel.author_id == user.id {
                return Err(AppError::Forbidden(
                    "authors cannot rate their own novel".to_owned(),
                ));
            }
            novel.rate(user.id, form.rating);
            Ok(RatingResponse {
                rating: novel.rating,
                rating_count: novel.rating_count,
            })
        })
        .await?;
    Ok(Json(response))
}

/// Upload a cover image (`multipart/form-data`, field `cover`).
///
/// POST /api/novels/{id}/cover
///
/// # Errors
///
/// Returns `AppError::Upload` for a missing, oversized or unsupported file,
/// `AppError::NotFound` or `Forbidden` for the novel.
pub async fn upload_cover(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NovelId>,
    mut multipart: Multipart,
) -> Result<Json<NovelDetail>, AppError> {
    let repo = NovelRepository::new(state.store());
    let novel = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("novel {id}")))?;
    ensure_author(&novel, &user)?;

    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(COVER_FIELD) {
            let content_type = field.content_type().map(str::to_owned);
            let bytes = field.bytes().await.map_err(multipart_error)?;
            file = Some((content_type, bytes));
            break;
        }
    }
    let (content_type, bytes) = file.ok_or(UploadError::MissingFile)?;

    let dir = &state.config().uploads_dir;
    let cover = uploads::save_cover(dir, content_type.as_deref(), &bytes).await?;

    let result = repo
        .modify(id, |novel| {
            ensure_author(novel, &user)?;
            let previous = novel.cover_image.replace(cover.public_path.clone());
            novel.touch();
            Ok::<_, AppError>((novel.clone(), previous))
        })
        .await;

    match result {
        Ok((novel, previous)) => {
            if let Some(previous) = previous {
                uploads::remove_cover(dir, &previous).await;
            }
            detail_response(&state, &novel).await
        }
        Err(e) => {
            uploads::remove_cover(dir, &cover.public_path).await;
            Err(e)
        }
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge {
            max: uploads::MAX_COVER_BYTES,
        }
    } else {
        UploadError::Multipart(err.body_text())
    }
}
