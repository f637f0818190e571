//! Chapter route handlers: reading and the author's chapter editing.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use katha_vault_core::novel::ChapterDraft;
use katha_vault_core::{Chapter, ChapterId, NovelId, UserId};

use super::novels::{ensure_author, visible_novel};
use crate::db::{ChapterCommentRepository, NovelRepository};
use crate::error::AppError;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::state::AppState;

/// A chapter with reading navigation.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterRead {
    pub novel_id: NovelId,
    pub novel_title: String,
    pub author_id: UserId,
    pub author: String,
    pub chapter: Chapter,
    /// 1-based position in the novel.
    pub number: usize,
    pub total: usize,
    pub prev: Option<ChapterId>,
    pub next: Option<ChapterId>,
    /// Novel views after this read.
    pub views: u64,
}

/// Read a chapter. Reading a published novel counts a view.
///
/// GET /api/novels/{id}/chapters/{chapter_id}
///
/// # Errors
///
/// Returns `AppError::NotFound` if the novel is hidden or the chapter is missing.
pub async fn read(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path((novel_id, chapter_id)): Path<(NovelId, ChapterId)>,
) -> Result<Json<ChapterRead>, AppError> {
    let (novel, _) = visible_novel(&state, novel_id, viewer.as_ref()).await?;
    let chapter = novel
        .chapter(chapter_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("chapter {chapter_id}")))?;

    let views = if novel.is_published() {
        NovelRepository::new(state.store())
            .modify(novel_id, |n| {
                n.views += 1;
                Ok::<_, AppError>(n.views)
            })
            .await?
    } else {
        novel.views
    };

    let (prev, next) = novel.neighbours(chapter_id);
    let number = novel
        .chapters
        .iter()
        .position(|c| c.id == chapter_id)
        .map_or(0, |p| p + 1);

    Ok(Json(ChapterRead {
        novel_id,
        novel_title: novel.title.clone(),
        author_id: novel.author_id,
        author: novel.author.clone(),
        chapter,
        number,
        total: novel.chapters.len(),
        prev,
        next,
        views,
    }))
}

/// Append a chapter.
///
/// POST /api/novels/{id}/chapters
///
/// # Errors
///
/// Returns `AppError::Validation`, `NotFound` or `Forbidden`.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(novel_id): Path<NovelId>,
    Json(draft): Json<ChapterDraft>,
) -> Result<(StatusCode, Json<Chapter>), AppError> {
    draft.validate()?;
    let chapter = NovelRepository::new(state.store())
        .modify(novel_id, |novel| {
            ensure_author(novel, &user)?;
            let id = novel.push_chapter(draft);
            novel
                .chapter(id)
                .cloned()
                .ok_or_else(|| AppError::Internal("chapter vanished after insert".to_owned()))
        })
        .await?;
    tracing::info!(novel_id = %novel_id, chapter_id = %chapter.id, "Chapter added");
    Ok((StatusCode::CREATED, Json(chapter)))
}

/// Replace a chapter's title and content.
///
/// PUT /api/novels/{id}/chapters/{chapter_id}
///
/// # Errors
///
/// Returns `AppError::Validation`, `NotFound` or `Forbidden`.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((novel_id, chapter_id)): Path<(NovelId, ChapterId)>,
    Json(draft): Json<ChapterDraft>,
) -> Result<Json<Chapter>, AppError> {
    draft.validate()?;
    let chapter = NovelRepository::new(state.store())
        .modify(novel_id, |novel| {
            ensure_author(novel, &user)?;
            let chapter = novel
                .chapter_mut(chapter_id)
                .ok_or_else(|| AppError::NotFound(format!("chapter {chapter_id}")))?;
            chapter.title = draft.title.trim().to_owned();
            chapter.content = draft.content;
            let updated = chapter.clone();
            novel.touch();
            Ok::<_, AppError>(updated)
        })
        .await?;
    Ok(Json(chapter))
}

/// Delete a chapter and its comment thread.
///
/// DELETE /api/novels/{id}/chapters/{chapter_id}
///
/// # Errors
///
/// Returns `AppError::NotFound` or `Forbidden`.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((novel_id, chapter_id)): Path<(NovelId, ChapterId)>,
) -> Result<StatusCode, AppError> {
    NovelRepository::new(state.store())
        .modify(novel_id, |novel| {
            ensure_author(novel, &user)?;
            if novel.remove_chapter(chapter_id) {
                Ok(())
            } else {
                Err(AppError::NotFound(format!("chapter {chapter_id}")))
            }
        })
        .await?;
    ChapterCommentRepository::new(state.store())
        .delete_chapter(novel_id, chapter_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
