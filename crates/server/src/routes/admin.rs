//! Admin moderation endpoints. Every handler requires `RequireAdmin`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use katha_vault_core::comment;
use katha_vault_core::moderation::{
    CommentHit, CommentLocation, DashboardStats, NovelQuery, UserQuery, dashboard,
    search_comments, search_novels, search_users,
};
use katha_vault_core::{CommentId, HomeLayoutConfig, NovelId, User, UserId};

use super::novels::NovelSummary;
use crate::db::{
    ChapterCommentRepository, LayoutRepository, NovelRepository, PostRepository, UserRepository,
};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::services::uploads;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActiveForm {
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentSearch {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCommentForm {
    pub location: CommentLocation,
    pub comment_id: CommentId,
}

/// GET /api/admin/stats
///
/// # Errors
///
/// Returns `AppError` if the store cannot be read.
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<DashboardStats>, AppError> {
    let store = state.store();
    let users = UserRepository::new(store).list().await?;
    let novels = NovelRepository::new(store).list().await?;
    let posts = PostRepository::new(store).list().await?;
    let threads = ChapterCommentRepository::new(store).all().await?;

    Ok(Json(dashboard(
        &users,
        &novels,
        &posts,
        threads.iter().map(|t| t.comments.as_slice()),
    )))
}

/// GET /api/admin/users?q=&active=&sort=
///
/// # Errors
///
/// Returns `AppError` if the store cannot be read.
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = UserRepository::new(state.store()).list().await?;
    Ok(Json(
        search_users(&users, &query).into_iter().cloned().collect(),
    ))
}

/// Activate or deactivate an account.
///
/// POST /api/admin/users/{id}/active
///
/// # Errors
///
/// Returns `AppError::BadRequest` when admins deactivate themselves and
/// `AppError::NotFound` for unknown users.
pub async fn set_active(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(form): Json<ActiveForm>,
) -> Result<Json<User>, AppError> {
    if id == admin.id && !form.active {
        return Err(AppError::BadRequest("you cannot deactivate your own account".to_owned()));
    }
    let user = UserRepository::new(state.store())
        .set_active(id, form.active)
        .await?;
    state.forget_user(id).await;
    tracing::info!(user_id = %id, active = form.active, admin_id = %admin.id, "Account status changed");
    Ok(Json(user))
}

/// GET /api/admin/novels?q=&status=&sort=
///
/// # Errors
///
/// Returns `AppError` if the store cannot be read.
pub async fn novels(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<NovelQuery>,
) -> Result<Json<Vec<NovelSummary>>, AppError> {
    let novels = NovelRepository::new(state.store()).list().await?;
    Ok(Json(NovelSummary::many(
        search_novels(&novels, &query),
        &novels,
    )))
}

/// Remove any novel.
///
/// DELETE /api/admin/novels/{id}
///
/// # Errors
///
/// Returns `AppError::NotFound` for unknown novels.
pub async fn delete_novel(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<NovelId>,
) -> Result<StatusCode, AppError> {
    let removed = NovelRepository::new(state.store())
        .delete(id, |_| Ok::<_, AppError>(()))
        .await?;
    if let Some(cover) = &removed.cover_image {
        uploads::remove_cover(&state.config().uploads_dir, cover).await;
    }
    tracing::info!(novel_id = %id, admin_id = %admin.id, "Novel removed by admin");
    Ok(StatusCode::NO_CONTENT)
}

/// Search every chapter and post comment.
///
/// GET /api/admin/comments?q=
///
/// # Errors
///
/// Returns `AppError` if the store cannot be read.
pub async fn comments(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(search): Query<CommentSearch>,
) -> Result<Json<Vec<CommentHit>>, AppError> {
    let threads = ChapterCommentRepository::new(state.store()).all().await?;
    let posts = PostRepository::new(state.store()).list().await?;

    let chapter_threads = threads.iter().map(|t| {
        (
            CommentLocation::Chapter {
                novel_id: t.novel_id,
                chapter_id: t.chapter_id,
            },
            t.comments.as_slice(),
        )
    });
    let post_threads = posts
        .iter()
        .map(|p| (CommentLocation::Post { post_id: p.id }, p.comments.as_slice()));

    Ok(Json(search_comments(
        chapter_threads.chain(post_threads),
        search.q.as_ref(),
    )))
}

/// Remove a comment (and its replies) from any thread.
///
/// DELETE /api/admin/comments
///
/// # Errors
///
/// Returns `AppError::NotFound` if the comment or its thread is missing.
pub async fn delete_comment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(form): Json<DeleteCommentForm>,
) -> Result<StatusCode, AppError> {
    let id = form.comment_id;
    let missing = || AppError::NotFound(format!("comment {id}"));

    match form.location {
        CommentLocation::Chapter {
            novel_id,
            chapter_id,
        } => {
            ChapterCommentRepository::new(state.store())
                .modify(novel_id, chapter_id, |tree| {
                    comment::remove(tree, id).map(|_| ()).ok_or_else(missing)
                })
                .await?;
        }
        CommentLocation::Post { post_id } => {
            PostRepository::new(state.store())
                .modify(post_id, |post| {
                    comment::remove(&mut post.comments, id)
                        .map(|_| ())
                        .ok_or_else(missing)
                })
                .await?;
        }
    }

    tracing::info!(comment_id = %id, admin_id = %admin.id, "Comment removed by admin");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/layout
///
/// # Errors
///
/// Returns `AppError` if the store cannot be read.
pub async fn layout(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<HomeLayoutConfig>, AppError> {
    Ok(Json(LayoutRepository::new(state.store()).get().await?))
}

/// PUT /api/admin/layout
///
/// # Errors
///
/// Returns `AppError::Validation` for invalid genre entries.
pub async fn update_layout(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(config): Json<HomeLayoutConfig>,
) -> Result<Json<HomeLayoutConfig>, AppError> {
    let config = config.normalized()?;
    LayoutRepository::new(state.store()).put(&config).await?;
    Ok(Json(config))
}
