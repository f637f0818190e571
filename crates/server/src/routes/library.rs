//! Personal library (saved novels) and follow list.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use katha_vault_core::user::PublicProfile;
use katha_vault_core::{Novel, NovelId, UserId};

use super::novels::{NovelSummary, visible_novel};
use crate::db::{NovelRepository, SocialRepository, UserRepository};
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Saved novels in the order they were saved. Novels that were deleted or
/// unpublished since are skipped.
///
/// GET /api/library
///
/// # Errors
///
/// Returns `AppError` if the store cannot be read.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<NovelSummary>>, AppError> {
    let saved = SocialRepository::new(state.store()).library(user.id).await?;
    let novels = NovelRepository::new(state.store()).list().await?;
    let shelf: Vec<&Novel> = saved
        .iter()
        .filter_map(|id| novels.iter().find(|n| n.id == *id))
        .filter(|n| n.visible_to(Some(user.id)))
        .collect();
    Ok(Json(NovelSummary::many(shelf, &novels)))
}

/// PUT /api/library/{novel_id}
///
/// # Errors
///
/// Returns `AppError::NotFound` if the novel is missing or hidden.
pub async fn save(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(novel_id): Path<NovelId>,
) -> Result<StatusCode, AppError> {
    visible_novel(&state, novel_id, Some(&user)).await?;
    SocialRepository::new(state.store())
        .save(user.id, novel_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/library/{novel_id}
///
/// # Errors
///
/// Returns `AppError` if the store cannot be written.
pub async fn unsave(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(novel_id): Path<NovelId>,
) -> Result<StatusCode, AppError> {
    SocialRepository::new(state.store())
        .unsave(user.id, novel_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Followed users, in follow order.
///
/// GET /api/following
///
/// # Errors
///
/// Returns `AppError` if the store cannot be read.
pub async fn following(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<PublicProfile>>, AppError> {
    let ids = SocialRepository::new(state.store()).following(user.id).await?;
    let users = UserRepository::new(state.store()).list().await?;
    Ok(Json(
        ids.iter()
            .filter_map(|id| users.iter().find(|u| u.id == *id))
            .map(PublicProfile::from)
            .collect(),
    ))
}

/// PUT /api/following/{user_id}
///
/// # Errors
///
/// Returns `AppError::BadRequest` when following yourself and
/// `AppError::NotFound` for unknown users.
pub async fn follow(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(target): Path<UserId>,
) -> Result<StatusCode, AppError> {
    if target == user.id {
        return Err(AppError::BadRequest("you cannot follow yourself".to_owned()));
    }
    if state.user(target).await?.is_none() {
        return Err(AppError::NotFound(format!("user {target}")));
    }
    SocialRepository::new(state.store())
        .follow(user.id, target)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/following/{user_id}
///
/// # Errors
///
/// Returns `AppError` if the store cannot be written.
pub async fn unfollow(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(target): Path<UserId>,
) -> Result<StatusCode, AppError> {
    SocialRepository::new(state.store())
        .unfollow(user.id, target)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
