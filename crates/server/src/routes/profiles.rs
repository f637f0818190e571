//! Public profiles and profile editing.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use katha_vault_core::user::{ProfileUpdate, PublicProfile};
use katha_vault_core::{Novel, User};

use super::novels::NovelSummary;
use crate::db::{NovelRepository, PostRepository, UserRepository};
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Profile page: public fields plus published novels.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: PublicProfile,
    pub novels: Vec<NovelSummary>,
}

/// GET /api/users/{username}
///
/// # Errors
///
/// Returns `AppError::NotFound` for unknown or deactivated users.
pub async fn show(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = UserRepository::new(state.store())
        .get_by_username(&username)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| AppError::NotFound(format!("user {username}")))?;

    let novels = NovelRepository::new(state.store()).list().await?;
    let published: Vec<&Novel> = novels
        .iter()
        .filter(|n| n.author_id == user.id && n.is_published())
        .collect();

    Ok(Json(ProfileResponse {
        profile: PublicProfile::from(&user),
        novels: NovelSummary::many(published, &novels),
    }))
}

/// Update name, username, bio or avatar. A new display name is copied onto
/// the user's novels and posts.
///
/// PUT /api/profile
///
/// # Errors
///
/// Returns `AppError::Validation` for invalid fields and
/// `AppError::Conflict` if the username is taken.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, AppError> {
    update.validate()?;
    let updated = UserRepository::new(state.store())
        .update_profile(user.id, update)
        .await?;
    state.forget_user(user.id).await;

    if updated.name != user.name {
        NovelRepository::new(state.store())
            .rename_author(user.id, &updated.name)
            .await?;
        PostRepository::new(state.store())
            .rename_author(user.id, &updated.name)
            .await?;
        tracing::info!(user_id = %user.id, "Display name propagated to novels and posts");
    }

    Ok(Json(updated))
}
