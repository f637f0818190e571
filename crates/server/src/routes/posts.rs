//! Community feed handlers: posts, post likes and post comments.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use katha_vault_core::comment::CommentView;
use katha_vault_core::post::{FeedQuery, PostDraft, feed};
use katha_vault_core::{CommentId, PostId, PostView, User, UserId};

use super::comments::{CommentForm, LikeResponse, add_to_tree, like_in_tree, remove_from_tree};
use crate::db::{PostRepository, SocialRepository};
use crate::error::AppError;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::state::AppState;

fn ensure_owner_or_admin(author: UserId, user: &User) -> Result<(), AppError> {
    if author == user.id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("only the author or an admin can delete this post".to_owned()))
    }
}

/// Feed, newest first.
///
/// GET /api/posts?genre=&author=&following=
///
/// # Errors
///
/// Returns `AppError::Unauthorized` for `following=true` without a session.
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let followed = match (&viewer, query.following) {
        (Some(user), true) => SocialRepository::new(state.store()).following(user.id).await?,
        (None, true) => {
            return Err(AppError::Unauthorized(
                "sign in to see posts from people you follow".to_owned(),
            ));
        }
        (_, false) => Vec::new(),
    };

    let posts = PostRepository::new(state.store()).list().await?;
    let viewer_id = viewer.map(|u| u.id);
    Ok(Json(
        feed(&posts, &query, &followed)
            .into_iter()
            .map(|p| p.view(viewer_id))
            .collect(),
    ))
}

/// POST /api/posts
///
/// # Errors
///
/// Returns `AppError::Validation` for empty content.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(draft): Json<PostDraft>,
) -> Result<(StatusCode, Json<PostView>), AppError> {
    draft.validate()?;
    let post = PostRepository::new(state.store())
        .create(user.id, &user.name, draft)
        .await?;
    tracing::info!(post_id = %post.id, author_id = %user.id, "Post created");
    Ok((StatusCode::CREATED, Json(post.view(Some(user.id)))))
}

/// DELETE /api/posts/{id}
///
/// # Errors
///
/// Returns `AppError::NotFound` or `Forbidden`.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PostId>,
) -> Result<StatusCode, AppError> {
    PostRepository::new(state.store())
        .delete(id, |post| ensure_owner_or_admin(post.author_id, &user))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/posts/{id}/like
///
/// # Errors
///
/// Returns `AppError::NotFound` if the post does not exist.
pub async fn like(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PostId>,
) -> Result<Json<LikeResponse>, AppError> {
    let response = PostRepository::new(state.store())
        .modify(id, |post| {
            let liked = post.toggle_like(user.id);
            Ok::<_, AppError>(LikeResponse {
                liked,
                likes: post.likes,
            })
        })
        .await?;
    Ok(Json(response))
}

/// POST /api/posts/{id}/comments
///
/// # Errors
///
/// Returns `AppError::Validation` for empty text and `AppError::NotFound`
/// for a missing post or parent comment.
pub async fn create_comment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PostId>,
    Json(form): Json<CommentForm>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    form.validate()?;
    let view = PostRepository::new(state.store())
        .modify(id, |post| add_to_tree(&mut post.comments, &form, &user))
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// DELETE /api/posts/{id}/comments/{comment_id}
///
/// # Errors
///
/// Returns `AppError::NotFound` or `Forbidden`.
pub async fn delete_comment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((id, comment_id)): Path<(PostId, CommentId)>,
) -> Result<StatusCode, AppError> {
    PostRepository::new(state.store())
        .modify(id, |post| remove_from_tree(&mut post.comments, comment_id, &user))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/posts/{id}/comments/{comment_id}/like
///
/// # Errors
///
/// Returns `AppError::NotFound` if the post or comment does not exist.
pub async fn like_comment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((id, comment_id)): Path<(PostId, CommentId)>,
) -> Result<Json<LikeResponse>, AppError> {
    let response = PostRepository::new(state.store())
        .modify(id, |post| like_in_tree(&mut post.comments, comment_id, user.id))
        .await?;
    Ok(Json(response))
}
