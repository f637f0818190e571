//! Chapter comment handlers, plus the comment form and like response
//! shared with the post feed.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use katha_vault_core::comment::{self, Comment, CommentView};
use katha_vault_core::validation::limits;
use katha_vault_core::{ChapterId, CommentId, NovelId, User, UserId, ValidationErrors, Validator};

use super::novels::visible_novel;
use crate::db::ChapterCommentRepository;
use crate::error::AppError;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::state::AppState;

/// New comment or reply.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentForm {
    pub text: String,
    /// Reply to this comment; top level when absent.
    #[serde(default)]
    pub parent_id: Option<CommentId>,
}

impl CommentForm {
    pub(crate) fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.text("text", &self.text, limits::COMMENT);
        v.finish()
    }
}

/// State after a like toggle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: u32,
}

/// Insert a validated comment into `tree` and return its view.
pub(crate) fn add_to_tree(
    tree: &mut Vec<Comment>,
    form: &CommentForm,
    user: &User,
) -> Result<CommentView, AppError> {
    let id = comment::insert(tree, form.parent_id, user.id, &user.name, &form.text)
        .ok_or_else(|| AppError::NotFound("parent comment".to_owned()))?;
    comment::find(tree, id)
        .and_then(|c| comment::view(std::slice::from_ref(c), Some(user.id)).pop())
        .ok_or_else(|| AppError::Internal("comment vanished after insert".to_owned()))
}

/// Remove a comment (and its replies) if `user` wrote it or is an admin.
pub(crate) fn remove_from_tree(
    tree: &mut Vec<Comment>,
    id: CommentId,
    user: &User,
) -> Result<(), AppError> {
    let target = comment::find(tree, id).ok_or_else(|| AppError::NotFound(format!("comment {id}")))?;
    if target.author_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden("only the author or an admin can delete this comment".to_owned()));
    }
    comment::remove(tree, id);
    Ok(())
}

/// Toggle `user`'s like on a comment.
pub(crate) fn like_in_tree(
    tree: &mut [Comment],
    id: CommentId,
    user: UserId,
) -> Result<LikeResponse, AppError> {
    let liked = comment::toggle_like(tree, id, user)
        .ok_or_else(|| AppError::NotFound(format!("comment {id}")))?;
    let likes = comment::find(tree, id).map_or(0, |c| c.likes);
    Ok(LikeResponse { liked, likes })
}

/// The chapter must exist in a novel the viewer can see.
async fn ensure_chapter(
    state: &AppState,
    novel_id: NovelId,
    chapter_id: ChapterId,
    viewer: Option<&User>,
) -> Result<(), AppError> {
    let (novel, _) = visible_novel(state, novel_id, viewer).await?;
    if novel.chapter(chapter_id).is_none() {
        return Err(AppError::NotFound(format!("chapter {chapter_id}")));
    }
    Ok(())
}

/// Comment tree of a chapter.
///
/// GET /api/novels/{id}/chapters/{chapter_id}/comments
///
/// # Errors
///
/// Returns `AppError::NotFound` if the chapter cannot be read.
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path((novel_id, chapter_id)): Path<(NovelId, ChapterId)>,
) -> Result<Json<Vec<CommentView>>, AppError> {
    ensure_chapter(&state, novel_id, chapter_id, viewer.as_ref()).await?;
    let tree = ChapterCommentRepository::new(state.store())
        .thread(novel_id, chapter_id)
        .await?;
    Ok(Json(comment::view(&tree, viewer.map(|u| u.id))))
}

/// POST /api/novels/{id}/chapters/{chapter_id}/comments
///
/// # Errors
///
/// Returns `AppError::Validation` for empty text and `AppError::NotFound`
/// for a missing chapter or parent comment.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((novel_id, chapter_id)): Path<(NovelId, ChapterId)>,
    Json(form): Json<CommentForm>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    form.validate()?;
    ensure_chapter(&state, novel_id, chapter_id, Some(&user)).await?;
    let view = ChapterCommentRepository::new(state.store())
        .modify(novel_id, chapter_id, |tree| add_to_tree(tree, &form, &user))
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// DELETE /api/novels/{id}/chapters/{chapter_id}/comments/{comment_id}
///
/// # Errors
///
/// Returns `AppError::NotFound` or `Forbidden`.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((novel_id, chapter_id, comment_id)): Path<(NovelId, ChapterId, CommentId)>,
) -> Result<StatusCode, AppError> {
    ChapterCommentRepository::new(state.store())
        .modify(novel_id, chapter_id, |tree| remove_from_tree(tree, comment_id, &user))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/novels/{id}/chapters/{chapter_id}/comments/{comment_id}/like
///
/// # Errors
///
/// Returns `AppError::NotFound` if the comment does not exist.
pub async fn like(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((novel_id, chapter_id, comment_id)): Path<(NovelId, ChapterId, CommentId)>,
) -> Result<Json<LikeResponse>, AppError> {
    ensure_chapter(&state, novel_id, chapter_id, Some(&user)).await?;
    let response = ChapterCommentRepository::new(state.store())
        .modify(novel_id, chapter_id, |tree| like_in_tree(tree, comment_id, user.id))
        .await?;
    Ok(Json(response))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use katha_vault_core::{Email, UserRole};

    use super::*;

    fn user(id: i32, role: UserRole) -> User {
        User {
            id: UserId::new(id),
            name: format!("user{id}"),
            username: format!("user{id}"),
            avatar: None,
            bio: String::new(),
            active: true,
            email: Email::parse(&format!("user{id}@example.com")).unwrap(),
            role,
            created_at: Utc::now(),
        }
    }

    fn form(text: &str, parent: Option<i32>) -> CommentForm {
        CommentForm {
            text: text.to_owned(),
            parent_id: parent.map(CommentId::new),
        }
    }

    #[test]
    fn test_add_reply_and_missing_parent() {
        let alice = user(1, UserRole::Reader);
        let mut tree = Vec::new();
        let root = add_to_tree(&mut tree, &form("first!", None), &alice).unwrap();
        let reply = add_to_tree(&mut tree, &form("me again", Some(root.id.as_i32())), &alice).unwrap();
        assert_eq!(reply.id, CommentId::new(2));
        assert!(matches!(
            add_to_tree(&mut tree, &form("orphan", Some(42)), &alice),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_only_author_or_admin_removes() {
        let alice = user(1, UserRole::Reader);
        let bob = user(2, UserRole::Reader);
        let admin = user(3, UserRole::Admin);
        let mut tree = Vec::new();
        add_to_tree(&mut tree, &form("alice's", None), &alice).unwrap();
        add_to_tree(&mut tree, &form("another", None), &alice).unwrap();

        assert!(matches!(
            remove_from_tree(&mut tree, CommentId::new(1), &bob),
            Err(AppError::Forbidden(_))
        ));
        remove_from_tree(&mut tree, CommentId::new(1), &alice).unwrap();
        remove_from_tree(&mut tree, CommentId::new(2), &admin).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_like_round_trip() {
        let alice = user(1, UserRole::Reader);
        let mut tree = Vec::new();
        add_to_tree(&mut tree, &form("like me", None), &alice).unwrap();
        let first = like_in_tree(&mut tree, CommentId::new(1), UserId::new(2)).unwrap();
        assert!(first.liked);
        assert_eq!(first.likes, 1);
        let second = like_in_tree(&mut tree, CommentId::new(1), UserId::new(2)).unwrap();
        assert!(!second.liked);
        assert_eq!(second.likes, 0);
    }

    #[test]
    fn test_empty_comment_rejected() {
        assert!(form("   ", None).validate().is_err());
    }
}
