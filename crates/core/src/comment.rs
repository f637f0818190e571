//! Nested comment trees.
//!
//! Chapter comments and feed-post comments share one shape: a comment owns
//! its replies, so a thread is a `Vec<Comment>` of roots. Ids are unique
//! across a whole tree (not per level) and are assigned by [`next_id`], which
//! means a reply always has a larger id than its parent and no cycle can form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CommentId, UserId};

/// A comment with its replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author_id: UserId,
    /// Display name at the time of writing.
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Always equal to `liked_by.len()`.
    pub likes: u32,
    #[serde(default)]
    pub liked_by: Vec<UserId>,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    /// A fresh comment with no likes and no replies.
    #[must_use]
    pub fn new(id: CommentId, author_id: UserId, author: &str, text: &str) -> Self {
        Self {
            id,
            author_id,
            author: author.to_owned(),
            text: text.trim().to_owned(),
            created_at: Utc::now(),
            likes: 0,
            liked_by: Vec::new(),
            replies: Vec::new(),
        }
    }

    /// Whether `user` currently likes this comment.
    #[must_use]
    pub fn is_liked_by(&self, user: UserId) -> bool {
        self.liked_by.contains(&user)
    }

    /// Flip `user`'s like. Returns the new liked state.
    pub fn toggle_like(&mut self, user: UserId) -> bool {
        let liked = if let Some(pos) = self.liked_by.iter().position(|u| *u == user) {
            self.liked_by.remove(pos);
            false
        } else {
            self.liked_by.push(user);
            true
        };
        self.likes = u32::try_from(self.liked_by.len()).unwrap_or(u32::MAX);
        liked
    }
}

/// A comment as shown to one viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub id: CommentId,
    pub author_id: UserId,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub likes: u32,
    /// Whether the viewer likes this comment.
    pub liked: bool,
    pub replies: Vec<CommentView>,
}

/// One node of a flattened tree, in pre-order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatComment<'a> {
    pub comment: &'a Comment,
    /// `0` for roots.
    pub depth: usize,
    pub parent_id: Option<CommentId>,
}

/// Next id for a new comment anywhere in `tree`.
#[must_use]
pub fn next_id(tree: &[Comment]) -> CommentId {
    crate::types::next_id(flatten(tree).into_iter().map(|flat| flat.comment.id))
}

/// Find a comment at any depth.
#[must_use]
pub fn find(tree: &[Comment], id: CommentId) -> Option<&Comment> {
    for comment in tree {
        if comment.id == id {
            return Some(comment);
        }
        if let Some(found) = find(&comment.replies, id) {
            return Some(found);
        }
    }
    None
}

/// Find a comment at any depth, mutably.
pub fn find_mut(tree: &mut [Comment], id: CommentId) -> Option<&mut Comment> {
    for comment in tree {
        if comment.id == id {
            return Some(comment);
        }
        if let Some(found) = find_mut(&mut comment.replies, id) {
            return Some(found);
        }
    }
    None
}

/// Append `reply` under `parent_id`. Returns `false` if the parent is absent,
/// in which case the tree is unchanged.
pub fn add_reply(tree: &mut [Comment], parent_id: CommentId, reply: Comment) -> bool {
    match find_mut(tree, parent_id) {
        Some(parent) => {
            parent.replies.push(reply);
            true
        }
        None => false,
    }
}

/// Remove the comment with `id` together with its whole subtree.
///
/// Returns the removed comment (with its replies still attached).
pub fn remove(tree: &mut Vec<Comment>, id: CommentId) -> Option<Comment> {
    if let Some(pos) = tree.iter().position(|c| c.id == id) {
        return Some(tree.remove(pos));
    }
    tree.iter_mut()
        .find_map(|comment| remove(&mut comment.replies, id))
}

/// Flip `user`'s like on the comment with `id`. Returns the new liked
/// state, or `None` if the comment is absent.
pub fn toggle_like(tree: &mut [Comment], id: CommentId, user: UserId) -> Option<bool> {
    find_mut(tree, id).map(|comment| comment.toggle_like(user))
}

/// Number of comments at all depths.
#[must_use]
pub fn count(tree: &[Comment]) -> usize {
    tree.iter().map(|c| 1 + count(&c.replies)).sum()
}

/// Flatten the tree in pre-order (parent before its replies).
#[must_use]
pub fn flatten(tree: &[Comment]) -> Vec<FlatComment<'_>> {
    fn walk<'a>(
        nodes: &'a [Comment],
        depth: usize,
        parent_id: Option<CommentId>,
        out: &mut Vec<FlatComment<'a>>,
    ) {
        for comment in nodes {
            out.push(FlatComment {
                comment,
                depth,
                parent_id,
            });
            walk(&comment.replies, depth + 1, Some(comment.id), out);
        }
    }

    let mut out = Vec::new();
    walk(tree, 0, None, &mut out);
    out
}

/// Render the tree for `viewer` (anonymous viewers like nothing).
#[must_use]
pub fn view(tree: &[Comment], viewer: Option<UserId>) -> Vec<CommentView> {
    tree.iter()
        .map(|c| CommentView {
            id: c.id,
            author_id: c.author_id,
            author: c.author.clone(),
            text: c.text.clone(),
            created_at: c.created_at,
            likes: c.likes,
            liked: viewer.is_some_and(|user| c.is_liked_by(user)),
            replies: view(&c.replies, viewer),
        })
        .collect()
}

/// Insert a new comment into `tree`, as a root or as a reply.
///
/// Assigns the next id. Returns the id, or `None` when `parent_id` names a
/// comment that does not exist.
pub fn insert(
    tree: &mut Vec<Comment>,
    parent_id: Option<CommentId>,
    author_id: UserId,
    author: &str,
    text: &str,
) -> Option<CommentId> {
    let id = next_id(tree);
    let comment = Comment::new(id, author_id, author, text);
    match parent_id {
        None => {
            tree.push(comment);
            Some(id)
        }
        Some(parent) => add_reply(tree, parent, comment).then_some(id),
    }
}
