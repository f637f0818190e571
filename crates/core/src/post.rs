//! Social feed posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::comment::{self, Comment, CommentView};
use crate::types::{PostId, UserId};
use crate::validation::{ValidationErrors, Validator, limits};

/// A post in the community feed, with its comment thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub author: String,
    pub content: String,
    pub genre_tag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes: u32,
    #[serde(default)]
    pub liked_by: Vec<UserId>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Input for a new post.
#[derive(Debug, Clone, Deserialize)]
pub struct PostDraft {
    pub content: String,
    #[serde(default)]
    pub genre_tag: Option<String>,
}

impl PostDraft {
    /// # Errors
    ///
    /// Returns the failing fields if the content is empty or too long.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.text("content", &self.content, limits::POST)
            .optional_text("genre_tag", self.genre_tag.as_deref(), limits::GENRE);
        v.finish()
    }
}

/// A post as shown to one viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub id: PostId,
    pub author_id: UserId,
    pub author: String,
    pub content: String,
    pub genre_tag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes: u32,
    pub liked: bool,
    pub comment_count: usize,
    pub comments: Vec<CommentView>,
}

impl Post {
    #[must_use]
    pub fn create(id: PostId, author_id: UserId, author: &str, draft: PostDraft) -> Self {
        Self {
            id,
            author_id,
            author: author.to_owned(),
            content: draft.content.trim().to_owned(),
            genre_tag: draft
                .genre_tag
                .map(|g| g.trim().to_owned())
                .filter(|g| !g.is_empty()),
            created_at: Utc::now(),
            likes: 0,
            liked_by: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Flip `user`'s like on the post. Returns the new liked state.
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

    #[must_use]
    pub fn view(&self, viewer: Option<UserId>) -> PostView {
        PostView {
            id: self.id,
            author_id: self.author_id,
            author: self.author.clone(),
            content: self.content.clone(),
            genre_tag: self.genre_tag.clone(),
            created_at: self.created_at,
            likes: self.likes,
            liked: viewer.is_some_and(|u| self.liked_by.contains(&u)),
            comment_count: comment::count(&self.comments),
            comments: comment::view(&self.comments, viewer),
        }
    }
}

/// Feed filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    pub genre: Option<String>,
    pub author: Option<UserId>,
    /// Only posts by users the viewer follows.
    #[serde(default)]
    pub following: bool,
}

/// Posts matching `query`, newest first. `followed` is consulted only when
/// `query.following` is set.
#[must_use]
pub fn feed<'a>(posts: &'a [Post], query: &FeedQuery, followed: &[UserId]) -> Vec<&'a Post> {
    let genre = query
        .genre
        .as_deref()
        .map(|g| g.trim().to_lowercase())
        .filter(|g| !g.is_empty());
    let mut hits: Vec<&Post> = posts
        .iter()
        .filter(|p| query.author.is_none_or(|a| p.author_id == a))
        .filter(|p| !query.following || followed.contains(&p.author_id))
        .filter(|p| {
            genre.as_ref().is_none_or(|g| {
                p.genre_tag
                    .as_ref()
                    .is_some_and(|tag| tag.to_lowercase() == *g)
            })
        })
        .collect();
    hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    hits
}
