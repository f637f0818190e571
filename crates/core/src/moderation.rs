//! Admin moderation: search, filter and sort over users, novels and
//! comments, plus the dashboard counters.
//!
//! All text matching is a case-insensitive substring test.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::comment::{self, Comment};
use crate::novel::Novel;
use crate::post::Post;
use crate::types::{ChapterId, CommentId, NovelId, NovelStatus, PostId, UserId};
use crate::user::User;

fn text_matches(haystack: &str, needle: Option<&str>) -> bool {
    needle.is_none_or(|n| haystack.to_lowercase().contains(n))
}

fn needle(q: Option<&String>) -> Option<String> {
    q.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty())
}

/// Sort order for the user table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSort {
    #[default]
    Newest,
    Name,
    Username,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub q: Option<String>,
    pub active: Option<bool>,
    #[serde(default)]
    pub sort: UserSort,
}

/// Users matching name, username or email.
#[must_use]
pub fn search_users<'a>(users: &'a [User], query: &UserQuery) -> Vec<&'a User> {
    let q = needle(query.q.as_ref());
    let q = q.as_deref();
    let mut hits: Vec<&User> = users
        .iter()
        .filter(|u| query.active.is_none_or(|a| u.active == a))
        .filter(|u| {
            text_matches(&u.name, q) || text_matches(&u.username, q) || text_matches(u.email.as_str(), q)
        })
        .collect();
    match query.sort {
        UserSort::Newest => hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))),
        UserSort::Name => hits.sort_by_key(|u| u.name.to_lowercase()),
        UserSort::Username => hits.sort_by(|a, b| a.username.cmp(&b.username)),
    }
    hits
}

/// Sort order for the novel table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NovelSort {
    #[default]
    Newest,
    Title,
    Views,
    Rating,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NovelQuery {
    pub q: Option<String>,
    pub status: Option<NovelStatus>,
    #[serde(default)]
    pub sort: NovelSort,
}

/// Novels (drafts included) matching title, author or any genre.
#[must_use]
pub fn search_novels<'a>(novels: &'a [Novel], query: &NovelQuery) -> Vec<&'a Novel> {
    let q = needle(query.q.as_ref());
    let q = q.as_deref();
    let mut hits: Vec<&Novel> = novels
        .iter()
        .filter(|n| query.status.is_none_or(|s| n.status == s))
        .filter(|n| {
            text_matches(&n.title, q) || text_matches(&n.author, q) || n.genres.iter().any(|g| text_matches(g, q))
        })
        .collect();
    match query.sort {
        NovelSort::Newest => hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))),
        NovelSort::Title => hits.sort_by_key(|n| n.title.to_lowercase()),
        NovelSort::Views => hits.sort_by(|a, b| b.views.cmp(&a.views)),
        NovelSort::Rating => hits.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
    }
    hits
}

/// Where a comment thread lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommentLocation {
    Chapter {
        novel_id: NovelId,
        chapter_id: ChapterId,
    },
    Post {
        post_id: PostId,
    },
}

/// A comment found by moderation search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentHit {
    pub location: CommentLocation,
    pub comment_id: CommentId,
    pub parent_id: Option<CommentId>,
    pub depth: usize,
    pub author_id: UserId,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub likes: u32,
    /// Replies that would be removed together with this comment.
    pub descendants: usize,
}

/// Comments in any thread whose text or author matches `q`, newest first.
#[must_use]
pub fn search_comments<'a, I>(threads: I, q: Option<&String>) -> Vec<CommentHit>
where
    I: IntoIterator<Item = (CommentLocation, &'a [Comment])>,
{
    let q = needle(q);
    let q = q.as_deref();
    let mut hits: Vec<CommentHit> = threads
        .into_iter()
        .flat_map(|(location, tree)| {
            comment::flatten(tree)
                .into_iter()
                .filter(|flat| text_matches(&flat.comment.text, q) || text_matches(&flat.comment.author, q))
                .map(move |flat| CommentHit {
                    location,
                    comment_id: flat.comment.id,
                    parent_id: flat.parent_id,
                    depth: flat.depth,
                    author_id: flat.comment.author_id,
                    author: flat.comment.author.clone(),
                    text: flat.comment.text.clone(),
                    created_at: flat.comment.created_at,
                    likes: flat.comment.likes,
                    descendants: comment::count(&flat.comment.replies),
                })
        })
        .collect();
    hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    hits
}

/// Dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub users: usize,
    pub inactive_users: usize,
    pub novels: usize,
    pub published_novels: usize,
    pub draft_novels: usize,
    pub chapters: usize,
    pub total_views: u64,
    pub posts: usize,
    pub comments: usize,
}

/// Count everything for the dashboard. `chapter_threads` are the chapter
/// comment trees; post comments are read from `posts`.
#[must_use]
pub fn dashboard<'a, I>(users: &[User], novels: &[Novel], posts: &[Post], chapter_threads: I) -> DashboardStats
where
    I: IntoIterator<Item = &'a [Comment]>,
{
    let published = novels.iter().filter(|n| n.is_published()).count();
    let chapter_comments: usize = chapter_threads.into_iter().map(comment::count).sum();
    let post_comments: usize = posts.iter().map(|p| comment::count(&p.comments)).sum();
    DashboardStats {
        users: users.len(),
        inactive_users: users.iter().filter(|u| !u.active).count(),
        novels: novels.len(),
        published_novels: published,
        draft_novels: novels.len() - published,
        chapters: novels.iter().map(|n| n.chapters.len()).sum(),
        total_views: novels.iter().map(|n| n.views).sum(),
        posts: posts.len(),
        comments: chapter_comments + post_comments,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::novel::tests::novel;
    use crate::post::PostDraft;
    use crate::user::tests::user;

    #[test]
    fn test_search_users_matches_any_field() {
        let mut users = vec![
            user(1, "Asha Rao", "asha", "asha@example.com"),
            user(2, "Vikram", "vik", "v@letters.example"),
            user(3, "Meera", "meera", "meera@example.com"),
        ];
        users[2].active = false;

        let by_email = UserQuery {
            q: Some("LETTERS".to_owned()),
            ..UserQuery::default()
        };
        let hits = search_users(&users, &by_email);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, UserId::new(2));

        let inactive = UserQuery {
            active: Some(false),
            ..UserQuery::default()
        };
        assert_eq!(search_users(&users, &inactive)[0].id, UserId::new(3));

        let sorted = UserQuery {
            sort: UserSort::Name,
            ..UserQuery::default()
        };
        let names: Vec<&str> = search_users(&users, &sorted).iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Asha Rao", "Meera", "Vikram"]);
    }

    #[test]
    fn test_search_novels_includes_drafts_and_filters_status() {
        let novels = vec![
            novel(1, "River Song", 3, NovelStatus::Published),
            novel(2, "River Draft", 0, NovelStatus::Draft),
        ];
        let all = NovelQuery {
            q: Some("river".to_owned()),
            ..NovelQuery::default()
        };
        assert_eq!(search_novels(&novels, &all).len(), 2);
        let drafts = NovelQuery {
            status: Some(NovelStatus::Draft),
            ..NovelQuery::default()
        };
        assert_eq!(search_novels(&novels, &drafts)[0].id, NovelId::new(2));
        let genre = NovelQuery {
            q: Some("fanta".to_owned()),
            ..NovelQuery::default()
        };
        assert_eq!(search_novels(&novels, &genre).len(), 2);
    }

    #[test]
    fn test_search_comments_across_threads() {
        let mut chapter_thread = Vec::new();
        comment::insert(&mut chapter_thread, None, UserId::new(1), "asha", "Loved this chapter").unwrap();
        comment::insert(&mut chapter_thread, Some(CommentId::new(1)), UserId::new(2), "troll", "spam spam")
            .unwrap();
        let mut post_thread = Vec::new();
        comment::insert(&mut post_thread, None, UserId::new(2), "troll", "more SPAM").unwrap();

        let chapter = CommentLocation::Chapter {
            novel_id: NovelId::new(1),
            chapter_id: ChapterId::new(1),
        };
        let post = CommentLocation::Post {
            post_id: PostId::new(7),
        };
        let threads = vec![(chapter, chapter_thread.as_slice()), (post, post_thread.as_slice())];
        let hits = search_comments(threads, Some(&"spam".to_owned()));
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().any(|h| h.location == post));
        let nested = hits.iter().find(|h| h.location == chapter).unwrap();
        assert_eq!(nested.depth, 1);
        assert_eq!(nested.parent_id, Some(CommentId::new(1)));
    }

    #[test]
    fn test_location_serialization() {
        let loc = CommentLocation::Post {
            post_id: PostId::new(3),
        };
        let json = serde_json::to_value(loc).unwrap();
        assert_eq!(json["type"], "post");
        assert_eq!(json["post_id"], 3);
    }

    #[test]
    fn test_dashboard_counts() {
        let users = vec![user(1, "A", "aaa", "a@example.com")];
        let novels = vec![
            novel(1, "P", 10, NovelStatus::Published),
            novel(2, "D", 5, NovelStatus::Draft),
        ];
        let mut post = Post::create(
            PostId::new(1),
            UserId::new(1),
            "A",
            PostDraft {
                content: "hello".to_owned(),
                genre_tag: None,
            },
        );
        comment::insert(&mut post.comments, None, UserId::new(1), "A", "hi").unwrap();
        let mut thread = Vec::new();
        comment::insert(&mut thread, None, UserId::new(1), "A", "c1").unwrap();
        comment::insert(&mut thread, Some(CommentId::new(1)), UserId::new(1), "A", "c2").unwrap();

        let stats = dashboard(&users, &novels, &[post], [thread.as_slice()]);
        assert_eq!(stats.published_novels, 1);
        assert_eq!(stats.draft_novels, 1);
        assert_eq!(stats.total_views, 15);
        assert_eq!(stats.comments, 3);
        assert_eq!(stats.posts, 1);
    }
}
