//! Novels, chapters, trending and discovery.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChapterId, NovelId, NovelStatus, UserId};
use crate::validation::{ValidationErrors, Validator, limits, normalize_genres};

/// Number of novels shown in the trending strip.
pub const TRENDING_COUNT: usize = 3;

/// A serialized novel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Novel {
    pub id: NovelId,
    pub title: String,
    pub author_id: UserId,
    /// Author display name.
    pub author: String,
    pub genres: Vec<String>,
    pub synopsis: String,
    pub status: NovelStatus,
    /// Public path of the uploaded cover, if any.
    pub cover_image: Option<String>,
    pub views: u64,
    /// Average of all ratings, `0.0` when unrated.
    pub rating: f32,
    #[serde(default)]
    pub rating_count: u32,
    /// One score per reader; `rating` and `rating_count` are derived from it.
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    /// Genre whose home section should feature this novel even if it is not
    /// among `genres`.
    pub featured_genre: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reader's 1..=5 score for a novel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub stars: u8,
}

/// One chapter of a novel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub title: String,
    pub content: String,
}

/// Input for creating a novel.
#[derive(Debug, Clone, Deserialize)]
pub struct NovelDraft {
    pub title: String,
    pub genres: Vec<String>,
    pub synopsis: String,
    #[serde(default)]
    pub featured_genre: Option<String>,
}

impl NovelDraft {
    /// Check the draft's fields.
    ///
    /// # Errors
    ///
    /// Returns every field that is empty, too short or too long.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.text("title", &self.title, limits::NOVEL_TITLE)
            .text("synopsis", &self.synopsis, limits::SYNOPSIS)
            .genres("genres", &normalize_genres(&self.genres))
            .optional_text("featured_genre", self.featured_genre.as_deref(), limits::GENRE);
        v.finish()
    }
}

/// Partial update of a novel's metadata. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NovelUpdate {
    pub title: Option<String>,
    pub genres: Option<Vec<String>>,
    pub synopsis: Option<String>,
    /// `Some(None)` clears the featured genre.
    #[serde(default, with = "double_option")]
    pub featured_genre: Option<Option<String>>,
}

impl NovelUpdate {
    /// Check the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns every present field that violates its rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        if let Some(title) = &self.title {
            v.text("title", title, limits::NOVEL_TITLE);
        }
        if let Some(synopsis) = &self.synopsis {
            v.text("synopsis", synopsis, limits::SYNOPSIS);
        }
        if let Some(genres) = &self.genres {
            v.genres("genres", &normalize_genres(genres));
        }
        if let Some(Some(featured)) = &self.featured_genre {
            v.text("featured_genre", featured, limits::GENRE);
        }
        v.finish()
    }
}

/// Serde helper distinguishing "absent" from "explicitly null".
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Input for adding or replacing a chapter.
#[derive(Debug, Clone, Deserialize)]
pub struct ChapterDraft {
    pub title: String,
    pub content: String,
}

impl ChapterDraft {
    /// Check the chapter's fields.
    ///
    /// # Errors
    ///
    /// Returns every field that is empty, too short or too long.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.text("title", &self.title, limits::CHAPTER_TITLE)
            .text("content", &self.content, limits::CHAPTER_CONTENT);
        v.finish()
    }
}

impl Novel {
    /// Build a new draft novel from validated input.
    #[must_use]
    pub fn create(id: NovelId, author_id: UserId, author: &str, draft: NovelDraft) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: draft.title.trim().to_owned(),
            author_id,
            author: author.to_owned(),
            genres: normalize_genres(&draft.genres),
            synopsis: draft.synopsis.trim().to_owned(),
            status: NovelStatus::Draft,
            cover_image: None,
            views: 0,
            rating: 0.0,
            rating_count: 0,
            ratings: Vec::new(),
            chapters: Vec::new(),
            featured_genre: clean_optional(draft.featured_genre),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a validated metadata update.
    pub fn apply(&mut self, update: NovelUpdate) {
        if let Some(title) = update.title {
            self.title = title.trim().to_owned();
        }
        if let Some(genres) = update.genres {
            self.genres = normalize_genres(&genres);
        }
        if let Some(synopsis) = update.synopsis {
            self.synopsis = synopsis.trim().to_owned();
        }
        if let Some(featured) = update.featured_genre {
            self.featured_genre = clean_optional(featured);
        }
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    #[must_use]
    pub const fn is_published(&self) -> bool {
        self.status.is_public()
    }

    /// Whether `viewer` may see this novel at all.
    #[must_use]
    pub fn visible_to(&self, viewer: Option<UserId>) -> bool {
        self.is_published() || viewer == Some(self.author_id)
    }

    /// Case-insensitive genre membership, including the featured genre.
    #[must_use]
    pub fn has_genre(&self, genre: &str) -> bool {
        let wanted = genre.trim().to_lowercase();
        self.genres.iter().any(|g| g.to_lowercase() == wanted)
            || self
                .featured_genre
                .as_ref()
                .is_some_and(|g| g.to_lowercase() == wanted)
    }

    /// Record `user`'s 1..=5 rating, replacing any earlier score of theirs,
    /// and recompute the average.
    pub fn rate(&mut self, user_id: UserId, stars: u8) {
        match self.ratings.iter_mut().find(|r| r.user_id == user_id) {
            Some(existing) => existing.stars = stars,
            None => self.ratings.push(Rating { user_id, stars }),
        }
        let total: u32 = self.ratings.iter().map(|r| u32::from(r.stars)).sum();
        self.rating_count = u32::try_from(self.ratings.len()).unwrap_or(u32::MAX);
        self.rating = total as f32 / self.rating_count as f32;
    }

    #[must_use]
    pub fn chapter(&self, id: ChapterId) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn chapter_mut(&mut self, id: ChapterId) -> Option<&mut Chapter> {
        self.chapters.iter_mut().find(|c| c.id == id)
    }

    /// Append a chapter, assigning the next chapter id.
    pub fn push_chapter(&mut self, draft: ChapterDraft) -> ChapterId {
        let id = crate::types::next_id(self.chapters.iter().map(|c| c.id));
        self.chapters.push(Chapter {
            id,
            title: draft.title.trim().to_owned(),
            content: draft.content,
        });
        self.touch();
        id
    }

    /// Remove a chapter. Returns `false` if it did not exist.
    pub fn remove_chapter(&mut self, id: ChapterId) -> bool {
        let before = self.chapters.len();
        self.chapters.retain(|c| c.id != id);
        let removed = self.chapters.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Ids of the chapters before and after `id`, in reading order.
    #[must_use]
    pub fn neighbours(&self, id: ChapterId) -> (Option<ChapterId>, Option<ChapterId>) {
        let Some(pos) = self.chapters.iter().position(|c| c.id == id) else {
            return (None, None);
        };
        let prev = pos
            .checked_sub(1)
            .and_then(|p| self.chapters.get(p))
            .map(|c| c.id);
        let next = self.chapters.get(pos + 1).map(|c| c.id);
        (prev, next)
    }
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Order used by trending: views descending, then rating descending, then
/// older id first.
fn trending_order(a: &Novel, b: &Novel) -> Ordering {
    b.views
        .cmp(&a.views)
        .then_with(|| b.rating.total_cmp(&a.rating))
        .then_with(|| a.id.cmp(&b.id))
}

/// The `n` most-viewed published novels.
#[must_use]
pub fn trending(novels: &[Novel], n: usize) -> Vec<&Novel> {
    let mut published: Vec<&Novel> = novels.iter().filter(|n| n.is_published()).collect();
    published.sort_by(|a, b| trending_order(a, b));
    published.truncate(n);
    published
}

/// Ids of the novels that currently carry the trending badge.
#[must_use]
pub fn trending_ids(novels: &[Novel]) -> HashSet<NovelId> {
    trending(novels, TRENDING_COUNT)
        .into_iter()
        .map(|n| n.id)
        .collect()
}

/// Sort order for discovery listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverSort {
    /// Most recently updated first.
    #[default]
    Latest,
    /// Most viewed first.
    Popular,
    /// Highest rated first.
    Rating,
    /// Alphabetical by title.
    Title,
}

/// Discovery query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoverQuery {
    /// Free text matched against title, author and synopsis.
    pub q: Option<String>,
    pub genre: Option<String>,
    #[serde(default)]
    pub sort: DiscoverSort,
}

/// Published novels matching `query`, sorted.
#[must_use]
pub fn discover<'a>(novels: &'a [Novel], query: &DiscoverQuery) -> Vec<&'a Novel> {
    let needle = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);
    let genre = query
        .genre
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty());

    let mut hits: Vec<&Novel> = novels
        .iter()
        .filter(|n| n.is_published())
        .filter(|n| genre.is_none_or(|g| n.has_genre(g)))
        .filter(|n| {
            needle.as_ref().is_none_or(|needle| {
                n.title.to_lowercase().contains(needle)
                    || n.author.to_lowercase().contains(needle)
                    || n.synopsis.to_lowercase().contains(needle)
            })
        })
        .collect();

    match query.sort {
        DiscoverSort::Latest => hits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        DiscoverSort::Popular => hits.sort_by(|a, b| trending_order(a, b)),
        DiscoverSort::Rating => hits.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then_with(|| b.rating_count.cmp(&a.rating_count))
        }),
        DiscoverSort::Title => hits.sort_by_key(|n| n.title.to_lowercase()),
    }
    hits
}
