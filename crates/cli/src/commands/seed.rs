//! Seed novels and chapters from a YAML file.
//!
//! ```yaml
//! novels:
//!   - title: The River King
//!     author: mira            # username of an existing account
//!     genres: [Fantasy]
//!     synopsis: A ferryman inherits a kingdom nobody else can see.
//!     published: true
//!     views: 120
//!     chapters:
//!       - title: The Crossing
//!         content: The river was wider at night...
//! ```
//!
//! The whole file is validated before anything is written.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use katha_vault_core::novel::{ChapterDraft, NovelDraft};
use katha_vault_core::{NovelStatus, User, ValidationErrors};
use katha_vault_server::db::{NovelRepository, RepositoryError, UserRepository, keys};

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Could not read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Novel #{index} ({title}): {errors}")]
    Invalid {
        index: usize,
        title: String,
        errors: ValidationErrors,
    },

    #[error("Novel '{title}': no account with username '{author}'")]
    UnknownAuthor { title: String, author: String },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub novels: Vec<SeedNovel>,
}

#[derive(Debug, Deserialize)]
pub struct SeedNovel {
    pub title: String,
    /// Username of the author.
    pub author: String,
    pub genres: Vec<String>,
    pub synopsis: String,
    #[serde(default)]
    pub featured_genre: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub chapters: Vec<ChapterDraft>,
}

impl SeedNovel {
    fn draft(&self) -> NovelDraft {
        NovelDraft {
            title: self.title.clone(),
            genres: self.genres.clone(),
            synopsis: self.synopsis.clone(),
            featured_genre: self.featured_genre.clone(),
        }
    }
}

/// Parse and validate a seed file.
pub fn parse(content: &str) -> Result<SeedFile, SeedError> {
    let file: SeedFile = serde_yaml::from_str(content)?;
    for (index, novel) in file.novels.iter().enumerate() {
        let invalid = |errors| SeedError::Invalid {
            index: index + 1,
            title: novel.title.clone(),
            errors,
        };
        novel.draft().validate().map_err(invalid)?;
        for chapter in &novel.chapters {
            chapter.validate().map_err(invalid)?;
        }
    }
    Ok(file)
}

/// Seed the store from `path`.
pub async fn run(path: &Path, replace: bool) -> Result<(), SeedError> {
    tracing::info!(path = %path.display(), "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let file = parse(&content)?;
    tracing::info!(novels = file.novels.len(), "Seed file validated");

    let store = connect().await?;
    let users = UserRepository::new(&store);
    let novels = NovelRepository::new(&store);

    let mut authors: HashMap<String, User> = HashMap::new();
    for novel in &file.novels {
        if authors.contains_key(&novel.author) {
            continue;
        }
        let user = users
            .get_by_username(&novel.author)
            .await?
            .ok_or_else(|| SeedError::UnknownAuthor {
                title: novel.title.clone(),
                author: novel.author.clone(),
            })?;
        authors.insert(novel.author.clone(), user);
    }

    if replace {
        novels.replace_all(&[]).await?;
        let threads = store.delete_prefix(keys::CHAPTER_COMMENTS_PREFIX).await?;
        tracing::warn!(threads, "Removed existing novels and their comment threads");
    }

    let mut chapters = 0;
    for seed in file.novels {
        let Some(author) = authors.get(&seed.author) else {
            continue;
        };
        let created = novels.create(author.id, &author.name, seed.draft()).await?;
        chapters += seed.chapters.len();

        let status = if seed.published {
            NovelStatus::Published
        } else {
            NovelStatus::Draft
        };
        novels
            .modify(created.id, |novel| {
                for chapter in seed.chapters {
                    novel.push_chapter(chapter);
                }
                novel.status = status;
                novel.views = seed.views;
                Ok::<_, RepositoryError>(())
            })
            .await?;
        tracing::info!(novel_id = %created.id, title = %created.title, "Seeded novel");
    }

    tracing::info!(chapters, "Seeding complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const VALID: &str = r"
novels:
  - title: The River King
    author: mira
    genres: [Fantasy, Adventure]
    synopsis: A ferryman inherits a kingdom nobody else can see.
    published: true
    views: 120
    chapters:
      - title: The Crossing
        content: The river was wider at night than it ever was by day.
  - title: Salt Letters
    author: vik
    genres: [Romance]
    synopsis: Two lighthouse keepers write to each other across a bay.
";

    #[test]
    fn test_parse_valid_file() {
        let file = parse(VALID).unwrap();
        assert_eq!(file.novels.len(), 2);
        assert!(file.novels[0].published);
        assert_eq!(file.novels[0].chapters.len(), 1);
        assert!(!file.novels[1].published);
        assert_eq!(file.novels[1].views, 0);
    }

    #[test]
    fn test_parse_rejects_invalid_novel() {
        let yaml = r"
novels:
  - title: ''
    author: mira
    genres: [Fantasy]
    synopsis: A ferryman inherits a kingdom nobody else can see.
";
        let err = parse(yaml).unwrap_err();
        assert!(matches!(err, SeedError::Invalid { index: 1, .. }));
    }

    #[test]
    fn test_parse_rejects_short_chapter() {
        let yaml = r"
novels:
  - title: The River King
    author: mira
    genres: [Fantasy]
    synopsis: A ferryman inherits a kingdom nobody else can see.
    chapters:
      - title: One
        content: Too short.
";
        assert!(matches!(parse(yaml), Err(SeedError::Invalid { .. })));
    }

    #[test]
    fn test_empty_file_has_no_novels() {
        assert!(parse("novels: []").unwrap().novels.is_empty());
    }
}
