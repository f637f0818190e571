//! Home page layout.
//!
//! Admins choose which genre sections the home page shows and whether a
//! catch-all "All stories" section follows them. Trending always comes first.

use serde::{Deserialize, Serialize};

use crate::novel::{self, Novel, TRENDING_COUNT};
use crate::validation::{ValidationErrors, Validator, normalize_genres};

/// Persisted home page configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeLayoutConfig {
    /// Genre sections in display order.
    pub genres: Vec<String>,
    /// Show the catch-all section after the genre sections.
    pub show_all_section: bool,
}

impl Default for HomeLayoutConfig {
    fn default() -> Self {
        Self {
            genres: vec!["Fantasy".to_owned(), "Romance".to_owned(), "Mystery".to_owned()],
            show_all_section: true,
        }
    }
}

impl HomeLayoutConfig {
    /// Check and normalize the genre list (duplicates collapse, first wins).
    ///
    /// # Errors
    ///
    /// Returns a `genres` failure if any entry is too long or there are too
    /// many sections.
    pub fn normalized(self) -> Result<Self, ValidationErrors> {
        let genres = normalize_genres(&self.genres);
        let mut v = Validator::new();
        if !genres.is_empty() {
            v.genres("genres", &genres);
        }
        v.finish()?;
        Ok(Self {
            genres,
            show_all_section: self.show_all_section,
        })
    }
}

/// Kind of home page section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Trending,
    Genre,
    All,
}

/// One section of the home page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeSection<'a> {
    pub kind: SectionKind,
    /// Set for genre sections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    pub title: String,
    pub novels: Vec<&'a Novel>,
}

/// Build the home page sections for `config`.
///
/// Genre sections appear in config order and are kept even when empty.
#[must_use]
pub fn home_sections<'a>(novels: &'a [Novel], config: &HomeLayoutConfig) -> Vec<HomeSection<'a>> {
    let mut sections = vec![HomeSection {
        kind: SectionKind::Trending,
        genre: None,
        title: "Trending".to_owned(),
        novels: novel::trending(novels, TRENDING_COUNT),
    }];

    for genre in normalize_genres(&config.genres) {
        let in_genre = novels
            .iter()
            .filter(|n| n.is_published() && n.has_genre(&genre))
            .collect();
        sections.push(HomeSection {
            kind: SectionKind::Genre,
            title: genre.clone(),
            genre: Some(genre),
            novels: in_genre,
        });
    }

    if config.show_all_section {
        let mut all: Vec<&Novel> = novels.iter().filter(|n| n.is_published()).collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sections.push(HomeSection {
            kind: SectionKind::All,
            genre: None,
            title: "All stories".to_owned(),
            novels: all,
        });
    }

    sections
}
