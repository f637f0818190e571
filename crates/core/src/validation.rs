//! Form field rules.
//!
//! Every user-submitted form is checked field by field and all failures are
//! reported together, keyed by field name. Lengths are counted in characters
//! after trimming surrounding whitespace.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Length limits for user-submitted fields, as `(min, max)` in characters.
pub mod limits {
    pub const NOVEL_TITLE: (usize, usize) = (2, 120);
    pub const SYNOPSIS: (usize, usize) = (10, 5000);
    pub const GENRE: (usize, usize) = (1, 40);
    pub const MAX_GENRES: usize = 8;
    pub const CHAPTER_TITLE: (usize, usize) = (1, 150);
    pub const CHAPTER_CONTENT: (usize, usize) = (20, 200_000);
    pub const COMMENT: (usize, usize) = (1, 2000);
    pub const POST: (usize, usize) = (1, 5000);
    pub const NAME: (usize, usize) = (2, 80);
    pub const USERNAME: (usize, usize) = (3, 30);
    pub const BIO: (usize, usize) = (0, 500);
    pub const PASSWORD: (usize, usize) = (8, 128);
    pub const RATING: (u8, u8) = (1, 5);
    pub const AI_THEME: (usize, usize) = (3, 500);
    pub const AI_DRAFT: (usize, usize) = (20, 20_000);
    pub const AI_DESCRIPTION: (usize, usize) = (10, 2000);
    pub const AI_CHAT_MESSAGE: (usize, usize) = (1, 2000);
}

/// Field-level validation failures for one form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    /// Field name to human-readable message. First failure per field wins.
    pub fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    /// Error for a single field.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.fields.insert(field.to_owned(), message.into());
        errors
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Message recorded for a field, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Collects failures while checking a form.
///
/// ```rust
/// use katha_vault_core::validation::{Validator, limits};
///
/// let mut v = Validator::new();
/// v.text("title", " ", limits::NOVEL_TITLE);
/// v.text("synopsis", "A long enough synopsis.", limits::SYNOPSIS);
/// let errors = v.finish().unwrap_err();
/// assert!(errors.get("title").is_some());
/// assert!(errors.get("synopsis").is_none());
/// ```
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure unless `ok` holds.
    pub fn check(&mut self, field: &str, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors
                .fields
                .entry(field.to_owned())
                .or_insert_with(|| message.into());
        }
        self
    }

    /// Check a text field against `(min, max)` trimmed character bounds.
    pub fn text(&mut self, field: &str, value: &str, (min, max): (usize, usize)) -> &mut Self {
        let len = value.trim().chars().count();
        if len == 0 && min > 0 {
            return self.check(field, false, "is required");
        }
        self.check(field, len >= min, format!("must be at least {min} characters"))
            .check(field, len <= max, format!("must be at most {max} characters"))
    }

    /// Check an optional text field; absent or blank values pass.
    pub fn optional_text(
        &mut self,
        field: &str,
        value: Option<&str>,
        bounds: (usize, usize),
    ) -> &mut Self {
        match value {
            Some(v) if !v.trim().is_empty() => self.text(field, v, bounds),
            _ => self,
        }
    }

    /// Check a genre list: at least one entry, each within bounds.
    pub fn genres(&mut self, field: &str, genres: &[String]) -> &mut Self {
        self.check(field, !genres.is_empty(), "pick at least one genre");
        self.check(
            field,
            genres.len() <= limits::MAX_GENRES,
            format!("at most {} genres", limits::MAX_GENRES),
        );
        for genre in genres {
            self.text(field, genre, limits::GENRE);
        }
        self
    }

    /// Check a username: length bounds and `[a-z0-9_]` only.
    pub fn username(&mut self, field: &str, value: &str) -> &mut Self {
        self.text(field, value, limits::USERNAME);
        let normalized = normalize_username(value);
        self.check(
            field,
            normalized
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
            "may only contain letters, digits and underscores",
        )
    }

    /// Finish validation.
    ///
    /// # Errors
    ///
    /// Returns every recorded failure if any check failed.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Canonical username form: trimmed and lower-cased.
#[must_use]
pub fn normalize_username(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Canonical genre list: trimmed, empty entries dropped, duplicates removed
/// case-insensitively keeping the first spelling.
#[must_use]
pub fn normalize_genres(genres: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for genre in genres {
        let trimmed = genre.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            out.push(trimmed.to_owned());
        }
    }
    out
}
