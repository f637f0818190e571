//! User profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, UserId, UserRole};
use crate::validation::{ValidationErrors, Validator, limits, normalize_username};

/// A registered account's public and private profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Unique, lower-case handle.
    pub username: String,
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: String,
    /// Deactivated accounts cannot sign in.
    pub active: bool,
    pub email: Email,
    #[serde(default)]
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Profile fields visible to everyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicProfile {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub avatar: Option<String>,
    pub bio: String,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            bio: user.bio.clone(),
        }
    }
}

/// Editable profile fields. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    /// # Errors
    ///
    /// Returns every present field that violates its rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.text("name", name, limits::NAME);
        }
        if let Some(username) = &self.username {
            v.username("username", username);
        }
        if let Some(bio) = &self.bio {
            v.text("bio", bio, limits::BIO);
        }
        v.finish()
    }
}

impl User {
    /// Whether the account may use the admin panel.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Apply a validated profile update.
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = name.trim().to_owned();
        }
        if let Some(username) = update.username {
            self.username = normalize_username(&username);
        }
        if let Some(bio) = update.bio {
            self.bio = bio.trim().to_owned();
        }
        if let Some(avatar) = update.avatar {
            let avatar = avatar.trim();
            self.avatar = (!avatar.is_empty()).then(|| avatar.to_owned());
        }
    }
}
