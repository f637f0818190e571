//! Session-related types.

use serde::{Deserialize, Serialize};

use katha_vault_core::{Email, UserId};

/// Session-stored user identity.
///
/// Only the id and email live in the session; the profile itself is loaded
/// (through the user cache) on every authenticated request so that
/// deactivation and role changes take effect immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";
}
