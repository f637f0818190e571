//! Session middleware configuration.
//!
//! Sessions live in process memory; signing in again after a restart is
//! acceptable for this service.

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::KathaConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "katha_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer.
#[must_use]
pub fn create_session_layer(config: &KathaConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
