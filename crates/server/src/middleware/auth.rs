//! Authentication extractors.
//!
//! The session carries only a `CurrentUser`; each extractor loads the full
//! profile through the state's user cache. A deactivated account's session
//! is cleared the first time it is seen.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use katha_vault_core::User;

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in, active user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(user): RequireAuth) -> String {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub User);

/// Extractor that optionally gets the current user; deactivated accounts
/// are treated as anonymous.
pub struct OptionalAuth(pub Option<User>);

/// Extractor that requires a signed-in admin.
pub struct RequireAdmin(pub User);

enum Resolved {
    Anonymous,
    Active(User),
    Deactivated,
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Resolved, AppError> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(Resolved::Anonymous);
    };
    let Some(current) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?
    else {
        return Ok(Resolved::Anonymous);
    };

    match state.user(current.id).await? {
        Some(user) if user.active => Ok(Resolved::Active(user)),
        Some(user) => {
            tracing::info!(user_id = %user.id, "Rejected session of deactivated account");
            clear_current_user(session).await?;
            Ok(Resolved::Deactivated)
        }
        None => {
            clear_current_user(session).await?;
            Ok(Resolved::Anonymous)
        }
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await? {
            Resolved::Active(user) => {
                set_sentry_user(user.id.as_i32(), &user.username);
                Ok(Self(user))
            }
            Resolved::Deactivated => Err(AppError::Forbidden("account is deactivated".to_owned())),
            Resolved::Anonymous => Err(AppError::Unauthorized("sign in required".to_owned())),
        }
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await? {
            Resolved::Active(user) => Ok(Self(Some(user))),
            Resolved::Deactivated | Resolved::Anonymous => Ok(Self(None)),
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("admin access required".to_owned()));
        }
        Ok(Self(user))
    }
}

/// Start an authenticated session for `user`.
///
/// The session id is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &User,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(
            session_keys::CURRENT_USER,
            CurrentUser {
                id: user.id,
                email: user.email.clone(),
            },
        )
        .await
}

/// Clear the current user from the session (sign-out).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
