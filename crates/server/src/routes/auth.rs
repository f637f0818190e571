//! Account route handlers: sign-up, sign-in, sign-out and the current
//! profile.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;

use katha_vault_core::User;

use crate::error::AppError;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::services::{AuthService, SignUp};
use crate::state::AppState;

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

/// Create an account and start a session.
///
/// POST /api/auth/sign-up
///
/// # Errors
///
/// Returns 422 for invalid fields and 409 if the email or username is taken.
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<SignUp>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = AuthService::new(state.store(), state.config())
        .register(form)
        .await?;
    set_current_user(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/sign-in
///
/// # Errors
///
/// Returns 401 for wrong credentials and 403 for deactivated accounts.
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<SignInForm>,
) -> Result<Json<User>, AppError> {
    let user = match AuthService::new(state.store(), state.config())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::info!(error = %e, "Sign-in rejected");
            return Err(e.into());
        }
    };
    set_current_user(&session, &user).await?;
    state.forget_user(user.id).await;
    tracing::info!(user_id = %user.id, "Signed in");
    Ok(Json(user))
}

/// POST /api/auth/sign-out
///
/// # Errors
///
/// Returns `AppError::Internal` if the session store fails.
pub async fn sign_out(session: Session) -> Result<StatusCode, AppError> {
    clear_current_user(&session).await?;
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
pub async fn me(RequireAuth(user): RequireAuth) -> Json<User> {
    Json(user)
}
