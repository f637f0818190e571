//! Writing assistant endpoints. All require a signed-in user.

use axum::{Json, extract::State};

use crate::ai::flows::{
    ChatInput, ChatReply, ImproveDraftInput, ImprovedDraft, StoryIdeas, StoryIdeasInput, Titles,
    TitlesInput,
};
use crate::ai::Flow;
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// POST /api/ai/story-ideas
///
/// # Errors
///
/// Returns `AppError::Validation` for bad input, 503 without a provider and
/// 502 when the provider fails.
pub async fn story_ideas(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Json(input): Json<StoryIdeasInput>,
) -> Result<Json<StoryIdeas>, AppError> {
    input.validate()?;
    Ok(Json(state.ai().run(&input).await?))
}

/// POST /api/ai/improve-draft
///
/// # Errors
///
/// Same as [`story_ideas`].
pub async fn improve_draft(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Json(input): Json<ImproveDraftInput>,
) -> Result<Json<ImprovedDraft>, AppError> {
    input.validate()?;
    Ok(Json(state.ai().run(&input).await?))
}

/// POST /api/ai/titles
///
/// # Errors
///
/// Same as [`story_ideas`].
pub async fn titles(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Json(input): Json<TitlesInput>,
) -> Result<Json<Titles>, AppError> {
    input.validate()?;
    Ok(Json(state.ai().run(&input).await?))
}

/// Persona chat. Provider failures come back as a canned reply, not an error.
///
/// POST /api/ai/chat
///
/// # Errors
///
/// Returns `AppError::Validation` for an empty message.
pub async fn chat(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Json(input): Json<ChatInput>,
) -> Result<Json<ChatReply>, AppError> {
    input.validate()?;
    Ok(Json(state.ai().chat(&input).await))
}
