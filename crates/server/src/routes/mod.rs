//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Store readiness
//!
//! # Auth (rate limited)
//! POST /api/auth/sign-up            - Create account, start session
//! POST /api/auth/sign-in            - Start session
//! POST /api/auth/sign-out           - End session
//! GET  /api/auth/me                 - Current profile
//!
//! # Novels
//! GET  /api/home                    - Home sections
//! GET  /api/novels                  - Discover (?q=&genre=&sort=)
//! POST /api/novels                  - Create draft
//! GET  /api/novels/trending         - Top novels by views
//! GET  /api/novels/mine             - Own novels, drafts included
//! GET  /api/novels/{id}             - Detail
//! PUT  /api/novels/{id}             - Update (author)
//! DELETE /api/novels/{id}           - Delete (author)
//! POST /api/novels/{id}/publish     - Publish (author)
//! POST /api/novels/{id}/unpublish   - Back to draft (author)
//! POST /api/novels/{id}/rating      - Rate 1-5
//! POST /api/novels/{id}/cover       - Multipart cover upload (author)
//!
//! # Chapters and chapter comments
//! POST /api/novels/{id}/chapters
//! GET|PUT|DELETE /api/novels/{id}/chapters/{chapter_id}
//! GET|POST /api/novels/{id}/chapters/{chapter_id}/comments
//! DELETE /api/novels/{id}/chapters/{chapter_id}/comments/{comment_id}
//! POST /api/novels/{id}/chapters/{chapter_id}/comments/{comment_id}/like
//!
//! # Community feed
//! GET|POST /api/posts
//! DELETE /api/posts/{id}
//! POST /api/posts/{id}/like
//! POST /api/posts/{id}/comments
//! DELETE /api/posts/{id}/comments/{comment_id}
//! POST /api/posts/{id}/comments/{comment_id}/like
//!
//! # Library and follows (requires auth)
//! GET  /api/library
//! PUT|DELETE /api/library/{novel_id}
//! GET  /api/following
//! PUT|DELETE /api/following/{user_id}
//!
//! # Profiles
//! GET  /api/users/{username}
//! PUT  /api/profile
//!
//! # Writing assistant (requires auth, rate limited)
//! POST /api/ai/story-ideas
//! POST /api/ai/improve-draft
//! POST /api/ai/titles
//! POST /api/ai/chat
//!
//! # Admin (requires admin)
//! GET  /api/admin/stats
//! GET  /api/admin/users
//! POST /api/admin/users/{id}/active
//! GET  /api/admin/novels
//! DELETE /api/admin/novels/{id}
//! GET|DELETE /api/admin/comments
//! GET|PUT /api/admin/layout
//! ```

pub mod admin;
pub mod ai;
pub mod auth;
pub mod chapters;
pub mod comments;
pub mod library;
pub mod novels;
pub mod posts;
pub mod profiles;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post, put},
};

use crate::middleware::rate_limit::RateLimiterLayer;
use crate::middleware::{ai_rate_limiter, auth_rate_limiter};
use crate::services::uploads::MAX_COVER_BYTES;
use crate::state::AppState;

/// Slack on top of the cover limit for multipart framing.
const COVER_BODY_LIMIT: usize = MAX_COVER_BYTES + 1024 * 1024;

fn limited(router: Router<AppState>, limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    match limiter {
        Some(layer) => router.layer(layer),
        None => router,
    }
}

/// Create the auth routes router.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/sign-up", post(auth::sign_up))
        .route("/sign-in", post(auth::sign_in))
        .route("/sign-out", post(auth::sign_out));
    limited(router, rate_limit.then(auth_rate_limiter))
        // Not limited: polled by the client on every page load
        .route("/me", get(auth::me))
}

/// Create the novel, chapter and chapter comment routes router.
pub fn novel_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(novels::index).post(novels::create))
        .route("/trending", get(novels::trending_novels))
        .route("/mine", get(novels::mine))
        .route(
            "/{id}",
            get(novels::show).put(novels::update).delete(novels::delete),
        )
        .route("/{id}/publish", post(novels::publish))
        .route("/{id}/unpublish", post(novels::unpublish))
        .route("/{id}/rating", post(novels::rate))
        .route(
            "/{id}/cover",
            post(novels::upload_cover).layer(DefaultBodyLimit::max(COVER_BODY_LIMIT)),
        )
        .route("/{id}/chapters", post(chapters::create))
        .route(
            "/{id}/chapters/{chapter_id}",
            get(chapters::read)
                .put(chapters::update)
                .delete(chapters::delete),
        )
        .route(
            "/{id}/chapters/{chapter_id}/comments",
            get(comments::index).post(comments::create),
        )
        .route(
            "/{id}/chapters/{chapter_id}/comments/{comment_id}",
            axum::routing::delete(comments::delete),
        )
        .route(
            "/{id}/chapters/{chapter_id}/comments/{comment_id}/like",
            post(comments::like),
        )
}

/// Create the community feed routes router.
pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(posts::index).post(posts::create))
        .route("/{id}", axum::routing::delete(posts::delete))
        .route("/{id}/like", post(posts::like))
        .route("/{id}/comments", post(posts::create_comment))
        .route(
            "/{id}/comments/{comment_id}",
            axum::routing::delete(posts::delete_comment),
        )
        .route("/{id}/comments/{comment_id}/like", post(posts::like_comment))
}

/// Create the writing assistant routes router.
pub fn ai_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/story-ideas", post(ai::story_ideas))
        .route("/improve-draft", post(ai::improve_draft))
        .route("/titles", post(ai::titles))
        .route("/chat", post(ai::chat));
    limited(router, rate_limit.then(ai_rate_limiter))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(admin::stats))
        .route("/users", get(admin::users))
        .route("/users/{id}/active", post(admin::set_active))
        .route("/novels", get(admin::novels))
        .route("/novels/{id}", axum::routing::delete(admin::delete_novel))
        .route(
            "/comments",
            get(admin::comments).delete(admin::delete_comment),
        )
        .route("/layout", get(admin::layout).put(admin::update_layout))
}

/// Create all API routes.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let api = Router::new()
        .route("/home", get(novels::home))
        .nest("/auth", auth_routes(rate_limit))
        .nest("/novels", novel_routes())
        .nest("/posts", post_routes())
        .route("/library", get(library::index))
        .route(
            "/library/{novel_id}",
            put(library::save).delete(library::unsave),
        )
        .route("/following", get(library::following))
        .route(
            "/following/{user_id}",
            put(library::follow).delete(library::unfollow),
        )
        .route("/users/{username}", get(profiles::show))
        .route("/profile", put(profiles::update))
        .nest("/ai", ai_routes(rate_limit))
        .nest("/admin", admin_routes());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
