//! HTTP API layer for scribe.
//!
//! - **Endpoints**: auth, blog posts, comments, votes and image uploads
//! - **Extractors**: authenticated user and administrator
//! - **Middleware**: bearer token authentication
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::{Router, extract::DefaultBodyLimit};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

pub use endpoints::router;
pub use middleware::AppState;

/// Room for multipart framing and JSON bodies on top of the largest upload.
const BODY_LIMIT_HEADROOM: usize = 64 * 1024;

/// Build the application: the API under `/api/v1` with authentication,
/// tracing, CORS and a request body limit.
pub fn app(state: AppState) -> Router {
    let body_limit = state
        .media_service
        .max_upload_bytes()
        .saturating_add(BODY_LIMIT_HEADROOM);

    Router::new()
        .nest("/api/v1", router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
