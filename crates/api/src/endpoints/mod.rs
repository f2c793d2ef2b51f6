//! API endpoints.

mod auth;
mod blogs;
mod comments;
mod uploads;
mod votes;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/blogs", blogs::router())
        .nest("/comments", comments::router())
        .nest("/votes", votes::router())
        .nest("/uploads", uploads::router())
}
