//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use scribe_core::{BlogService, CommentService, MediaService, UserService, VoteService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub blog_service: BlogService,
    pub comment_service: CommentService,
    pub vote_service: VoteService,
    pub media_service: MediaService,
}

/// Why a request carries no authenticated user.
///
/// Set by [`auth_middleware`] and reported by the extractors when a route
/// requires a user.
#[derive(Debug, Clone)]
pub struct AuthFailure(pub String);

/// Authentication middleware.
///
/// Resolves a `Bearer` token to a user and stores it in the request
/// extensions. Requests without a valid token are passed through; routes
/// that need a user reject them in the extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .map(ToString::to_string);

    match token {
        Some(token) if !token.is_empty() => {
            match state.user_service.authenticate_by_token(&token).await {
                Ok(user) => {
                    req.extensions_mut().insert(user);
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Rejected bearer token");
                    req.extensions_mut().insert(AuthFailure(
                        "Authentication Invalid, token failed".to_string(),
                    ));
                }
            }
        }
        _ => {
            req.extensions_mut().insert(AuthFailure(
                "Authentication Invalid, missing header".to_string(),
            ));
        }
    }

    next.run(req).await
}
