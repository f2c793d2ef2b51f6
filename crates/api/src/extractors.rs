//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use scribe_common::AppError;
use scribe_core::Voter;
use scribe_db::entities::user;

use crate::middleware::AuthFailure;

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl AuthUser {
    /// The user as a vote ledger identity.
    #[must_use]
    pub fn voter(&self) -> Voter {
        Voter::from(&self.0)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<user::Model>() {
            return Ok(Self(user.clone()));
        }

        let reason = parts.extensions.get::<AuthFailure>().map_or_else(
            || "Authentication Invalid".to_string(),
            |failure| failure.0.clone(),
        );
        Err(AppError::Unauthorized(reason))
    }
}

/// Authenticated administrator extractor.
#[derive(Debug, Clone)]
pub struct AdminUser(pub user::Model);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_admin {
            return Err(AppError::Forbidden("Not authorized as an admin".to_string()));
        }

        Ok(Self(user))
    }
}
