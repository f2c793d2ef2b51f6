//! Authentication and account endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, patch, post, put},
};
use chrono::{DateTime, FixedOffset};
use scribe_common::AppResult;
use scribe_core::{LoginInput, RegisterInput, UpdatePasswordInput, UpdateUserInput};
use scribe_db::entities::user;
use serde::Serialize;

use crate::{
    extractors::{AdminUser, AuthUser},
    middleware::AppState,
    response::{ApiResponse, Message},
};

/// Public view of a user.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            is_admin: u.is_admin,
            created_at: u.created_at,
        }
    }
}

/// Register / login response.
#[derive(Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Create an account.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.user_service.register(input).await?;

    Ok(ApiResponse::created(SessionResponse {
        user: session.user.into(),
        token: session.token,
    }))
}

/// Sign in with email and password.
async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.user_service.login(input).await?;

    Ok(ApiResponse::ok(SessionResponse {
        user: session.user.into(),
        token: session.token,
    }))
}

/// List all users.
async fn list_users(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state.user_service.list_users().await?;
    Ok(ApiResponse::ok(users.into_iter().map(Into::into).collect()))
}

/// Update another user's profile or admin flag.
async fn update_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let updated = state.user_service.update_user(&user_id, input).await?;
    tracing::info!(admin_id = %admin.id, user_id = %user_id, "Admin updated user");
    Ok(ApiResponse::ok(updated.into()))
}

/// Delete a user.
async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Message>> {
    state.user_service.delete_user(&user_id).await?;
    tracing::info!(admin_id = %admin.id, user_id = %user_id, "Admin deleted user");
    Ok(ApiResponse::ok(Message::new("User deleted successfully")))
}

/// Change the caller's password.
async fn update_password(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdatePasswordInput>,
) -> AppResult<ApiResponse<Message>> {
    state.user_service.update_password(&user, input).await?;
    Ok(ApiResponse::ok(Message::new("Password updated successfully")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/users", get(list_users))
        .route("/update/{user_id}", put(update_user))
        .route("/delete/{user_id}", delete(delete_user))
        .route("/updateUserPassword", patch(update_password))
}
