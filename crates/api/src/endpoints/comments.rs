//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use chrono::{DateTime, FixedOffset};
use scribe_common::AppResult;
use scribe_core::{CommentInput, CommentWithAuthor, CommentWithBlog};
use scribe_db::entities::comment;
use serde::Serialize;

use super::blogs::AuthorResponse;
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Comment response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub user_id: String,
    pub blog_id: String,
    pub comment: String,
    pub total_votes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog_title: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<comment::Model> for CommentResponse {
    fn from(c: comment::Model) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            blog_id: c.blog_id,
            comment: c.comment,
            total_votes: c.total_votes,
            author: None,
            blog_title: None,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl From<CommentWithAuthor> for CommentResponse {
    fn from(c: CommentWithAuthor) -> Self {
        Self {
            author: c.author.map(Into::into),
            ..c.comment.into()
        }
    }
}

impl From<CommentWithBlog> for CommentResponse {
    fn from(c: CommentWithBlog) -> Self {
        Self {
            blog_title: c.blog_title,
            ..c.comment.into()
        }
    }
}

/// Comments on a post.
async fn list_for_blog(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(blog_id): Path<String>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let comments = state.comment_service.list_for_blog(&blog_id).await?;
    Ok(ApiResponse::ok(comments.into_iter().map(Into::into).collect()))
}

/// The caller's own comments.
async fn list_mine(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let comments = state.comment_service.list_for_user(&user.id).await?;
    Ok(ApiResponse::ok(comments.into_iter().map(Into::into).collect()))
}

/// Comment on a post.
async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(blog_id): Path<String>,
    Json(input): Json<CommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state
        .comment_service
        .create(&user.id, &blog_id, input)
        .await?;
    Ok(ApiResponse::created(comment.into()))
}

/// Edit one's own comment.
async fn update_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((blog_id, comment_id)): Path<(String, String)>,
    Json(input): Json<CommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state
        .comment_service
        .update(&user.id, &blog_id, &comment_id, input)
        .await?;
    Ok(ApiResponse::ok(comment.into()))
}

/// Delete one's own comment.
async fn delete_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((blog_id, comment_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state
        .comment_service
        .delete(&user.id, &blog_id, &comment_id)
        .await?;
    Ok(ApiResponse::ok(comment.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user", get(list_mine))
        .route("/{blog_id}", get(list_for_blog).post(create_comment))
        .route(
            "/{blog_id}/{comment_id}",
            put(update_comment).delete(delete_comment),
        )
}
