//! Blog post endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::{DateTime, FixedOffset};
use scribe_common::AppResult;
use scribe_core::{CreatePostInput, PostDeleteOutcome, PostWithAuthor, UpdatePostInput};
use scribe_db::entities::{blog_post, user};
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Author summary embedded in posts and comments.
#[derive(Serialize)]
pub struct AuthorResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<user::Model> for AuthorResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
        }
    }
}

/// Blog post response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorResponse>,
    pub title: String,
    pub content: String,
    pub avatar: String,
    pub images: Vec<String>,
    pub total_votes: i64,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl PostResponse {
    fn new(post: blog_post::Model, author: Option<user::Model>) -> Self {
        Self {
            images: post.image_urls(),
            id: post.id,
            user_id: post.user_id,
            author: author.map(Into::into),
            title: post.title,
            content: post.content,
            avatar: post.avatar,
            total_votes: post.total_votes,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

impl From<blog_post::Model> for PostResponse {
    fn from(post: blog_post::Model) -> Self {
        Self::new(post, None)
    }
}

impl From<PostWithAuthor> for PostResponse {
    fn from(p: PostWithAuthor) -> Self {
        Self::new(p.post, p.author)
    }
}

/// Response to deleting a post.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePostResponse {
    pub msg: String,
    #[serde(flatten)]
    pub removed: PostDeleteOutcome,
}

/// List every post, oldest first.
async fn list_posts(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let posts = state.blog_service.list().await?;
    Ok(ApiResponse::ok(posts.into_iter().map(Into::into).collect()))
}

/// Create a post.
async fn create_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state.blog_service.create(&user.id, input).await?;
    Ok(ApiResponse::created(post.into()))
}

/// Get a single post.
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state.blog_service.get(&id).await?;
    Ok(ApiResponse::ok(post.into()))
}

/// Update one's own post.
async fn update_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePostInput>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state.blog_service.update(&id, &user.id, input).await?;
    Ok(ApiResponse::ok(post.into()))
}

/// Delete one's own post with its comments and votes.
async fn delete_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<DeletePostResponse>> {
    let removed = state.blog_service.delete(&id, &user.id).await?;
    Ok(ApiResponse::ok(DeletePostResponse {
        msg: "Blog post deleted".to_string(),
        removed,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/{id}", get(get_post).patch(update_post).delete(delete_post))
}
