//! Vote endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use chrono::{DateTime, FixedOffset};
use scribe_common::{AppError, AppResult};
use scribe_core::{CastOutcome, CastStatus, RetractOutcome, RetractStatus, VoteValue};
use scribe_db::entities::vote::{self, TargetKind};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// A stored vote.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub id: String,
    pub user_id: String,
    pub target_id: String,
    pub target_kind: TargetKind,
    pub value: i16,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<vote::Model> for VoteResponse {
    fn from(v: vote::Model) -> Self {
        Self {
            id: v.id,
            user_id: v.user_id,
            target_id: v.target_id,
            target_kind: v.target_kind,
            value: v.value,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

/// `?vote=` query parameter.
#[derive(Debug, Deserialize)]
pub struct VoteQuery {
    pub vote: Option<String>,
}

impl VoteQuery {
    fn value(&self) -> AppResult<VoteValue> {
        self.vote
            .as_deref()
            .ok_or_else(|| AppError::InvalidInput("vote must be -1, 0 or 1".to_string()))?
            .parse()
    }
}

/// Result of casting or changing a vote.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastResponse {
    pub status: CastStatus,
    pub msg: &'static str,
    pub total_votes: i64,
    pub vote: VoteResponse,
}

impl From<CastOutcome> for CastResponse {
    fn from(outcome: CastOutcome) -> Self {
        let msg = match outcome.status {
            CastStatus::Created => "Vote Added",
            CastStatus::Duplicate => "Vote already exists",
            CastStatus::Updated => "Vote updated",
        };
        Self {
            status: outcome.status,
            msg,
            total_votes: outcome.total_votes,
            vote: outcome.vote.into(),
        }
    }
}

/// Result of retracting a vote.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetractResponse {
    pub status: RetractStatus,
    pub msg: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_votes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<VoteResponse>,
}

impl From<RetractOutcome> for RetractResponse {
    fn from(outcome: RetractOutcome) -> Self {
        let msg = match outcome.status {
            RetractStatus::Removed => "Vote deleted",
            RetractStatus::NothingToRemove => "Vote does not exist",
        };
        Self {
            status: outcome.status,
            msg,
            total_votes: outcome.total_votes,
            vote: outcome.vote.map(Into::into),
        }
    }
}

/// Result of removing every vote on a post's comments.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeResponse {
    pub msg: &'static str,
    pub deleted_count: u64,
}

/// Body of `POST /votes/targets`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetsRequest {
    pub target_ids: Vec<String>,
}

/// Every recorded vote.
async fn list_votes(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<VoteResponse>>> {
    let votes = state.vote_service.list_all().await?;
    Ok(ApiResponse::ok(votes.into_iter().map(Into::into).collect()))
}

/// Votes on the given targets.
async fn list_for_targets(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetsRequest>,
) -> AppResult<ApiResponse<Vec<VoteResponse>>> {
    let votes = state.vote_service.list_for_targets(&req.target_ids).await?;
    Ok(ApiResponse::ok(votes.into_iter().map(Into::into).collect()))
}

async fn cast(
    state: &AppState,
    auth: &AuthUser,
    kind: TargetKind,
    target_id: &str,
    query: &VoteQuery,
) -> AppResult<ApiResponse<CastResponse>> {
    let value = query.value()?;
    let outcome = state
        .vote_service
        .cast_or_change(&auth.voter(), kind, target_id, value.as_i64())
        .await?;

    Ok(match outcome.status {
        CastStatus::Created => ApiResponse::created(outcome.into()),
        CastStatus::Duplicate | CastStatus::Updated => ApiResponse::ok(outcome.into()),
    })
}

async fn retract(
    state: &AppState,
    auth: &AuthUser,
    kind: TargetKind,
    target_id: &str,
) -> AppResult<ApiResponse<RetractResponse>> {
    let outcome = state
        .vote_service
        .retract(&auth.voter(), kind, target_id)
        .await?;
    Ok(ApiResponse::ok(outcome.into()))
}

/// Vote on a post.
async fn cast_on_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(blog_id): Path<String>,
    Query(query): Query<VoteQuery>,
) -> AppResult<ApiResponse<CastResponse>> {
    cast(&state, &auth, TargetKind::Post, &blog_id, &query).await
}

/// Withdraw one's vote on a post.
async fn retract_on_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(blog_id): Path<String>,
) -> AppResult<ApiResponse<RetractResponse>> {
    retract(&state, &auth, TargetKind::Post, &blog_id).await
}

/// Vote on a comment.
async fn cast_on_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Query(query): Query<VoteQuery>,
) -> AppResult<ApiResponse<CastResponse>> {
    cast(&state, &auth, TargetKind::Comment, &comment_id, &query).await
}

/// Withdraw one's vote on a comment.
async fn retract_on_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
) -> AppResult<ApiResponse<RetractResponse>> {
    retract(&state, &auth, TargetKind::Comment, &comment_id).await
}

/// Remove every vote on the comments of one's own post.
async fn delete_comment_votes_for_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(blog_id): Path<String>,
) -> AppResult<ApiResponse<CascadeResponse>> {
    let outcome = state
        .vote_service
        .clear_comment_votes(&auth.voter(), &blog_id)
        .await?;

    Ok(ApiResponse::ok(CascadeResponse {
        msg: "All comment votes deleted",
        deleted_count: outcome.deleted_count,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_votes))
        .route("/targets", post(list_for_targets))
        .route("/blogId/{blog_id}", post(cast_on_post).delete(retract_on_post))
        .route(
            "/blogId/{blog_id}/comments",
            delete(delete_comment_votes_for_post),
        )
        .route(
            "/commentId/{comment_id}",
            post(cast_on_comment).delete(retract_on_comment),
        )
}
