//! Vote ledger service.
//!
//! Keeps one signed vote per (user, target) pair and the target's
//! `total_votes` counter equal to the sum of those votes. The vote row and the
//! counter are written in two steps; counters only ever move by atomic
//! increments and vote rows only change through keyed compare-and-swap, so a
//! concurrent request on the same pair is detected and the decision re-made.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use scribe_common::{AppError, AppResult, IdGenerator};
use scribe_db::{
    entities::{user, vote, vote::TargetKind},
    repositories::{BlogPostRepository, CommentRepository, VoteRepository},
};
use sea_orm::Set;
use serde::Serialize;

/// Rounds a single operation may lose to concurrent writers before giving up.
const MAX_ROUNDS: u32 = 3;

/// A signed vote value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteValue {
    /// -1
    Down,
    /// 0
    Neutral,
    /// +1
    Up,
}

impl VoteValue {
    /// Stored representation.
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::Down => -1,
            Self::Neutral => 0,
            Self::Up => 1,
        }
    }

    /// Contribution of this value to a target's total.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        i64::from(self.as_i16())
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Down),
            0 => Ok(Self::Neutral),
            1 => Ok(Self::Up),
            other => Err(AppError::InvalidInput(format!(
                "vote must be -1, 0 or 1, got {other}"
            ))),
        }
    }
}

impl FromStr for VoteValue {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed: i64 = s.trim().parse().map_err(|_| {
            AppError::InvalidInput(format!("vote must be -1, 0 or 1, got {s:?}"))
        })?;
        Self::try_from(parsed)
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i16())
    }
}

/// Identity of an already-authenticated caller.
///
/// Only constructible from a loaded user record, so the ledger never sees a
/// bare, unverified user ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voter {
    user_id: String,
}

impl Voter {
    /// ID of the voting user.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl From<&user::Model> for Voter {
    fn from(user: &user::Model) -> Self {
        Self {
            user_id: user.id.clone(),
        }
    }
}

/// What a cast-or-change did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CastStatus {
    /// First vote by this user on the target.
    Created,
    /// Same value as the stored vote; nothing changed.
    Duplicate,
    /// Stored vote changed to a different value.
    Updated,
}

/// Result of [`VoteService::cast_or_change`].
#[derive(Debug, Clone)]
pub struct CastOutcome {
    pub status: CastStatus,
    /// The target's total after the operation.
    pub total_votes: i64,
    /// The vote as now stored.
    pub vote: vote::Model,
}

/// What a retract did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetractStatus {
    /// The user's vote was deleted.
    Removed,
    /// The user had no vote on the target.
    NothingToRemove,
}

/// Result of [`VoteService::retract`].
#[derive(Debug, Clone)]
pub struct RetractOutcome {
    pub status: RetractStatus,
    /// The target's total after removal; `None` when nothing was removed.
    pub total_votes: Option<i64>,
    /// The removed vote.
    pub vote: Option<vote::Model>,
}

/// Result of [`VoteService::cascade_delete_for_targets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeOutcome {
    pub deleted_count: u64,
}

/// Vote ledger service.
#[derive(Clone)]
pub struct VoteService {
    vote_repo: VoteRepository,
    post_repo: BlogPostRepository,
    comment_repo: CommentRepository,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(
        vote_repo: VoteRepository,
        post_repo: BlogPostRepository,
        comment_repo: CommentRepository,
    ) -> Self {
        Self {
            vote_repo,
            post_repo,
            comment_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Cast a vote on a target, or change the caller's existing vote.
    ///
    /// `value` is validated before anything is read or written.
    pub async fn cast_or_change(
        &self,
        voter: &Voter,
        kind: TargetKind,
        target_id: &str,
        value: i64,
    ) -> AppResult<CastOutcome> {
        let value = VoteValue::try_from(value)?;
        let current_total = self.current_total(kind, target_id).await?;

        for round in 1..=MAX_ROUNDS {
            let existing = self
                .vote_repo
                .find_by_user_and_target(voter.user_id(), target_id)
                .await?;

            match existing {
                None => {
                    let now = Utc::now();
                    let model = vote::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        user_id: Set(voter.user_id().to_string()),
                        target_id: Set(target_id.to_string()),
                        target_kind: Set(kind),
                        value: Set(value.as_i16()),
                        created_at: Set(now.into()),
                        updated_at: Set(now.into()),
                    };

                    match self.vote_repo.create(model).await {
                        Ok(vote) => {
                            let total_votes =
                                self.adjust_total(kind, target_id, value.as_i64()).await?;
                            tracing::debug!(
                                user_id = %voter.user_id(),
                                target_id = %target_id,
                                value = %value,
                                total_votes,
                                "Vote created"
                            );
                            return Ok(CastOutcome {
                                status: CastStatus::Created,
                                total_votes,
                                vote,
                            });
                        }
                        Err(AppError::Conflict(_)) => {
                            tracing::warn!(
                                user_id = %voter.user_id(),
                                target_id = %target_id,
                                round,
                                "Concurrent first vote, retrying"
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }
                Some(existing) if existing.value == value.as_i16() => {
                    tracing::debug!(
                        user_id = %voter.user_id(),
                        target_id = %target_id,
                        value = %value,
                        "Duplicate vote ignored"
                    );
                    let total_votes = if round == 1 {
                        current_total
                    } else {
                        self.current_total(kind, target_id).await?
                    };
                    return Ok(CastOutcome {
                        status: CastStatus::Duplicate,
                        total_votes,
                        vote: existing,
                    });
                }
                Some(existing) => {
                    let updated_at = Utc::now().into();
                    let swapped = self
                        .vote_repo
                        .compare_and_set_value(
                            &existing.id,
                            existing.value,
                            value.as_i16(),
                            updated_at,
                        )
                        .await?;

                    if swapped {
                        let delta = value.as_i64() - i64::from(existing.value);
                        let total_votes = self.adjust_total(kind, target_id, delta).await?;
                        tracing::debug!(
                            user_id = %voter.user_id(),
                            target_id = %target_id,
                            from = existing.value,
                            to = %value,
                            total_votes,
                            "Vote changed"
                        );
                        return Ok(CastOutcome {
                            status: CastStatus::Updated,
                            total_votes,
                            vote: vote::Model {
                                value: value.as_i16(),
                                updated_at,
                                ..existing
                            },
                        });
                    }

                    tracing::warn!(
                        user_id = %voter.user_id(),
                        target_id = %target_id,
                        round,
                        "Vote changed concurrently, retrying"
                    );
                }
            }
        }

        Err(AppError::Conflict(format!(
            "vote on {target_id} kept changing concurrently"
        )))
    }

    /// Remove the caller's vote on a target.
    ///
    /// Having no vote to remove is a successful no-op.
    pub async fn retract(
        &self,
        voter: &Voter,
        kind: TargetKind,
        target_id: &str,
    ) -> AppResult<RetractOutcome> {
        self.current_total(kind, target_id).await?;

        for round in 1..=MAX_ROUNDS {
            let Some(existing) = self
                .vote_repo
                .find_by_user_and_target(voter.user_id(), target_id)
                .await?
            else {
                return Ok(RetractOutcome {
                    status: RetractStatus::NothingToRemove,
                    total_votes: None,
                    vote: None,
                });
            };

            if self
                .vote_repo
                .delete_if_value(&existing.id, existing.value)
                .await?
            {
                let total_votes = self
                    .adjust_total(kind, target_id, -i64::from(existing.value))
                    .await?;
                tracing::debug!(
                    user_id = %voter.user_id(),
                    target_id = %target_id,
                    value = existing.value,
                    total_votes,
                    "Vote removed"
                );
                return Ok(RetractOutcome {
                    status: RetractStatus::Removed,
                    total_votes: Some(total_votes),
                    vote: Some(existing),
                });
            }

            tracing::warn!(
                user_id = %voter.user_id(),
                target_id = %target_id,
                round,
                "Vote changed concurrently during retract, retrying"
            );
        }

        Err(AppError::Conflict(format!(
            "vote on {target_id} kept changing concurrently"
        )))
    }

    /// Every recorded vote.
    pub async fn list_all(&self) -> AppResult<Vec<vote::Model>> {
        self.vote_repo.find_all().await
    }

    /// Votes on any of the given targets.
    pub async fn list_for_targets(&self, target_ids: &[String]) -> AppResult<Vec<vote::Model>> {
        self.vote_repo.find_by_targets(target_ids).await
    }

    /// Delete every vote on the given targets.
    ///
    /// Totals are left untouched; callers use this when the targets themselves
    /// are going away.
    pub async fn cascade_delete_for_targets(
        &self,
        target_ids: &[String],
    ) -> AppResult<CascadeOutcome> {
        let deleted_count = self.vote_repo.delete_by_targets(target_ids).await?;
        tracing::debug!(
            targets = target_ids.len(),
            deleted_count,
            "Cascade-deleted votes"
        );
        Ok(CascadeOutcome { deleted_count })
    }

    /// Delete every vote on the comments of a blog post that is being deleted.
    pub async fn cascade_delete_for_post_comments(
        &self,
        blog_id: &str,
    ) -> AppResult<CascadeOutcome> {
        let comment_ids = self.comment_ids(blog_id).await?;
        self.cascade_delete_for_targets(&comment_ids).await
    }

    /// Withdraw every vote on the comments of a post the caller wrote.
    ///
    /// Unlike the cascade, the comments stay, so each removed vote is
    /// subtracted from its comment's total.
    pub async fn clear_comment_votes(
        &self,
        voter: &Voter,
        blog_id: &str,
    ) -> AppResult<CascadeOutcome> {
        let post = self.post_repo.get_by_id(blog_id).await?;
        if post.user_id != voter.user_id() {
            return Err(AppError::Forbidden(
                "Cannot clear votes on other user's blog post".to_string(),
            ));
        }

        let comment_ids = self.comment_ids(blog_id).await?;
        let mut deleted_count = 0;

        for vote in self.vote_repo.find_by_targets(&comment_ids).await? {
            // A vote changed or removed since the read belongs to that writer now.
            if !self.vote_repo.delete_if_value(&vote.id, vote.value).await? {
                continue;
            }
            deleted_count += 1;
            if vote.value != 0 {
                self.comment_repo
                    .add_to_total_votes(&vote.target_id, -i64::from(vote.value))
                    .await?;
            }
        }

        tracing::info!(
            user_id = %voter.user_id(),
            blog_id = %blog_id,
            deleted_count,
            "Cleared comment votes"
        );
        Ok(CascadeOutcome { deleted_count })
    }

    async fn comment_ids(&self, blog_id: &str) -> AppResult<Vec<String>> {
        Ok(self
            .comment_repo
            .find_by_blog(blog_id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect())
    }

    async fn current_total(&self, kind: TargetKind, target_id: &str) -> AppResult<i64> {
        match kind {
            TargetKind::Post => Ok(self.post_repo.get_by_id(target_id).await?.total_votes),
            TargetKind::Comment => Ok(self.comment_repo.get_by_id(target_id).await?.total_votes),
        }
    }

    /// Apply `delta` atomically and read back the resulting total.
    async fn adjust_total(&self, kind: TargetKind, target_id: &str, delta: i64) -> AppResult<i64> {
        if delta != 0 {
            let found = match kind {
                TargetKind::Post => self.post_repo.add_to_total_votes(target_id, delta).await?,
                TargetKind::Comment => {
                    self.comment_repo
                        .add_to_total_votes(target_id, delta)
                        .await?
                }
            };
            if !found {
                return Err(not_found(kind, target_id));
            }
        }
        self.current_total(kind, target_id).await
    }
}

fn not_found(kind: TargetKind, target_id: &str) -> AppError {
    match kind {
        TargetKind::Post => AppError::PostNotFound(target_id.to_string()),
        TargetKind::Comment => AppError::CommentNotFound(target_id.to_string()),
    }
}
