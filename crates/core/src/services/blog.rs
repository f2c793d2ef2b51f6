//! Blog post service.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use scribe_common::{AppError, AppResult, IdGenerator};
use scribe_db::{
    entities::{blog_post, user},
    repositories::{BlogPostRepository, CommentRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::media::MediaService;
use crate::services::vote::VoteService;

/// Input for creating a post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostInput {
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    #[validate(length(min = 1, max = 1000))]
    pub content: String,

    #[validate(length(min = 1, max = 2048))]
    pub avatar: Option<String>,

    #[validate(length(max = 3))]
    #[serde(default)]
    pub images: Vec<String>,
}

/// Input for updating a post. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePostInput {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 1000))]
    pub content: Option<String>,

    #[validate(length(min = 1, max = 2048))]
    pub avatar: Option<String>,

    #[validate(length(max = 3))]
    pub images: Option<Vec<String>>,
}

/// A post together with its author, when the author still exists.
#[derive(Debug, Clone)]
pub struct PostWithAuthor {
    pub post: blog_post::Model,
    pub author: Option<user::Model>,
}

/// What deleting a post removed besides the post itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDeleteOutcome {
    pub deleted_comments: u64,
    pub deleted_votes: u64,
}

/// Blog post service.
#[derive(Clone)]
pub struct BlogService {
    post_repo: BlogPostRepository,
    comment_repo: CommentRepository,
    user_repo: UserRepository,
    votes: VoteService,
    media: MediaService,
    id_gen: IdGenerator,
}

impl BlogService {
    /// Create a new blog service.
    #[must_use]
    pub const fn new(
        post_repo: BlogPostRepository,
        comment_repo: CommentRepository,
        user_repo: UserRepository,
        votes: VoteService,
        media: MediaService,
    ) -> Self {
        Self {
            post_repo,
            comment_repo,
            user_repo,
            votes,
            media,
            id_gen: IdGenerator::new(),
        }
    }

    /// List every post, oldest first, with its author.
    pub async fn list(&self) -> AppResult<Vec<PostWithAuthor>> {
        let posts = self.post_repo.find_all().await?;

        let author_ids: Vec<String> = posts
            .iter()
            .map(|p| p.user_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(posts
            .into_iter()
            .map(|post| {
                let author = authors.get(&post.user_id).cloned();
                PostWithAuthor { post, author }
            })
            .collect())
    }

    /// Get a post by ID.
    pub async fn get(&self, id: &str) -> AppResult<blog_post::Model> {
        self.post_repo.get_by_id(id).await
    }

    /// Create a post authored by `user_id`.
    pub async fn create(&self, user_id: &str, input: CreatePostInput) -> AppResult<blog_post::Model> {
        input.validate()?;

        let now = Utc::now();
        let avatar = input
            .avatar
            .unwrap_or_else(|| blog_post::DEFAULT_AVATAR.to_string());

        let model = blog_post::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            title: Set(input.title.trim().to_string()),
            content: Set(input.content),
            avatar: Set(avatar),
            images: Set(serde_json::json!(input.images)),
            total_votes: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let post = self.post_repo.create(model).await?;
        tracing::info!(post_id = %post.id, user_id = %user_id, "Created blog post");
        Ok(post)
    }

    /// Update a post. Only its author may do so.
    ///
    /// Images dropped by the update are removed from storage afterwards.
    pub async fn update(
        &self,
        id: &str,
        user_id: &str,
        input: UpdatePostInput,
    ) -> AppResult<blog_post::Model> {
        input.validate()?;

        let post = self.post_repo.get_by_id(id).await?;
        if post.user_id != user_id {
            return Err(AppError::Forbidden(
                "Cannot update other user's blog post".to_string(),
            ));
        }

        let old_avatar = post.avatar.clone();
        let old_images = post.image_urls();

        let mut active: blog_post::ActiveModel = post.into();

        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        if let Some(ref avatar) = input.avatar {
            active.avatar = Set(avatar.clone());
        }
        if let Some(ref images) = input.images {
            active.images = Set(serde_json::json!(images));
        }
        active.updated_at = Set(Utc::now().into());

        let updated = self.post_repo.update(active).await?;

        let mut dropped = Vec::new();
        if updated.avatar != old_avatar {
            dropped.push(old_avatar);
        }
        if input.images.is_some() {
            let kept = updated.image_urls();
            dropped.extend(old_images.into_iter().filter(|url| !kept.contains(url)));
        }
        self.remove_images(&updated.id, &updated.user_id, dropped).await;

        Ok(updated)
    }

    /// Delete a post with its comments and every vote on either.
    pub async fn delete(&self, id: &str, user_id: &str) -> AppResult<PostDeleteOutcome> {
        let post = self.post_repo.get_by_id(id).await?;
        if post.user_id != user_id {
            return Err(AppError::Forbidden(
                "Cannot delete other user's blog post".to_string(),
            ));
        }

        let comment_votes = self.votes.cascade_delete_for_post_comments(id).await?;
        let post_votes = self
            .votes
            .cascade_delete_for_targets(&[id.to_string()])
            .await?;
        let deleted_comments = self.comment_repo.delete_by_blog(id).await?;

        if !self.post_repo.delete(id).await? {
            return Err(AppError::PostNotFound(id.to_string()));
        }

        let mut images = post.image_urls();
        images.push(post.avatar.clone());
        self.remove_images(id, &post.user_id, images).await;

        let outcome = PostDeleteOutcome {
            deleted_comments,
            deleted_votes: comment_votes.deleted_count + post_votes.deleted_count,
        };

        tracing::info!(
            post_id = %id,
            deleted_comments = outcome.deleted_comments,
            deleted_votes = outcome.deleted_votes,
            "Deleted blog post"
        );

        Ok(outcome)
    }

    /// Best-effort removal of stored images the author uploaded.
    /// Failures are logged, never returned.
    async fn remove_images(&self, post_id: &str, author_id: &str, urls: Vec<String>) {
        for url in urls {
            if url == blog_post::DEFAULT_AVATAR {
                continue;
            }
            if let Err(e) = self.media.delete_by_url(&url, author_id).await {
                tracing::warn!(error = %e, post_id = %post_id, url = %url, "Failed to remove image");
            }
        }
    }
}
