//! Comment service.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use scribe_common::{AppError, AppResult, IdGenerator};
use scribe_db::{
    entities::{comment, user},
    repositories::{BlogPostRepository, CommentRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::vote::VoteService;

/// Input for creating or editing a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CommentInput {
    #[validate(length(min = 1, max = 1000))]
    pub comment: String,
}

/// A comment together with its author.
#[derive(Debug, Clone)]
pub struct CommentWithAuthor {
    pub comment: comment::Model,
    pub author: Option<user::Model>,
}

/// A comment together with the title of the post it belongs to.
#[derive(Debug, Clone)]
pub struct CommentWithBlog {
    pub comment: comment::Model,
    pub blog_title: Option<String>,
}

/// Comment service.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: BlogPostRepository,
    user_repo: UserRepository,
    votes: VoteService,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        post_repo: BlogPostRepository,
        user_repo: UserRepository,
        votes: VoteService,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            votes,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comments on a post, oldest first, with their authors.
    pub async fn list_for_blog(&self, blog_id: &str) -> AppResult<Vec<CommentWithAuthor>> {
        let comments = self.comment_repo.find_by_blog(blog_id).await?;

        let author_ids = distinct(comments.iter().map(|c| c.user_id.clone()));
        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = authors.get(&comment.user_id).cloned();
                CommentWithAuthor { comment, author }
            })
            .collect())
    }

    /// Comments written by a user, with the titles of their posts.
    pub async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<CommentWithBlog>> {
        let comments = self.comment_repo.find_by_user(user_id).await?;

        let blog_ids = distinct(comments.iter().map(|c| c.blog_id.clone()));
        let titles: HashMap<String, String> = self
            .post_repo
            .find_by_ids(&blog_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.title))
            .collect();

        Ok(comments
            .into_iter()
            .map(|comment| {
                let blog_title = titles.get(&comment.blog_id).cloned();
                CommentWithBlog {
                    comment,
                    blog_title,
                }
            })
            .collect())
    }

    /// Comment on a post.
    pub async fn create(
        &self,
        user_id: &str,
        blog_id: &str,
        input: CommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;

        self.post_repo.get_by_id(blog_id).await?;

        let now = Utc::now();
        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            blog_id: Set(blog_id.to_string()),
            comment: Set(input.comment),
            total_votes: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let comment = self.comment_repo.create(model).await?;
        tracing::info!(comment_id = %comment.id, blog_id = %blog_id, user_id = %user_id, "Created comment");
        Ok(comment)
    }

    /// Edit one's own comment on the given post.
    pub async fn update(
        &self,
        user_id: &str,
        blog_id: &str,
        comment_id: &str,
        input: CommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;

        let existing = self.owned(user_id, blog_id, comment_id).await?;

        let mut active: comment::ActiveModel = existing.into();
        active.comment = Set(input.comment);
        active.updated_at = Set(Utc::now().into());

        self.comment_repo.update(active).await
    }

    /// Delete one's own comment on the given post, along with its votes.
    pub async fn delete(
        &self,
        user_id: &str,
        blog_id: &str,
        comment_id: &str,
    ) -> AppResult<comment::Model> {
        let existing = self.owned(user_id, blog_id, comment_id).await?;

        let votes = self
            .votes
            .cascade_delete_for_targets(&[existing.id.clone()])
            .await?;

        if !self.comment_repo.delete(&existing.id).await? {
            return Err(not_found_on_blog(comment_id, blog_id));
        }

        tracing::info!(
            comment_id = %existing.id,
            blog_id = %blog_id,
            deleted_votes = votes.deleted_count,
            "Deleted comment"
        );

        Ok(existing)
    }

    /// Another user's comment looks the same as a missing one.
    async fn owned(
        &self,
        user_id: &str,
        blog_id: &str,
        comment_id: &str,
    ) -> AppResult<comment::Model> {
        self.comment_repo
            .find_owned_on_blog(comment_id, blog_id, user_id)
            .await?
            .ok_or_else(|| not_found_on_blog(comment_id, blog_id))
    }
}

fn not_found_on_blog(comment_id: &str, blog_id: &str) -> AppError {
    AppError::NotFound(format!(
        "Comment with id : {comment_id} not found for blog post with id : {blog_id}"
    ))
}

fn distinct(ids: impl Iterator<Item = String>) -> Vec<String> {
    ids.collect::<HashSet<_>>().into_iter().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use scribe_db::{entities::blog_post, repositories::VoteRepository};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn empty() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn rows(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn service(
        comment_db: Arc<DatabaseConnection>,
        post_db: Arc<DatabaseConnection>,
        user_db: Arc<DatabaseConnection>,
        vote_db: Arc<DatabaseConnection>,
    ) -> CommentService {
        let comment_repo = CommentRepository::new(comment_db);
        let post_repo = BlogPostRepository::new(post_db);
        let votes = VoteService::new(
            VoteRepository::new(vote_db),
            post_repo.clone(),
            comment_repo.clone(),
        );
        CommentService::new(comment_repo, post_repo, UserRepository::new(user_db), votes)
    }

    fn comment(id: &str, user_id: &str, blog_id: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            blog_id: blog_id.to_string(),
            comment: "Nice".to_string(),
            total_votes: 0,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn post(id: &str, title: &str) -> blog_post::Model {
        blog_post::Model {
            id: id.to_string(),
            user_id: "author".to_string(),
            title: title.to_string(),
            content: "Body".to_string(),
            avatar: blog_post::DEFAULT_AVATAR.to_string(),
            images: serde_json::json!([]),
            total_votes: 0,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            password_hash: String::new(),
            is_admin: false,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_create_on_missing_blog() {
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<blog_post::Model>::new()])
                .into_connection(),
        );

        let result = service(empty(), post_db, empty(), empty())
            .create(
                "u1",
                "missing",
                CommentInput {
                    comment: "Hello".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_comment() {
        let result = service(empty(), empty(), empty(), empty())
            .create(
                "u1",
                "p1",
                CommentInput {
                    comment: String::new(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_success() {
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[comment("c1", "u1", "p1")]])
                .into_connection(),
        );
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post("p1", "Hello")]])
                .into_connection(),
        );

        let created = service(comment_db, post_db, empty(), empty())
            .create(
                "u1",
                "p1",
                CommentInput {
                    comment: "Nice".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(created.blog_id, "p1");
        assert_eq!(created.total_votes, 0);
    }

    #[tokio::test]
    async fn test_list_for_blog_attaches_authors() {
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[comment("c1", "u1", "p1"), comment("c2", "u2", "p1")]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user("u1")]])
                .into_connection(),
        );

        let listed = service(comment_db, empty(), user_db, empty())
            .list_for_blog("p1")
            .await
            .unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].author.as_ref().unwrap().name, "Grace");
        assert!(listed[1].author.is_none());
    }

    #[tokio::test]
    async fn test_list_for_user_attaches_blog_titles() {
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[comment("c1", "u1", "p1")]])
                .into_connection(),
        );
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post("p1", "First post")]])
                .into_connection(),
        );

        let listed = service(comment_db, post_db, empty(), empty())
            .list_for_user("u1")
            .await
            .unwrap();

        assert_eq!(listed[0].blog_title.as_deref(), Some("First post"));
    }

    #[tokio::test]
    async fn test_update_someone_elses_comment_is_not_found() {
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );

        let result = service(comment_db, empty(), empty(), empty())
            .update(
                "intruder",
                "p1",
                "c1",
                CommentInput {
                    comment: "Edited".to_string(),
                },
            )
            .await;

        match result {
            Err(AppError::NotFound(msg)) => {
                assert_eq!(msg, "Comment with id : c1 not found for blog post with id : p1");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_cascades_votes() {
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[comment("c1", "u1", "p1")]])
                .append_exec_results([rows(1)])
                .into_connection(),
        );
        let vote_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([rows(4)])
                .into_connection(),
        );

        let deleted = service(comment_db, empty(), empty(), vote_db)
            .delete("u1", "p1", "c1")
            .await
            .unwrap();

        assert_eq!(deleted.id, "c1");
    }
}
