//! Blog post repository.

use std::sync::Arc;

use crate::entities::{BlogPost, blog_post};
use scribe_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::Expr,
};

/// Blog post repository for database operations.
#[derive(Clone)]
pub struct BlogPostRepository {
    db: Arc<DatabaseConnection>,
}

impl BlogPostRepository {
    /// Create a new blog post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<blog_post::Model>> {
        BlogPost::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<blog_post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Find posts by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<blog_post::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        BlogPost::find()
            .filter(blog_post::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List every post, oldest first.
    pub async fn find_all(&self) -> AppResult<Vec<blog_post::Model>> {
        BlogPost::find()
            .order_by_asc(blog_post::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: blog_post::ActiveModel) -> AppResult<blog_post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a post.
    pub async fn update(&self, model: blog_post::ActiveModel) -> AppResult<blog_post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post. Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = BlogPost::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Add `delta` to a post's vote total atomically (single UPDATE query, no fetch).
    ///
    /// Returns `false` when no post with that ID exists.
    pub async fn add_to_total_votes(&self, id: &str, delta: i64) -> AppResult<bool> {
        let result = BlogPost::update_many()
            .col_expr(
                blog_post::Column::TotalVotes,
                Expr::col(blog_post::Column::TotalVotes).add(delta),
            )
            .filter(blog_post::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_post(id: &str, total_votes: i64) -> blog_post::Model {
        blog_post::Model {
            id: id.to_string(),
            user_id: "author".to_string(),
            title: "Title".to_string(),
            content: "Body".to_string(),
            avatar: blog_post::DEFAULT_AVATAR.to_string(),
            images: serde_json::json!(["/uploads/a.png", 7]),
            total_votes,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_found() {
        let post = create_test_post("p1", -2);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );

        let repo = BlogPostRepository::new(db);
        let found = repo.get_by_id("p1").await.unwrap();

        assert_eq!(found.total_votes, -2);
        assert_eq!(found.image_urls(), vec!["/uploads/a.png".to_string()]);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<blog_post::Model>::new()])
                .into_connection(),
        );

        let repo = BlogPostRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PostNotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_add_to_total_votes() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = BlogPostRepository::new(db);
        assert!(repo.add_to_total_votes("p1", -2).await.unwrap());
        assert!(!repo.add_to_total_votes("gone", 1).await.unwrap());
    }
}
