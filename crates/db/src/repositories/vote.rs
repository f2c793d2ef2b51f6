//! Vote repository.
//!
//! Every mutation is keyed so that a concurrent writer is detected instead
//! of overwritten: inserts lose on the `(user_id, target_id)` unique index,
//! value changes and deletes only apply while the stored value is unchanged.

use std::sync::Arc;

use super::is_unique_violation;
use crate::entities::{Vote, vote};
use scribe_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    prelude::DateTimeWithTimeZone, sea_query::Expr,
};

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a vote by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<vote::Model>> {
        Vote::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the vote a user cast on a target.
    pub async fn find_by_user_and_target(
        &self,
        user_id: &str,
        target_id: &str,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::TargetId.eq(target_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new vote.
    ///
    /// Fails with [`AppError::Conflict`] when the user already has a vote on
    /// the target, which happens when another request inserted first.
    pub async fn create(&self, model: vote::ActiveModel) -> AppResult<vote::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("vote already exists for this user and target".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Set a vote's value to `new_value` only if it is still `expected`.
    ///
    /// Returns `false` when the vote was changed or removed in the meantime.
    pub async fn compare_and_set_value(
        &self,
        id: &str,
        expected: i16,
        new_value: i16,
        updated_at: DateTimeWithTimeZone,
    ) -> AppResult<bool> {
        let result = Vote::update_many()
            .col_expr(vote::Column::Value, Expr::value(new_value))
            .col_expr(vote::Column::UpdatedAt, Expr::value(updated_at))
            .filter(vote::Column::Id.eq(id))
            .filter(vote::Column::Value.eq(expected))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Delete a vote only if its value is still `expected`.
    ///
    /// Returns `false` when the vote was changed or removed in the meantime.
    pub async fn delete_if_value(&self, id: &str, expected: i16) -> AppResult<bool> {
        let result = Vote::delete_many()
            .filter(vote::Column::Id.eq(id))
            .filter(vote::Column::Value.eq(expected))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Every vote, oldest first.
    pub async fn find_all(&self) -> AppResult<Vec<vote::Model>> {
        Vote::find()
            .order_by_asc(vote::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Votes whose target is one of `target_ids`.
    pub async fn find_by_targets(&self, target_ids: &[String]) -> AppResult<Vec<vote::Model>> {
        if target_ids.is_empty() {
            return Ok(vec![]);
        }

        Vote::find()
            .filter(vote::Column::TargetId.is_in(target_ids.to_vec()))
            .order_by_asc(vote::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete every vote whose target is one of `target_ids`. Returns the number removed.
    pub async fn delete_by_targets(&self, target_ids: &[String]) -> AppResult<u64> {
        if target_ids.is_empty() {
            return Ok(0);
        }

        let result = Vote::delete_many()
            .filter(vote::Column::TargetId.is_in(target_ids.to_vec()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};

    fn create_test_vote(id: &str, user_id: &str, target_id: &str, value: i16) -> vote::Model {
        vote::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            target_id: target_id.to_string(),
            target_kind: vote::TargetKind::Post,
            value,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_find_by_user_and_target() {
        let v = create_test_vote("v1", "u1", "p1", 1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[v]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let found = repo.find_by_user_and_target("u1", "p1").await.unwrap();

        assert_eq!(found.unwrap().value, 1);
    }

    #[tokio::test]
    async fn test_create() {
        let v = create_test_vote("v1", "u1", "p1", -1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[v.clone()]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let created = repo
            .create(vote::ActiveModel {
                id: Set(v.id.clone()),
                user_id: Set(v.user_id.clone()),
                target_id: Set(v.target_id.clone()),
                target_kind: Set(v.target_kind),
                value: Set(v.value),
                created_at: Set(v.created_at),
                updated_at: Set(v.updated_at),
            })
            .await
            .unwrap();

        assert_eq!(created, v);
    }

    #[tokio::test]
    async fn test_compare_and_set_value() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(0)])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let now = Utc::now().into();
        assert!(repo.compare_and_set_value("v1", 1, -1, now).await.unwrap());
        // value moved underneath us
        assert!(!repo.compare_and_set_value("v1", 1, -1, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_if_value() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(0)])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        assert!(repo.delete_if_value("v1", -1).await.unwrap());
        assert!(!repo.delete_if_value("v1", -1).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_targets() {
        let v1 = create_test_vote("v1", "u1", "p1", 1);
        let v2 = create_test_vote("v2", "u2", "c1", 0);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[v1, v2]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let votes = repo
            .find_by_targets(&["p1".to_string(), "c1".to_string()])
            .await
            .unwrap();

        assert_eq!(votes.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_target_set_skips_queries() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = VoteRepository::new(db);
        assert!(repo.find_by_targets(&[]).await.unwrap().is_empty());
        assert_eq!(repo.delete_by_targets(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_targets() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(4)])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let deleted = repo
            .delete_by_targets(&["c1".to_string(), "c2".to_string()])
            .await
            .unwrap();

        assert_eq!(deleted, 4);
    }
}
