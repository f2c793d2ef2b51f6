//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test -p scribe-db --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `scribe_test`)
//!   `TEST_DB_PASSWORD` (default: `scribe_test`)
//!   `TEST_DB_NAME` (default: `scribe_test`)

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use scribe_common::AppError;
use scribe_db::entities::{blog_post, user, vote};
use scribe_db::repositories::{BlogPostRepository, UserRepository, VoteRepository};
use scribe_db::test_utils::TestDatabase;
use sea_orm::{Database, DatabaseConnection, Set};

/// Opens a connection to the test database. `DatabaseConnection` is not
/// `Clone` when sea-orm's `mock` feature is enabled (as it is for this crate's
/// unit tests), so a fresh connection is opened instead of cloning.
async fn connect(db: &TestDatabase) -> Arc<DatabaseConnection> {
    Arc::new(Database::connect(&db.config.database_url()).await.unwrap())
}

async fn seed(db: &TestDatabase) -> (String, String) {
    let conn = connect(db).await;
    let users = UserRepository::new(conn.clone());
    let posts = BlogPostRepository::new(conn);

    let user = users
        .create(user::ActiveModel {
            id: Set("01hx0000000000000000000001".to_string()),
            name: Set("Ada".to_string()),
            email: Set("ada@example.com".to_string()),
            password_hash: Set("x".to_string()),
            is_admin: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();

    let post = posts
        .create(blog_post::ActiveModel {
            id: Set("01hx0000000000000000000002".to_string()),
            user_id: Set(user.id.clone()),
            title: Set("Hello".to_string()),
            content: Set("World".to_string()),
            avatar: Set(blog_post::DEFAULT_AVATAR.to_string()),
            images: Set(serde_json::json!([])),
            total_votes: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();

    (user.id, post.id)
}

fn new_vote(id: &str, user_id: &str, target_id: &str, value: i16) -> vote::ActiveModel {
    vote::ActiveModel {
        id: Set(id.to_string()),
        user_id: Set(user_id.to_string()),
        target_id: Set(target_id.to_string()),
        target_kind: Set(vote::TargetKind::Post),
        value: Set(value),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_second_vote_for_same_pair_conflicts() {
    let db = TestDatabase::create_unique().await.unwrap();
    let (user_id, post_id) = seed(&db).await;
    let votes = VoteRepository::new(connect(&db).await);

    votes
        .create(new_vote("01hx0000000000000000000003", &user_id, &post_id, 1))
        .await
        .unwrap();
    let second = votes
        .create(new_vote("01hx0000000000000000000004", &user_id, &post_id, -1))
        .await;

    assert!(matches!(second, Err(AppError::Conflict(_))));
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_atomic_total_adjustment() {
    let db = TestDatabase::create_unique().await.unwrap();
    let (_, post_id) = seed(&db).await;
    let posts = BlogPostRepository::new(connect(&db).await);

    assert!(posts.add_to_total_votes(&post_id, -1).await.unwrap());
    assert!(posts.add_to_total_votes(&post_id, -1).await.unwrap());
    assert_eq!(posts.get_by_id(&post_id).await.unwrap().total_votes, -2);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_compare_and_set_detects_stale_value() {
    let db = TestDatabase::create_unique().await.unwrap();
    let (user_id, post_id) = seed(&db).await;
    let votes = VoteRepository::new(connect(&db).await);

    let v = votes
        .create(new_vote("01hx0000000000000000000005", &user_id, &post_id, 1))
        .await
        .unwrap();

    let now = Utc::now().into();
    assert!(votes.compare_and_set_value(&v.id, 1, 0, now).await.unwrap());
    assert!(!votes.compare_and_set_value(&v.id, 1, -1, now).await.unwrap());
    assert!(!votes.delete_if_value(&v.id, 1).await.unwrap());
    assert!(votes.delete_if_value(&v.id, 0).await.unwrap());

    db.drop_database().await.unwrap();
}
