//! Repositories wrapping database access for each entity.

mod blog_post;
mod comment;
mod user;
mod vote;

pub use blog_post::BlogPostRepository;
pub use comment::CommentRepository;
pub use user::UserRepository;
pub use vote::VoteRepository;

use sea_orm::{DbErr, SqlErr};

/// Whether a database error was raised by a unique index.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
