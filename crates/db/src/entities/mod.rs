//! Database entities.

pub mod blog_post;
pub mod comment;
pub mod user;
pub mod vote;

pub use blog_post::Entity as BlogPost;
pub use comment::Entity as Comment;
pub use user::Entity as User;
pub use vote::Entity as Vote;
