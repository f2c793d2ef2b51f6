//! Business logic services.

#![allow(missing_docs)]

pub mod auth;
pub mod blog;
pub mod comment;
pub mod media;
pub mod user;
pub mod vote;

pub use auth::{Claims, TokenService};
pub use blog::{BlogService, CreatePostInput, PostDeleteOutcome, PostWithAuthor, UpdatePostInput};
pub use comment::{CommentInput, CommentService, CommentWithAuthor, CommentWithBlog};
pub use media::{ImageFormat, MediaService};
pub use user::{
    AuthSession, LoginInput, RegisterInput, UpdatePasswordInput, UpdateUserInput, UserService,
};
pub use vote::{
    CascadeOutcome, CastOutcome, CastStatus, RetractOutcome, RetractStatus, VoteService,
    VoteValue, Voter,
};
