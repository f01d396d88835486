//! Domain entities - the core business objects.

mod comment;
mod follow;
mod group;
mod post;
mod user;

pub use comment::{COMMENT_EXCERPT_LEN, Comment};
pub use follow::Follow;
pub use group::Group;
pub use post::{POST_EXCERPT_LEN, Post};
pub use user::{USERNAME_MAX_LEN, User};
