//! # Yatube Shared
//!
//! Types that cross the HTTP boundary: submitted form payloads and the view
//! models serialized into page templates.

pub mod dto;
pub mod view;

pub use dto::{CommentFormData, LoginRequest, PostFormData, SignupRequest};
pub use view::{
    CommentView, FormErrors, GroupChoice, GroupLink, PostCard, PostFormView, ProfileView,
    Viewer,
};
