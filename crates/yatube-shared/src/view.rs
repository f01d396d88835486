//! View models handed to the page templates.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

/// The signed-in visitor, if any.
#[derive(Debug, Clone, Serialize)]
pub struct Viewer {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GroupLink {
    pub title: String,
    pub slug: String,
}

/// A post as shown in listings and on its detail page.
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub id: Uuid,
    pub text: String,
    pub excerpt: String,
    pub created_at: String,
    pub author_id: Uuid,
    pub author_username: String,
    pub group: Option<GroupLink>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub author_username: String,
    pub text: String,
    pub created_at: String,
}

/// Author header on the profile page.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub posts_count: u64,
    pub followers_count: u64,
    pub following_count: u64,
    /// The viewer already follows this author.
    pub following: bool,
    /// The viewer is this author.
    pub is_self: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupChoice {
    pub id: Uuid,
    pub title: String,
    pub selected: bool,
}

/// Field-level validation messages. The `__all__` key holds non-field errors.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

/// Everything the post create/edit template needs.
#[derive(Debug, Clone, Serialize)]
pub struct PostFormView {
    pub text: String,
    pub groups: Vec<GroupChoice>,
    pub current_image: Option<String>,
    pub errors: FormErrors,
    pub text_label: &'static str,
    pub text_help: &'static str,
    pub group_label: &'static str,
    pub group_help: &'static str,
    pub image_label: &'static str,
}

impl PostFormView {
    pub fn new(text: String, groups: Vec<GroupChoice>) -> Self {
        Self {
            text,
            groups,
            current_image: None,
            errors: FormErrors::new(),
            text_label: "Text",
            text_help: "Text of the new post",
            group_label: "Group",
            group_help: "Group the post will belong to",
            image_label: "Image",
        }
    }

    pub fn with_errors(mut self, errors: FormErrors) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_current_image(mut self, image_url: Option<String>) -> Self {
        self.current_image = image_url;
        self
    }
}
