//! Data Transfer Objects - submitted form payloads.
//!
//! Every field defaults to empty so a missing input reaches validation as
//! "required" instead of failing extraction.

use serde::{Deserialize, Serialize};

/// Post create/edit form, url-encoded variant (no image).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFormData {
    pub text: String,
    /// Group id, empty for "no group".
    pub group: String,
    /// Set by the "clear" checkbox on the edit form.
    #[serde(rename = "image-clear")]
    pub image_clear: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentFormData {
    pub text: String,
}

/// Request to login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

/// Request to register a new user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}
