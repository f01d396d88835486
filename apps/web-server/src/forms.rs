//! Post and comment form validation.
//!
//! Validation never touches storage beyond looking up the chosen group; the
//! handlers decide what to persist once a form comes back clean.

use actix_multipart::form::{MultipartForm, bytes::Bytes, text::Text};
use uuid::Uuid;

use yatube_core::error::RepoError;
use yatube_core::ports::{BaseRepository, GroupRepository};
use yatube_shared::{CommentFormData, FormErrors, PostFormData};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const CLEAR_AND_UPLOAD: &str =
    "Please either submit a file or check the clear checkbox, not both.";

/// Multipart variant of the post form, the only one able to carry an image.
#[derive(MultipartForm)]
pub struct PostUpload {
    pub text: Option<Text<String>>,
    pub group: Option<Text<String>>,
    pub image: Option<Bytes>,
    #[multipart(rename = "image-clear")]
    pub image_clear: Option<Text<String>>,
}

/// Submitted post fields, whichever encoding they arrived in.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    pub group: String,
    pub image: Option<Vec<u8>>,
    pub clear_image: bool,
}

impl From<PostFormData> for PostForm {
    fn from(data: PostFormData) -> Self {
        Self {
            text: data.text,
            group: data.group,
            image: None,
            clear_image: data.image_clear.is_some(),
        }
    }
}

impl From<PostUpload> for PostForm {
    fn from(upload: PostUpload) -> Self {
        Self {
            text: upload.text.map(Text::into_inner).unwrap_or_default(),
            group: upload.group.map(Text::into_inner).unwrap_or_default(),
            // Browsers send an empty part when no file was chosen.
            image: upload
                .image
                .map(|file| file.data.to_vec())
                .filter(|data| !data.is_empty()),
            clear_image: upload.image_clear.is_some(),
        }
    }
}

/// What happens to the post's image on save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChange {
    Keep,
    Clear,
    Replace {
        data: Vec<u8>,
        extension: &'static str,
    },
}

/// A post form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: ImageChange,
}

fn required_text(raw: &str) -> Option<String> {
    let text = raw.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// File extension for a decodable image payload.
pub fn image_extension(data: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(data).ok()?;
    image::load_from_memory_with_format(data, format).ok()?;
    format.extensions_str().first().copied()
}

impl PostForm {
    /// Validate every field, collecting all messages at once.
    pub async fn validate(
        &self,
        groups: &dyn GroupRepository,
    ) -> Result<Result<CleanPost, FormErrors>, RepoError> {
        let mut errors = FormErrors::new();

        let text = required_text(&self.text);
        if text.is_none() {
            errors.add("text", REQUIRED);
        }

        let group_id = match self.group.trim() {
            "" => None,
            raw => match Uuid::parse_str(raw) {
                Ok(id) if groups.find_by_id(id).await?.is_some() => Some(id),
                _ => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            },
        };

        let image = match (&self.image, self.clear_image) {
            (Some(_), true) => {
                errors.add("image", CLEAR_AND_UPLOAD);
                ImageChange::Keep
            }
            (Some(data), false) => match image_extension(data) {
                Some(extension) => ImageChange::Replace {
                    data: data.clone(),
                    extension,
                },
                None => {
                    errors.add("image", INVALID_IMAGE);
                    ImageChange::Keep
                }
            },
            (None, true) => ImageChange::Clear,
            (None, false) => ImageChange::Keep,
        };

        match text {
            Some(text) if errors.is_empty() => Ok(Ok(CleanPost {
                text,
                group_id,
                image,
            })),
            _ => Ok(Err(errors)),
        }
    }
}

/// Validate a comment, returning its cleaned text.
pub fn validate_comment(data: &CommentFormData) -> Result<String, FormErrors> {
    required_text(&data.text).ok_or_else(|| {
        let mut errors = FormErrors::new();
        errors.add("text", REQUIRED);
        errors
    })
}
