//! Media storage backends.

mod local;
mod memory;

pub use local::LocalMediaStorage;
pub use memory::InMemoryMediaStorage;

use yatube_core::ports::MediaError;

/// Reject references that could escape the media root.
pub(crate) fn check_reference(reference: &str) -> Result<(), MediaError> {
    let escapes = reference.is_empty()
        || reference.starts_with('/')
        || reference.starts_with('\\')
        || reference
            .split(['/', '\\'])
            .any(|segment| segment == ".." || segment.contains(':'));

    if escapes {
        return Err(MediaError::InvalidReference(reference.to_string()));
    }
    Ok(())
}

/// `<upload_to>/<uuid>.<extension>`
pub(crate) fn new_reference(upload_to: &str, extension: &str) -> Result<String, MediaError> {
    let upload_to = upload_to.trim_matches('/');
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(MediaError::InvalidReference(format!("extension {extension:?}")));
    }

    let reference = format!("{upload_to}/{}.{extension}", uuid::Uuid::new_v4());
    check_reference(&reference)?;
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_checks() {
        assert!(check_reference("posts/a.png").is_ok());
        assert!(check_reference("../etc/passwd").is_err());
        assert!(check_reference("posts/../../secret").is_err());
        assert!(check_reference("/abs/path.png").is_err());
        assert!(check_reference("").is_err());
    }

    #[test]
    fn test_new_reference_layout() {
        let reference = new_reference("posts/", "PNG").unwrap();
        assert!(reference.starts_with("posts/"));
        assert!(reference.ends_with(".png"));

        assert!(new_reference("posts", "").is_err());
        assert!(new_reference("posts", "p/ng").is_err());
    }
}
