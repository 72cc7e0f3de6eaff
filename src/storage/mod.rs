pub mod backends;
mod template;

pub use template::{StorageBackend, StoredFile};

use crate::error::ValidationError;

/// The largest image accepted for upload, 5 MiB.
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Checks an upload against the accepted content types and size ceiling.
///
/// The content type is checked first, an oversized non-image is
/// reported as `NotAnImage`.
pub fn validate_upload(data: &[u8], mimetype: &str) -> Result<(), ValidationError> {
    let is_image = mimetype
        .parse::<mime::Mime>()
        .map(|m| m.type_() == mime::IMAGE)
        .unwrap_or(false);

    if !is_image {
        return Err(ValidationError::NotAnImage {
            mimetype: mimetype.to_string(),
        });
    }

    if data.len() > MAX_IMAGE_SIZE {
        return Err(ValidationError::TooLarge {
            size: data.len(),
            max: MAX_IMAGE_SIZE,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_images_up_to_the_ceiling() {
        let data = vec![0u8; MAX_IMAGE_SIZE];
        assert!(validate_upload(&data, "image/jpeg").is_ok());
        assert!(validate_upload(b"abc", "image/png").is_ok());
        assert!(validate_upload(b"abc", "image/svg+xml").is_ok());
    }

    #[test]
    fn test_rejects_non_images() {
        for mimetype in ["text/plain", "application/octet-stream", "", "imagejpeg"] {
            let res = validate_upload(b"abc", mimetype);
            assert!(
                matches!(res, Err(ValidationError::NotAnImage { .. })),
                "{} should be rejected",
                mimetype,
            );
        }
    }

    #[test]
    fn test_rejects_oversized_images() {
        let data = vec![0u8; MAX_IMAGE_SIZE + 1];
        match validate_upload(&data, "image/jpeg") {
            Err(ValidationError::TooLarge { size, max }) => {
                assert_eq!(size, MAX_IMAGE_SIZE + 1);
                assert_eq!(max, MAX_IMAGE_SIZE);
            },
            other => panic!("expected TooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_content_type_checked_before_size() {
        let data = vec![0u8; MAX_IMAGE_SIZE + 1];
        assert!(matches!(
            validate_upload(&data, "text/plain"),
            Err(ValidationError::NotAnImage { .. })
        ));
    }
}
