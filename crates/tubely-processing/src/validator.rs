/// Validation errors for inbound uploads
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid video ID: {0}")]
    InvalidId(String),

    #[error("Missing form field: {0}")]
    MissingField(String),

    #[error("Missing content type")]
    MissingContentType,

    #[error("Invalid content type: {content_type} (expected: {expected})")]
    InvalidContentType {
        content_type: String,
        expected: String,
    },

    #[error("File too large (max: {max} bytes)")]
    FileTooLarge { max: u64 },
}

/// Lowercased media type without parameters (`Video/MP4; codecs=avc1` → `video/mp4`).
pub fn media_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Upload validator
///
/// Checks run before any byte of the payload is staged.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    accepted_content_type: String,
    max_bytes: u64,
}

impl UploadValidator {
    pub fn new(accepted_content_type: impl Into<String>, max_bytes: u64) -> Self {
        Self {
            accepted_content_type: media_type_essence(&accepted_content_type.into()),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Validate the declared content type, returning its essence.
    pub fn validate_content_type(
        &self,
        content_type: Option<&str>,
    ) -> Result<String, ValidationError> {
        let content_type = content_type.ok_or(ValidationError::MissingContentType)?;
        let essence = media_type_essence(content_type);

        if essence != self.accepted_content_type {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                expected: self.accepted_content_type.clone(),
            });
        }

        Ok(essence)
    }
}
