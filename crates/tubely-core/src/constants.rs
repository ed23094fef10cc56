//! Application-wide constants.

/// The only content type accepted for video uploads.
pub const MP4_CONTENT_TYPE: &str = "video/mp4";

/// Multipart field carrying the video payload.
pub const VIDEO_FORM_FIELD: &str = "video";

/// Multipart field carrying the thumbnail payload.
pub const THUMBNAIL_FORM_FIELD: &str = "thumbnail";

/// Issuer expected in access tokens.
pub const JWT_ISSUER: &str = "tubely-access";

/// Prefix of staged upload files in the staging directory.
pub const STAGING_FILE_PREFIX: &str = "tubely-upload.";

/// Suffix appended to a staged file to name its remuxed counterpart.
pub const PROCESSING_SUFFIX: &str = ".processing";

/// Headroom added to the video body limit for multipart framing.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;
