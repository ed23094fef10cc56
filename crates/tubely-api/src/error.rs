//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`. Domain errors from the storage and
//! processing crates are mapped onto `AppError` exactly once, here, so every
//! failure renders with the same JSON shape.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tubely_core::{AppError, ErrorMetadata, LogLevel};
use tubely_processing::{PipelineError, ValidationError};
use tubely_storage::StorageError;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
///
/// `AppError` lives in tubely-core, so the orphan rule requires a local type here.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details are only ever shown outside production, and never for sensitive errors.
        let show_details = !is_production_env() && !app_error.is_sensitive();

        let body = ErrorResponse {
            error: app_error.client_message(),
            details: show_details.then(|| app_error.detailed_message()),
            error_type: show_details.then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        };

        (status, Json(body)).into_response()
    }
}

// Convert domain errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

impl From<ValidationError> for HttpAppError {
    fn from(err: ValidationError) -> Self {
        let app = match err {
            ValidationError::InvalidId(_) => AppError::InvalidInput("Invalid ID".to_string()),
            ValidationError::MissingField(field) => {
                AppError::InvalidInput(format!("Unable to parse form file '{}'", field))
            }
            ValidationError::MissingContentType => {
                AppError::InvalidInput("Missing Content-Type for file".to_string())
            }
            ValidationError::InvalidContentType { expected, .. } => {
                AppError::InvalidInput(format!("Invalid file type, expected {}", expected))
            }
            ValidationError::FileTooLarge { max } => AppError::PayloadTooLarge(format!(
                "File size exceeds maximum allowed size of {} MB",
                max / 1024 / 1024
            )),
        };
        HttpAppError(app)
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::UploadFailed(msg) => AppError::Storage(msg),
            StorageError::InvalidKey(msg) => AppError::Storage(msg),
            StorageError::IoError(err) => AppError::Internal(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        };
        HttpAppError(app)
    }
}

impl From<PipelineError> for HttpAppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(e) => e.into(),
            PipelineError::Staging(e) => HttpAppError(AppError::Internal(format!(
                "Could not stage upload: {}",
                e
            ))),
            e @ (PipelineError::Probe(_) | PipelineError::Remux(_)) => {
                HttpAppError(AppError::MediaConversionError(e.to_string()))
            }
            PipelineError::Publish(e) => e.into(),
            PipelineError::RecordUpdate { key, source } => {
                HttpAppError(AppError::InternalWithSource {
                    message: format!("Couldn't update video record for asset {}", key),
                    source,
                })
            }
        }
    }
}

impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        let app = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::InvalidInput(format!("Failed to read multipart: {}", err.body_text()))
        };
        HttpAppError(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubely_processing::{ProbeError, RemuxError};

    fn status_of(err: impl Into<HttpAppError>) -> u16 {
        err.into().0.http_status_code()
    }

    #[test]
    fn test_validation_errors_are_client_errors() {
        assert_eq!(status_of(ValidationError::InvalidId("abc".into())), 400);
        assert_eq!(
            status_of(ValidationError::InvalidContentType {
                content_type: "video/avi".into(),
                expected: "video/mp4".into(),
            }),
            400
        );
        assert_eq!(status_of(ValidationError::FileTooLarge { max: 1024 }), 413);
    }

    #[test]
    fn test_pipeline_failures_are_server_errors() {
        let probe = PipelineError::Probe(ProbeError::NoStreams {
            stderr: String::new(),
        });
        let HttpAppError(app) = probe.into();
        assert_eq!(app.error_code(), "MEDIA_CONVERSION_ERROR");
        assert_eq!(app.client_message(), "Error processing video");

        let remux = PipelineError::Remux(RemuxError::EmptyOutput("/tmp/x.processing".into()));
        assert_eq!(status_of(remux), 500);

        let publish = PipelineError::Publish(StorageError::UploadFailed("timeout".into()));
        let HttpAppError(app) = publish.into();
        assert_eq!(app.error_code(), "STORAGE_ERROR");

        let record = PipelineError::RecordUpdate {
            key: "landscape/abc.mp4".into(),
            source: anyhow::anyhow!("connection reset"),
        };
        assert_eq!(status_of(record), 500);
    }

    #[test]
    fn test_staging_errors_hide_io_details() {
        let staging = PipelineError::Staging(std::io::Error::other("No space left on device"));
        let HttpAppError(app) = staging.into();
        assert!(app.is_sensitive());
        assert!(!app.client_message().contains("space"));
    }
}
