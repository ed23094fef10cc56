pub mod health;
pub mod thumbnail_upload;
pub mod video_upload;

use axum::http::HeaderMap;
use tubely_core::{models::Video, AppError};
use tubely_processing::ValidationError;
use uuid::Uuid;

use crate::auth;
use crate::error::HttpAppError;
use crate::state::AppState;

/// Resolve the path ID, authenticate the caller and load a video they own.
///
/// Checks run in a fixed order: ID syntax (400), token (401), record lookup
/// (404/500), ownership (401).
pub(crate) async fn load_owned_video(
    state: &AppState,
    raw_video_id: &str,
    headers: &HeaderMap,
) -> Result<Video, HttpAppError> {
    let video_id = Uuid::parse_str(raw_video_id)
        .map_err(|_| ValidationError::InvalidId(raw_video_id.to_string()))?;

    let user_id = auth::authenticate(headers, state.jwt_secret())?;

    let video = state
        .records
        .get_video(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Couldn't find video".to_string()))?;

    if !video.is_owned_by(user_id) {
        tracing::debug!(
            video_id = %video_id,
            user_id = %user_id,
            "Rejected upload for video owned by another user"
        );
        return Err(AppError::Unauthorized("Not authorized to update this video".to_string()).into());
    }

    Ok(video)
}
