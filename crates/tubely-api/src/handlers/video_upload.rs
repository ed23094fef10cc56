use std::io;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    Json,
};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use tubely_core::{constants::VIDEO_FORM_FIELD, models::Video};
use tubely_processing::ValidationError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::load_owned_video;
use crate::state::AppState;

/// Upload the video file for an existing video record.
///
/// The `video` part is streamed straight into the staging area; it is never
/// buffered in memory.
#[utoipa::path(
    post,
    path = "/api/video_upload/{video_id}",
    tag = "videos",
    params(
        ("video_id" = String, Path, description = "ID of the video record to attach the upload to")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video uploaded and record updated", body = Video),
        (status = 400, description = "Invalid ID, missing form field or wrong content type", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token, or caller does not own the video", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Processing, storage or database failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Video>, HttpAppError> {
    let video = load_owned_video(&state, &video_id, &headers).await?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(VIDEO_FORM_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_owned);
        tracing::debug!(
            video_id = %video.id,
            content_type = content_type.as_deref().unwrap_or_default(),
            file_name = field.file_name().unwrap_or_default(),
            "Receiving video upload"
        );

        let mut reader = StreamReader::new(Box::pin(field.map_err(io::Error::other)));
        let outcome = state
            .pipeline
            .run(video, content_type.as_deref(), &mut reader)
            .await?;

        return Ok(Json(outcome.video));
    }

    Err(ValidationError::MissingField(VIDEO_FORM_FIELD.to_string()).into())
}
