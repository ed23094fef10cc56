use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tubely_core::{constants::THUMBNAIL_FORM_FIELD, models::Video};
use tubely_processing::{media_type_essence, ValidationError};

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::load_owned_video;
use crate::state::AppState;

/// Store a thumbnail inline on the video record as a `data:` URL.
#[utoipa::path(
    post,
    path = "/api/thumbnail_upload/{video_id}",
    tag = "videos",
    params(
        ("video_id" = String, Path, description = "ID of the video record")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Thumbnail stored", body = Video),
        (status = 400, description = "Invalid ID, missing form field or content type", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Video>, HttpAppError> {
    let mut video = load_owned_video(&state, &video_id, &headers).await?;
    let max_bytes = state.config.max_thumbnail_size_bytes;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(THUMBNAIL_FORM_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .map(media_type_essence)
            .filter(|ct| !ct.is_empty())
            .ok_or(ValidationError::MissingContentType)?;

        let data = field.bytes().await?;
        if data.len() > max_bytes {
            return Err(ValidationError::FileTooLarge {
                max: max_bytes as u64,
            }
            .into());
        }

        video.thumbnail_url = Some(format!(
            "data:{};base64,{}",
            content_type,
            STANDARD.encode(&data)
        ));
        let video = state.records.update_video(&video).await?;

        tracing::info!(
            video_id = %video.id,
            content_type = %content_type,
            size_bytes = data.len(),
            "Thumbnail stored"
        );
        return Ok(Json(video));
    }

    Err(ValidationError::MissingField(THUMBNAIL_FORM_FIELD.to_string()).into())
}
