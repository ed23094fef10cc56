//! Abstraction over durable video records.
//!
//! The API implements this trait on top of the Postgres repository. The
//! pipeline uses it to persist the published video URL.

use async_trait::async_trait;
use tubely_core::models::Video;
use uuid::Uuid;

/// Video record access used by uploads.
#[async_trait]
pub trait VideoRecordStore: Send + Sync {
    /// Fetch a video record by id.
    async fn get_video(&self, id: Uuid) -> anyhow::Result<Option<Video>>;

    /// Persist the mutable fields of `video` and return the stored record.
    async fn update_video(&self, video: &Video) -> anyhow::Result<Video>;
}
