//! Upload pipeline orchestration.
//!
//! An upload runs through a fixed sequence of steps:
//!
//! ```text
//! Received -> Staged -> Probed -> Classified -> Remuxed -> Published -> RecordUpdated
//! ```
//!
//! Any step may fail, which moves the session to `Failed(stage)`. Staged files
//! are owned by the running step sequence and are gone by the time an error
//! reaches the caller; the video record is only written after a successful
//! publish.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use tubely_core::constants::MP4_CONTENT_TYPE;
use tubely_core::models::Video;
use tubely_core::Config;
use tubely_storage::{AssetKey, Storage};
use uuid::Uuid;

use crate::aspect::OrientationCategory;
use crate::error::{PipelineError, Stage};
use crate::probe::{MediaProbeResult, StreamProber};
use crate::publish::Publisher;
use crate::remux::ContainerRemuxer;
use crate::staging::{StagedFile, StagingArea, StagingError};
use crate::validator::{UploadValidator, ValidationError};
use crate::video_store::VideoRecordStore;

/// Immutable settings for the upload pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub accepted_content_type: String,
    pub max_upload_bytes: u64,
    pub staging_dir: PathBuf,
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub tool_timeout: Duration,
    pub distribution_host: String,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            accepted_content_type: MP4_CONTENT_TYPE.to_string(),
            max_upload_bytes: config.max_video_size_bytes as u64,
            staging_dir: config.staging_dir.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
            ffmpeg_path: config.ffmpeg_path.clone(),
            tool_timeout: config.media_tool_timeout,
            distribution_host: config.distribution_host.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Staged,
    Probed,
    Classified,
    Remuxed,
    Published,
    RecordUpdated,
    Failed(Stage),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::RecordUpdated | PipelineState::Failed(_))
    }
}

/// Progress of a single upload
#[derive(Debug)]
pub struct UploadSession {
    video_id: Uuid,
    state: PipelineState,
}

impl UploadSession {
    pub fn new(video_id: Uuid) -> Self {
        Self {
            video_id,
            state: PipelineState::Received,
        }
    }

    pub fn video_id(&self) -> Uuid {
        self.video_id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn advance(&mut self, next: PipelineState) {
        if self.state.is_terminal() {
            return;
        }
        tracing::debug!(
            video_id = %self.video_id,
            from = ?self.state,
            to = ?next,
            "Upload state transition"
        );
        self.state = next;
    }

    fn fail(&mut self, stage: Stage) {
        self.advance(PipelineState::Failed(stage));
    }
}

/// Result of a completed upload
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub video: Video,
    pub asset_key: AssetKey,
    pub orientation: OrientationCategory,
    pub probe: MediaProbeResult,
    pub url: String,
}

pub struct UploadPipeline {
    validator: UploadValidator,
    staging: StagingArea,
    prober: StreamProber,
    remuxer: ContainerRemuxer,
    publisher: Publisher,
    records: Arc<dyn VideoRecordStore>,
}

impl UploadPipeline {
    pub fn new(
        config: PipelineConfig,
        storage: Arc<dyn Storage>,
        records: Arc<dyn VideoRecordStore>,
    ) -> Self {
        Self {
            validator: UploadValidator::new(config.accepted_content_type, config.max_upload_bytes),
            staging: StagingArea::new(config.staging_dir),
            prober: StreamProber::new(config.ffprobe_path, config.tool_timeout),
            remuxer: ContainerRemuxer::new(config.ffmpeg_path, config.tool_timeout),
            publisher: Publisher::new(storage, config.distribution_host),
            records,
        }
    }

    /// Stage, probe, classify, remux and publish `reader`, then record the
    /// published URL on `video`.
    ///
    /// Ownership of `video` is the caller's responsibility.
    #[tracing::instrument(skip_all, fields(video_id = %video.id))]
    pub async fn run(
        &self,
        video: Video,
        content_type: Option<&str>,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<UploadOutcome, PipelineError> {
        let start = std::time::Instant::now();
        let mut session = UploadSession::new(video.id);

        match self.execute(&mut session, video, content_type, reader).await {
            Ok(outcome) => {
                tracing::info!(
                    video_id = %session.video_id(),
                    key = %outcome.asset_key,
                    orientation = %outcome.orientation,
                    url = %outcome.url,
                    duration_ms = start.elapsed().as_millis(),
                    "Video upload completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                session.fail(e.stage());
                match e.stage() {
                    Stage::Validation => tracing::debug!(
                        video_id = %session.video_id(),
                        stage = %e.stage(),
                        error = %e,
                        "Video upload rejected"
                    ),
                    _ => tracing::error!(
                        video_id = %session.video_id(),
                        stage = %e.stage(),
                        error = %e,
                        stderr = e.tool_stderr().unwrap_or_default(),
                        duration_ms = start.elapsed().as_millis(),
                        "Video upload failed"
                    ),
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        session: &mut UploadSession,
        mut video: Video,
        content_type: Option<&str>,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<UploadOutcome, PipelineError> {
        let content_type = self.validator.validate_content_type(content_type)?;

        let staged = self
            .staging
            .stage(reader, self.validator.max_bytes())
            .await
            .map_err(|e| match e {
                StagingError::TooLarge { max_bytes } => {
                    PipelineError::Validation(ValidationError::FileTooLarge { max: max_bytes })
                }
                StagingError::Io(e) => PipelineError::Staging(e),
            })?;
        session.advance(PipelineState::Staged);

        let probe = self.prober.probe(staged.path()).await?;
        session.advance(PipelineState::Probed);

        let orientation = OrientationCategory::classify(probe.width, probe.height);
        session.advance(PipelineState::Classified);

        let remuxed = self.remuxer.remux(&staged).await?;
        session.advance(PipelineState::Remuxed);

        let asset_key = AssetKey::generate(orientation.prefix(), &content_type)?;
        let url = self
            .publisher
            .publish(remuxed.path(), &asset_key, &content_type)
            .await?;
        session.advance(PipelineState::Published);

        release(remuxed);
        release(staged);

        video.video_url = Some(url.clone());
        let video = match self.records.update_video(&video).await {
            Ok(updated) => updated,
            Err(source) => {
                tracing::warn!(
                    video_id = %video.id,
                    key = %asset_key,
                    error = %source,
                    "Published asset is orphaned: video record was not updated"
                );
                return Err(PipelineError::RecordUpdate {
                    key: asset_key.to_string(),
                    source,
                });
            }
        };
        session.advance(PipelineState::RecordUpdated);

        Ok(UploadOutcome {
            video,
            asset_key,
            orientation,
            probe,
            url,
        })
    }
}

fn release(file: StagedFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.release() {
        tracing::warn!(
            error = %e,
            path = %path.display(),
            "Failed to remove staged file"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_transitions() {
        let mut session = UploadSession::new(Uuid::new_v4());
        assert_eq!(session.state(), PipelineState::Received);

        session.advance(PipelineState::Staged);
        session.advance(PipelineState::Probed);
        assert_eq!(session.state(), PipelineState::Probed);

        session.fail(Stage::Remux);
        assert_eq!(session.state(), PipelineState::Failed(Stage::Remux));

        // Terminal states stick.
        session.advance(PipelineState::Published);
        assert_eq!(session.state(), PipelineState::Failed(Stage::Remux));
    }

    #[test]
    fn test_pipeline_config_from_config() {
        let config = Config::from_lookup(|key| match key {
            "JWT_SECRET" => Some("pipeline-test-secret".to_string()),
            "DATABASE_URL" => Some("postgres://localhost/tubely".to_string()),
            "S3_CF_DISTRO" => Some("cdn.example.com".to_string()),
            "MAX_VIDEO_SIZE_MB" => Some("2".to_string()),
            "STAGING_DIR" => Some("/tmp/tubely-staging".to_string()),
            _ => None,
        })
        .unwrap();

        let pipeline_config = PipelineConfig::from_config(&config);
        assert_eq!(pipeline_config.accepted_content_type, "video/mp4");
        assert_eq!(pipeline_config.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(pipeline_config.staging_dir, PathBuf::from("/tmp/tubely-staging"));
        assert_eq!(pipeline_config.distribution_host, "cdn.example.com");
    }
}
