//! Application state shared by all handlers.

use std::sync::Arc;

use tubely_core::Config;
use tubely_processing::{PipelineConfig, UploadPipeline, VideoRecordStore};
use tubely_storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub records: Arc<dyn VideoRecordStore>,
    pub pipeline: Arc<UploadPipeline>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        records: Arc<dyn VideoRecordStore>,
    ) -> Self {
        let pipeline = UploadPipeline::new(
            PipelineConfig::from_config(&config),
            storage.clone(),
            records.clone(),
        );

        Self {
            config,
            storage,
            records,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        self.config.jwt_secret()
    }
}
