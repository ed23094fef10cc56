//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::Result;
use tubely_core::Config;
use tubely_db::VideoRepository;

use crate::state::AppState;
use crate::video_store_impl::PgVideoRecordStore;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.base.environment,
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;

    let storage = tubely_storage::create_storage(&config).await?;
    tracing::info!(
        backend = %storage.backend_type(),
        bucket = %storage.bucket(),
        "Storage initialized"
    );

    let records = Arc::new(PgVideoRecordStore::new(VideoRepository::new(pool)));
    let state = Arc::new(AppState::new(config.clone(), storage, records));

    let router = routes::setup_routes(&config, state.clone());

    Ok((state, router))
}
