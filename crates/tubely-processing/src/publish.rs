use std::path::Path;
use std::sync::Arc;

use tubely_storage::{AssetKey, Storage, StorageResult};

/// Streams finalized files to object storage and derives their public URL.
#[derive(Clone)]
pub struct Publisher {
    storage: Arc<dyn Storage>,
    distribution_host: String,
}

impl Publisher {
    pub fn new(storage: Arc<dyn Storage>, distribution_host: impl Into<String>) -> Self {
        Self {
            storage,
            distribution_host: distribution_host.into(),
        }
    }

    /// Upload the file at `path` under `key` and return its locator.
    pub async fn publish(
        &self,
        path: &Path,
        key: &AssetKey,
        content_type: &str,
    ) -> StorageResult<String> {
        let mut file = tokio::fs::File::open(path).await?;
        let size = self
            .storage
            .put_stream(key.as_str(), content_type, &mut file)
            .await?;

        let locator = self.locator(key);
        tracing::info!(
            bucket = %self.storage.bucket(),
            key = %key,
            size_bytes = size,
            url = %locator,
            "Video published"
        );

        Ok(locator)
    }

    /// `https://<distribution-host>/<key>`
    pub fn locator(&self, key: &AssetKey) -> String {
        let host = self.distribution_host.trim_end_matches('/');
        if host.starts_with("https://") || host.starts_with("http://") {
            format!("{}/{}", host, key)
        } else {
            format!("https://{}/{}", host, key)
        }
    }
}
