use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// S3 storage implementation
///
/// Objects are written through a buffered multipart writer, so large videos are
/// streamed in parts rather than held in memory.
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        // Credentials come from the standard AWS environment variables.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self::with_store(bucket, Arc::new(store)))
    }

    /// Wrap an already-configured object store.
    pub fn with_store(bucket: String, store: Arc<dyn ObjectStore>) -> Self {
        S3Storage { store, bucket }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put_stream(
        &self,
        storage_key: &str,
        content_type: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64> {
        validate_key(storage_key)?;

        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());

        let mut writer =
            BufWriter::new(Arc::clone(&self.store), location).with_attributes(attributes);

        let result = match tokio::io::copy(reader, &mut writer).await {
            Ok(size) => writer.shutdown().await.map(|_| size),
            Err(e) => Err(e),
        };

        let size = match result {
            Ok(size) => size,
            Err(e) => {
                // Abort any in-flight multipart upload so no partial object remains.
                if let Err(abort_err) = writer.abort().await {
                    tracing::warn!(
                        error = %abort_err,
                        bucket = %self.bucket,
                        key = %storage_key,
                        "S3 multipart abort failed"
                    );
                }
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream upload failed"
                );
                return Err(StorageError::UploadFailed(e.to_string()));
            }
        };

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 stream upload successful"
        );

        Ok(size)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use object_store::ObjectStoreExt;

    fn in_memory() -> (S3Storage, Arc<InMemory>) {
        let store = Arc::new(InMemory::new());
        let storage = S3Storage::with_store("tubely-test".to_string(), store.clone());
        (storage, store)
    }

    #[tokio::test]
    async fn test_put_stream_writes_object_with_content_type() {
        let (storage, store) = in_memory();
        let body = b"not really an mp4 but close enough".to_vec();
        let mut reader = std::io::Cursor::new(body.clone());

        let written = storage
            .put_stream("landscape/abc.mp4", "video/mp4", &mut reader)
            .await
            .unwrap();
        assert_eq!(written, body.len() as u64);

        let object = store
            .get(&Path::from("landscape/abc.mp4"))
            .await
            .unwrap();
        let content_type = object
            .attributes
            .get(&Attribute::ContentType)
            .map(|v| AsRef::<str>::as_ref(v).to_string());
        assert_eq!(content_type.as_deref(), Some("video/mp4"));
        assert_eq!(object.bytes().await.unwrap().to_vec(), body);
    }

    #[tokio::test]
    async fn test_put_stream_rejects_traversal_keys() {
        let (storage, _store) = in_memory();
        let mut reader = std::io::Cursor::new(Vec::<u8>::new());
        let err = storage
            .put_stream("../escape.mp4", "video/mp4", &mut reader)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_failed_read_leaves_no_object() {
        struct FailingReader;

        impl AsyncRead for FailingReader {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::other("disk went away")))
            }
        }

        let (storage, store) = in_memory();
        let err = storage
            .put_stream("other/abc.mp4", "video/mp4", &mut FailingReader)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed(_)));
        assert!(store.head(&Path::from("other/abc.mp4")).await.is_err());
    }

    #[test]
    fn test_backend_metadata() {
        let (storage, _store) = in_memory();
        assert_eq!(storage.bucket(), "tubely-test");
        assert_eq!(storage.backend_type(), StorageBackend::S3);
    }
}
