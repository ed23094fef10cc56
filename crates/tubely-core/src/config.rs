//! Configuration module
//!
//! Configuration is read once at startup from the environment (and an optional `.env`
//! file) and then passed around as an immutable value.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 8091;
const DB_MAX_CONNECTIONS: u32 = 10;
const MAX_VIDEO_SIZE_MB: usize = 1024;
const MAX_THUMBNAIL_SIZE_MB: usize = 10;
const MEDIA_TOOL_TIMEOUT_SECS: u64 = 300;

/// Settings shared by every HTTP-facing service
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub jwt_secret: String,
}

/// Full service configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub database_url: String,
    pub db_max_connections: u32,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub distribution_host: String,
    pub local_storage_path: Option<String>,
    // Media processing configuration
    pub max_video_size_bytes: usize,
    pub max_thumbnail_size_bytes: usize,
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub media_tool_timeout: Duration,
    pub staging_dir: PathBuf,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let server_port = parse_or(&lookup, "PORT", SERVER_PORT)?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let distribution_host = lookup("S3_CF_DISTRO")
            .ok_or_else(|| anyhow::anyhow!("S3_CF_DISTRO environment variable is required"))?;

        let max_video_size_mb = parse_or(&lookup, "MAX_VIDEO_SIZE_MB", MAX_VIDEO_SIZE_MB)?;
        let max_thumbnail_size_mb =
            parse_or(&lookup, "MAX_THUMBNAIL_SIZE_MB", MAX_THUMBNAIL_SIZE_MB)?;
        let media_tool_timeout_secs =
            parse_or(&lookup, "MEDIA_TOOL_TIMEOUT_SECS", MEDIA_TOOL_TIMEOUT_SECS)?;

        let staging_dir = lookup("STAGING_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        Ok(Config {
            base: BaseConfig {
                server_port,
                environment,
                jwt_secret,
            },
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS)?,
            storage_backend,
            s3_bucket: non_empty(lookup("S3_BUCKET")),
            s3_region: non_empty(lookup("S3_REGION")),
            s3_endpoint: non_empty(lookup("S3_ENDPOINT")),
            distribution_host,
            local_storage_path: non_empty(lookup("LOCAL_STORAGE_PATH")),
            max_video_size_bytes: megabytes("MAX_VIDEO_SIZE_MB", max_video_size_mb)?,
            max_thumbnail_size_bytes: megabytes("MAX_THUMBNAIL_SIZE_MB", max_thumbnail_size_mb)?,
            ffprobe_path: lookup("FFPROBE_PATH").unwrap_or_else(|| "ffprobe".to_string()),
            ffmpeg_path: lookup("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            media_tool_timeout: Duration::from_secs(media_tool_timeout_secs),
            staging_dir,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 && self.is_production() {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters in production"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!("S3_BUCKET is required for the s3 backend"));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!("S3_REGION is required for the s3 backend"));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH is required for the local backend"
                    ));
                }
            }
        }

        if self.distribution_host.trim().is_empty() {
            return Err(anyhow::anyhow!("S3_CF_DISTRO must not be empty"));
        }

        if self.max_video_size_bytes == 0 || self.max_thumbnail_size_bytes == 0 {
            return Err(anyhow::anyhow!("Upload size limits must be greater than zero"));
        }

        if self.media_tool_timeout.is_zero() {
            return Err(anyhow::anyhow!("MEDIA_TOOL_TIMEOUT_SECS must be greater than zero"));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn jwt_secret(&self) -> &str {
        &self.base.jwt_secret
    }

    /// Bucket name reported for the active backend.
    pub fn bucket_name(&self) -> &str {
        match self.storage_backend {
            StorageBackend::S3 => self.s3_bucket.as_deref().unwrap_or_default(),
            StorageBackend::Local => "local",
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn megabytes(key: &str, mb: usize) -> Result<usize, anyhow::Error> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("Value for {} is too large: {} MB", key, mb))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", key, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("JWT_SECRET", "a-test-secret-that-is-long-enough-123"),
            ("DATABASE_URL", "postgres://localhost/tubely"),
            ("S3_BUCKET", "tubely-videos"),
            ("S3_REGION", "us-east-1"),
            ("S3_CF_DISTRO", "d111111abcdef8.cloudfront.net"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&required())).unwrap();
        config.validate().unwrap();

        assert_eq!(config.server_port(), 8091);
        assert_eq!(config.storage_backend, StorageBackend::S3);
        assert_eq!(config.max_video_size_bytes, 1024 * 1024 * 1024);
        assert_eq!(config.max_thumbnail_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.ffprobe_path, "ffprobe");
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.media_tool_timeout, Duration::from_secs(300));
        assert_eq!(config.bucket_name(), "tubely-videos");
    }

    #[test]
    fn test_missing_jwt_secret_is_rejected() {
        let pairs: Vec<_> = required()
            .into_iter()
            .filter(|(k, _)| *k != "JWT_SECRET")
            .collect();
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let mut pairs = required();
        pairs.push(("MAX_VIDEO_SIZE_MB", "lots"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("MAX_VIDEO_SIZE_MB"));
    }

    #[test]
    fn test_oversized_limit_is_rejected() {
        let mut pairs = required();
        pairs.push(("MAX_VIDEO_SIZE_MB", "18446744073709551615"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("MAX_VIDEO_SIZE_MB"));
    }

    #[test]
    fn test_local_backend_requires_path() {
        let mut pairs = required();
        pairs.push(("STORAGE_BACKEND", "local"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.validate().is_err());

        pairs.push(("LOCAL_STORAGE_PATH", "/var/lib/tubely"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        config.validate().unwrap();
        assert_eq!(config.bucket_name(), "local");
    }

    #[test]
    fn test_short_secret_rejected_in_production() {
        let mut pairs: Vec<_> = required()
            .into_iter()
            .filter(|(k, _)| *k != "JWT_SECRET")
            .collect();
        pairs.push(("JWT_SECRET", "short"));
        pairs.push(("ENVIRONMENT", "production"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let mut pairs = required();
        pairs.extend([
            ("PORT", "9000"),
            ("FFMPEG_PATH", "/usr/local/bin/ffmpeg"),
            ("MEDIA_TOOL_TIMEOUT_SECS", "30"),
            ("STAGING_DIR", "/tmp/tubely"),
            ("S3_ENDPOINT", ""),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.server_port(), 9000);
        assert_eq!(config.ffmpeg_path, "/usr/local/bin/ffmpeg");
        assert_eq!(config.media_tool_timeout, Duration::from_secs(30));
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/tubely"));
        assert_eq!(config.s3_endpoint, None);
    }
}
