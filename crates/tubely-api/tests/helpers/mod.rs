//! Shared harness for API integration tests.
//!
//! The router runs against in-memory doubles for the record store and object
//! storage, with shell scripts standing in for ffprobe and ffmpeg.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::Utc;
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt};
use tubely_api::{auth::make_jwt, setup_routes, AppState};
use tubely_core::{models::Video, Config};
use tubely_processing::VideoRecordStore;
use tubely_storage::{Storage, StorageBackend, StorageResult};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-min-32-characters-long-for-testing";
pub const DISTRIBUTION_HOST: &str = "d111111abcdef8.cloudfront.net";
pub const BUCKET: &str = "tubely-test";

pub const COPY_REMUX: &str = r#"cp "$2" "$9""#;

#[derive(Default)]
pub struct RecordingStorage {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl RecordingStorage {
    pub fn object(&self, key: &str) -> Option<(String, Vec<u8>)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn put_stream(
        &self,
        storage_key: &str,
        content_type: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64> {
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await?;
        let size = body.len() as u64;
        self.objects
            .lock()
            .unwrap()
            .insert(storage_key.to_string(), (content_type.to_string(), body));
        Ok(size)
    }

    fn bucket(&self) -> &str {
        BUCKET
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[derive(Default)]
pub struct InMemoryRecords {
    videos: Mutex<HashMap<Uuid, Video>>,
}

impl InMemoryRecords {
    pub fn insert(&self, video: Video) {
        self.videos.lock().unwrap().insert(video.id, video);
    }

    pub fn get(&self, id: Uuid) -> Option<Video> {
        self.videos.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl VideoRecordStore for InMemoryRecords {
    async fn get_video(&self, id: Uuid) -> anyhow::Result<Option<Video>> {
        Ok(self.get(id))
    }

    async fn update_video(&self, video: &Video) -> anyhow::Result<Video> {
        let mut videos = self.videos.lock().unwrap();
        if !videos.contains_key(&video.id) {
            anyhow::bail!("video {} not found", video.id);
        }
        let mut stored = video.clone();
        stored.updated_at = Utc::now();
        videos.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<RecordingStorage>,
    pub records: Arc<InMemoryRecords>,
    pub staging_dir: PathBuf,
    _tools: TempDir,
    _staging: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Insert a video record owned by `user_id`.
    pub fn seed_video(&self, user_id: Uuid) -> Video {
        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            title: "Boots on the ground".to_string(),
            description: Some("Field footage".to_string()),
            thumbnail_url: None,
            video_url: None,
            user_id,
        };
        self.records.insert(video.clone());
        video
    }

    pub fn staged_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.staging_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub fn token_for(user_id: Uuid) -> String {
    make_jwt(user_id, JWT_SECRET, chrono::Duration::hours(1)).expect("Failed to sign test token")
}

pub fn probe_script(width: u32, height: u32) -> String {
    format!(
        "cat <<'JSON'\n{{\"streams\": [{{\"codec_name\": \"h264\", \"codec_type\": \"video\", \"width\": {}, \"height\": {}}}]}}\nJSON",
        width, height
    )
}

fn write_tool(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().to_string()
}

/// Start the router with a 1920x1080 probe result and a copying remuxer.
pub fn setup_test_app() -> TestApp {
    setup_test_app_with(&probe_script(1920, 1080), COPY_REMUX)
}

pub fn setup_test_app_with(ffprobe: &str, ffmpeg: &str) -> TestApp {
    let tools = tempfile::tempdir().expect("Failed to create tools dir");
    let staging = tempfile::tempdir().expect("Failed to create staging dir");
    let staging_dir = staging.path().join("uploads");

    let ffprobe_path = write_tool(tools.path(), "ffprobe", ffprobe);
    let ffmpeg_path = write_tool(tools.path(), "ffmpeg", ffmpeg);
    let staging_value = staging_dir.to_string_lossy().to_string();

    let config = Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        "DATABASE_URL" => Some("postgres://localhost/tubely_test".to_string()),
        "S3_BUCKET" => Some(BUCKET.to_string()),
        "S3_REGION" => Some("us-east-1".to_string()),
        "S3_CF_DISTRO" => Some(DISTRIBUTION_HOST.to_string()),
        "MAX_VIDEO_SIZE_MB" => Some("1".to_string()),
        "MAX_THUMBNAIL_SIZE_MB" => Some("1".to_string()),
        "MEDIA_TOOL_TIMEOUT_SECS" => Some("10".to_string()),
        "FFPROBE_PATH" => Some(ffprobe_path.clone()),
        "FFMPEG_PATH" => Some(ffmpeg_path.clone()),
        "STAGING_DIR" => Some(staging_value.clone()),
        _ => None,
    })
    .expect("Failed to build test config");
    config.validate().expect("Test config should be valid");

    let storage = Arc::new(RecordingStorage::default());
    let records = Arc::new(InMemoryRecords::default());
    let state = Arc::new(AppState::new(config.clone(), storage.clone(), records.clone()));

    let app = setup_routes(&config, state);
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        storage,
        records,
        staging_dir,
        _tools: tools,
        _staging: staging,
    }
}
