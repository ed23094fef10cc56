//! Local staging of inbound uploads.
//!
//! Every staged file is held through a [`TempPath`], so it is removed when its
//! owner goes out of scope: normal return, early `?` return, or a dropped
//! request future.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tubely_core::constants::{PROCESSING_SUFFIX, STAGING_FILE_PREFIX};

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Staging I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Upload exceeds the {max_bytes} byte limit")]
    TooLarge { max_bytes: u64 },
}

/// Directory in which upload sessions stage their files.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Copy `reader` into a fresh, uniquely named file.
    ///
    /// At most `max_bytes` are accepted; a longer stream fails with
    /// [`StagingError::TooLarge`] and the partial file is removed.
    pub async fn stage(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        max_bytes: u64,
    ) -> Result<StagedFile, StagingError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let (file, path) = tempfile::Builder::new()
            .prefix(STAGING_FILE_PREFIX)
            .suffix(".mp4")
            .tempfile_in(&self.dir)?
            .into_parts();
        let mut file = File::from_std(file);

        // One byte past the cap is enough to tell an oversized stream apart.
        let mut limited = reader.take(max_bytes.saturating_add(1));
        let size = tokio::io::copy(&mut limited, &mut file).await?;
        if size > max_bytes {
            return Err(StagingError::TooLarge { max_bytes });
        }

        file.flush().await?;
        file.sync_all().await?;
        file.rewind().await?;

        tracing::debug!(
            path = %path.display(),
            size_bytes = size,
            "Upload staged"
        );

        Ok(StagedFile { path, size })
    }
}

/// A local file owned exclusively by one upload session.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    size: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reserve `<staged>.processing` under the same ownership guard.
    ///
    /// Nothing is created on disk; the guard removes whatever a tool later
    /// writes there.
    pub fn reserve_remuxed(&self) -> StagedFile {
        let mut derived = OsString::from(self.path.as_os_str());
        derived.push(PROCESSING_SUFFIX);
        StagedFile {
            path: TempPath::from_path(PathBuf::from(derived)),
            size: 0,
        }
    }

    pub(crate) fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    /// Remove the file now and report the outcome.
    ///
    /// A file that was never written counts as released.
    pub fn release(self) -> io::Result<()> {
        match self.path.close() {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged_entries(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    #[tokio::test]
    async fn test_stage_copies_stream() {
        let temp_dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(temp_dir.path());
        let mut reader = std::io::Cursor::new(b"\x00\x00\x00\x18ftypmp42".to_vec());

        let staged = area.stage(&mut reader, 1024).await.unwrap();

        assert_eq!(staged.size(), 12);
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"\x00\x00\x00\x18ftypmp42");
        let name = staged.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("tubely-upload."));
        assert!(name.ends_with(".mp4"));
    }

    #[tokio::test]
    async fn test_stage_rejects_oversized_stream() {
        let temp_dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(temp_dir.path());
        let mut reader = std::io::Cursor::new(vec![7u8; 64]);

        let err = area.stage(&mut reader, 63).await.unwrap_err();

        assert!(matches!(err, StagingError::TooLarge { max_bytes: 63 }));
        assert!(staged_entries(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_stage_accepts_stream_at_limit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(temp_dir.path());
        let mut reader = std::io::Cursor::new(vec![7u8; 64]);

        let staged = area.stage(&mut reader, 64).await.unwrap();
        assert_eq!(staged.size(), 64);
    }

    #[tokio::test]
    async fn test_drop_and_release_remove_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(temp_dir.path());

        let dropped = area
            .stage(&mut std::io::Cursor::new(vec![1u8; 8]), 1024)
            .await
            .unwrap();
        drop(dropped);
        assert!(staged_entries(temp_dir.path()).is_empty());

        let released = area
            .stage(&mut std::io::Cursor::new(vec![1u8; 8]), 1024)
            .await
            .unwrap();
        released.release().unwrap();
        assert!(staged_entries(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_reserved_remux_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(temp_dir.path());
        let staged = area
            .stage(&mut std::io::Cursor::new(vec![1u8; 8]), 1024)
            .await
            .unwrap();

        let remuxed = staged.reserve_remuxed();
        let expected = format!("{}.processing", staged.path().display());
        assert_eq!(remuxed.path().to_string_lossy(), expected);
        assert!(!remuxed.path().exists());

        std::fs::write(remuxed.path(), b"partial output").unwrap();
        drop(remuxed);
        drop(staged);
        assert!(staged_entries(temp_dir.path()).is_empty());

        // Releasing a reservation that was never written is not an error.
        let staged = area
            .stage(&mut std::io::Cursor::new(vec![1u8; 8]), 1024)
            .await
            .unwrap();
        staged.reserve_remuxed().release().unwrap();
    }
}
