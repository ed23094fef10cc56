//! Fast-start container remuxing via `ffmpeg`.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;

use crate::command::{run_tool, ToolError};
use crate::staging::StagedFile;

#[derive(Debug, thiserror::Error)]
pub enum RemuxError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Remuxed output missing at {path}: {source}")]
    MissingOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Remuxed output at {0} is empty")]
    EmptyOutput(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ContainerRemuxer {
    ffmpeg_path: String,
    timeout: Duration,
}

impl ContainerRemuxer {
    pub fn new(ffmpeg_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
        }
    }

    /// Rewrite `input` with its index at the front, copying every stream as is.
    ///
    /// The output is `<input>.processing`, owned by the returned [`StagedFile`].
    #[tracing::instrument(skip(self, input), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "remux",
        input = %input.path().display()
    ))]
    pub async fn remux(&self, input: &StagedFile) -> Result<StagedFile, RemuxError> {
        let start = std::time::Instant::now();
        let mut output = input.reserve_remuxed();

        run_tool(
            &self.ffmpeg_path,
            [
                OsStr::new("-i"),
                input.path().as_os_str(),
                OsStr::new("-movflags"),
                OsStr::new("faststart"),
                OsStr::new("-codec"),
                OsStr::new("copy"),
                OsStr::new("-f"),
                OsStr::new("mp4"),
                output.path().as_os_str(),
            ],
            self.timeout,
        )
        .await?;

        let metadata = tokio::fs::metadata(output.path())
            .await
            .map_err(|source| RemuxError::MissingOutput {
                path: output.path().to_path_buf(),
                source,
            })?;
        if metadata.len() == 0 {
            return Err(RemuxError::EmptyOutput(output.path().to_path_buf()));
        }
        output.set_size(metadata.len());

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            input_bytes = input.size(),
            output_bytes = metadata.len(),
            "Video remux completed"
        );

        Ok(output)
    }
}
