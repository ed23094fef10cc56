//! Stream probing via `ffprobe`.

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::command::{run_tool, ToolError};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Could not parse ffprobe output: {source}")]
    InvalidOutput {
        #[source]
        source: serde_json::Error,
        stderr: String,
    },

    #[error("No streams found in media file")]
    NoStreams { stderr: String },
}

impl ProbeError {
    /// Diagnostic output ffprobe wrote while producing the failing report.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ProbeError::Tool(tool) => tool.stderr(),
            ProbeError::InvalidOutput { stderr, .. } | ProbeError::NoStreams { stderr } => {
                Some(stderr)
            }
        }
    }
}

/// Structural metadata of the first stream in a media file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaProbeResult {
    pub width: u32,
    pub height: u32,
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub display_aspect_ratio: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    codec_name: Option<String>,
    codec_type: Option<String>,
    display_aspect_ratio: Option<String>,
}

/// Decode `ffprobe -print_format json -show_streams` output.
///
/// `stderr` is what ffprobe printed alongside the report; it is attached to
/// any error so the cause can be logged.
pub fn parse_probe_output(stdout: &[u8], stderr: &str) -> Result<MediaProbeResult, ProbeError> {
    let report: ProbeReport =
        serde_json::from_slice(stdout).map_err(|source| ProbeError::InvalidOutput {
            source,
            stderr: stderr.to_string(),
        })?;
    let stream = report
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| ProbeError::NoStreams {
            stderr: stderr.to_string(),
        })?;

    Ok(MediaProbeResult {
        width: stream.width,
        height: stream.height,
        codec_name: stream.codec_name,
        codec_type: stream.codec_type,
        display_aspect_ratio: stream.display_aspect_ratio,
    })
}

#[derive(Debug, Clone)]
pub struct StreamProber {
    ffprobe_path: String,
    timeout: Duration,
}

impl StreamProber {
    pub fn new(ffprobe_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    pub async fn probe(&self, path: &Path) -> Result<MediaProbeResult, ProbeError> {
        let start = std::time::Instant::now();

        let output = run_tool(
            &self.ffprobe_path,
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-print_format"),
                OsStr::new("json"),
                OsStr::new("-show_streams"),
                path.as_os_str(),
            ],
            self.timeout,
        )
        .await?;

        let result = parse_probe_output(&output.stdout, &output.stderr)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            width = result.width,
            height = result.height,
            codec = result.codec_name.as_deref().unwrap_or("unknown"),
            "Video probe completed"
        );

        Ok(result)
    }
}
