//! Tubely Processing Library
//!
//! This crate implements the video upload pipeline: staging an inbound stream
//! to a local file, probing it with `ffprobe`, classifying its orientation,
//! remuxing it with `ffmpeg` for fast start, and publishing the result to
//! object storage.

pub mod aspect;
pub mod command;
pub mod error;
pub mod pipeline;
pub mod probe;
pub mod publish;
pub mod remux;
pub mod staging;
pub mod validator;
pub mod video_store;

// Re-export commonly used types
pub use aspect::OrientationCategory;
pub use command::{run_tool, ToolError, ToolOutput};
pub use error::{PipelineError, Stage};
pub use pipeline::{PipelineConfig, PipelineState, UploadOutcome, UploadPipeline, UploadSession};
pub use probe::{parse_probe_output, MediaProbeResult, ProbeError, StreamProber};
pub use publish::Publisher;
pub use remux::{ContainerRemuxer, RemuxError};
pub use staging::{StagedFile, StagingArea, StagingError};
pub use validator::{media_type_essence, UploadValidator, ValidationError};
pub use video_store::VideoRecordStore;
