use std::fmt::{Display, Formatter, Result as FmtResult};

use tubely_storage::StorageError;

use crate::probe::ProbeError;
use crate::remux::RemuxError;
use crate::validator::ValidationError;

/// Pipeline step at which an upload failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Staging,
    Probe,
    Remux,
    Publish,
    RecordUpdate,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Stage::Validation => "validation",
            Stage::Staging => "staging",
            Stage::Probe => "probe",
            Stage::Remux => "remux",
            Stage::Publish => "publish",
            Stage::RecordUpdate => "record_update",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Staging failed: {0}")]
    Staging(#[source] std::io::Error),

    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("Remux failed: {0}")]
    Remux(#[from] RemuxError),

    #[error("Publish failed: {0}")]
    Publish(#[from] StorageError),

    #[error("Record update failed for published asset {key}")]
    RecordUpdate {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Validation(_) => Stage::Validation,
            PipelineError::Staging(_) => Stage::Staging,
            PipelineError::Probe(_) => Stage::Probe,
            PipelineError::Remux(_) => Stage::Remux,
            PipelineError::Publish(_) => Stage::Publish,
            PipelineError::RecordUpdate { .. } => Stage::RecordUpdate,
        }
    }

    /// Tool diagnostics attached to probe and remux failures
    pub fn tool_stderr(&self) -> Option<&str> {
        match self {
            PipelineError::Probe(probe) => probe.stderr(),
            PipelineError::Remux(RemuxError::Tool(tool)) => tool.stderr(),
            _ => None,
        }
    }
}
