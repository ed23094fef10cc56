use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::Serialize;

/// Coarse orientation of a video frame, used as the storage prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationCategory {
    Landscape,
    Portrait,
    Other,
}

impl OrientationCategory {
    /// Classify a frame by its pixel dimensions.
    ///
    /// Only exact 16:9 and 9:16 frames (after integer truncation) are
    /// recognized; every other shape, including square, is `Other`.
    pub fn classify(width: u32, height: u32) -> Self {
        let (width, height) = (u64::from(width), u64::from(height));
        if width == (16 * height) / 9 {
            OrientationCategory::Landscape
        } else if height == (16 * width) / 9 {
            OrientationCategory::Portrait
        } else {
            OrientationCategory::Other
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            OrientationCategory::Landscape => "landscape",
            OrientationCategory::Portrait => "portrait",
            OrientationCategory::Other => "other",
        }
    }
}

impl Display for OrientationCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.prefix())
    }
}
