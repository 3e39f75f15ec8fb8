//! Error taxonomy for the denoising entry points.
//!
//! Every error is raised eagerly at call entry, before any pixel is
//! processed, so a failed call never leaves a partially written
//! destination image.

use thiserror::Error;

/// Errors reported by the NLM engines and the color pipeline.
#[derive(Debug, Error)]
pub enum NlmError {
    /// Filter strength or window geometry is out of contract:
    /// non-positive `h`, even or non-positive `search_window`/`block_size`,
    /// `search_window < block_size`, or an empty image.
    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    /// The color pipeline requires exactly 3 interleaved channels.
    #[error("expected a 3-channel image, got {channels} channel(s)")]
    InvalidChannelCount { channels: usize },

    /// An integer border-mode code outside the supported enumeration.
    #[error("unsupported border mode code {code}")]
    UnsupportedBorderMode { code: i32 },
}

pub type Result<T> = std::result::Result<T, NlmError>;

impl NlmError {
    pub(crate) fn invalid_parameter(reason: impl Into<String>) -> Self {
        NlmError::InvalidParameter {
            reason: reason.into(),
        }
    }
}
