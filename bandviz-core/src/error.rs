//! # Error Types
//!
//! Errors surfaced by the analysis pipeline. Per-frame conditions (an empty
//! band, a missing capture buffer, silence) are never errors; only the cases
//! below leave the pipeline as a `Result`.

use thiserror::Error;

/// Errors raised by the pipeline and its stages.
#[derive(Debug, Error)]
pub enum VisualizerError {
    /// The capture side negotiated something other than 32-bit float samples.
    #[error("unexpected format: expected F32; got {0}")]
    UnsupportedFormat(String),

    /// The negotiated format is unusable, e.g. zero channels.
    #[error("invalid audio format: {0}")]
    InvalidFormat(String),

    /// The planned real-input FFT rejected its buffers.
    #[error("spectral transform failed: {0}")]
    Transform(#[from] realfft::FftError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while loading, saving or validating a [`crate::config::VisualizerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the pipeline cannot run with.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Raised by [`crate::bar::BarRenderer::render_into`] when the caller breaks its
/// buffer precondition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("bar buffer too small: need {needed} cells, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
}
