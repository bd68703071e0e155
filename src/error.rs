//! Error types for the swing pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the pipeline
#[derive(Error, Debug)]
pub enum SwingError {
    #[error("Unsupported {role} extension {ext:?} for {path} (expected wav or mp3)")]
    UnsupportedExtension {
        role: &'static str,
        ext: String,
        path: PathBuf,
    },

    #[error("Output path is the same as the input path: {0}")]
    OutputIsInput(PathBuf),

    #[error("Invalid analysis window: window {window}, hop {hop}")]
    InvalidWindow { window: usize, hop: usize },

    #[error("Analysis window of {window} samples exceeds signal length of {len} samples")]
    WindowExceedsInput { window: usize, len: usize },

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Invalid beat grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid stretch rate: {0} (must be finite and positive)")]
    InvalidRate(f32),

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Encoding failed: {reason}")]
    Encode {
        reason: String,
        /// Intermediate WAV kept on disk when an external encoder fails.
        preserved: Option<PathBuf>,
    },
}

/// Result type for swing operations
pub type SwingResult<T> = Result<T, SwingError>;
