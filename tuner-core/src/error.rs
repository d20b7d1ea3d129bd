//! Error types for the tuner core

use thiserror::Error;

/// Failures reported by the pitch pipeline.
///
/// Per-block failures (`InvalidFrameLength`, `NoVoicedSegment`,
/// `DegenerateInput`) are recoverable: the caller skips the block and waits
/// for the next one. The remaining variants come from building a tracker or a
/// note table with bad configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TunerError {
    /// Block or frame shorter than one analysis frame
    #[error("Invalid frame length: {len} samples, need at least {required}")]
    InvalidFrameLength { len: usize, required: usize },

    /// Every frame of the block was unvoiced
    #[error("No voiced segment in block")]
    NoVoicedSegment,

    /// Frame energy too low for a meaningful difference function
    #[error("Degenerate input: frame energy is effectively zero")]
    DegenerateInput,

    /// Sample rate of zero
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Analysis parameters out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Note table empty or not strictly increasing
    #[error("Invalid note table: {0}")]
    InvalidNoteTable(String),
}

/// Result type for tuner operations
pub type TunerResult<T> = Result<T, TunerError>;
