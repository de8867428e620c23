//! Error types for the change detection pipeline.

use thiserror::Error;

/// Everything that can stop an analysis run.
///
/// Empty results, identical inputs and very large change percentages are valid
/// outputs and never show up here.
#[derive(Error, Debug)]
pub enum Error {
    /// One of the input buffers is not a decodable raster image.
    #[error("could not decode {role} image: {reason}")]
    Decode { role: &'static str, reason: String },

    /// An image with no pixels reached a stage that divides by its area.
    #[error("invalid image dimensions: {width}x{height}")]
    Dimension { width: u32, height: u32 },

    /// A pipeline bug: a stage produced output that breaks a stage contract.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// A visualization could not be encoded.
    #[error("could not encode image: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker pool was shut down before it could answer.
    #[error("analysis worker pool is not running")]
    PoolClosed,
}

impl Error {
    /// True when the caller sent bad input, as opposed to the pipeline failing.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::Decode { .. } | Error::Dimension { .. })
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
