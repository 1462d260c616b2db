use std::path::PathBuf;

use thiserror::Error;

use crate::raster::Raster;

#[derive(Error, Debug)]
pub enum SpoofError {
    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Invalid prefix character {found:?} at position {position} (expected 0-9a-f)")]
    InvalidPrefix { found: char, position: usize },

    #[error("Prefix of {len} hex characters exceeds the {max}-character digest")]
    PrefixTooLong { len: usize, max: usize },

    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encoding failure: {0}")]
    EncodingFailure(String),

    #[error("Digest failure: {0}")]
    DigestFailure(String),

    #[error("Perceptual hash error: {0}")]
    PerceptualHash(String),

    #[error("Failed to read file: {}", .path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output image: {}", .path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SpoofError>;

/// A search that stopped on an error.
///
/// Keeps the raster and attempt count as they were when the error surfaced so
/// callers can inspect them. Nothing is written for a failed search.
#[derive(Error, Debug)]
#[error("Search aborted after {attempts} attempts: {error}")]
pub struct SearchFailure {
    #[source]
    pub error: SpoofError,
    pub attempts: u64,
    pub raster: Raster,
}

impl SearchFailure {
    pub fn new(error: SpoofError, attempts: u64, raster: Raster) -> Self {
        Self {
            error,
            attempts,
            raster,
        }
    }
}
