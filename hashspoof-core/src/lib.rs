//! Hashspoof Core - digest-prefix search over JPEG images
//!
//! This crate searches for an imperceptibly perturbed version of an image
//! whose re-encoded bytes hash to a digest beginning with a chosen hex prefix.
//!
//! # Features
//!
//! - Single-bit, single-pixel perturbations with an injectable coordinate source
//! - SHA-512 and SHA3-512 digests computed in memory
//! - Attempt and time guardrails instead of an unbounded loop
//! - Stall detection that escalates perturbations when the encoder absorbs them
//! - Parallel workers racing on private raster copies (`parallel` feature)
//! - Perceptual similarity check of the result (`perceptual-hash` feature)
//!
//! # Example
//!
//! ```no_run
//! use hashspoof_core::{
//!     codec, DigestAlgorithm, JpegEncoder, SearchConfig, SearchOutcome, Searcher,
//!     TracingProgress,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let raster = codec::decode(&codec::read_image("photo.jpg".as_ref())?)?;
//!
//! let searcher = Searcher::new(SearchConfig::default().with_max_attempts(Some(1_000_000)));
//! let outcome = searcher.search(
//!     raster,
//!     "00",
//!     &JpegEncoder::default(),
//!     &DigestAlgorithm::Sha512,
//!     &TracingProgress,
//! )?;
//!
//! if let SearchOutcome::Found { digest, encoded, .. } = outcome {
//!     codec::write_image("spoofed.jpg".as_ref(), &encoded)?;
//!     println!("{digest}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod digest;
pub mod error;
#[cfg(feature = "perceptual-hash")]
pub mod perceptual;
pub mod perturb;
pub mod prefix;
pub mod raster;
pub mod search;

// Re-export main types for convenience
pub use codec::{
    decode, is_lossy_path, read_image, write_image, JpegEncoder, RasterEncoder,
    DEFAULT_JPEG_QUALITY,
};
pub use config::SearchConfig;
pub use digest::{DigestAlgorithm, Digester};
pub use error::{Result, SearchFailure, SpoofError};
pub use perturb::{perturb, perturb_many, CoordinateSource, ScriptedCoordinates};
pub use prefix::TargetPrefix;
pub use raster::Raster;
pub use search::{
    search, ExhaustReason, NoProgress, ProgressSink, SearchOutcome, Searcher, TracingProgress,
};

#[cfg(feature = "perceptual-hash")]
pub use perceptual::{is_visually_identical, perceptual_distance, SIMILARITY_THRESHOLD};
