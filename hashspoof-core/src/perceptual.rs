//! Perceptual similarity between rasters.
//!
//! Confirms that a perturbed raster still looks like the original. Uses the
//! Blockhash algorithm, which produces a 64-bit (8 byte) fingerprint that is
//! stable under small pixel changes and JPEG re-encoding.
//!
//! # Usage
//!
//! ```no_run
//! use hashspoof_core::perceptual::{perceptual_distance, SIMILARITY_THRESHOLD};
//! use hashspoof_core::Raster;
//!
//! let before = Raster::filled(64, 64, 0x336699).unwrap();
//! let mut after = before.clone();
//! after.set(3, 4, 0x336698).unwrap();
//!
//! let distance = perceptual_distance(&before, &after)?;
//! assert!(distance <= SIMILARITY_THRESHOLD);
//! # Ok::<(), hashspoof_core::SpoofError>(())
//! ```

use blockhash::{blockhash64, Blockhash64};
use image::DynamicImage;

use crate::error::{Result, SpoofError};
use crate::raster::Raster;

/// Fixed hash size in bytes (64 bits = 8 bytes).
pub const PERCEPTUAL_HASH_SIZE: usize = 8;

/// Maximum Hamming distance at which two rasters count as visually identical.
/// With a 64-bit hash, 10 bits is roughly a 15% difference.
pub const SIMILARITY_THRESHOLD: u32 = 10;

/// Blockhash64 fingerprint of a raster.
pub fn perceptual_hash(raster: &Raster) -> [u8; PERCEPTUAL_HASH_SIZE] {
    let image = DynamicImage::ImageRgb8(raster.to_rgb_image());
    let hash: Blockhash64 = blockhash64(&image);
    hash.into()
}

/// Hamming distance between the perceptual hashes of two rasters.
pub fn perceptual_distance(a: &Raster, b: &Raster) -> Result<u32> {
    fingerprint_distance(&perceptual_hash(a), &perceptual_hash(b))
}

/// Whether two rasters are within [`SIMILARITY_THRESHOLD`] of each other.
pub fn is_visually_identical(a: &Raster, b: &Raster) -> Result<bool> {
    Ok(perceptual_distance(a, b)? <= SIMILARITY_THRESHOLD)
}

fn fingerprint_distance(a: &[u8], b: &[u8]) -> Result<u32> {
    if a.is_empty() || b.is_empty() {
        return Err(SpoofError::PerceptualHash(
            "Cannot compare empty hashes".into(),
        ));
    }
    hamming_distance(a, b).ok_or_else(|| {
        SpoofError::PerceptualHash("Failed to compute Hamming distance".into())
    })
}

/// Compute Hamming distance between two hash byte arrays.
///
/// When sizes differ, compares the overlapping portion and adds a penalty of 8
/// bits per byte of size difference.
///
/// # Returns
///
/// The number of differing bits (including size penalty), or `None` if either
/// array is empty.
pub fn hamming_distance(hash1: &[u8], hash2: &[u8]) -> Option<u32> {
    if hash1.is_empty() || hash2.is_empty() {
        return None;
    }

    let min_len = hash1.len().min(hash2.len());

    let distance: u32 = hash1[..min_len]
        .iter()
        .zip(hash2[..min_len].iter())
        .map(|(a, b)| (a ^ b).count_ones())
        .sum();

    let size_penalty = (hash1.len().abs_diff(hash2.len()) * 8) as u32;

    Some(distance + size_penalty)
}
