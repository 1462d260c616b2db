//! Decoder and encoder collaborators backed by the `image` crate.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg;
use tracing::debug;

use crate::error::{Result, SpoofError};
use crate::raster::Raster;

/// Default JPEG quality used when re-encoding.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// File extensions recognized as the lossy raster format.
pub const LOSSY_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Raster to compressed byte stream.
pub trait RasterEncoder: Send + Sync {
    fn encode(&self, raster: &Raster) -> Result<Vec<u8>>;
}

/// Decode a compressed image into a raster.
pub fn decode(bytes: &[u8]) -> Result<Raster> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| SpoofError::Decode(format!("Failed to decode image: {e}")))?;
    let raster = Raster::try_from(&image)?;
    debug!(
        width = raster.width(),
        height = raster.height(),
        "Decoded raster"
    );
    Ok(raster)
}

/// Read an image file into memory.
pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|source| SpoofError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read image file");
    Ok(bytes)
}

/// Write encoded image bytes to `path`, replacing any existing file.
pub fn write_image(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|source| SpoofError::WriteOutput {
        path: path.to_path_buf(),
        source,
    })
}

/// Whether `path` names a JPEG file, judged by extension only.
pub fn is_lossy_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| LOSSY_EXTENSIONS.contains(&ext.as_str()))
}

/// Baseline JPEG encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    /// Create an encoder; `quality` is clamped to `1..=100`.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl RasterEncoder for JpegEncoder {
    fn encode(&self, raster: &Raster) -> Result<Vec<u8>> {
        let image = raster.to_rgb_image();
        let mut buffer = Cursor::new(Vec::new());
        let encoder = jpeg::JpegEncoder::new_with_quality(&mut buffer, self.quality);
        image
            .write_with_encoder(encoder)
            .map_err(|e| SpoofError::EncodingFailure(format!("JPEG encoding failed: {e}")))?;
        Ok(buffer.into_inner())
    }
}
