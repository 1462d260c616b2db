//! In-memory pixel grid the search mutates.
//!
//! Pixels are stored row-major as packed `0x00RRGGBB` integers, so the least
//! significant bit of a stored value is the least significant bit of the blue
//! channel.

use image::{DynamicImage, Rgb, RgbImage};

use crate::error::{Result, SpoofError};

/// Mask of the color bits inside a packed pixel.
pub const RGB_MASK: u32 = 0x00FF_FFFF;

/// Width x height grid of packed RGB pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Raster {
    /// Create a raster from row-major packed pixels.
    pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SpoofError::InvalidDimensions { width, height });
        }
        if pixels.len() as u64 != u64::from(width) * u64::from(height) {
            return Err(SpoofError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create a raster with every pixel set to `color`.
    pub fn filled(width: u32, height: u32, color: u32) -> Result<Self> {
        let len = (width as usize).saturating_mul(height as usize);
        Self::new(width, height, vec![color & RGB_MASK; len])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Packed value at `(x, y)`, or `None` when out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Store `value` at `(x, y)` exactly as given.
    pub fn set(&mut self, x: u32, y: u32, value: u32) -> Result<()> {
        let i = self.index(x, y).ok_or(SpoofError::InvalidDimensions {
            width: self.width,
            height: self.height,
        })?;
        self.pixels[i] = value;
        Ok(())
    }

    /// Number of coordinates whose stored values differ from `other`.
    ///
    /// Rasters of different dimensions differ everywhere.
    pub fn diff_count(&self, other: &Raster) -> usize {
        if self.width != other.width || self.height != other.height {
            return self.pixels.len().max(other.pixels.len());
        }
        self.pixels
            .iter()
            .zip(&other.pixels)
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Convert to an 8-bit RGB image buffer.
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let packed = self.pixels[y as usize * self.width as usize + x as usize];
            Rgb([(packed >> 16) as u8, (packed >> 8) as u8, packed as u8])
        })
    }
}

impl From<&RgbImage> for Raster {
    fn from(image: &RgbImage) -> Self {
        let pixels = image
            .pixels()
            .map(|Rgb([r, g, b])| (u32::from(*r) << 16) | (u32::from(*g) << 8) | u32::from(*b))
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }
}

impl TryFrom<&DynamicImage> for Raster {
    type Error = SpoofError;

    /// Alpha is dropped; other color types are converted to 8-bit RGB.
    fn try_from(image: &DynamicImage) -> Result<Self> {
        let rgb = image.to_rgb8();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(SpoofError::InvalidDimensions {
                width: rgb.width(),
                height: rgb.height(),
            });
        }
        Ok(Raster::from(&rgb))
    }
}
