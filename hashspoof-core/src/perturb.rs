//! Perturbation generator.
//!
//! One perturbation toggles the least significant bit of a single pixel's
//! packed value (the blue channel LSB), which is visually imperceptible for
//! 8-bit imagery. Coordinates come from an injectable [`CoordinateSource`], so
//! tests can drive the walk deterministically while production runs use an
//! OS-seeded RNG.

use rand::Rng;

use crate::error::{Result, SpoofError};
use crate::raster::Raster;

/// Bit toggled by every perturbation.
pub const PERTURBATION_BIT: u32 = 0x0000_0001;

/// Source of pixel coordinates for the perturbation generator.
pub trait CoordinateSource {
    /// Pick a coordinate in `[0, width) x [0, height)`.
    ///
    /// Callers guarantee `width >= 1` and `height >= 1`.
    fn next_coordinate(&mut self, width: u32, height: u32) -> (u32, u32);
}

impl<R: Rng> CoordinateSource for R {
    fn next_coordinate(&mut self, width: u32, height: u32) -> (u32, u32) {
        (self.random_range(0..width), self.random_range(0..height))
    }
}

/// Toggle the LSB of one randomly chosen pixel, returning the coordinate touched.
///
/// Coordinates are drawn independently on every call; repeats are expected
/// and a repeat on the same pixel reverts the previous toggle.
pub fn perturb<S>(raster: &mut Raster, source: &mut S) -> Result<(u32, u32)>
where
    S: CoordinateSource + ?Sized,
{
    let (width, height) = (raster.width(), raster.height());
    if width == 0 || height == 0 {
        return Err(SpoofError::InvalidDimensions { width, height });
    }

    let (x, y) = source.next_coordinate(width, height);
    let value = raster
        .get(x, y)
        .ok_or(SpoofError::InvalidDimensions { width, height })?;
    raster.set(x, y, value ^ PERTURBATION_BIT)?;
    Ok((x, y))
}

/// Apply `count` independent perturbations.
pub fn perturb_many<S>(raster: &mut Raster, source: &mut S, count: u32) -> Result<()>
where
    S: CoordinateSource + ?Sized,
{
    for _ in 0..count {
        perturb(raster, source)?;
    }
    Ok(())
}

/// Replays a fixed list of coordinates, cycling when exhausted.
///
/// Useful for reproducing a walk exactly; an empty list always yields `(0, 0)`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCoordinates {
    coordinates: Vec<(u32, u32)>,
    cursor: usize,
}

impl ScriptedCoordinates {
    pub fn new(coordinates: Vec<(u32, u32)>) -> Self {
        Self {
            coordinates,
            cursor: 0,
        }
    }
}

impl CoordinateSource for ScriptedCoordinates {
    fn next_coordinate(&mut self, width: u32, height: u32) -> (u32, u32) {
        if self.coordinates.is_empty() {
            return (0, 0);
        }
        let (x, y) = self.coordinates[self.cursor % self.coordinates.len()];
        self.cursor += 1;
        (x % width, y % height)
    }
}
