//! Pixel sample value transformation functions:
//! the modality rescale and the fixed window level
//! which maps physical values into 8-bit grayscale.

use image::{GrayImage, ImageBuffer, Luma};
use snafu::ensure;

use crate::source::SampleGrid;
use crate::{EmptyWindowSnafu, InvalidConfigurationError};

/// Description of a modality rescale function,
/// defined by a _rescale slope_ and _rescale intercept_.
///
/// The default rescale is the identity function
/// (slope 1, intercept 0).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rescale {
    /// the rescale slope
    pub slope: f64,
    /// the rescale intercept
    pub intercept: f64,
}

impl Rescale {
    /// Create a new rescale function.
    #[inline]
    pub fn new(slope: f64, intercept: f64) -> Self {
        Rescale { slope, intercept }
    }

    /// Apply the rescale function to a raw sample value.
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.slope + self.intercept
    }
}

impl Default for Rescale {
    fn default() -> Self {
        Rescale {
            slope: 1.,
            intercept: 0.,
        }
    }
}

/// The parameters of a single window level,
/// in the same physical units as the rescaled samples
/// (Hounsfield units in CT).
///
/// The default is a lung window
/// (center -600, width 1600).
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct WindowLevel {
    /// The _Window Center_.
    pub center: i32,
    /// The _Window Width_.
    ///
    /// Must be greater than 1 for the window to cover a non-empty range.
    pub width: i32,
}

impl Default for WindowLevel {
    fn default() -> Self {
        WindowLevel {
            center: -600,
            width: 1600,
        }
    }
}

impl WindowLevel {
    /// Create a new window level.
    #[inline]
    pub fn new(center: i32, width: i32) -> Self {
        WindowLevel { center, width }
    }

    /// Resolve the visible range of the window,
    /// `[center - width / 2, center + width / 2]`
    /// with the half width rounded towards negative infinity.
    ///
    /// Fails if the resulting range is empty or inverted,
    /// which is the case for every width lower than 2.
    pub fn bounds(&self) -> Result<WindowBounds, InvalidConfigurationError> {
        let center = i64::from(self.center);
        let half = i64::from(self.width).div_euclid(2);
        let (lo, hi) = (center - half, center + half);
        ensure!(
            hi > lo,
            EmptyWindowSnafu {
                center: self.center,
                width: self.width,
            }
        );
        Ok(WindowBounds { lo, hi })
    }
}

/// The resolved, non-empty range of a window level.
///
/// Physical values at or below `lo` map to 0,
/// values at or above `hi` map to 255.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct WindowBounds {
    lo: i64,
    hi: i64,
}

impl WindowBounds {
    /// The lowest visible value.
    pub fn lo(&self) -> i64 {
        self.lo
    }

    /// The highest visible value.
    pub fn hi(&self) -> i64 {
        self.hi
    }

    /// Clamp a physical value to the window
    /// and quantize it to 8 bits,
    /// rounding down.
    ///
    /// A NaN input maps to 0.
    pub fn apply(&self, value: f64) -> u8 {
        let lo = self.lo as f64;
        let hi = self.hi as f64;
        let clamped = value.clamp(lo, hi);
        ((clamped - lo) / (hi - lo) * 255.).floor() as u8
    }
}

/// Rescale and window every sample of the grid
/// into an 8-bit grayscale image of the same dimensions.
pub fn window_samples(samples: &SampleGrid, rescale: Rescale, bounds: WindowBounds) -> GrayImage {
    let columns = samples.columns();
    let values = samples.samples();
    ImageBuffer::from_fn(columns, samples.rows(), |x, y| {
        let raw = values[y as usize * columns as usize + x as usize];
        Luma([bounds.apply(rescale.apply(f64::from(raw)))])
    })
}
