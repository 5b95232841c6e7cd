//! This crate renders JPEG previews of grayscale DICOM images.
//!
//! The raw samples of the image are rescaled to physical units
//! (such as Hounsfield units in CT)
//! with the _Rescale Slope_ and _Rescale Intercept_ of the file,
//! then mapped to 8-bit grayscale through a fixed window level
//! (a lung window by default),
//! resized with a Lanczos filter and encoded as a JPEG file.
//!
//! # Example
//!
//! ```no_run
//! use dicom_preview::{convert, OutputSize, PreviewOptions, WindowLevel};
//!
//! // lung window, 1024x1024
//! convert("ct/slice-0001.dcm", "previews/slice-0001.jpg", &PreviewOptions::default())?;
//!
//! // mediastinal window, smaller preview
//! let options = PreviewOptions::new()
//!     .with_window(WindowLevel::new(40, 400))
//!     .with_output_size(OutputSize::new(512, 512));
//! convert("ct/slice-0001.dcm", "previews/slice-0001-soft.jpg", &options)?;
//! # Result::<(), dicom_preview::Error>::Ok(())
//! ```
//!
//! The windowing formula is
//! `floor((clamp(x, lo, hi) - lo) / (hi - lo) * 255)`,
//! where `lo = center - width / 2` and `hi = center + width / 2`
//! with the half width rounded down.
//! The output is an 8-bit single channel JPEG.
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use image::GrayImage;
use image::imageops::{self, FilterType};
use snafu::{ResultExt, Snafu, ensure};
use tracing::debug;

pub mod attribute;
mod output;
mod source;
mod transform;

pub use output::{WriteError, write_jpeg};
pub use source::{DecodeError, SampleGrid, SourceImage, load_source};
pub use transform::{Rescale, WindowBounds, WindowLevel, window_samples};

/// The JPEG quality used unless stated otherwise.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// The largest width or height a baseline JPEG can hold.
pub const MAX_OUTPUT_DIMENSION: u32 = u16::MAX as u32;

/// An error converting a DICOM file into a preview.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The source file could not be read as a grayscale DICOM image.
    #[snafu(display("Could not decode DICOM image"))]
    Decode { source: DecodeError },

    /// The preview options are out of their valid range.
    #[snafu(display("Invalid preview options"))]
    InvalidConfiguration { source: InvalidConfigurationError },

    /// The preview could not be written.
    #[snafu(display("Could not write preview"))]
    Write { source: WriteError },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A preview option is out of its valid range.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum InvalidConfigurationError {
    #[snafu(display(
        "Window width {} around center {} does not cover any value, must be at least 2",
        width,
        center
    ))]
    EmptyWindow { center: i32, width: i32 },

    #[snafu(display(
        "Output size {}x{} is out of range, each dimension must be within 1 and {}",
        width,
        height,
        MAX_OUTPUT_DIMENSION
    ))]
    OutputSize { width: u32, height: u32 },

    #[snafu(display("JPEG quality {} is not within 1 and 100", quality))]
    Quality { quality: u8 },
}

/// The pixel dimensions of a preview,
/// independent of the dimensions of the source image.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

impl OutputSize {
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        OutputSize { width, height }
    }
}

impl Default for OutputSize {
    fn default() -> Self {
        OutputSize {
            width: 1024,
            height: 1024,
        }
    }
}

impl fmt::Display for OutputSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Could not parse an output size, expected `WIDTHxHEIGHT`
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub struct ParseOutputSizeError {
    _private: (),
}

impl FromStr for OutputSize {
    type Err = ParseOutputSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or(ParseOutputSizeError { _private: () })?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| ParseOutputSizeError { _private: () })
        };
        Ok(OutputSize::new(parse(width)?, parse(height)?))
    }
}

/// Options for rendering a preview.
///
/// The defaults are a lung window
/// (center -600, width 1600),
/// a 1024x1024 output and a JPEG quality of 95.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PreviewOptions {
    window: WindowLevel,
    output_size: OutputSize,
    quality: u8,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        PreviewOptions {
            window: WindowLevel::default(),
            output_size: OutputSize::default(),
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl PreviewOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window level applied to the rescaled samples.
    pub fn with_window(mut self, window: WindowLevel) -> Self {
        self.window = window;
        self
    }

    /// Set the dimensions of the output image.
    pub fn with_output_size(mut self, output_size: OutputSize) -> Self {
        self.output_size = output_size;
        self
    }

    /// Set the JPEG quality, between 1 and 100.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn window(&self) -> WindowLevel {
        self.window
    }

    pub fn output_size(&self) -> OutputSize {
        self.output_size
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Check every option,
    /// returning the resolved window bounds.
    pub fn validate(&self) -> Result<WindowBounds, InvalidConfigurationError> {
        let bounds = self.window.bounds()?;
        let OutputSize { width, height } = self.output_size;
        let valid = 1..=MAX_OUTPUT_DIMENSION;
        ensure!(
            valid.contains(&width) && valid.contains(&height),
            OutputSizeSnafu { width, height }
        );
        ensure!(
            (1..=100).contains(&self.quality),
            QualitySnafu {
                quality: self.quality
            }
        );
        Ok(bounds)
    }
}

/// Window a decoded source image and resize it
/// to the output size of the given options,
/// without writing anything.
pub fn render_preview(source: &SourceImage, options: &PreviewOptions) -> Result<GrayImage> {
    let bounds = options.validate().context(InvalidConfigurationSnafu)?;
    let windowed = window_samples(&source.samples, source.rescale_or_default(), bounds);

    let OutputSize { width, height } = options.output_size;
    debug!(
        "Resizing {}x{} to {}x{}",
        windowed.width(),
        windowed.height(),
        width,
        height
    );
    Ok(imageops::resize(&windowed, width, height, FilterType::Lanczos3))
}

/// Convert the DICOM file at `source` into a windowed JPEG preview
/// saved at `destination`.
///
/// Missing parent directories of `destination` are created,
/// and an existing file there is replaced.
/// Nothing is written if any step fails.
pub fn convert(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    options: &PreviewOptions,
) -> Result<()> {
    let (source, destination) = (source.as_ref(), destination.as_ref());
    options.validate().context(InvalidConfigurationSnafu)?;

    let image = load_source(source).context(DecodeSnafu)?;
    let preview = render_preview(&image, options)?;
    write_jpeg(&preview, destination, options.quality).context(WriteSnafu)?;

    debug!(
        "Preview of {} saved to {}",
        source.display(),
        destination.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lung_rows() -> SourceImage {
        let row = [-1000, -600, -200, 200];
        SourceImage {
            samples: SampleGrid::new(4, 4, row.repeat(4)).unwrap(),
            rescale: None,
        }
    }

    #[test]
    fn default_options() {
        let options = PreviewOptions::default();
        assert_eq!(options.window(), WindowLevel::new(-600, 1600));
        assert_eq!(options.output_size(), OutputSize::new(1024, 1024));
        assert_eq!(options.quality(), 95);
        assert_eq!(options, PreviewOptions::new());
    }

    #[rstest]
    #[case("1024x1024", OutputSize::new(1024, 1024))]
    #[case("640x480", OutputSize::new(640, 480))]
    #[case(" 8 X 8 ", OutputSize::new(8, 8))]
    fn parse_output_size(#[case] text: &str, #[case] expected: OutputSize) {
        assert_eq!(text.parse::<OutputSize>(), Ok(expected));
    }

    #[rstest]
    #[case("")]
    #[case("1024")]
    #[case("1024x")]
    #[case("-1x8")]
    #[case("axb")]
    fn parse_bad_output_size(#[case] text: &str) {
        assert!(text.parse::<OutputSize>().is_err());
    }

    #[test]
    fn output_size_display_round_trips() {
        let size = OutputSize::new(300, 200);
        assert_eq!(size.to_string(), "300x200");
        assert_eq!(size.to_string().parse::<OutputSize>(), Ok(size));
    }

    #[rstest]
    #[case(PreviewOptions::new().with_window(WindowLevel::new(-600, 0)))]
    #[case(PreviewOptions::new().with_output_size(OutputSize::new(0, 1024)))]
    #[case(PreviewOptions::new().with_output_size(OutputSize::new(1024, 0)))]
    #[case(PreviewOptions::new().with_output_size(OutputSize::new(65536, 8)))]
    #[case(PreviewOptions::new().with_output_size(OutputSize::new(8, 65536)))]
    #[case(PreviewOptions::new().with_quality(0))]
    #[case(PreviewOptions::new().with_quality(101))]
    fn invalid_options(#[case] options: PreviewOptions) {
        assert!(options.validate().is_err());
        let err = render_preview(&lung_rows(), &options).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
    }

    #[test]
    fn zero_width_window_is_invalid_configuration() {
        let options = PreviewOptions::new().with_window(WindowLevel::new(-600, 0));
        assert_eq!(
            options.validate(),
            Err(InvalidConfigurationError::EmptyWindow {
                center: -600,
                width: 0
            })
        );
    }

    #[test]
    fn oversized_output_is_invalid_configuration() {
        let options = PreviewOptions::new().with_output_size(OutputSize::new(70000, 1));
        assert_eq!(
            options.validate(),
            Err(InvalidConfigurationError::OutputSize {
                width: 70000,
                height: 1
            })
        );

        let err = convert("does/not/exist.dcm", "never/written.jpg", &options).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfiguration {
                source: InvalidConfigurationError::OutputSize { .. }
            }
        ));

        let largest = OutputSize::new(MAX_OUTPUT_DIMENSION, MAX_OUTPUT_DIMENSION);
        assert!(PreviewOptions::new().with_output_size(largest).validate().is_ok());
    }

    #[test]
    fn preview_has_requested_size() {
        let options = PreviewOptions::new().with_output_size(OutputSize::new(8, 8));
        let preview = render_preview(&lung_rows(), &options).unwrap();
        assert_eq!(preview.dimensions(), (8, 8));

        let options = PreviewOptions::new().with_output_size(OutputSize::new(3, 7));
        let preview = render_preview(&lung_rows(), &options).unwrap();
        assert_eq!(preview.dimensions(), (3, 7));
    }

    #[test]
    fn uniform_preview_keeps_its_value_when_resized() {
        let source = SourceImage {
            samples: SampleGrid::new(4, 4, vec![-2000; 16]).unwrap(),
            rescale: None,
        };
        let options = PreviewOptions::new().with_output_size(OutputSize::new(8, 8));
        let preview = render_preview(&source, &options).unwrap();
        assert!(preview.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn rendering_is_deterministic() {
        let options = PreviewOptions::new().with_output_size(OutputSize::new(8, 8));
        let a = render_preview(&lung_rows(), &options).unwrap();
        let b = render_preview(&lung_rows(), &options).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn convert_validates_before_reading() {
        let options = PreviewOptions::new().with_quality(0);
        let err = convert("does/not/exist.dcm", "never/written.jpg", &options).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
        assert!(!Path::new("never/written.jpg").exists());
    }
}
