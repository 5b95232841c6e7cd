//! Loading the raw sample grid of a DICOM image file.

use std::path::{Path, PathBuf};

use dicom_object::open_file;
use dicom_pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, PixelRepresentation};
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tracing::debug;

use crate::attribute::{self, GetAttributeError};
use crate::transform::Rescale;

/// The source file could not be turned into a grid of samples.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum DecodeError {
    #[snafu(display("Could not open DICOM file {}", path.display()))]
    OpenFile {
        path: PathBuf,
        source: dicom_object::ReadError,
    },

    #[snafu(display("Could not decode pixel data"))]
    DecodePixelData { source: dicom_pixeldata::Error },

    #[snafu(display("Unsupported SamplesPerPixel {}, only grayscale images are supported", spp))]
    UnsupportedSamplesPerPixel { spp: u16 },

    #[snafu(display("Could not convert pixel data to raw sample values"))]
    ConvertPixelData { source: dicom_pixeldata::Error },

    #[snafu(display(
        "Expected a non-empty frame of {}x{} samples, but it holds {}",
        columns,
        rows,
        len
    ))]
    SampleCount { columns: u32, rows: u32, len: usize },

    #[snafu(display("Could not read the modality rescale"))]
    ReadRescale { source: GetAttributeError },
}

/// A 2-D grid of raw signed sample values in row-major order,
/// one per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    columns: u32,
    rows: u32,
    samples: Vec<i32>,
}

impl SampleGrid {
    /// Create a sample grid.
    ///
    /// Returns `None` if the grid is empty
    /// or if the number of samples does not match `columns * rows`.
    pub fn new(columns: u32, rows: u32, samples: Vec<i32>) -> Option<Self> {
        if samples.is_empty() || columns as usize * rows as usize != samples.len() {
            return None;
        }
        Some(SampleGrid {
            columns,
            rows,
            samples,
        })
    }

    /// The width of the grid.
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// The height of the grid.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// The sample values, row by row.
    pub fn samples(&self) -> &[i32] {
        &self.samples
    }
}

/// A grayscale DICOM image, as needed for rendering a preview:
/// the raw samples of its first frame
/// and its modality rescale function, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub samples: SampleGrid,
    pub rescale: Option<Rescale>,
}

impl SourceImage {
    /// The rescale function of the image,
    /// or the identity function if the file did not declare one.
    pub fn rescale_or_default(&self) -> Rescale {
        self.rescale.unwrap_or_default()
    }
}

/// Open a DICOM file and retrieve its raw samples
/// and modality rescale parameters.
///
/// Only the first frame is read.
pub fn load_source(path: impl AsRef<Path>) -> Result<SourceImage, DecodeError> {
    let path = path.as_ref();
    let obj = open_file(path).context(OpenFileSnafu { path })?;

    let pixel = obj.decode_pixel_data().context(DecodePixelDataSnafu)?;
    let spp = pixel.samples_per_pixel();
    ensure!(spp == 1, UnsupportedSamplesPerPixelSnafu { spp });

    let (columns, rows) = (pixel.columns(), pixel.rows());
    debug!(
        "{}x{} image, {}-bit, {} frame(s)",
        columns,
        rows,
        pixel.bits_stored(),
        pixel.number_of_frames()
    );

    // raw stored values, the rescale is applied in floating point later
    let options = ConvertOptions::new().with_modality_lut(ModalityLutOption::None);
    let mut samples: Vec<i32> = pixel
        .to_vec_frame_with_options(0, &options)
        .context(ConvertPixelDataSnafu)?;
    // 8-bit samples come out unsigned regardless of the pixel representation
    if pixel.bits_allocated() == 8 && pixel.pixel_representation() == PixelRepresentation::Signed
    {
        let bits_stored = pixel.bits_stored();
        for v in &mut samples {
            *v = sign_extend(*v, bits_stored);
        }
    }
    let len = samples.len();
    let samples = SampleGrid::new(columns, rows, samples).context(SampleCountSnafu {
        columns,
        rows,
        len,
    })?;

    let rescale = attribute::rescale(&obj).context(ReadRescaleSnafu)?;
    debug!("Modality rescale: {:?}", rescale);

    Ok(SourceImage { samples, rescale })
}

/// Reinterpret the low `bits` bits of a stored value
/// as a two's complement number.
fn sign_extend(value: i32, bits: u16) -> i32 {
    let shift = 32 - u32::from(bits.clamp(1, 32));
    (value << shift) >> shift
}
