//! Writing preview images to disk.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::GrayImage;
use image::codecs::jpeg::JpegEncoder;
use snafu::{ResultExt, Snafu};
use tempfile::NamedTempFile;
use tracing::debug;

/// The preview could not be written to its destination.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum WriteError {
    #[snafu(display("Could not create directory {}", path.display()))]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not create a temporary file in {}", path.display()))]
    CreateTempFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not encode JPEG image"))]
    Encode { source: image::ImageError },

    #[snafu(display("Could not write JPEG image"))]
    Flush { source: std::io::Error },

    #[snafu(display("Could not move JPEG image to {}", path.display()))]
    Persist {
        path: PathBuf,
        source: tempfile::PersistError,
    },
}

/// Encode a grayscale image as a baseline JPEG with the given quality
/// and save it to `destination`,
/// creating any missing parent directories.
///
/// The image is first written to a temporary file
/// next to the destination,
/// which only replaces the destination once fully written.
/// On failure, the destination is left untouched.
pub fn write_jpeg(
    image: &GrayImage,
    destination: impl AsRef<Path>,
    quality: u8,
) -> Result<(), WriteError> {
    let destination = destination.as_ref();
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).context(CreateDirectorySnafu { path: parent })?;

    let mut file = NamedTempFile::new_in(parent).context(CreateTempFileSnafu { path: parent })?;
    debug!("Writing JPEG to {}", file.path().display());
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        JpegEncoder::new_with_quality(&mut writer, quality)
            .encode_image(image)
            .context(EncodeSnafu)?;
        writer.flush().context(FlushSnafu)?;
    }

    file.persist(destination)
        .context(PersistSnafu { path: destination })?;
    Ok(())
}
