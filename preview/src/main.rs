//! A CLI tool for rendering a windowed JPEG preview
//! of a grayscale DICOM image file.
use std::path::{Path, PathBuf};

use clap::Parser;
use dicom_preview::{
    DEFAULT_JPEG_QUALITY, Error, OutputSize, PreviewOptions, WindowLevel, convert,
};
use snafu::{Report, ResultExt, Whatever};
use tracing::{Level, error, info};

/// Exit code for when the DICOM file could not be decoded.
const ERROR_DECODE: i32 = -1;
/// Exit code for when the preview options are invalid.
const ERROR_CONFIG: i32 = -2;
/// Exit code for when the preview could not be written.
const ERROR_WRITE: i32 = -3;

/// Convert a DICOM file into a windowed JPEG preview
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// Path to the DICOM file to convert
    file: PathBuf,

    /// Path to the output image
    /// (default is to replace input extension with `.jpg`)
    #[arg(short = 'o', long = "out")]
    output: Option<PathBuf>,

    /// Window center, in rescaled units (e.g. Hounsfield units)
    #[arg(
        short = 'c',
        long = "center",
        default_value_t = WindowLevel::default().center,
        allow_negative_numbers = true
    )]
    window_center: i32,

    /// Window width, in rescaled units (e.g. Hounsfield units)
    #[arg(
        short = 'w',
        long = "width",
        default_value_t = WindowLevel::default().width,
        allow_negative_numbers = true
    )]
    window_width: i32,

    /// Output image size, as WIDTHxHEIGHT
    #[arg(short = 's', long = "size", default_value_t = OutputSize::default())]
    size: OutputSize,

    /// JPEG quality (1 to 100)
    #[arg(short = 'q', long = "quality", default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    /// Print more information about the image and the output file
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn default_output(file: &Path) -> PathBuf {
    let mut path = file.to_path_buf();
    path.set_extension("jpg");
    path
}

fn main() {
    let App {
        file,
        output,
        window_center,
        window_width,
        size,
        quality,
        verbose,
    } = App::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
            .finish(),
    )
    .whatever_context("Could not set up global logging subscriber")
    .unwrap_or_else(|e: Whatever| {
        eprintln!("[ERROR] {}", Report::from_error(e));
    });

    let output = output.unwrap_or_else(|| default_output(&file));

    let options = PreviewOptions::new()
        .with_window(WindowLevel::new(window_center, window_width))
        .with_output_size(size)
        .with_quality(quality);

    convert(&file, &output, &options).unwrap_or_else(|e| {
        let code = match &e {
            Error::Decode { .. } => ERROR_DECODE,
            Error::InvalidConfiguration { .. } => ERROR_CONFIG,
            _ => ERROR_WRITE,
        };
        error!("{}", Report::from_error(e));
        std::process::exit(code);
    });

    if verbose {
        info!("Image saved to {}", output.display());
    }
}

#[cfg(test)]
mod tests {
    use crate::{App, default_output};
    use clap::{CommandFactory, Parser};
    use dicom_preview::OutputSize;
    use std::path::{Path, PathBuf};

    #[test]
    fn verify_cli() {
        App::command().debug_assert();
    }

    #[test]
    fn defaults_match_library() {
        let app = App::try_parse_from(["dicom-preview", "ct.dcm"]).unwrap();
        assert_eq!(app.window_center, -600);
        assert_eq!(app.window_width, 1600);
        assert_eq!(app.size, OutputSize::new(1024, 1024));
        assert_eq!(app.quality, 95);
        assert_eq!(app.output, None);
    }

    #[test]
    fn negative_center_is_accepted() {
        let app = App::try_parse_from([
            "dicom-preview",
            "ct.dcm",
            "-c",
            "-1000",
            "--width",
            "400",
            "--size",
            "512x256",
        ])
        .unwrap();
        assert_eq!(app.window_center, -1000);
        assert_eq!(app.window_width, 400);
        assert_eq!(app.size, OutputSize::new(512, 256));
    }

    #[test]
    fn output_defaults_to_jpg_extension() {
        assert_eq!(
            default_output(Path::new("scans/ct-0001.dcm")),
            PathBuf::from("scans/ct-0001.jpg")
        );
        assert_eq!(default_output(Path::new("IM0001")), PathBuf::from("IM0001.jpg"));
    }
}
