//! Command line configuration.
//!
//! Every option can also be set through a `DICOM_` prefixed environment
//! variable:
//!
//! - `DICOM_INPUT` - file to decode
//! - `DICOM_EXPORT` - write the pixel data to this image file
//! - `DICOM_DICTIONARY` - extra tag table merged into the built-in one

use std::path::PathBuf;

use clap::Parser;

/// Image formats the exporter can write, by file extension.
pub const EXPORT_EXTENSIONS: &[&str] = &["bmp", "png", "tif", "tiff"];

/// Decode a DICOM Part 10 file and print its elements.
#[derive(Parser, Debug, Clone)]
#[command(name = "dicom_reader")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// DICOM file to read.
    #[arg(env = "DICOM_INPUT")]
    pub input: PathBuf,

    /// Export the first frame of the pixel data to this image file.
    ///
    /// The format follows the extension (bmp, png, tif, tiff).
    #[arg(short, long, env = "DICOM_EXPORT")]
    pub export: Option<PathBuf>,

    /// Tab separated tag table merged over the built-in dictionary.
    #[arg(long, env = "DICOM_DICTIONARY")]
    pub dictionary: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Do not print the elements.
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.input.is_file() {
            return Err(format!("input file {} does not exist", self.input.display()));
        }

        if let Some(dictionary) = &self.dictionary {
            if !dictionary.is_file() {
                return Err(format!(
                    "dictionary file {} does not exist",
                    dictionary.display()
                ));
            }
        }

        if let Some(export) = &self.export {
            let extension = export
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .unwrap_or_default();

            if !EXPORT_EXTENSIONS.contains(&extension.as_str()) {
                return Err(format!(
                    "cannot export to {}: extension must be one of {}",
                    export.display(),
                    EXPORT_EXTENSIONS.join(", ")
                ));
            }
        }

        if self.quiet && self.export.is_none() {
            return Err("--quiet without --export leaves nothing to do".to_string());
        }

        Ok(())
    }
}
