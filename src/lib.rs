//! # dicom_reader
//!
//! Decoder for DICOM Part 10 medical image files.
//!
//! The whole file is read into memory once; every element value is a
//! zero-copy [`ByteView`] into that buffer, decoded according to its VR,
//! the negotiated transfer syntax and the active Specific Character Set.
//!
//! - [`view`] - bounded windows over the file buffer
//! - [`value`] - per-VR value decoding
//! - [`charset`] - Specific Character Set to text encodings
//! - [`service`] - single element reader, sequences included
//! - [`dataset`] - whole-file decode pass and the resulting [`Dataset`]
//! - [`dictionary`] / [`transfer_syntax`] - static lookup tables
//! - [`export`] - pixel data to grayscale image
//!
//! ```rust,no_run
//! use dicom_reader::{read_file, Tag};
//!
//! let dataset = read_file("scan.dcm")?;
//! if let Some(name) = dataset.get(Tag::PATIENT_NAME) {
//!     println!("{}", name);
//! }
//! # Ok::<(), dicom_reader::DicomError>(())
//! ```

pub mod charset;
pub mod config;
pub mod dataset;
pub mod dictionary;
pub mod error;
pub mod export;
pub mod model;
pub mod service;
pub mod transfer_syntax;
pub mod util;
pub mod value;
pub mod view;


pub use config::Config;
pub use dataset::{read_bytes, read_file, Dataset, DatasetReader, EncodingState};
pub use dictionary::AttributeDictionary;
pub use error::{CommonResult, DicomError};
pub use export::export_image;
pub use model::{Bound, DataElement, DicomValue, Item, Sequence, Tag, Vr};
pub use view::ByteView;
