use thiserror::Error;

/// Errors raised while decoding a DICOM stream.
///
/// Every decoding error aborts the whole pass; offsets are absolute
/// positions in the file buffer.
#[derive(Debug, Error)]
pub enum DicomError {
    /// Malformed framing: bad `DICM` flag, truncated header, value length
    /// that is not a multiple of the VR width, missing delimiter.
    #[error("format error at offset {offset}: {reason}")]
    Format { offset: usize, reason: String },

    /// Slice or index request outside a byte view
    #[error("range error at offset {offset}: {reason}")]
    Range { offset: usize, reason: String },

    /// Text bytes that are not valid under the selected character set
    #[error("encoding error at offset {offset}: bytes are not valid {encoding}")]
    Encoding {
        offset: usize,
        encoding: &'static str,
    },

    /// Unresolved dictionary or table entry
    #[error("lookup error: {0}")]
    Lookup(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl DicomError {
    pub(crate) fn format(offset: usize, reason: impl Into<String>) -> Self {
        DicomError::Format {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn range(offset: usize, reason: impl Into<String>) -> Self {
        DicomError::Range {
            offset,
            reason: reason.into(),
        }
    }
}

pub type CommonResult<T> = std::result::Result<T, DicomError>;
