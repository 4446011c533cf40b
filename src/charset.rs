//! Specific Character Set (0008,0005) handling.

use std::borrow::Cow;

use encoding_rs::Encoding;

use crate::error::DicomError;
use crate::CommonResult;

/// Person names carry up to three component groups.
pub const PERSON_NAME_COMPONENTS: usize = 3;

/// A concrete text encoding for element values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// ISO 8859-1, mapping every byte to the code point of the same value
    Latin1,
    Encoded(&'static Encoding),
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "ISO-8859-1",
            TextEncoding::Encoded(encoding) => encoding.name(),
        }
    }

    pub fn is_korean(&self) -> bool {
        matches!(self, TextEncoding::Encoded(encoding) if *encoding == encoding_rs::EUC_KR)
    }

    /// Decode `bytes`, rejecting malformed input instead of substituting.
    ///
    /// `offset` is only used to locate the failure.
    pub fn decode<'a>(&self, bytes: &'a [u8], offset: usize) -> CommonResult<Cow<'a, str>> {
        match self {
            TextEncoding::Latin1 => Ok(encoding_rs::mem::decode_latin1(bytes)),
            TextEncoding::Encoded(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .ok_or(DicomError::Encoding {
                    offset,
                    encoding: encoding.name(),
                }),
        }
    }
}

/// Encodings used before any (0008,0005) has been seen.
pub fn default_charsets() -> Vec<TextEncoding> {
    vec![TextEncoding::Latin1]
}

fn lookup_charset(term: &str) -> TextEncoding {
    match term {
        "ISO_IR 6" | "ISO 2022 IR 6" | "ISO_IR 100" | "ISO 2022 IR 100" => TextEncoding::Latin1,
        "ISO_IR 101" | "ISO 2022 IR 101" => TextEncoding::Encoded(encoding_rs::ISO_8859_2),
        "ISO_IR 109" | "ISO 2022 IR 109" => TextEncoding::Encoded(encoding_rs::ISO_8859_3),
        "ISO_IR 110" | "ISO 2022 IR 110" => TextEncoding::Encoded(encoding_rs::ISO_8859_4),
        "ISO_IR 144" | "ISO 2022 IR 144" => TextEncoding::Encoded(encoding_rs::ISO_8859_5),
        "ISO_IR 127" | "ISO 2022 IR 127" => TextEncoding::Encoded(encoding_rs::ISO_8859_6),
        "ISO_IR 126" | "ISO 2022 IR 126" => TextEncoding::Encoded(encoding_rs::ISO_8859_7),
        "ISO_IR 138" | "ISO 2022 IR 138" => TextEncoding::Encoded(encoding_rs::ISO_8859_8),
        "ISO_IR 148" | "ISO 2022 IR 148" => TextEncoding::Encoded(encoding_rs::WINDOWS_1254),
        "ISO_IR 166" | "ISO 2022 IR 166" => TextEncoding::Encoded(encoding_rs::WINDOWS_874),
        "ISO_IR 13" | "ISO 2022 IR 13" => TextEncoding::Encoded(encoding_rs::SHIFT_JIS),
        "ISO 2022 IR 87" => TextEncoding::Encoded(encoding_rs::ISO_2022_JP),
        "ISO 2022 IR 149" => TextEncoding::Encoded(encoding_rs::EUC_KR),
        "ISO_IR 192" => TextEncoding::Encoded(encoding_rs::UTF_8),
        "GB18030" => TextEncoding::Encoded(encoding_rs::GB18030),
        "GBK" => TextEncoding::Encoded(encoding_rs::GBK),
        _ => TextEncoding::Latin1,
    }
}

/// Resolve a Specific Character Set value to an ordered encoding list.
///
/// The list always has at least [`PERSON_NAME_COMPONENTS`] entries; missing
/// ones repeat the last declared term. Unknown or empty terms fall back to
/// Latin-1.
pub fn resolve_charsets(value: &str) -> Vec<TextEncoding> {
    let mut terms = value.split('\\').map(str::trim).collect::<Vec<&str>>();

    while terms.len() < PERSON_NAME_COMPONENTS {
        let last = terms.last().copied().unwrap_or("");
        terms.push(last);
    }

    terms.into_iter().map(lookup_charset).collect()
}
