//! Per-VR value decoding.
//!
//! [`parse_data`] turns the bytes of one element value into a [`DicomValue`].
//! Text VRs use the first active character set, except PN, which assigns one
//! encoding per name component group.

use crate::charset::{default_charsets, TextEncoding, PERSON_NAME_COMPONENTS};
use crate::error::DicomError;
use crate::model::{DicomValue, Vr};
use crate::util;
use crate::view::ByteView;
use crate::CommonResult;

const SPACE_AND_NUL: &[char] = &[' ', '\0'];

/// ISO 2022 designations that may wrap Korean person name components
const KOREAN_ESCAPES: [&[u8]; 2] = [b"\x1b$)C", b"\x1b(B"];

/// Decode the value bytes of one element.
///
/// `view` must span exactly the value. Returns `None` for SQ and for VRs
/// without a flat value representation (UN, UT, unrecognised codes, ...).
pub fn parse_data(
    view: &ByteView,
    vr: Vr,
    little_endian: bool,
    encodings: &[TextEncoding],
) -> CommonResult<Option<DicomValue>> {
    let result = match vr {
        Vr::AE | Vr::AS | Vr::CS | Vr::DA | Vr::DS | Vr::DT => {
            let text = decode_text(view, encodings)?;
            DicomValue::String(text.trim_matches(SPACE_AND_NUL).to_string())
        }
        Vr::IS | Vr::LO | Vr::SH | Vr::UI => {
            let text = decode_text(view, encodings)?;
            DicomValue::String(text.trim_matches('\0').to_string())
        }
        Vr::LT => {
            let text = decode_text(view, encodings)?;
            DicomValue::String(text.trim_end_matches(SPACE_AND_NUL).to_string())
        }
        Vr::ST | Vr::TM => DicomValue::String(decode_text(view, encodings)?),
        Vr::PN => DicomValue::String(decode_person_name(view, encodings)?),
        Vr::AT => {
            let tags = fixed_width(view, vr, 4, little_endian, |bytes, le| {
                (
                    format!("{:04x}", util::read_u16(&bytes[..2], le)),
                    format!("{:04x}", util::read_u16(&bytes[2..], le)),
                )
            })?;
            DicomValue::TagPairs(tags)
        }
        Vr::FL => scalar_or_vector(
            fixed_width(view, vr, 4, little_endian, util::read_f32)?,
            DicomValue::Float,
            DicomValue::Floats,
        ),
        Vr::FD => scalar_or_vector(
            fixed_width(view, vr, 8, little_endian, util::read_f64)?,
            DicomValue::Double,
            DicomValue::Doubles,
        ),
        Vr::SL => scalar_or_vector(
            fixed_width(view, vr, 4, little_endian, util::read_i32)?,
            DicomValue::I32,
            DicomValue::I32s,
        ),
        Vr::SS => scalar_or_vector(
            fixed_width(view, vr, 2, little_endian, util::read_i16)?,
            DicomValue::I16,
            DicomValue::I16s,
        ),
        Vr::UL => scalar_or_vector(
            fixed_width(view, vr, 4, little_endian, util::read_u32)?,
            DicomValue::U32,
            DicomValue::U32s,
        ),
        // US 即使只有一个值也保持为数组
        Vr::US | Vr::OW => {
            DicomValue::U16s(fixed_width(view, vr, 2, little_endian, util::read_u16)?)
        }
        Vr::OF => DicomValue::Floats(fixed_width(view, vr, 4, little_endian, util::read_f32)?),
        Vr::OD => DicomValue::Doubles(fixed_width(view, vr, 8, little_endian, util::read_f64)?),
        Vr::OB => DicomValue::Bytes(view.to_bytes()),
        Vr::SQ
        | Vr::OL
        | Vr::OV
        | Vr::SV
        | Vr::UC
        | Vr::UN
        | Vr::UR
        | Vr::UT
        | Vr::UV
        | Vr::Unrecognized(_) => return Ok(None),
    };

    Ok(Some(result))
}

fn decode_text(view: &ByteView, encodings: &[TextEncoding]) -> CommonResult<String> {
    let encoding = encodings.first().copied().unwrap_or(TextEncoding::Latin1);

    Ok(encoding.decode(view.as_slice(), view.offset())?.into_owned())
}

fn fixed_width<T>(
    view: &ByteView,
    vr: Vr,
    width: usize,
    little_endian: bool,
    read: impl Fn(&[u8], bool) -> T,
) -> CommonResult<Vec<T>> {
    let bytes = view.as_slice();

    if bytes.len() % width != 0 {
        return Err(DicomError::format(
            view.offset(),
            format!(
                "{} value length {} is not a multiple of {}",
                vr,
                bytes.len(),
                width
            ),
        ));
    }

    Ok(bytes
        .chunks_exact(width)
        .map(|chunk| read(chunk, little_endian))
        .collect())
}

fn scalar_or_vector<T: Copy>(
    values: Vec<T>,
    scalar: fn(T) -> DicomValue,
    vector: fn(Vec<T>) -> DicomValue,
) -> DicomValue {
    if values.len() == 1 {
        scalar(values[0])
    } else {
        vector(values)
    }
}

fn decode_person_name(view: &ByteView, encodings: &[TextEncoding]) -> CommonResult<String> {
    let bytes = view.as_slice();
    let components = bytes
        .splitn(PERSON_NAME_COMPONENTS, |b| *b == b'=')
        .collect::<Vec<&[u8]>>();

    let mut pn_encodings = if encodings.is_empty() {
        default_charsets()
    } else {
        encodings.to_vec()
    };
    while pn_encodings.len() < components.len() {
        let last = pn_encodings[pn_encodings.len() - 1];
        pn_encodings.push(last);
    }

    let mut names = Vec::with_capacity(components.len());
    let mut offset = view.offset();

    for (component, encoding) in components.iter().zip(&pn_encodings) {
        let name = if encoding.is_korean() {
            let stripped = strip_escapes(component, &KOREAN_ESCAPES);
            encoding.decode(&stripped, offset)?.into_owned()
        } else {
            encoding.decode(component, offset)?.into_owned()
        };

        names.push(name);
        offset += component.len() + 1;
    }

    Ok(names.join("="))
}

fn strip_escapes(bytes: &[u8], escapes: &[&[u8]]) -> Vec<u8> {
    let mut result = bytes.to_vec();

    for escape in escapes {
        let mut stripped = Vec::with_capacity(result.len());
        let mut i = 0;
        while i < result.len() {
            if result[i..].starts_with(escape) {
                i += escape.len();
            } else {
                stripped.push(result[i]);
                i += 1;
            }
        }
        result = stripped;
    }

    result
}
