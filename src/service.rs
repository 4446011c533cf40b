use tracing::{trace, warn};

use crate::dataset::EncodingState;
use crate::dictionary::{AttributeDictionary, DictionaryEntry};
use crate::error::DicomError;
use crate::model::{Bound, DataElement, Item, Sequence, Tag, Vr, UNDEFINED_LENGTH};
use crate::util;
use crate::value::parse_data;
use crate::view::ByteView;
use crate::CommonResult;

pub const PREAMBLE_LENGTH: usize = 128;
pub const PREFIX: &[u8; 4] = b"DICM";
/// First byte of the file meta group
pub const DATASET_START: usize = PREAMBLE_LENGTH + 4;

const DELIMITER_LE: [u8; 4] = [0xFE, 0xFF, 0xDD, 0xE0];
const DELIMITER_BE: [u8; 4] = [0xFF, 0xFE, 0xE0, 0xDD];

/// Item and delimitation headers: tag + 4-byte length
const ITEM_HEADER_LENGTH: usize = 8;

/// Deepest sequence nesting accepted before the file is rejected
pub const MAX_SEQUENCE_DEPTH: usize = 64;

pub fn get_preamble(view: &ByteView) -> CommonResult<(ByteView, usize)> {
    if view.len() < PREAMBLE_LENGTH {
        return Err(DicomError::format(
            view.offset(),
            format!("file too small for preamble: {} bytes", view.len()),
        ));
    }

    Ok((view.slice(0, PREAMBLE_LENGTH)?, PREAMBLE_LENGTH))
}

pub fn get_prefix(view: &ByteView, cursor: usize) -> CommonResult<usize> {
    match view.read_bytes(cursor, PREFIX.len()) {
        Ok(prefix) if prefix == PREFIX => Ok(PREFIX.len()),
        _ => Err(DicomError::format(view.offset() + cursor, "invalid flag")),
    }
}

fn read_tag(view: &ByteView, cursor: usize, little_endian: bool) -> CommonResult<Tag> {
    Ok(Tag::new(
        view.read_u16(cursor, little_endian)?,
        view.read_u16(cursor + 2, little_endian)?,
    ))
}

fn element_name(tag: Tag, entry: Option<&DictionaryEntry>) -> String {
    match entry {
        Some(entry) => entry.name.clone(),
        None if tag.element == 0x0000 => "Group Length".to_string(),
        None => String::new(),
    }
}

fn implicit_vr(tag: Tag, entry: Option<&DictionaryEntry>) -> Vr {
    match entry.and_then(|entry| entry.vr) {
        Some(vr) => vr,
        None if tag.element == 0x0000 => Vr::UL,
        None => Vr::UN,
    }
}

/// Byte count from `start` up to the sequence delimitation item.
fn resolve_undefined_length(
    view: &ByteView,
    start: usize,
    little_endian: bool,
) -> CommonResult<usize> {
    let marker = if little_endian {
        DELIMITER_LE
    } else {
        DELIMITER_BE
    };
    let rest = view.slice_from(start)?;

    rest.find(&marker).ok_or_else(|| {
        DicomError::format(
            rest.offset(),
            "undefined length value without sequence delimitation item",
        )
    })
}

/// Read one data element starting at `cursor` (relative to `view`).
///
/// Returns the element and the number of bytes it occupies, header
/// included. Sequences are read in full, nested items and their closing
/// delimiter included.
pub fn get_data_element(
    view: &ByteView,
    cursor: usize,
    state: &EncodingState,
    dictionary: &AttributeDictionary,
) -> CommonResult<(DataElement, usize)> {
    let mut length = 0;

    // 获取tag
    let tag = read_tag(view, cursor, state.little_endian)?;
    length += 4;

    // 元信息组总是显式小端
    let (explicit_vr, little_endian) = if tag.is_meta() {
        (true, true)
    } else {
        (state.explicit_vr, state.little_endian)
    };

    let entry = dictionary.lookup(tag);
    let name = element_name(tag, entry);

    // item / delimiter 只有4字节长度，没有值
    if tag.is_delimiter() {
        let declared = view.read_u32(cursor + length, little_endian)?;
        length += 4;

        trace!(%tag, length = declared, offset = view.offset() + cursor, "delimiter");

        let data_element = DataElement {
            tag,
            vr: entry.and_then(|entry| entry.vr),
            name,
            length: declared,
            value: None,
            raw: view.slice(cursor + length, cursor + length)?,
            sequence: None,
        };

        return Ok((data_element, length));
    }

    let (vr, declared) = if explicit_vr {
        let vr_buffer = view.read_bytes(cursor + length, 2)?;
        let vr = Vr::from_bytes([vr_buffer[0], vr_buffer[1]]);
        length += 2;

        if vr.has_long_length() {
            // 跳过保留的2字节，长度是4字节
            length += 2;
            let declared = view.read_u32(cursor + length, little_endian)?;
            length += 4;
            (vr, declared)
        } else {
            let declared = view.read_u16(cursor + length, little_endian)? as u32;
            length += 2;
            (vr, declared)
        }
    } else {
        let declared = view.read_u32(cursor + length, little_endian)?;
        length += 4;
        (implicit_vr(tag, entry), declared)
    };

    trace!(
        %tag,
        %vr,
        length = declared,
        offset = view.offset() + cursor,
        "element header"
    );

    if let Vr::Unrecognized(code) = vr {
        warn!(
            %tag,
            code = %util::hex_preview(&code, 2),
            offset = view.offset() + cursor,
            "unrecognized VR"
        );
    }

    let value_start = cursor + length;

    if vr == Vr::SQ {
        let nested = EncodingState {
            explicit_vr,
            little_endian,
            in_meta_group: false,
            meta_group_end: None,
            sequence_depth: state.sequence_depth + 1,
            ..state.clone()
        };
        if nested.sequence_depth > MAX_SEQUENCE_DEPTH {
            return Err(DicomError::format(
                view.offset() + cursor,
                "sequence nesting too deep",
            ));
        }

        let (sequence, raw, consumed) =
            parse_sq_data(view, value_start, declared, &nested, dictionary)?;

        let data_element = DataElement {
            tag,
            vr: Some(vr),
            name,
            length: declared,
            value: None,
            raw,
            sequence: Some(sequence),
        };

        return Ok((data_element, length + consumed));
    }

    let value_length = if declared == UNDEFINED_LENGTH {
        resolve_undefined_length(view, value_start, little_endian)?
    } else {
        declared as usize
    };

    // 声明的长度超过剩余字节时按剩余部分截断
    let raw = view.slice(value_start, value_start.saturating_add(value_length))?;
    if raw.len() < value_length {
        warn!(
            %tag,
            declared = value_length,
            available = raw.len(),
            "value truncated by end of buffer"
        );
    }

    let data_value = parse_data(&raw, vr, little_endian, &state.charsets)?;
    length += value_length;

    let data_element = DataElement {
        tag,
        vr: Some(vr),
        name,
        length: declared,
        value: data_value,
        raw,
        sequence: None,
    };

    Ok((data_element, length))
}

// 具体的实现依据参考下方链接里的三个表格
// https://dicom.nema.org/dicom/2013/output/chtml/part05/sect_7.5.html
fn parse_sq_data(
    view: &ByteView,
    start: usize,
    declared: u32,
    state: &EncodingState,
    dictionary: &AttributeDictionary,
) -> CommonResult<(Sequence, ByteView, usize)> {
    let bound = Bound::from_length(declared);

    match bound {
        Bound::Length(length) => {
            let content = view.slice(start, start.saturating_add(length as usize))?;
            let (items, _, _) = parse_sq_items(&content, 0, bound, state, dictionary)?;

            Ok((Sequence { bound, items }, content, length as usize))
        }
        Bound::Delimited => {
            let (items, content_length, consumed) =
                parse_sq_items(view, start, bound, state, dictionary)?;
            let content = view.slice(start, start + content_length)?;

            Ok((Sequence { bound, items }, content, consumed))
        }
    }
}

/// Returns the items, the length of their bytes, and the bytes consumed
/// including a closing delimiter.
fn parse_sq_items(
    view: &ByteView,
    start: usize,
    bound: Bound,
    state: &EncodingState,
    dictionary: &AttributeDictionary,
) -> CommonResult<(Vec<Item>, usize, usize)> {
    let mut offset = start;
    let mut items = Vec::new();

    loop {
        if offset >= view.len() {
            if bound == Bound::Delimited {
                return Err(DicomError::format(
                    view.offset() + offset,
                    "sequence without sequence delimitation item",
                ));
            }

            return Ok((items, offset - start, offset - start));
        }

        let tag = read_tag(view, offset, state.little_endian)?;

        match tag {
            Tag::ITEM => {
                let (item, consumed) = parse_item(view, offset, state, dictionary)?;
                items.push(item);
                offset += consumed;
            }
            Tag::SEQUENCE_DELIMITATION => {
                let content_length = offset - start;
                return Ok((items, content_length, content_length + ITEM_HEADER_LENGTH));
            }
            other => {
                return Err(DicomError::format(
                    view.offset() + offset,
                    format!("item tag is invalid: ({})", other),
                ));
            }
        }
    }
}

fn parse_item(
    view: &ByteView,
    cursor: usize,
    state: &EncodingState,
    dictionary: &AttributeDictionary,
) -> CommonResult<(Item, usize)> {
    let item_length = view.read_u32(cursor + 4, state.little_endian)?;
    let body_start = cursor + ITEM_HEADER_LENGTH;
    let bound = Bound::from_length(item_length);

    match bound {
        Bound::Length(length) => {
            let body = view.slice(body_start, body_start.saturating_add(length as usize))?;
            let (elements, _) = parse_item_elements(&body, 0, bound, state, dictionary)?;

            Ok((Item { bound, elements }, ITEM_HEADER_LENGTH + length as usize))
        }
        Bound::Delimited => {
            let (elements, consumed) =
                parse_item_elements(view, body_start, bound, state, dictionary)?;

            Ok((Item { bound, elements }, ITEM_HEADER_LENGTH + consumed))
        }
    }
}

// 一个item中可以包含多个element
fn parse_item_elements(
    view: &ByteView,
    start: usize,
    bound: Bound,
    state: &EncodingState,
    dictionary: &AttributeDictionary,
) -> CommonResult<(Vec<DataElement>, usize)> {
    let mut state = state.clone();
    let mut item_offset = start;
    let mut sub_elements = Vec::new();

    loop {
        if item_offset >= view.len() {
            if bound == Bound::Delimited {
                return Err(DicomError::format(
                    view.offset() + item_offset,
                    "item without item delimitation item",
                ));
            }

            return Ok((sub_elements, item_offset - start));
        }

        if bound == Bound::Delimited
            && read_tag(view, item_offset, state.little_endian)? == Tag::ITEM_DELIMITATION
        {
            item_offset += ITEM_HEADER_LENGTH;
            return Ok((sub_elements, item_offset - start));
        }

        let (data_element, consumed_bytes) =
            get_data_element(view, item_offset, &state, dictionary)?;
        item_offset += consumed_bytes;

        state = state.observe(&data_element, view.offset() + item_offset);
        sub_elements.push(data_element);
    }
}
