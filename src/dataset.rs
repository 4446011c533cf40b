//! Whole-file decode pass.
//!
//! [`DatasetReader`] walks the buffer element by element after the preamble
//! and `DICM` prefix. The file meta group is always read as explicit VR
//! little endian; once the cursor leaves it, the encoding declared by
//! (0002,0010) takes over for the rest of the stream.

use std::io::{Read, Write};
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::charset::{default_charsets, resolve_charsets, TextEncoding};
use crate::dictionary::AttributeDictionary;
use crate::model::{DataElement, DicomValue, Tag};
use crate::service;
use crate::transfer_syntax::{self, TransferSyntax};
use crate::util;
use crate::view::ByteView;
use crate::CommonResult;

/// Encoding in effect for the next element read.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingState {
    pub explicit_vr: bool,
    pub little_endian: bool,
    pub charsets: Vec<TextEncoding>,
    /// Still inside the file meta group
    pub in_meta_group: bool,
    /// Absolute offset where the meta group ends, once (0002,0000) is read
    pub meta_group_end: Option<usize>,
    /// Number of enclosing sequences
    pub sequence_depth: usize,
}

impl EncodingState {
    fn with_encoding(explicit_vr: bool, little_endian: bool) -> Self {
        EncodingState {
            explicit_vr,
            little_endian,
            charsets: default_charsets(),
            in_meta_group: false,
            meta_group_end: None,
            sequence_depth: 0,
        }
    }

    /// State at the start of the file meta group.
    pub fn meta() -> Self {
        EncodingState {
            in_meta_group: true,
            ..Self::explicit_little()
        }
    }

    pub fn explicit_little() -> Self {
        Self::with_encoding(true, true)
    }

    pub fn implicit_little() -> Self {
        Self::with_encoding(false, true)
    }

    pub fn explicit_big() -> Self {
        Self::with_encoding(true, false)
    }

    pub fn for_syntax(uid: &str) -> Self {
        let (explicit_vr, little_endian) = transfer_syntax::encoding_for(uid);
        Self::with_encoding(explicit_vr, little_endian)
    }

    /// Fold a freshly read element into the state.
    ///
    /// `next_cursor` is the absolute offset just past `element`.
    pub fn observe(mut self, element: &DataElement, next_cursor: usize) -> Self {
        match element.tag {
            Tag::SPECIFIC_CHARACTER_SET => {
                match element.value.as_ref().and_then(DicomValue::as_str) {
                    Some(value) => {
                        self.charsets = resolve_charsets(value);
                        let names = self
                            .charsets
                            .iter()
                            .map(TextEncoding::name)
                            .collect::<Vec<_>>();
                        debug!(charsets = ?names, "specific character set");
                    }
                    None => warn!(vr = ?element.vr, "specific character set without text value"),
                }
            }
            Tag::META_GROUP_LENGTH if self.in_meta_group => {
                if let Some(DicomValue::U32(length)) = element.value {
                    self.meta_group_end = Some(next_cursor + length as usize);
                }
            }
            _ => {}
        }

        self
    }

    /// The meta group ends at the recorded boundary, or at the first element
    /// of another group when no (0002,0000) was present.
    fn meta_group_ended(&self, view: &ByteView, cursor: usize) -> bool {
        if let Some(end) = self.meta_group_end {
            if view.offset() + cursor >= end {
                return true;
            }
        }

        match view.read_u16(cursor, true) {
            Ok(group) => group != 0x0002,
            Err(_) => true,
        }
    }

    /// Switch to the negotiated transfer syntax. Charsets carry over.
    pub fn leave_meta_group(self, offset: usize, transfer_syntax_uid: Option<&str>) -> Self {
        let next = match transfer_syntax_uid {
            Some(uid) => {
                if transfer_syntax::lookup(uid).is_none() {
                    warn!(uid, "unknown transfer syntax, assuming explicit VR little endian");
                }
                Self::for_syntax(uid)
            }
            None => {
                warn!("no transfer syntax in meta group, assuming explicit VR little endian");
                Self::explicit_little()
            }
        };

        info!(
            offset,
            explicit_vr = next.explicit_vr,
            little_endian = next.little_endian,
            "end of file meta group"
        );

        EncodingState {
            charsets: self.charsets,
            ..next
        }
    }
}

/// Decoded file: the elements in stream order plus the negotiated encoding.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub explicit_vr: bool,
    pub little_endian: bool,
    transfer_syntax_uid: Option<String>,
    elements: Vec<DataElement>,
}

impl Dataset {
    pub fn elements(&self) -> &[DataElement] {
        &self.elements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DataElement> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// First top-level element with `tag`.
    pub fn get(&self, tag: Tag) -> Option<&DataElement> {
        self.elements.iter().find(|element| element.tag == tag)
    }

    pub fn value(&self, tag: Tag) -> Option<&DicomValue> {
        self.get(tag).and_then(|element| element.value.as_ref())
    }

    pub fn pixel_data(&self) -> Option<&DataElement> {
        self.get(Tag::PIXEL_DATA)
    }

    pub fn transfer_syntax_uid(&self) -> Option<&str> {
        self.transfer_syntax_uid.as_deref()
    }

    pub fn transfer_syntax(&self) -> Option<&'static TransferSyntax> {
        self.transfer_syntax_uid
            .as_deref()
            .and_then(transfer_syntax::lookup)
    }

    /// One line per element; sequence items are indented under their
    /// sequence.
    pub fn dump(&self, out: &mut impl Write) -> std::io::Result<()> {
        for element in &self.elements {
            dump_element(out, element, 0)?;
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a DataElement;
    type IntoIter = std::slice::Iter<'a, DataElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

fn dump_element(out: &mut impl Write, element: &DataElement, depth: usize) -> std::io::Result<()> {
    let indent = "  ".repeat(depth);
    writeln!(out, "{}{}", indent, element)?;

    if let Some(sequence) = &element.sequence {
        for (index, item) in sequence.items.iter().enumerate() {
            writeln!(out, "{}  > Item #{}", indent, index + 1)?;
            for sub_element in &item.elements {
                dump_element(out, sub_element, depth + 2)?;
            }
        }
    }

    Ok(())
}

pub struct DatasetReader<'d> {
    dictionary: &'d AttributeDictionary,
}

impl Default for DatasetReader<'static> {
    fn default() -> Self {
        DatasetReader::new(AttributeDictionary::standard())
    }
}

impl<'d> DatasetReader<'d> {
    pub fn new(dictionary: &'d AttributeDictionary) -> Self {
        DatasetReader { dictionary }
    }

    pub fn read_file(&self, path: &Path) -> CommonResult<Dataset> {
        let mut file = util::get_file(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;

        info!(path = %path.display(), size = buffer.len(), "read file");

        self.read(&ByteView::new(buffer))
    }

    pub fn read(&self, view: &ByteView) -> CommonResult<Dataset> {
        let (_, mut cursor) = service::get_preamble(view)?;
        cursor += service::get_prefix(view, cursor)?;

        let mut state = EncodingState::meta();
        let mut transfer_syntax_uid: Option<String> = None;
        let mut elements = Vec::new();

        while cursor < view.len() {
            if state.in_meta_group && state.meta_group_ended(view, cursor) {
                let offset = view.offset() + cursor;
                state = state.leave_meta_group(offset, transfer_syntax_uid.as_deref());
            }

            let (data_element, consumed) =
                service::get_data_element(view, cursor, &state, self.dictionary)?;
            cursor += consumed;

            debug!(
                tag = %data_element.tag,
                vr = ?data_element.vr.map(|vr| vr.to_string()),
                length = data_element.length,
                "{}",
                data_element.name
            );

            match data_element.tag {
                Tag::TRANSFER_SYNTAX_UID => {
                    let uid = data_element
                        .value
                        .as_ref()
                        .and_then(DicomValue::as_str)
                        .map(str::to_string);

                    if state.in_meta_group && transfer_syntax_uid.is_none() {
                        info!(uid = ?uid, "transfer syntax");
                        transfer_syntax_uid = uid;
                    } else if transfer_syntax_uid.is_some() {
                        warn!(uid = ?uid, "transfer syntax already fixed, ignoring");
                    } else {
                        warn!(uid = ?uid, "transfer syntax outside file meta group");
                    }
                }
                Tag::PIXEL_DATA => {
                    info!(
                        offset = data_element.raw.offset(),
                        size = data_element.raw.len(),
                        "pixel data"
                    );
                }
                _ => {}
            }

            state = state.observe(&data_element, view.offset() + cursor);
            elements.push(data_element);
        }

        let (explicit_vr, little_endian) = match transfer_syntax_uid.as_deref() {
            Some(uid) => transfer_syntax::encoding_for(uid),
            None => (true, true),
        };

        Ok(Dataset {
            explicit_vr,
            little_endian,
            transfer_syntax_uid,
            elements,
        })
    }
}

/// Decode an in-memory Part 10 file with the built-in dictionary.
pub fn read_bytes(buffer: impl Into<Bytes>) -> CommonResult<Dataset> {
    DatasetReader::default().read(&ByteView::new(buffer))
}

/// Decode a Part 10 file from disk with the built-in dictionary.
pub fn read_file(path: impl AsRef<Path>) -> CommonResult<Dataset> {
    DatasetReader::default().read_file(path.as_ref())
}
