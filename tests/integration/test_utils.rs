//! Builders for synthetic DICOM files.

use std::path::PathBuf;

use tempfile::TempDir;

pub const IMPLICIT_LE: &str = "1.2.840.10008.1.2";
pub const EXPLICIT_LE: &str = "1.2.840.10008.1.2.1";
pub const EXPLICIT_BE: &str = "1.2.840.10008.1.2.2";
pub const JPEG_BASELINE: &str = "1.2.840.10008.1.2.4.50";

const LONG_LENGTH_VRS: &[&[u8; 2]] = &[
    b"OB", b"OD", b"OF", b"OL", b"OV", b"OW", b"SQ", b"SV", b"UC", b"UN", b"UR", b"UT", b"UV",
];

/// Transfer syntax used for the body of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    ImplicitLittle,
    ExplicitLittle,
    ExplicitBig,
}

impl Encoding {
    fn little_endian(self) -> bool {
        self != Encoding::ExplicitBig
    }
}

fn u16_bytes(value: u16, little_endian: bool) -> [u8; 2] {
    if little_endian {
        value.to_le_bytes()
    } else {
        value.to_be_bytes()
    }
}

fn u32_bytes(value: u32, little_endian: bool) -> [u8; 4] {
    if little_endian {
        value.to_le_bytes()
    } else {
        value.to_be_bytes()
    }
}

/// Pad a text value to even length with `pad`.
pub fn padded(value: &[u8], pad: u8) -> Vec<u8> {
    let mut bytes = value.to_vec();
    if bytes.len() % 2 == 1 {
        bytes.push(pad);
    }
    bytes
}

/// Encode one element header + value.
///
/// `length` overrides the declared length (e.g. `0xFFFFFFFF`).
pub fn element(
    encoding: Encoding,
    group: u16,
    element: u16,
    vr: &[u8; 2],
    value: &[u8],
    length: Option<u32>,
) -> Vec<u8> {
    let little_endian = encoding.little_endian();
    let declared = length.unwrap_or(value.len() as u32);

    let mut out = Vec::new();
    out.extend_from_slice(&u16_bytes(group, little_endian));
    out.extend_from_slice(&u16_bytes(element, little_endian));

    if encoding == Encoding::ImplicitLittle {
        out.extend_from_slice(&u32_bytes(declared, true));
    } else if LONG_LENGTH_VRS.contains(&vr) {
        out.extend_from_slice(vr);
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&u32_bytes(declared, little_endian));
    } else {
        out.extend_from_slice(vr);
        out.extend_from_slice(&u16_bytes(declared as u16, little_endian));
    }

    out.extend_from_slice(value);
    out
}

/// Item (FFFE,E000) holding `body`; `delimited` closes it with (FFFE,E00D).
pub fn item(encoding: Encoding, body: &[u8], delimited: bool) -> Vec<u8> {
    let little_endian = encoding.little_endian();
    let mut out = Vec::new();
    out.extend_from_slice(&u16_bytes(0xFFFE, little_endian));
    out.extend_from_slice(&u16_bytes(0xE000, little_endian));

    if delimited {
        out.extend_from_slice(&u32_bytes(0xFFFF_FFFF, little_endian));
        out.extend_from_slice(body);
        out.extend_from_slice(&u16_bytes(0xFFFE, little_endian));
        out.extend_from_slice(&u16_bytes(0xE00D, little_endian));
        out.extend_from_slice(&[0, 0, 0, 0]);
    } else {
        out.extend_from_slice(&u32_bytes(body.len() as u32, little_endian));
        out.extend_from_slice(body);
    }

    out
}

pub fn sequence_delimiter(encoding: Encoding) -> Vec<u8> {
    let little_endian = encoding.little_endian();
    let mut out = Vec::new();
    out.extend_from_slice(&u16_bytes(0xFFFE, little_endian));
    out.extend_from_slice(&u16_bytes(0xE0DD, little_endian));
    out.extend_from_slice(&[0, 0, 0, 0]);
    out
}

/// Part 10 file assembled from a meta group and body elements.
pub struct DicomFileBuilder {
    transfer_syntax: String,
    body_encoding: Encoding,
    group_length: bool,
    body: Vec<u8>,
}

impl DicomFileBuilder {
    pub fn new(transfer_syntax: &str, body_encoding: Encoding) -> Self {
        DicomFileBuilder {
            transfer_syntax: transfer_syntax.to_string(),
            body_encoding,
            group_length: true,
            body: Vec::new(),
        }
    }

    pub fn explicit_little() -> Self {
        Self::new(EXPLICIT_LE, Encoding::ExplicitLittle)
    }

    pub fn without_group_length(mut self) -> Self {
        self.group_length = false;
        self
    }

    pub fn element(mut self, group: u16, element_number: u16, vr: &[u8; 2], value: &[u8]) -> Self {
        let bytes = element(self.body_encoding, group, element_number, vr, value, None);
        self.body.extend(bytes);
        self
    }

    /// Append already encoded bytes.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let meta = Encoding::ExplicitLittle;
        let mut meta_elements = element(meta, 0x0002, 0x0001, b"OB", &[0x00, 0x01], None);
        meta_elements.extend(element(
            meta,
            0x0002,
            0x0010,
            b"UI",
            &padded(self.transfer_syntax.as_bytes(), 0),
            None,
        ));

        let mut out = vec![0u8; 128];
        out.extend_from_slice(b"DICM");
        if self.group_length {
            out.extend(element(
                meta,
                0x0002,
                0x0000,
                b"UL",
                &(meta_elements.len() as u32).to_le_bytes(),
                None,
            ));
        }
        out.extend(meta_elements);
        out.extend_from_slice(&self.body);
        out
    }

    /// Write the file into a fresh temporary directory.
    pub fn write(&self) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("test.dcm");
        std::fs::write(&path, self.build()).expect("write test file");
        (dir, path)
    }
}
