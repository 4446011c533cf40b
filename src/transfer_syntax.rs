//! Transfer syntax UID table.

use std::collections::HashMap;

use lazy_static::lazy_static;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSyntax {
    pub uid: &'static str,
    pub name: &'static str,
    pub explicit_vr: bool,
    pub little_endian: bool,
    /// Pixel data is stored as compressed fragments
    pub encapsulated: bool,
}

pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";

const fn native(
    uid: &'static str,
    name: &'static str,
    explicit_vr: bool,
    little_endian: bool,
) -> TransferSyntax {
    TransferSyntax {
        uid,
        name,
        explicit_vr,
        little_endian,
        encapsulated: false,
    }
}

const fn encapsulated(uid: &'static str, name: &'static str) -> TransferSyntax {
    TransferSyntax {
        uid,
        name,
        explicit_vr: true,
        little_endian: true,
        encapsulated: true,
    }
}

const TRANSFER_SYNTAXES: &[TransferSyntax] = &[
    native(IMPLICIT_VR_LITTLE_ENDIAN, "Implicit VR Little Endian", false, true),
    native(EXPLICIT_VR_LITTLE_ENDIAN, "Explicit VR Little Endian", true, true),
    native(EXPLICIT_VR_BIG_ENDIAN, "Explicit VR Big Endian", true, false),
    encapsulated("1.2.840.10008.1.2.5", "RLE Lossless"),
    encapsulated("1.2.840.10008.1.2.4.50", "JPEG Baseline (Process 1)"),
    encapsulated("1.2.840.10008.1.2.4.51", "JPEG Extended (Process 2 & 4)"),
    encapsulated("1.2.840.10008.1.2.4.57", "JPEG Lossless, Non-Hierarchical (Process 14)"),
    encapsulated(
        "1.2.840.10008.1.2.4.70",
        "JPEG Lossless, Non-Hierarchical, First-Order Prediction",
    ),
    encapsulated("1.2.840.10008.1.2.4.80", "JPEG-LS Lossless"),
    encapsulated("1.2.840.10008.1.2.4.81", "JPEG-LS Lossy (Near-Lossless)"),
    encapsulated("1.2.840.10008.1.2.4.90", "JPEG 2000 (Lossless Only)"),
    encapsulated("1.2.840.10008.1.2.4.91", "JPEG 2000"),
];

lazy_static! {
    static ref REGISTRY: HashMap<&'static str, &'static TransferSyntax> = TRANSFER_SYNTAXES
        .iter()
        .map(|ts| (ts.uid, ts))
        .collect();
}

pub fn lookup(uid: &str) -> Option<&'static TransferSyntax> {
    REGISTRY.get(uid.trim_end_matches(&['\0', ' '][..])).copied()
}

/// `(explicit_vr, little_endian)` for `uid`.
///
/// Unknown UIDs are assumed to be encapsulated syntaxes, which are always
/// explicit VR little endian (PS3.5 A.4).
pub fn encoding_for(uid: &str) -> (bool, bool) {
    match lookup(uid) {
        Some(ts) => (ts.explicit_vr, ts.little_endian),
        None => (true, true),
    }
}
