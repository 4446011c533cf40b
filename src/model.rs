use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::view::ByteView;

/// Declared length meaning "ends at a delimiter".
pub const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

/// Values at least this long are summarised instead of printed.
const PRINT_LIMIT: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub group: u16,
    pub element: u16,
}

impl Tag {
    pub const META_GROUP_LENGTH: Tag = Tag::new(0x0002, 0x0000);
    pub const TRANSFER_SYNTAX_UID: Tag = Tag::new(0x0002, 0x0010);
    pub const SPECIFIC_CHARACTER_SET: Tag = Tag::new(0x0008, 0x0005);
    pub const PATIENT_NAME: Tag = Tag::new(0x0010, 0x0010);
    pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag::new(0x0028, 0x0004);
    pub const ROWS: Tag = Tag::new(0x0028, 0x0010);
    pub const COLUMNS: Tag = Tag::new(0x0028, 0x0011);
    pub const BITS_ALLOCATED: Tag = Tag::new(0x0028, 0x0100);
    pub const BITS_STORED: Tag = Tag::new(0x0028, 0x0101);
    pub const PIXEL_REPRESENTATION: Tag = Tag::new(0x0028, 0x0103);
    pub const WINDOW_CENTER: Tag = Tag::new(0x0028, 0x1050);
    pub const WINDOW_WIDTH: Tag = Tag::new(0x0028, 0x1051);
    pub const RESCALE_INTERCEPT: Tag = Tag::new(0x0028, 0x1052);
    pub const RESCALE_SLOPE: Tag = Tag::new(0x0028, 0x1053);
    pub const PIXEL_DATA: Tag = Tag::new(0x7FE0, 0x0010);
    pub const ITEM: Tag = Tag::new(0xFFFE, 0xE000);
    pub const ITEM_DELIMITATION: Tag = Tag::new(0xFFFE, 0xE00D);
    pub const SEQUENCE_DELIMITATION: Tag = Tag::new(0xFFFE, 0xE0DD);

    pub const fn new(group: u16, element: u16) -> Self {
        Tag { group, element }
    }

    /// File meta information, always explicit VR little endian.
    #[inline]
    pub fn is_meta(&self) -> bool {
        self.group == 0x0002
    }

    /// Item and delimitation tags, which carry no VR-typed value.
    #[inline]
    pub fn is_delimiter(&self) -> bool {
        self.group == 0xFFFE
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x},{:04x}", self.group, self.element)
    }
}

/// Value representation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vr {
    AE,
    AS,
    AT,
    CS,
    DA,
    DS,
    DT,
    FD,
    FL,
    IS,
    LO,
    LT,
    OB,
    OD,
    OF,
    OL,
    OV,
    OW,
    PN,
    SH,
    SL,
    SQ,
    SS,
    ST,
    SV,
    TM,
    UC,
    UI,
    UL,
    UN,
    UR,
    US,
    UT,
    UV,
    /// Two bytes that are not a known VR code
    Unrecognized([u8; 2]),
}

const KNOWN_VRS: [(Vr, [u8; 2]); 34] = [
    (Vr::AE, *b"AE"),
    (Vr::AS, *b"AS"),
    (Vr::AT, *b"AT"),
    (Vr::CS, *b"CS"),
    (Vr::DA, *b"DA"),
    (Vr::DS, *b"DS"),
    (Vr::DT, *b"DT"),
    (Vr::FD, *b"FD"),
    (Vr::FL, *b"FL"),
    (Vr::IS, *b"IS"),
    (Vr::LO, *b"LO"),
    (Vr::LT, *b"LT"),
    (Vr::OB, *b"OB"),
    (Vr::OD, *b"OD"),
    (Vr::OF, *b"OF"),
    (Vr::OL, *b"OL"),
    (Vr::OV, *b"OV"),
    (Vr::OW, *b"OW"),
    (Vr::PN, *b"PN"),
    (Vr::SH, *b"SH"),
    (Vr::SL, *b"SL"),
    (Vr::SQ, *b"SQ"),
    (Vr::SS, *b"SS"),
    (Vr::ST, *b"ST"),
    (Vr::SV, *b"SV"),
    (Vr::TM, *b"TM"),
    (Vr::UC, *b"UC"),
    (Vr::UI, *b"UI"),
    (Vr::UL, *b"UL"),
    (Vr::UN, *b"UN"),
    (Vr::UR, *b"UR"),
    (Vr::US, *b"US"),
    (Vr::UT, *b"UT"),
    (Vr::UV, *b"UV"),
];

impl Vr {
    pub fn from_bytes(code: [u8; 2]) -> Vr {
        KNOWN_VRS
            .iter()
            .find(|(_, known)| *known == code)
            .map(|(vr, _)| *vr)
            .unwrap_or(Vr::Unrecognized(code))
    }

    pub fn code(&self) -> [u8; 2] {
        match self {
            Vr::Unrecognized(code) => *code,
            known => KNOWN_VRS
                .iter()
                .find(|(vr, _)| vr == known)
                .map(|(_, code)| *code)
                .unwrap_or(*b"??"),
        }
    }

    /// Explicit VR encodings that use 2 reserved bytes and a 4-byte length.
    pub fn has_long_length(&self) -> bool {
        matches!(
            self,
            Vr::OB
                | Vr::OD
                | Vr::OF
                | Vr::OL
                | Vr::OV
                | Vr::OW
                | Vr::SQ
                | Vr::SV
                | Vr::UC
                | Vr::UN
                | Vr::UR
                | Vr::UT
                | Vr::UV
        )
    }
}

impl fmt::Display for Vr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code();
        write!(f, "{}{}", code[0] as char, code[1] as char)
    }
}

impl FromStr for Vr {
    type Err = String;

    /// Accepts the first code of dictionary spellings like `US or SS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.split_whitespace().next().unwrap_or("").as_bytes();
        if code.len() != 2 {
            return Err(format!("invalid VR: {:?}", s));
        }

        match Vr::from_bytes([code[0], code[1]]) {
            Vr::Unrecognized(_) => Err(format!("unknown VR: {:?}", s)),
            vr => Ok(vr),
        }
    }
}

/// Decoded element value.
///
/// Numeric VRs with a multiplicity of exactly one decode to the scalar
/// variants, except US/OW/OF/OD which always stay vectors.
#[derive(Debug, Clone, PartialEq)]
pub enum DicomValue {
    String(String),
    TagPairs(Vec<(String, String)>),
    Float(f32),
    Floats(Vec<f32>),
    Double(f64),
    Doubles(Vec<f64>),
    I16(i16),
    I16s(Vec<i16>),
    I32(i32),
    I32s(Vec<i32>),
    U32(u32),
    U32s(Vec<u32>),
    U16s(Vec<u16>),
    Bytes(Bytes),
}

impl DicomValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DicomValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// First numeric component, widened to `f64`.
    pub fn first_number(&self) -> Option<f64> {
        match self {
            DicomValue::Float(v) => Some(*v as f64),
            DicomValue::Floats(v) => v.first().map(|v| *v as f64),
            DicomValue::Double(v) => Some(*v),
            DicomValue::Doubles(v) => v.first().copied(),
            DicomValue::I16(v) => Some(*v as f64),
            DicomValue::I16s(v) => v.first().map(|v| *v as f64),
            DicomValue::I32(v) => Some(*v as f64),
            DicomValue::I32s(v) => v.first().map(|v| *v as f64),
            DicomValue::U32(v) => Some(*v as f64),
            DicomValue::U32s(v) => v.first().map(|v| *v as f64),
            DicomValue::U16s(v) => v.first().map(|v| *v as f64),
            // DS / IS are kept as text; multi-valued ones are backslash separated
            DicomValue::String(v) => v.split('\\').next()?.trim().parse().ok(),
            DicomValue::TagPairs(_) | DicomValue::Bytes(_) => None,
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", v)?;
    }
    write!(f, "]")
}

impl fmt::Display for DicomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DicomValue::String(v) => write!(f, "{}", v),
            DicomValue::TagPairs(pairs) => {
                let pairs = pairs
                    .iter()
                    .map(|(g, e)| format!("({}, {})", g, e))
                    .collect::<Vec<_>>();
                write_list(f, &pairs)
            }
            DicomValue::Float(v) => write!(f, "{}", v),
            DicomValue::Floats(v) => write_list(f, v),
            DicomValue::Double(v) => write!(f, "{}", v),
            DicomValue::Doubles(v) => write_list(f, v),
            DicomValue::I16(v) => write!(f, "{}", v),
            DicomValue::I16s(v) => write_list(f, v),
            DicomValue::I32(v) => write!(f, "{}", v),
            DicomValue::I32s(v) => write_list(f, v),
            DicomValue::U32(v) => write!(f, "{}", v),
            DicomValue::U32s(v) => write_list(f, v),
            DicomValue::U16s(v) => write_list(f, v),
            DicomValue::Bytes(v) => write_list(f, v),
        }
    }
}

/// How a sequence or item finds its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Explicit byte count
    Length(u32),
    /// Terminated by a delimitation item
    Delimited,
}

impl Bound {
    pub fn from_length(length: u32) -> Bound {
        if length == UNDEFINED_LENGTH {
            Bound::Delimited
        } else {
            Bound::Length(length)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Item {
    pub bound: Bound,
    pub elements: Vec<DataElement>,
}

#[derive(Debug, Clone)]
pub struct Sequence {
    pub bound: Bound,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone)]
pub struct DataElement {
    pub tag: Tag,
    pub vr: Option<Vr>,
    pub name: String,
    /// Length as declared in the header, possibly [`UNDEFINED_LENGTH`]
    pub length: u32,
    pub value: Option<DicomValue>,
    /// Value bytes; for sequences, the items without the closing delimiter
    pub raw: ByteView,
    pub sequence: Option<Sequence>,
}

impl DataElement {
    pub fn is_undefined_length(&self) -> bool {
        self.length == UNDEFINED_LENGTH
    }
}

impl fmt::Display for DataElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vr = match self.vr {
            Some(vr) => vr.to_string(),
            None => "None".to_string(),
        };
        write!(f, "[{}]({}){}:", self.tag, vr, self.name)?;

        // 未定义长度的值（比如封装的像素数据）已经通过扫描确定了实际长度
        let length = if self.is_undefined_length() && self.value.is_some() {
            self.raw.len() as u32
        } else {
            self.length
        };

        if length < PRINT_LIMIT {
            match &self.value {
                Some(value) => write!(f, " {}", value),
                None => write!(f, " None"),
            }
        } else if length == UNDEFINED_LENGTH {
            write!(f, " {{undefined length}}")
        } else {
            write!(f, "[{} bytes] {{value too long to show}}", length)
        }
    }
}
