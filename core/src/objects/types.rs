//! objects/types.rs
//! Header, field and outcome types of the self-describing object format.
//!
//! Wire layout (all integers little-endian):
//!
//! ```text
//! [ magic (4) ]            b"HOBJ"
//! [ format_version (2) ]
//! [ header_len (2) ]       fixed part + class name + extension
//! [ class_version (2) ]
//! [ flags (2) ]
//! [ body_len (4) ]
//! [ header_crc32 (4) ]     over the header minus this field
//! [ class_name_len (1) ]
//! [ class_name (N) ]
//! [ extension (header_len - 21 - N) ]
//! [ fields (body_len) ]    repeated [ id (2) ][ wire_type (1) ][ len (4) ][ payload ]
//! ```

use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use thiserror::Error;

use crate::constants::header_flags;
use crate::histogram::HistogramObject;
use crate::utils::{enum_name_or_hex, fmt_bytes};

bitflags! {
    /// Presence bits carried in the object header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderFlags: u16 {
        const HAS_HEADER_CRC = header_flags::HAS_HEADER_CRC;
    }
}

/// Payload encodings a field may declare.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum WireType {
    U32      = 0x01,
    U64      = 0x02,
    F64      = 0x03,
    Str      = 0x04,
    F64Array = 0x05,
    F32Array = 0x06,
    I32Array = 0x07,
    Bytes    = 0x08,
}

impl WireType {
    /// Element width for array types, fixed width for scalars.
    pub const fn element_size(self) -> Option<usize> {
        match self {
            WireType::U32 | WireType::F32Array | WireType::I32Array => Some(4),
            WireType::U64 | WireType::F64 | WireType::F64Array => Some(8),
            WireType::Str | WireType::Bytes => None,
        }
    }
}

/// Parsed object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    pub format_version: u16,
    pub header_len: u16,
    pub class_version: u16,
    pub flags: HeaderFlags,
    pub body_len: u32,
    pub header_crc32: u32,
    pub class_name: String,
}

impl ObjectHeader {
    /// Fixed part up to and including the class name length byte.
    pub const FIXED_LEN: usize = 4  // magic
        + 2                        // format_version
        + 2                        // header_len
        + 2                        // class_version
        + 2                        // flags
        + 4                        // body_len
        + 4                        // header_crc32
        + 1;                       // class_name_len

    /// Offset of the crc field; the crc covers everything but these 4 bytes.
    pub const CRC_OFFSET: usize = 16;
}

/// Field header size: id (2) + wire type (1) + length (4).
pub const FIELD_HEADER_LEN: usize = 7;

/// Borrowed view over one encoded field.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    pub id: u16,
    pub raw_wire_type: u8,
    pub payload: &'a [u8],
}

impl<'a> FieldView<'a> {
    pub fn wire_type(&self) -> Option<WireType> {
        WireType::try_from(self.raw_wire_type).ok()
    }

    fn expect(&self, want: WireType) -> Result<(), ObjectError> {
        if self.raw_wire_type != want as u8 {
            return Err(ObjectError::WrongWireType {
                field_id: self.id,
                expected: want,
                found: self.raw_wire_type,
            });
        }
        Ok(())
    }

    fn fixed<const N: usize>(&self) -> Result<[u8; N], ObjectError> {
        self.payload.try_into().map_err(|_| ObjectError::InvalidFieldLength {
            field_id: self.id,
            expected: N,
            actual: self.payload.len(),
        })
    }

    pub fn as_u32(&self) -> Result<u32, ObjectError> {
        self.expect(WireType::U32)?;
        Ok(u32::from_le_bytes(self.fixed::<4>()?))
    }

    pub fn as_u64(&self) -> Result<u64, ObjectError> {
        self.expect(WireType::U64)?;
        Ok(u64::from_le_bytes(self.fixed::<8>()?))
    }

    pub fn as_f64(&self) -> Result<f64, ObjectError> {
        self.expect(WireType::F64)?;
        Ok(f64::from_le_bytes(self.fixed::<8>()?))
    }

    pub fn as_str(&self) -> Result<&'a str, ObjectError> {
        self.expect(WireType::Str)?;
        std::str::from_utf8(self.payload).map_err(|_| ObjectError::InvalidUtf8 { field_id: self.id })
    }

    /// Any numeric array widened to `f64`.
    pub fn as_f64_array(&self) -> Result<Vec<f64>, ObjectError> {
        let wire_type = match self.wire_type() {
            Some(wt @ (WireType::F64Array | WireType::F32Array | WireType::I32Array)) => wt,
            _ => {
                return Err(ObjectError::WrongWireType {
                    field_id: self.id,
                    expected: WireType::F64Array,
                    found: self.raw_wire_type,
                })
            }
        };

        let width = wire_type.element_size().unwrap_or(8);
        if self.payload.len() % width != 0 {
            return Err(ObjectError::InvalidFieldLength {
                field_id: self.id,
                expected: self.payload.len() - self.payload.len() % width,
                actual: self.payload.len(),
            });
        }

        let values = self.payload.chunks_exact(width);
        let out = match wire_type {
            WireType::F32Array => values
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
            WireType::I32Array => values
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
            _ => values
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        };
        Ok(out)
    }
}

/// Identity of a class plus the family it decodes as.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeTag {
    pub name: String,
    pub family: String,
}

/// Result of interpreting one frame. Never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedObject {
    Histogram(HistogramObject),
    /// No object could be read from the frame.
    Absent { reason: ObjectError },
    /// A well-formed object of a class this decoder does not handle.
    TypeMismatch { found: String, expected: String },
}

impl DecodedObject {
    pub fn histogram(&self) -> Option<&HistogramObject> {
        match self {
            DecodedObject::Histogram(h) => Some(h),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, DecodedObject::Absent { .. })
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, DecodedObject::TypeMismatch { .. })
    }

    /// Short label used in reports and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            DecodedObject::Histogram(_) => "histogram",
            DecodedObject::Absent { .. } => "absent",
            DecodedObject::TypeMismatch { .. } => "type_mismatch",
        }
    }
}

fn wire_type_name(raw: &u8) -> String {
    enum_name_or_hex::<WireType>(*raw)
}

/// Why a frame yielded no object (or why encoding refused a draft).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    #[error("truncated object: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("invalid object magic: {}", fmt_bytes(.0))]
    InvalidMagic([u8; 4]),

    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u16),

    #[error("invalid header length {header_len} (minimum {min})")]
    InvalidHeaderLength { header_len: usize, min: usize },

    #[error("header crc mismatch: stored 0x{stored:08x}, computed 0x{computed:08x}")]
    HeaderCrcMismatch { stored: u32, computed: u32 },

    #[error("class name is not valid UTF-8")]
    InvalidClassName,

    #[error("class name too long: {0} bytes")]
    ClassNameTooLong(usize),

    #[error("object body overruns frame: declared {declared}, available {available}")]
    BodyOverrun { declared: usize, available: usize },

    #[error("field {field_id} overruns body: declared {declared}, available {available}")]
    FieldOverrun { field_id: u16, declared: usize, available: usize },

    #[error("field {field_id}: expected {expected:?}, found wire type {}", wire_type_name(.found))]
    WrongWireType { field_id: u16, expected: WireType, found: u8 },

    #[error("field {field_id}: invalid length {actual} (expected {expected})")]
    InvalidFieldLength { field_id: u16, expected: usize, actual: usize },

    #[error("field {field_id}: string is not valid UTF-8")]
    InvalidUtf8 { field_id: u16 },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field}: expected {expected} values, got {actual}")]
    LengthMismatch { field: &'static str, expected: usize, actual: usize },

    #[error("invalid axis: {0}")]
    InvalidAxis(String),

    #[error("object too large to encode: {0}")]
    TooLarge(&'static str),
}
