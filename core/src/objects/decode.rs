//! objects/decode.rs
//!
//! Object decoding.
//!
//! Design notes:
//! - Header parsing is strict: anything that does not parse yields `Absent`.
//! - The class family is checked before a single field is read, so a foreign
//!   object is never partially constructed.
//! - Fields are walked using the stream's own layout. Unknown ids are skipped,
//!   later duplicates overwrite earlier ones, missing optional fields keep
//!   their defaults.

use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

use crate::constants::{histogram_fields as hf, MAGIC_HOBJ};
use crate::histogram::{HistogramObject, HistogramParts};
use crate::objects::registry;
use crate::objects::types::{
    DecodedObject, FieldView, HeaderFlags, ObjectError, ObjectHeader, TypeTag, FIELD_HEADER_LEN,
};

/// Parse and validate the object header at the start of `wire`.
pub fn parse_object_header(wire: &[u8]) -> Result<ObjectHeader, ObjectError> {
    if wire.len() < ObjectHeader::FIXED_LEN {
        return Err(ObjectError::Truncated { need: ObjectHeader::FIXED_LEN, have: wire.len() });
    }

    // --- fixed offsets ---
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&wire[0..4]);
    if magic != MAGIC_HOBJ {
        return Err(ObjectError::InvalidMagic(magic));
    }

    let format_version = LittleEndian::read_u16(&wire[4..6]);
    if format_version == 0 {
        return Err(ObjectError::UnsupportedVersion(format_version));
    }

    let header_len = LittleEndian::read_u16(&wire[6..8]);
    let class_version = LittleEndian::read_u16(&wire[8..10]);
    let flags = HeaderFlags::from_bits_retain(LittleEndian::read_u16(&wire[10..12]));
    let body_len = LittleEndian::read_u32(&wire[12..16]);
    let header_crc32 = LittleEndian::read_u32(&wire[16..20]);
    let name_len = wire[20] as usize;

    let min_len = ObjectHeader::FIXED_LEN + name_len;
    let header_end = header_len as usize;
    if header_end < min_len {
        return Err(ObjectError::InvalidHeaderLength { header_len: header_end, min: min_len });
    }
    if wire.len() < header_end {
        return Err(ObjectError::Truncated { need: header_end, have: wire.len() });
    }

    if flags.contains(HeaderFlags::HAS_HEADER_CRC) {
        let computed = header_crc(&wire[..header_end]);
        if computed != header_crc32 {
            return Err(ObjectError::HeaderCrcMismatch { stored: header_crc32, computed });
        }
    }

    let class_name = std::str::from_utf8(&wire[ObjectHeader::FIXED_LEN..min_len])
        .map_err(|_| ObjectError::InvalidClassName)?
        .to_string();

    Ok(ObjectHeader {
        format_version,
        header_len,
        class_version,
        flags,
        body_len,
        header_crc32,
        class_name,
    })
}

/// crc32 over a full header, skipping the crc field itself.
pub fn header_crc(header: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header[..ObjectHeader::CRC_OFFSET]);
    hasher.update(&header[ObjectHeader::CRC_OFFSET + 4..]);
    hasher.finalize()
}

/// Slice the field section out of the frame.
///
/// Bytes past `header_len + body_len` are ignored.
pub fn object_body<'a>(wire: &'a [u8], header: &ObjectHeader) -> Result<&'a [u8], ObjectError> {
    let start = header.header_len as usize;
    let available = wire.len().saturating_sub(start);
    let declared = header.body_len as usize;
    if declared > available {
        return Err(ObjectError::BodyOverrun { declared, available });
    }
    Ok(&wire[start..start + declared])
}

/// Iterator over the fields of an object body.
///
/// Yields one `Err` and then stops if a field overruns the body.
pub struct Fields<'a> {
    body: &'a [u8],
    off: usize,
    failed: bool,
}

pub fn fields(body: &[u8]) -> Fields<'_> {
    Fields { body, off: 0, failed: false }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<FieldView<'a>, ObjectError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.off >= self.body.len() {
            return None;
        }

        let rest = &self.body[self.off..];
        if rest.len() < FIELD_HEADER_LEN {
            self.failed = true;
            return Some(Err(ObjectError::Truncated {
                need: self.off + FIELD_HEADER_LEN,
                have: self.body.len(),
            }));
        }

        let id = LittleEndian::read_u16(&rest[0..2]);
        let raw_wire_type = rest[2];
        let declared = LittleEndian::read_u32(&rest[3..7]) as usize;
        let available = rest.len() - FIELD_HEADER_LEN;
        if declared > available {
            self.failed = true;
            return Some(Err(ObjectError::FieldOverrun { field_id: id, declared, available }));
        }

        let payload = &rest[FIELD_HEADER_LEN..FIELD_HEADER_LEN + declared];
        self.off += FIELD_HEADER_LEN + declared;

        Some(Ok(FieldView { id, raw_wire_type, payload }))
    }
}

/// Decoder bound to one expected type.
#[derive(Debug, Clone)]
pub struct ObjectDecoder {
    expected: TypeTag,
}

impl ObjectDecoder {
    pub fn new(expected: TypeTag) -> Self {
        Self { expected }
    }

    /// Convenience: resolve `name` through the class registry.
    pub fn for_type(name: &str) -> Option<Self> {
        TypeTag::from_name(name).map(Self::new)
    }

    pub fn expected(&self) -> &TypeTag {
        &self.expected
    }

    pub fn decode(&self, frame: &[u8]) -> DecodedObject {
        decode(frame, &self.expected)
    }
}

/// Interpret `frame` as an object of `expected`'s family.
///
/// Never panics and never fails: malformed input is `Absent`, foreign input
/// is `TypeMismatch`.
pub fn decode(frame: &[u8], expected: &TypeTag) -> DecodedObject {
    let header = match parse_object_header(frame) {
        Ok(h) => h,
        Err(reason) => {
            trace!(%reason, len = frame.len(), "object header rejected");
            return DecodedObject::Absent { reason };
        }
    };

    let found = registry::resolve(&header.class_name);
    if !found.same_family(expected) || !registry::is_materializable(&found.family) {
        return DecodedObject::TypeMismatch {
            found: found.name,
            expected: expected.name.clone(),
        };
    }

    let result = object_body(frame, &header).and_then(|body| read_histogram(&header, body));
    match result {
        Ok(h) => DecodedObject::Histogram(h),
        Err(reason) => {
            trace!(%reason, class = %header.class_name, "object body rejected");
            DecodedObject::Absent { reason }
        }
    }
}

fn read_histogram(header: &ObjectHeader, body: &[u8]) -> Result<HistogramObject, ObjectError> {
    let mut parts = HistogramParts {
        class_name: header.class_name.clone(),
        class_version: header.class_version,
        ..Default::default()
    };

    for field in fields(body) {
        let field = field?;
        match field.id {
            hf::NAME => parts.name = field.as_str()?.to_string(),
            hf::TITLE => parts.title = field.as_str()?.to_string(),
            hf::NBINS => parts.nbins = Some(field.as_u32()?),
            hf::X_MIN => parts.x_min = Some(field.as_f64()?),
            hf::X_MAX => parts.x_max = Some(field.as_f64()?),
            hf::X_EDGES => parts.x_edges = Some(field.as_f64_array()?),
            hf::CONTENTS => parts.contents = Some(field.as_f64_array()?),
            hf::ENTRIES => parts.entries = Some(field.as_f64()?),
            hf::STATS => parts.stats = Some(field.as_f64_array()?),
            hf::SUMW2 => parts.sumw2 = Some(field.as_f64_array()?),
            other => trace!(field_id = other, len = field.payload.len(), "skipping unknown field"),
        }
    }

    HistogramObject::from_parts(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_truncated() {
        assert!(matches!(
            parse_object_header(b"HOBJ"),
            Err(ObjectError::Truncated { need: ObjectHeader::FIXED_LEN, have: 4 })
        ));
    }

    #[test]
    fn field_overrun_stops_iteration() {
        // id=1, Str, len=10, only 2 payload bytes
        let body = [0x01, 0x00, 0x04, 0x0A, 0x00, 0x00, 0x00, b'h', b'i'];
        let mut it = fields(&body);
        assert!(matches!(it.next(), Some(Err(ObjectError::FieldOverrun { field_id: 1, .. }))));
        assert!(it.next().is_none());
    }

    #[test]
    fn empty_body_has_no_fields() {
        assert_eq!(fields(&[]).count(), 0);
    }
}
