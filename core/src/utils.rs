use std::fmt;
use num_enum::TryFromPrimitive;

pub fn enum_name_or_hex<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:x}", raw),
    }
}

/// Printable rendering of a byte run: quoted if ASCII, hex otherwise.
pub fn fmt_bytes(b: &[u8]) -> String {
    if b.iter().all(|&c| c.is_ascii_graphic() || c == b' ') {
        format!("b\"{}\"", String::from_utf8_lossy(b))
    } else {
        format!("0x{}", hex::encode(b))
    }
}

/// First `max` bytes of a frame as hex, for debug logs.
pub fn frame_preview(frame: &[u8], max: usize) -> String {
    let shown = &frame[..frame.len().min(max)];
    if frame.len() > max {
        format!("{}..", hex::encode(shown))
    } else {
        hex::encode(shown)
    }
}

/// First `max` bytes of a frame as text; bytes outside printable ASCII become `.`.
pub fn payload_text(frame: &[u8], max: usize) -> String {
    let mut out: String = frame
        .iter()
        .take(max)
        .map(|&c| if c.is_ascii_graphic() || c == b' ' { c as char } else { '.' })
        .collect();
    if frame.len() > max {
        out.push_str("..");
    }
    out
}
