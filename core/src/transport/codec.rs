//! Length-prefixed frame codec.
//!
//! ```text
//! +----------------+------------------+
//! | length (4 LE)  | payload          |
//! +----------------+------------------+
//! ```
//!
//! Zero-length payloads are valid messages.

use std::io::{ErrorKind, Read, Write};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::constants::FRAME_LEN_PREFIX;
use crate::transport::{Frame, TransportError};

/// Write one frame with its length prefix.
pub fn write_frame<W: Write>(w: &mut W, payload: &[u8]) -> Result<(), TransportError> {
    let len = u32::try_from(payload.len()).map_err(|_| TransportError::FrameTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    w.write_u32::<LittleEndian>(len)?;
    w.write_all(payload)?;
    Ok(())
}

/// Read one frame.
///
/// Returns `Ok(None)` on a clean EOF at a frame boundary. EOF inside a
/// prefix or payload is an `UnexpectedEof` I/O error.
pub fn read_frame<R: Read>(r: &mut R, max_frame_size: usize) -> Result<Option<Frame>, TransportError> {
    let mut prefix = [0u8; FRAME_LEN_PREFIX];
    if !read_prefix(r, &mut prefix)? {
        return Ok(None);
    }

    let len = LittleEndian::read_u32(&prefix) as usize;
    if len > max_frame_size {
        return Err(TransportError::FrameTooLarge { size: len, max: max_frame_size });
    }

    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload)?;
    Ok(Some(Frame::from(payload)))
}

fn read_prefix<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<bool, TransportError> {
    let mut off = 0;
    while off < buf.len() {
        match r.read(&mut buf[off..]) {
            Ok(0) if off == 0 => return Ok(false),
            Ok(0) => return Err(std::io::Error::from(ErrorKind::UnexpectedEof).into()),
            Ok(n) => off += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frames_follow_each_other() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"abc").unwrap();
        write_frame(&mut wire, b"").unwrap();

        let mut r = Cursor::new(wire);
        assert_eq!(read_frame(&mut r, 16).unwrap().unwrap().as_bytes(), b"abc");
        assert!(read_frame(&mut r, 16).unwrap().unwrap().is_empty());
        assert!(read_frame(&mut r, 16).unwrap().is_none());
    }

    #[test]
    fn eof_inside_prefix_is_an_error() {
        let mut r = Cursor::new(vec![1u8, 0]);
        assert!(matches!(read_frame(&mut r, 16), Err(TransportError::Io(_))));
    }

    #[test]
    fn oversized_frames_are_refused() {
        let mut wire = Vec::new();
        write_frame(&mut wire, &[0u8; 32]).unwrap();
        assert!(matches!(
            read_frame(&mut Cursor::new(wire), 8),
            Err(TransportError::FrameTooLarge { size: 32, max: 8 })
        ));
    }
}
