//! integrity.rs
//! Parity-split XOR checksum over a raw frame.
//!
//! Design notes:
//! - Two 8-bit accumulators: even-indexed bytes and odd-indexed bytes.
//! - Seeded with byte[0] / byte[1], then every later byte is folded into the
//!   accumulator matching its index parity.
//! - Diagnostic only. Nothing downstream gates on it.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChecksumError {
    /// Fewer than the two seed bytes.
    #[error("frame too short for checksum: {len} < 2")]
    FrameTooShort { len: usize },
}

/// Both checksum halves of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChecksumResult {
    pub even: u8,
    pub odd: u8,
}

impl ChecksumResult {
    /// Halves packed as `even << 8 | odd`.
    pub fn as_u16(&self) -> u16 {
        u16::from_be_bytes([self.even, self.odd])
    }
}

impl fmt::Display for ChecksumResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "even=0x{:02x} odd=0x{:02x}", self.even, self.odd)
    }
}

/// Compute the parity-split checksum of `frame`.
///
/// # Errors
/// `FrameTooShort` when the frame has fewer than two bytes.
#[inline]
pub fn checksum(frame: &[u8]) -> Result<ChecksumResult, ChecksumError> {
    let (seed, rest) = match frame {
        [even, odd, rest @ ..] => ((*even, *odd), rest),
        _ => return Err(ChecksumError::FrameTooShort { len: frame.len() }),
    };

    // rest[0] sits at absolute index 2, so pairs keep their parity.
    let (even, odd) = rest.chunks(2).fold(seed, |(even, odd), pair| match pair {
        [e, o] => (even ^ e, odd ^ o),
        [e] => (even ^ e, odd),
        _ => (even, odd),
    });

    Ok(ChecksumResult { even, odd })
}
