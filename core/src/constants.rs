//! constants.rs
//! Shared protocol and runtime constants.

use std::time::Duration;

/// Magic marker at the start of every encoded object.
/// "HOBJ" = Histogram OBJect stream
pub const MAGIC_HOBJ: [u8; 4] = *b"HOBJ";

/// Object format version written by this crate's encoder.
pub const FORMAT_V1: u16 = 1;

/// Illustrative local binding, matching the usual publisher setup.
pub const DEFAULT_ENDPOINT: &str = "tcp://*:5024";

/// Default expected class for decoded objects.
pub const DEFAULT_EXPECTED_TYPE: &str = "TH1F";

/// Upper bound on one transport frame (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Length prefix on the wire: `[len: u32 LE][payload]`.
pub const FRAME_LEN_PREFIX: usize = 4;

/// How often blocked receivers look at the stop signal.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bounded channel depth between receiver and workers.
pub const DEFAULT_INFLIGHT_FRAMES: usize = 64;

/// Bytes of payload shown when reports include a payload preview.
pub const PAYLOAD_PREVIEW_BYTES: usize = 64;

/// Header flag bitmask.
pub mod header_flags {
    pub const HAS_HEADER_CRC: u16 = 0x0001;
}

/// Field identifiers of the 1-D histogram class family.
pub mod histogram_fields {
    pub const NAME: u16 = 1;
    pub const TITLE: u16 = 2;
    pub const NBINS: u16 = 3;
    pub const X_MIN: u16 = 4;
    pub const X_MAX: u16 = 5;
    pub const X_EDGES: u16 = 6;
    pub const CONTENTS: u16 = 7;
    pub const ENTRIES: u16 = 8;
    pub const STATS: u16 = 9;
    pub const SUMW2: u16 = 10;
}
