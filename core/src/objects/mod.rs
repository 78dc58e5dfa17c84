//! Self-describing object format.
//!
//! Responsibilities:
//! - Define the object header, field views and decode outcomes
//! - Resolve class names to families (registry)
//! - Decode frames into histograms with forward/backward tolerance
//! - Encode objects on the publisher side
//!
//! Non-responsibilities:
//! - Transport framing
//! - Integrity checksums
//! - Reporting

pub mod types;
pub mod registry;
pub mod encode;
pub mod decode;

pub use types::{
    DecodedObject,
    FieldView,
    HeaderFlags,
    ObjectError,
    ObjectHeader,
    TypeTag,
    WireType,
};
pub use decode::{decode, ObjectDecoder};
pub use encode::{encode_histogram, Binning, HistogramDraft, ObjectWriter};
