//! histo-core
//!
//! Pure Rust histogram subscriber engine.
//! Receives byte frames, checksums them, decodes self-describing histogram
//! objects, and reports one line per frame. No process or signal handling.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;
pub mod cancel;
pub mod config;

// Stages
pub mod transport;
pub mod integrity;
pub mod objects;
pub mod histogram;
pub mod report;

// Drivers
pub mod parallelism;
pub mod pipeline;
pub mod telemetry;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::cancel::StopToken;
    pub use crate::config::{ConfigError, SubscriberConfig, Workers};
    pub use crate::histogram::{Axis, HistogramObject, HistogramStats};
    pub use crate::integrity::{checksum, ChecksumError, ChecksumResult};
    pub use crate::objects::{
        decode, encode_histogram, Binning, DecodedObject, HistogramDraft, ObjectDecoder, ObjectError, TypeTag,
    };
    pub use crate::parallelism::ParallelismProfile;
    pub use crate::pipeline::{run_parallel, PipelineState, Subscriber};
    pub use crate::report::{LineReportSink, NullSink, ReportFormat, ReportSink, ReportingError};
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::transport::{
        ChannelFrameSource, Endpoint, Frame, FrameSource, ReaderFrameSource, TcpFrameSource, TransportError,
    };
    pub use crate::types::SubscriberError;
}
