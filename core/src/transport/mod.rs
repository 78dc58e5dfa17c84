//! Byte frame sources.
//!
//! Responsibilities:
//! - Define `Frame` and the `FrameSource` contract
//! - Length-prefixed wire codec shared by every source
//! - TCP subscriber, in-process channel and replay sources
//!
//! Non-responsibilities:
//! - Payload interpretation (no filtering, no transformation)

use std::io;

use bytes::Bytes;
use thiserror::Error;

pub mod codec;
pub mod channel;
pub mod reader;
pub mod tcp;

pub use channel::ChannelFrameSource;
pub use codec::{read_frame, write_frame};
pub use reader::ReaderFrameSource;
pub use tcp::{Endpoint, TcpFrameSource, TcpOptions};

/// One complete message payload, immutable and cheaply shareable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self { bytes: bytes.into() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for Frame {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<Bytes> for Frame {
    fn from(b: Bytes) -> Self {
        Self { bytes: b }
    }
}

impl From<&'static [u8]> for Frame {
    fn from(b: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(b))
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: &'static str },

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("listener failed: {0}")]
    Accept(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("frame too large: {size} bytes (max {max} bytes)")]
    FrameTooLarge { size: usize, max: usize },

    #[error("frame source closed")]
    Closed,
}

/// Lazy, non-restartable feed of frames.
///
/// `next_frame` blocks until a frame arrives. `Ok(None)` means the stop
/// signal fired (or a finite source ran out); errors are connection-level.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, TransportError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        (**self).next_frame()
    }
}
