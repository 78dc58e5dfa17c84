//! In-process frame source fed through a crossbeam channel.

use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::cancel::StopToken;
use crate::constants::DEFAULT_POLL_INTERVAL;
use crate::transport::{Frame, FrameSource, TransportError};

pub struct ChannelFrameSource {
    rx: Receiver<Frame>,
    stop: StopToken,
    poll_interval: Duration,
}

impl ChannelFrameSource {
    pub fn new(rx: Receiver<Frame>, stop: StopToken) -> Self {
        Self { rx, stop, poll_interval: DEFAULT_POLL_INTERVAL }
    }

    /// Bounded sender/source pair.
    pub fn pair(capacity: usize, stop: StopToken) -> (Sender<Frame>, Self) {
        let (tx, rx) = bounded(capacity.max(1));
        (tx, Self::new(rx, stop))
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl FrameSource for ChannelFrameSource {
    /// Buffered frames are delivered before a dropped sender reports `Closed`.
    fn next_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        loop {
            if self.stop.is_stopped() {
                return Ok(None);
            }
            match self.rx.recv_timeout(self.poll_interval) {
                Ok(frame) => return Ok(Some(frame)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Closed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_then_closes() {
        let (tx, mut src) = ChannelFrameSource::pair(4, StopToken::new());
        tx.send(Frame::from(vec![1, 2])).unwrap();
        drop(tx);
        assert_eq!(src.next_frame().unwrap().unwrap().as_bytes(), &[1, 2]);
        assert!(matches!(src.next_frame(), Err(TransportError::Closed)));
    }

    #[test]
    fn stopped_source_yields_none() {
        let stop = StopToken::new();
        let (_tx, mut src) = ChannelFrameSource::pair(1, stop.clone());
        stop.stop();
        assert!(src.next_frame().unwrap().is_none());
    }
}
