//! Replay source over any `Read` carrying length-prefixed frames.
//!
//! The reader runs on its own thread and hands frames over a bounded channel,
//! so `next_frame` can keep polling the stop token while a read is blocked
//! (an idle stdin pipe, a slow capture). A read still blocked when the source
//! is dropped is left to finish on its own; its result is discarded.

use std::io::Read;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use tracing::debug;

use crate::cancel::StopToken;
use crate::constants::{DEFAULT_INFLIGHT_FRAMES, DEFAULT_POLL_INTERVAL, MAX_FRAME_SIZE};
use crate::transport::codec::read_frame;
use crate::transport::{Frame, FrameSource, TransportError};

type Item = Result<Option<Frame>, TransportError>;

pub struct ReaderFrameSource<R> {
    pending: Option<R>,
    max_frame_size: usize,
    poll_interval: Duration,
    stop: StopToken,
    shutdown: StopToken,
    rx: Option<Receiver<Item>>,
    worker: Option<JoinHandle<()>>,
    exhausted: bool,
}

impl<R: Read + Send + 'static> ReaderFrameSource<R> {
    pub fn new(reader: R, stop: StopToken) -> Self {
        Self {
            pending: Some(reader),
            max_frame_size: MAX_FRAME_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop,
            shutdown: StopToken::new(),
            rx: None,
            worker: None,
            exhausted: false,
        }
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Start the reader thread on first use.
    fn receiver(&mut self) -> Result<Receiver<Item>, TransportError> {
        if let Some(rx) = &self.rx {
            return Ok(rx.clone());
        }
        let Some(reader) = self.pending.take() else {
            return Err(TransportError::Closed);
        };

        let (tx, rx) = bounded(DEFAULT_INFLIGHT_FRAMES);
        let max_frame_size = self.max_frame_size;
        let poll_interval = self.poll_interval;
        let halt = (self.stop.clone(), self.shutdown.clone());

        let worker = thread::Builder::new()
            .name("histo-replay".into())
            .spawn(move || replay_loop(reader, tx, max_frame_size, poll_interval, halt))?;

        self.worker = Some(worker);
        self.rx = Some(rx.clone());
        Ok(rx)
    }
}

impl<R: Read + Send + 'static> FrameSource for ReaderFrameSource<R> {
    /// A clean end of input is `Ok(None)`.
    fn next_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        if self.exhausted || self.stop.is_stopped() {
            return Ok(None);
        }
        let rx = self.receiver()?;

        loop {
            if self.stop.is_stopped() {
                return Ok(None);
            }
            match rx.recv_timeout(self.poll_interval) {
                Ok(Ok(Some(frame))) => return Ok(Some(frame)),
                Ok(end) => {
                    // clean EOF or a read error ends the capture
                    self.exhausted = true;
                    return end;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Closed),
            }
        }
    }
}

impl<R> Drop for ReaderFrameSource<R> {
    fn drop(&mut self) {
        self.shutdown.stop();
        if let Some(handle) = self.worker.take() {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                debug!("replay reader still blocked, detaching");
            }
        }
    }
}

fn replay_loop<R: Read>(
    mut reader: R,
    tx: Sender<Item>,
    max_frame_size: usize,
    poll_interval: Duration,
    (stop, shutdown): (StopToken, StopToken),
) {
    loop {
        let item = read_frame(&mut reader, max_frame_size);
        let last = !matches!(item, Ok(Some(_)));

        let mut item = item;
        loop {
            match tx.send_timeout(item, poll_interval) {
                Ok(()) => break,
                Err(SendTimeoutError::Disconnected(_)) => return,
                Err(SendTimeoutError::Timeout(back)) => {
                    if stop.is_stopped() || shutdown.is_stopped() {
                        return;
                    }
                    item = back;
                }
            }
        }

        if last || stop.is_stopped() || shutdown.is_stopped() {
            break;
        }
    }
    debug!("replay reader finished");
}
