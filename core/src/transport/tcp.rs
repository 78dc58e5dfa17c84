//! transport/tcp.rs
//!
//! Bound subscriber socket accepting any number of publishers.
//!
//! Threads:
//! - acceptor: polls the listener, spawns one reader per publisher
//! - readers: decode length-prefixed frames into a bounded channel
//!
//! Frames from different publishers interleave in arrival order; frames
//! from one publisher keep their order. Dropping the source joins every
//! thread it started.

use std::fmt;
use std::io::{self, BufReader, ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::str::FromStr;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use tracing::{debug, error, info, warn};

use crate::cancel::StopToken;
use crate::constants::{DEFAULT_INFLIGHT_FRAMES, DEFAULT_POLL_INTERVAL, MAX_FRAME_SIZE};
use crate::transport::codec::read_frame;
use crate::transport::{Frame, FrameSource, TransportError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// `tcp://host:port` or plain `host:port`. A host of `*` binds every interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn parse(s: &str) -> Result<Self, TransportError> {
        let invalid = |reason| TransportError::InvalidEndpoint { endpoint: s.to_string(), reason };

        let s_trim = s.trim();
        let rest = match s_trim.split_once("://") {
            Some(("tcp", rest)) => rest,
            Some(_) => return Err(invalid("only tcp:// is supported")),
            None => s_trim,
        };
        let (host, port) = rest.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = port.parse::<u16>().map_err(|_| invalid("port is not a number"))?;

        Ok(Self { host: host.to_string(), port })
    }

    /// Address handed to the OS when binding.
    pub fn bind_addr(&self) -> String {
        match self.host.as_str() {
            "*" => format!("0.0.0.0:{}", self.port),
            h if h.contains(':') => format!("[{}]:{}", h, self.port),
            h => format!("{}:{}", h, self.port),
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "tcp://[{}]:{}", self.host, self.port)
        } else {
            write!(f, "tcp://{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone)]
pub struct TcpOptions {
    pub max_frame_size: usize,
    pub poll_interval: Duration,
    pub inflight_frames: usize,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            inflight_frames: DEFAULT_INFLIGHT_FRAMES,
        }
    }
}

/// State every background thread needs.
#[derive(Clone)]
struct ConnCtx {
    stop: StopToken,
    shutdown: StopToken,
    max_frame_size: usize,
    poll_interval: Duration,
}

impl ConnCtx {
    fn halted(&self) -> bool {
        self.stop.is_stopped() || self.shutdown.is_stopped()
    }
}

pub struct TcpFrameSource {
    local_addr: SocketAddr,
    rx: Receiver<Result<Frame, TransportError>>,
    stop: StopToken,
    shutdown: StopToken,
    poll_interval: Duration,
    acceptor: Option<JoinHandle<()>>,
}

impl TcpFrameSource {
    /// Bind `endpoint` and start accepting publishers.
    pub fn bind(endpoint: &Endpoint, options: TcpOptions, stop: StopToken) -> Result<Self, TransportError> {
        let addr = endpoint.bind_addr();
        let listener = TcpListener::bind(&addr)
            .and_then(|l| l.set_nonblocking(true).map(|_| l))
            .map_err(|source| TransportError::Bind { addr: addr.clone(), source })?;
        let local_addr = listener.local_addr()?;

        let (tx, rx) = bounded(options.inflight_frames.max(1));
        let shutdown = StopToken::new();
        let ctx = ConnCtx {
            stop: stop.clone(),
            shutdown: shutdown.clone(),
            max_frame_size: options.max_frame_size,
            poll_interval: options.poll_interval,
        };

        let acceptor = thread::Builder::new()
            .name("histo-accept".into())
            .spawn(move || accept_loop(listener, tx, ctx))?;

        info!(endpoint = %endpoint, %local_addr, "subscriber bound");

        Ok(Self {
            local_addr,
            rx,
            stop,
            shutdown,
            poll_interval: options.poll_interval,
            acceptor: Some(acceptor),
        })
    }

    /// Actual bound address (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl FrameSource for TcpFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        loop {
            if self.stop.is_stopped() {
                return Ok(None);
            }
            match self.rx.recv_timeout(self.poll_interval) {
                Ok(item) => return item.map(Some),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) if self.stop.is_stopped() => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Closed),
            }
        }
    }
}

impl Drop for TcpFrameSource {
    fn drop(&mut self) {
        self.shutdown.stop();
        if let Some(handle) = self.acceptor.take() {
            if handle.join().is_err() {
                error!("acceptor thread panicked");
            }
        }
    }
}

fn accept_loop(listener: TcpListener, tx: Sender<Result<Frame, TransportError>>, ctx: ConnCtx) {
    let mut readers: Vec<JoinHandle<()>> = Vec::new();

    while !ctx.halted() {
        match listener.accept() {
            Ok((stream, peer)) => {
                info!(%peer, "publisher connected");
                let (tx, ctx) = (tx.clone(), ctx.clone());
                let spawned = thread::Builder::new()
                    .name(format!("histo-read-{peer}"))
                    .spawn(move || read_loop(stream, peer, tx, ctx));
                match spawned {
                    Ok(handle) => readers.push(handle),
                    Err(e) => warn!(%peer, error = %e, "could not start reader"),
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_BACKOFF),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!(error = %e, "listener failed");
                send_or_halt(&tx, Err(TransportError::Accept(e)), &ctx);
                break;
            }
        }
        readers.retain(|h| !h.is_finished());
    }

    for handle in readers {
        let _ = handle.join();
    }
    debug!("acceptor stopped");
}

fn read_loop(stream: TcpStream, peer: SocketAddr, tx: Sender<Result<Frame, TransportError>>, ctx: ConnCtx) {
    let configured = stream
        .set_nonblocking(false)
        .and_then(|_| stream.set_read_timeout(Some(ctx.poll_interval)));
    if let Err(e) = configured {
        warn!(%peer, error = %e, "could not configure publisher socket");
        return;
    }

    let mut reader = HaltingReader { inner: BufReader::new(stream), ctx: ctx.clone() };
    loop {
        match read_frame(&mut reader, ctx.max_frame_size) {
            Ok(Some(frame)) => {
                if !send_or_halt(&tx, Ok(frame), &ctx) {
                    break;
                }
            }
            Ok(None) => {
                info!(%peer, "publisher disconnected");
                break;
            }
            Err(_) if ctx.halted() => break,
            Err(e) => {
                // one misbehaving publisher never takes the subscriber down
                warn!(%peer, error = %e, "dropping publisher connection");
                break;
            }
        }
    }
}

/// Blocking send that gives up once the source is halted.
fn send_or_halt<T>(tx: &Sender<T>, mut item: T, ctx: &ConnCtx) -> bool {
    loop {
        match tx.send_timeout(item, ctx.poll_interval) {
            Ok(()) => return true,
            Err(SendTimeoutError::Disconnected(_)) => return false,
            Err(SendTimeoutError::Timeout(back)) => {
                if ctx.halted() {
                    return false;
                }
                item = back;
            }
        }
    }
}

/// Turns read timeouts into stop checks.
struct HaltingReader<R> {
    inner: R,
    ctx: ConnCtx,
}

impl<R: Read> Read for HaltingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.inner.read(buf) {
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    if self.ctx.halted() {
                        return Err(io::Error::from(ErrorKind::ConnectionAborted));
                    }
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_wildcard() {
        let ep = Endpoint::parse("tcp://*:5024").unwrap();
        assert_eq!(ep.host, "*");
        assert_eq!(ep.port, 5024);
        assert_eq!(ep.bind_addr(), "0.0.0.0:5024");
        assert_eq!(ep.to_string(), "tcp://*:5024");
    }

    #[test]
    fn endpoint_without_scheme() {
        let ep = Endpoint::parse("127.0.0.1:6000").unwrap();
        assert_eq!(ep.bind_addr(), "127.0.0.1:6000");
    }

    #[test]
    fn endpoint_ipv6() {
        let ep: Endpoint = "tcp://[::1]:7000".parse().unwrap();
        assert_eq!(ep.host, "::1");
        assert_eq!(ep.bind_addr(), "[::1]:7000");
    }

    #[test]
    fn endpoint_rejects_garbage() {
        for bad in ["", "udp://*:1", "tcp://*", "tcp://:5", "tcp://*:port", "tcp://*:70000", "5024"] {
            assert!(matches!(Endpoint::parse(bad), Err(TransportError::InvalidEndpoint { .. })), "{bad}");
        }
    }
}
