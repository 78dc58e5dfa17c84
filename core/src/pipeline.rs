//! pipeline.rs
//!
//! Subscriber drivers: receive → checksum → decode → report.
//!
//! Design notes:
//! - `Subscriber::run` is the sequential loop with an explicit state machine.
//! - `run_parallel` pipelines the same stages: one receiver thread owns the
//!   frame source, N workers checksum and decode, the calling thread reports.
//!   Iterations are numbered at receipt; reports arrive in completion order.
//! - Only transport and reporting failures stop a driver. A frame that fails
//!   to checksum or decode is reported like any other.

use std::thread;
use std::time::Instant;

use crossbeam::channel::bounded;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cancel::StopToken;
use crate::integrity::{checksum, ChecksumError, ChecksumResult};
use crate::objects::{DecodedObject, ObjectDecoder, TypeTag};
use crate::parallelism::ParallelismProfile;
use crate::report::{ReportSink, ReportingError};
use crate::telemetry::{Stage, StageTimes, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::transport::{Frame, FrameSource, TransportError};
use crate::types::SubscriberError;
use crate::utils::frame_preview;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    Receiving,
    Checking,
    Decoding,
    Reporting,
    Stopped,
}

/// A frame after the checksum and decode stages.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub iteration: u64,
    pub frame: Frame,
    pub checksum: Result<ChecksumResult, ChecksumError>,
    pub decoded: DecodedObject,
}

impl ProcessedFrame {
    pub fn checksum(&self) -> Option<&ChecksumResult> {
        self.checksum.as_ref().ok()
    }

    pub fn report_to<R: ReportSink + ?Sized>(&self, sink: &mut R) -> Result<(), ReportingError> {
        sink.report(self.iteration, &self.frame, self.checksum(), &self.decoded)
    }
}

/// Checksum and decode one frame. Never fails.
pub fn process_frame(
    iteration: u64,
    frame: Frame,
    decoder: &ObjectDecoder,
    counters: &mut TelemetryCounters,
    timer: &mut TelemetryTimer,
) -> ProcessedFrame {
    let checksum = check_stage(iteration, &frame, counters, timer);
    let decoded = decode_stage(iteration, &frame, decoder, counters, timer);
    ProcessedFrame { iteration, frame, checksum, decoded }
}

fn check_stage(
    iteration: u64,
    frame: &Frame,
    counters: &mut TelemetryCounters,
    timer: &mut TelemetryTimer,
) -> Result<ChecksumResult, ChecksumError> {
    let sum = timer.time(Stage::Checksum, || checksum(frame.as_bytes()));
    if let Err(e) = &sum {
        warn!(iteration, error = %e, "checksum skipped");
        counters.add_short_frame();
    }
    sum
}

fn decode_stage(
    iteration: u64,
    frame: &Frame,
    decoder: &ObjectDecoder,
    counters: &mut TelemetryCounters,
    timer: &mut TelemetryTimer,
) -> DecodedObject {
    let decoded = timer.time(Stage::Decode, || decoder.decode(frame.as_bytes()));
    counters.add_outcome(&decoded);
    log_outcome(iteration, frame, &decoded);
    decoded
}

/// Sequential subscriber: owns the source for its whole life.
pub struct Subscriber<S, R> {
    source: S,
    sink: R,
    decoder: ObjectDecoder,
    state: PipelineState,
    iteration: u64,
    counters: TelemetryCounters,
    timer: TelemetryTimer,
}

impl<S: FrameSource, R: ReportSink> Subscriber<S, R> {
    pub fn new(source: S, sink: R, expected: TypeTag) -> Self {
        Self {
            source,
            sink,
            decoder: ObjectDecoder::new(expected),
            state: PipelineState::Idle,
            iteration: 0,
            counters: TelemetryCounters::default(),
            timer: TelemetryTimer::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Frames received so far.
    pub fn iterations(&self) -> u64 {
        self.iteration
    }

    pub fn counters(&self) -> &TelemetryCounters {
        &self.counters
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    pub fn into_sink(self) -> R {
        self.sink
    }

    /// Handle one frame end to end.
    ///
    /// `Ok(false)` once the source reports a clean stop.
    pub fn step(&mut self) -> Result<bool, SubscriberError> {
        if self.state == PipelineState::Stopped {
            return Err(SubscriberError::Pipeline("subscriber already stopped"));
        }

        self.state = PipelineState::Receiving;
        let t0 = Instant::now();
        let received = self.source.next_frame();
        self.timer.add_stage_time(Stage::Receive, t0.elapsed());

        let frame = match received {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.state = PipelineState::Stopped;
                return Ok(false);
            }
            Err(e) => {
                self.state = PipelineState::Stopped;
                error!(error = %e, "receive failed");
                return Err(e.into());
            }
        };

        let iteration = self.iteration;
        self.iteration += 1;
        self.counters.add_frame(frame.len());

        self.state = PipelineState::Checking;
        let checksum = check_stage(iteration, &frame, &mut self.counters, &mut self.timer);

        self.state = PipelineState::Decoding;
        let decoded = decode_stage(iteration, &frame, &self.decoder, &mut self.counters, &mut self.timer);

        self.state = PipelineState::Reporting;
        let processed = ProcessedFrame { iteration, frame, checksum, decoded };
        let t0 = Instant::now();
        let reported = processed.report_to(&mut self.sink);
        self.timer.add_stage_time(Stage::Report, t0.elapsed());
        if let Err(e) = reported {
            self.state = PipelineState::Stopped;
            error!(iteration, error = %e, "report failed");
            return Err(e.into());
        }
        self.counters.add_report();

        Ok(true)
    }

    /// Loop until a clean stop or a fatal error.
    pub fn run(&mut self) -> Result<TelemetrySnapshot, SubscriberError> {
        info!(expected = %self.decoder.expected().name, "subscriber started");
        while self.step()? {}

        self.sink.flush()?;
        let snapshot = TelemetrySnapshot::from(&self.counters, &self.timer);
        log_summary(&snapshot);
        Ok(snapshot)
    }
}

enum WorkerMsg {
    Processed(ProcessedFrame),
    Done(TelemetryCounters, StageTimes),
}

/// Pipelined driver.
///
/// A reporting failure trips `stop`, so the receiver unblocks and the
/// remaining in-flight frames are discarded.
pub fn run_parallel<S, R>(
    mut source: S,
    sink: &mut R,
    expected: &TypeTag,
    profile: &ParallelismProfile,
    stop: &StopToken,
) -> Result<TelemetrySnapshot, SubscriberError>
where
    S: FrameSource + Send,
    R: ReportSink + ?Sized,
{
    let mut timer = TelemetryTimer::new();
    let mut counters = TelemetryCounters::default();
    let decoder = ObjectDecoder::new(expected.clone());
    let capacity = profile.inflight_frames.max(1);
    let workers = profile.worker_count.max(1);

    let (frame_tx, frame_rx) = bounded::<(u64, Frame)>(capacity);
    let (out_tx, out_rx) = bounded::<WorkerMsg>(capacity);

    info!(expected = %expected.name, workers, capacity, "parallel subscriber started");

    let (received, failure) = thread::scope(|scope| {
        // ---- Receiver ----
        let receiver = scope.spawn(move || -> Result<(TelemetryCounters, StageTimes), TransportError> {
            let mut counters = TelemetryCounters::default();
            let mut times = StageTimes::default();
            let mut iteration = 0u64;

            while !stop.is_stopped() {
                let t0 = Instant::now();
                let next = source.next_frame();
                times.add(Stage::Receive, t0.elapsed());

                let Some(frame) = next? else { break };
                counters.add_frame(frame.len());
                if frame_tx.send((iteration, frame)).is_err() {
                    break;
                }
                iteration += 1;
            }
            debug!(frames = iteration, "receiver finished");
            Ok((counters, times))
        });

        // ---- Workers ----
        for worker in 0..workers {
            let rx = frame_rx.clone();
            let tx = out_tx.clone();
            let decoder = decoder.clone();
            scope.spawn(move || {
                let mut counters = TelemetryCounters::default();
                let mut timer = TelemetryTimer::new();
                for (iteration, frame) in rx.iter() {
                    let processed = process_frame(iteration, frame, &decoder, &mut counters, &mut timer);
                    if tx.send(WorkerMsg::Processed(processed)).is_err() {
                        break;
                    }
                }
                debug!(worker, "decode worker finished");
                let _ = tx.send(WorkerMsg::Done(counters, timer.stage_times));
            });
        }
        drop(frame_rx);
        drop(out_tx);

        // ---- Reporter ----
        let mut failure: Option<ReportingError> = None;
        for msg in out_rx.iter() {
            match msg {
                WorkerMsg::Processed(processed) if failure.is_none() => {
                    let t0 = Instant::now();
                    let reported = processed.report_to(&mut *sink);
                    timer.add_stage_time(Stage::Report, t0.elapsed());
                    match reported {
                        Ok(()) => counters.add_report(),
                        Err(e) => {
                            error!(iteration = processed.iteration, error = %e, "report failed");
                            stop.stop();
                            failure = Some(e);
                        }
                    }
                }
                // keep draining so workers and receiver can exit
                WorkerMsg::Processed(_) => {}
                WorkerMsg::Done(c, t) => {
                    counters.merge(&c);
                    timer.stage_times.merge(&t);
                }
            }
        }

        let received = receiver.join().map_err(|_| SubscriberError::Pipeline("receiver thread panicked"));
        (received, failure)
    });

    if let Some(e) = failure {
        return Err(e.into());
    }
    let (received, times) = received??;
    counters.merge(&received);
    timer.stage_times.merge(&times);

    sink.flush()?;
    let snapshot = TelemetrySnapshot::from(&counters, &timer);
    log_summary(&snapshot);
    Ok(snapshot)
}

fn log_outcome(iteration: u64, frame: &Frame, decoded: &DecodedObject) {
    match decoded {
        DecodedObject::Absent { reason } => debug!(
            iteration,
            len = frame.len(),
            %reason,
            head = %frame_preview(frame.as_bytes(), 16),
            "no object decoded"
        ),
        _ => debug!(iteration, len = frame.len(), outcome = decoded.outcome(), "frame processed"),
    }
}

fn log_summary(snapshot: &TelemetrySnapshot) {
    info!(
        frames = snapshot.frames_received,
        decoded = snapshot.objects_decoded,
        absent = snapshot.objects_absent,
        mismatched = snapshot.objects_mismatched,
        short = snapshot.frames_short,
        elapsed_ms = snapshot.elapsed.as_millis() as u64,
        "subscriber stopped"
    );
}
