//! telemetry/snapshot.rs
//!
//! Immutable end-of-run summary returned by the pipeline drivers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub frames_received: u64,
    pub bytes_received: u64,
    pub frames_short: u64,
    pub objects_decoded: u64,
    pub objects_absent: u64,
    pub objects_mismatched: u64,
    pub reports_written: u64,
    pub frames_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
}

impl TelemetrySnapshot {
    pub fn from(counters: &TelemetryCounters, timer: &TelemetryTimer) -> Self {
        let elapsed = timer.elapsed();
        let frames_per_sec = if elapsed.as_secs_f64() > 0.0 {
            counters.frames_received as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            frames_received: counters.frames_received,
            bytes_received: counters.bytes_received,
            frames_short: counters.frames_short,
            objects_decoded: counters.objects_decoded,
            objects_absent: counters.objects_absent,
            objects_mismatched: counters.objects_mismatched,
            reports_written: counters.reports_written,
            frames_per_sec,
            elapsed,
            stage_times: timer.stage_times.clone(),
        }
    }

    /// Every reported frame has exactly one outcome, and nothing is
    /// reported twice.
    pub fn sanity_check(&self) -> bool {
        let outcomes = self.objects_decoded + self.objects_absent + self.objects_mismatched;
        self.reports_written <= self.frames_received
            && outcomes <= self.frames_received
            && self.frames_short <= self.frames_received
    }
}
