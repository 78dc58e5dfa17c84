//! telemetry/counters.rs
//! Mutable counters collected while frames flow through the subscriber.
//!
//! Summary: one set per worker, merged on the reporting side and frozen into
//! a `TelemetrySnapshot` when the driver stops.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::objects::DecodedObject;

#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub frames_received: u64,
    pub bytes_received: u64,
    pub frames_short: u64,
    pub objects_decoded: u64,
    pub objects_absent: u64,
    pub objects_mismatched: u64,
    pub reports_written: u64,
}

impl TelemetryCounters {
    /// Record one received frame.
    pub fn add_frame(&mut self, len: usize) {
        self.frames_received += 1;
        self.bytes_received += len as u64;
    }

    /// Record a frame too short to checksum.
    pub fn add_short_frame(&mut self) {
        self.frames_short += 1;
    }

    /// Record the decode outcome of one frame.
    pub fn add_outcome(&mut self, decoded: &DecodedObject) {
        match decoded {
            DecodedObject::Histogram(_) => self.objects_decoded += 1,
            DecodedObject::Absent { .. } => self.objects_absent += 1,
            DecodedObject::TypeMismatch { .. } => self.objects_mismatched += 1,
        }
    }

    pub fn add_report(&mut self) {
        self.reports_written += 1;
    }

    /// Every processed frame lands in exactly one outcome bucket.
    pub fn outcomes(&self) -> u64 {
        self.objects_decoded + self.objects_absent + self.objects_mismatched
    }

    // Workers keep private counters and hand them over at the end:
    // no locks or atomics on the hot path.
    pub fn merge(&mut self, other: &TelemetryCounters) {
        self.frames_received += other.frames_received;
        self.bytes_received += other.bytes_received;
        self.frames_short += other.frames_short;
        self.objects_decoded += other.objects_decoded;
        self.objects_absent += other.objects_absent;
        self.objects_mismatched += other.objects_mismatched;
        self.reports_written += other.reports_written;
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
