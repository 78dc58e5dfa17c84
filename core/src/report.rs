//! report.rs
//! Per-frame report sinks.
//!
//! One report per received frame, emitted in reporting order. A sink never
//! sees a partially decoded object: `DecodedObject` is always one of its
//! three complete outcomes.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::integrity::ChecksumResult;
use crate::objects::DecodedObject;
use crate::transport::Frame;
use crate::utils::payload_text;

#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("report output failed: {0}")]
    Io(#[from] io::Error),

    #[error("report encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait ReportSink {
    fn report(
        &mut self,
        iteration: u64,
        frame: &Frame,
        checksum: Option<&ChecksumResult>,
        decoded: &DecodedObject,
    ) -> Result<(), ReportingError>;

    fn flush(&mut self) -> Result<(), ReportingError> {
        Ok(())
    }
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn report(
        &mut self,
        iteration: u64,
        frame: &Frame,
        checksum: Option<&ChecksumResult>,
        decoded: &DecodedObject,
    ) -> Result<(), ReportingError> {
        (**self).report(iteration, frame, checksum, decoded)
    }

    fn flush(&mut self) -> Result<(), ReportingError> {
        (**self).flush()
    }
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn report(
        &mut self,
        _iteration: u64,
        _frame: &Frame,
        _checksum: Option<&ChecksumResult>,
        _decoded: &DecodedObject,
    ) -> Result<(), ReportingError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown report format {other:?} (expected text or json)")),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

/// Flat, serializable view of one report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord<'a> {
    pub iteration: u64,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<ChecksumResult>,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<&'a str>,
}

impl<'a> ReportRecord<'a> {
    pub fn new(
        iteration: u64,
        frame: &Frame,
        checksum: Option<&ChecksumResult>,
        decoded: &'a DecodedObject,
    ) -> Self {
        let mut record = Self {
            iteration,
            size: frame.len(),
            payload: None,
            checksum: checksum.copied(),
            outcome: decoded.outcome(),
            class: None,
            name: None,
            mean: None,
            std_dev: None,
            entries: None,
            reason: None,
            found: None,
            expected: None,
        };

        match decoded {
            DecodedObject::Histogram(h) => {
                let stats = h.stats();
                record.class = Some(h.class_name());
                record.name = Some(h.name());
                record.mean = Some(stats.mean);
                record.std_dev = Some(stats.std_dev);
                record.entries = Some(stats.entries);
            }
            DecodedObject::Absent { reason } => record.reason = Some(reason.to_string()),
            DecodedObject::TypeMismatch { found, expected } => {
                record.found = Some(found);
                record.expected = Some(expected);
            }
        }
        record
    }

    /// Attach the first `max` payload bytes as text.
    pub fn with_payload(mut self, frame: &Frame, max: usize) -> Self {
        self.payload = Some(payload_text(frame.as_bytes(), max));
        self
    }
}

impl fmt::Display for ReportRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} size={} ", self.iteration, self.size)?;
        if let Some(payload) = &self.payload {
            write!(f, "payload={payload:?} ")?;
        }
        match &self.checksum {
            Some(c) => write!(f, "{c}")?,
            None => f.write_str("checksum=n/a")?,
        }

        if let (Some(mean), Some(std_dev), Some(entries)) = (self.mean, self.std_dev, self.entries) {
            write!(
                f,
                " {} {:?} mean={} std_dev={} entries={}",
                self.class.unwrap_or_default(),
                self.name.unwrap_or_default(),
                mean,
                std_dev,
                entries
            )
        } else if let (Some(found), Some(expected)) = (self.found, self.expected) {
            write!(f, " type mismatch: found {found}, expected {expected}")
        } else {
            write!(f, " no object decoded: {}", self.reason.as_deref().unwrap_or("unknown"))
        }
    }
}

/// Writes one line per report to any `Write`.
pub struct LineReportSink<W> {
    out: W,
    format: ReportFormat,
    payload_preview: Option<usize>,
}

impl<W: Write> LineReportSink<W> {
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self { out, format, payload_preview: None }
    }

    /// Include up to `max` payload bytes, as text, in every report.
    pub fn with_payload_preview(mut self, max: usize) -> Self {
        self.payload_preview = Some(max);
        self
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl LineReportSink<io::Stdout> {
    pub fn stdout(format: ReportFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write> ReportSink for LineReportSink<W> {
    fn report(
        &mut self,
        iteration: u64,
        frame: &Frame,
        checksum: Option<&ChecksumResult>,
        decoded: &DecodedObject,
    ) -> Result<(), ReportingError> {
        let mut record = ReportRecord::new(iteration, frame, checksum, decoded);
        if let Some(max) = self.payload_preview {
            record = record.with_payload(frame, max);
        }
        match self.format {
            ReportFormat::Text => writeln!(self.out, "{record}")?,
            ReportFormat::Json => {
                serde_json::to_writer(&mut self.out, &record)?;
                self.out.write_all(b"\n")?;
            }
        }
        // reports are line-oriented; a consumer tailing stdout sees each one immediately
        self.out.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ReportingError> {
        self.out.flush()?;
        Ok(())
    }
}
