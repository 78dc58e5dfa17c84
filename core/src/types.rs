use thiserror::Error;

use crate::config::ConfigError;
use crate::report::ReportingError;
use crate::transport::TransportError;

/// Unified subscriber error covering the fatal cases only.
/// - Payload anomalies never end up here; they are decode outcomes.
/// - `From<T>` impls enable `?` across the pipeline.
#[derive(Debug, Error)]
pub enum SubscriberError {
    /// Connection lost, listener failed, or channel closed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Output sink failed (broken stdout, closed pipe).
    #[error("reporting error: {0}")]
    Reporting(#[from] ReportingError),

    /// Startup configuration rejected.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Worker wiring failure (a pipeline thread went away).
    #[error("pipeline error: {0}")]
    Pipeline(&'static str),
}
