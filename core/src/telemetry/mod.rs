//! telemetry/mod.rs
//! Counters, stage timers and immutable snapshots for the subscriber.

pub mod counters;
pub mod snapshot;
pub mod timers;

pub use counters::*;
pub use snapshot::*;
pub use timers::*;
