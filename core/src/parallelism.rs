//! parallelism.rs
//! Worker pool sizing for the pipelined driver.

use crate::constants::DEFAULT_INFLIGHT_FRAMES;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelismProfile {
    pub worker_count: usize,
    /// Bound on frames queued between stages.
    pub inflight_frames: usize,
}

impl ParallelismProfile {
    pub fn single_threaded() -> Self {
        Self { worker_count: 1, inflight_frames: 1 }
    }

    /// One decode worker per spare core, at most `hard_cap`.
    pub fn dynamic(hard_cap: usize) -> Self {
        let cores = num_cpus::get();
        let worker_count = cores.saturating_sub(1).clamp(1, hard_cap.max(1));

        Self { worker_count, inflight_frames: DEFAULT_INFLIGHT_FRAMES }
    }
}

impl Default for ParallelismProfile {
    fn default() -> Self {
        Self::dynamic(usize::MAX)
    }
}
