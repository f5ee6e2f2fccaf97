//! Cadence helpers for periodic sync passes.

use std::time::Duration;

use rand::Rng;

/// Maximum jitter (seconds) added to periodic pass intervals.
pub const SYNC_INTERVAL_JITTER_SECS: u64 = 5;

/// Poll cadence of the propagation outbox worker.
pub const PROPAGATION_WORKER_INTERVAL_SECS: u64 = 10;

/// Events drained per propagation worker tick.
pub const PROPAGATION_BATCH_SIZE: i64 = 50;

/// Interval plus up to [`SYNC_INTERVAL_JITTER_SECS`] of random jitter.
pub fn jittered_interval(interval_secs: u64) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..=SYNC_INTERVAL_JITTER_SECS * 1000);
    Duration::from_secs(interval_secs) + Duration::from_millis(jitter)
}
