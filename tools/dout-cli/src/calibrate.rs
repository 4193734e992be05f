//! Settle calibration.
//!
//! A spin settle is a bare loop count, so its real duration depends on the
//! host. Measuring it and scaling the count toward a target duration is how
//! the count gets re-tuned after moving to new hardware.

use std::time::Duration;

use dout::Settle;

/// Wall-clock spread of repeated settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub samples: usize,
    pub min: Duration,
    pub median: Duration,
    pub max: Duration,
}

/// Runs `settle` `samples` times (at least once) and summarizes the timings.
pub fn calibrate(settle: Settle, samples: usize) -> Calibration {
    let mut timings: Vec<Duration> = (0..samples.max(1)).map(|_| settle.measure()).collect();
    timings.sort_unstable();
    summarize(&timings)
}

fn summarize(sorted: &[Duration]) -> Calibration {
    let samples = sorted.len();
    Calibration {
        samples,
        min: sorted.first().copied().unwrap_or_default(),
        median: sorted.get(samples / 2).copied().unwrap_or_default(),
        max: sorted.last().copied().unwrap_or_default(),
    }
}

/// Spin count expected to last `target`, given `current` took `measured`.
pub fn suggest_iterations(current: u32, measured: Duration, target: Duration) -> u32 {
    let measured_ns = measured.as_nanos();
    if measured_ns == 0 {
        return current;
    }
    let scaled = u128::from(current) * target.as_nanos() / measured_ns;
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}
