//! Settle delays between port writes.
//!
//! The acquisition system polls the lines at a fixed rate (25 kHz, one
//! sample every 40 µs, in the reference rig). A value has to stay on the port
//! for at least one full sample interval or the sampler may never see it.
//! None of the strategies here yield to the scheduler; they burn CPU for
//! their whole duration and cannot be interrupted.

use std::num::NonZeroU32;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Spin count giving roughly 50 µs on a 2.4 GHz Core 2 Duo.
pub const DEFAULT_SPIN_ITERATIONS: u32 = 110_000;

/// Sampling rate of the reference acquisition system.
pub const REFERENCE_SAMPLE_RATE_HZ: u32 = 25_000;

/// How long a settle lasts, and how it is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "mode", rename_all = "snake_case"))]
pub enum Settle {
    /// No delay at all.
    Disabled,
    /// Fixed loop count. Must be recalibrated whenever the host changes.
    Spin { iterations: u32 },
    /// Busy wait on the monotonic clock.
    Deadline { micros: u64 },
}

impl Default for Settle {
    fn default() -> Self {
        Self::Spin {
            iterations: DEFAULT_SPIN_ITERATIONS,
        }
    }
}

impl Settle {
    /// Deadline lasting one and a quarter sample intervals at `rate_hz`.
    pub fn for_sample_rate(rate_hz: NonZeroU32) -> Self {
        let rate = u64::from(rate_hz.get());
        Self::Deadline {
            micros: 1_250_000u64.div_ceil(rate),
        }
    }

    /// Nominal duration, when the strategy has one.
    pub fn nominal(&self) -> Option<Duration> {
        match *self {
            Self::Disabled => Some(Duration::ZERO),
            Self::Spin { .. } => None,
            Self::Deadline { micros } => Some(Duration::from_micros(micros)),
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(
            *self,
            Self::Disabled | Self::Spin { iterations: 0 } | Self::Deadline { micros: 0 }
        )
    }

    /// Blocks the calling thread for the configured delay.
    pub fn wait(&self) {
        match *self {
            Self::Disabled => {}
            Self::Spin { iterations } => {
                let mut count = 0u32;
                for _ in 0..iterations {
                    count = std::hint::black_box(count.wrapping_add(1));
                }
            }
            Self::Deadline { micros } => {
                let deadline = Instant::now() + Duration::from_micros(micros);
                while Instant::now() < deadline {
                    std::hint::spin_loop();
                }
            }
        }
    }

    /// Runs [`wait`](Self::wait) once and reports how long it took.
    pub fn measure(&self) -> Duration {
        let start = Instant::now();
        self.wait();
        start.elapsed()
    }
}
