//! Monotonic tick source
//!
//! Charge timers run on a wrapping 32-bit millisecond counter. Consumers must
//! handle the wrap, which happens roughly every 49.7 days of uptime.

use nix::time::{ClockId, clock_gettime};
use std::time::Instant;

/// Ticks per second
pub const TICKS_PER_SEC: u32 = 1000;

/// Wrapping millisecond counter
pub trait TickSource: Send + Sync {
    fn ticks(&self) -> u32;
}

/// Ticks derived from `CLOCK_MONOTONIC`
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    fallback: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            fallback: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for MonotonicClock {
    fn ticks(&self) -> u32 {
        match clock_gettime(ClockId::CLOCK_MONOTONIC) {
            Ok(ts) => {
                let ms = ts.tv_sec() as u64 * TICKS_PER_SEC as u64
                    + ts.tv_nsec() as u64 / 1_000_000;
                ms as u32
            }
            Err(e) => {
                tracing::warn!("clock_gettime failed: {}", e);
                self.fallback.elapsed().as_millis() as u32
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_advances() {
        let clock = MonotonicClock::new();
        let a = clock.ticks();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = clock.ticks();
        assert!(b.wrapping_sub(a) >= 4);
    }
}
