//! Reported capacity
//!
//! The fuel gauge's raw capacity can be rescaled so that the usable range
//! maps to 0-100 %, and rate-limited so the reported value never jumps.

use midas_config::FuelGaugeSection;

#[derive(Debug, Clone)]
pub struct CapacityFilter {
    scale: bool,
    atomic: bool,
    max: u32,
    min: u32,
    last: Option<i32>,
}

impl CapacityFilter {
    pub fn new(config: &FuelGaugeSection) -> Self {
        Self {
            scale: config.scale,
            atomic: config.atomic,
            max: config.capacity_max,
            min: config.capacity_min,
            last: None,
        }
    }

    /// Whether the raw (0.1 %) capacity is needed
    pub fn wants_raw(&self) -> bool {
        self.scale
    }

    /// Map raw capacity in 0.1 % onto 0-100 % between the configured bounds
    pub fn scale(&self, raw: i32) -> i32 {
        let span = self.max.saturating_sub(self.min).max(1) as i64;
        let value = (raw as i64 - self.min as i64) * 100 / span;
        value.clamp(0, 100) as i32
    }

    /// Capacity to report for this run
    ///
    /// `capacity` is the gauge's percentage, `raw` its unscaled value if
    /// available.
    pub fn apply(&mut self, capacity: i32, raw: Option<i32>) -> i32 {
        let target = match (self.scale, raw) {
            (true, Some(raw)) => self.scale(raw),
            _ => capacity.clamp(0, 100),
        };

        let reported = match (self.atomic, self.last) {
            (true, Some(last)) if target > last => last + 1,
            (true, Some(last)) if target < last => last - 1,
            _ => target,
        };

        self.last = Some(reported);
        reported
    }
}
