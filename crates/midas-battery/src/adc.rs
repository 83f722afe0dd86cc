//! ADC sampling
//!
//! Each sample is a trimmed mean of several raw reads; samples are then
//! folded into a per-channel sliding window. Raw reads on all channels are
//! serialised through one lock, as the converters share a mux.

use midas_config::{AdcSection, AdcType};
use midas_hal::AdcReader;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{BatteryError, Result};

/// Width of the per-channel smoothing window
pub const ADC_SAMPLE_COUNT: usize = 10;

/// Sliding window of samples for one channel
#[derive(Debug, Clone, Default)]
pub struct AdcSample {
    window: [i32; ADC_SAMPLE_COUNT],
    total: i32,
    index: usize,
    count: usize,
    average: i32,
}

impl AdcSample {
    /// Fold a sample in and return the new average
    ///
    /// A non-positive sample stands for a failed conversion and is replaced
    /// by the previous average.
    pub fn push(&mut self, adc: i32) -> i32 {
        let adc = if adc <= 0 {
            tracing::error!("Invalid ADC sample {}, reusing average {}", adc, self.average);
            self.average
        } else {
            adc
        };

        if self.count < ADC_SAMPLE_COUNT {
            self.window[self.count] = adc;
            self.index = self.count;
            self.count += 1;
            self.total += adc;
        } else {
            self.index = (self.index + 1) % ADC_SAMPLE_COUNT;
            self.total = self.total - self.window[self.index] + adc;
            self.window[self.index] = adc;
        }

        self.average = self.total / self.count as i32;
        self.average
    }

    pub fn average(&self) -> i32 {
        self.average
    }

    /// Samples currently in the window
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Mean of the readings without the single lowest and single highest one
///
/// Callers guarantee at least three readings.
pub fn trimmed_mean(readings: &[i32]) -> i32 {
    let (mut min, mut max, mut total) = (i32::MAX, i32::MIN, 0i64);
    for &r in readings {
        min = min.min(r);
        max = max.max(r);
        total += r as i64;
    }
    ((total - min as i64 - max as i64) / (readings.len() as i64 - 2)) as i32
}

/// Routes channels to converters and keeps the smoothing windows
pub struct AdcSampler {
    routing: AdcSection,
    backends: HashMap<AdcType, Arc<dyn AdcReader>>,
    read_lock: Mutex<()>,
    windows: Mutex<HashMap<u32, AdcSample>>,
}

impl AdcSampler {
    pub fn new(routing: &AdcSection) -> Self {
        Self {
            routing: routing.clone(),
            backends: HashMap::new(),
            read_lock: Mutex::new(()),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Attach the converter serving channels of the given type
    pub fn with_backend(mut self, kind: AdcType, reader: Arc<dyn AdcReader>) -> Self {
        self.backends.insert(kind, reader);
        self
    }

    fn raw(&self, channel: u32) -> Result<i32> {
        let reader = self
            .backends
            .get(&self.routing.kind_of(channel))
            .ok_or(BatteryError::AdcUnassigned(channel))?;

        let _guard = self.read_lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(reader.read(channel)?)
    }

    /// Take `count` raw reads and return their trimmed mean
    pub fn sample(&self, channel: u32, count: u32) -> Result<i32> {
        if count < 3 {
            return Err(BatteryError::AdcCount(count));
        }

        let mut readings = Vec::with_capacity(count as usize);
        for _ in 0..count {
            readings.push(self.raw(channel)?);
        }

        Ok(trimmed_mean(&readings))
    }

    /// Sample with the configured read count, without smoothing
    pub fn read_once(&self, channel: u32) -> Result<i32> {
        self.sample(channel, self.routing.check_count)
    }

    /// Sample and fold into the channel's window
    ///
    /// On error the window is left as it was.
    pub fn read_smoothed(&self, channel: u32) -> Result<i32> {
        let adc = self.read_once(channel).inspect_err(|e| {
            tracing::error!("ADC channel {}: {}", channel, e);
        })?;

        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(windows.entry(channel).or_default().push(adc))
    }

    /// Last smoothed value of a channel
    pub fn average(&self, channel: u32) -> Option<i32> {
        let windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows
            .get(&channel)
            .filter(|w| !w.is_empty())
            .map(|w| w.average())
    }
}
