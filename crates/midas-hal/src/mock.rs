//! Mock implementations for testing without real hardware
//!
//! Every backend trait has a mock here with shared, inspectable state so
//! tests can script ADC readings, supply properties and GPIO levels, and
//! check what the battery logic wrote back.
//!
//! # Usage
//!
//! ```
//! use midas_hal::mock::{MockAdc, MockPowerSupply};
//! use midas_hal::{AdcReader, PowerSupply, Property};
//!
//! let adc = MockAdc::new();
//! adc.push(2, &[100, 102, 98]);
//! assert_eq!(adc.read(2).unwrap(), 100);
//!
//! let fg = MockPowerSupply::new("sec-fuelgauge");
//! fg.set(Property::Capacity, 55);
//! assert_eq!(fg.get_property(Property::Capacity).unwrap(), 55);
//! ```

use crate::{AdcReader, GpioReader, HalError, PowerSupply, Property, TickSource, WakeLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Mock ADC state
#[derive(Debug, Default)]
pub struct MockAdcState {
    /// Scripted readings consumed in order, per channel
    pub queued: HashMap<u32, VecDeque<i32>>,
    /// Reading returned once a channel's queue is empty
    pub fallback: HashMap<u32, i32>,
    /// Channels whose reads fail
    pub failing: HashSet<u32>,
    /// Number of reads per channel
    pub reads: HashMap<u32, usize>,
}

/// Scriptable ADC
#[derive(Debug, Clone, Default)]
pub struct MockAdc {
    state: Arc<RwLock<MockAdcState>>,
}

impl MockAdc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue readings for a channel
    pub fn push(&self, channel: u32, values: &[i32]) {
        if let Ok(mut state) = self.state.write() {
            state
                .queued
                .entry(channel)
                .or_default()
                .extend(values.iter().copied());
        }
    }

    /// Value returned whenever the channel has nothing queued
    pub fn set_fallback(&self, channel: u32, value: i32) {
        if let Ok(mut state) = self.state.write() {
            state.fallback.insert(channel, value);
        }
    }

    pub fn set_failing(&self, channel: u32, failing: bool) {
        if let Ok(mut state) = self.state.write() {
            if failing {
                state.failing.insert(channel);
            } else {
                state.failing.remove(&channel);
            }
        }
    }

    /// Number of reads performed on a channel
    pub fn reads(&self, channel: u32) -> usize {
        self.state
            .read()
            .map(|s| s.reads.get(&channel).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl AdcReader for MockAdc {
    fn read(&self, channel: u32) -> Result<i32, HalError> {
        let mut state = self.state.write().map_err(|_| HalError::AdcRead {
            channel,
            reason: "mock state poisoned".into(),
        })?;
        *state.reads.entry(channel).or_insert(0) += 1;

        if state.failing.contains(&channel) {
            return Err(HalError::AdcRead {
                channel,
                reason: "[MOCK] forced failure".into(),
            });
        }

        if let Some(value) = state.queued.get_mut(&channel).and_then(|q| q.pop_front()) {
            return Ok(value);
        }

        state
            .fallback
            .get(&channel)
            .copied()
            .ok_or_else(|| HalError::AdcRead {
                channel,
                reason: "[MOCK] no reading scripted".into(),
            })
    }
}

/// Mock supply state
#[derive(Debug, Default)]
pub struct MockSupplyState {
    pub properties: HashMap<Property, i32>,
    /// Every `set_property` call in order
    pub writes: Vec<(Property, i32)>,
    /// Properties whose reads fail
    pub failing: HashSet<Property>,
}

/// In-memory power supply
#[derive(Debug, Clone)]
pub struct MockPowerSupply {
    name: String,
    state: Arc<RwLock<MockSupplyState>>,
}

impl MockPowerSupply {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(RwLock::new(MockSupplyState::default())),
        }
    }

    /// Set a property value without recording a write
    pub fn set(&self, prop: Property, value: i32) {
        if let Ok(mut state) = self.state.write() {
            state.properties.insert(prop, value);
        }
    }

    pub fn value(&self, prop: Property) -> Option<i32> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.properties.get(&prop).copied())
    }

    pub fn set_failing(&self, prop: Property, failing: bool) {
        if let Ok(mut state) = self.state.write() {
            if failing {
                state.failing.insert(prop);
            } else {
                state.failing.remove(&prop);
            }
        }
    }

    /// Writes recorded so far
    pub fn writes(&self) -> Vec<(Property, i32)> {
        self.state
            .read()
            .map(|s| s.writes.clone())
            .unwrap_or_default()
    }

    /// Last value written to a property
    pub fn last_write(&self, prop: Property) -> Option<i32> {
        self.writes()
            .into_iter()
            .rev()
            .find(|(p, _)| *p == prop)
            .map(|(_, v)| v)
    }

    pub fn clear_writes(&self) {
        if let Ok(mut state) = self.state.write() {
            state.writes.clear();
        }
    }
}

impl PowerSupply for MockPowerSupply {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_property(&self, prop: Property) -> Result<i32, HalError> {
        let state = self
            .state
            .read()
            .map_err(|_| HalError::SupplyNotFound(self.name.clone()))?;

        if state.failing.contains(&prop) {
            return Err(HalError::Io(std::io::Error::other("[MOCK] forced failure")));
        }

        state
            .properties
            .get(&prop)
            .copied()
            .ok_or_else(|| HalError::UnsupportedProperty {
                supply: self.name.clone(),
                property: prop.sysfs_name(),
            })
    }

    fn set_property(&self, prop: Property, value: i32) -> Result<(), HalError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| HalError::SupplyNotFound(self.name.clone()))?;
        state.properties.insert(prop, value);
        state.writes.push((prop, value));
        tracing::debug!("[MOCK] {}: {:?} <- {}", self.name, prop, value);
        Ok(())
    }
}

/// GPIO lines with settable levels
#[derive(Debug, Clone, Default)]
pub struct MockGpio {
    levels: Arc<RwLock<HashMap<u32, bool>>>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_level(&self, gpio: u32, high: bool) {
        if let Ok(mut levels) = self.levels.write() {
            levels.insert(gpio, high);
        }
    }
}

impl GpioReader for MockGpio {
    fn get_value(&self, gpio: u32) -> Result<bool, HalError> {
        self.levels
            .read()
            .ok()
            .and_then(|l| l.get(&gpio).copied())
            .ok_or(HalError::Gpio(gpio))
    }
}

/// Tick source advanced by hand
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start)),
        }
    }

    pub fn set(&self, ticks: u32) {
        self.now.store(ticks, Ordering::SeqCst);
    }

    /// Advance with wrap-around
    pub fn advance(&self, ticks: u32) {
        let current = self.now.load(Ordering::SeqCst);
        self.now.store(current.wrapping_add(ticks), Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u32) {
        self.advance(secs.wrapping_mul(crate::TICKS_PER_SEC));
    }
}

impl TickSource for ManualClock {
    fn ticks(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Wake lock activity
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MockWakeLockState {
    pub held: bool,
    pub locks: usize,
    pub unlocks: usize,
    pub last_timeout: Option<Duration>,
}

/// Wake lock that records what happened to it
#[derive(Debug, Clone)]
pub struct MockWakeLock {
    name: String,
    state: Arc<RwLock<MockWakeLockState>>,
}

impl MockWakeLock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(RwLock::new(MockWakeLockState::default())),
        }
    }

    pub fn snapshot(&self) -> MockWakeLockState {
        self.state.read().map(|s| s.clone()).unwrap_or_default()
    }
}

impl WakeLock for MockWakeLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) {
        if let Ok(mut state) = self.state.write() {
            state.held = true;
            state.locks += 1;
            state.last_timeout = None;
        }
    }

    fn lock_timeout(&self, timeout: Duration) {
        if let Ok(mut state) = self.state.write() {
            state.held = true;
            state.locks += 1;
            state.last_timeout = Some(timeout);
        }
    }

    fn unlock(&self) {
        if let Ok(mut state) = self.state.write() {
            state.held = false;
            state.unlocks += 1;
        }
    }
}
