//! Activity events
//!
//! User-space reports activities (calls, media, radios) that heat the device.
//! While any is active the event temperature thresholds apply. A cleared
//! event lingers for the configured waiting time before it drops.

use midas_config::EventSection;
use serde::Serialize;
use std::fmt;

use crate::timer::{elapsed, secs_to_ticks};

/// Set of activity flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct EventMask(u32);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const CALL_2G: EventMask = EventMask(0x0001);
    pub const CALL_3G: EventMask = EventMask(0x0002);
    pub const MUSIC: EventMask = EventMask(0x0004);
    pub const VIDEO: EventMask = EventMask(0x0008);
    pub const BROWSER: EventMask = EventMask(0x0010);
    pub const HOTSPOT: EventMask = EventMask(0x0020);
    pub const CAMERA: EventMask = EventMask(0x0040);
    pub const CAMCORDER: EventMask = EventMask(0x0080);
    pub const DATA_CALL: EventMask = EventMask(0x0100);
    pub const WIFI: EventMask = EventMask(0x0200);
    pub const WIBRO: EventMask = EventMask(0x0400);
    pub const LTE: EventMask = EventMask(0x0800);

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Self {
        EventMask(bits & 0x0fff)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: EventMask) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: EventMask) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: EventMask) {
        self.0 &= !other.0;
    }
}

impl fmt::Display for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Active events and the pending expiry of the last cleared one
#[derive(Debug, Clone)]
pub struct EventTracker {
    enabled: bool,
    waiting_ticks: u32,
    event: EventMask,
    event_wait: EventMask,
    armed_at: Option<u32>,
}

impl EventTracker {
    pub fn new(config: &EventSection) -> Self {
        Self {
            enabled: config.enabled,
            waiting_ticks: secs_to_ticks(config.waiting_time),
            event: EventMask::NONE,
            event_wait: EventMask::NONE,
            armed_at: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Activate or clear an event at tick `now`
    pub fn set(&mut self, flag: EventMask, enable: bool, now: u32) {
        if !self.enabled {
            return;
        }

        self.expire(now);

        if !enable && self.event == self.event_wait {
            tracing::info!("Ignoring duplicated deactivation of {}", flag);
            return;
        }

        // any pending expiry completes now
        self.armed_at = None;
        self.event.remove(self.event_wait);

        if enable {
            self.event_wait = EventMask::NONE;
            self.event.insert(flag);
            tracing::info!("Event set ({})", self.event);
        } else {
            if self.event.is_empty() {
                tracing::debug!("No event to clear");
                return;
            }
            self.event_wait = flag;
            self.armed_at = Some(now);
            tracing::info!(
                "Event expiry started (curr {}, wait {})",
                self.event,
                self.event_wait
            );
        }
    }

    /// Drop the waiting event once its time is up
    pub fn expire(&mut self, now: u32) {
        let Some(armed_at) = self.armed_at else {
            return;
        };

        if elapsed(armed_at, now) >= self.waiting_ticks {
            self.event.remove(self.event_wait);
            self.event_wait = EventMask::NONE;
            self.armed_at = None;
            tracing::info!("Event expired ({})", self.event);
        }
    }

    /// Events in force at tick `now`
    pub fn active(&mut self, now: u32) -> EventMask {
        self.expire(now);
        self.event
    }

    /// Events as last updated, without checking expiry
    pub fn current(&self) -> EventMask {
        self.event
    }

    pub fn waiting(&self) -> EventMask {
        self.event_wait
    }
}
