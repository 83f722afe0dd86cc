//! Battery charging monitor
//!
//! Policy side of the battery service: it reads the fuel gauge, decides when
//! the charger is switched on or off, and keeps the battery's status, health
//! and charging mode. Scheduling, wake locks and publishing belong to the
//! daemon that drives [`Battery`].
//!
//! # Example
//!
//! ```no_run
//! use midas_battery::{Battery, Hardware};
//! use midas_config::BatteryConfig;
//! use midas_hal::{MonotonicClock, PowerSupplyRegistry};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let registry = PowerSupplyRegistry::detect(Path::new("/sys/class/power_supply"))?;
//!     let hw = Hardware::new(registry, Arc::new(MonotonicClock::new()));
//!     let mut battery = Battery::new(BatteryConfig::midas(), hw)?;
//!
//!     let report = battery.monitor();
//!     println!("{:?}, next run in {:?}", battery.info().status, report.next_poll);
//!     Ok(())
//! }
//! ```

pub mod adc;
pub mod attrs;
pub mod board;
pub mod cable;
pub mod capacity;
pub mod error;
pub mod events;
pub mod fullcharge;
pub mod info;
pub mod monitor;
pub mod notify;
pub mod supply;
pub mod temperature;
pub mod timer;
pub mod voltage;

pub use attrs::Attribute;
pub use board::{Board, DefaultBoard, StaticBoard, StaticBoardState};
pub use error::{BatteryError, Result};
pub use events::EventMask;
pub use info::{BatteryInfo, ChargingMode};
pub use monitor::{
    Battery, Followup, Hardware, MonitorReport, Snapshot, Step, VBUS_RELEASE_DELAY, VbusAction,
};
pub use notify::{ChangeListener, NoopListener, SupplyKind};
pub use temperature::ThresholdSet;
