//! Hardware Abstraction Layer (HAL)
//!
//! This crate gives the battery monitor access to the hardware it depends on
//! through small traits, so the charging logic never touches a file or a
//! register directly.
//!
//! # Backends
//!
//! - `/sys/class/power_supply` for charger, fuel gauge and PMIC supplies
//! - IIO ADC channels (`/sys/bus/iio/devices/iio:deviceN`)
//! - sysfs GPIO lines
//! - Android-style wake locks (`/sys/power/wake_lock`)
//! - Mock implementations of all of the above for tests
//!
//! # Example
//!
//! ```no_run
//! use midas_hal::{PowerSupplyRegistry, Property};
//! use std::path::Path;
//!
//! fn main() -> Result<(), midas_hal::HalError> {
//!     let registry = PowerSupplyRegistry::detect(Path::new("/sys/class/power_supply"))?;
//!     if let Some(fg) = registry.get("sec-fuelgauge") {
//!         println!("VCELL: {} mV", fg.get_property(Property::VoltageNow)?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod adc;
pub mod clock;
pub mod gpio;
pub mod mock;
pub mod power_supply;
pub mod wakelock;

pub use adc::{AdcReader, IioAdc};
pub use clock::{MonotonicClock, TICKS_PER_SEC, TickSource};
pub use gpio::{GpioReader, SysfsGpio};
pub use power_supply::{
    CABLE_TYPE_COUNT, CableType, Health, PowerSupply, PowerSupplyRegistry, Property, Status,
    SysfsPowerSupply, Technology,
};
pub use wakelock::{SysfsWakeLock, WakeLock};

use thiserror::Error;

/// Errors raised by hardware backends
#[derive(Debug, Error)]
pub enum HalError {
    #[error("Power supply not found: {0}")]
    SupplyNotFound(String),

    #[error("Property {property} not supported by {supply}")]
    UnsupportedProperty {
        supply: String,
        property: &'static str,
    },

    #[error("Invalid value for {property}: {value}")]
    InvalidValue { property: &'static str, value: String },

    #[error("ADC channel {channel} read failed: {reason}")]
    AdcRead { channel: u32, reason: String },

    #[error("GPIO {0} unavailable")]
    Gpio(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HAL Result type
pub type Result<T> = std::result::Result<T, HalError>;
