//! Battery error types

use midas_config::ConfigError;
use midas_hal::{HalError, Health, Property};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatteryError {
    /// Charging was requested while a charger is attached and health is not Good
    #[error("Battery is not good ({}), charging refused", .0.as_str())]
    NotGood(Health),

    #[error("Power supply {0} is not registered")]
    SupplyMissing(String),

    #[error("Invalid cable type: {0}")]
    InvalidCable(i32),

    #[error("ADC channel {0} has no converter assigned")]
    AdcUnassigned(u32),

    #[error("ADC sample needs at least 3 reads, got {0}")]
    AdcCount(u32),

    #[error("Property {} is not handled here", .0.sysfs_name())]
    UnsupportedProperty(Property),

    #[error("Invalid value {value} for {}", .property.sysfs_name())]
    InvalidValue { property: Property, value: i32 },

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Attribute {0} is read-only")]
    ReadOnly(&'static str),

    #[error("Invalid attribute input: {0:?}")]
    InvalidInput(String),

    #[error("Hardware error: {0}")]
    Hal(#[from] HalError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Battery Result type
pub type Result<T> = std::result::Result<T, BatteryError>;
