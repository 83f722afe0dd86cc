//! Power supply class
//!
//! Property model of the Linux power_supply class, a sysfs-backed supply and a
//! registry to look supplies up by name ("sec-charger", "sec-fuelgauge", ...).
//! Voltages are exchanged in mV and currents in mA, the units the battery
//! logic works in; the sysfs backend converts from the kernel's µV/µA.

use crate::HalError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Number of distinct power source types a cable can report
pub const CABLE_TYPE_COUNT: usize = 8;

/// Battery charging status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Unknown,
    Charging,
    Discharging,
    NotCharging,
    Full,
}

impl Status {
    /// Get sysfs name
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unknown => "Unknown",
            Status::Charging => "Charging",
            Status::Discharging => "Discharging",
            Status::NotCharging => "Not charging",
            Status::Full => "Full",
        }
    }

    /// Parse from sysfs string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Unknown" => Some(Status::Unknown),
            "Charging" => Some(Status::Charging),
            "Discharging" => Some(Status::Discharging),
            "Not charging" => Some(Status::NotCharging),
            "Full" => Some(Status::Full),
            _ => None,
        }
    }

    /// Integer value as carried by a property
    pub fn to_raw(self) -> i32 {
        self as i32
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Status::Unknown),
            1 => Some(Status::Charging),
            2 => Some(Status::Discharging),
            3 => Some(Status::NotCharging),
            4 => Some(Status::Full),
            _ => None,
        }
    }
}

/// Battery health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Unknown,
    Good,
    Overheat,
    Dead,
    OverVoltage,
    UnspecFailure,
    Cold,
    UnderVoltage,
}

impl Health {
    /// Get sysfs name
    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Unknown => "Unknown",
            Health::Good => "Good",
            Health::Overheat => "Overheat",
            Health::Dead => "Dead",
            Health::OverVoltage => "Over voltage",
            Health::UnspecFailure => "Unspecified failure",
            Health::Cold => "Cold",
            Health::UnderVoltage => "Under voltage",
        }
    }

    /// Parse from sysfs string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Unknown" => Some(Health::Unknown),
            "Good" => Some(Health::Good),
            "Overheat" => Some(Health::Overheat),
            "Dead" => Some(Health::Dead),
            "Over voltage" => Some(Health::OverVoltage),
            "Unspecified failure" => Some(Health::UnspecFailure),
            "Cold" => Some(Health::Cold),
            "Under voltage" => Some(Health::UnderVoltage),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i32 {
        self as i32
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Health::Unknown),
            1 => Some(Health::Good),
            2 => Some(Health::Overheat),
            3 => Some(Health::Dead),
            4 => Some(Health::OverVoltage),
            5 => Some(Health::UnspecFailure),
            6 => Some(Health::Cold),
            7 => Some(Health::UnderVoltage),
            _ => None,
        }
    }
}

/// Attached power source. `Battery` means nothing is plugged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CableType {
    Battery,
    Ups,
    Mains,
    Usb,
    UsbDcp,
    UsbCdp,
    UsbAca,
    Misc,
}

impl CableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CableType::Battery => "Battery",
            CableType::Ups => "UPS",
            CableType::Mains => "Mains",
            CableType::Usb => "USB",
            CableType::UsbDcp => "USB_DCP",
            CableType::UsbCdp => "USB_CDP",
            CableType::UsbAca => "USB_ACA",
            CableType::Misc => "Misc",
        }
    }

    /// Parse from a sysfs `type` string or a lowercase config name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "battery" | "none" => Some(CableType::Battery),
            "ups" => Some(CableType::Ups),
            "mains" | "ac" | "ta" => Some(CableType::Mains),
            "usb" => Some(CableType::Usb),
            "usb_dcp" => Some(CableType::UsbDcp),
            "usb_cdp" => Some(CableType::UsbCdp),
            "usb_aca" => Some(CableType::UsbAca),
            "misc" => Some(CableType::Misc),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i32 {
        self as i32
    }

    /// Map a property value to a cable type; values outside the known range are rejected
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(CableType::Battery),
            1 => Some(CableType::Ups),
            2 => Some(CableType::Mains),
            3 => Some(CableType::Usb),
            4 => Some(CableType::UsbDcp),
            5 => Some(CableType::UsbCdp),
            6 => Some(CableType::UsbAca),
            7 => Some(CableType::Misc),
            _ => None,
        }
    }

    /// Whether this source can charge the battery
    pub fn is_charger(&self) -> bool {
        *self != CableType::Battery
    }
}

/// Battery chemistry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technology {
    Unknown,
    Nimh,
    #[default]
    LiIon,
    LiPoly,
    LiFe,
    Nicd,
    LiMn,
}

impl Technology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::Unknown => "Unknown",
            Technology::Nimh => "NiMH",
            Technology::LiIon => "Li-ion",
            Technology::LiPoly => "Li-poly",
            Technology::LiFe => "LiFe",
            Technology::Nicd => "NiCd",
            Technology::LiMn => "LiMn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Unknown" => Some(Technology::Unknown),
            "NiMH" => Some(Technology::Nimh),
            "Li-ion" => Some(Technology::LiIon),
            "Li-poly" => Some(Technology::LiPoly),
            "LiFe" => Some(Technology::LiFe),
            "NiCd" => Some(Technology::Nicd),
            "LiMn" => Some(Technology::LiMn),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i32 {
        self as i32
    }
}

/// Power supply properties understood by the battery monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Status,
    ChargeType,
    Health,
    Present,
    Online,
    Technology,
    VoltageNow,
    VoltageAvg,
    /// Fuel gauge open-circuit voltage estimate
    VoltageOcv,
    CurrentNow,
    CurrentAvg,
    Capacity,
    /// Unscaled capacity in 0.1 %
    CapacityRaw,
    Temp,
    TempAmbient,
}

impl Property {
    /// Attribute file name under the supply's sysfs directory
    pub fn sysfs_name(&self) -> &'static str {
        match self {
            Property::Status => "status",
            Property::ChargeType => "charge_type",
            Property::Health => "health",
            Property::Present => "present",
            Property::Online => "online",
            Property::Technology => "technology",
            Property::VoltageNow => "voltage_now",
            Property::VoltageAvg => "voltage_avg",
            Property::VoltageOcv => "voltage_ocv",
            Property::CurrentNow => "current_now",
            Property::CurrentAvg => "current_avg",
            Property::Capacity => "capacity",
            Property::CapacityRaw => "capacity_raw",
            Property::Temp => "temp",
            Property::TempAmbient => "temp_ambient",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.sysfs_name() == s.trim())
    }

    pub fn all() -> &'static [Property] {
        &[
            Property::Status,
            Property::ChargeType,
            Property::Health,
            Property::Present,
            Property::Online,
            Property::Technology,
            Property::VoltageNow,
            Property::VoltageAvg,
            Property::VoltageOcv,
            Property::CurrentNow,
            Property::CurrentAvg,
            Property::Capacity,
            Property::CapacityRaw,
            Property::Temp,
            Property::TempAmbient,
        ]
    }

    /// Divisor between the kernel's sysfs unit and the unit used here
    fn sysfs_scale(&self) -> i64 {
        match self {
            Property::VoltageNow
            | Property::VoltageAvg
            | Property::VoltageOcv
            | Property::CurrentNow
            | Property::CurrentAvg => 1000,
            _ => 1,
        }
    }
}

/// A named power supply exposing integer properties
pub trait PowerSupply: Send + Sync {
    /// Supply name, e.g. "sec-fuelgauge"
    fn name(&self) -> &str;

    /// Read a property
    fn get_property(&self, prop: Property) -> Result<i32, HalError>;

    /// Write a property
    fn set_property(&self, prop: Property, value: i32) -> Result<(), HalError>;
}

/// Power supply backed by a `/sys/class/power_supply/<name>` directory
#[derive(Debug, Clone)]
pub struct SysfsPowerSupply {
    name: String,
    path: PathBuf,
}

impl SysfsPowerSupply {
    /// Create a supply rooted at `root/<name>`
    pub fn new(name: impl Into<String>, root: &Path) -> Self {
        let name = name.into();
        let path = root.join(&name);
        Self { name, path }
    }

    /// Supply directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(&self, prop: Property, contents: &str) -> Result<i32, HalError> {
        let text = contents.trim();
        let enumerated = match prop {
            Property::Status => Status::parse(text).map(Status::to_raw),
            Property::Health => Health::parse(text).map(Health::to_raw),
            Property::Technology => Technology::parse(text).map(Technology::to_raw),
            _ => None,
        };
        if let Some(value) = enumerated {
            return Ok(value);
        }

        let raw: i64 = text.parse().map_err(|_| HalError::InvalidValue {
            property: prop.sysfs_name(),
            value: text.to_string(),
        })?;
        Ok((raw / prop.sysfs_scale()) as i32)
    }

    fn encode(&self, prop: Property, value: i32) -> String {
        match prop {
            Property::Status => Status::from_raw(value)
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| value.to_string()),
            Property::Health => Health::from_raw(value)
                .map(|h| h.as_str().to_string())
                .unwrap_or_else(|| value.to_string()),
            _ => (value as i64 * prop.sysfs_scale()).to_string(),
        }
    }
}

impl PowerSupply for SysfsPowerSupply {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_property(&self, prop: Property) -> Result<i32, HalError> {
        let file = self.path.join(prop.sysfs_name());
        if !file.exists() {
            return Err(HalError::UnsupportedProperty {
                supply: self.name.clone(),
                property: prop.sysfs_name(),
            });
        }
        let contents = fs::read_to_string(&file)?;
        self.decode(prop, &contents)
    }

    fn set_property(&self, prop: Property, value: i32) -> Result<(), HalError> {
        let file = self.path.join(prop.sysfs_name());
        fs::write(&file, self.encode(prop, value))?;
        tracing::debug!("{}: {} <- {}", self.name, prop.sysfs_name(), value);
        Ok(())
    }
}

/// Supplies reachable by name
#[derive(Default, Clone)]
pub struct PowerSupplyRegistry {
    supplies: HashMap<String, Arc<dyn PowerSupply>>,
}

impl PowerSupplyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every supply found under a power_supply class directory
    pub fn detect(root: &Path) -> Result<Self, HalError> {
        let mut registry = Self::new();
        if !root.exists() {
            return Ok(registry);
        }

        for entry in fs::read_dir(root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let psu_type = fs::read_to_string(entry.path().join("type"))
                .map(|s| s.trim().to_string())
                .unwrap_or_default();

            tracing::info!("Found power supply {} ({})", name, psu_type);
            registry.register(Arc::new(SysfsPowerSupply::new(name, root)));
        }

        Ok(registry)
    }

    /// Add or replace a supply
    pub fn register(&mut self, supply: Arc<dyn PowerSupply>) {
        self.supplies.insert(supply.name().to_string(), supply);
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn PowerSupply>> {
        self.supplies.remove(name)
    }

    /// Look a supply up by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn PowerSupply>> {
        self.supplies.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.supplies.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.supplies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supplies.is_empty()
    }
}
