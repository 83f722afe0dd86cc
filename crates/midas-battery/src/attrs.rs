//! Battery attributes
//!
//! Text attributes next to the standard properties. The activity events are
//! writable (`1` activates, `0` clears); the rest expose internals for
//! diagnostics.

use crate::events::EventMask;
use crate::monitor::Battery;
use crate::{BatteryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Call2g,
    Call3g,
    Music,
    Video,
    Browser,
    Hotspot,
    Camera,
    Camcorder,
    DataCall,
    Wifi,
    Wibro,
    Lte,
    Event,
    BattType,
    BattVfocv,
    BattTempAdc,
    BattChargingSource,
    BattChgCurrentAdc,
}

impl Attribute {
    pub fn all() -> &'static [Attribute] {
        &[
            Attribute::Call2g,
            Attribute::Call3g,
            Attribute::Music,
            Attribute::Video,
            Attribute::Browser,
            Attribute::Hotspot,
            Attribute::Camera,
            Attribute::Camcorder,
            Attribute::DataCall,
            Attribute::Wifi,
            Attribute::Wibro,
            Attribute::Lte,
            Attribute::Event,
            Attribute::BattType,
            Attribute::BattVfocv,
            Attribute::BattTempAdc,
            Attribute::BattChargingSource,
            Attribute::BattChgCurrentAdc,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Call2g => "call_2g",
            Attribute::Call3g => "call_3g",
            Attribute::Music => "music",
            Attribute::Video => "video",
            Attribute::Browser => "browser",
            Attribute::Hotspot => "hotspot",
            Attribute::Camera => "camera",
            Attribute::Camcorder => "camcorder",
            Attribute::DataCall => "data_call",
            Attribute::Wifi => "wifi",
            Attribute::Wibro => "wibro",
            Attribute::Lte => "lte",
            Attribute::Event => "event",
            Attribute::BattType => "batt_type",
            Attribute::BattVfocv => "batt_vfocv",
            Attribute::BattTempAdc => "batt_temp_adc",
            Attribute::BattChargingSource => "batt_charging_source",
            Attribute::BattChgCurrentAdc => "batt_chg_current_adc",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::all().iter().copied().find(|a| a.name() == name)
    }

    /// Event flag behind a writable attribute
    pub fn event_flag(&self) -> Option<EventMask> {
        let flag = match self {
            Attribute::Call2g => EventMask::CALL_2G,
            Attribute::Call3g => EventMask::CALL_3G,
            Attribute::Music => EventMask::MUSIC,
            Attribute::Video => EventMask::VIDEO,
            Attribute::Browser => EventMask::BROWSER,
            Attribute::Hotspot => EventMask::HOTSPOT,
            Attribute::Camera => EventMask::CAMERA,
            Attribute::Camcorder => EventMask::CAMCORDER,
            Attribute::DataCall => EventMask::DATA_CALL,
            Attribute::Wifi => EventMask::WIFI,
            Attribute::Wibro => EventMask::WIBRO,
            Attribute::Lte => EventMask::LTE,
            _ => return None,
        };
        Some(flag)
    }

    pub fn is_writable(&self) -> bool {
        self.event_flag().is_some()
    }
}

impl Battery {
    /// Text value of an attribute
    pub fn show_attr(&mut self, name: &str) -> Result<String> {
        let attr = Attribute::parse(name)
            .ok_or_else(|| BatteryError::UnknownAttribute(name.to_string()))?;

        let value = match attr {
            Attribute::Event => self.snapshot().event.to_string(),
            Attribute::BattType => self.config().battery.vendor.clone(),
            Attribute::BattVfocv => self.info().voltage_vfocv.to_string(),
            Attribute::BattTempAdc => self.info().temp_adc.to_string(),
            Attribute::BattChargingSource => self.info().cable_type.to_raw().to_string(),
            Attribute::BattChgCurrentAdc => self.info().current_adc.to_string(),
            event => {
                let flag = event.event_flag().unwrap_or_default();
                u8::from(self.events().contains(flag)).to_string()
            }
        };
        Ok(value)
    }

    /// Write an attribute; only the activity events accept writes
    pub fn store_attr(&mut self, name: &str, value: &str) -> Result<()> {
        let attr = Attribute::parse(name)
            .ok_or_else(|| BatteryError::UnknownAttribute(name.to_string()))?;
        let flag = attr
            .event_flag()
            .ok_or(BatteryError::ReadOnly(attr.name()))?;

        let enable: i32 = value
            .trim()
            .parse()
            .map_err(|_| BatteryError::InvalidInput(value.to_string()))?;

        self.event_set(flag, enable != 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for attr in Attribute::all() {
            assert_eq!(Attribute::parse(attr.name()), Some(*attr));
        }
        assert_eq!(Attribute::parse(" music\n"), Some(Attribute::Music));
        assert_eq!(Attribute::parse("radio"), None);
    }

    #[test]
    fn test_writable_set() {
        let writable: Vec<_> = Attribute::all()
            .iter()
            .filter(|a| a.is_writable())
            .collect();
        assert_eq!(writable.len(), 12);
        assert!(!Attribute::Event.is_writable());
        assert_eq!(Attribute::Lte.event_flag(), Some(EventMask::LTE));
    }
}
