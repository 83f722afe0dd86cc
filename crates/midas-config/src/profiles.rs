//! Board profiles
//!
//! Built-in platform data for the boards the monitor ships on, plus custom
//! profiles read from `<config_dir>/boards/*.toml`. A custom profile file
//! only needs the keys it changes; the rest comes from the defaults.

use midas_hal::CableType;
use std::collections::HashMap;
use std::path::Path;

use crate::platform::{
    AdcChannel, AdcTempPoint, AdcType, BatteryCheck, BatteryConfig, CableSource, CableWindow,
    FullCheckType, OvpUvloCheck, PollingType, TempCheck, ThermalSource,
};
use crate::{ConfigError, merge_toml};

/// Names of the built-in profiles
pub const BUILTIN_PROFILES: &[&str] = &["midas", "slp-pq"];

impl BatteryConfig {
    /// Midas reference board: fuel gauge and charger supplies do the sensing
    pub fn midas() -> Self {
        Self::default()
    }

    /// SLP proto board: ADC cable detection, thermistor on the AP ADC and a
    /// two-stage ADC full check
    pub fn slp_pq() -> Self {
        let mut config = Self::default();

        config.battery.vendor = "SDI SDI".to_string();
        config.adc.channels = vec![
            AdcChannel {
                channel: 1,
                kind: AdcType::Ap,
            },
            AdcChannel {
                channel: 2,
                kind: AdcType::Ap,
            },
            AdcChannel {
                channel: 3,
                kind: AdcType::Ap,
            },
        ];

        config.cable.check.polling = true;
        config.cable.source = CableSource::Adc;
        config.cable.adc_channel = 1;
        config.cable.max_voltage = 3300;
        config.cable.windows = vec![
            CableWindow {
                min: 0,
                max: 500,
                cable: CableType::Battery,
            },
            CableWindow {
                min: 500,
                max: 1200,
                cable: CableType::Usb,
            },
            CableWindow {
                min: 1200,
                max: 2000,
                cable: CableType::Mains,
            },
            CableWindow {
                min: 2000,
                max: 2600,
                cable: CableType::Misc,
            },
        ];

        config.monitor.polling = PollingType::Workqueue;
        config.presence.check = BatteryCheck::Pmic;
        config.ovp_uvlo.check = OvpUvloCheck::PmicPolling;

        config.thermal.source = ThermalSource::Adc;
        config.thermal.adc_channel = 2;
        config.thermal.check = TempCheck::Temp;
        config.thermal.adc_table = vec![
            AdcTempPoint {
                adc: 300,
                temperature: 700,
            },
            AdcTempPoint {
                adc: 500,
                temperature: 600,
            },
            AdcTempPoint {
                adc: 800,
                temperature: 500,
            },
            AdcTempPoint {
                adc: 1200,
                temperature: 400,
            },
            AdcTempPoint {
                adc: 1700,
                temperature: 250,
            },
            AdcTempPoint {
                adc: 2400,
                temperature: 100,
            },
            AdcTempPoint {
                adc: 3000,
                temperature: 0,
            },
            AdcTempPoint {
                adc: 3500,
                temperature: -100,
            },
        ];

        config.full_check.kind = FullCheckType::AdcDual;
        config.full_check.adc_channel = 3;
        config.full_check.adc_1st = 300;
        config.full_check.adc_2nd = 150;

        config.fuel_gauge.scale = true;
        config.fuel_gauge.atomic = true;
        config.fuel_gauge.capacity_max = 990;
        config.fuel_gauge.capacity_min = 10;

        config
    }

    /// Built-in profile by name
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "midas" => Some(Self::midas()),
            "slp-pq" => Some(Self::slp_pq()),
            _ => None,
        }
    }

    /// Apply a partial TOML document on top of this configuration
    pub fn overlay(&self, overlay: &str) -> Result<Self, ConfigError> {
        let mut base = toml::Value::try_from(self)?;
        let overlay: toml::Value = toml::from_str(overlay)?;
        merge_toml(&mut base, overlay);
        Ok(base.try_into()?)
    }
}

/// Load board profiles: the built-ins plus every `boards/*.toml` overlay
pub fn load_board_profiles(
    config_dir: &Path,
) -> Result<HashMap<String, BatteryConfig>, ConfigError> {
    let boards_dir = config_dir.join("boards");
    let mut profiles = HashMap::new();

    for name in BUILTIN_PROFILES {
        if let Some(profile) = BatteryConfig::builtin(name) {
            profiles.insert(name.to_string(), profile);
        }
    }

    if boards_dir.exists() {
        for entry in std::fs::read_dir(&boards_dir)? {
            let path = entry?.path();

            if path.extension().is_some_and(|e| e == "toml") {
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let contents = std::fs::read_to_string(&path)?;
                let profile = BatteryConfig::default().overlay(&contents)?;
                profile.validate()?;
                tracing::debug!("Loaded board profile {} from {}", name, path.display());
                profiles.insert(name.to_string(), profile);
            }
        }
    }

    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_validate() {
        for name in BUILTIN_PROFILES {
            let profile = BatteryConfig::builtin(name).unwrap();
            profile.validate().unwrap();
        }
        assert!(BatteryConfig::builtin("unknown").is_none());
    }

    #[test]
    fn test_slp_pq_profile() {
        let profile = BatteryConfig::slp_pq();
        assert_eq!(profile.cable.source, CableSource::Adc);
        assert_eq!(profile.adc.kind_of(2), AdcType::Ap);
        assert!(profile.full_check.kind.is_dual());
    }

    #[test]
    fn test_overlay_keeps_untouched_keys() {
        let base = BatteryConfig::midas();
        let merged = base
            .overlay("[monitor]\nnormal_polling_time = 60\n")
            .unwrap();

        assert_eq!(merged.monitor.normal_polling_time, 60);
        assert_eq!(
            merged.monitor.short_polling_time,
            base.monitor.short_polling_time
        );
        assert_eq!(merged.thermal.normal, base.thermal.normal);
    }
}
