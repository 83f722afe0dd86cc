//! Configuration for the midas battery monitor
//!
//! Battery platform data lives in a TOML file. [`BatteryConfig::load`] reads
//! a single file; [`BatteryConfig::load_layered`] additionally applies
//! `MIDAS_BATTERY__SECTION__KEY` environment overrides, e.g.
//! `MIDAS_BATTERY__MONITOR__NORMAL_POLLING_TIME=60`.

mod platform;
mod profiles;

pub use platform::{
    AdcChannel, AdcSection, AdcTempPoint, AdcType, BatteryCheck, BatteryConfig, BatterySection,
    CableCheck, CableSection, CableSource, CableWindow, EventSection, FuelGaugeSection,
    FullCheckSection, FullCheckType, MonitorSection, OvpUvloCheck, OvpUvloSection, PollingType,
    PresenceSection, RechargeSection, TempCheck, TempThresholds, ThermalSection, ThermalSource,
    TimerSection,
};
pub use profiles::{BUILTIN_PROFILES, load_board_profiles};

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown board profile: {0}")]
    UnknownProfile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Layered configuration error: {0}")]
    Layered(#[from] config::ConfigError),
}

/// Standard configuration paths
pub const CONFIG_DIR: &str = "/etc/midas-battery";
pub const CONFIG_FILE: &str = "battery.toml";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "MIDAS_BATTERY";

impl BatteryConfig {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a file with environment overrides on top
    ///
    /// Without a file the built-in defaults are the base layer.
    pub fn load_layered(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = toml::to_string(&Self::default())?;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(&defaults, config::FileFormat::Toml));

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location, falling back to the
    /// midas profile
    pub fn load_default() -> Result<Self, ConfigError> {
        let system_config = Path::new(CONFIG_DIR).join(CONFIG_FILE);
        if system_config.exists() {
            return Self::load_layered(Some(&system_config));
        }

        tracing::warn!("No battery configuration found, using midas defaults");
        Self::load_layered(None)
    }

    /// Resolve a board profile name against built-ins and `config_dir/boards`
    pub fn load_profile(config_dir: &Path, name: &str) -> Result<Self, ConfigError> {
        load_board_profiles(config_dir)?
            .remove(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Battery configuration saved to {}", path.display());
        Ok(())
    }
}

/// Helper function to merge TOML values
pub fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_serialize_deserialize() {
        let config = BatteryConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: BatteryConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            config.monitor.normal_polling_time,
            parsed.monitor.normal_polling_time
        );
        assert_eq!(config.thermal.lpm, parsed.thermal.lpm);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound(PathBuf::from("/etc/midas-battery/battery.toml"));
        assert!(format!("{}", err).contains("not found"));

        let err = ConfigError::Invalid("test error".to_string());
        assert!(format!("{}", err).contains("Invalid"));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[full_check]
type = "charger_gpio"
gpio = 17
gpio_active_high = false
"#
        )
        .unwrap();

        let config = BatteryConfig::load(file.path()).unwrap();
        assert_eq!(config.full_check.kind, FullCheckType::ChargerGpio);
        assert_eq!(config.full_check.gpio, 17);
        assert_eq!(config.monitor.short_polling_time, 3);
    }

    #[test]
    fn test_load_invalid_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[monitor]\nshort_polling_time = 0").unwrap();
        assert!(matches!(
            BatteryConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            BatteryConfig::load(Path::new("/nonexistent/battery.toml")),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_merge_toml() {
        let mut base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n[b]\nz = 4").unwrap();
        merge_toml(&mut base, overlay);

        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(3));
        assert_eq!(base["b"]["z"].as_integer(), Some(4));
    }
}
