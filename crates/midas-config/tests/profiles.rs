//! Integration tests for platform data loading

use midas_config::{BatteryConfig, ConfigError, PollingType, load_board_profiles};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test helper for configuration tests
struct ConfigTestEnvironment {
    #[allow(dead_code)]
    temp_dir: TempDir,
    config_dir: PathBuf,
}

impl ConfigTestEnvironment {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_dir = temp_dir.path().join("etc/midas-battery");
        fs::create_dir_all(config_dir.join("boards")).expect("Failed to create boards directory");

        Self {
            temp_dir,
            config_dir,
        }
    }

    fn write_config(&self, name: &str, content: &str) -> PathBuf {
        let path = self.config_dir.join(name);
        fs::write(&path, content).expect("Failed to write config");
        path
    }

    fn write_board(&self, name: &str, content: &str) -> PathBuf {
        self.write_config(&format!("boards/{}.toml", name), content)
    }

    fn dir(&self) -> &Path {
        &self.config_dir
    }
}

#[test]
fn test_partial_file_over_defaults() {
    let env = ConfigTestEnvironment::new();
    let path = env.write_config(
        "battery.toml",
        r#"
[battery]
vendor = "ATL ATL"

[monitor]
polling = "workqueue"
normal_polling_time = 60
"#,
    );

    let config = BatteryConfig::load_layered(Some(&path)).unwrap();
    assert_eq!(config.battery.vendor, "ATL ATL");
    assert_eq!(config.monitor.polling, PollingType::Workqueue);
    assert_eq!(config.monitor.normal_polling_time, 60);

    let defaults = BatteryConfig::default();
    assert_eq!(
        config.monitor.short_polling_time,
        defaults.monitor.short_polling_time
    );
    assert_eq!(config.battery.charger_name, defaults.battery.charger_name);
}

#[test]
fn test_missing_file_reported() {
    let env = ConfigTestEnvironment::new();
    let missing = env.dir().join("absent.toml");

    assert!(matches!(
        BatteryConfig::load_layered(Some(&missing)),
        Err(ConfigError::NotFound(_))
    ));
    assert!(matches!(
        BatteryConfig::load(&missing),
        Err(ConfigError::NotFound(_))
    ));
}

#[test]
fn test_invalid_file_rejected() {
    let env = ConfigTestEnvironment::new();
    let path = env.write_config("battery.toml", "[monitor]\nshort_polling_time = 0\n");

    assert!(matches!(
        BatteryConfig::load(&path),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_save_then_load() {
    let env = ConfigTestEnvironment::new();
    let path = env.dir().join("saved/battery.toml");

    let mut config = BatteryConfig::slp_pq();
    config.battery.vendor = "SDI 1650".to_string();
    config.save(&path).unwrap();

    let loaded = BatteryConfig::load(&path).unwrap();
    assert_eq!(loaded.battery.vendor, "SDI 1650");
    assert_eq!(loaded.cable.windows.len(), config.cable.windows.len());
    assert_eq!(loaded.monitor.polling, config.monitor.polling);
}

#[test]
fn test_board_overlays_join_builtins() {
    let env = ConfigTestEnvironment::new();
    env.write_board(
        "proto",
        r#"
[battery]
fuelgauge_name = "max17047-fuelgauge"

[recharge]
vcell = 4120
"#,
    );
    env.write_config("boards/README", "not a profile");

    let profiles = load_board_profiles(env.dir()).unwrap();
    assert!(profiles.contains_key("midas"));
    assert!(profiles.contains_key("slp-pq"));
    assert_eq!(profiles.len(), 3);

    let proto = BatteryConfig::load_profile(env.dir(), "proto").unwrap();
    assert_eq!(proto.battery.fuelgauge_name, "max17047-fuelgauge");
    assert_eq!(proto.recharge.vcell, Some(4120));
    assert_eq!(proto.recharge.avg_vcell, Some(4150));
    assert_eq!(proto.battery.charger_name, "sec-charger");
}

#[test]
fn test_unknown_and_broken_profiles() {
    let env = ConfigTestEnvironment::new();
    assert!(matches!(
        BatteryConfig::load_profile(env.dir(), "nope"),
        Err(ConfigError::UnknownProfile(_))
    ));

    env.write_board("broken", "[thermal]\ncheck_count = 0\n");
    assert!(BatteryConfig::load_profile(env.dir(), "midas").is_err());
}
