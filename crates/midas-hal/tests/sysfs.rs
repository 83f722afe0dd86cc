//! Integration tests against a fake sysfs tree

use midas_hal::{
    AdcReader, CableType, GpioReader, HalError, Health, IioAdc, PowerSupplyRegistry, Property,
    Status, SysfsGpio, SysfsWakeLock, WakeLock,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A `/sys` lookalike with the nodes the battery monitor touches
struct SysfsTestEnvironment {
    #[allow(dead_code)]
    temp_dir: TempDir,
    root: PathBuf,
}

impl SysfsTestEnvironment {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("sys");

        for dir in [
            "class/power_supply",
            "class/gpio",
            "bus/iio/devices/iio:device0",
            "power",
        ] {
            fs::create_dir_all(root.join(dir)).expect("Failed to create sysfs directory");
        }

        Self { temp_dir, root }
    }

    fn supplies(&self) -> PathBuf {
        self.root.join("class/power_supply")
    }

    fn add_supply(&self, name: &str, files: &[(&str, &str)]) {
        let dir = self.supplies().join(name);
        fs::create_dir_all(&dir).expect("Failed to create supply");
        for (file, contents) in files {
            fs::write(dir.join(file), contents).expect("Failed to write supply attribute");
        }
    }

    fn write(&self, rel: &str, contents: &str) {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent");
        }
        fs::write(path, contents).expect("Failed to write sysfs node");
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root.join(rel)).expect("Failed to read sysfs node")
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }
}

fn midas_tree() -> SysfsTestEnvironment {
    let env = SysfsTestEnvironment::new();
    env.add_supply(
        "sec-charger",
        &[
            ("type", "Mains\n"),
            ("status", "Discharging\n"),
            ("health", "Good\n"),
            ("online", "0\n"),
            ("current_now", "0\n"),
        ],
    );
    env.add_supply(
        "sec-fuelgauge",
        &[
            ("type", "Battery\n"),
            ("voltage_now", "3987000\n"),
            ("voltage_avg", "3975000\n"),
            ("current_now", "-215000\n"),
            ("capacity", "71\n"),
            ("temp", "283\n"),
        ],
    );
    env.add_supply("max77686-pmic", &[("type", "Unknown\n"), ("present", "1\n")]);
    env
}

#[test]
fn test_detect_and_read_fuel_gauge() {
    let env = midas_tree();
    let registry = PowerSupplyRegistry::detect(&env.supplies()).unwrap();
    assert_eq!(
        registry.names(),
        vec!["max77686-pmic", "sec-charger", "sec-fuelgauge"]
    );

    let fg = registry.get("sec-fuelgauge").unwrap();
    assert_eq!(fg.get_property(Property::VoltageNow).unwrap(), 3987);
    assert_eq!(fg.get_property(Property::VoltageAvg).unwrap(), 3975);
    assert_eq!(fg.get_property(Property::CurrentNow).unwrap(), -215);
    assert_eq!(fg.get_property(Property::Capacity).unwrap(), 71);
    assert_eq!(fg.get_property(Property::Temp).unwrap(), 283);
    assert!(matches!(
        fg.get_property(Property::TempAmbient),
        Err(HalError::UnsupportedProperty { .. })
    ));
}

#[test]
fn test_charger_writes_land_in_sysfs() {
    let env = midas_tree();
    let registry = PowerSupplyRegistry::detect(&env.supplies()).unwrap();
    let charger = registry.get("sec-charger").unwrap();

    charger
        .set_property(Property::Online, CableType::Usb.to_raw())
        .unwrap();
    charger.set_property(Property::CurrentNow, 500).unwrap();
    charger
        .set_property(Property::Status, Status::Charging.to_raw())
        .unwrap();

    assert_eq!(env.read("class/power_supply/sec-charger/online"), "3");
    assert_eq!(env.read("class/power_supply/sec-charger/current_now"), "500000");
    assert_eq!(env.read("class/power_supply/sec-charger/status"), "Charging");

    assert_eq!(charger.get_property(Property::CurrentNow).unwrap(), 500);
    assert_eq!(
        charger.get_property(Property::Health).unwrap(),
        Health::Good.to_raw()
    );
}

#[test]
fn test_garbage_attribute_rejected() {
    let env = midas_tree();
    env.write("class/power_supply/sec-fuelgauge/capacity", "n/a\n");

    let registry = PowerSupplyRegistry::detect(&env.supplies()).unwrap();
    let fg = registry.get("sec-fuelgauge").unwrap();
    assert!(matches!(
        fg.get_property(Property::Capacity),
        Err(HalError::InvalidValue { .. })
    ));
}

#[test]
fn test_empty_class_directory() {
    let env = SysfsTestEnvironment::new();
    assert!(PowerSupplyRegistry::detect(&env.supplies()).unwrap().is_empty());
    assert!(
        PowerSupplyRegistry::detect(&env.path("class/missing"))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_iio_channels() {
    let env = midas_tree();
    env.write("bus/iio/devices/iio:device0/in_voltage2_raw", "2105\n");
    env.write("bus/iio/devices/iio:device0/in_voltage6_raw", "busy\n");

    let adc = IioAdc::new(&env.path("bus/iio/devices/iio:device0"));
    assert_eq!(adc.read(2).unwrap(), 2105);
    assert!(matches!(adc.read(6), Err(HalError::AdcRead { channel: 6, .. })));
    assert!(matches!(adc.read(7), Err(HalError::AdcRead { channel: 7, .. })));
}

#[test]
fn test_gpio_line_levels() {
    let env = midas_tree();
    env.write("class/gpio/gpio17/value", "0\n");
    env.write("class/gpio/gpio18/value", "1\n");

    let gpio = SysfsGpio::new(&env.path("class/gpio"));
    assert!(!gpio.get_value(17).unwrap());
    assert!(gpio.get_value(18).unwrap());
}

#[test]
fn test_wake_lock_cycle() {
    let env = midas_tree();
    let lock = SysfsWakeLock::new("midas-battery-cable", &env.path("power"));

    lock.lock();
    assert_eq!(env.read("power/wake_lock"), "midas-battery-cable");
    lock.unlock();
    assert_eq!(env.read("power/wake_unlock"), "midas-battery-cable");
}

#[test]
fn test_supply_tree_survives_missing_type() {
    let env = SysfsTestEnvironment::new();
    env.add_supply("battery", &[("capacity", "50\n")]);

    let registry = PowerSupplyRegistry::detect(&env.supplies()).unwrap();
    let battery = registry.get("battery").unwrap();
    assert_eq!(battery.get_property(Property::Capacity).unwrap(), 50);
    assert!(battery.get_property(Property::Health).is_err());
}
