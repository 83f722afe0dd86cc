//! Simulated hardware for running the daemon without a battery
//!
//! The charger and fuel gauge are in-memory supplies with plausible values;
//! cables are plugged in through the control socket (`online usb`).

use midas_battery::{Hardware, StaticBoard};
use midas_config::{AdcType, BatterySection};
use midas_hal::mock::{MockAdc, MockGpio, MockPowerSupply};
use midas_hal::{Health, MonotonicClock, PowerSupplyRegistry, Property};
use std::sync::Arc;

pub fn hardware(names: &BatterySection) -> Hardware {
    let charger = MockPowerSupply::new(names.charger_name.as_str());
    charger.set(Property::Health, Health::Good.to_raw());
    charger.set(Property::Present, 1);

    let fuel_gauge = MockPowerSupply::new(names.fuelgauge_name.as_str());
    for (prop, value) in [
        (Property::VoltageNow, 3850),
        (Property::VoltageAvg, 3840),
        (Property::VoltageOcv, 3870),
        (Property::CurrentNow, 350),
        (Property::CurrentAvg, 340),
        (Property::Capacity, 62),
        (Property::CapacityRaw, 615),
        (Property::Temp, 265),
        (Property::TempAmbient, 250),
        (Property::Present, 1),
    ] {
        fuel_gauge.set(prop, value);
    }

    let pmic = MockPowerSupply::new(names.pmic_name.as_str());
    pmic.set(Property::Health, Health::Good.to_raw());
    pmic.set(Property::Present, 1);

    let mut registry = PowerSupplyRegistry::new();
    registry.register(Arc::new(charger));
    registry.register(Arc::new(fuel_gauge));
    registry.register(Arc::new(pmic));

    let adc = MockAdc::new();
    tracing::info!("Using simulated hardware");

    Hardware::new(registry, Arc::new(MonotonicClock::new()))
        .with_adc(AdcType::Ap, Arc::new(adc.clone()))
        .with_adc(AdcType::Ic, Arc::new(adc))
        .with_gpio(Arc::new(MockGpio::new()))
        .with_board(Arc::new(StaticBoard::new()))
}
