//! Full-charge detection
//!
//! A strategy produces one sample per monitor run; the debounce counter
//! declares the battery full once more than `count` consecutive samples
//! qualified.

use midas_config::{FullCheckSection, FullCheckType};
use midas_hal::{GpioReader, Property, Status};

use crate::adc::AdcSampler;
use crate::info::{BatteryInfo, ChargingMode};
use crate::supply::{Role, Supplies};

/// Outcome of one full-check sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// Charging current (or done signal) says full
    Done,
    NotDone,
    /// Nothing could be measured this run; the counter is left alone
    Unavailable,
}

/// Capacity and average-voltage floors that must hold before sampling
pub fn conditions_met(full: &FullCheckSection, info: &BatteryInfo) -> bool {
    if let Some(soc) = full.condition_soc {
        if info.capacity < soc as i32 {
            tracing::debug!("Not enough SOC ({}%)", info.capacity);
            return false;
        }
    }

    if let Some(mv) = full.condition_avg_vcell {
        if info.voltage_avg < mv as i32 {
            tracing::debug!("Not enough AVGVCELL ({}mV)", info.voltage_avg);
            return false;
        }
    }

    true
}

/// Hardware a sample may need
pub struct Sensors<'a> {
    pub adc: &'a AdcSampler,
    pub gpio: &'a dyn GpioReader,
    pub supplies: &'a Supplies,
}

/// Take one sample with the configured strategy
pub fn sample(full: &FullCheckSection, info: &mut BatteryInfo, sensors: &Sensors<'_>) -> Sample {
    let second_stage = full.kind.is_dual() && info.charging_mode == ChargingMode::SecondStage;

    match full.kind {
        FullCheckType::Adc | FullCheckType::AdcDual => {
            let Ok(current_adc) = sensors.adc.read_smoothed(full.adc_channel) else {
                return Sample::Unavailable;
            };
            info.current_adc = current_adc;
            let limit = if second_stage {
                full.adc_2nd
            } else {
                full.adc_1st
            };
            tracing::debug!("Current ADC ({}) limit {}", current_adc, limit);
            done_if(current_adc < limit)
        }
        FullCheckType::FgCurrent | FullCheckType::FgCurrentDual => {
            let limit = if second_stage {
                full.current_2nd
            } else {
                full.current_1st
            };
            done_if(info.current_avg < limit)
        }
        FullCheckType::ChargerGpio => match sensors.gpio.get_value(full.gpio) {
            Ok(level) => done_if(level == full.gpio_active_high),
            Err(e) => {
                tracing::error!("Full check GPIO: {}", e);
                Sample::Unavailable
            }
        },
        FullCheckType::ChargerPsy => match sensors.supplies.get(Role::Charger, Property::Status) {
            Ok(raw) => done_if(Status::from_raw(raw) == Some(Status::Full)),
            Err(e) => {
                tracing::error!("Full check charger status: {}", e);
                Sample::Unavailable
            }
        },
        // pushed through set_property(Status, Full)
        FullCheckType::ChargerInterrupt => Sample::Unavailable,
    }
}

fn done_if(done: bool) -> Sample {
    if done { Sample::Done } else { Sample::NotDone }
}

/// Apply a sample to the debounce counter; `true` when full is reached
pub fn debounce(info: &mut BatteryInfo, count: u32, sample: Sample) -> bool {
    match sample {
        Sample::Done => {
            info.full_check_cnt += 1;
            tracing::debug!("Full check count {}", info.full_check_cnt);
        }
        Sample::NotDone => info.full_check_cnt = 0,
        Sample::Unavailable => {}
    }

    if info.full_check_cnt > count {
        info.full_check_cnt = 0;
        true
    } else {
        false
    }
}
