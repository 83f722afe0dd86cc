//! Battery state record

use midas_hal::{CableType, Health, Status};
use serde::Serialize;

/// Progress through charging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargingMode {
    /// Charger off
    #[default]
    None,
    Normal,
    /// Top-off stage of a two-stage full check
    SecondStage,
    /// Charging again after full
    Recharging,
}

impl ChargingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargingMode::None => "None",
            ChargingMode::Normal => "Normal",
            ChargingMode::SecondStage => "Additional",
            ChargingMode::Recharging => "Re-Charging",
        }
    }

    /// Value reported through the CHARGE_TYPE property
    pub fn to_raw(self) -> i32 {
        self as i32
    }
}

/// Everything the monitor knows about the battery
///
/// Owned by [`crate::Battery`] and only mutated from the work queue.
#[derive(Debug, Clone, Serialize)]
pub struct BatteryInfo {
    pub status: Status,
    pub health: Health,
    pub charging_mode: ChargingMode,
    pub cable_type: CableType,
    pub present: bool,

    /// mV
    pub voltage_now: i32,
    pub voltage_avg: i32,
    pub voltage_vfocv: i32,
    /// mA
    pub current_now: i32,
    pub current_avg: i32,
    /// Raw charging current sense reading
    pub current_adc: i32,
    /// %
    pub capacity: i32,
    /// 0.1 °C
    pub temperature: i32,
    pub temper_amb: i32,
    pub temp_adc: i32,

    pub temp_high_cnt: u32,
    pub temp_low_cnt: u32,
    pub temp_recover_cnt: u32,
    pub full_check_cnt: u32,
    /// Consecutive failed presence checks
    pub check_count: u32,

    /// Tick at which charging started
    pub charging_start: Option<u32>,
    /// Ticks since `charging_start`
    pub charging_passed: u32,
    /// Elapsed ticks at which the charger is re-armed next
    pub charging_next: u32,
}

impl Default for BatteryInfo {
    fn default() -> Self {
        Self {
            status: Status::Discharging,
            health: Health::Good,
            charging_mode: ChargingMode::None,
            cable_type: CableType::Battery,
            present: false,
            voltage_now: 0,
            voltage_avg: 0,
            voltage_vfocv: 0,
            current_now: 0,
            current_avg: 0,
            current_adc: 0,
            capacity: 0,
            temperature: 0,
            temper_amb: 0,
            temp_adc: 0,
            temp_high_cnt: 0,
            temp_low_cnt: 0,
            temp_recover_cnt: 0,
            full_check_cnt: 0,
            check_count: 0,
            charging_start: None,
            charging_passed: 0,
            charging_next: 0,
        }
    }
}

impl BatteryInfo {
    pub fn reset_temp_counters(&mut self) {
        self.temp_high_cnt = 0;
        self.temp_low_cnt = 0;
        self.temp_recover_cnt = 0;
    }

    /// Whether status and charging mode agree
    ///
    /// Full never pairs with a first-stage charge, and Charging always has a
    /// charging mode once cable work ran.
    pub fn is_consistent(&self) -> bool {
        let full_while_normal =
            self.status == Status::Full && self.charging_mode == ChargingMode::Normal;
        let charging_without_mode =
            self.status == Status::Charging && self.charging_mode == ChargingMode::None;
        !(full_while_normal || charging_without_mode)
    }
}
