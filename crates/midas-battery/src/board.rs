//! Board hooks
//!
//! Board code answers the questions the platform data cannot: whether the
//! device is in power-off charging, what the cable switch says, and what to
//! do when the battery disappears or the input voltage goes out of range.
//! Every hook has a neutral default.

use midas_hal::{CableType, Health, Property};
use std::sync::RwLock;

pub trait Board: Send + Sync {
    /// Charging with the device otherwise powered off
    fn is_lpm(&self) -> bool {
        false
    }

    /// Cable reported by the board's detection hardware
    fn check_cable_status(&self) -> CableType {
        CableType::Battery
    }

    /// Route the cable ID line to the ADC
    fn cable_switch_check(&self) {}

    /// Route the cable ID line back to normal operation
    fn cable_switch_normal(&self) {}

    /// Presence check for `BatteryCheck::Callback`
    fn check_battery(&self) -> bool {
        true
    }

    /// Called once the battery has been declared missing
    fn check_result(&self) {}

    /// Input voltage check for `OvpUvloCheck::Callback`; `false` when abnormal
    fn ovp_uvlo_check(&self) -> bool {
        true
    }

    /// Recovery for an abnormal input voltage
    fn ovp_uvlo_result(&self, _health: Health) {}

    /// Temperature for `ThermalSource::Callback`, in 0.1 °C
    fn get_temperature(&self, _prop: Property) -> Option<i32> {
        None
    }

    /// Runs once after the monitor has been started
    fn initial_check(&self) {}
}

/// Board with every hook at its default
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBoard;

impl Board for DefaultBoard {}

/// Board values
#[derive(Debug, Clone)]
pub struct StaticBoardState {
    pub lpm: bool,
    pub cable: CableType,
    pub battery_present: bool,
    pub ovp_uvlo_ok: bool,
    pub temperature: Option<i32>,
    pub temper_amb: Option<i32>,
    pub check_results: u32,
    pub ovp_uvlo_results: Vec<Health>,
    pub switch_checks: u32,
    pub switch_normals: u32,
    pub initial_checks: u32,
}

impl Default for StaticBoardState {
    fn default() -> Self {
        Self {
            lpm: false,
            cable: CableType::Battery,
            battery_present: true,
            ovp_uvlo_ok: true,
            temperature: None,
            temper_amb: None,
            check_results: 0,
            ovp_uvlo_results: Vec::new(),
            switch_checks: 0,
            switch_normals: 0,
            initial_checks: 0,
        }
    }
}

/// Board whose answers are set at runtime and whose hook calls are recorded
#[derive(Debug, Default)]
pub struct StaticBoard {
    state: RwLock<StaticBoardState>,
}

impl StaticBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the board's answers
    pub fn update(&self, f: impl FnOnce(&mut StaticBoardState)) {
        if let Ok(mut state) = self.state.write() {
            f(&mut state);
        }
    }

    pub fn snapshot(&self) -> StaticBoardState {
        self.state.read().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Board for StaticBoard {
    fn is_lpm(&self) -> bool {
        self.snapshot().lpm
    }

    fn check_cable_status(&self) -> CableType {
        self.snapshot().cable
    }

    fn cable_switch_check(&self) {
        self.update(|s| s.switch_checks += 1);
    }

    fn cable_switch_normal(&self) {
        self.update(|s| s.switch_normals += 1);
    }

    fn check_battery(&self) -> bool {
        self.snapshot().battery_present
    }

    fn check_result(&self) {
        self.update(|s| s.check_results += 1);
    }

    fn ovp_uvlo_check(&self) -> bool {
        self.snapshot().ovp_uvlo_ok
    }

    fn ovp_uvlo_result(&self, health: Health) {
        self.update(|s| s.ovp_uvlo_results.push(health));
    }

    fn get_temperature(&self, prop: Property) -> Option<i32> {
        let state = self.snapshot();
        match prop {
            Property::Temp => state.temperature,
            Property::TempAmbient => state.temper_amb,
            _ => None,
        }
    }

    fn initial_check(&self) {
        self.update(|s| s.initial_checks += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_board() {
        let board = DefaultBoard;
        assert!(!board.is_lpm());
        assert!(board.check_battery());
        assert_eq!(board.check_cable_status(), CableType::Battery);
        assert_eq!(board.get_temperature(Property::Temp), None);
    }

    #[test]
    fn test_static_board_records_hooks() {
        let board = StaticBoard::new();
        board.update(|s| {
            s.cable = CableType::Usb;
            s.temperature = Some(315);
        });

        assert_eq!(board.check_cable_status(), CableType::Usb);
        assert_eq!(board.get_temperature(Property::Temp), Some(315));

        board.ovp_uvlo_result(Health::OverVoltage);
        board.check_result();
        let state = board.snapshot();
        assert_eq!(state.ovp_uvlo_results, vec![Health::OverVoltage]);
        assert_eq!(state.check_results, 1);
    }
}
