//! Battery monitor
//!
//! [`Battery`] owns the battery state and runs the two work items the daemon
//! queues: the periodic monitor run and the cable work that follows a cable
//! change. A monitor run goes through its checks in a fixed order; a check
//! that returns [`Step::Stop`] skips the rest of the run.
//!
//! ```text
//! refresh info -> presence/cable -> voltage -> polling gate
//!     -> charge timers -> temperature -> full charge -> publish
//! ```

use midas_config::{
    AdcType, BatteryCheck, BatteryConfig, FullCheckType, PollingType, TempCheck, TempThresholds,
    ThermalSource,
};
use midas_hal::{
    AdcReader, CableType, GpioReader, HalError, Health, PowerSupplyRegistry, Property, Status,
    SysfsGpio, TickSource,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::adc::AdcSampler;
use crate::board::{Board, DefaultBoard};
use crate::cable::CableDetector;
use crate::capacity::CapacityFilter;
use crate::events::{EventMask, EventTracker};
use crate::fullcharge::{self, Sensors};
use crate::info::{BatteryInfo, ChargingMode};
use crate::notify::{ChangeListener, NoopListener, SupplyKind};
use crate::supply::{Role, Supplies};
use crate::temperature::{self, ThresholdSet};
use crate::timer::{self, TimerAction, secs_to_ticks};
use crate::voltage;
use crate::{BatteryError, Result};

/// How long the VBUS wake lock outlives a cable removal
pub const VBUS_RELEASE_DELAY: Duration = Duration::from_secs(5);

/// Outcome of one monitor check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stop,
}

/// What a monitor run found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorReport {
    /// Cable polling saw a different cable; cable work should be queued
    pub cable_changed: bool,
    /// The run got past the polling gate
    pub policy_ran: bool,
    /// Delay before the next run; `None` when polling is driven externally
    pub next_poll: Option<Duration>,
}

/// What to do with the VBUS wake lock after cable work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VbusAction {
    /// Leave it alone
    None,
    /// Hold while the charger is attached
    Hold,
    /// Hold for a while, then let it expire
    HoldFor(Duration),
}

/// What must happen after an external property write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    None,
    CableWork,
}

/// State published to listeners
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub info: BatteryInfo,
    pub event: u32,
    pub usb_online: bool,
    pub ac_online: bool,
}

/// Hardware the monitor runs against
pub struct Hardware {
    pub supplies: PowerSupplyRegistry,
    pub clock: Arc<dyn TickSource>,
    pub adc: Vec<(AdcType, Arc<dyn AdcReader>)>,
    pub gpio: Arc<dyn GpioReader>,
    pub board: Arc<dyn Board>,
    pub listener: Arc<dyn ChangeListener>,
}

impl Hardware {
    pub fn new(supplies: PowerSupplyRegistry, clock: Arc<dyn TickSource>) -> Self {
        Self {
            supplies,
            clock,
            adc: Vec::new(),
            gpio: Arc::new(SysfsGpio::default()),
            board: Arc::new(DefaultBoard),
            listener: Arc::new(NoopListener),
        }
    }

    pub fn with_adc(mut self, kind: AdcType, reader: Arc<dyn AdcReader>) -> Self {
        self.adc.push((kind, reader));
        self
    }

    pub fn with_gpio(mut self, gpio: Arc<dyn GpioReader>) -> Self {
        self.gpio = gpio;
        self
    }

    pub fn with_board(mut self, board: Arc<dyn Board>) -> Self {
        self.board = board;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn ChangeListener>) -> Self {
        self.listener = listener;
        self
    }
}

/// Battery monitor context
pub struct Battery {
    config: BatteryConfig,
    info: BatteryInfo,
    supplies: Supplies,
    adc: AdcSampler,
    gpio: Arc<dyn GpioReader>,
    clock: Arc<dyn TickSource>,
    board: Arc<dyn Board>,
    listener: Arc<dyn ChangeListener>,
    cable: CableDetector,
    events: EventTracker,
    capacity: CapacityFilter,
    thresholds: (ThresholdSet, TempThresholds),
    check_adc_value: i32,
    polling_count: u32,
    initial_count: u32,
    long_polling: bool,
    test_activated: bool,
}

impl Battery {
    /// Set up the monitor; fails when the platform data is unusable or the
    /// charger or fuel gauge is missing
    pub fn new(config: BatteryConfig, hw: Hardware) -> Result<Self> {
        config.validate()?;

        let supplies = Supplies::new(hw.supplies, &config.battery);
        supplies.supply(Role::Charger)?;
        supplies.supply(Role::FuelGauge)?;

        let mut adc = AdcSampler::new(&config.adc);
        for (kind, reader) in hw.adc {
            adc = adc.with_backend(kind, reader);
        }

        tracing::info!(
            "Battery monitor: {} ({}), polling {:?} every {}s",
            config.battery.vendor,
            config.battery.technology.as_str(),
            config.monitor.polling,
            config.monitor.short_polling_time
        );

        Ok(Self {
            cable: CableDetector::new(&config),
            events: EventTracker::new(&config.event),
            capacity: CapacityFilter::new(&config.fuel_gauge),
            thresholds: (ThresholdSet::Normal, config.thermal.normal),
            initial_count: config.monitor.initial_count,
            info: BatteryInfo::default(),
            supplies,
            adc,
            gpio: hw.gpio,
            clock: hw.clock,
            board: hw.board,
            listener: hw.listener,
            check_adc_value: 0,
            polling_count: 0,
            long_polling: false,
            test_activated: false,
            config,
        })
    }

    pub fn info(&self) -> &BatteryInfo {
        &self.info
    }

    pub fn config(&self) -> &BatteryConfig {
        &self.config
    }

    pub fn board(&self) -> &Arc<dyn Board> {
        &self.board
    }

    /// Threshold set used by the last temperature check
    pub fn thresholds(&self) -> (ThresholdSet, TempThresholds) {
        self.thresholds
    }

    pub fn long_polling(&self) -> bool {
        self.long_polling
    }

    /// Switch to the long polling interval (low consumption state)
    pub fn set_long_polling(&mut self, active: bool) {
        if self.long_polling != active {
            tracing::info!("Long polling {}", if active { "on" } else { "off" });
        }
        self.long_polling = active;
    }

    /// Whether the cable interrupt should queue cable work
    pub fn cable_interrupt_enabled(&self) -> bool {
        self.cable.uses_interrupt()
    }

    pub fn events(&self) -> EventMask {
        self.events.current()
    }

    /// Activate or clear an activity event
    pub fn event_set(&mut self, flag: EventMask, enable: bool) {
        let now = self.clock.ticks();
        self.events.set(flag, enable, now);
    }

    pub fn usb_online(&self) -> bool {
        self.info.cable_type == CableType::Usb
    }

    pub fn ac_online(&self) -> bool {
        self.info.cable_type == CableType::Mains
    }

    pub fn snapshot(&mut self) -> Snapshot {
        let now = self.clock.ticks();
        Snapshot {
            info: self.info.clone(),
            event: self.events.active(now).bits(),
            usb_online: self.usb_online(),
            ac_online: self.ac_online(),
        }
    }

    /// Run the board's one-time check after start-up
    pub fn initial_check(&self) {
        self.board.initial_check();
    }

    /// Turn the charger on for the attached cable, or off
    ///
    /// Turning on is refused while a charger is attached and health is not
    /// Good; turning off always goes through.
    pub fn set_charge(&mut self, enable: bool) -> Result<()> {
        let value = if enable {
            if self.info.cable_type != CableType::Battery && self.info.health != Health::Good {
                tracing::info!("Battery is NOT good, charging refused");
                return Err(BatteryError::NotGood(self.info.health));
            }

            if self.info.charging_start.is_none() {
                self.info.charging_start = Some(self.clock.ticks());
                self.info.charging_next = secs_to_ticks(self.config.timer.charging_reset_time);
            }
            self.info.reset_temp_counters();
            self.info.cable_type.to_raw()
        } else {
            self.info.charging_start = None;
            self.info.charging_passed = 0;
            self.info.charging_next = 0;
            self.info.full_check_cnt = 0;
            CableType::Battery.to_raw()
        };

        let charger = self.supplies.set(Role::Charger, Property::Online, value);
        let fuel_gauge = self.supplies.set(Role::FuelGauge, Property::Online, value);
        charger.and(fuel_gauge)
    }

    /// One periodic monitor run
    pub fn monitor(&mut self) -> MonitorReport {
        let mut report = MonitorReport::default();

        self.refresh_info();

        if self.test_activated {
            tracing::debug!("Property set externally, skipping checks");
        } else {
            self.run_checks(&mut report);
        }

        tracing::info!(
            "Status({}), Health({})",
            self.info.status.as_str(),
            self.info.health.as_str()
        );

        self.test_activated = false;
        self.listener.changed(SupplyKind::Battery);

        report.next_poll = self.next_poll_delay();
        report
    }

    fn run_checks(&mut self, report: &mut MonitorReport) {
        if self.battery_cable_check(report) == Step::Stop {
            return;
        }

        if self.voltage_check() == Step::Stop {
            return;
        }

        if !self.polling_gate_open() {
            return;
        }
        report.policy_ran = true;

        if self.time_management() == Step::Stop {
            return;
        }

        if self.temperature_check() == Step::Stop {
            return;
        }

        self.fullcharged_check();
    }

    /// Pull fresh measurements from the fuel gauge and temperature source
    pub fn refresh_info(&mut self) {
        // a failed read keeps the last good value
        if let Some(v) = self.read_fuel_gauge(Property::VoltageNow) {
            self.info.voltage_now = v;
        }
        if let Some(v) = self.read_fuel_gauge(Property::VoltageAvg) {
            self.info.voltage_avg = v;
        }
        if let Some(v) = self.read_fuel_gauge(Property::VoltageOcv) {
            self.info.voltage_vfocv = v;
        }
        if let Some(v) = self.read_fuel_gauge(Property::CurrentNow) {
            self.info.current_now = v;
        }
        if let Some(v) = self.read_fuel_gauge(Property::CurrentAvg) {
            self.info.current_avg = v;
        }

        if let Some(capacity) = self.read_fuel_gauge(Property::Capacity) {
            let raw = if self.capacity.wants_raw() {
                self.supplies.get(Role::FuelGauge, Property::CapacityRaw).ok()
            } else {
                None
            };
            self.info.capacity = self.capacity.apply(capacity, raw);
        }

        self.refresh_temperature();

        tracing::info!(
            "{}, SOC({}%)",
            if self.info.present {
                "Connected"
            } else {
                "Disconnected"
            },
            self.info.capacity
        );
        tracing::info!(
            "Vnow({}mV), Vavg({}mV), Vocv({}mV)",
            self.info.voltage_now,
            self.info.voltage_avg,
            self.info.voltage_vfocv
        );
        tracing::info!(
            "Inow({}mA), Iavg({}mA), Iadc({})",
            self.info.current_now,
            self.info.current_avg,
            self.info.current_adc
        );
        tracing::info!(
            "Tbat({}.{}), Tamb({}.{})",
            self.info.temperature / 10,
            (self.info.temperature % 10).abs(),
            self.info.temper_amb / 10,
            (self.info.temper_amb % 10).abs()
        );
    }

    fn refresh_temperature(&mut self) {
        match self.config.thermal.source {
            ThermalSource::FuelGauge => {
                if let Some(temp) = self.read_fuel_gauge(Property::Temp) {
                    self.info.temperature = temp;
                }
                if let Some(temp) = self.read_fuel_gauge(Property::TempAmbient) {
                    self.info.temper_amb = temp;
                }
            }
            ThermalSource::Callback => {
                if let Some(temp) = self.board.get_temperature(Property::Temp) {
                    self.info.temperature = temp;
                    self.push_temperature(Property::Temp, temp);
                }
                if let Some(temp) = self.board.get_temperature(Property::TempAmbient) {
                    self.info.temper_amb = temp;
                    self.push_temperature(Property::TempAmbient, temp);
                }
            }
            ThermalSource::Adc => {
                if let Some(temp) = self.temperature_by_adc(Property::Temp) {
                    self.info.temperature = temp;
                    self.push_temperature(Property::Temp, temp);
                }
                if let Some(temp) = self.temperature_by_adc(Property::TempAmbient) {
                    self.info.temper_amb = temp;
                    self.push_temperature(Property::TempAmbient, temp);
                }
            }
        }
    }

    fn read_fuel_gauge(&self, prop: Property) -> Option<i32> {
        match self.supplies.get(Role::FuelGauge, prop) {
            Ok(value) => Some(value),
            Err(BatteryError::Hal(HalError::UnsupportedProperty { .. })) => None,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", prop.sysfs_name(), e);
                None
            }
        }
    }

    fn temperature_by_adc(&mut self, prop: Property) -> Option<i32> {
        let thermal = &self.config.thermal;
        let (channel, table) = match prop {
            Property::Temp => (thermal.adc_channel, &thermal.adc_table),
            _ => (thermal.ambient_adc_channel, &thermal.ambient_adc_table),
        };
        if table.is_empty() {
            return None;
        }

        let adc = self.adc.read_smoothed(channel).ok()?;
        if prop == Property::Temp {
            self.info.temp_adc = adc;
        }

        let temp = temperature::adc_to_temperature(table, adc)?;
        tracing::debug!("Temp({}), Temp-ADC({})", temp, adc);
        Some(temp)
    }

    fn push_temperature(&self, prop: Property, value: i32) {
        // the gauge uses it for its own compensation
        let _ = self.supplies.set(Role::FuelGauge, prop, value);
    }

    fn battery_present(&mut self) -> bool {
        let presence = &self.config.presence;
        let role = match presence.check {
            BatteryCheck::None => {
                tracing::debug!("No battery check");
                return true;
            }
            BatteryCheck::Callback => return self.board.check_battery(),
            BatteryCheck::Adc => {
                match self.adc.read_once(presence.adc_channel) {
                    Ok(adc) if adc > 0 => self.check_adc_value = adc,
                    Ok(_) | Err(_) => tracing::error!("VF ADC error"),
                }
                return self.check_adc_value > presence.adc_min
                    && self.check_adc_value < presence.adc_max;
            }
            BatteryCheck::Pmic => Role::Pmic,
            BatteryCheck::FuelGauge => Role::FuelGauge,
            BatteryCheck::Charger => Role::Charger,
        };

        match self.supplies.get(role, Property::Present) {
            Ok(present) => present != 0,
            Err(e) => {
                tracing::error!("Battery check: {}", e);
                false
            }
        }
    }

    fn battery_cable_check(&mut self, report: &mut MonitorReport) -> Step {
        if self.battery_present() {
            self.info.check_count = 0;
        } else if self.info.check_count < self.config.presence.check_count {
            self.info.check_count += 1;
        } else {
            tracing::error!("Battery disconnected");
            self.info.present = false;
            self.info.health = Health::UnspecFailure;
            self.board.check_result();
            return Step::Stop;
        }

        self.info.present = true;

        if self.cable.polls() {
            match self.cable.detect(&self.adc, self.board.as_ref()) {
                Ok(Some(cable)) if cable != self.info.cable_type => {
                    tracing::info!(
                        "Cable changed: {} -> {}",
                        self.info.cable_type.as_str(),
                        cable.as_str()
                    );
                    report.cable_changed = true;
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Cable detection failed: {}", e),
            }
        }

        Step::Continue
    }

    fn voltage_check(&mut self) -> Step {
        if self.info.status == Status::Discharging {
            tracing::debug!("Charging disabled, voltage check skipped");
            return Step::Continue;
        }

        if voltage::ovp_uvlo_ok(
            self.config.ovp_uvlo.check,
            &mut self.info,
            &self.supplies,
            self.board.as_ref(),
        ) {
            tracing::debug!("Normal charging voltage");
        } else {
            self.ovp_uvlo_result();
        }

        if let Some(reason) = voltage::recharge_reason(&self.config.recharge, &self.info) {
            tracing::info!("Re-charging by {:?}", reason);
            self.info.charging_mode = ChargingMode::Recharging;
            if let Err(e) = self.set_charge(true) {
                tracing::error!("Recharge not started: {}", e);
            }
        }

        Step::Continue
    }

    fn ovp_uvlo_result(&mut self) {
        tracing::error!("Abnormal charging voltage ({})", self.info.health.as_str());
        self.info.status = Status::NotCharging;
        self.board.ovp_uvlo_result(self.info.health);
    }

    /// Only every `normal / short`-th run goes past the voltage check,
    /// unless long polling is active
    fn polling_gate_open(&mut self) -> bool {
        if !self.long_polling {
            let ratio =
                self.config.monitor.normal_polling_time / self.config.monitor.short_polling_time;
            let count = self.polling_count;
            self.polling_count += 1;
            if ratio > count {
                return false;
            }
        }
        self.polling_count = 0;
        true
    }

    fn time_management(&mut self) -> Step {
        let now = self.clock.ticks();

        match timer::check(&mut self.info, &self.config.timer, now) {
            TimerAction::None => Step::Continue,
            TimerAction::ChargingExpired => {
                self.info.status = Status::Full;
                self.info.charging_mode = ChargingMode::None;
                self.stop_on_timer()
            }
            TimerAction::RechargingExpired => {
                self.info.charging_mode = ChargingMode::None;
                self.stop_on_timer()
            }
            TimerAction::Refresh => {
                if let Err(e) = self.set_charge(true) {
                    tracing::error!("Fail to set charger: {}", e);
                }
                Step::Continue
            }
        }
    }

    fn stop_on_timer(&mut self) -> Step {
        match self.set_charge(false) {
            Ok(()) => Step::Stop,
            Err(e) => {
                tracing::error!("Fail to set charger: {}", e);
                Step::Continue
            }
        }
    }

    fn temperature_check(&mut self) -> Step {
        if self.info.status == Status::Discharging {
            tracing::debug!("Charging disabled, temperature check skipped");
            return Step::Continue;
        }

        let now = self.clock.ticks();
        let event_active = self.events.enabled() && !self.events.active(now).is_empty();
        self.thresholds =
            temperature::select(&self.config.thermal, event_active, self.board.is_lpm());

        let (set, th) = self.thresholds;
        tracing::info!(
            "{} thresholds: HT({}), HR({}), LT({}), LR({})",
            set.as_str(),
            th.high_threshold,
            th.high_recovery,
            th.low_threshold,
            th.low_recovery
        );

        let value = match self.config.thermal.check {
            TempCheck::Adc => self.info.temp_adc,
            TempCheck::Temp => self.info.temperature,
        };

        let health =
            temperature::classify(&mut self.info, value, &th, self.config.thermal.check_count);

        match health {
            Health::Overheat | Health::Cold => {
                tracing::info!("Unsafe temperature");
                self.info.status = Status::NotCharging;
                if let Err(e) = self.set_charge(false) {
                    tracing::error!("Fail to stop charging: {}", e);
                }
                Step::Stop
            }
            _ => {
                tracing::debug!("Safe temperature");
                if health == Health::Good && self.info.status == Status::NotCharging {
                    self.info.status = match self.info.charging_mode {
                        ChargingMode::Recharging => Status::Full,
                        ChargingMode::None => {
                            // charging restarts from scratch
                            self.info.charging_mode = ChargingMode::Normal;
                            Status::Charging
                        }
                        _ => Status::Charging,
                    };
                    if let Err(e) = self.set_charge(true) {
                        tracing::error!("Fail to resume charging: {}", e);
                    }
                }
                Step::Continue
            }
        }
    }

    fn fullcharged_check(&mut self) {
        if self.info.charging_mode == ChargingMode::None {
            tracing::debug!("No need to check full-charged");
            return;
        }

        let full = &self.config.full_check;
        if fullcharge::conditions_met(full, &self.info) {
            let sensors = Sensors {
                adc: &self.adc,
                gpio: self.gpio.as_ref(),
                supplies: &self.supplies,
            };
            let sample = fullcharge::sample(full, &mut self.info, &sensors);
            if fullcharge::debounce(&mut self.info, full.count, sample) {
                self.do_fullcharged();
            }
        }

        tracing::info!("Charging mode: {}", self.info.charging_mode.as_str());
    }

    /// Act on a detected full charge
    pub fn do_fullcharged(&mut self) {
        if self.config.full_check.kind.is_dual() && self.info.charging_mode == ChargingMode::Normal
        {
            self.info.charging_mode = ChargingMode::SecondStage;
        } else {
            self.info.charging_mode = ChargingMode::None;
            if let Err(e) = self.set_charge(false) {
                tracing::error!("Fail to stop charging: {}", e);
            }
            let _ = self
                .supplies
                .set(Role::FuelGauge, Property::Status, Status::Full.to_raw());
        }

        self.info.status = Status::Full;
    }

    /// Delay before the next monitor run
    fn next_poll_delay(&mut self) -> Option<Duration> {
        let monitor = &self.config.monitor;

        let polling_time = if !self.long_polling {
            monitor.short_polling_time
        } else if monitor.long_polling_time > 0 {
            monitor.long_polling_time
        } else {
            tracing::error!("No long polling time");
            monitor.short_polling_time
        };

        if monitor.polling == PollingType::Timer {
            return None;
        }

        if self.initial_count > 0 {
            self.initial_count -= 1;
            Some(Duration::from_secs(1))
        } else {
            Some(Duration::from_secs(polling_time as u64))
        }
    }

    /// React to an attached or removed cable
    pub fn cable_work(&mut self) -> VbusAction {
        match self.cable.detect(&self.adc, self.board.as_ref()) {
            Ok(Some(cable)) => self.info.cable_type = cable,
            Ok(None) => {}
            Err(e) => tracing::error!("Cable detection failed: {}", e),
        }

        let vbus = if self.info.cable_type == CableType::Battery {
            self.info.status = Status::Discharging;
            self.info.health = Health::Good;

            if let Err(e) = self.set_charge(false) {
                tracing::error!("Fail to stop charging: {}", e);
                return VbusAction::None;
            }
            VbusAction::HoldFor(VBUS_RELEASE_DELAY)
        } else {
            self.info.charging_mode = ChargingMode::Normal;
            self.info.status = Status::Charging;

            if let Err(e) = self.set_charge(true) {
                tracing::error!("Fail to start charging: {}", e);
                return VbusAction::None;
            }

            // an alarm wakes the system by itself
            if self.config.monitor.polling == PollingType::Alarm {
                VbusAction::None
            } else {
                VbusAction::Hold
            }
        };

        tracing::info!(
            "Cable work: {} -> {}",
            self.info.cable_type.as_str(),
            self.info.status.as_str()
        );

        self.listener.changed(SupplyKind::Ac);
        self.listener.changed(SupplyKind::Usb);
        vbus
    }

    /// Read a battery property
    pub fn get_property(&self, prop: Property) -> Result<i32> {
        let info = &self.info;
        let value = match prop {
            Property::Status => info.status.to_raw(),
            Property::ChargeType => info.charging_mode.to_raw(),
            Property::Health => info.health.to_raw(),
            Property::Present => info.present as i32,
            Property::Online => info.cable_type.to_raw(),
            Property::Technology => self.config.battery.technology.to_raw(),
            Property::VoltageNow => info.voltage_now,
            Property::VoltageAvg => info.voltage_avg,
            Property::VoltageOcv => info.voltage_vfocv,
            Property::CurrentNow => info.current_now,
            Property::CurrentAvg => info.current_avg,
            Property::Capacity => info.capacity,
            Property::Temp => info.temperature,
            Property::TempAmbient => info.temper_amb,
            Property::CapacityRaw => return Err(BatteryError::UnsupportedProperty(prop)),
        };
        Ok(value)
    }

    /// Write a battery property from outside the monitor
    ///
    /// The next monitor run only refreshes measurements.
    pub fn set_property(&mut self, prop: Property, value: i32) -> Result<Followup> {
        tracing::debug!("set_property({}, {})", prop.sysfs_name(), value);
        let invalid = BatteryError::InvalidValue {
            property: prop,
            value,
        };

        let followup = match prop {
            Property::Status => {
                let status = Status::from_raw(value).ok_or(invalid)?;
                if self.config.full_check.kind == FullCheckType::ChargerInterrupt
                    && status == Status::Full
                {
                    self.do_fullcharged();
                }
                self.info.status = status;
                Followup::None
            }
            Property::Health => {
                let health = Health::from_raw(value).ok_or(invalid)?;
                self.info.health = health;
                if matches!(health, Health::OverVoltage | Health::UnderVoltage) {
                    self.ovp_uvlo_result();
                }
                Followup::None
            }
            Property::Online => {
                let cable = CableType::from_raw(value).ok_or(BatteryError::InvalidCable(value))?;
                tracing::info!("Cable was changed ({})", cable.as_str());
                self.info.cable_type = cable;
                Followup::CableWork
            }
            _ => return Err(BatteryError::UnsupportedProperty(prop)),
        };

        self.test_activated = true;
        Ok(followup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::StaticBoard;
    use midas_hal::mock::{ManualClock, MockPowerSupply};

    fn battery(config: BatteryConfig) -> (Battery, MockPowerSupply, MockPowerSupply) {
        let charger = MockPowerSupply::new("sec-charger");
        let fg = MockPowerSupply::new("sec-fuelgauge");
        let mut registry = PowerSupplyRegistry::new();
        registry.register(Arc::new(charger.clone()));
        registry.register(Arc::new(fg.clone()));

        let hw = Hardware::new(registry, Arc::new(ManualClock::new(0)))
            .with_board(Arc::new(StaticBoard::new()));
        (Battery::new(config, hw).unwrap(), charger, fg)
    }

    #[test]
    fn test_missing_charger_fails() {
        let registry = PowerSupplyRegistry::new();
        let hw = Hardware::new(registry, Arc::new(ManualClock::new(0)));
        assert!(matches!(
            Battery::new(BatteryConfig::default(), hw),
            Err(BatteryError::SupplyMissing(_))
        ));
    }

    #[test]
    fn test_enable_refused_when_not_good() {
        let (mut bat, charger, _) = battery(BatteryConfig::default());
        bat.info.cable_type = CableType::Mains;
        bat.info.health = Health::Overheat;

        assert!(matches!(
            bat.set_charge(true),
            Err(BatteryError::NotGood(Health::Overheat))
        ));
        assert!(charger.writes().is_empty());

        bat.set_charge(false).unwrap();
        assert_eq!(
            charger.last_write(Property::Online),
            Some(CableType::Battery.to_raw())
        );
    }

    #[test]
    fn test_enable_keeps_start_time() {
        let (mut bat, charger, fg) = battery(BatteryConfig::default());
        bat.info.cable_type = CableType::Usb;
        bat.info.temp_high_cnt = 1;

        bat.set_charge(true).unwrap();
        let start = bat.info.charging_start;
        assert!(start.is_some());
        assert_eq!(bat.info.temp_high_cnt, 0);
        assert_eq!(
            charger.last_write(Property::Online),
            Some(CableType::Usb.to_raw())
        );
        assert_eq!(fg.last_write(Property::Online), Some(CableType::Usb.to_raw()));

        bat.set_charge(true).unwrap();
        assert_eq!(bat.info.charging_start, start);

        bat.info.full_check_cnt = 2;
        bat.set_charge(false).unwrap();
        assert!(bat.info.charging_start.is_none());
        assert_eq!(bat.info.full_check_cnt, 0);
    }

    #[test]
    fn test_online_property() {
        let (mut bat, _, _) = battery(BatteryConfig::default());
        assert_eq!(
            bat.set_property(Property::Online, CableType::Usb.to_raw())
                .unwrap(),
            Followup::CableWork
        );
        assert!(bat.usb_online());
        assert!(!bat.ac_online());
        assert_eq!(bat.get_property(Property::Online).unwrap(), 3);

        assert!(matches!(
            bat.set_property(Property::Online, 8),
            Err(BatteryError::InvalidCable(8))
        ));
        assert!(matches!(
            bat.set_property(Property::Capacity, 50),
            Err(BatteryError::UnsupportedProperty(Property::Capacity))
        ));
    }

    #[test]
    fn test_initial_delays() {
        let mut config = BatteryConfig::default();
        config.monitor.initial_count = 2;
        config.monitor.short_polling_time = 3;
        let (mut bat, _, _) = battery(config);

        assert_eq!(bat.next_poll_delay(), Some(Duration::from_secs(1)));
        assert_eq!(bat.next_poll_delay(), Some(Duration::from_secs(1)));
        assert_eq!(bat.next_poll_delay(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_long_polling_delay() {
        let mut config = BatteryConfig::default();
        config.monitor.initial_count = 0;
        config.monitor.long_polling_time = 0;
        let (mut bat, _, _) = battery(config);

        bat.set_long_polling(true);
        assert_eq!(bat.next_poll_delay(), Some(Duration::from_secs(3)));

        bat.config.monitor.long_polling_time = 600;
        assert_eq!(bat.next_poll_delay(), Some(Duration::from_secs(600)));

        bat.config.monitor.polling = PollingType::Timer;
        assert_eq!(bat.next_poll_delay(), None);
    }

    #[test]
    fn test_polling_gate() {
        let mut config = BatteryConfig::default();
        config.monitor.short_polling_time = 10;
        config.monitor.normal_polling_time = 30;
        let (mut bat, _, _) = battery(config);

        let opened: Vec<bool> = (0..8).map(|_| bat.polling_gate_open()).collect();
        assert_eq!(
            opened,
            vec![false, false, false, true, false, false, false, true]
        );

        bat.set_long_polling(true);
        assert!(bat.polling_gate_open());
    }
}
