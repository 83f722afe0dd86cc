//! Battery platform data
//!
//! Every board-specific knob of the battery monitor: which hardware answers
//! which question, thresholds, polling intervals and debounce counts. The
//! defaults are the midas board's values.

use midas_hal::{CableType, Technology};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Battery identity and companion supply names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatterySection {
    /// Battery type string reported through `batt_type`
    pub vendor: String,
    pub technology: Technology,
    /// PMIC supply name, used for presence and OVP/UVLO checks
    pub pmic_name: String,
    pub fuelgauge_name: String,
    pub charger_name: String,
}

impl Default for BatterySection {
    fn default() -> Self {
        Self {
            vendor: "SDI SDI".to_string(),
            technology: Technology::LiIon,
            pmic_name: "max77686-pmic".to_string(),
            fuelgauge_name: "sec-fuelgauge".to_string(),
            charger_name: "sec-charger".to_string(),
        }
    }
}

/// Which converter serves an ADC channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdcType {
    /// Channel not in use
    #[default]
    None,
    /// ADC in the application processor
    Ap,
    /// External ADC IC
    Ic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdcChannel {
    pub channel: u32,
    pub kind: AdcType,
}

/// ADC sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcSection {
    /// Raw reads per sample; the lowest and highest are dropped
    pub check_count: u32,
    /// Full-scale raw value
    pub max_value: u32,
    pub channels: Vec<AdcChannel>,
}

impl Default for AdcSection {
    fn default() -> Self {
        Self {
            check_count: 7,
            max_value: 4095,
            channels: Vec::new(),
        }
    }
}

impl AdcSection {
    /// Converter assigned to a channel
    pub fn kind_of(&self, channel: u32) -> AdcType {
        self.channels
            .iter()
            .find(|c| c.channel == channel)
            .map(|c| c.kind)
            .unwrap_or_default()
    }
}

/// Events that trigger a cable re-check; any combination may be enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CableCheck {
    /// Cable reported through `set_property(Online)`
    pub psy: bool,
    /// Cable interrupt line
    pub interrupt: bool,
    /// Re-detected on every monitor cycle
    pub polling: bool,
}

impl Default for CableCheck {
    fn default() -> Self {
        Self {
            psy: true,
            interrupt: false,
            polling: false,
        }
    }
}

/// How the attached cable is identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CableSource {
    /// Given by whoever reports the cable
    #[default]
    External,
    /// Board hook (MUIC, USB switch)
    Callback,
    /// Voltage on a dedicated ADC channel
    Adc,
}

/// Voltage window `[min, max)` in mV identifying a cable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CableWindow {
    pub min: u32,
    pub max: u32,
    pub cable: CableType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CableSection {
    pub check: CableCheck,
    pub source: CableSource,
    pub adc_channel: u32,
    /// Voltage at full-scale ADC reading (mV)
    pub max_voltage: u32,
    pub windows: Vec<CableWindow>,
}

impl Default for CableSection {
    fn default() -> Self {
        Self {
            check: CableCheck::default(),
            source: CableSource::External,
            adc_channel: 0,
            max_voltage: 3300,
            windows: Vec::new(),
        }
    }
}

/// Activity events selecting the event temperature thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSection {
    pub enabled: bool,
    /// Seconds an event stays active after being cleared
    pub waiting_time: u32,
}

impl Default for EventSection {
    fn default() -> Self {
        Self {
            enabled: true,
            waiting_time: 600,
        }
    }
}

/// How the next monitor run is triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollingType {
    /// Delay measured from the end of the previous run
    Workqueue,
    /// Wake-capable deadline measured from the previous poll instant
    #[default]
    Alarm,
    /// Driven externally; no re-arm
    Timer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    pub polling: PollingType,
    /// Seconds between runs; voltage and presence are checked every run
    pub short_polling_time: u32,
    /// Seconds between full policy passes
    pub normal_polling_time: u32,
    /// Seconds between runs in low consumption state (0: unused)
    pub long_polling_time: u32,
    /// Runs at a 1 s interval after start
    pub initial_count: u32,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            polling: PollingType::Alarm,
            short_polling_time: 3,
            normal_polling_time: 30,
            long_polling_time: 300,
            initial_count: 3,
        }
    }
}

/// Battery presence check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryCheck {
    #[default]
    None,
    Adc,
    Callback,
    Pmic,
    FuelGauge,
    Charger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceSection {
    pub check: BatteryCheck,
    /// Failed checks tolerated before the battery is declared missing
    pub check_count: u32,
    pub adc_channel: u32,
    /// Exclusive bounds of a valid battery-ID reading
    pub adc_min: i32,
    pub adc_max: i32,
}

impl Default for PresenceSection {
    fn default() -> Self {
        Self {
            check: BatteryCheck::None,
            check_count: 3,
            adc_channel: 0,
            adc_min: 0,
            adc_max: 0,
        }
    }
}

/// Over-voltage / under-voltage detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OvpUvloCheck {
    Callback,
    PmicPolling,
    PmicInterrupt,
    #[default]
    ChargerPolling,
    ChargerInterrupt,
}

impl OvpUvloCheck {
    /// Whether the condition is pushed rather than polled
    pub fn is_interrupt(&self) -> bool {
        matches!(
            self,
            OvpUvloCheck::PmicInterrupt | OvpUvloCheck::ChargerInterrupt
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OvpUvloSection {
    pub check: OvpUvloCheck,
}

/// Where battery temperature comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermalSource {
    #[default]
    FuelGauge,
    Callback,
    Adc,
}

/// Unit the temperature thresholds are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempCheck {
    /// Raw thermistor ADC value
    Adc,
    /// Temperature in 0.1 °C
    #[default]
    Temp,
}

/// One point of a thermistor ADC-to-temperature table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdcTempPoint {
    pub adc: i32,
    /// 0.1 °C
    pub temperature: i32,
}

/// Threshold quadruple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempThresholds {
    pub high_threshold: i32,
    pub high_recovery: i32,
    pub low_recovery: i32,
    pub low_threshold: i32,
}

impl TempThresholds {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.high_threshold < self.high_recovery
            || self.high_recovery < self.low_recovery
            || self.low_recovery < self.low_threshold
        {
            return Err(ConfigError::Invalid(format!(
                "{} temperature thresholds out of order: {:?}",
                name, self
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalSection {
    pub source: ThermalSource,
    pub adc_channel: u32,
    /// Sorted by ascending ADC value
    pub adc_table: Vec<AdcTempPoint>,
    pub ambient_adc_channel: u32,
    pub ambient_adc_table: Vec<AdcTempPoint>,
    pub check: TempCheck,
    /// Consecutive samples before health changes
    pub check_count: u32,
    /// Thresholds while an activity event is active
    pub event: TempThresholds,
    pub normal: TempThresholds,
    /// Thresholds while charging with the device powered off
    pub lpm: TempThresholds,
}

impl Default for ThermalSection {
    fn default() -> Self {
        Self {
            source: ThermalSource::FuelGauge,
            adc_channel: 0,
            adc_table: Vec::new(),
            ambient_adc_channel: 0,
            ambient_adc_table: Vec::new(),
            check: TempCheck::Temp,
            check_count: 2,
            event: TempThresholds {
                high_threshold: 600,
                high_recovery: 400,
                low_recovery: 0,
                low_threshold: -50,
            },
            normal: TempThresholds {
                high_threshold: 500,
                high_recovery: 400,
                low_recovery: 0,
                low_threshold: -50,
            },
            lpm: TempThresholds {
                high_threshold: 450,
                high_recovery: 400,
                low_recovery: 0,
                low_threshold: -50,
            },
        }
    }
}

/// Full-charge detection method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullCheckType {
    /// Charging current sensed on an ADC channel
    Adc,
    /// ADC with a second, tighter top-off stage
    AdcDual,
    /// Fuel gauge average current
    #[default]
    FgCurrent,
    /// Fuel gauge current with a second top-off stage
    FgCurrentDual,
    /// Charger "done" GPIO
    ChargerGpio,
    /// Charger interrupt reporting full
    ChargerInterrupt,
    /// Charger supply STATUS property
    ChargerPsy,
}

impl FullCheckType {
    pub fn is_dual(&self) -> bool {
        matches!(self, FullCheckType::AdcDual | FullCheckType::FgCurrentDual)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FullCheckSection {
    #[serde(rename = "type")]
    pub kind: FullCheckType,
    /// Qualifying samples must exceed this before full is reported
    pub count: u32,
    pub adc_channel: u32,
    pub adc_1st: i32,
    pub adc_2nd: i32,
    /// Termination current (mA) for the first stage
    pub current_1st: i32,
    /// Termination current (mA) for the second stage
    pub current_2nd: i32,
    pub gpio: u32,
    /// Level of the done line when charging finished
    pub gpio_active_high: bool,
    /// Minimum capacity (%) before full is considered
    pub condition_soc: Option<u32>,
    /// Minimum average voltage (mV) before full is considered
    pub condition_avg_vcell: Option<u32>,
}

impl Default for FullCheckSection {
    fn default() -> Self {
        Self {
            kind: FullCheckType::FgCurrent,
            count: 3,
            adc_channel: 0,
            adc_1st: 0,
            adc_2nd: 0,
            current_1st: 200,
            current_2nd: 100,
            gpio: 0,
            gpio_active_high: true,
            condition_soc: Some(95),
            condition_avg_vcell: Some(4150),
        }
    }
}

/// Conditions restarting charge after full; any satisfied one triggers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RechargeSection {
    /// Capacity (%) at or below which charging restarts
    pub soc: Option<u32>,
    /// Average voltage (mV) at or below which charging restarts
    pub avg_vcell: Option<u32>,
    /// Instant voltage (mV) at or below which charging restarts
    pub vcell: Option<u32>,
}

impl Default for RechargeSection {
    fn default() -> Self {
        Self {
            soc: None,
            avg_vcell: Some(4150),
            vcell: Some(4100),
        }
    }
}

/// Charging safety timers, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSection {
    pub charging_total_time: u32,
    pub recharging_total_time: u32,
    /// Re-issue charge-on at this interval to refresh the charger watchdog (0: unused)
    pub charging_reset_time: u32,
}

impl Default for TimerSection {
    fn default() -> Self {
        Self {
            charging_total_time: 6 * 60 * 60,
            recharging_total_time: 90 * 60,
            charging_reset_time: 0,
        }
    }
}

/// Capacity post-processing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelGaugeSection {
    /// Rescale the raw capacity between `capacity_min` and `capacity_max`
    pub scale: bool,
    /// Let the reported capacity move by at most 1 % per run
    pub atomic: bool,
    /// Raw capacity (0.1 %) reported as 100 %
    pub capacity_max: u32,
    /// Raw capacity (0.1 %) reported as 0 %
    pub capacity_min: u32,
}

impl Default for FuelGaugeSection {
    fn default() -> Self {
        Self {
            scale: false,
            atomic: false,
            capacity_max: 1000,
            capacity_min: 0,
        }
    }
}

/// Complete battery platform data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatteryConfig {
    #[serde(default)]
    pub battery: BatterySection,

    #[serde(default)]
    pub adc: AdcSection,

    #[serde(default)]
    pub cable: CableSection,

    #[serde(default)]
    pub event: EventSection,

    #[serde(default)]
    pub monitor: MonitorSection,

    #[serde(default)]
    pub presence: PresenceSection,

    #[serde(default)]
    pub ovp_uvlo: OvpUvloSection,

    #[serde(default)]
    pub thermal: ThermalSection,

    #[serde(default)]
    pub full_check: FullCheckSection,

    #[serde(default)]
    pub recharge: RechargeSection,

    #[serde(default)]
    pub timer: TimerSection,

    #[serde(default)]
    pub fuel_gauge: FuelGaugeSection,
}

impl BatteryConfig {
    /// Reject platform data the monitor cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.short_polling_time == 0 || self.monitor.normal_polling_time == 0 {
            return Err(ConfigError::Invalid(
                "polling times must be non-zero".to_string(),
            ));
        }

        if self.adc.check_count < 3 {
            return Err(ConfigError::Invalid(format!(
                "adc.check_count must be at least 3, got {}",
                self.adc.check_count
            )));
        }

        if self.adc.max_value == 0 {
            return Err(ConfigError::Invalid("adc.max_value must be non-zero".to_string()));
        }

        if self.thermal.check_count == 0 {
            return Err(ConfigError::Invalid(
                "thermal.check_count must be non-zero".to_string(),
            ));
        }

        self.validate_cable_windows()?;

        self.thermal.event.validate("event")?;
        self.thermal.normal.validate("normal")?;
        self.thermal.lpm.validate("lpm")?;

        validate_table("thermal.adc_table", &self.thermal.adc_table)?;
        validate_table("thermal.ambient_adc_table", &self.thermal.ambient_adc_table)?;
        if self.thermal.source == ThermalSource::Adc && self.thermal.adc_table.is_empty() {
            return Err(ConfigError::Invalid(
                "ADC thermal source requires thermal.adc_table".to_string(),
            ));
        }

        if self.fuel_gauge.scale && self.fuel_gauge.capacity_max <= self.fuel_gauge.capacity_min {
            return Err(ConfigError::Invalid(
                "fuel_gauge.capacity_max must exceed capacity_min".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_cable_windows(&self) -> Result<(), ConfigError> {
        if self.cable.source == CableSource::Adc && self.cable.windows.is_empty() {
            return Err(ConfigError::Invalid(
                "ADC cable source requires cable.windows".to_string(),
            ));
        }

        let mut windows = self.cable.windows.clone();
        windows.sort_by_key(|w| w.min);

        for w in &windows {
            if w.min >= w.max {
                return Err(ConfigError::Invalid(format!(
                    "empty cable window [{}, {}) for {:?}",
                    w.min, w.max, w.cable
                )));
            }
        }

        for pair in windows.windows(2) {
            if pair[0].max > pair[1].min {
                return Err(ConfigError::Invalid(format!(
                    "cable windows for {:?} and {:?} overlap",
                    pair[0].cable, pair[1].cable
                )));
            }
        }

        Ok(())
    }
}

fn validate_table(name: &str, table: &[AdcTempPoint]) -> Result<(), ConfigError> {
    if table.windows(2).any(|pair| pair[0].adc >= pair[1].adc) {
        return Err(ConfigError::Invalid(format!(
            "{} must be sorted by ascending adc",
            name
        )));
    }
    Ok(())
}
