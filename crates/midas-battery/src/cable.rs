//! Cable detection

use midas_config::{BatteryConfig, CableCheck, CableSource, CableWindow};
use midas_hal::CableType;

use crate::adc::{ADC_SAMPLE_COUNT, AdcSampler};
use crate::board::Board;
use crate::{BatteryError, Result};

/// Convert a raw cable-ID reading to mV
pub fn adc_to_millivolts(adc: i32, max_voltage: u32, adc_max_value: u32) -> u32 {
    if adc <= 0 || adc_max_value == 0 {
        return 0;
    }
    let mv = adc as u64 * max_voltage as u64 / adc_max_value as u64;
    u32::try_from(mv).unwrap_or(u32::MAX)
}

/// Cable whose `[min, max)` window contains `mv`; `Battery` when none does
pub fn lookup(windows: &[CableWindow], mv: u32) -> CableType {
    windows
        .iter()
        .find(|w| mv >= w.min && mv < w.max)
        .map(|w| w.cable)
        .unwrap_or_else(|| {
            tracing::warn!("No cable window for {} mV, assuming battery", mv);
            CableType::Battery
        })
}

/// Identifies the attached power source
#[derive(Debug, Clone)]
pub struct CableDetector {
    source: CableSource,
    check: CableCheck,
    channel: u32,
    max_voltage: u32,
    adc_max_value: u32,
    windows: Vec<CableWindow>,
}

impl CableDetector {
    pub fn new(config: &BatteryConfig) -> Self {
        Self {
            source: config.cable.source,
            check: config.cable.check,
            channel: config.cable.adc_channel,
            max_voltage: config.cable.max_voltage,
            adc_max_value: config.adc.max_value,
            windows: config.cable.windows.clone(),
        }
    }

    pub fn source(&self) -> CableSource {
        self.source
    }

    /// Whether the cable is re-detected on every monitor run
    pub fn polls(&self) -> bool {
        self.check.polling
    }

    /// Whether the cable interrupt line triggers detection
    pub fn uses_interrupt(&self) -> bool {
        self.check.interrupt
    }

    /// Detect the cable; `None` when the cable is only ever reported externally
    pub fn detect(&self, adc: &AdcSampler, board: &dyn Board) -> Result<Option<CableType>> {
        match self.source {
            CableSource::External => {
                tracing::debug!("Cable type is defined externally");
                Ok(None)
            }
            CableSource::Callback => Ok(Some(board.check_cable_status())),
            CableSource::Adc => self.detect_by_adc(adc, board).map(Some),
        }
    }

    fn detect_by_adc(&self, adc: &AdcSampler, board: &dyn Board) -> Result<CableType> {
        board.cable_switch_check();

        let mut last = Err(BatteryError::AdcUnassigned(self.channel));
        for _ in 0..ADC_SAMPLE_COUNT {
            last = adc.read_smoothed(self.channel);
        }

        board.cable_switch_normal();

        let mv = adc_to_millivolts(last?, self.max_voltage, self.adc_max_value);
        let cable = lookup(&self.windows, mv);
        tracing::debug!("Cable {} at {} mV", cable.as_str(), mv);
        Ok(cable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::StaticBoard;
    use midas_config::{AdcChannel, AdcType};
    use midas_hal::mock::MockAdc;
    use std::sync::Arc;

    fn windows() -> Vec<CableWindow> {
        vec![
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
        ]
    }

    #[test]
    fn test_shared_boundary_maps_to_upper_window() {
        let windows = windows();
        assert_eq!(lookup(&windows, 1199), CableType::Usb);
        assert_eq!(lookup(&windows, 1200), CableType::Mains);
        assert_eq!(lookup(&windows, 500), CableType::Usb);
    }

    #[test]
    fn test_outside_windows_is_battery() {
        let windows = windows();
        assert_eq!(lookup(&windows, 499), CableType::Battery);
        assert_eq!(lookup(&windows, 2000), CableType::Battery);
        assert_eq!(lookup(&[], 1000), CableType::Battery);
    }

    #[test]
    fn test_millivolt_conversion() {
        assert_eq!(adc_to_millivolts(4095, 3300, 4095), 3300);
        assert_eq!(adc_to_millivolts(2048, 3300, 4096), 1650);
        assert_eq!(adc_to_millivolts(-1, 3300, 4095), 0);
    }

    #[test]
    fn test_millivolt_conversion_saturates() {
        // above u32::MAX before narrowing
        let mv = adc_to_millivolts(8000, u32::MAX, 2);
        assert_eq!(mv, u32::MAX);
        assert_eq!(adc_to_millivolts(i32::MAX, u32::MAX, 1), u32::MAX);
    }

    #[test]
    fn test_detect_by_adc_switches_mux() {
        let mut config = BatteryConfig::default();
        config.adc.channels = vec![AdcChannel {
            channel: 1,
            kind: AdcType::Ap,
        }];
        config.cable.source = CableSource::Adc;
        config.cable.adc_channel = 1;
        config.cable.windows = windows();

        let adc = MockAdc::new();
        // 1500 mV on a 3300 mV / 4095 scale
        adc.set_fallback(1, 1861);
        let sampler = AdcSampler::new(&config.adc).with_backend(AdcType::Ap, Arc::new(adc));
        let board = StaticBoard::new();

        let detector = CableDetector::new(&config);
        assert_eq!(
            detector.detect(&sampler, &board).unwrap(),
            Some(CableType::Mains)
        );

        let state = board.snapshot();
        assert_eq!(state.switch_checks, 1);
        assert_eq!(state.switch_normals, 1);
    }

    #[test]
    fn test_detect_external_and_callback() {
        let mut config = BatteryConfig::default();
        let sampler = AdcSampler::new(&config.adc);
        let board = StaticBoard::new();
        board.update(|s| s.cable = CableType::Usb);

        let detector = CableDetector::new(&config);
        assert_eq!(detector.detect(&sampler, &board).unwrap(), None);

        config.cable.source = CableSource::Callback;
        let detector = CableDetector::new(&config);
        assert_eq!(
            detector.detect(&sampler, &board).unwrap(),
            Some(CableType::Usb)
        );
    }
}
