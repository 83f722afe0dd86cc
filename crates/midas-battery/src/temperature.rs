//! Temperature policy
//!
//! Picks the active threshold set and classifies the battery temperature with
//! count-based hysteresis. Health only changes after `check_count`
//! consecutive samples agree.

use midas_config::{AdcTempPoint, TempThresholds, ThermalSection};
use midas_hal::Health;

use crate::info::BatteryInfo;

/// Which threshold set is in force
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdSet {
    Event,
    Lpm,
    Normal,
}

impl ThresholdSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdSet::Event => "event",
            ThresholdSet::Lpm => "lpm",
            ThresholdSet::Normal => "normal",
        }
    }
}

/// Event thresholds win over LPM, LPM over normal
pub fn select(
    thermal: &ThermalSection,
    event_active: bool,
    lpm: bool,
) -> (ThresholdSet, TempThresholds) {
    if event_active {
        (ThresholdSet::Event, thermal.event)
    } else if lpm {
        (ThresholdSet::Lpm, thermal.lpm)
    } else {
        (ThresholdSet::Normal, thermal.normal)
    }
}

/// Temperature for a thermistor reading
///
/// The table is sorted by ascending ADC value. Readings between two points
/// are interpolated; readings outside the table clamp to its ends.
pub fn adc_to_temperature(table: &[AdcTempPoint], adc: i32) -> Option<i32> {
    let first = table.first()?;
    let last = table.last()?;

    if adc <= first.adc {
        return Some(first.temperature);
    }
    if adc >= last.adc {
        return Some(last.temperature);
    }

    match table.binary_search_by_key(&adc, |p| p.adc) {
        Ok(i) => Some(table[i].temperature),
        Err(i) => {
            let (lo, hi) = (table[i - 1], table[i]);
            let span = (hi.adc - lo.adc) as i64;
            let offset = (adc - lo.adc) as i64;
            let delta = (hi.temperature - lo.temperature) as i64;
            Some(lo.temperature + (delta * offset / span) as i32)
        }
    }
}

/// Feed one sample through the hysteresis counters and return the new health
///
/// Counters only grow on consecutive samples in the same band; a sample in
/// another band, or in the gap between threshold and recovery, restarts
/// them. Counters reset when health changes.
pub fn classify(info: &mut BatteryInfo, value: i32, th: &TempThresholds, count: u32) -> Health {
    let unsafe_health = matches!(info.health, Health::Overheat | Health::Cold);

    if value >= th.high_threshold {
        info.temp_low_cnt = 0;
        info.temp_recover_cnt = 0;
        if info.health != Health::Overheat && info.temp_high_cnt < count {
            info.temp_high_cnt += 1;
            tracing::debug!("high count = {}", info.temp_high_cnt);
        }
    } else if value <= th.high_recovery && value >= th.low_recovery {
        info.temp_high_cnt = 0;
        info.temp_low_cnt = 0;
        if unsafe_health {
            if info.temp_recover_cnt < count {
                info.temp_recover_cnt += 1;
            }
            tracing::debug!("recovery count = {}", info.temp_recover_cnt);
        } else {
            info.temp_recover_cnt = 0;
        }
    } else if value <= th.low_threshold {
        info.temp_high_cnt = 0;
        info.temp_recover_cnt = 0;
        if info.health != Health::Cold && info.temp_low_cnt < count {
            info.temp_low_cnt += 1;
            tracing::debug!("low count = {}", info.temp_low_cnt);
        }
    } else {
        info.reset_temp_counters();
    }

    let health = if info.temp_high_cnt >= count {
        Health::Overheat
    } else if info.temp_low_cnt >= count {
        Health::Cold
    } else if info.temp_recover_cnt >= count {
        Health::Good
    } else {
        info.health
    };

    if health != info.health {
        tracing::info!(
            "Temperature health {} -> {}",
            info.health.as_str(),
            health.as_str()
        );
        info.reset_temp_counters();
        info.health = health;
    }

    health
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> TempThresholds {
        TempThresholds {
            high_threshold: 500,
            high_recovery: 400,
            low_recovery: 0,
            low_threshold: -50,
        }
    }

    #[test]
    fn test_select_priority() {
        let thermal = ThermalSection::default();
        assert_eq!(select(&thermal, true, true).0, ThresholdSet::Event);
        assert_eq!(select(&thermal, false, true).0, ThresholdSet::Lpm);
        assert_eq!(select(&thermal, false, false).0, ThresholdSet::Normal);
        assert_eq!(select(&thermal, false, true).1, thermal.lpm);
    }

    #[test]
    fn test_overheat_after_n_samples() {
        let mut info = BatteryInfo::default();
        let th = thresholds();

        assert_eq!(classify(&mut info, 520, &th, 3), Health::Good);
        assert_eq!(classify(&mut info, 520, &th, 3), Health::Good);
        assert_eq!(classify(&mut info, 520, &th, 3), Health::Overheat);
    }

    #[test]
    fn test_overheat_holds_for_n_minus_one_recovery_samples() {
        let mut info = BatteryInfo::default();
        let th = thresholds();
        let n = 4;

        for _ in 0..n {
            classify(&mut info, 600, &th, n);
        }
        assert_eq!(info.health, Health::Overheat);

        for _ in 0..n - 1 {
            assert_eq!(classify(&mut info, 300, &th, n), Health::Overheat);
        }
        assert_eq!(classify(&mut info, 300, &th, n), Health::Good);
    }

    #[test]
    fn test_gap_sample_restarts_recovery() {
        let mut info = BatteryInfo::default();
        let th = thresholds();

        for _ in 0..2 {
            classify(&mut info, 600, &th, 2);
        }
        assert_eq!(info.health, Health::Overheat);

        classify(&mut info, 300, &th, 2);
        // between high recovery and high threshold
        classify(&mut info, 450, &th, 2);
        assert_eq!(info.temp_recover_cnt, 0);
        assert_eq!(classify(&mut info, 300, &th, 2), Health::Overheat);
        assert_eq!(classify(&mut info, 300, &th, 2), Health::Good);
    }

    #[test]
    fn test_interrupted_high_run_does_not_trip() {
        let mut info = BatteryInfo::default();
        let th = thresholds();

        classify(&mut info, 520, &th, 2);
        classify(&mut info, 250, &th, 2);
        assert_eq!(classify(&mut info, 520, &th, 2), Health::Good);
        assert_eq!(classify(&mut info, 520, &th, 2), Health::Overheat);
    }

    #[test]
    fn test_cold_and_recovery() {
        let mut info = BatteryInfo::default();
        let th = thresholds();

        classify(&mut info, -60, &th, 2);
        assert_eq!(classify(&mut info, -50, &th, 2), Health::Cold);
        classify(&mut info, 10, &th, 2);
        assert_eq!(classify(&mut info, 10, &th, 2), Health::Good);
    }

    #[test]
    fn test_normal_range_leaves_non_thermal_health() {
        let mut info = BatteryInfo::default();
        info.health = Health::OverVoltage;
        assert_eq!(
            classify(&mut info, 250, &thresholds(), 2),
            Health::OverVoltage
        );
    }

    #[test]
    fn test_adc_table_lookup() {
        let table = [
            AdcTempPoint {
                adc: 100,
                temperature: 600,
            },
            AdcTempPoint {
                adc: 200,
                temperature: 400,
            },
            AdcTempPoint {
                adc: 400,
                temperature: 0,
            },
        ];

        assert_eq!(adc_to_temperature(&table, 200), Some(400));
        assert_eq!(adc_to_temperature(&table, 300), Some(200));
        assert_eq!(adc_to_temperature(&table, 150), Some(500));
        assert_eq!(adc_to_temperature(&table, 50), Some(600));
        assert_eq!(adc_to_temperature(&table, 900), Some(0));
        assert_eq!(adc_to_temperature(&[], 100), None);
    }
}
