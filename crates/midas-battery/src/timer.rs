//! Charging safety timers

use midas_config::TimerSection;
use midas_hal::{Status, TICKS_PER_SEC};

use crate::info::{BatteryInfo, ChargingMode};

/// Ticks between `start` and `now` on a wrapping counter
pub fn elapsed(start: u32, now: u32) -> u32 {
    if now >= start {
        now - start
    } else {
        (u32::MAX - start) + now
    }
}

/// Seconds to ticks, saturating
pub fn secs_to_ticks(secs: u32) -> u32 {
    secs.saturating_mul(TICKS_PER_SEC)
}

/// What the timers ask the monitor to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Nothing due
    None,
    /// Normal charge ran past the total charging time
    ChargingExpired,
    /// Recharge ran past the total recharging time
    RechargingExpired,
    /// Re-issue charge-on to refresh the charger's own watchdog
    Refresh,
}

/// Update the elapsed charging time and decide what is due
pub fn check(info: &mut BatteryInfo, timers: &TimerSection, now: u32) -> TimerAction {
    let Some(start) = info.charging_start else {
        tracing::debug!("Charging disabled, no timer");
        return TimerAction::None;
    };

    info.charging_passed = elapsed(start, now);

    match info.status {
        Status::Full => {
            if info.charging_mode == ChargingMode::Recharging
                && info.charging_passed > secs_to_ticks(timers.recharging_total_time)
            {
                tracing::debug!("Recharging timer expired");
                return TimerAction::RechargingExpired;
            }
        }
        Status::Charging => {
            if info.charging_mode == ChargingMode::Normal
                && info.charging_passed > secs_to_ticks(timers.charging_total_time)
            {
                tracing::debug!("Charging timer expired");
                return TimerAction::ChargingExpired;
            }

            if timers.charging_reset_time > 0 && info.charging_passed > info.charging_next {
                info.charging_next = info
                    .charging_passed
                    .saturating_add(secs_to_ticks(timers.charging_reset_time));
                tracing::debug!("Reset charging current");
                return TimerAction::Refresh;
            }
        }
        other => {
            tracing::debug!("No timer for status {}", other.as_str());
            return TimerAction::None;
        }
    }

    tracing::info!(
        "Charging time: {} secs",
        info.charging_passed / TICKS_PER_SEC
    );
    TimerAction::None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charging(start: u32) -> BatteryInfo {
        let mut info = BatteryInfo::default();
        info.status = Status::Charging;
        info.charging_mode = ChargingMode::Normal;
        info.charging_start = Some(start);
        info
    }

    #[test]
    fn test_elapsed_without_wrap() {
        assert_eq!(elapsed(1000, 5000), 4000);
        assert_eq!(elapsed(7, 7), 0);
    }

    #[test]
    fn test_elapsed_across_wrap() {
        let start = u32::MAX - 100;
        assert_eq!(elapsed(start, 50), 150);
        assert_eq!(elapsed(start, 0), 100);
    }

    #[test]
    fn test_idle_without_start() {
        let mut info = BatteryInfo::default();
        assert_eq!(
            check(&mut info, &TimerSection::default(), 10),
            TimerAction::None
        );
    }

    #[test]
    fn test_charging_expiry_across_wrap() {
        let timers = TimerSection {
            charging_total_time: 60,
            recharging_total_time: 30,
            charging_reset_time: 0,
        };
        let start = u32::MAX - 10_000;
        let mut info = charging(start);

        assert_eq!(check(&mut info, &timers, 50_000), TimerAction::None);
        assert_eq!(info.charging_passed, 60_000);

        assert_eq!(
            check(&mut info, &timers, 50_001),
            TimerAction::ChargingExpired
        );
    }

    #[test]
    fn test_recharging_expiry() {
        let timers = TimerSection {
            charging_total_time: 600,
            recharging_total_time: 30,
            charging_reset_time: 0,
        };
        let mut info = charging(0);
        info.status = Status::Full;
        info.charging_mode = ChargingMode::Recharging;

        assert_eq!(check(&mut info, &timers, 30_000), TimerAction::None);
        assert_eq!(
            check(&mut info, &timers, 30_001),
            TimerAction::RechargingExpired
        );

        // full without recharge has no deadline
        info.charging_mode = ChargingMode::None;
        assert_eq!(check(&mut info, &timers, 90_000), TimerAction::None);
    }

    #[test]
    fn test_periodic_refresh() {
        let timers = TimerSection {
            charging_total_time: 3600,
            recharging_total_time: 600,
            charging_reset_time: 10,
        };
        let mut info = charging(0);
        info.charging_next = secs_to_ticks(10);

        assert_eq!(check(&mut info, &timers, 10_000), TimerAction::None);
        assert_eq!(check(&mut info, &timers, 10_500), TimerAction::Refresh);
        assert_eq!(info.charging_next, 20_500);
        assert_eq!(check(&mut info, &timers, 15_000), TimerAction::None);
    }

    #[test]
    fn test_other_status_is_ignored() {
        let mut info = charging(0);
        info.status = Status::NotCharging;
        assert_eq!(
            check(&mut info, &TimerSection::default(), u32::MAX),
            TimerAction::None
        );
    }
}
