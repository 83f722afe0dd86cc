//! Input voltage protection and recharge conditions

use midas_config::{OvpUvloCheck, RechargeSection};
use midas_hal::{Health, Property, Status};

use crate::board::Board;
use crate::info::{BatteryInfo, ChargingMode};
use crate::supply::{Role, Supplies};

/// Check the charger input for over-/under-voltage
///
/// Returns `false` when the input is abnormal. Polled supplies copy their
/// non-Good health into `info`. Interrupt-driven checks never fail here.
pub fn ovp_uvlo_ok(
    check: OvpUvloCheck,
    info: &mut BatteryInfo,
    supplies: &Supplies,
    board: &dyn Board,
) -> bool {
    let role = match check {
        OvpUvloCheck::Callback => return board.ovp_uvlo_check(),
        OvpUvloCheck::PmicInterrupt | OvpUvloCheck::ChargerInterrupt => return true,
        OvpUvloCheck::PmicPolling => Role::Pmic,
        OvpUvloCheck::ChargerPolling => Role::Charger,
    };

    let raw = match supplies.get(role, Property::Health) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("OVP/UVLO check skipped: {}", e);
            return true;
        }
    };

    match Health::from_raw(raw) {
        Some(Health::Good) => true,
        Some(health) => {
            info.health = health;
            false
        }
        None => {
            tracing::warn!("{} reported unknown health {}", supplies.name(role), raw);
            true
        }
    }
}

/// Which condition asked for a recharge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RechargeReason {
    Soc,
    AvgVcell,
    Vcell,
}

/// Recharge is due once full, idle, and any configured floor is reached
pub fn recharge_reason(recharge: &RechargeSection, info: &BatteryInfo) -> Option<RechargeReason> {
    if info.status != Status::Full || info.charging_mode != ChargingMode::None {
        return None;
    }

    if recharge
        .soc
        .is_some_and(|soc| info.capacity <= soc as i32)
    {
        return Some(RechargeReason::Soc);
    }

    if recharge
        .avg_vcell
        .is_some_and(|mv| info.voltage_avg <= mv as i32)
    {
        return Some(RechargeReason::AvgVcell);
    }

    if recharge
        .vcell
        .is_some_and(|mv| info.voltage_now <= mv as i32)
    {
        return Some(RechargeReason::Vcell);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::StaticBoard;
    use midas_config::BatterySection;
    use midas_hal::PowerSupplyRegistry;
    use midas_hal::mock::MockPowerSupply;
    use std::sync::Arc;

    fn supplies(charger: &MockPowerSupply) -> Supplies {
        let mut registry = PowerSupplyRegistry::new();
        registry.register(Arc::new(charger.clone()));
        Supplies::new(registry, &BatterySection::default())
    }

    #[test]
    fn test_charger_polling_copies_health() {
        let charger = MockPowerSupply::new("sec-charger");
        charger.set(Property::Health, Health::OverVoltage.to_raw());
        let supplies = supplies(&charger);
        let mut info = BatteryInfo::default();

        assert!(!ovp_uvlo_ok(
            OvpUvloCheck::ChargerPolling,
            &mut info,
            &supplies,
            &StaticBoard::new()
        ));
        assert_eq!(info.health, Health::OverVoltage);

        charger.set(Property::Health, Health::Good.to_raw());
        assert!(ovp_uvlo_ok(
            OvpUvloCheck::ChargerPolling,
            &mut info,
            &supplies,
            &StaticBoard::new()
        ));
    }

    #[test]
    fn test_interrupt_and_callback() {
        let charger = MockPowerSupply::new("sec-charger");
        let supplies = supplies(&charger);
        let board = StaticBoard::new();
        let mut info = BatteryInfo::default();

        assert!(ovp_uvlo_ok(
            OvpUvloCheck::ChargerInterrupt,
            &mut info,
            &supplies,
            &board
        ));

        board.update(|s| s.ovp_uvlo_ok = false);
        assert!(!ovp_uvlo_ok(
            OvpUvloCheck::Callback,
            &mut info,
            &supplies,
            &board
        ));
        assert_eq!(info.health, Health::Good);
    }

    #[test]
    fn test_recharge_conditions() {
        let recharge = RechargeSection {
            soc: Some(95),
            avg_vcell: Some(4150),
            vcell: None,
        };
        let mut info = BatteryInfo::default();
        info.status = Status::Full;
        info.capacity = 100;
        info.voltage_avg = 4200;
        info.voltage_now = 3000;
        assert_eq!(recharge_reason(&recharge, &info), None);

        info.voltage_avg = 4150;
        assert_eq!(
            recharge_reason(&recharge, &info),
            Some(RechargeReason::AvgVcell)
        );

        info.capacity = 90;
        assert_eq!(recharge_reason(&recharge, &info), Some(RechargeReason::Soc));

        info.charging_mode = ChargingMode::SecondStage;
        assert_eq!(recharge_reason(&recharge, &info), None);
    }
}
