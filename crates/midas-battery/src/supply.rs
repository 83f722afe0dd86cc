//! Companion power supplies
//!
//! The monitor talks to three supplies by role: the charger, the fuel gauge
//! and the PMIC. Their names come from the platform data.

use midas_config::BatterySection;
use midas_hal::{PowerSupply, PowerSupplyRegistry, Property};
use std::sync::Arc;

use crate::{BatteryError, Result};

/// What a companion supply is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Charger,
    FuelGauge,
    Pmic,
}

/// Supplies looked up by role
#[derive(Clone)]
pub struct Supplies {
    registry: PowerSupplyRegistry,
    charger: String,
    fuel_gauge: String,
    pmic: String,
}

impl Supplies {
    pub fn new(registry: PowerSupplyRegistry, names: &BatterySection) -> Self {
        Self {
            registry,
            charger: names.charger_name.clone(),
            fuel_gauge: names.fuelgauge_name.clone(),
            pmic: names.pmic_name.clone(),
        }
    }

    pub fn name(&self, role: Role) -> &str {
        match role {
            Role::Charger => &self.charger,
            Role::FuelGauge => &self.fuel_gauge,
            Role::Pmic => &self.pmic,
        }
    }

    pub fn supply(&self, role: Role) -> Result<Arc<dyn PowerSupply>> {
        let name = self.name(role);
        self.registry
            .get(name)
            .ok_or_else(|| BatteryError::SupplyMissing(name.to_string()))
    }

    pub fn get(&self, role: Role, prop: Property) -> Result<i32> {
        Ok(self.supply(role)?.get_property(prop)?)
    }

    pub fn set(&self, role: Role, prop: Property, value: i32) -> Result<()> {
        self.supply(role)?
            .set_property(prop, value)
            .map_err(BatteryError::from)
            .inspect_err(|e| tracing::error!("{}: {}", self.name(role), e))
    }
}
