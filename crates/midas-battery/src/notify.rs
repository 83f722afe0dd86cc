//! Change notifications

use serde::Serialize;

/// Supplies the monitor announces changes for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyKind {
    Battery,
    Usb,
    Ac,
}

impl SupplyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyKind::Battery => "battery",
            SupplyKind::Usb => "usb",
            SupplyKind::Ac => "ac",
        }
    }
}

/// Receives "properties of this supply changed" notifications
pub trait ChangeListener: Send + Sync {
    fn changed(&self, supply: SupplyKind);
}

/// Listener that drops every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl ChangeListener for NoopListener {
    fn changed(&self, _supply: SupplyKind) {}
}
