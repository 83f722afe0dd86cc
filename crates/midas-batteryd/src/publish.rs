//! Change publishing
//!
//! Supply change notifications and battery state go out on a broadcast
//! channel; `watch` clients on the control socket receive them as JSON lines.

use midas_battery::{ChangeListener, Snapshot, SupplyKind};
use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Changed { supply: SupplyKind },
    State(Snapshot),
}

impl Notice {
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to encode notice: {}", e);
            String::from("{}")
        })
    }
}

#[derive(Clone)]
pub struct Publisher {
    tx: broadcast::Sender<Notice>,
}

impl Publisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish the state after a monitor run
    pub fn state(&self, snapshot: Snapshot) {
        // no subscribers is fine
        let _ = self.tx.send(Notice::State(snapshot));
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeListener for Publisher {
    fn changed(&self, supply: SupplyKind) {
        tracing::debug!("{} changed", supply.as_str());
        let _ = self.tx.send(Notice::Changed { supply });
    }
}
