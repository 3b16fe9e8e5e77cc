// # Discovery State
//
// The process-wide state of the agent, owned by `DiscoveryService` behind a
// single exclusive lock.

use chrono::{DateTime, Utc};

use super::{HardwareAddress, InterfaceTable};

/// Registration state and interface table
#[derive(Debug, Default)]
pub struct DiscoveryState {
    /// Stable device identifier, set once and never changed afterwards
    serial: Option<HardwareAddress>,

    /// Whether the last device registration round-trip succeeded
    registered: bool,

    /// When the device was last registered
    registered_at: Option<DateTime<Utc>>,

    /// Locally known interfaces
    pub interfaces: InterfaceTable,
}

impl DiscoveryState {
    /// Create an empty, unregistered state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serial(&self) -> Option<HardwareAddress> {
        self.serial
    }

    /// Set the serial if none is set yet, returning the effective serial
    pub fn establish_serial(&mut self, candidate: HardwareAddress) -> HardwareAddress {
        *self.serial.get_or_insert(candidate)
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn registered_at(&self) -> Option<DateTime<Utc>> {
        self.registered_at
    }

    /// Flip to registered, stamping the time
    pub fn mark_registered(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.registered = true;
        self.registered_at = Some(now);
        now
    }

    pub fn mark_unregistered(&mut self) {
        self.registered = false;
        self.registered_at = None;
    }
}
