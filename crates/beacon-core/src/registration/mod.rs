//! Registration controller
//!
//! Decides which directory requests an interface change produces and derives
//! the device serial. The controller holds no state of its own; every method
//! operates on a [`DiscoveryState`] borrowed from the caller, who is expected
//! to hold the state lock for the duration of the call.
//!
//! ## Mirroring rule
//!
//! | registered | hw address | ip address | request          |
//! |------------|------------|------------|------------------|
//! | no         | any        | any        | none             |
//! | yes        | unknown    | any        | none             |
//! | yes        | known      | set        | `AddAddress`     |
//! | yes        | known      | unset      | `RemoveAddress`  |

use crate::state::{DiscoveryState, HardwareAddress, InterfaceTable};
use crate::traits::{DirectoryClient, DirectoryRequest, InterfaceSnapshot};
use tracing::debug;

/// Pick the serial from an enumeration: first non-loopback, non-zero
/// hardware address in OS order
pub fn derive_serial(snapshots: &[InterfaceSnapshot]) -> Option<HardwareAddress> {
    snapshots
        .iter()
        .filter(|snapshot| !snapshot.loopback)
        .filter_map(|snapshot| snapshot.hw_address)
        .find(|hw_address| !hw_address.is_zero())
}

/// Fold an enumeration into the table, skipping loopback
///
/// Only present values are written; nothing is cleared.
pub fn reconcile(table: &mut InterfaceTable, snapshots: &[InterfaceSnapshot]) {
    for snapshot in snapshots.iter().filter(|snapshot| !snapshot.loopback) {
        let iface = table.get_or_create(&snapshot.name);
        if let Some(hw_address) = snapshot.hw_address {
            iface.hw_address = Some(hw_address);
        }
        if let Some(address) = snapshot.ipv4 {
            iface.address = Some(address);
        }
    }
}

/// Registration lifecycle and mirroring decisions
pub struct RegistrationController {
    client: Box<dyn DirectoryClient>,
}

impl RegistrationController {
    pub fn new(client: Box<dyn DirectoryClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &dyn DirectoryClient {
        self.client.as_ref()
    }

    /// Submit the request mirroring one interface's current address
    ///
    /// Returns the submitted request, or `None` when the mirroring rule
    /// produces nothing.
    pub fn mirror(&self, state: &DiscoveryState, name: &str) -> Option<DirectoryRequest> {
        if !state.is_registered() {
            return None;
        }
        let serial = state.serial()?;
        let iface = state.interfaces.get(name)?;
        let Some(hw_address) = iface.hw_address else {
            debug!("Interface {} has no hardware address yet, not mirroring", name);
            return None;
        };

        let request = match iface.address {
            Some(address) => DirectoryRequest::AddAddress {
                serial,
                hw_address,
                address,
            },
            None => DirectoryRequest::RemoveAddress { serial, hw_address },
        };

        debug!("Mirroring {} for {} via {}", request.action(), name, self.client.client_name());
        self.client.submit(request.clone());
        Some(request)
    }

    /// Mirror every interface with a known hardware address
    ///
    /// Interfaces are visited in name order so the submission sequence is
    /// stable across runs.
    pub fn sweep(&self, state: &DiscoveryState) -> Vec<(String, DirectoryRequest)> {
        let mut names: Vec<&str> = state
            .interfaces
            .iter()
            .filter(|iface| iface.hw_address.is_some())
            .map(|iface| iface.name.as_str())
            .collect();
        names.sort_unstable();

        names
            .into_iter()
            .filter_map(|name| {
                self.mirror(state, name)
                    .map(|request| (name.to_string(), request))
            })
            .collect()
    }

    /// Flip to unregistered and submit the device removal
    ///
    /// Returns the serial the removal was keyed by.
    pub fn unregister(&self, state: &mut DiscoveryState) -> crate::Result<HardwareAddress> {
        let serial = state.serial().ok_or(crate::Error::NotDiscovered)?;
        state.mark_unregistered();
        self.client.submit(DirectoryRequest::RemoveDevice { serial });
        Ok(serial)
    }
}
