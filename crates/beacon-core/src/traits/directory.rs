// # Directory Client Trait
//
// Defines the interface for talking to the remote directory service that
// records this device and its interface addresses.
//
// ## Implementations
//
// - HTTP: `beacon-directory-http` crate
//
// ## Usage
//
// ```rust,ignore
// use beacon_core::{DirectoryClient, DirectoryRequest};
//
// async fn announce(client: &dyn DirectoryClient, serial: HardwareAddress) -> beacon_core::Result<()> {
//     client.send(&DirectoryRequest::AddDevice {
//         serial,
//         name: "player".to_string(),
//         hostname: "livingroom".to_string(),
//         port: 8080,
//     }).await
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::state::HardwareAddress;

/// One directory operation
///
/// Each variant maps to a GET request whose query string starts with
/// `action=<name>` followed by the variant's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryRequest {
    /// Announce the device
    AddDevice {
        serial: HardwareAddress,
        name: String,
        hostname: String,
        port: u16,
    },

    /// Withdraw the device
    RemoveDevice { serial: HardwareAddress },

    /// Record the current IPv4 address of one interface
    AddAddress {
        serial: HardwareAddress,
        hw_address: HardwareAddress,
        address: Ipv4Addr,
    },

    /// Forget the address of one interface
    RemoveAddress {
        serial: HardwareAddress,
        hw_address: HardwareAddress,
    },
}

impl DirectoryRequest {
    /// Wire name of the action
    pub fn action(&self) -> &'static str {
        match self {
            DirectoryRequest::AddDevice { .. } => "add_device",
            DirectoryRequest::RemoveDevice { .. } => "remove_device",
            DirectoryRequest::AddAddress { .. } => "add_address",
            DirectoryRequest::RemoveAddress { .. } => "remove_address",
        }
    }

    /// Device serial the request is about
    pub fn serial(&self) -> HardwareAddress {
        match *self {
            DirectoryRequest::AddDevice { serial, .. }
            | DirectoryRequest::RemoveDevice { serial }
            | DirectoryRequest::AddAddress { serial, .. }
            | DirectoryRequest::RemoveAddress { serial, .. } => serial,
        }
    }

    /// Query parameters in wire order, `action` first
    ///
    /// Values are unescaped; the transport is responsible for encoding.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("action", self.action().to_string())];

        match self {
            DirectoryRequest::AddDevice {
                serial,
                name,
                hostname,
                port,
            } => {
                pairs.push(("serial", serial.to_string()));
                pairs.push(("name", name.clone()));
                pairs.push(("hostname", hostname.clone()));
                pairs.push(("port", port.to_string()));
            }
            DirectoryRequest::RemoveDevice { serial } => {
                pairs.push(("serial", serial.to_string()));
            }
            DirectoryRequest::AddAddress {
                serial,
                hw_address,
                address,
            } => {
                pairs.push(("serial", serial.to_string()));
                pairs.push(("hw_address", hw_address.to_string()));
                pairs.push(("address", address.to_string()));
            }
            DirectoryRequest::RemoveAddress { serial, hw_address } => {
                pairs.push(("serial", serial.to_string()));
                pairs.push(("hw_address", hw_address.to_string()));
            }
        }

        pairs
    }
}

/// Trait for directory service clients
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Delivery
///
/// Two delivery modes are offered:
///
/// - [`send`](DirectoryClient::send) performs the request and reports its
///   outcome. It is only used for the initial device announcement, whose
///   failure must reach the caller.
/// - [`submit`](DirectoryClient::submit) hands the request off and returns
///   immediately. It is called with the discovery state lock held and must
///   never block; the outcome is logged by the implementation, never
///   returned.
///
/// Implementations perform no retries. A failed submission is lost.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Perform one request and wait for the answer
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The directory answered with a success status
    /// - `Err(Error::Transport)`: Connect, timeout or other transport failure
    /// - `Err(Error::Rejected)`: The directory answered with an error status
    async fn send(&self, request: &DirectoryRequest) -> Result<(), crate::Error>;

    /// Fire-and-forget delivery; must not block the caller
    ///
    /// Submissions may reach the directory in a different order than they
    /// were made, so an `add_address` and a later `remove_address` for the
    /// same interface can arrive swapped.
    fn submit(&self, request: DirectoryRequest);

    /// Get the client name (for logging)
    fn client_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIAL: HardwareAddress = HardwareAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    const WLAN: HardwareAddress = HardwareAddress::new([0x02, 0, 0, 0, 0, 0x01]);

    #[test]
    fn test_add_device_query() {
        let request = DirectoryRequest::AddDevice {
            serial: SERIAL,
            name: "Living Room".to_string(),
            hostname: "melo".to_string(),
            port: 8080,
        };

        assert_eq!(
            request.query_pairs(),
            vec![
                ("action", "add_device".to_string()),
                ("serial", "aa:bb:cc:dd:ee:ff".to_string()),
                ("name", "Living Room".to_string()),
                ("hostname", "melo".to_string()),
                ("port", "8080".to_string()),
            ]
        );
    }

    #[test]
    fn test_address_queries() {
        let add = DirectoryRequest::AddAddress {
            serial: SERIAL,
            hw_address: WLAN,
            address: Ipv4Addr::new(10, 0, 0, 2),
        };
        assert_eq!(add.action(), "add_address");
        assert_eq!(
            add.query_pairs()[2..],
            [
                ("hw_address", "02:00:00:00:00:01".to_string()),
                ("address", "10.0.0.2".to_string()),
            ]
        );

        let remove = DirectoryRequest::RemoveAddress {
            serial: SERIAL,
            hw_address: WLAN,
        };
        assert_eq!(remove.query_pairs().len(), 3);
        assert_eq!(remove.serial(), SERIAL);
    }

    #[test]
    fn test_remove_device_query() {
        let request = DirectoryRequest::RemoveDevice { serial: SERIAL };
        assert_eq!(
            request.query_pairs(),
            vec![
                ("action", "remove_device".to_string()),
                ("serial", "aa:bb:cc:dd:ee:ff".to_string()),
            ]
        );
    }
}
