// # Host Interfaces Trait
//
// Defines the OS-facing lookups the agent needs but does not own:
// enumerating interfaces with their addresses, resolving a kernel interface
// index to a name, and reading the host name.
//
// ## Implementations
//
// - Linux: `beacon-netlink` crate (`SystemInterfaces`)
// - Tests: static tables

use std::net::Ipv4Addr;

use crate::state::HardwareAddress;

/// One interface as reported by the OS enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSnapshot {
    /// Interface name
    pub name: String,
    /// Whether the interface is a loopback device
    pub loopback: bool,
    /// Link-layer address, if the interface has one
    pub hw_address: Option<HardwareAddress>,
    /// First IPv4 address bound to the interface
    pub ipv4: Option<Ipv4Addr>,
}

impl InterfaceSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loopback: false,
            hw_address: None,
            ipv4: None,
        }
    }

    pub fn loopback(mut self) -> Self {
        self.loopback = true;
        self
    }

    pub fn with_hw_address(mut self, hw_address: HardwareAddress) -> Self {
        self.hw_address = Some(hw_address);
        self
    }

    pub fn with_ipv4(mut self, address: Ipv4Addr) -> Self {
        self.ipv4 = Some(address);
        self
    }
}

/// Trait for host interface lookups
///
/// Implementations must be thread-safe; `interface_name` is called with the
/// discovery state lock held and should return promptly.
pub trait HostInterfaces: Send + Sync {
    /// Enumerate current interfaces and addresses, in OS order
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<InterfaceSnapshot>)`: One entry per interface
    /// - `Err(Error::Enumeration)`: If the OS call failed
    fn enumerate(&self) -> Result<Vec<InterfaceSnapshot>, crate::Error>;

    /// Resolve a kernel interface index to its name
    fn interface_name(&self, index: u32) -> Option<String>;

    /// Host name reported to the directory
    fn host_name(&self) -> String;
}
