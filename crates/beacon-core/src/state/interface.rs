// # Interface Table
//
// In-memory record of locally known network interfaces, keyed by the
// OS-assigned interface name.
//
// ## Lifecycle
//
// - Entries are created on first reference (link event, address event, or
//   startup enumeration)
// - Entries are mutated in place as new events arrive
// - Entries are never removed; a link removal is observed but not acted upon

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::Error;

/// A 6-byte link-layer (MAC) address
///
/// Renders as lowercase colon-separated hex, e.g. `aa:bb:cc:dd:ee:ff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HardwareAddress([u8; 6]);

impl HardwareAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Build from a raw attribute payload; anything but 6 bytes is rejected
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let octets: [u8; 6] = bytes.try_into().ok()?;
        Some(Self(octets))
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// All-zero addresses are what loopback and some virtual links report
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for HardwareAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');

        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| Error::invalid_input(format!("Hardware address too short: {}", s)))?;
            if part.len() != 2 {
                return Err(Error::invalid_input(format!("Malformed hardware address: {}", s)));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| Error::invalid_input(format!("Malformed hardware address: {}", s)))?;
        }

        if parts.next().is_some() {
            return Err(Error::invalid_input(format!("Hardware address too long: {}", s)));
        }

        Ok(Self(octets))
    }
}

/// One local network interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    /// OS-assigned interface name (table key)
    pub name: String,
    /// Link-layer address, once known
    pub hw_address: Option<HardwareAddress>,
    /// Current IPv4 address, if any
    pub address: Option<Ipv4Addr>,
}

impl Interface {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            hw_address: None,
            address: None,
        }
    }
}

/// Mapping from interface name to its record
///
/// Never fails and never deletes: every mutator creates the record when it
/// does not exist yet and returns it so the caller can chain a mirroring
/// decision.
#[derive(Debug, Clone, Default)]
pub struct InterfaceTable {
    entries: HashMap<String, Interface>,
}

impl InterfaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the record for `name`, inserting an empty one if needed
    pub fn get_or_create(&mut self, name: &str) -> &mut Interface {
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| Interface::new(name))
    }

    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.entries.get(name)
    }

    pub fn set_hardware_address(&mut self, name: &str, hw_address: HardwareAddress) -> &Interface {
        let iface = self.get_or_create(name);
        iface.hw_address = Some(hw_address);
        iface
    }

    pub fn set_ip_address(&mut self, name: &str, address: Ipv4Addr) -> &Interface {
        let iface = self.get_or_create(name);
        iface.address = Some(address);
        iface
    }

    pub fn clear_ip_address(&mut self, name: &str) -> &Interface {
        let iface = self.get_or_create(name);
        iface.address = None;
        iface
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
