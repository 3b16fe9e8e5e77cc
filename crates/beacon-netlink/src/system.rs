//! Host interface lookups backed by the operating system
//!
//! Enumeration goes through `network-interface`; index resolution and the
//! host name use libc directly on Linux.

use std::net::Ipv4Addr;

use beacon_core::traits::{HostInterfaces, InterfaceSnapshot};
use beacon_core::{Error, HardwareAddress, Result};
use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};
use tracing::debug;

/// [`HostInterfaces`] for the running host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl SystemInterfaces {
    pub fn new() -> Self {
        Self
    }
}

impl HostInterfaces for SystemInterfaces {
    fn enumerate(&self) -> Result<Vec<InterfaceSnapshot>> {
        let mut interfaces =
            NetworkInterface::show().map_err(|e| Error::enumeration(e.to_string()))?;

        // Kernel index order, so the first usable interface is stable across runs
        interfaces.sort_by_key(|iface| iface.index);

        let snapshots: Vec<InterfaceSnapshot> = interfaces.into_iter().map(snapshot).collect();
        debug!("Enumerated {} interfaces", snapshots.len());
        Ok(snapshots)
    }

    fn interface_name(&self, index: u32) -> Option<String> {
        index_to_name(index)
    }

    fn host_name(&self) -> String {
        host_name().unwrap_or_else(|| "localhost".to_string())
    }
}

fn snapshot(iface: NetworkInterface) -> InterfaceSnapshot {
    let hw_address = iface
        .mac_addr
        .as_deref()
        .and_then(|mac| mac.parse::<HardwareAddress>().ok());
    let ipv4 = iface.addr.iter().find_map(|addr| match addr {
        Addr::V4(v4) => Some(v4.ip),
        Addr::V6(_) => None,
    });

    InterfaceSnapshot {
        loopback: is_loopback(&iface.name, hw_address, ipv4),
        name: iface.name,
        hw_address,
        ipv4,
    }
}

fn is_loopback(name: &str, hw_address: Option<HardwareAddress>, ipv4: Option<Ipv4Addr>) -> bool {
    name == "lo"
        || ipv4.is_some_and(|ip| ip.is_loopback())
        || (hw_address.is_some_and(|hw| hw.is_zero()) && name.starts_with("lo"))
}

#[cfg(target_os = "linux")]
fn index_to_name(index: u32) -> Option<String> {
    let mut buf = [0 as libc::c_char; libc::IF_NAMESIZE];

    // SAFETY: buf holds IF_NAMESIZE bytes, the size if_indextoname writes at most.
    let ptr = unsafe { libc::if_indextoname(index, buf.as_mut_ptr()) };
    if ptr.is_null() {
        return None;
    }

    // SAFETY: on success the buffer contains a NUL-terminated name.
    let name = unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) };
    Some(name.to_string_lossy().into_owned())
}

#[cfg(not(target_os = "linux"))]
fn index_to_name(index: u32) -> Option<String> {
    NetworkInterface::show()
        .ok()?
        .into_iter()
        .find(|iface| iface.index == index)
        .map(|iface| iface.name)
}

#[cfg(target_os = "linux")]
fn host_name() -> Option<String> {
    let mut buf = [0u8; 256];

    // SAFETY: the length passed matches the buffer size.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }

    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(&buf[..end]).into_owned();
    (!name.is_empty()).then_some(name)
}

#[cfg(not(target_os = "linux"))]
fn host_name() -> Option<String> {
    std::env::var("HOSTNAME").ok().filter(|name| !name.is_empty())
}
