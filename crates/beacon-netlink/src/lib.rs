// # Netlink Interface Watcher
//
// This crate provides the Linux side of the beacon agent:
//
// - `decoder`: turns a buffer of rtnetlink notifications into `KernelEvent`s
// - `NetlinkEventSource`: a non-blocking `NETLINK_ROUTE` socket subscribed to
//   link and IPv4 address groups, driven by tokio readiness
// - `SystemInterfaces`: interface enumeration, index-to-name resolution and
//   host name lookup
//
// ## Platform Support
//
// The decoder is pure Rust and builds everywhere. Opening the event source
// is only supported on Linux; elsewhere `open_event_source` returns a
// configuration error.

pub mod decoder;
pub mod system;

#[cfg(target_os = "linux")]
mod socket;

#[cfg(target_os = "linux")]
pub use socket::NetlinkEventSource;

pub use decoder::{EventDecoder, decode};
pub use system::SystemInterfaces;

use beacon_core::config::ServiceConfig;
use beacon_core::traits::EventSource;
use beacon_core::Result;

/// Open the kernel event source for this platform
#[cfg(target_os = "linux")]
pub fn open_event_source(config: &ServiceConfig) -> Result<Box<dyn EventSource>> {
    Ok(Box::new(NetlinkEventSource::open(config.receive_buffer_size)?))
}

/// Open the kernel event source for this platform
#[cfg(not(target_os = "linux"))]
pub fn open_event_source(_config: &ServiceConfig) -> Result<Box<dyn EventSource>> {
    Err(beacon_core::Error::config(
        "Netlink event source is only supported on Linux",
    ))
}
