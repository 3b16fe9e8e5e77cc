// # Event Source Trait
//
// Defines the capability "receive the next decoded batch of kernel events".
// The raw routing-notification parsing lives behind this trait so the
// orchestration in `DiscoveryService` is independent of the socket and the
// wire representation.
//
// ## Implementations
//
// - Netlink (Linux): `beacon-netlink` crate
// - Tests: channel-driven sources

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::state::HardwareAddress;

/// A typed link or address notification
///
/// Interface indices are resolved to names by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelEvent {
    /// An interface appeared or its link-level properties changed
    LinkUpdated {
        index: u32,
        hw_address: Option<HardwareAddress>,
    },

    /// An interface was removed
    LinkRemoved { index: u32 },

    /// An IPv4 address was assigned to an interface
    AddressAdded { index: u32, address: Ipv4Addr },

    /// An IPv4 address was removed from an interface
    AddressRemoved { index: u32 },
}

impl KernelEvent {
    /// Index of the interface this event refers to
    pub fn index(&self) -> u32 {
        match *self {
            KernelEvent::LinkUpdated { index, .. }
            | KernelEvent::LinkRemoved { index }
            | KernelEvent::AddressAdded { index, .. }
            | KernelEvent::AddressRemoved { index } => index,
        }
    }
}

/// Trait for kernel event sources
///
/// Each call waits for the source to become readable, performs exactly one
/// read and returns the events decoded from it, in delivery order.
#[async_trait]
pub trait EventSource: Send {
    /// Receive the next batch
    ///
    /// # Returns
    ///
    /// - `Ok(Some(events))`: One read worth of events (possibly empty)
    /// - `Ok(None)`: The read returned no bytes; the source is dead
    /// - `Err(Error)`: The read failed; the source should be treated as dead
    async fn next_batch(&mut self) -> Result<Option<Vec<KernelEvent>>, crate::Error>;

    /// Short name for logging
    fn source_name(&self) -> &'static str;
}
