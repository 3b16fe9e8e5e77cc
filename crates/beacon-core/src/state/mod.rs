// # Discovery State
//
// This module holds the mutable state shared between the kernel event
// loop and callers of register/unregister: the interface table and the
// registration flag. Every access happens under the service lock.

pub mod discovery;
pub mod interface;

pub use discovery::DiscoveryState;
pub use interface::{HardwareAddress, Interface, InterfaceTable};
