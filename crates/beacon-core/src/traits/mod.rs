//! Core traits for the beacon agent
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DirectoryClient`]: Issue requests to the remote directory service
//! - [`HostInterfaces`]: Enumerate OS interfaces and resolve interface indices
//! - [`EventSource`]: Receive decoded kernel link/address events

pub mod directory;
pub mod host;
pub mod event_source;

pub use directory::{DirectoryClient, DirectoryRequest};
pub use host::{HostInterfaces, InterfaceSnapshot};
pub use event_source::{EventSource, KernelEvent};
