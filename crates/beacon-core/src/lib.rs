// # beacon-core
//
// Core library for the beacon device-discovery agent.
//
// The agent watches the host's network interfaces for link and address
// changes and mirrors that state to a remote directory service so that
// clients can locate the device.
//
// ## Architecture Overview
//
// - **HostInterfaces**: Trait for enumerating OS interfaces and resolving indices
// - **EventSource**: Trait yielding decoded kernel link/address events
// - **DirectoryClient**: Trait issuing requests to the directory service
// - **InterfaceTable**: In-memory record of known interfaces
// - **RegistrationController**: Registration lifecycle and mirroring decisions
// - **DiscoveryService**: Orchestrator owning the shared state lock
//
// ## Data Flow
//
// 1. Kernel emits a routing notification
// 2. The event source decodes it into `KernelEvent`s
// 3. The service locks `DiscoveryState` and folds each event into the table
// 4. If the device is registered, the controller submits an address update
// 5. The lock is released

pub mod traits;
pub mod state;
pub mod registration;
pub mod service;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{DirectoryClient, EventSource, HostInterfaces};
pub use traits::{DirectoryRequest, InterfaceSnapshot, KernelEvent};
pub use state::{DiscoveryState, HardwareAddress, Interface, InterfaceTable};
pub use registration::RegistrationController;
pub use service::{DiscoveryEvent, DiscoveryService};
pub use config::{BeaconConfig, DeviceConfig, DirectoryConfig, ServiceConfig};
pub use error::{Error, Result};
