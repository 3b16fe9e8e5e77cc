//! Discovery service
//!
//! The DiscoveryService is responsible for:
//! - Owning the single lock around [`DiscoveryState`]
//! - Registering and unregistering the device with the directory
//! - Folding kernel event batches into the interface table
//! - Mirroring address changes while registered
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ EventSource │─── Vec<KernelEvent> ───┐
//! └─────────────┘                        │
//!                                        ▼
//!                              ┌──────────────────┐
//!   register_device() ───────▶ │ DiscoveryService │
//!   unregister_device() ─────▶ └──────────────────┘
//!                                        │
//!         ┌──────────────────────────────┼──────────────────────────┐
//!         │                              │                          │
//!         ▼                              ▼                          ▼
//! ┌────────────────┐          ┌──────────────────────┐       ┌─────────────┐
//! │ HostInterfaces │          │ RegistrationController│──────▶│   Events    │
//! │ (names, enum)  │          │ (DirectoryClient)    │       │  (notify)   │
//! └────────────────┘          └──────────────────────┘       └─────────────┘
//! ```
//!
//! ## Locking
//!
//! Every read or write of the state happens with the lock held. The only
//! awaited network call, the `add_device` round-trip in
//! [`DiscoveryService::register_device`], is made with the lock released.
//! Everything else sent to the directory goes through the non-blocking
//! [`DirectoryClient::submit`](crate::DirectoryClient::submit).

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::registration::{self, RegistrationController};
use crate::state::{DiscoveryState, HardwareAddress, Interface};
use crate::traits::{DirectoryClient, DirectoryRequest, EventSource, HostInterfaces, KernelEvent};
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

/// Events emitted by the DiscoveryService
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// The directory accepted the device
    DeviceRegistered {
        serial: HardwareAddress,
        at: DateTime<Utc>,
    },

    /// The device was withdrawn from the directory
    DeviceUnregistered { serial: HardwareAddress },

    /// An interface's address state was submitted to the directory
    AddressMirrored {
        interface: String,
        request: DirectoryRequest,
    },

    /// The kernel event source stopped delivering
    SourceClosed { reason: String },

    /// Service stopped
    Stopped { reason: String },
}

/// Device discovery orchestrator
///
/// ## Lifecycle
///
/// 1. Create with [`DiscoveryService::new()`]
/// 2. Drive kernel events with [`DiscoveryService::run()`]
/// 3. Call [`register_device`](DiscoveryService::register_device) /
///    [`unregister_device`](DiscoveryService::unregister_device) from any task
/// 4. The event source is closed when `run` returns
///
/// ## Threading
///
/// All methods take `&self`; share the service behind an `Arc` to call
/// registration while `run` is in progress.
pub struct DiscoveryService {
    /// Registration flag, serial and interface table
    state: Mutex<DiscoveryState>,

    /// Mirroring decisions and the directory client
    controller: RegistrationController,

    /// OS lookups
    host: Box<dyn HostInterfaces>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<DiscoveryEvent>,
}

impl DiscoveryService {
    /// Create a new discovery service
    ///
    /// # Returns
    ///
    /// A tuple of (service, event_receiver) where event_receiver yields service events
    pub fn new(
        client: Box<dyn DirectoryClient>,
        host: Box<dyn HostInterfaces>,
        config: &ServiceConfig,
    ) -> Result<(Self, mpsc::Receiver<DiscoveryEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let service = Self {
            state: Mutex::new(DiscoveryState::new()),
            controller: RegistrationController::new(client),
            host,
            event_tx: tx,
        };

        Ok((service, rx))
    }

    /// Register the device with the directory
    ///
    /// Enumerates interfaces, derives the serial on first use, and awaits the
    /// `add_device` round-trip. On success the device is marked registered,
    /// the table is reconciled with the enumeration and every interface with
    /// a known hardware address is mirrored.
    ///
    /// # Errors
    ///
    /// - `Error::Enumeration`: the OS enumeration failed
    /// - `Error::NoHardwareIdentity`: no serial could be derived
    /// - Transport errors from the `add_device` request
    ///
    /// The state is left untouched on every error path.
    pub async fn register_device(&self, name: &str, port: u16) -> Result<HardwareAddress> {
        let snapshots = self.host.enumerate().map_err(|e| match e {
            Error::Enumeration(_) => e,
            other => Error::enumeration(other.to_string()),
        })?;

        let known = self.state.lock().await.serial();
        let serial = known
            .or_else(|| registration::derive_serial(&snapshots))
            .ok_or(Error::NoHardwareIdentity)?;

        let request = DirectoryRequest::AddDevice {
            serial,
            name: name.to_string(),
            hostname: self.host.host_name(),
            port,
        };

        let client = self.controller.client();
        client.send(&request).await?;

        let (serial, at, mirrored) = {
            let mut state = self.state.lock().await;
            let serial = state.establish_serial(serial);
            let at = state.mark_registered();
            client.submit(request);

            registration::reconcile(&mut state.interfaces, &snapshots);
            let mirrored = self.controller.sweep(&state);
            (serial, at, mirrored)
        };

        info!(
            "Registered device {} as {} on port {} ({} interfaces mirrored)",
            name,
            serial,
            port,
            mirrored.len()
        );
        self.emit_event(DiscoveryEvent::DeviceRegistered { serial, at });
        for (interface, request) in mirrored {
            self.emit_event(DiscoveryEvent::AddressMirrored { interface, request });
        }

        Ok(serial)
    }

    /// Withdraw the device from the directory
    ///
    /// Fails with `Error::NotDiscovered` if no serial was ever established.
    pub async fn unregister_device(&self) -> Result<()> {
        let serial = {
            let mut state = self.state.lock().await;
            self.controller.unregister(&mut state)?
        };

        info!("Unregistered device {}", serial);
        self.emit_event(DiscoveryEvent::DeviceUnregistered { serial });
        Ok(())
    }

    /// Fold one decoded batch into the table under a single lock
    pub async fn apply_events(&self, events: Vec<KernelEvent>) {
        let mut mirrored = Vec::new();

        {
            let mut state = self.state.lock().await;

            for event in events {
                let Some(name) = self.host.interface_name(event.index()) else {
                    debug!(
                        "Interface index {} not resolvable, skipping {:?}",
                        event.index(),
                        event
                    );
                    continue;
                };

                match event {
                    KernelEvent::LinkUpdated {
                        hw_address: Some(hw_address),
                        ..
                    } => {
                        debug!("Link {} has hardware address {}", name, hw_address);
                        state.interfaces.set_hardware_address(&name, hw_address);
                    }
                    KernelEvent::LinkUpdated { hw_address: None, .. } => {
                        debug!("Link {} updated without hardware address", name);
                        state.interfaces.get_or_create(&name);
                    }
                    KernelEvent::LinkRemoved { .. } => {
                        debug!("Link {} removed, keeping its record", name);
                    }
                    KernelEvent::AddressAdded { address, .. } => {
                        debug!("Address {} added on {}", address, name);
                        state.interfaces.set_ip_address(&name, address);
                        if let Some(request) = self.controller.mirror(&state, &name) {
                            mirrored.push((name, request));
                        }
                    }
                    KernelEvent::AddressRemoved { .. } => {
                        debug!("Address removed on {}", name);
                        state.interfaces.clear_ip_address(&name);
                        if let Some(request) = self.controller.mirror(&state, &name) {
                            mirrored.push((name, request));
                        }
                    }
                }
            }
        }

        for (interface, request) in mirrored {
            self.emit_event(DiscoveryEvent::AddressMirrored { interface, request });
        }
    }

    /// Run the service until Ctrl-C
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error
    pub async fn run(&self, source: Box<dyn EventSource>) -> Result<()> {
        self.run_internal(source, None).await
    }

    /// Run the service with a controlled shutdown signal
    ///
    /// The daemon uses this to stop on SIGTERM as well as SIGINT; tests use it
    /// for deterministic shutdown. A dropped sender counts as a shutdown
    /// request.
    pub async fn run_with_shutdown(
        &self,
        source: Box<dyn EventSource>,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(source, shutdown_rx).await
    }

    async fn run_internal(
        &self,
        mut source: Box<dyn EventSource>,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        info!("Watching interfaces via {}", source.source_name());
        let mut source_alive = true;

        loop {
            tokio::select! {
                batch = source.next_batch(), if source_alive => {
                    match batch {
                        Ok(Some(events)) => {
                            debug!("Received {} kernel events", events.len());
                            self.apply_events(events).await;
                        }
                        Ok(None) => {
                            source_alive = false;
                            self.source_closed("Event source returned no data".to_string());
                        }
                        Err(e) => {
                            source_alive = false;
                            self.source_closed(format!("Event source read failed: {}", e));
                        }
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        drop(source);
        self.emit_event(DiscoveryEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        info!("Event source closed, service stopped");

        Ok(())
    }

    fn source_closed(&self, reason: String) {
        warn!("{}; no further interface changes will be observed", reason);
        self.emit_event(DiscoveryEvent::SourceClosed { reason });
    }

    /// Whether the last registration succeeded and was not withdrawn
    pub async fn is_registered(&self) -> bool {
        self.state.lock().await.is_registered()
    }

    /// Device serial, once established
    pub async fn serial(&self) -> Option<HardwareAddress> {
        self.state.lock().await.serial()
    }

    /// Snapshot of the interface table, sorted by name
    pub async fn interfaces(&self) -> Vec<Interface> {
        let state = self.state.lock().await;
        let mut interfaces: Vec<Interface> = state.interfaces.iter().cloned().collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        interfaces
    }

    /// Emit a service event
    fn emit_event(&self, event: DiscoveryEvent) {
        // Send event, logging warning if channel is full (backpressure)
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, discarding event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_event_clone() {
        let event = DiscoveryEvent::DeviceUnregistered {
            serial: HardwareAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]),
        };

        assert_eq!(event.clone(), event);
    }
}
