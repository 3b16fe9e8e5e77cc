// # beacond - Beacon Daemon
//
// Thin integration layer: it reads settings, wires the HTTP directory
// client, the system interface lookups and the netlink event source into a
// `DiscoveryService`, and drives it until SIGTERM/SIGINT.
//
// ## Configuration
//
// See `settings.rs` for the full list. The most common variables:
//
// - `BEACON_CONFIG`: optional JSON configuration file
// - `BEACON_DEVICE_NAME`, `BEACON_PORT`: identity advertised to the directory
// - `BEACON_REGISTER`: register the device at startup (default: false)
// - `BEACON_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// SIGHUP re-reads the settings and registers or unregisters the device if
// `BEACON_REGISTER`, the name or the port changed.
//
// ## Example
//
// ```bash
// export BEACON_DEVICE_NAME=livingroom
// export BEACON_PORT=8080
// export BEACON_REGISTER=true
//
// beacond
// ```

mod settings;

use anyhow::Result;
use beacon_core::{DeviceConfig, DiscoveryEvent, DiscoveryService};
use beacon_directory_http::HttpDirectoryClient;
use beacon_netlink::SystemInterfaces;
use settings::Settings;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// How long the service may take to stop after the shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum BeaconExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<BeaconExitCode> for ExitCode {
    fn from(code: BeaconExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return BeaconExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return BeaconExitCode::ConfigError.into();
    }

    info!("Starting beacond daemon");
    info!(
        "Device '{}' on port {}, directory {}",
        settings.config.device.name, settings.config.device.port, settings.config.directory.url
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return BeaconExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let daemon = match Daemon::start(settings) {
            Ok(daemon) => daemon,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return BeaconExitCode::ConfigError;
            }
        };

        if let Err(e) = daemon.run().await {
            error!("Daemon error: {:#}", e);
            BeaconExitCode::RuntimeError
        } else {
            BeaconExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Running components of the daemon
struct Daemon {
    service: Arc<DiscoveryService>,
    service_task: JoinHandle<beacon_core::Result<()>>,
    event_logger: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
    device: DeviceConfig,
}

impl Daemon {
    /// Build the service and start watching interfaces
    ///
    /// Must run inside the runtime: the netlink socket registers with the
    /// reactor and the directory client spawns its submissions on it.
    fn start(settings: Settings) -> Result<Self> {
        let config = settings.config;

        let client = HttpDirectoryClient::new(&config.directory)?;
        let (service, events) = DiscoveryService::new(
            Box::new(client),
            Box::new(SystemInterfaces::new()),
            &config.service,
        )?;
        let service = Arc::new(service);

        let source = beacon_netlink::open_event_source(&config.service)?;

        let event_logger = tokio::spawn(log_events(events));

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let runner = Arc::clone(&service);
        let service_task =
            tokio::spawn(async move { runner.run_with_shutdown(source, Some(shutdown_rx)).await });

        Ok(Self {
            service,
            service_task,
            event_logger,
            shutdown_tx,
            device: config.device,
        })
    }

    async fn run(mut self) -> Result<()> {
        let mut signals = ShutdownSignals::new()?;

        apply_device(&self.service, None, &self.device).await;

        loop {
            match signals.next().await {
                DaemonSignal::Reload => match Settings::from_env() {
                    Ok(settings) => {
                        info!("Reloaded settings");
                        apply_device(&self.service, Some(&self.device), &settings.config.device)
                            .await;
                        self.device = settings.config.device;
                    }
                    Err(e) => warn!("Reload failed, keeping current settings: {:#}", e),
                },
                DaemonSignal::Shutdown(name) => {
                    info!("Received shutdown signal: {}", name);
                    break;
                }
            }
        }

        info!("Shutting down daemon");
        let _ = self.shutdown_tx.send(());

        let result = match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.service_task).await {
            Ok(Ok(result)) => result.map_err(anyhow::Error::from),
            Ok(Err(e)) => Err(anyhow::anyhow!("Service task failed: {}", e)),
            Err(_) => Err(anyhow::anyhow!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT)),
        };

        // The logger finishes once the last event sender (inside the service) is gone
        drop(self.service);
        if tokio::time::timeout(Duration::from_secs(1), self.event_logger)
            .await
            .is_err()
        {
            warn!("Event logger did not finish");
        }

        result
    }
}

/// Register, re-register or unregister according to a settings change
///
/// Failures are logged; the daemon keeps watching interfaces either way.
async fn apply_device(
    service: &DiscoveryService,
    previous: Option<&DeviceConfig>,
    next: &DeviceConfig,
) {
    if next.register {
        let changed = previous
            .is_none_or(|prev| !prev.register || prev.name != next.name || prev.port != next.port);
        // A failed earlier attempt is retried even when nothing changed
        if !changed && service.is_registered().await {
            return;
        }

        match service.register_device(&next.name, next.port).await {
            Ok(serial) => info!("Device registered with serial {}", serial),
            Err(e) => error!("Device registration failed: {}", e),
        }
    } else if previous.is_some_and(|prev| prev.register) {
        match service.unregister_device().await {
            Ok(()) => info!("Device unregistered"),
            Err(e) => warn!("Device unregistration failed: {}", e),
        }
    }
}

async fn log_events(events: mpsc::Receiver<DiscoveryEvent>) {
    let mut events = ReceiverStream::new(events);

    while let Some(event) = events.next().await {
        match event {
            DiscoveryEvent::DeviceRegistered { serial, at } => {
                info!("Directory accepted device {} at {}", serial, at.to_rfc3339());
            }
            DiscoveryEvent::DeviceUnregistered { serial } => {
                info!("Directory removal submitted for {}", serial);
            }
            DiscoveryEvent::AddressMirrored { interface, request } => {
                info!("Submitted {} for {}", request.action(), interface);
            }
            DiscoveryEvent::SourceClosed { reason } => {
                warn!("Interface monitoring stopped: {}", reason);
            }
            DiscoveryEvent::Stopped { reason } => {
                info!("Discovery service stopped: {}", reason);
            }
        }
    }
}

enum DaemonSignal {
    Reload,
    Shutdown(&'static str),
}

/// SIGTERM/SIGINT stop the daemon, SIGHUP reloads settings
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
    sighup: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())
                .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?,
            sigint: signal(SignalKind::interrupt())
                .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?,
            sighup: signal(SignalKind::hangup())
                .map_err(|e| anyhow::anyhow!("Failed to setup SIGHUP handler: {}", e))?,
        })
    }

    async fn next(&mut self) -> DaemonSignal {
        tokio::select! {
            _ = self.sigterm.recv() => DaemonSignal::Shutdown("SIGTERM"),
            _ = self.sigint.recv() => DaemonSignal::Shutdown("SIGINT"),
            _ = self.sighup.recv() => DaemonSignal::Reload,
        }
    }
}

/// Fallback for non-Unix platforms: Ctrl-C only
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn next(&mut self) -> DaemonSignal {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to wait for CTRL-C: {}", e);
        }
        DaemonSignal::Shutdown("SIGINT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::config::ServiceConfig;
    use beacon_core::traits::{DirectoryClient, DirectoryRequest, HostInterfaces, InterfaceSnapshot};
    use beacon_core::HardwareAddress;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Clone, Default)]
    struct Actions(Arc<Mutex<Vec<&'static str>>>, Arc<AtomicBool>);

    impl Actions {
        fn fail_sends(&self, fail: bool) {
            self.1.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl DirectoryClient for Actions {
        async fn send(&self, request: &DirectoryRequest) -> beacon_core::Result<()> {
            if self.1.load(Ordering::SeqCst) {
                return Err(beacon_core::Error::transport("directory unreachable"));
            }
            self.0.lock().unwrap().push(request.action());
            Ok(())
        }

        fn submit(&self, request: DirectoryRequest) {
            self.0.lock().unwrap().push(request.action());
        }

        fn client_name(&self) -> &'static str {
            "actions"
        }
    }

    struct OneInterface;

    impl HostInterfaces for OneInterface {
        fn enumerate(&self) -> beacon_core::Result<Vec<InterfaceSnapshot>> {
            Ok(vec![InterfaceSnapshot::new("eth0")
                .with_hw_address(HardwareAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]))])
        }

        fn interface_name(&self, _index: u32) -> Option<String> {
            None
        }

        fn host_name(&self) -> String {
            "test".to_string()
        }
    }

    fn service() -> (DiscoveryService, Actions) {
        let actions = Actions::default();
        let (service, _events) = DiscoveryService::new(
            Box::new(actions.clone()),
            Box::new(OneInterface),
            &ServiceConfig::default(),
        )
        .unwrap();
        (service, actions)
    }

    fn device(register: bool, port: u16) -> DeviceConfig {
        DeviceConfig {
            name: "player".to_string(),
            port,
            register,
        }
    }

    fn count(actions: &Actions, action: &str) -> usize {
        actions.0.lock().unwrap().iter().filter(|a| **a == action).count()
    }

    #[tokio::test]
    async fn test_startup_without_register_does_nothing() {
        let (service, actions) = service();
        apply_device(&service, None, &device(false, 8080)).await;

        assert!(actions.0.lock().unwrap().is_empty());
        assert!(!service.is_registered().await);
    }

    #[tokio::test]
    async fn test_reload_transitions() {
        let (service, actions) = service();

        apply_device(&service, None, &device(true, 8080)).await;
        assert!(service.is_registered().await);
        // awaited round-trip plus the fire-and-forget follow-up
        assert_eq!(count(&actions, "add_device"), 2);

        // Unchanged settings: nothing to do
        apply_device(&service, Some(&device(true, 8080)), &device(true, 8080)).await;
        assert_eq!(count(&actions, "add_device"), 2);

        // Port change re-registers
        apply_device(&service, Some(&device(true, 8080)), &device(true, 9090)).await;
        assert_eq!(count(&actions, "add_device"), 4);

        // Switching registration off withdraws the device
        apply_device(&service, Some(&device(true, 9090)), &device(false, 9090)).await;
        assert!(!service.is_registered().await);
        assert_eq!(count(&actions, "remove_device"), 1);
    }

    #[tokio::test]
    async fn test_reload_retries_failed_registration() {
        let (service, actions) = service();
        actions.fail_sends(true);

        apply_device(&service, None, &device(true, 8080)).await;
        assert!(!service.is_registered().await);

        // Directory is back; an unchanged reload registers
        actions.fail_sends(false);
        apply_device(&service, Some(&device(true, 8080)), &device(true, 8080)).await;
        assert!(service.is_registered().await);
        assert_eq!(count(&actions, "add_device"), 2);
    }
}
