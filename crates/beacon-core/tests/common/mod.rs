//! Test doubles and common utilities for behavior contract tests
//!
//! This module provides minimal test doubles that record what the service
//! asks of its collaborators without doing any real I/O.

#![allow(dead_code)]

use beacon_core::config::ServiceConfig;
use beacon_core::error::{Error, Result};
use beacon_core::traits::{
    DirectoryClient, DirectoryRequest, EventSource, HostInterfaces, InterfaceSnapshot, KernelEvent,
};
use beacon_core::{DiscoveryEvent, HardwareAddress};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub const ETH0_MAC: HardwareAddress = HardwareAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
pub const WLAN0_MAC: HardwareAddress = HardwareAddress::new([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);

pub const LO_INDEX: u32 = 1;
pub const ETH0_INDEX: u32 = 2;
pub const WLAN0_INDEX: u32 = 3;

/// How a request reached the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Through `send`, with the caller waiting for the outcome
    Awaited,
    /// Through `submit`, fire-and-forget
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub request: DirectoryRequest,
    pub delivery: Delivery,
}

/// A DirectoryClient that records every request
pub struct RecordingDirectory {
    calls: Arc<std::sync::Mutex<Vec<Call>>>,
    fail_sends: Arc<AtomicBool>,
}

impl RecordingDirectory {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(std::sync::Mutex::new(Vec::new())),
            fail_sends: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a new RecordingDirectory that shares its log with an existing one
    pub fn sharing_with(other: &Self) -> Self {
        Self {
            calls: Arc::clone(&other.calls),
            fail_sends: Arc::clone(&other.fail_sends),
        }
    }

    /// Make every awaited `send` fail with a transport error
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls for one wire action
    pub fn calls_for(&self, action: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.request.action() == action)
            .collect()
    }

    /// Recorded address calls (add_address / remove_address)
    pub fn address_calls(&self) -> Vec<DirectoryRequest> {
        self.calls()
            .into_iter()
            .map(|call| call.request)
            .filter(|request| {
                matches!(
                    request,
                    DirectoryRequest::AddAddress { .. } | DirectoryRequest::RemoveAddress { .. }
                )
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl DirectoryClient for RecordingDirectory {
    async fn send(&self, request: &DirectoryRequest) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::transport("connection refused"));
        }
        self.calls.lock().unwrap().push(Call {
            request: request.clone(),
            delivery: Delivery::Awaited,
        });
        Ok(())
    }

    fn submit(&self, request: DirectoryRequest) {
        self.calls.lock().unwrap().push(Call {
            request,
            delivery: Delivery::Submitted,
        });
    }

    fn client_name(&self) -> &'static str {
        "recording"
    }
}

/// A HostInterfaces with a fixed interface list
pub struct StaticHost {
    snapshots: Vec<InterfaceSnapshot>,
    names: HashMap<u32, String>,
    hostname: String,
    fail_enumeration: bool,
    enumerate_call_count: Arc<AtomicUsize>,
}

impl StaticHost {
    pub fn new(hostname: &str) -> Self {
        Self {
            snapshots: Vec::new(),
            names: HashMap::new(),
            hostname: hostname.to_string(),
            fail_enumeration: false,
            enumerate_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add an enumerated interface that is also resolvable by index
    pub fn with_interface(mut self, index: u32, snapshot: InterfaceSnapshot) -> Self {
        self.names.insert(index, snapshot.name.clone());
        self.snapshots.push(snapshot);
        self
    }

    /// Make an index resolvable without enumerating it
    pub fn with_name(mut self, index: u32, name: &str) -> Self {
        self.names.insert(index, name.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_enumeration = true;
        self
    }

    pub fn enumerate_call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.enumerate_call_count)
    }
}

impl HostInterfaces for StaticHost {
    fn enumerate(&self) -> Result<Vec<InterfaceSnapshot>> {
        self.enumerate_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_enumeration {
            return Err(Error::enumeration("getifaddrs failed"));
        }
        Ok(self.snapshots.clone())
    }

    fn interface_name(&self, index: u32) -> Option<String> {
        self.names.get(&index).cloned()
    }

    fn host_name(&self) -> String {
        self.hostname.clone()
    }
}

/// What the controlled source yields on its next read
#[derive(Debug, Clone)]
pub enum SourceInput {
    Batch(Vec<KernelEvent>),
    /// A zero-length read
    Eof,
    /// A failed read
    Fail,
}

/// An EventSource driven by the test through a channel
pub struct ControlledEventSource {
    rx: UnboundedReceiverStream<SourceInput>,
    read_count: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
}

/// Test-side handle of a ControlledEventSource
#[derive(Clone)]
pub struct SourceHandle {
    tx: mpsc::UnboundedSender<SourceInput>,
    read_count: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
}

impl ControlledEventSource {
    pub fn new() -> (Self, SourceHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let read_count = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicBool::new(false));

        let source = Self {
            rx: UnboundedReceiverStream::new(rx),
            read_count: Arc::clone(&read_count),
            dropped: Arc::clone(&dropped),
        };
        let handle = SourceHandle {
            tx,
            read_count,
            dropped,
        };

        (source, handle)
    }
}

impl SourceHandle {
    pub fn push(&self, input: SourceInput) {
        let _ = self.tx.send(input);
    }

    pub fn batch(&self, events: Vec<KernelEvent>) {
        self.push(SourceInput::Batch(events));
    }

    /// Number of reads that returned
    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    /// Whether the service has dropped (closed) the source
    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

impl Drop for ControlledEventSource {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl EventSource for ControlledEventSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<KernelEvent>>> {
        let input = self.rx.next().await;
        self.read_count.fetch_add(1, Ordering::SeqCst);

        match input {
            Some(SourceInput::Batch(events)) => Ok(Some(events)),
            Some(SourceInput::Eof) | None => Ok(None),
            Some(SourceInput::Fail) => Err(Error::Network(std::io::Error::other("recv failed"))),
        }
    }

    fn source_name(&self) -> &'static str {
        "controlled"
    }
}

/// The reference host: loopback plus one wired interface without an address
pub fn lo_and_eth0() -> StaticHost {
    StaticHost::new("livingroom")
        .with_interface(
            LO_INDEX,
            InterfaceSnapshot::new("lo")
                .loopback()
                .with_hw_address(HardwareAddress::new([0; 6]))
                .with_ipv4(std::net::Ipv4Addr::LOCALHOST),
        )
        .with_interface(ETH0_INDEX, InterfaceSnapshot::new("eth0").with_hw_address(ETH0_MAC))
}

/// Helper to create a minimal ServiceConfig for testing
pub fn minimal_config() -> ServiceConfig {
    ServiceConfig {
        event_channel_capacity: 100,
        receive_buffer_size: 4096,
    }
}

/// Wait for the next service event matching `pred`, skipping others
pub async fn wait_for_event<F>(rx: &mut mpsc::Receiver<DiscoveryEvent>, pred: F) -> DiscoveryEvent
where
    F: Fn(&DiscoveryEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Some(event) if pred(&event) => return event,
                Some(_) => continue,
                None => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("event should arrive within 5 seconds")
}
