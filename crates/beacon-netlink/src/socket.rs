// Netlink route socket subscribed to link and IPv4 address notifications.
//
// The socket is non-blocking and registered with the tokio reactor through
// `AsyncFd`; each `next_batch` waits for readiness and performs exactly one
// `recv`. Dropping the source deregisters and closes the socket.

use async_trait::async_trait;
use beacon_core::traits::{EventSource, KernelEvent};
use beacon_core::{Error, Result};
use netlink_sys::protocols::NETLINK_ROUTE;
use netlink_sys::{Socket, SocketAddr};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tracing::{debug, trace};

use crate::decoder::decode;

const RTMGRP_LINK: u32 = 0x1;
const RTMGRP_IPV4_IFADDR: u32 = 0x10;

/// Kernel event source backed by a `NETLINK_ROUTE` socket
pub struct NetlinkEventSource {
    socket: AsyncFd<Socket>,
    buf: Vec<u8>,
}

impl NetlinkEventSource {
    /// Open, bind and register the socket
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(receive_buffer_size: usize) -> Result<Self> {
        let mut socket = Socket::new(NETLINK_ROUTE)?;
        socket.bind(&SocketAddr::new(0, RTMGRP_LINK | RTMGRP_IPV4_IFADDR))?;
        socket.set_non_blocking(true)?;

        let socket = AsyncFd::with_interest(socket, Interest::READABLE)
            .map_err(|e| Error::config(format!("Failed to register netlink socket: {}", e)))?;

        debug!(
            "Netlink socket bound to link and IPv4 address groups ({} byte reads)",
            receive_buffer_size
        );

        Ok(Self {
            socket,
            buf: Vec::with_capacity(receive_buffer_size),
        })
    }
}

#[async_trait]
impl EventSource for NetlinkEventSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<KernelEvent>>> {
        loop {
            let mut guard = self.socket.readable().await?;

            self.buf.clear();
            let buf = &mut self.buf;
            match guard.try_io(|inner| inner.get_ref().recv(buf, 0)) {
                Ok(Ok(0)) => return Ok(None),
                Ok(Ok(read)) => {
                    trace!("Read {} bytes from netlink socket", read);
                    return Ok(Some(decode(&self.buf[..read]).collect()));
                }
                Ok(Err(e)) => return Err(Error::Network(e)),
                Err(_would_block) => continue,
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "netlink"
    }
}
