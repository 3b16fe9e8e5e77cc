//! Kernel event decoder
//!
//! Walks a buffer of `nlmsghdr`-framed rtnetlink messages and yields one
//! [`KernelEvent`] per recognized message, lazily and in buffer order.
//!
//! Decoding is best effort: a truncated or malformed frame header ends the
//! sequence, a frame whose payload fails to parse is skipped, and
//! `NLMSG_DONE` / `NLMSG_ERROR` terminate the walk. No error ever surfaces.

use std::net::Ipv4Addr;

use beacon_core::config::NETLINK_HEADER_LEN;
use beacon_core::{HardwareAddress, KernelEvent};
use netlink_packet_core::{NetlinkBuffer, NetlinkMessage, NetlinkPayload};
use netlink_packet_route::address::nlas::Nla as AddressNla;
use netlink_packet_route::link::nlas::Nla as LinkNla;
use netlink_packet_route::{AddressMessage, LinkMessage, RtnlMessage};
use tracing::trace;

const NLMSG_ERROR: u16 = 2;
const NLMSG_DONE: u16 = 3;

const AF_INET: u8 = 2;

/// Frames are padded to this boundary
const NLMSG_ALIGNTO: usize = 4;

fn align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// Decode the bytes returned by one socket read
pub fn decode(buf: &[u8]) -> EventDecoder<'_> {
    EventDecoder {
        buf,
        offset: 0,
        finished: false,
    }
}

/// Lazy iterator over the events in one receive buffer
#[derive(Debug)]
pub struct EventDecoder<'a> {
    buf: &'a [u8],
    offset: usize,
    finished: bool,
}

impl Iterator for EventDecoder<'_> {
    type Item = KernelEvent;

    fn next(&mut self) -> Option<KernelEvent> {
        while !self.finished {
            let remaining = &self.buf[self.offset..];
            let Ok(header) = NetlinkBuffer::new_checked(remaining) else {
                if !remaining.is_empty() {
                    trace!("Dropping {} trailing bytes", remaining.len());
                }
                self.finished = true;
                break;
            };

            let len = header.length() as usize;
            if len < NETLINK_HEADER_LEN || len > remaining.len() {
                self.finished = true;
                break;
            }

            let message_type = header.message_type();
            let frame = &remaining[..len];
            self.offset = (self.offset + align(len)).min(self.buf.len());

            if message_type == NLMSG_DONE || message_type == NLMSG_ERROR {
                self.finished = true;
                break;
            }

            if let Some(event) = parse_frame(frame) {
                return Some(event);
            }
        }

        None
    }
}

fn parse_frame(frame: &[u8]) -> Option<KernelEvent> {
    let message = match NetlinkMessage::<RtnlMessage>::deserialize(frame) {
        Ok(message) => message,
        Err(e) => {
            trace!("Skipping unparseable frame: {:?}", e);
            return None;
        }
    };

    let NetlinkPayload::InnerMessage(inner) = message.payload else {
        return None;
    };

    match inner {
        RtnlMessage::NewLink(link) => Some(KernelEvent::LinkUpdated {
            index: link.header.index,
            hw_address: link_hw_address(&link),
        }),
        RtnlMessage::DelLink(link) => Some(KernelEvent::LinkRemoved {
            index: link.header.index,
        }),
        RtnlMessage::NewAddress(addr) if addr.header.family == AF_INET => {
            local_ipv4(&addr).map(|address| KernelEvent::AddressAdded {
                index: addr.header.index,
                address,
            })
        }
        RtnlMessage::DelAddress(addr) if addr.header.family == AF_INET => {
            Some(KernelEvent::AddressRemoved {
                index: addr.header.index,
            })
        }
        _ => None,
    }
}

fn link_hw_address(link: &LinkMessage) -> Option<HardwareAddress> {
    link.nlas.iter().find_map(|nla| match nla {
        LinkNla::Address(bytes) => HardwareAddress::from_slice(bytes),
        _ => None,
    })
}

fn local_ipv4(addr: &AddressMessage) -> Option<Ipv4Addr> {
    addr.nlas.iter().find_map(|nla| match nla {
        AddressNla::Local(bytes) => {
            let octets: [u8; 4] = bytes.as_slice().try_into().ok()?;
            Some(Ipv4Addr::from(octets))
        }
        _ => None,
    })
}
