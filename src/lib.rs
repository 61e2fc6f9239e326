/*!

A pure-Rust packet crafting and dissection library, with pcap-ng capture
support.

`packetry` parses raw byte buffers captured from network interfaces or
files into a structured protocol stack (a [`pdu::Pdu`]), and conversely
serializes programmatically constructed stacks into well-formed,
checksum-correct wire buffers. Sitting on top of that dissection core:
a [`tcp_stream::TcpStreamFollower`] that reassembles TCP conversations
from a sequence of already-parsed packets, and a [`wpa2::Wpa2Decrypter`]
that captures a WPA2 4-way handshake and decrypts the CCMP/TKIP frames
that follow it.

The crate builds on the pcap-ng container reader `packetry` was
originally forked from ([`block`], kept largely as-is): a [`Sniffer`]
wraps a [`block::reader::BlockReader`], tracks the capture's interfaces
through a [`block::section::Section`], and yields already-dissected
[`Packet`]s from `Iterator::next`.

From https://www.tcpdump.org/pcap/pcap.html, on why the pcap-ng
container this crate reads exists in the first place:

> The problem of exchanging packet traces becomes more and more critical
> every day; unfortunately, no standard solutions exist for this task
> right now. [...] This document proposes a new format for recording
> packet traces. [...]
>
> * Extensibility: It should be possible to add new standard capabilities
>   to the file format over time [...]
> * Portability: A capture trace must contain all the information needed
>   to read data independently from network, hardware and operating
>   system of the machine that made the capture.
> * Merge/Append data: It should be possible to add data at the end of a
>   given file, and the resulting file must still be readable.

Copyright (C) The Internet Society (2004). All Rights Reserved.
*/

pub mod address;
pub mod block;
pub mod cursor;
pub mod endian;
pub mod error;
pub mod iface;
pub mod option;
mod packet;
pub mod pdu;
pub mod route;
pub mod tcp_stream;
pub mod wpa2;

use std::io::Read;

use tracing::warn;

pub use error::{ParseError, Result};
pub use iface::{InterfaceId, InterfaceInfo, LinkType};
pub use packet::Packet;
pub use pdu::{Pdu, PduType};
pub use route::{Resolver, RoutingTable};

use block::reader::{BlockReader, ReaderError};
use block::section::Section;

/// Pass-through capture configuration (spec §6). None of these fields
/// affect the core's parsing/serialization semantics; they exist so a
/// caller wiring a live capture (a `pcap`-backed [`Read`], say) has
/// somewhere conventional to put them. `Sniffer` itself only reads
/// `Read`, so fields like `promisc` or `rfmon` are inert here and only
/// meaningful to whatever produced the byte stream.
#[derive(Clone, Debug, PartialEq)]
pub struct SnifferConfig {
    pub snap_len: u32,
    pub buffer_size: u32,
    pub promisc: bool,
    pub rfmon: bool,
    pub filter: Option<String>,
    pub timeout_ms: i32,
    pub direction: Direction,
    pub immediate_mode: bool,
    pub timestamp_precision: TimestampPrecision,
}

impl Default for SnifferConfig {
    fn default() -> SnifferConfig {
        SnifferConfig {
            snap_len: 262_144,
            buffer_size: 1_000_000,
            promisc: false,
            rfmon: false,
            filter: None,
            timeout_ms: 0,
            direction: Direction::InOut,
            immediate_mode: false,
            timestamp_precision: TimestampPrecision::Micro,
        }
    }
}

/// Which direction of traffic a capture should keep; passed straight
/// through to whatever capture library is backing the `Read`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    InOut,
    In,
    Out,
}

/// Timestamp resolution requested from the capture library; distinct
/// from the *recorded* resolution a pcap-ng Interface Description Block
/// carries (`InterfaceInfo::resolve_ts` always honors the latter).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TimestampPrecision {
    #[default]
    Micro,
    Nano,
}

/// Reads a pcap-ng byte stream and yields one already-dissected
/// [`Packet`] per captured frame (component J).
///
/// `Sniffer` is the concrete "Packet source" collaborator sketched in
/// spec §6: it owns no socket and does no platform I/O of its own — it
/// only frames pcap-ng blocks off of `R` (component A, by way of
/// [`block::reader::BlockReader`]), resolves each packet block against
/// the interface that captured it (component J, by way of
/// [`block::section::Section`]), and dispatches the link-layer bytes
/// into the PDU registry ([`pdu::parse_link`], component F).
///
/// Per spec §7's propagation policy, a packet whose bytes don't parse
/// into a well-formed PDU stack is logged and skipped rather than
/// returned as an error — callers who only care about well-formed
/// traffic don't need to handle `MalformedPacket`/`PduNotFound`
/// themselves.
pub struct Sniffer<R> {
    block_reader: BlockReader<R>,
    section: Section,
    config: SnifferConfig,
}

impl<R: Read> Sniffer<R> {
    pub fn new(rdr: R) -> Sniffer<R> {
        Sniffer::with_config(rdr, SnifferConfig::default())
    }

    pub fn with_config(rdr: R, config: SnifferConfig) -> Sniffer<R> {
        Sniffer {
            block_reader: BlockReader::new(rdr),
            section: Section::new(),
            config,
        }
    }

    pub fn config(&self) -> &SnifferConfig {
        &self.config
    }

    /// The interfaces seen so far in the current pcap-ng section.
    pub fn interfaces(&self) -> &[InterfaceInfo] {
        self.section.interfaces()
    }

    /// Returns the next well-formed packet, or `None` at a clean EOF.
    ///
    /// Blocks that aren't packet data (section headers, interface
    /// descriptions, name resolution, statistics) are folded into
    /// `Sniffer`'s bookkeeping and skipped transparently. A packet
    /// block whose bytes fail to parse into a PDU stack is logged via
    /// `tracing::warn!` and skipped, per spec §7.
    pub fn next_packet(&mut self) -> std::result::Result<Option<Packet>, ReaderError> {
        loop {
            let block = match self.block_reader.next_block()? {
                Some(block) => block,
                None => return Ok(None),
            };
            let Some(frame) = self.section.handle_block(block) else {
                continue;
            };
            match pdu::parse_link(frame.link_type, &frame.data) {
                Ok(pdu) => return Ok(Some(Packet::new(pdu, frame.timestamp))),
                Err(ParseError::MalformedPacket(msg)) => {
                    warn!("dropping malformed packet: {msg}");
                }
                Err(ParseError::PduNotFound) => {
                    warn!("dropping packet: no recognized PDU layer");
                }
                Err(e) => {
                    return Err(ReaderError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        e.to_string(),
                    )))
                }
            }
        }
    }
}

impl<R: Read> Iterator for Sniffer<R> {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        // A sniffer loop treats a read error the same as EOF: there's
        // nothing a caller driving a `for packet in sniffer` loop can
        // do with it beyond stopping.
        self.next_packet().ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shb_and_idb_and_epb(link_type: u16, packet_data: &[u8]) -> Vec<u8> {
        let mut b = Vec::new();
        // Section Header Block
        b.extend_from_slice(&0x0A0D_0D0Au32.to_le_bytes());
        b.extend_from_slice(&28u32.to_le_bytes());
        b.extend_from_slice(&[0x4D, 0x3C, 0x2B, 0x1A]);
        b.extend_from_slice(&1u16.to_le_bytes());
        b.extend_from_slice(&0u16.to_le_bytes());
        b.extend_from_slice(&(-1i64).to_le_bytes());
        b.extend_from_slice(&28u32.to_le_bytes());
        // Interface Description Block: link type, reserved, snaplen, no options
        let idb_len = 20u32;
        b.extend_from_slice(&0x0000_0001u32.to_le_bytes());
        b.extend_from_slice(&idb_len.to_le_bytes());
        b.extend_from_slice(&(link_type as u32).to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes()); // snaplen
        b.extend_from_slice(&idb_len.to_le_bytes());
        // Enhanced Packet Block
        let padded_len = (packet_data.len() + 3) / 4 * 4;
        let epb_len = 32 + padded_len as u32;
        b.extend_from_slice(&0x0000_0006u32.to_le_bytes());
        b.extend_from_slice(&epb_len.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes()); // interface id
        b.extend_from_slice(&0u32.to_le_bytes()); // timestamp high
        b.extend_from_slice(&0u32.to_le_bytes()); // timestamp low
        b.extend_from_slice(&(packet_data.len() as u32).to_le_bytes());
        b.extend_from_slice(&(packet_data.len() as u32).to_le_bytes());
        b.extend_from_slice(packet_data);
        b.resize(b.len() + (padded_len - packet_data.len()), 0);
        b.extend_from_slice(&epb_len.to_le_bytes());
        b
    }

    #[test]
    fn yields_a_raw_pdu_for_an_unrecognized_linktype() {
        let bytes = shb_and_idb_and_epb(9999, b"hello");
        let mut sniffer = Sniffer::new(&bytes[..]);
        let packet = sniffer.next_packet().unwrap().unwrap();
        assert_eq!(packet.pdu().pdu_type(), PduType::Raw);
        assert!(sniffer.next_packet().unwrap().is_none());
    }

    #[test]
    fn iterator_stops_cleanly_at_eof() {
        let bytes = shb_and_idb_and_epb(9999, b"x");
        let sniffer = Sniffer::new(&bytes[..]);
        assert_eq!(sniffer.count(), 1);
    }

    #[test]
    fn default_config_matches_spec_passthrough_shape() {
        let cfg = SnifferConfig::default();
        assert_eq!(cfg.direction, Direction::InOut);
        assert!(!cfg.promisc);
    }
}
