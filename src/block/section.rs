//! Tracks per-section capture state (spec §6: "Packet source").
//!
//! Grounded in the teacher's `internal/section.rs`: a Section Header
//! Block resets interface/name-resolution bookkeeping, an Interface
//! Description Block registers a new [`InterfaceInfo`], and packet
//! blocks are resolved against the interface they were captured on.
//! Reworked against the current `Block`/`InterfaceInfo` types (the
//! teacher's version predates both).

use bytes::Bytes;
use tracing::*;

use crate::block::{Block, InterfaceStatistics, NameResolution};
use crate::iface::{InterfaceInfo, LinkType};

/// One already-dissected packet, with the timestamp resolved against
/// its capturing interface's clock resolution (spec §6).
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub link_type: LinkType,
    pub timestamp: Option<std::time::SystemTime>,
    pub data: Bytes,
}

/// Bookkeeping scoped to a single pcap-ng Section: the set of
/// interfaces and resolved names defined so far, reset whenever a new
/// Section Header Block appears.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Section {
    interfaces: Vec<InterfaceInfo>,
    resolved_names: Vec<NameResolution>,
}

impl Section {
    pub fn new() -> Section {
        Section::default()
    }

    /// Folds one block into the section's state, returning a
    /// [`RawFrame`] if the block carried packet data.
    pub fn handle_block(&mut self, block: Block) -> Option<RawFrame> {
        match block {
            Block::SectionHeader(x) => {
                info!("starting a new section: {:?}", x);
                self.interfaces.clear();
                self.resolved_names.clear();
                None
            }
            Block::InterfaceDescription(descr) => {
                debug!("defined a new interface: {:?}", descr);
                self.interfaces.push(InterfaceInfo { descr, stats: None });
                None
            }
            Block::InterfaceStatistics(stats) => {
                self.record_stats(stats);
                None
            }
            Block::NameResolution(x) => {
                self.resolved_names.push(x);
                None
            }
            Block::EnhancedPacket(pkt) => {
                let iface = self.lookup(pkt.interface_id)?;
                Some(RawFrame {
                    link_type: iface.link_type(),
                    timestamp: Some(iface.resolve_ts(pkt.timestamp)),
                    data: pkt.packet_data,
                })
            }
            Block::ObsoletePacket(pkt) => {
                let iface = self.lookup(u32::from(pkt.interface_id))?;
                Some(RawFrame {
                    link_type: iface.link_type(),
                    timestamp: Some(iface.resolve_ts(pkt.timestamp)),
                    data: pkt.packet_data,
                })
            }
            Block::SimplePacket(pkt) => {
                // Implicitly captured on interface 0 (spec-via-pcap-ng: no
                // Interface ID field on this block variant).
                let link_type = self
                    .interfaces
                    .first()
                    .map_or(LinkType::Unknown(0), InterfaceInfo::link_type);
                Some(RawFrame {
                    link_type,
                    timestamp: None,
                    data: pkt.packet_data,
                })
            }
            Block::Unparsed(bt) => {
                warn!("not handling unknown block type: {:?}", bt);
                None
            }
        }
    }

    fn record_stats(&mut self, stats: InterfaceStatistics) {
        if let Some(iface) = self
            .interfaces
            .get_mut(stats.interface_id as usize)
        {
            iface.stats = Some(stats);
        }
    }

    fn lookup(&self, interface_id: u32) -> Option<&InterfaceInfo> {
        match self.interfaces.get(interface_id as usize) {
            Some(iface) => Some(iface),
            None => {
                warn!("packet referenced unknown interface {}", interface_id);
                None
            }
        }
    }

    pub fn interfaces(&self) -> &[InterfaceInfo] {
        &self.interfaces
    }
}
