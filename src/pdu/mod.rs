//! The PDU composition model (component E/F): a closed, singly-linked
//! stack of protocol nodes, plus the tag-keyed registry that dispatches
//! parsing and fills in "next protocol" fields during serialization.
//!
//! Per the spec's design notes (§9), the source's virtual-dispatch
//! hierarchy (`PDU` base class + `pdu_type()` + `tins_cast<T>`) is
//! re-expressed as a single closed `enum Pdu`, with `Box<Pdu>` standing
//! in for the intrusive owned `inner_pdu` pointer and pattern matching
//! standing in for `find_pdu<T>`.

pub mod arp;
pub mod dhcp;
pub mod dhcpv6;
pub mod dns;
pub mod dot11;
pub mod dot3;
pub mod eapol;
pub mod ethernet;
pub mod icmp;
pub mod icmpv6;
pub mod ipsec;
pub mod ipv4;
pub mod ipv6;
pub mod loopback;
pub mod pppoe;
pub mod raw;
pub mod sll;
pub mod stp;
pub mod tcp;
pub mod udp;
pub mod vlan;

use crate::error::{ParseError, Result};
use crate::iface::LinkType;
use bytes::Bytes;

pub use arp::Arp;
pub use dhcp::Dhcp;
pub use dhcpv6::Dhcpv6;
pub use dns::Dns;
pub use dot11::Dot11;
pub use dot3::Dot3;
pub use eapol::Eapol;
pub use ethernet::EthernetII;
pub use icmp::Icmp;
pub use icmpv6::Icmpv6;
pub use ipsec::{Ah, Esp};
pub use ipv4::Ipv4;
pub use ipv6::Ipv6;
pub use loopback::Loopback;
pub use pppoe::Pppoe;
pub use raw::RawPdu;
pub use sll::Sll;
pub use stp::Stp;
pub use tcp::Tcp;
pub use udp::Udp;
pub use vlan::Vlan;

/// Closed discriminator for every PDU variant, mirroring the source's
/// `pdu_type()` enum (spec §3.2).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum PduType {
    Raw,
    EthernetII,
    Dot3,
    Vlan,
    Arp,
    Ip,
    Ipv6,
    Tcp,
    Udp,
    Icmp,
    Icmpv6,
    Dns,
    Dhcp,
    Dhcpv6,
    Stp,
    Dot11,
    EapolRc4,
    EapolRsn,
    Ah,
    Esp,
    PppoeDiscovery,
    PppoeSession,
    Sll,
    Loopback,
}

impl PduType {
    /// The EtherType a link-layer parent should set when this is its
    /// inner PDU, if this protocol is ever carried directly over
    /// Ethernet.
    pub fn to_ethertype(self) -> Option<u16> {
        match self {
            PduType::Ip => Some(0x0800),
            PduType::Ipv6 => Some(0x86DD),
            PduType::Arp => Some(0x0806),
            PduType::Vlan => Some(0x8100),
            PduType::PppoeDiscovery => Some(0x8863),
            PduType::PppoeSession => Some(0x8864),
            PduType::EapolRc4 | PduType::EapolRsn => Some(0x888E),
            _ => None,
        }
    }

    /// The IP protocol number a network-layer parent should set.
    pub fn to_ip_proto(self) -> Option<u8> {
        match self {
            PduType::Icmp => Some(1),
            PduType::Tcp => Some(6),
            PduType::Udp => Some(17),
            PduType::Ipv6 => Some(41),
            PduType::Ah => Some(51),
            PduType::Esp => Some(50),
            PduType::Icmpv6 => Some(58),
            _ => None,
        }
    }
}

/// Cross-layer context threaded down the serialization walk, replacing
/// the source's parent back-pointer (§9 design note: "parent
/// back-references -> pass-through argument").
#[derive(Clone, Copy, Default)]
pub struct SerializeCtx {
    pub ipv4_pseudo: Option<ipv4::Ipv4PseudoHeader>,
    pub ipv6_pseudo: Option<ipv6::Ipv6PseudoHeader>,
}

/// A node in the protocol stack, plus (for every non-leaf variant) the
/// owned tail of the stack.
#[derive(Clone, PartialEq, Debug)]
pub enum Pdu {
    Raw(RawPdu),
    EthernetII(EthernetII, Box<Pdu>),
    Dot3(Dot3, Box<Pdu>),
    Vlan(Vlan, Box<Pdu>),
    Arp(Arp, Box<Pdu>),
    Ipv4(Ipv4, Box<Pdu>),
    Ipv6(Ipv6, Box<Pdu>),
    Tcp(Tcp, Box<Pdu>),
    Udp(Udp, Box<Pdu>),
    Icmp(Icmp, Box<Pdu>),
    Icmpv6(Icmpv6, Box<Pdu>),
    Dns(Dns, Box<Pdu>),
    Dhcp(Dhcp, Box<Pdu>),
    Dhcpv6(Dhcpv6, Box<Pdu>),
    Stp(Stp, Box<Pdu>),
    Dot11(Dot11, Box<Pdu>),
    Eapol(Eapol, Box<Pdu>),
    Ah(Ah, Box<Pdu>),
    Esp(Esp, Box<Pdu>),
    Pppoe(Pppoe, Box<Pdu>),
    Sll(Sll, Box<Pdu>),
    Loopback(Loopback, Box<Pdu>),
}

// `Pdu` holds no non-`Send` handles (no Rc, no raw pointers), so it's
// `Send` automatically; assert it stays that way (§9 design note).
const _: fn() = || {
    fn assert_send<T: Send>() {}
    assert_send::<Pdu>();
};

impl Pdu {
    pub fn pdu_type(&self) -> PduType {
        match self {
            Pdu::Raw(_) => PduType::Raw,
            Pdu::EthernetII(..) => PduType::EthernetII,
            Pdu::Dot3(..) => PduType::Dot3,
            Pdu::Vlan(..) => PduType::Vlan,
            Pdu::Arp(..) => PduType::Arp,
            Pdu::Ipv4(..) => PduType::Ip,
            Pdu::Ipv6(..) => PduType::Ipv6,
            Pdu::Tcp(..) => PduType::Tcp,
            Pdu::Udp(..) => PduType::Udp,
            Pdu::Icmp(..) => PduType::Icmp,
            Pdu::Icmpv6(..) => PduType::Icmpv6,
            Pdu::Dns(..) => PduType::Dns,
            Pdu::Dhcp(..) => PduType::Dhcp,
            Pdu::Dhcpv6(..) => PduType::Dhcpv6,
            Pdu::Stp(..) => PduType::Stp,
            Pdu::Dot11(..) => PduType::Dot11,
            Pdu::Eapol(e, _) => e.pdu_type(),
            Pdu::Ah(..) => PduType::Ah,
            Pdu::Esp(..) => PduType::Esp,
            Pdu::Pppoe(p, _) => p.pdu_type(),
            Pdu::Sll(..) => PduType::Sll,
            Pdu::Loopback(..) => PduType::Loopback,
        }
    }

    /// Bytes this node itself contributes, not counting its inner PDU.
    pub fn header_size(&self) -> usize {
        match self {
            Pdu::Raw(_) => 0,
            Pdu::EthernetII(h, _) => h.header_size(),
            Pdu::Dot3(h, _) => h.header_size(),
            Pdu::Vlan(h, _) => h.header_size(),
            Pdu::Arp(h, _) => h.header_size(),
            Pdu::Ipv4(h, _) => h.header_size(),
            Pdu::Ipv6(h, _) => h.header_size(),
            Pdu::Tcp(h, _) => h.header_size(),
            Pdu::Udp(h, _) => h.header_size(),
            Pdu::Icmp(h, _) => h.header_size(),
            Pdu::Icmpv6(h, _) => h.header_size(),
            Pdu::Dns(h, _) => h.header_size(),
            Pdu::Dhcp(h, _) => h.header_size(),
            Pdu::Dhcpv6(h, _) => h.header_size(),
            Pdu::Stp(h, _) => h.header_size(),
            Pdu::Dot11(h, _) => h.header_size(),
            Pdu::Eapol(h, _) => h.header_size(),
            Pdu::Ah(h, _) => h.header_size(),
            Pdu::Esp(h, _) => h.header_size(),
            Pdu::Pppoe(h, _) => h.header_size(),
            Pdu::Sll(h, _) => h.header_size(),
            Pdu::Loopback(h, _) => h.header_size(),
        }
    }

    /// Bytes appended after the inner PDU (Ethernet padding, ICMP
    /// extensions). Zero for everything else.
    pub fn trailer_size(&self) -> usize {
        match self {
            Pdu::EthernetII(h, inner) => h.trailer_size(inner),
            Pdu::Icmp(h, inner) => h.trailer_size(inner),
            _ => 0,
        }
    }

    pub fn inner_pdu(&self) -> Option<&Pdu> {
        match self {
            Pdu::Raw(_) => None,
            Pdu::EthernetII(_, i)
            | Pdu::Dot3(_, i)
            | Pdu::Vlan(_, i)
            | Pdu::Arp(_, i)
            | Pdu::Ipv4(_, i)
            | Pdu::Ipv6(_, i)
            | Pdu::Tcp(_, i)
            | Pdu::Udp(_, i)
            | Pdu::Icmp(_, i)
            | Pdu::Icmpv6(_, i)
            | Pdu::Dns(_, i)
            | Pdu::Dhcp(_, i)
            | Pdu::Dhcpv6(_, i)
            | Pdu::Stp(_, i)
            | Pdu::Dot11(_, i)
            | Pdu::Eapol(_, i)
            | Pdu::Ah(_, i)
            | Pdu::Esp(_, i)
            | Pdu::Pppoe(_, i)
            | Pdu::Sll(_, i)
            | Pdu::Loopback(_, i) => Some(i),
        }
    }

    pub fn inner_pdu_mut(&mut self) -> Option<&mut Pdu> {
        match self {
            Pdu::Raw(_) => None,
            Pdu::EthernetII(_, i)
            | Pdu::Dot3(_, i)
            | Pdu::Vlan(_, i)
            | Pdu::Arp(_, i)
            | Pdu::Ipv4(_, i)
            | Pdu::Ipv6(_, i)
            | Pdu::Tcp(_, i)
            | Pdu::Udp(_, i)
            | Pdu::Icmp(_, i)
            | Pdu::Icmpv6(_, i)
            | Pdu::Dns(_, i)
            | Pdu::Dhcp(_, i)
            | Pdu::Dhcpv6(_, i)
            | Pdu::Stp(_, i)
            | Pdu::Dot11(_, i)
            | Pdu::Eapol(_, i)
            | Pdu::Ah(_, i)
            | Pdu::Esp(_, i)
            | Pdu::Pppoe(_, i)
            | Pdu::Sll(_, i)
            | Pdu::Loopback(_, i) => Some(i),
        }
    }

    /// Total size of this node and its whole tail.
    pub fn size(&self) -> usize {
        match self {
            Pdu::Raw(r) => r.data.len(),
            _ => {
                self.header_size()
                    + self.trailer_size()
                    + self.inner_pdu().map_or(0, Pdu::size)
            }
        }
    }

    /// Finds the first layer of type `T` by trying each variant's
    /// extraction closure, walking down the stack. Used in place of
    /// `rfind_pdu<T>`.
    pub fn find<T>(&self, extract: impl Fn(&Pdu) -> Option<&T>) -> Result<&T> {
        let mut cur = self;
        loop {
            if let Some(found) = extract(cur) {
                return Ok(found);
            }
            match cur.inner_pdu() {
                Some(inner) => cur = inner,
                None => return Err(ParseError::PduNotFound),
            }
        }
    }

    /// Structural check used to pair a request with a reply: compares
    /// this node's addressing fields, then delegates to the inner PDU.
    pub fn matches_response(&self, other: &Pdu) -> bool {
        let self_match = match (self, other) {
            (Pdu::EthernetII(a, _), Pdu::EthernetII(b, _)) => a.src == b.dst && a.dst == b.src,
            (Pdu::Ipv4(a, _), Pdu::Ipv4(b, _)) => a.src == b.dst && a.dst == b.src,
            (Pdu::Ipv6(a, _), Pdu::Ipv6(b, _)) => a.src == b.dst && a.dst == b.src,
            (Pdu::Tcp(a, _), Pdu::Tcp(b, _)) => a.sport == b.dport && a.dport == b.sport,
            (Pdu::Udp(a, _), Pdu::Udp(b, _)) => a.sport == b.dport && a.dport == b.sport,
            (Pdu::Icmp(a, _), Pdu::Icmp(b, _)) => a.matches_response(b),
            (Pdu::Arp(a, _), Pdu::Arp(b, _)) => a.sender_ip == b.target_ip,
            (Pdu::Raw(_), Pdu::Raw(_)) => true,
            _ => false,
        };
        if !self_match {
            return false;
        }
        match (self.inner_pdu(), other.inner_pdu()) {
            (Some(a), Some(b)) => a.matches_response(b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Serializes the whole stack, allocating exactly `size()` bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.size()];
        self.write_into(&mut buf, &mut SerializeCtx::default())?;
        Ok(buf)
    }

    /// The recursive serialize-then-fixup algorithm (§4.4): writes this
    /// node's header into the prefix of `buf`, recurses into the inner
    /// PDU for the remainder, then (implicitly, inside each protocol's
    /// `write_into`) patches checksum/length fields that depend on the
    /// now-written inner bytes.
    pub(crate) fn write_into(&self, buf: &mut [u8], ctx: &mut SerializeCtx) -> Result<()> {
        match self {
            Pdu::Raw(r) => {
                buf.copy_from_slice(&r.data);
                Ok(())
            }
            Pdu::EthernetII(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Dot3(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Vlan(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Arp(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Ipv4(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Ipv6(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Tcp(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Udp(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Icmp(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Icmpv6(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Dns(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Dhcp(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Dhcpv6(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Stp(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Dot11(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Eapol(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Ah(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Esp(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Pppoe(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Sll(h, inner) => h.write_into(inner, buf, ctx),
            Pdu::Loopback(h, inner) => h.write_into(inner, buf, ctx),
        }
    }

    /// Clones `other` and appends it to the tail of this stack (`a / b`).
    #[must_use]
    pub fn append(mut self, other: &Pdu) -> Pdu {
        fn tail_mut(p: &mut Pdu) -> &mut Pdu {
            let mut cur = p;
            while cur.inner_pdu().is_some() {
                cur = cur.inner_pdu_mut().unwrap();
            }
            cur
        }
        *tail_mut(&mut self) = other.clone();
        self
    }
}

impl std::ops::Div<Pdu> for Pdu {
    type Output = Pdu;
    fn div(self, rhs: Pdu) -> Pdu {
        self.append(&rhs)
    }
}

impl std::ops::Div<&Pdu> for Pdu {
    type Output = Pdu;
    fn div(self, rhs: &Pdu) -> Pdu {
        self.append(rhs)
    }
}

/// Parses a byte buffer into a PDU chain rooted at `link_type` (the
/// value the capture's interface description carries). Any bytes the
/// framework doesn't recognize become a [`RawPdu`].
pub fn parse_link(link_type: LinkType, data: &[u8]) -> Result<Pdu> {
    match link_type {
        LinkType::ETHERNET => ethernet::parse(data),
        LinkType::LINUX_SLL => sll::parse(data),
        LinkType::LOOP | LinkType::NULL => loopback::parse(data),
        LinkType::RAW => parse_by_ip_version(data),
        LinkType::IEEE802_11 => dot11::parse(data),
        LinkType::IEEE802_11_RADIO => dot11::parse_radiotap(data),
        _ => Ok(Pdu::Raw(RawPdu::new(Bytes::copy_from_slice(data)))),
    }
}

pub(crate) fn parse_by_ip_version(data: &[u8]) -> Result<Pdu> {
    match data.first().map(|b| b >> 4) {
        Some(4) => ipv4::parse(data),
        Some(6) => ipv6::parse(data),
        _ => Ok(Pdu::Raw(RawPdu::new(Bytes::copy_from_slice(data)))),
    }
}

/// Maps an EtherType tag to the PDU it introduces (component F). Unknown
/// tags become [`RawPdu`].
pub(crate) fn parse_by_ethertype(ethertype: u16, data: &[u8]) -> Result<Pdu> {
    match ethertype {
        0x0800 => ipv4::parse(data),
        0x86DD => ipv6::parse(data),
        0x0806 => arp::parse(data),
        0x8100 | 0x88A8 | 0x9100 => vlan::parse(data, ethertype),
        0x8863 => pppoe::parse_discovery(data),
        0x8864 => pppoe::parse_session(data),
        0x888E => eapol::parse(data),
        _ => Ok(Pdu::Raw(RawPdu::new(Bytes::copy_from_slice(data)))),
    }
}

/// Maps an IP protocol number to the PDU it introduces (component F).
pub(crate) fn parse_by_ip_proto(proto: u8, data: &[u8]) -> Result<Pdu> {
    match proto {
        1 => icmp::parse(data),
        6 => tcp::parse(data),
        17 => udp::parse(data),
        41 => ipv6::parse(data),
        50 => ipsec::parse_esp(data),
        51 => ipsec::parse_ah(data),
        58 => icmpv6::parse(data),
        _ => Ok(Pdu::Raw(RawPdu::new(Bytes::copy_from_slice(data)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_recursive_sum() {
        let raw = Pdu::Raw(RawPdu::new(Bytes::from_static(b"abcdef")));
        assert_eq!(raw.size(), 6);
    }
}
