//! IPv4 (spec §4.6, network-layer family).
//!
//! Grounded in `examples/original_source/include/tins/ip.h`: the header
//! checksum covers the header alone (zeroed before computing), the
//! protocol field is recomputed from the inner PDU's type when possible
//! (same preserve-or-recompute pattern as `ethernet::EthernetII`), and
//! options are padded to a 4-byte boundary with `0` (EOL) bytes.

use super::{Pdu, SerializeCtx};
use crate::address::Ipv4Address;
use crate::cursor::{checksum, Reader, Writer};
use crate::endian::Endianness;
use crate::error::{ParseError, Result};
use crate::route::RoutingTable;

/// The fields of the pseudo-header TCP/UDP checksum over IPv4 (RFC 793
/// §3.1 / RFC 768) — threaded through [`SerializeCtx`] rather than handed
/// to the inner PDU directly, per the spec's "parent back-references ->
/// pass-through argument" design note.
#[derive(Clone, Copy, Debug)]
pub struct Ipv4PseudoHeader {
    pub src: Ipv4Address,
    pub dst: Ipv4Address,
    pub protocol: u8,
    pub length: u16,
}

impl Ipv4PseudoHeader {
    pub(crate) fn checksum_seed(&self) -> u32 {
        let mut sum = 0u32;
        sum += u32::from(u16::from_be_bytes([self.src.octets()[0], self.src.octets()[1]]));
        sum += u32::from(u16::from_be_bytes([self.src.octets()[2], self.src.octets()[3]]));
        sum += u32::from(u16::from_be_bytes([self.dst.octets()[0], self.dst.octets()[1]]));
        sum += u32::from(u16::from_be_bytes([self.dst.octets()[2], self.dst.octets()[3]]));
        sum += u32::from(self.protocol);
        sum += u32::from(self.length);
        sum
    }
}

fn round_up4(n: usize) -> usize {
    (n + 3) & !3
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Ipv4 {
    pub tos: u8,
    pub id: u16,
    pub flags: u8,
    pub frag_offset: u16,
    pub ttl: u8,
    /// The wire protocol number. Recomputed from the inner PDU's type on
    /// serialize when mappable, preserved otherwise (same pattern as
    /// `EthernetII::ethertype`).
    pub protocol: u8,
    pub src: Ipv4Address,
    pub dst: Ipv4Address,
    /// Raw option bytes, in the order they were added. Padded to a
    /// 4-byte boundary with `0x00` (EOL) on serialize.
    pub options: Vec<u8>,
}

impl Ipv4 {
    pub fn new(src: Ipv4Address, dst: Ipv4Address) -> Ipv4 {
        Ipv4 {
            tos: 0,
            id: 0,
            flags: 0,
            frag_offset: 0,
            ttl: 64,
            protocol: 0,
            src,
            dst,
            options: Vec::new(),
        }
    }

    pub fn header_size(&self) -> usize {
        20 + round_up4(self.options.len())
    }

    /// Fills in a `0.0.0.0` source address from `table`, per §4.4's MUST
    /// that a zero source be resolved via a routing lookup before the
    /// packet goes out. A no-op if `src` is already specified or the
    /// table has no route to `dst` — `write_into` never performs this
    /// lookup itself, since routing is a collaborator the caller
    /// supplies (spec §6), not something the core does I/O for.
    pub fn resolve_source(&mut self, table: &dyn RoutingTable) {
        if self.src == Ipv4Address::from_bytes([0, 0, 0, 0]) {
            if let Some(route) = table.route_for(self.dst) {
                self.src = route;
            }
        }
    }

    fn effective_protocol(&self, inner: &Pdu) -> u8 {
        inner.pdu_type().to_ip_proto().unwrap_or(self.protocol)
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let hs = self.header_size();
        if hs > 0xF * 4 {
            return Err(ParseError::SerializationError(
                "IPv4 header too large to express in a 4-bit IHL".into(),
            ));
        }
        let total_length = hs + inner.size();
        let (head, rest) = buf.split_at_mut(hs);

        let protocol = self.effective_protocol(inner);

        {
            let mut w = Writer::new(head);
            let version_ihl = (4 << 4) | (hs / 4) as u8;
            w.write_u8(version_ihl)?;
            w.write_u8(self.tos)?;
            w.write_u16(total_length as u16, Endianness::Big)?;
            w.write_u16(self.id, Endianness::Big)?;
            let flags_frag = (u16::from(self.flags) << 13) | (self.frag_offset & 0x1FFF);
            w.write_u16(flags_frag, Endianness::Big)?;
            w.write_u8(self.ttl)?;
            w.write_u8(protocol)?;
            w.write_u16(0, Endianness::Big)?; // checksum, patched below
            w.write_bytes(&self.src.octets())?;
            w.write_bytes(&self.dst.octets())?;
            let opts_len = self.options.len();
            w.write_bytes(&self.options)?;
            w.fill(round_up4(opts_len) - opts_len, 0)?;
        }

        let sum = checksum(head);
        head[10..12].copy_from_slice(&sum.to_be_bytes());

        ctx.ipv4_pseudo = Some(Ipv4PseudoHeader {
            src: self.src,
            dst: self.dst,
            protocol,
            length: inner.size() as u16,
        });
        inner.write_into(rest, ctx)
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let version_ihl = r.read_u8()?;
    let version = version_ihl >> 4;
    if version != 4 {
        return Err(ParseError::MalformedPacket(format!(
            "expected IPv4 version 4, found {version}"
        )));
    }
    let ihl = (version_ihl & 0x0F) as usize * 4;
    if ihl < 20 {
        return Err(ParseError::MalformedPacket(format!(
            "IPv4 IHL too small: {ihl} bytes"
        )));
    }
    let tos = r.read_u8()?;
    let total_length = r.read_u16(Endianness::Big)?;
    let id = r.read_u16(Endianness::Big)?;
    let flags_frag = r.read_u16(Endianness::Big)?;
    let flags = (flags_frag >> 13) as u8;
    let frag_offset = flags_frag & 0x1FFF;
    let ttl = r.read_u8()?;
    let protocol = r.read_u8()?;
    let _checksum = r.read_u16(Endianness::Big)?;
    let src = Ipv4Address::from_bytes(r.read_array::<4>()?);
    let dst = Ipv4Address::from_bytes(r.read_array::<4>()?);

    let opts_len = ihl - 20;
    let options = r.read_bytes(opts_len)?.to_vec();

    let payload_len = (total_length as usize)
        .checked_sub(ihl)
        .ok_or_else(|| ParseError::MalformedPacket("IPv4 total_length shorter than header".into()))?;
    let payload = r.read_bytes(payload_len.min(r.remaining()))?;

    let inner = Box::new(super::parse_by_ip_proto(protocol, payload)?);
    Ok(Pdu::Ipv4(
        Ipv4 {
            tos,
            id,
            flags,
            frag_offset,
            ttl,
            protocol,
            src,
            dst,
            options,
        },
        inner,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn all_ones_payload_checksum_folds_to_ffff() {
        // S6: IP("1.2.3.4", "5.6.7.8") / RawPDU -- checksum over a header
        // with no options is self-consistent after the fixup pass.
        let ip = Ipv4::new("1.2.3.4".parse().unwrap(), "5.6.7.8".parse().unwrap());
        let stack = Pdu::Ipv4(ip, Box::new(Pdu::Raw(RawPdu::from_slice(b"abcdef"))));
        let bytes = stack.serialize().unwrap();
        assert_eq!(checksum(&bytes[0..20]), 0);
    }

    #[test]
    fn roundtrips_header_fields() {
        let mut ip = Ipv4::new("10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap());
        ip.ttl = 30;
        ip.id = 0xBEEF;
        let stack = Pdu::Ipv4(ip, Box::new(Pdu::Raw(RawPdu::from_slice(b"payload"))));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Ipv4(h, inner) => {
                assert_eq!(h.ttl, 30);
                assert_eq!(h.id, 0xBEEF);
                assert_eq!(h.src, "10.0.0.1".parse().unwrap());
                match *inner {
                    Pdu::Raw(r) => assert_eq!(&r.data[..], b"payload"),
                    _ => panic!("expected Raw"),
                }
            }
            _ => panic!("expected Ipv4"),
        }
    }

    #[test]
    fn resolve_source_fills_in_zero_address_from_routing_table() {
        use crate::route::RoutingTable;

        struct SingleRoute(Ipv4Address, Ipv4Address);
        impl RoutingTable for SingleRoute {
            fn route_for(&self, dst: Ipv4Address) -> Option<Ipv4Address> {
                (dst == self.1).then_some(self.0)
            }
        }

        let dst = "8.8.8.8".parse().unwrap();
        let table = SingleRoute("192.168.1.1".parse().unwrap(), dst);
        let mut ip = Ipv4::new(Ipv4Address::from_bytes([0, 0, 0, 0]), dst);
        ip.resolve_source(&table);
        assert_eq!(ip.src, "192.168.1.1".parse().unwrap());

        // Already-specified sources are left alone.
        let mut ip2 = Ipv4::new("10.0.0.5".parse().unwrap(), dst);
        ip2.resolve_source(&table);
        assert_eq!(ip2.src, "10.0.0.5".parse().unwrap());
    }

    #[test]
    fn options_are_padded_to_4_byte_boundary() {
        let mut ip = Ipv4::new("1.1.1.1".parse().unwrap(), "2.2.2.2".parse().unwrap());
        ip.options = vec![1, 2, 3]; // 3 bytes -> padded to 4
        let stack = Pdu::Ipv4(ip, Box::new(Pdu::Raw(RawPdu::from_slice(b"x"))));
        let bytes = stack.serialize().unwrap();
        assert_eq!(bytes[0] & 0x0F, 6); // (20 + 4) / 4
    }
}
