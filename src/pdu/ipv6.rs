//! IPv6 (spec §4.6): fixed 40-byte header plus an ordered chain of
//! extension headers, each carrying the type tag of the next one.
//!
//! Grounded in `examples/original_source/include/tins/ip6.h` and
//! `ip6_extension_header.h`. Extension headers are kept generic (a type
//! tag plus raw data) rather than modeling each of hop-by-hop/routing/
//! fragment/destination-options individually — the spec only requires
//! they round-trip as "an ordered (next_header, payload) list".

use super::{Pdu, SerializeCtx};
use crate::address::Ipv6Address;
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::{ParseError, Result};

pub const HOP_BY_HOP: u8 = 0;
pub const ROUTING: u8 = 43;
pub const FRAGMENT: u8 = 44;
pub const DESTINATION_OPTIONS: u8 = 60;

fn is_extension_header(next_header: u8) -> bool {
    matches!(next_header, HOP_BY_HOP | ROUTING | FRAGMENT | DESTINATION_OPTIONS)
}

fn round_up8(n: usize) -> usize {
    (n + 7) & !7
}

/// The pseudo-header used for the upper-layer checksum (RFC 8200 §8.1),
/// threaded through [`SerializeCtx`] the same way [`super::ipv4::Ipv4PseudoHeader`] is.
#[derive(Clone, Copy, Debug)]
pub struct Ipv6PseudoHeader {
    pub src: Ipv6Address,
    pub dst: Ipv6Address,
    pub next_header: u8,
    pub length: u32,
}

impl Ipv6PseudoHeader {
    pub(crate) fn checksum_seed(&self) -> u32 {
        let mut sum = 0u32;
        for chunk in self.src.octets().chunks_exact(2) {
            sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
        }
        for chunk in self.dst.octets().chunks_exact(2) {
            sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
        }
        sum += self.length >> 16;
        sum += self.length & 0xFFFF;
        sum += u32::from(self.next_header);
        sum
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ExtHeader {
    pub ext_type: u8,
    pub data: Vec<u8>,
}

impl ExtHeader {
    fn total_len(&self) -> usize {
        round_up8(2 + self.data.len())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Ipv6 {
    pub traffic_class: u8,
    pub flow_label: u32,
    pub hop_limit: u8,
    pub src: Ipv6Address,
    pub dst: Ipv6Address,
    pub ext_headers: Vec<ExtHeader>,
    /// The wire tag for the final (innermost) next-header field,
    /// preserved for round-tripping when the inner PDU's type doesn't
    /// map back to a known IP protocol number.
    pub next_header: u8,
}

impl Ipv6 {
    pub fn new(src: Ipv6Address, dst: Ipv6Address) -> Ipv6 {
        Ipv6 {
            traffic_class: 0,
            flow_label: 0,
            hop_limit: 64,
            src,
            dst,
            ext_headers: Vec::new(),
            next_header: 0,
        }
    }

    pub fn header_size(&self) -> usize {
        40 + self.ext_headers.iter().map(ExtHeader::total_len).sum::<usize>()
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let effective_proto = inner.pdu_type().to_ip_proto().unwrap_or(self.next_header);
        let first_next_header = self
            .ext_headers
            .first()
            .map_or(effective_proto, |e| e.ext_type);

        let ext_bytes_len: usize = self.ext_headers.iter().map(ExtHeader::total_len).sum();
        let payload_length = ext_bytes_len + inner.size();

        let (head, rest) = buf.split_at_mut(40);
        {
            let mut w = Writer::new(head);
            let version_tc_fl =
                (6u32 << 28) | (u32::from(self.traffic_class) << 20) | (self.flow_label & 0xFFFFF);
            w.write_u32(version_tc_fl, Endianness::Big)?;
            w.write_u16(payload_length as u16, Endianness::Big)?;
            w.write_u8(first_next_header)?;
            w.write_u8(self.hop_limit)?;
            w.write_bytes(&self.src.octets())?;
            w.write_bytes(&self.dst.octets())?;
        }

        let (mut ext_buf, payload_buf) = rest.split_at_mut(ext_bytes_len);
        for (i, ext) in self.ext_headers.iter().enumerate() {
            let next_type = self
                .ext_headers
                .get(i + 1)
                .map_or(effective_proto, |e| e.ext_type);
            let total_len = ext.total_len();
            let (this_buf, remainder) = ext_buf.split_at_mut(total_len);
            let mut w = Writer::new(this_buf);
            w.write_u8(next_type)?;
            w.write_u8((total_len / 8 - 1) as u8)?;
            w.write_bytes(&ext.data)?;
            w.fill(total_len - 2 - ext.data.len(), 0)?;
            ext_buf = remainder;
        }

        ctx.ipv6_pseudo = Some(Ipv6PseudoHeader {
            src: self.src,
            dst: self.dst,
            next_header: effective_proto,
            length: inner.size() as u32,
        });
        inner.write_into(payload_buf, ctx)
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let version_tc_fl = r.read_u32(Endianness::Big)?;
    let version = (version_tc_fl >> 28) as u8;
    if version != 6 {
        return Err(ParseError::MalformedPacket(format!(
            "expected IPv6 version 6, found {version}"
        )));
    }
    let traffic_class = ((version_tc_fl >> 20) & 0xFF) as u8;
    let flow_label = version_tc_fl & 0xFFFFF;
    let payload_length = r.read_u16(Endianness::Big)? as usize;
    let mut current_type = r.read_u8()?;
    let hop_limit = r.read_u8()?;
    let src = Ipv6Address::from_bytes(r.read_array::<16>()?);
    let dst = Ipv6Address::from_bytes(r.read_array::<16>()?);

    let mut ext_headers = Vec::new();
    let mut consumed = 0usize;
    while is_extension_header(current_type) {
        let ext_type = current_type;
        let next_type = r.read_u8()?;
        let len_byte = r.read_u8()?;
        let total_len = (len_byte as usize + 1) * 8;
        let data = r.read_bytes(total_len - 2)?.to_vec();
        consumed += total_len;
        ext_headers.push(ExtHeader { ext_type, data });
        current_type = next_type;
    }

    let payload_len = payload_length.saturating_sub(consumed).min(r.remaining());
    let payload = r.read_bytes(payload_len)?;
    let inner = Box::new(super::parse_by_ip_proto(current_type, payload)?);

    Ok(Pdu::Ipv6(
        Ipv6 {
            traffic_class,
            flow_label,
            hop_limit,
            src,
            dst,
            ext_headers,
            next_header: current_type,
        },
        inner,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn roundtrips_through_parse() {
        let ip = Ipv6::new("::1".parse().unwrap(), "2001:db8::1".parse().unwrap());
        let stack = Pdu::Ipv6(ip, Box::new(Pdu::Raw(RawPdu::from_slice(b"payload"))));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Ipv6(h, inner) => {
                assert_eq!(h.src, "::1".parse().unwrap());
                assert_eq!(h.dst, "2001:db8::1".parse().unwrap());
                match *inner {
                    Pdu::Raw(r) => assert_eq!(&r.data[..], b"payload"),
                    _ => panic!("expected Raw"),
                }
            }
            _ => panic!("expected Ipv6"),
        }
    }

    #[test]
    fn extension_header_chain_roundtrips() {
        let mut ip = Ipv6::new("fe80::1".parse().unwrap(), "fe80::2".parse().unwrap());
        ip.ext_headers.push(ExtHeader {
            ext_type: HOP_BY_HOP,
            data: vec![0u8; 6],
        });
        let stack = Pdu::Ipv6(ip, Box::new(Pdu::Raw(RawPdu::from_slice(b"hi"))));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Ipv6(h, _) => {
                assert_eq!(h.ext_headers.len(), 1);
                assert_eq!(h.ext_headers[0].ext_type, HOP_BY_HOP);
            }
            _ => panic!("expected Ipv6"),
        }
    }
}
