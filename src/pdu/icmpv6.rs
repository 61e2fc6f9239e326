//! ICMPv6 (spec §4.6): shares ICMP's 4-byte fixed prefix, but checksums
//! under the IPv6 pseudo-header and carries a typed option list for the
//! neighbor-discovery message family.
//!
//! Grounded in `examples/original_source/include/tins/icmpv6.h`: NDP
//! messages that carry a target address (neighbor solicitation/
//! advertisement, redirect) have 4 reserved bytes before it; every NDP
//! message may then be followed by a typed option list whose length
//! field is expressed in units of 8 bytes (inclusive of the type+length
//! bytes themselves), which is exactly the unit override
//! [`PduOption::with_length_field`] exists for. MLDv2 (RFC 3810) is laid
//! out separately: a report's "address" slot carries a count of
//! multicast-address records instead, and a query's carries the
//! suppress/QRV/QQIC subfields plus a source-address list rather than
//! the generic TLV option list the NDP messages use.

use super::{Pdu, SerializeCtx};
use crate::address::Ipv6Address;
use crate::cursor::{checksum_fold, checksum_partial, Reader, Writer};
use crate::endian::Endianness;
use crate::error::{ParseError, Result};
use crate::option::{OptionOwner, PduOption};

pub const ECHO_REQUEST: u8 = 128;
pub const ECHO_REPLY: u8 = 129;
pub const MLD_QUERY: u8 = 130;
pub const MLD_REPORT_V1: u8 = 131;
pub const ROUTER_SOLICIT: u8 = 133;
pub const ROUTER_ADVERT: u8 = 134;
pub const NEIGHBOR_SOLICIT: u8 = 135;
pub const NEIGHBOR_ADVERT: u8 = 136;
pub const REDIRECT: u8 = 137;
pub const MLD_REPORT_V2: u8 = 143;

pub const OPT_SOURCE_LINK_ADDR: u8 = 1;
pub const OPT_TARGET_LINK_ADDR: u8 = 2;
pub const OPT_PREFIX_INFO: u8 = 3;
pub const OPT_MTU: u8 = 5;

/// Types whose 4-byte "rest of header" slot is actually a reserved field
/// followed by a 16-byte address (spec §4.6's "`has_target_addr` depends
/// on the type field"). MLD_QUERY's multicast-address field sits in the
/// same wire position, so it belongs here even though the rest of its
/// layout (suppress/QRV/QQIC, source list) is handled separately in
/// [`parse`]/[`Icmpv6::write_into`] rather than through the generic
/// options path.
fn has_target_addr(icmp_type: u8) -> bool {
    matches!(
        icmp_type,
        NEIGHBOR_SOLICIT | NEIGHBOR_ADVERT | REDIRECT | MLD_QUERY
    )
}

/// Types that carry the generic 8-byte-unit TLV option list. MLD_QUERY
/// is deliberately excluded: its trailer is a source-address list with
/// packed subfields, not this option format.
fn carries_options(icmp_type: u8) -> bool {
    matches!(
        icmp_type,
        ROUTER_SOLICIT | ROUTER_ADVERT | NEIGHBOR_SOLICIT | NEIGHBOR_ADVERT | REDIRECT
    )
}

/// A single multicast address record from an MLDv2 Multicast Listener
/// Report (RFC 3810 §5.2). `aux_data` is carried verbatim rather than
/// interpreted — RFC 3810 reserves its contents for future use.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MulticastAddressRecord {
    pub record_type: u8,
    pub multicast_address: Ipv6Address,
    pub sources: Vec<Ipv6Address>,
    pub aux_data: Vec<u8>,
}

impl MulticastAddressRecord {
    fn wire_len(&self) -> usize {
        20 + self.sources.len() * 16 + self.aux_data.len()
    }
}

pub struct Icmpv6OptionOwner;
impl OptionOwner for Icmpv6OptionOwner {
    fn endianness() -> Endianness {
        Endianness::Big
    }
}

pub type Icmpv6Option = PduOption<u8, Icmpv6OptionOwner>;

fn option_wire_len(opt: &Icmpv6Option) -> usize {
    2 + opt.data_size()
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Icmpv6 {
    pub icmp_type: u8,
    pub code: u8,
    /// The 4 bytes after the checksum for message types with no target
    /// address (echo id/seq, RA's cur_hop_limit/flags/lifetime, etc).
    pub rest_of_header: u32,
    /// Target address (NS/NA/Redirect) or multicast address (MLD
    /// query), per [`has_target_addr`].
    pub target_addr: Option<Ipv6Address>,
    pub options: Vec<Icmpv6Option>,
    /// Populated only for [`MLD_REPORT_V2`]; empty for every other type.
    pub mld_records: Vec<MulticastAddressRecord>,
    /// MLD query's Maximum Response Code; `None` for every other type.
    pub mld_max_resp_code: Option<u16>,
    /// MLD query's Suppress Router-Side Processing flag.
    pub mld_suppress: bool,
    /// MLD query's Querier's Robustness Variable (3 bits).
    pub mld_qrv: u8,
    /// MLD query's Querier's Query Interval Code.
    pub mld_qqic: u8,
    /// MLD query's source-address list.
    pub mld_sources: Vec<Ipv6Address>,
}

impl Icmpv6 {
    pub fn echo_request(id: u16, seq: u16) -> Icmpv6 {
        Icmpv6 {
            icmp_type: ECHO_REQUEST,
            code: 0,
            rest_of_header: (u32::from(id) << 16) | u32::from(seq),
            target_addr: None,
            options: Vec::new(),
            mld_records: Vec::new(),
            mld_max_resp_code: None,
            mld_suppress: false,
            mld_qrv: 0,
            mld_qqic: 0,
            mld_sources: Vec::new(),
        }
    }

    pub fn neighbor_solicitation(target: Ipv6Address) -> Icmpv6 {
        Icmpv6 {
            icmp_type: NEIGHBOR_SOLICIT,
            code: 0,
            rest_of_header: 0,
            target_addr: Some(target),
            options: Vec::new(),
            mld_records: Vec::new(),
            mld_max_resp_code: None,
            mld_suppress: false,
            mld_qrv: 0,
            mld_qqic: 0,
            mld_sources: Vec::new(),
        }
    }

    pub fn mldv2_report(records: Vec<MulticastAddressRecord>) -> Icmpv6 {
        Icmpv6 {
            icmp_type: MLD_REPORT_V2,
            code: 0,
            rest_of_header: 0,
            target_addr: None,
            options: Vec::new(),
            mld_records: records,
            mld_max_resp_code: None,
            mld_suppress: false,
            mld_qrv: 0,
            mld_qqic: 0,
            mld_sources: Vec::new(),
        }
    }

    pub fn mldv2_query(multicast_address: Ipv6Address, max_resp_code: u16, sources: Vec<Ipv6Address>) -> Icmpv6 {
        Icmpv6 {
            icmp_type: MLD_QUERY,
            code: 0,
            rest_of_header: 0,
            target_addr: Some(multicast_address),
            options: Vec::new(),
            mld_records: Vec::new(),
            mld_max_resp_code: Some(max_resp_code),
            mld_suppress: false,
            mld_qrv: 0,
            mld_qqic: 0,
            mld_sources: sources,
        }
    }

    pub fn header_size(&self) -> usize {
        if self.icmp_type == MLD_REPORT_V2 {
            return 8 + self.mld_records.iter().map(|r| r.wire_len()).sum::<usize>();
        }
        if self.icmp_type == MLD_QUERY {
            return 8 + 16 + 4 + self.mld_sources.len() * 16;
        }
        let mut size = 8;
        if self.target_addr.is_some() {
            size += 16;
        }
        size += self.options.iter().map(option_wire_len).sum::<usize>();
        size
    }

    pub fn search_option(&self, tag: u8) -> Option<&Icmpv6Option> {
        self.options.iter().find(|o| o.option() == tag)
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let hs = self.header_size();
        let (head, rest) = buf.split_at_mut(hs);
        {
            let mut w = Writer::new(head);
            w.write_u8(self.icmp_type)?;
            w.write_u8(self.code)?;
            w.write_u16(0, Endianness::Big)?; // checksum, patched below

            if self.icmp_type == MLD_REPORT_V2 {
                w.write_u16(0, Endianness::Big)?; // reserved
                w.write_u16(self.mld_records.len() as u16, Endianness::Big)?;
                for rec in &self.mld_records {
                    w.write_u8(rec.record_type)?;
                    w.write_u8((rec.aux_data.len() / 4) as u8)?;
                    w.write_u16(rec.sources.len() as u16, Endianness::Big)?;
                    w.write_bytes(&rec.multicast_address.octets())?;
                    for src in &rec.sources {
                        w.write_bytes(&src.octets())?;
                    }
                    w.write_bytes(&rec.aux_data)?;
                }
            } else if self.icmp_type == MLD_QUERY {
                w.write_u16(self.mld_max_resp_code.unwrap_or(0), Endianness::Big)?;
                w.write_u16(0, Endianness::Big)?; // reserved
                let addr = self.target_addr.unwrap_or_else(|| Ipv6Address::from_bytes([0; 16]));
                w.write_bytes(&addr.octets())?;
                let flags = ((self.mld_suppress as u8) << 3) | (self.mld_qrv & 0x07);
                w.write_u8(flags)?;
                w.write_u8(self.mld_qqic)?;
                w.write_u16(self.mld_sources.len() as u16, Endianness::Big)?;
                for src in &self.mld_sources {
                    w.write_bytes(&src.octets())?;
                }
            } else if let Some(target) = self.target_addr {
                w.write_u32(0, Endianness::Big)?; // reserved
                w.write_bytes(&target.octets())?;
            } else {
                w.write_u32(self.rest_of_header, Endianness::Big)?;
            }

            for opt in &self.options {
                let total = option_wire_len(opt);
                w.write_u8(opt.option())?;
                w.write_u8((total / 8) as u8)?;
                w.write_bytes(opt.data_ptr())?;
            }
        }

        inner.write_into(rest, ctx)?;

        let mut sum = ctx.ipv6_pseudo.as_ref().map_or(0, |p| p.checksum_seed());
        sum = checksum_partial(head, sum);
        sum = checksum_partial(rest, sum);
        let folded = checksum_fold(sum);
        head[2..4].copy_from_slice(&folded.to_be_bytes());
        Ok(())
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let icmp_type = r.read_u8()?;
    let code = r.read_u8()?;
    let _checksum = r.read_u16(Endianness::Big)?;

    if icmp_type == MLD_REPORT_V2 {
        let _reserved = r.read_u16(Endianness::Big)?;
        let num_records = r.read_u16(Endianness::Big)?;
        let mut mld_records = Vec::with_capacity(num_records as usize);
        for _ in 0..num_records {
            let record_type = r.read_u8()?;
            let aux_len = r.read_u8()? as usize;
            let num_sources = r.read_u16(Endianness::Big)? as usize;
            let multicast_address = Ipv6Address::from_bytes(r.read_array::<16>()?);
            let mut sources = Vec::with_capacity(num_sources);
            for _ in 0..num_sources {
                sources.push(Ipv6Address::from_bytes(r.read_array::<16>()?));
            }
            let aux_data = r.read_bytes(aux_len * 4)?.to_vec();
            mld_records.push(MulticastAddressRecord {
                record_type,
                multicast_address,
                sources,
                aux_data,
            });
        }
        let inner = Box::new(Pdu::Raw(super::raw::RawPdu::from_slice(r.rest())));
        return Ok(Pdu::Icmpv6(
            Icmpv6 {
                icmp_type,
                code,
                rest_of_header: 0,
                target_addr: None,
                options: Vec::new(),
                mld_records,
                mld_max_resp_code: None,
                mld_suppress: false,
                mld_qrv: 0,
                mld_qqic: 0,
                mld_sources: Vec::new(),
            },
            inner,
        ));
    }

    if icmp_type == MLD_QUERY {
        let max_resp_code = r.read_u16(Endianness::Big)?;
        let _reserved = r.read_u16(Endianness::Big)?;
        let multicast_address = Ipv6Address::from_bytes(r.read_array::<16>()?);
        let flags = r.read_u8()?;
        let qqic = r.read_u8()?;
        let num_sources = r.read_u16(Endianness::Big)? as usize;
        let mut mld_sources = Vec::with_capacity(num_sources);
        for _ in 0..num_sources {
            mld_sources.push(Ipv6Address::from_bytes(r.read_array::<16>()?));
        }
        let inner = Box::new(Pdu::Raw(super::raw::RawPdu::from_slice(r.rest())));
        return Ok(Pdu::Icmpv6(
            Icmpv6 {
                icmp_type,
                code,
                rest_of_header: 0,
                target_addr: Some(multicast_address),
                options: Vec::new(),
                mld_records: Vec::new(),
                mld_max_resp_code: Some(max_resp_code),
                mld_suppress: flags & 0x08 != 0,
                mld_qrv: flags & 0x07,
                mld_qqic: qqic,
                mld_sources,
            },
            inner,
        ));
    }

    let (rest_of_header, target_addr) = if has_target_addr(icmp_type) {
        let _reserved = r.read_u32(Endianness::Big)?;
        (0, Some(Ipv6Address::from_bytes(r.read_array::<16>()?)))
    } else {
        (r.read_u32(Endianness::Big)?, None)
    };

    let mut options = Vec::new();
    if carries_options(icmp_type) {
        while r.remaining() >= 8 {
            let tag = r.read_u8()?;
            let len_units = r.read_u8()? as usize;
            if len_units == 0 {
                return Err(ParseError::MalformedOption(
                    "ICMPv6 option length of zero".into(),
                ));
            }
            let total = len_units * 8;
            let payload = r.read_bytes(total - 2)?;
            options.push(Icmpv6Option::new(tag, payload.to_vec())?);
        }
    }

    let inner = Box::new(Pdu::Raw(super::raw::RawPdu::from_slice(r.rest())));
    Ok(Pdu::Icmpv6(
        Icmpv6 {
            icmp_type,
            code,
            rest_of_header,
            target_addr,
            options,
            mld_records: Vec::new(),
            mld_max_resp_code: None,
            mld_suppress: false,
            mld_qrv: 0,
            mld_qqic: 0,
            mld_sources: Vec::new(),
        },
        inner,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn neighbor_solicitation_roundtrips_with_options() {
        let mut ns = Icmpv6::neighbor_solicitation("fe80::1".parse().unwrap());
        ns.options
            .push(Icmpv6Option::new(OPT_SOURCE_LINK_ADDR, vec![0xAA; 6]).unwrap());
        let stack = Pdu::Icmpv6(ns, Box::new(Pdu::Raw(RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Icmpv6(h, _) => {
                assert_eq!(h.icmp_type, NEIGHBOR_SOLICIT);
                assert_eq!(h.target_addr, Some("fe80::1".parse().unwrap()));
                assert_eq!(h.options.len(), 1);
            }
            _ => panic!("expected Icmpv6"),
        }
    }

    #[test]
    fn mldv2_report_roundtrips_with_records() {
        let records = vec![
            MulticastAddressRecord {
                record_type: 4, // MODE_IS_EXCLUDE
                multicast_address: "ff02::1:ff00:1".parse().unwrap(),
                sources: vec!["2001:db8::1".parse().unwrap(), "2001:db8::2".parse().unwrap()],
                aux_data: Vec::new(),
            },
            MulticastAddressRecord {
                record_type: 1,
                multicast_address: "ff02::1:ff00:2".parse().unwrap(),
                sources: Vec::new(),
                aux_data: vec![0xAB, 0xCD, 0xEF, 0x01],
            },
        ];
        let report = Icmpv6::mldv2_report(records.clone());
        let stack = Pdu::Icmpv6(report, Box::new(Pdu::Raw(RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Icmpv6(h, _) => {
                assert_eq!(h.icmp_type, MLD_REPORT_V2);
                assert_eq!(h.mld_records, records);
            }
            _ => panic!("expected Icmpv6"),
        }
    }

    #[test]
    fn mldv2_query_roundtrips_with_sources_and_subfields() {
        let mut query = Icmpv6::mldv2_query(
            "ff02::1".parse().unwrap(),
            1000,
            vec!["2001:db8::1".parse().unwrap()],
        );
        query.mld_suppress = true;
        query.mld_qrv = 5;
        query.mld_qqic = 42;
        let stack = Pdu::Icmpv6(query, Box::new(Pdu::Raw(RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Icmpv6(h, _) => {
                assert_eq!(h.icmp_type, MLD_QUERY);
                assert_eq!(h.target_addr, Some("ff02::1".parse().unwrap()));
                assert_eq!(h.mld_max_resp_code, Some(1000));
                assert!(h.mld_suppress);
                assert_eq!(h.mld_qrv, 5);
                assert_eq!(h.mld_qqic, 42);
                assert_eq!(h.mld_sources, vec!["2001:db8::1".parse().unwrap()]);
            }
            _ => panic!("expected Icmpv6"),
        }
    }
}
