//! PPPoE (RFC 2516, spec §4.6): discovery and session stages share a
//! 6-byte fixed header (version/type nibbles, code, session_id,
//! length); discovery-stage frames additionally carry a TLV tag list
//! (PPPoE "tags"), while session-stage frames carry a raw PPP payload.
//!
//! No PPPoE header exists in `examples/original_source`; this module
//! follows RFC 2516 directly, in the same TLV-over-fixed-header shape
//! as [`super::dhcp`] and [`super::dot3`]'s SNAP header.

use super::{Pdu, PduType, SerializeCtx};
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::{ParseError, Result};
use crate::option::{OptionOwner, PduOption};

pub const CODE_PADI: u8 = 0x09;
pub const CODE_PADO: u8 = 0x07;
pub const CODE_PADR: u8 = 0x19;
pub const CODE_PADS: u8 = 0x65;
pub const CODE_PADT: u8 = 0xA7;
pub const CODE_SESSION: u8 = 0x00;

pub const TAG_END_OF_LIST: u16 = 0x0000;
pub const TAG_SERVICE_NAME: u16 = 0x0101;
pub const TAG_AC_NAME: u16 = 0x0102;
pub const TAG_HOST_UNIQ: u16 = 0x0103;
pub const TAG_AC_COOKIE: u16 = 0x0104;
pub const TAG_GENERIC_ERROR: u16 = 0x0203;

pub struct PppoeTagOwner;
impl OptionOwner for PppoeTagOwner {
    fn endianness() -> Endianness {
        Endianness::Big
    }
}

pub type PppoeTag = PduOption<u16, PppoeTagOwner>;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Discovery {
    pub code: u8,
    pub session_id: u16,
    pub tags: Vec<PppoeTag>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Session {
    pub session_id: u16,
    /// The 2-byte PPP protocol ID wrapping `inner`; 0xC021 LCP, 0xC023
    /// PAP, 0x8021 IPCP, 0x0021 IPv4, 0x0057 IPv6.
    pub ppp_protocol: u16,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Pppoe {
    Discovery { version: u8, type_: u8, body: Discovery },
    Session { version: u8, type_: u8, body: Session },
}

impl Pppoe {
    pub fn pdu_type(&self) -> PduType {
        match self {
            Pppoe::Discovery { .. } => PduType::PppoeDiscovery,
            Pppoe::Session { .. } => PduType::PppoeSession,
        }
    }

    fn discovery_payload_len(body: &Discovery) -> usize {
        body.tags.iter().map(|t| 4 + t.data_size()).sum()
    }

    /// Fixed 8 bytes for a session frame; for discovery frames, the
    /// 6-byte header plus the tag list (which doesn't depend on the
    /// inner PDU).
    pub fn header_size(&self) -> usize {
        match self {
            Pppoe::Discovery { body, .. } => 6 + Self::discovery_payload_len(body),
            Pppoe::Session { .. } => 8,
        }
    }

    pub fn search_tag(&self, tag: u16) -> Option<&PppoeTag> {
        match self {
            Pppoe::Discovery { body, .. } => body.tags.iter().find(|t| t.option() == tag),
            Pppoe::Session { .. } => None,
        }
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        match self {
            Pppoe::Discovery { version, type_, body } => {
                let mut w = Writer::new(buf);
                w.write_u8((version << 4) | (type_ & 0xF))?;
                w.write_u8(body.code)?;
                w.write_u16(body.session_id, Endianness::Big)?;
                w.write_u16(Self::discovery_payload_len(body) as u16, Endianness::Big)?;
                for tag in &body.tags {
                    w.write_u16(tag.option(), Endianness::Big)?;
                    w.write_u16(tag.data_size() as u16, Endianness::Big)?;
                    w.write_bytes(tag.data_ptr())?;
                }
                Ok(())
            }
            Pppoe::Session { version, type_, body } => {
                let (head, rest) = buf.split_at_mut(8);
                {
                    let mut w = Writer::new(head);
                    w.write_u8((version << 4) | (type_ & 0xF))?;
                    w.write_u8(CODE_SESSION)?;
                    w.write_u16(body.session_id, Endianness::Big)?;
                    w.write_u16((2 + inner.size()) as u16, Endianness::Big)?;
                    w.write_u16(body.ppp_protocol, Endianness::Big)?;
                }
                inner.write_into(rest, ctx)
            }
        }
    }
}

pub fn parse_discovery(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let byte0 = r.read_u8()?;
    let version = byte0 >> 4;
    let type_ = byte0 & 0xF;
    let code = r.read_u8()?;
    let session_id = r.read_u16(Endianness::Big)?;
    let length = r.read_u16(Endianness::Big)? as usize;

    let mut tag_reader = r.narrow(length.min(r.remaining()))?;
    let mut tags = Vec::new();
    while tag_reader.remaining() >= 4 {
        let tag = tag_reader.read_u16(Endianness::Big)?;
        let len = tag_reader.read_u16(Endianness::Big)? as usize;
        let payload = tag_reader.read_bytes(len)?;
        tags.push(PppoeTag::new(tag, payload.to_vec())?);
    }

    let inner = Box::new(Pdu::Raw(super::raw::RawPdu::empty()));
    Ok(Pdu::Pppoe(
        Pppoe::Discovery {
            version,
            type_,
            body: Discovery {
                code,
                session_id,
                tags,
            },
        },
        inner,
    ))
}

pub fn parse_session(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let byte0 = r.read_u8()?;
    let version = byte0 >> 4;
    let type_ = byte0 & 0xF;
    let code = r.read_u8()?;
    if code != CODE_SESSION {
        return Err(ParseError::MalformedPacket(format!(
            "PPPoE session frame carried discovery code {code:#x}"
        )));
    }
    let session_id = r.read_u16(Endianness::Big)?;
    let _length = r.read_u16(Endianness::Big)?;
    let ppp_protocol = r.read_u16(Endianness::Big)?;

    let inner = Box::new(match ppp_protocol {
        0x0021 => super::parse_by_ip_version(r.rest())?,
        _ => Pdu::Raw(super::raw::RawPdu::from_slice(r.rest())),
    });
    Ok(Pdu::Pppoe(
        Pppoe::Session {
            version,
            type_,
            body: Session {
                session_id,
                ppp_protocol,
            },
        },
        inner,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn discovery_tag_roundtrips() {
        let disco = Pppoe::Discovery {
            version: 1,
            type_: 1,
            body: Discovery {
                code: CODE_PADI,
                session_id: 0,
                tags: vec![PppoeTag::new(TAG_SERVICE_NAME, Vec::new()).unwrap()],
            },
        };
        let stack = Pdu::Pppoe(disco, Box::new(Pdu::Raw(RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        let parsed = parse_discovery(&bytes).unwrap();
        match parsed {
            Pdu::Pppoe(h, _) => {
                assert_eq!(h.pdu_type(), PduType::PppoeDiscovery);
                assert!(h.search_tag(TAG_SERVICE_NAME).is_some());
            }
            _ => panic!("expected Pppoe"),
        }
    }

    #[test]
    fn session_frame_carries_ipv4_payload() {
        let session = Pppoe::Session {
            version: 1,
            type_: 1,
            body: Session {
                session_id: 0xBEEF,
                ppp_protocol: 0x0021,
            },
        };
        let ip = crate::pdu::ipv4::Ipv4::new(
            crate::address::Ipv4Address::from_bytes([1, 1, 1, 1]),
            crate::address::Ipv4Address::from_bytes([2, 2, 2, 2]),
        );
        let stack = Pdu::Pppoe(
            session,
            Box::new(Pdu::Ipv4(ip, Box::new(Pdu::Raw(RawPdu::empty())))),
        );
        let bytes = stack.serialize().unwrap();
        let parsed = parse_session(&bytes).unwrap();
        match parsed {
            Pdu::Pppoe(h, inner) => {
                assert_eq!(h.pdu_type(), PduType::PppoeSession);
                assert!(matches!(*inner, Pdu::Ipv4(_, _)));
            }
            _ => panic!("expected Pppoe"),
        }
    }
}
