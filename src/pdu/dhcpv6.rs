//! DHCPv6 (spec §4.6). Client/server messages and relay messages
//! (`RELAY-FORW`/`RELAY-REPL`) have different fixed headers; both are
//! followed by a `(u16 tag, u16 length)` option TLV list.
//!
//! Grounded in `examples/original_source/include/tins/dhcpv6.h`.
//! Structured option payloads (IA_NA, IA_TA, IA_ADDR, Status Code, …)
//! are exposed as raw bytes with a couple of typed accessors rather
//! than fully modeled sub-structures, to keep the option list generic
//! like every other TLV-bearing header in this module.

use super::{Pdu, SerializeCtx};
use crate::address::Ipv6Address;
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::{ParseError, Result};
use crate::option::{OptionOwner, PduOption};

pub const SOLICIT: u8 = 1;
pub const ADVERTISE: u8 = 2;
pub const REQUEST: u8 = 3;
pub const CONFIRM: u8 = 4;
pub const RENEW: u8 = 5;
pub const REBIND: u8 = 6;
pub const REPLY: u8 = 7;
pub const RELEASE: u8 = 8;
pub const DECLINE: u8 = 9;
pub const RECONFIGURE: u8 = 10;
pub const INFORMATION_REQUEST: u8 = 11;
pub const RELAY_FORW: u8 = 12;
pub const RELAY_REPL: u8 = 13;

pub const OPT_CLIENTID: u16 = 1;
pub const OPT_SERVERID: u16 = 2;
pub const OPT_IA_NA: u16 = 3;
pub const OPT_IA_TA: u16 = 4;
pub const OPT_IA_ADDR: u16 = 5;
pub const OPT_AUTH: u16 = 11;
pub const OPT_STATUS_CODE: u16 = 13;
pub const OPT_USER_CLASS: u16 = 15;
pub const OPT_VENDOR_CLASS: u16 = 16;

fn is_relay(msg_type: u8) -> bool {
    matches!(msg_type, RELAY_FORW | RELAY_REPL)
}

pub struct Dhcpv6OptionOwner;
impl OptionOwner for Dhcpv6OptionOwner {
    fn endianness() -> Endianness {
        Endianness::Big
    }
}

pub type Dhcpv6Option = PduOption<u16, Dhcpv6OptionOwner>;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Dhcpv6Header {
    ClientServer {
        msg_type: u8,
        transaction_id: [u8; 3],
    },
    Relay {
        msg_type: u8,
        hop_count: u8,
        link_addr: Ipv6Address,
        peer_addr: Ipv6Address,
    },
}

impl Dhcpv6Header {
    fn size(&self) -> usize {
        match self {
            Dhcpv6Header::ClientServer { .. } => 4,
            Dhcpv6Header::Relay { .. } => 34,
        }
    }

    pub fn msg_type(&self) -> u8 {
        match self {
            Dhcpv6Header::ClientServer { msg_type, .. } => *msg_type,
            Dhcpv6Header::Relay { msg_type, .. } => *msg_type,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Dhcpv6 {
    pub header: Dhcpv6Header,
    pub options: Vec<Dhcpv6Option>,
}

impl Dhcpv6 {
    pub fn header_size(&self) -> usize {
        self.header.size() + self.options.iter().map(|o| 4 + o.data_size()).sum::<usize>()
    }

    pub fn search_option(&self, tag: u16) -> Option<&Dhcpv6Option> {
        self.options.iter().find(|o| o.option() == tag)
    }

    pub fn status_code(&self) -> Result<u16> {
        let opt = self
            .search_option(OPT_STATUS_CODE)
            .ok_or_else(|| ParseError::OptionNotFound("status_code".into()))?;
        let data = opt.data_ptr();
        if data.len() < 2 {
            return Err(ParseError::MalformedOption(
                "status code option shorter than 2 bytes".into(),
            ));
        }
        Ok(u16::from_be_bytes([data[0], data[1]]))
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let hs = self.header_size();
        let (head, rest) = buf.split_at_mut(hs);
        let mut w = Writer::new(head);
        match &self.header {
            Dhcpv6Header::ClientServer {
                msg_type,
                transaction_id,
            } => {
                w.write_u8(*msg_type)?;
                w.write_bytes(transaction_id)?;
            }
            Dhcpv6Header::Relay {
                msg_type,
                hop_count,
                link_addr,
                peer_addr,
            } => {
                w.write_u8(*msg_type)?;
                w.write_u8(*hop_count)?;
                w.write_bytes(&link_addr.octets())?;
                w.write_bytes(&peer_addr.octets())?;
            }
        }
        for opt in &self.options {
            w.write_u16(opt.option(), Endianness::Big)?;
            w.write_u16(opt.data_size() as u16, Endianness::Big)?;
            w.write_bytes(opt.data_ptr())?;
        }
        inner.write_into(rest, ctx)
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let msg_type = r.read_u8()?;
    let header = if is_relay(msg_type) {
        let hop_count = r.read_u8()?;
        let link_addr = Ipv6Address::from_bytes(r.read_array::<16>()?);
        let peer_addr = Ipv6Address::from_bytes(r.read_array::<16>()?);
        Dhcpv6Header::Relay {
            msg_type,
            hop_count,
            link_addr,
            peer_addr,
        }
    } else {
        let transaction_id = r.read_array::<3>()?;
        Dhcpv6Header::ClientServer {
            msg_type,
            transaction_id,
        }
    };

    let mut options = Vec::new();
    while r.remaining() >= 4 {
        let tag = r.read_u16(Endianness::Big)?;
        let len = r.read_u16(Endianness::Big)? as usize;
        let data = r.read_bytes(len)?;
        options.push(Dhcpv6Option::new(tag, data.to_vec())?);
    }

    let inner = Box::new(Pdu::Raw(super::raw::RawPdu::from_slice(r.rest())));
    Ok(Pdu::Dhcpv6(Dhcpv6 { header, options }, inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn client_server_roundtrips() {
        let dhcpv6 = Dhcpv6 {
            header: Dhcpv6Header::ClientServer {
                msg_type: SOLICIT,
                transaction_id: [1, 2, 3],
            },
            options: vec![Dhcpv6Option::new(OPT_STATUS_CODE, vec![0, 0]).unwrap()],
        };
        let stack = Pdu::Dhcpv6(dhcpv6, Box::new(Pdu::Raw(RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Dhcpv6(h, _) => {
                assert_eq!(h.header.msg_type(), SOLICIT);
                assert_eq!(h.status_code().unwrap(), 0);
            }
            _ => panic!("expected Dhcpv6"),
        }
    }

    #[test]
    fn relay_header_roundtrips() {
        let dhcpv6 = Dhcpv6 {
            header: Dhcpv6Header::Relay {
                msg_type: RELAY_FORW,
                hop_count: 1,
                link_addr: "fe80::1".parse().unwrap(),
                peer_addr: "fe80::2".parse().unwrap(),
            },
            options: vec![],
        };
        let stack = Pdu::Dhcpv6(dhcpv6, Box::new(Pdu::Raw(RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        assert_eq!(bytes.len(), 34);
    }
}
