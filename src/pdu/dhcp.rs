//! BootP / DHCP (spec §4.6): the fixed 236-byte BootP header, the
//! 4-byte magic cookie `0x63825363`, then a DHCP option TLV list where
//! `PAD`(0) and `END`(255) carry no length byte.
//!
//! Grounded in `examples/original_source/include/tins/bootp.h` and
//! `dhcp.h`. Typed convenience accessors (`lease_time`, `router`, …)
//! are thin wrappers over [`crate::option::PduOption::to`].

use super::{Pdu, SerializeCtx};
use crate::address::Ipv4Address;
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::{ParseError, Result};
use crate::option::{OptionDecode, OptionOwner, PduOption};

pub const MAGIC_COOKIE: u32 = 0x63825363;

pub const OPT_PAD: u8 = 0;
pub const OPT_SUBNET_MASK: u8 = 1;
pub const OPT_ROUTERS: u8 = 3;
pub const OPT_DNS_SERVERS: u8 = 6;
pub const OPT_HOSTNAME: u8 = 12;
pub const OPT_REQUESTED_IP: u8 = 50;
pub const OPT_LEASE_TIME: u8 = 51;
pub const OPT_MESSAGE_TYPE: u8 = 53;
pub const OPT_SERVER_IDENTIFIER: u8 = 54;
pub const OPT_END: u8 = 255;

pub struct DhcpOptionOwner;
impl OptionOwner for DhcpOptionOwner {
    fn endianness() -> Endianness {
        Endianness::Big
    }
}

pub type DhcpOption = PduOption<u8, DhcpOptionOwner>;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Dhcp {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: Ipv4Address,
    pub yiaddr: Ipv4Address,
    pub siaddr: Ipv4Address,
    pub giaddr: Ipv4Address,
    pub chaddr: [u8; 16],
    pub sname: [u8; 64],
    pub file: [u8; 128],
    pub options: Vec<DhcpOption>,
}

impl Dhcp {
    pub fn header_size(&self) -> usize {
        236 + 4 + self.options_wire_len()
    }

    fn options_wire_len(&self) -> usize {
        self.options
            .iter()
            .map(|o| match o.option() {
                OPT_PAD | OPT_END => 1,
                _ => 2 + o.data_size(),
            })
            .sum::<usize>()
            + 1 // trailing END
    }

    pub fn search_option(&self, tag: u8) -> Option<&DhcpOption> {
        self.options.iter().find(|o| o.option() == tag)
    }

    fn typed_option<T: OptionDecode<DhcpOptionOwner>>(&self, tag: u8, name: &str) -> Result<T> {
        self.search_option(tag)
            .ok_or_else(|| ParseError::OptionNotFound(name.to_string()))?
            .to()
    }

    pub fn lease_time(&self) -> Result<u32> {
        self.typed_option(OPT_LEASE_TIME, "lease_time")
    }

    pub fn server_identifier(&self) -> Result<Ipv4Address> {
        self.typed_option(OPT_SERVER_IDENTIFIER, "server_identifier")
    }

    pub fn routers(&self) -> Result<Vec<Ipv4Address>> {
        self.typed_option(OPT_ROUTERS, "routers")
    }

    pub fn message_type(&self) -> Result<u8> {
        self.typed_option(OPT_MESSAGE_TYPE, "message_type")
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
        w.write_u8(self.op)?;
        w.write_u8(self.htype)?;
        w.write_u8(self.hlen)?;
        w.write_u8(self.hops)?;
        w.write_u32(self.xid, Endianness::Big)?;
        w.write_u16(self.secs, Endianness::Big)?;
        w.write_u16(self.flags, Endianness::Big)?;
        w.write_bytes(&self.ciaddr.octets())?;
        w.write_bytes(&self.yiaddr.octets())?;
        w.write_bytes(&self.siaddr.octets())?;
        w.write_bytes(&self.giaddr.octets())?;
        w.write_bytes(&self.chaddr)?;
        w.write_bytes(&self.sname)?;
        w.write_bytes(&self.file)?;
        w.write_u32(MAGIC_COOKIE, Endianness::Big)?;
        for opt in &self.options {
            match opt.option() {
                OPT_PAD | OPT_END => w.write_u8(opt.option())?,
                tag => {
                    w.write_u8(tag)?;
                    w.write_u8(opt.data_size() as u8)?;
                    w.write_bytes(opt.data_ptr())?;
                }
            }
        }
        w.write_u8(OPT_END)?;
        inner.write_into(rest, ctx)
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let op = r.read_u8()?;
    let htype = r.read_u8()?;
    let hlen = r.read_u8()?;
    let hops = r.read_u8()?;
    let xid = r.read_u32(Endianness::Big)?;
    let secs = r.read_u16(Endianness::Big)?;
    let flags = r.read_u16(Endianness::Big)?;
    let ciaddr = Ipv4Address::from_bytes(r.read_array::<4>()?);
    let yiaddr = Ipv4Address::from_bytes(r.read_array::<4>()?);
    let siaddr = Ipv4Address::from_bytes(r.read_array::<4>()?);
    let giaddr = Ipv4Address::from_bytes(r.read_array::<4>()?);
    let chaddr = r.read_array::<16>()?;
    let sname = r.read_array::<64>()?;
    let file = r.read_array::<128>()?;

    let mut options = Vec::new();
    if r.remaining() >= 4 {
        let cookie = r.read_u32(Endianness::Big)?;
        if cookie != MAGIC_COOKIE {
            return Err(ParseError::MalformedPacket(
                "DHCP magic cookie mismatch".into(),
            ));
        }
        loop {
            let tag = match r.read_u8() {
                Ok(t) => t,
                Err(_) => break,
            };
            match tag {
                OPT_PAD => continue,
                OPT_END => break,
                _ => {
                    let len = r.read_u8()? as usize;
                    let payload = r.read_bytes(len)?;
                    options.push(DhcpOption::new(tag, payload.to_vec())?);
                }
            }
        }
    }

    let inner = Box::new(Pdu::Raw(super::raw::RawPdu::from_slice(r.rest())));
    Ok(Pdu::Dhcp(
        Dhcp {
            op,
            htype,
            hlen,
            hops,
            xid,
            secs,
            flags,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            sname,
            file,
            options,
        },
        inner,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    fn empty_dhcp() -> Dhcp {
        Dhcp {
            op: 1,
            htype: 1,
            hlen: 6,
            hops: 0,
            xid: 0x11223344,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Address::from_bytes([0; 4]),
            yiaddr: Ipv4Address::from_bytes([0; 4]),
            siaddr: Ipv4Address::from_bytes([0; 4]),
            giaddr: Ipv4Address::from_bytes([0; 4]),
            chaddr: [0; 16],
            sname: [0; 64],
            file: [0; 128],
            options: Vec::new(),
        }
    }

    #[test]
    fn lease_time_accessor_roundtrips() {
        let mut dhcp = empty_dhcp();
        dhcp.options
            .push(DhcpOption::new(OPT_LEASE_TIME, 3600u32.to_be_bytes().to_vec()).unwrap());
        let stack = Pdu::Dhcp(dhcp, Box::new(Pdu::Raw(RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Dhcp(h, _) => assert_eq!(h.lease_time().unwrap(), 3600),
            _ => panic!("expected Dhcp"),
        }
    }

    #[test]
    fn missing_option_raises_option_not_found() {
        let dhcp = empty_dhcp();
        assert!(matches!(
            dhcp.lease_time(),
            Err(ParseError::OptionNotFound(_))
        ));
    }
}
