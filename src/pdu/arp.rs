//! ARP (spec §4.6): fixed 28-byte header, no inner PDU of its own.
//!
//! Grounded in `examples/original_source/include/tins/arp.h`.

use super::{Pdu, SerializeCtx};
use crate::address::{HwAddress, Ipv4Address};
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::Result;

pub type MacAddress = HwAddress<6>;

pub const REQUEST: u16 = 1;
pub const REPLY: u16 = 2;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Arp {
    pub hardware_type: u16,
    pub proto_type: u16,
    pub opcode: u16,
    pub sender_hw: MacAddress,
    pub sender_ip: Ipv4Address,
    pub target_hw: MacAddress,
    pub target_ip: Ipv4Address,
}

impl Arp {
    pub fn new(sender_ip: Ipv4Address, target_ip: Ipv4Address) -> Arp {
        Arp {
            hardware_type: 1, // Ethernet
            proto_type: 0x0800,
            opcode: REQUEST,
            sender_hw: MacAddress::zero(),
            sender_ip,
            target_hw: MacAddress::zero(),
            target_ip,
        }
    }

    pub fn header_size(&self) -> usize {
        28
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let (head, rest) = buf.split_at_mut(self.header_size());
        let mut w = Writer::new(head);
        w.write_u16(self.hardware_type, Endianness::Big)?;
        w.write_u16(self.proto_type, Endianness::Big)?;
        w.write_u8(6)?;
        w.write_u8(4)?;
        w.write_u16(self.opcode, Endianness::Big)?;
        w.write_bytes(&self.sender_hw.octets())?;
        w.write_bytes(&self.sender_ip.octets())?;
        w.write_bytes(&self.target_hw.octets())?;
        w.write_bytes(&self.target_ip.octets())?;
        inner.write_into(rest, ctx)
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let hardware_type = r.read_u16(Endianness::Big)?;
    let proto_type = r.read_u16(Endianness::Big)?;
    let hw_len = r.read_u8()?;
    let proto_len = r.read_u8()?;
    let opcode = r.read_u16(Endianness::Big)?;
    let sender_hw = MacAddress::from_bytes(r.read_array::<6>()?);
    let sender_ip = Ipv4Address::from_bytes(r.read_array::<4>()?);
    let target_hw = MacAddress::from_bytes(r.read_array::<6>()?);
    let target_ip = Ipv4Address::from_bytes(r.read_array::<4>()?);
    let _ = (hw_len, proto_len);

    let inner = Box::new(Pdu::Raw(super::raw::RawPdu::from_slice(r.rest())));
    Ok(Pdu::Arp(
        Arp {
            hardware_type,
            proto_type,
            opcode,
            sender_hw,
            sender_ip,
            target_hw,
            target_ip,
        },
        inner,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn roundtrips_request() {
        let arp = Arp::new("192.168.0.1".parse().unwrap(), "192.168.0.2".parse().unwrap());
        let stack = Pdu::Arp(arp, Box::new(Pdu::Raw(RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        assert_eq!(bytes.len(), 28);
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Arp(h, _) => {
                assert_eq!(h.opcode, REQUEST);
                assert_eq!(h.sender_ip, "192.168.0.1".parse().unwrap());
            }
            _ => panic!("expected Arp"),
        }
    }
}
