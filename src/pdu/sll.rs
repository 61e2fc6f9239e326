//! Linux "cooked" capture encapsulation (`DLT_LINUX_SLL`), used when a
//! capture has no fixed link-layer header (e.g. the "any" pseudo-device).
//!
//! Grounded in `examples/original_source/include/tins/sll.h`.

use super::{Pdu, SerializeCtx};
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::Result;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Sll {
    pub packet_type: u16,
    pub arphrd_type: u16,
    pub addr_len: u16,
    pub addr: [u8; 8],
    /// The wire EtherType, preserved/recomputed like
    /// [`super::ethernet::EthernetII::ethertype`].
    pub protocol: u16,
}

impl Sll {
    pub fn header_size(&self) -> usize {
        16
    }

    fn effective_protocol(&self, inner: &Pdu) -> u16 {
        inner.pdu_type().to_ethertype().unwrap_or(self.protocol)
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let (head, rest) = buf.split_at_mut(16);
        let mut w = Writer::new(head);
        w.write_u16(self.packet_type, Endianness::Big)?;
        w.write_u16(self.arphrd_type, Endianness::Big)?;
        w.write_u16(self.addr_len, Endianness::Big)?;
        w.write_bytes(&self.addr)?;
        w.write_u16(self.effective_protocol(inner), Endianness::Big)?;
        inner.write_into(rest, ctx)
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let packet_type = r.read_u16(Endianness::Big)?;
    let arphrd_type = r.read_u16(Endianness::Big)?;
    let addr_len = r.read_u16(Endianness::Big)?;
    let addr = r.read_array::<8>()?;
    let protocol = r.read_u16(Endianness::Big)?;

    let inner = Box::new(super::parse_by_ethertype(protocol, r.rest())?);
    Ok(Pdu::Sll(
        Sll {
            packet_type,
            arphrd_type,
            addr_len,
            addr,
            protocol,
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
        let sll = Sll {
            packet_type: 0,
            arphrd_type: 1,
            addr_len: 6,
            addr: [0xAA; 8],
            protocol: 0x0800,
        };
        let stack = Pdu::Sll(sll, Box::new(Pdu::Raw(RawPdu::from_slice(&[1, 2, 3, 4, 5, 6]))));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Sll(h, _) => assert_eq!(h.protocol, 0x0800),
            _ => panic!("expected Sll"),
        }
    }
}
