//! 802.1Q VLAN tag (spec §4.6). The tag protocol ID (0x8100/0x88A8/
//! 0x9100) that selected this parser was already consumed by the
//! caller's EtherType field; this header is just the 2-byte tag
//! control info plus the inner EtherType.
//!
//! Grounded in `examples/original_source/include/tins/dot1q.h`.

use super::{Pdu, SerializeCtx};
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::Result;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Vlan {
    /// The tag protocol ID that introduced this tag (0x8100 for a
    /// normal 802.1Q tag, 0x88A8/0x9100 for a service-provider Q-in-Q
    /// tag). Preserved from parsing for display purposes; on
    /// serialize the *outer* frame always writes 0x8100 for a `Vlan`
    /// inner PDU, since [`super::PduType::to_ethertype`] maps every
    /// `Vlan` to the single most common tag.
    pub tpid: u16,
    pub priority: u8,
    pub dei: bool,
    pub vlan_id: u16,
    /// The wire EtherType of the inner PDU, preserved/recomputed the
    /// same way as [`super::ethernet::EthernetII::ethertype`].
    pub ethertype: u16,
}

impl Vlan {
    pub fn new(vlan_id: u16) -> Vlan {
        Vlan {
            tpid: 0x8100,
            priority: 0,
            dei: false,
            vlan_id,
            ethertype: 0,
        }
    }

    pub fn header_size(&self) -> usize {
        4
    }

    fn effective_ethertype(&self, inner: &Pdu) -> u16 {
        inner.pdu_type().to_ethertype().unwrap_or(self.ethertype)
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let (head, rest) = buf.split_at_mut(4);
        let mut w = Writer::new(head);
        let tci = (u16::from(self.priority) << 13)
            | (u16::from(self.dei) << 12)
            | (self.vlan_id & 0x0FFF);
        w.write_u16(tci, Endianness::Big)?;
        w.write_u16(self.effective_ethertype(inner), Endianness::Big)?;
        inner.write_into(rest, ctx)
    }
}

pub fn parse(data: &[u8], tpid: u16) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let tci = r.read_u16(Endianness::Big)?;
    let priority = (tci >> 13) as u8;
    let dei = (tci >> 12) & 1 != 0;
    let vlan_id = tci & 0x0FFF;
    let ethertype = r.read_u16(Endianness::Big)?;

    let inner = Box::new(super::parse_by_ethertype(ethertype, r.rest())?);
    Ok(Pdu::Vlan(
        Vlan {
            tpid,
            priority,
            dei,
            vlan_id,
            ethertype,
        },
        inner,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn roundtrips_tag_fields() {
        let mut vlan = Vlan::new(42);
        vlan.priority = 5;
        vlan.dei = true;
        vlan.ethertype = 0x0800;
        let stack = Pdu::Vlan(vlan, Box::new(Pdu::Raw(RawPdu::from_slice(b"x"))));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes, 0x8100).unwrap();
        match parsed {
            Pdu::Vlan(h, _) => {
                assert_eq!(h.vlan_id, 42);
                assert_eq!(h.priority, 5);
                assert!(h.dei);
            }
            _ => panic!("expected Vlan"),
        }
    }
}
