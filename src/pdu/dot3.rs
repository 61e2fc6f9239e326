//! 802.3 + LLC + SNAP: the "length" framing used when EtherType < 0x0600.
//!
//! Grounded in `examples/original_source/include/tins/dot3.h` and
//! `snap.h`: the 802.3 length field covers everything after it (LLC +
//! SNAP + payload); LLC unnumbered-information frames carry
//! `dsap=ssap=0xAA, control=0x03` when a SNAP header follows.

use super::ethernet::MacAddress;
use super::{Pdu, SerializeCtx};
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::Result;

pub const SNAP_DSAP: u8 = 0xAA;
pub const SNAP_SSAP: u8 = 0xAA;
pub const LLC_UI_CONTROL: u8 = 0x03;

/// LLC SAP used by Spanning Tree BPDUs (IEEE 802.1D).
pub const STP_DSAP: u8 = 0x42;
pub const STP_SSAP: u8 = 0x42;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Snap {
    pub oui: [u8; 3],
    pub ethertype: u16,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Dot3 {
    pub dst: MacAddress,
    pub src: MacAddress,
    pub dsap: u8,
    pub ssap: u8,
    pub control: u8,
    pub snap: Option<Snap>,
}

impl Dot3 {
    pub fn header_size(&self) -> usize {
        14 + 3 + self.snap.as_ref().map_or(0, |_| 5)
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
        w.write_bytes(&self.dst.octets())?;
        w.write_bytes(&self.src.octets())?;
        let llc_len = (hs - 14) + inner.size();
        w.write_u16(llc_len as u16, Endianness::Big)?;
        w.write_u8(self.dsap)?;
        w.write_u8(self.ssap)?;
        w.write_u8(self.control)?;
        if let Some(snap) = &self.snap {
            w.write_bytes(&snap.oui)?;
            let ethertype = inner.pdu_type().to_ethertype().unwrap_or(snap.ethertype);
            w.write_u16(ethertype, Endianness::Big)?;
        }
        inner.write_into(rest, ctx)
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let dst = MacAddress::from_bytes(r.read_array::<6>()?);
    let src = MacAddress::from_bytes(r.read_array::<6>()?);
    let _length = r.read_u16(Endianness::Big)?;
    let dsap = r.read_u8()?;
    let ssap = r.read_u8()?;
    let control = r.read_u8()?;

    let (snap, inner) = if dsap == SNAP_DSAP && ssap == SNAP_SSAP && control == LLC_UI_CONTROL {
        let oui = r.read_array::<3>()?;
        let ethertype = r.read_u16(Endianness::Big)?;
        let inner = super::parse_by_ethertype(ethertype, r.rest())?;
        (Some(Snap { oui, ethertype }), inner)
    } else if dsap == STP_DSAP && ssap == STP_SSAP {
        (None, super::stp::parse(r.rest())?)
    } else {
        let inner = Pdu::Raw(super::raw::RawPdu::from_slice(r.rest()));
        (None, inner)
    };

    Ok(Pdu::Dot3(
        Dot3 {
            dst,
            src,
            dsap,
            ssap,
            control,
            snap,
        },
        Box::new(inner),
    ))
}

/// Parses a bare LLC+SNAP header with no preceding Ethernet-style
/// addresses -- the shape a decrypted 802.11 data frame's body takes,
/// since the MAC addresses already live in the 802.11 header (spec
/// §4.9 "Integration with PDU stack": "re-parse the payload through
/// the protocol registry, starting with LLC+SNAP").
pub fn parse_llc_snap(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let dsap = r.read_u8()?;
    let ssap = r.read_u8()?;
    let control = r.read_u8()?;
    if dsap == SNAP_DSAP && ssap == SNAP_SSAP && control == LLC_UI_CONTROL {
        let oui = r.read_array::<3>()?;
        let ethertype = r.read_u16(Endianness::Big)?;
        super::parse_by_ethertype(ethertype, r.rest())
    } else {
        Ok(Pdu::Raw(super::raw::RawPdu::from_slice(r.rest())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn length_field_covers_llc_and_payload() {
        let dot3 = Dot3 {
            dst: "ff:ff:ff:ff:ff:ff".parse().unwrap(),
            src: "00:11:22:33:44:55".parse().unwrap(),
            dsap: SNAP_DSAP,
            ssap: SNAP_SSAP,
            control: LLC_UI_CONTROL,
            snap: Some(Snap {
                oui: [0, 0, 0],
                ethertype: 0x0800,
            }),
        };
        let stack = Pdu::Dot3(dot3, Box::new(Pdu::Raw(RawPdu::from_slice(b"abcd"))));
        let bytes = stack.serialize().unwrap();
        let len = u16::from_be_bytes([bytes[12], bytes[13]]);
        assert_eq!(len as usize, 3 + 5 + 4);
    }
}
