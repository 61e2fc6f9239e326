//! Ethernet II framing.
//!
//! Grounded in `examples/original_source/include/tins/ethernetII.h`: the
//! 802.3-vs-EthernetII heuristic (bytes 12-13 < 0x0600 means 802.3/LLC),
//! and zero-padding short frames up to the 60-byte minimum.

use super::{dot3, Pdu, SerializeCtx};
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::Result;
use bytes::Bytes;

pub use crate::address::MacAddress;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EthernetII {
    pub dst: MacAddress,
    pub src: MacAddress,
    /// The wire EtherType. Recomputed from the inner PDU's type on
    /// serialize when that type maps to a known EtherType; preserved
    /// verbatim (for round-tripping unrecognized tags) otherwise.
    pub ethertype: u16,
}

impl EthernetII {
    pub fn new(dst: MacAddress, src: MacAddress) -> EthernetII {
        EthernetII {
            dst,
            src,
            ethertype: 0,
        }
    }

    pub fn header_size(&self) -> usize {
        14
    }

    pub fn trailer_size(&self, inner: &Pdu) -> usize {
        let total = self.header_size() + inner.size();
        if total < 60 {
            60 - total
        } else {
            0
        }
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
        let hs = self.header_size();
        let trailer = self.trailer_size(inner);
        let (head, rest) = buf.split_at_mut(hs);
        let mut w = Writer::new(head);
        w.write_bytes(&self.dst.octets())?;
        w.write_bytes(&self.src.octets())?;
        w.write_u16(self.effective_ethertype(inner), Endianness::Big)?;

        let payload_len = rest.len() - trailer;
        let (payload_buf, pad_buf) = rest.split_at_mut(payload_len);
        inner.write_into(payload_buf, ctx)?;
        if trailer > 0 {
            pad_buf.fill(0);
        }
        Ok(())
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let dst = MacAddress::from_bytes(r.read_array::<6>()?);
    let src = MacAddress::from_bytes(r.read_array::<6>()?);
    let ethertype = r.read_u16(Endianness::Big)?;

    if ethertype < 0x0600 {
        // This is actually an 802.3 length field, not an EtherType.
        return dot3::parse(data);
    }

    let rest = r.rest();
    let inner = Box::new(super::parse_by_ethertype(ethertype, rest)?);
    Ok(Pdu::EthernetII(
        EthernetII { dst, src, ethertype },
        inner,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn pads_short_frames_to_60_bytes() {
        let eth = EthernetII::new(
            "ff:ff:ff:ff:ff:ff".parse().unwrap(),
            "00:11:22:33:44:55".parse().unwrap(),
        );
        let stack = Pdu::EthernetII(eth, Box::new(Pdu::Raw(RawPdu::from_slice(b"hi"))));
        let bytes = stack.serialize().unwrap();
        assert_eq!(bytes.len(), 60);
    }

    #[test]
    fn roundtrips_through_parse() {
        let eth = EthernetII {
            dst: "ff:ff:ff:ff:ff:ff".parse().unwrap(),
            src: "00:11:22:33:44:55".parse().unwrap(),
            ethertype: 0x0800,
        };
        // pdu_type of inner (Raw) doesn't map to an ethertype, so the
        // stored tag is preserved on serialize.
        let original = Pdu::EthernetII(
            eth,
            Box::new(Pdu::Raw(RawPdu::from_slice(&[1, 2, 3, 4, 5, 6]))),
        );
        let bytes = original.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::EthernetII(h, _) => assert_eq!(h.ethertype, 0x0800),
            _ => panic!("expected EthernetII"),
        }
    }
}
