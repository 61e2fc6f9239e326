//! UDP (spec §4.6): fixed 8-byte header. The inner PDU is always
//! [`Pdu::Raw`], same rationale as [`super::tcp`].
//!
//! Grounded in `examples/original_source/include/tins/udp.h`: a computed
//! checksum of exactly zero is transmitted as `0xFFFF` (RFC 768's "no
//! checksum" value is reserved, so an all-zero result is folded up).

use super::{Pdu, SerializeCtx};
use crate::cursor::{checksum_fold, checksum_partial, Reader, Writer};
use crate::endian::Endianness;
use crate::error::Result;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Udp {
    pub sport: u16,
    pub dport: u16,
}

impl Udp {
    pub fn new(sport: u16, dport: u16) -> Udp {
        Udp { sport, dport }
    }

    pub fn header_size(&self) -> usize {
        8
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let (head, rest) = buf.split_at_mut(8);
        let length = 8 + inner.size();
        {
            let mut w = Writer::new(head);
            w.write_u16(self.sport, Endianness::Big)?;
            w.write_u16(self.dport, Endianness::Big)?;
            w.write_u16(length as u16, Endianness::Big)?;
            w.write_u16(0, Endianness::Big)?; // checksum, patched below
        }

        inner.write_into(rest, ctx)?;

        let mut sum = match (&ctx.ipv4_pseudo, &ctx.ipv6_pseudo) {
            (Some(p), _) => p.checksum_seed(),
            (None, Some(p)) => p.checksum_seed(),
            (None, None) => 0,
        };
        sum = checksum_partial(head, sum);
        sum = checksum_partial(rest, sum);
        let folded = checksum_fold(sum);
        let checksum = if folded == 0 { 0xFFFF } else { folded };
        head[6..8].copy_from_slice(&checksum.to_be_bytes());
        Ok(())
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let sport = r.read_u16(Endianness::Big)?;
    let dport = r.read_u16(Endianness::Big)?;
    let _length = r.read_u16(Endianness::Big)?;
    let _checksum = r.read_u16(Endianness::Big)?;
    let inner = Box::new(Pdu::Raw(super::raw::RawPdu::from_slice(r.rest())));
    Ok(Pdu::Udp(Udp { sport, dport }, inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn length_field_covers_header_and_payload() {
        let udp = Udp::new(68, 67);
        let stack = Pdu::Udp(udp, Box::new(Pdu::Raw(RawPdu::from_slice(b"hello"))));
        let bytes = stack.serialize().unwrap();
        let length = u16::from_be_bytes([bytes[4], bytes[5]]);
        assert_eq!(length as usize, 8 + 5);
    }

    #[test]
    fn computed_checksum_is_never_transmitted_as_literal_zero() {
        // RFC 768 reserves an all-zero checksum field to mean "no
        // checksum"; a UDP sender that computes zero must send 0xFFFF.
        let udp = Udp::new(68, 67);
        let stack = Pdu::Udp(udp, Box::new(Pdu::Raw(RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        let checksum = u16::from_be_bytes([bytes[6], bytes[7]]);
        assert_ne!(checksum, 0);
    }
}
