//! IPsec AH and ESP (spec §4.6). Neither decrypts: AH carries a
//! variable-length ICV after its fixed 12-byte header and still
//! dispatches its inner PDU by `next_header`; ESP is an opaque
//! pass-through container whose payload is left as [`Pdu::Raw`] since
//! its `next_header` is itself encrypted.
//!
//! Grounded in `examples/original_source/include/tins/ip.h`'s
//! `ah`/`pdu_type::AH`/`ESP` plumbing (tins models these as siblings
//! of `IP`, not as separate option headers).

use super::{Pdu, SerializeCtx};
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::{ParseError, Result};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Ah {
    pub next_header: u8,
    pub reserved: u16,
    pub spi: u32,
    pub sequence: u32,
    pub icv: Vec<u8>,
}

impl Ah {
    pub fn header_size(&self) -> usize {
        12 + self.icv.len()
    }

    fn effective_next_header(&self, inner: &Pdu) -> u8 {
        inner.pdu_type().to_ip_proto().unwrap_or(self.next_header)
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let hs = self.header_size();
        if (hs / 4) < 2 {
            return Err(ParseError::SerializationError(
                "AH header too short to express a payload length".into(),
            ));
        }
        let (head, rest) = buf.split_at_mut(hs);
        let mut w = Writer::new(head);
        w.write_u8(self.effective_next_header(inner))?;
        w.write_u8((hs / 4 - 2) as u8)?;
        w.write_u16(self.reserved, Endianness::Big)?;
        w.write_u32(self.spi, Endianness::Big)?;
        w.write_u32(self.sequence, Endianness::Big)?;
        w.write_bytes(&self.icv)?;
        inner.write_into(rest, ctx)
    }
}

pub fn parse_ah(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let next_header = r.read_u8()?;
    let payload_len = r.read_u8()? as usize;
    let reserved = r.read_u16(Endianness::Big)?;
    let spi = r.read_u32(Endianness::Big)?;
    let sequence = r.read_u32(Endianness::Big)?;
    let total = (payload_len + 2) * 4;
    if total < 12 {
        return Err(ParseError::MalformedPacket(
            "AH payload length smaller than the fixed header".into(),
        ));
    }
    let icv = r.read_bytes(total - 12)?.to_vec();
    let inner = Box::new(super::parse_by_ip_proto(next_header, r.rest())?);
    Ok(Pdu::Ah(
        Ah {
            next_header,
            reserved,
            spi,
            sequence,
            icv,
        },
        inner,
    ))
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Esp {
    pub spi: u32,
    pub sequence: u32,
}

impl Esp {
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
        let mut w = Writer::new(head);
        w.write_u32(self.spi, Endianness::Big)?;
        w.write_u32(self.sequence, Endianness::Big)?;
        inner.write_into(rest, ctx)
    }
}

pub fn parse_esp(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let spi = r.read_u32(Endianness::Big)?;
    let sequence = r.read_u32(Endianness::Big)?;
    // Everything after the header is encrypted; we can't know its
    // `next_header` without the session key, so it stays opaque.
    let inner = Box::new(Pdu::Raw(super::raw::RawPdu::from_slice(r.rest())));
    Ok(Pdu::Esp(Esp { spi, sequence }, inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn ah_roundtrips_with_icv() {
        let ah = Ah {
            next_header: 6,
            reserved: 0,
            spi: 0x1234,
            sequence: 1,
            icv: vec![0xAB; 12],
        };
        let stack = Pdu::Ah(ah, Box::new(Pdu::Raw(RawPdu::from_slice(b"tcp-ish"))));
        let bytes = stack.serialize().unwrap();
        let parsed = parse_ah(&bytes).unwrap();
        match parsed {
            Pdu::Ah(h, _) => {
                assert_eq!(h.spi, 0x1234);
                assert_eq!(h.icv.len(), 12);
            }
            _ => panic!("expected Ah"),
        }
    }

    #[test]
    fn esp_payload_stays_opaque() {
        let esp = Esp { spi: 1, sequence: 1 };
        let stack = Pdu::Esp(esp, Box::new(Pdu::Raw(RawPdu::from_slice(b"ciphertext"))));
        let bytes = stack.serialize().unwrap();
        let parsed = parse_esp(&bytes).unwrap();
        match parsed {
            Pdu::Esp(_, inner) => match *inner {
                Pdu::Raw(r) => assert_eq!(&r.data[..], b"ciphertext"),
                _ => panic!("expected Raw"),
            },
            _ => panic!("expected Esp"),
        }
    }
}
