//! Spanning Tree Protocol BPDU (spec §4.6): a fixed 35-byte header, no
//! options, no inner protocol.
//!
//! Grounded in `examples/original_source/include/stp.h`. The four
//! timer fields (`msg_age`, `max_age`, `hello_time`, `fwd_delay`) are
//! stored on the wire in 1/256s units; accessors divide by 256 the
//! same way the source's getters do.

use super::{Pdu, SerializeCtx};
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::Result;

/// The 8-byte bridge/root identifier: a 4-bit priority, 12-bit extended
/// system ID, and a 6-byte MAC address.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BridgeId {
    pub priority: u8,
    pub ext_id: u16,
    pub id: [u8; 6],
}

impl BridgeId {
    fn write(&self, w: &mut Writer) -> Result<()> {
        let word = (u16::from(self.priority & 0xF) << 12) | (self.ext_id & 0x0FFF);
        w.write_u16(word, Endianness::Big)?;
        w.write_bytes(&self.id)
    }

    fn read(r: &mut Reader) -> Result<BridgeId> {
        let word = r.read_u16(Endianness::Big)?;
        let priority = (word >> 12) as u8;
        let ext_id = word & 0x0FFF;
        let id = r.read_array::<6>()?;
        Ok(BridgeId { priority, ext_id, id })
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Stp {
    pub proto_id: u16,
    pub proto_version: u8,
    pub bpdu_type: u8,
    pub bpdu_flags: u8,
    pub root_id: BridgeId,
    pub root_path_cost: u32,
    pub bridge_id: BridgeId,
    pub port_id: u16,
    /// Stored in 1/256s units on the wire; see [`Stp::msg_age`].
    pub msg_age_raw: u16,
    pub max_age_raw: u16,
    pub hello_time_raw: u16,
    pub fwd_delay_raw: u16,
}

impl Stp {
    pub fn header_size(&self) -> usize {
        35
    }

    pub fn msg_age(&self) -> u16 {
        self.msg_age_raw / 256
    }

    pub fn max_age(&self) -> u16 {
        self.max_age_raw / 256
    }

    pub fn hello_time(&self) -> u16 {
        self.hello_time_raw / 256
    }

    pub fn fwd_delay(&self) -> u16 {
        self.fwd_delay_raw / 256
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let (head, rest) = buf.split_at_mut(35);
        {
            let mut w = Writer::new(head);
            w.write_u16(self.proto_id, Endianness::Big)?;
            w.write_u8(self.proto_version)?;
            w.write_u8(self.bpdu_type)?;
            w.write_u8(self.bpdu_flags)?;
            self.root_id.write(&mut w)?;
            w.write_u32(self.root_path_cost, Endianness::Big)?;
            self.bridge_id.write(&mut w)?;
            w.write_u16(self.port_id, Endianness::Big)?;
            w.write_u16(self.msg_age_raw, Endianness::Big)?;
            w.write_u16(self.max_age_raw, Endianness::Big)?;
            w.write_u16(self.hello_time_raw, Endianness::Big)?;
            w.write_u16(self.fwd_delay_raw, Endianness::Big)?;
        }
        inner.write_into(rest, ctx)
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let proto_id = r.read_u16(Endianness::Big)?;
    let proto_version = r.read_u8()?;
    let bpdu_type = r.read_u8()?;
    let bpdu_flags = r.read_u8()?;
    let root_id = BridgeId::read(&mut r)?;
    let root_path_cost = r.read_u32(Endianness::Big)?;
    let bridge_id = BridgeId::read(&mut r)?;
    let port_id = r.read_u16(Endianness::Big)?;
    let msg_age_raw = r.read_u16(Endianness::Big)?;
    let max_age_raw = r.read_u16(Endianness::Big)?;
    let hello_time_raw = r.read_u16(Endianness::Big)?;
    let fwd_delay_raw = r.read_u16(Endianness::Big)?;

    let inner = Box::new(Pdu::Raw(super::raw::RawPdu::from_slice(r.rest())));
    Ok(Pdu::Stp(
        Stp {
            proto_id,
            proto_version,
            bpdu_type,
            bpdu_flags,
            root_id,
            root_path_cost,
            bridge_id,
            port_id,
            msg_age_raw,
            max_age_raw,
            hello_time_raw,
            fwd_delay_raw,
        },
        inner,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    fn sample() -> Stp {
        Stp {
            proto_id: 0,
            proto_version: 0,
            bpdu_type: 0,
            bpdu_flags: 0,
            root_id: BridgeId {
                priority: 8,
                ext_id: 0,
                id: [1, 2, 3, 4, 5, 6],
            },
            root_path_cost: 4,
            bridge_id: BridgeId {
                priority: 8,
                ext_id: 0,
                id: [1, 2, 3, 4, 5, 6],
            },
            port_id: 0x8001,
            msg_age_raw: 0,
            max_age_raw: 20 * 256,
            hello_time_raw: 2 * 256,
            fwd_delay_raw: 15 * 256,
        }
    }

    #[test]
    fn timer_fields_divide_by_256() {
        let stp = sample();
        assert_eq!(stp.max_age(), 20);
        assert_eq!(stp.hello_time(), 2);
        assert_eq!(stp.fwd_delay(), 15);
    }

    #[test]
    fn roundtrips_bridge_ids() {
        let stp = sample();
        let stack = Pdu::Stp(stp, Box::new(Pdu::Raw(RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        assert_eq!(bytes.len(), 35);
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Stp(h, _) => {
                assert_eq!(h.root_id.priority, 8);
                assert_eq!(h.bridge_id.id, [1, 2, 3, 4, 5, 6]);
                assert_eq!(h.port_id, 0x8001);
            }
            _ => panic!("expected Stp"),
        }
    }
}
