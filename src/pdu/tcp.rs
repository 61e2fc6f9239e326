//! TCP (spec §4.6 + §4.8): option-bearing transport header. The inner
//! PDU is always [`Pdu::Raw`] — the registry (§4.5) has no port-keyed
//! flavor, so TCP never dispatches into a higher-level protocol on its
//! own.
//!
//! Grounded in `examples/original_source/include/tins/tcp.h`: the
//! option TLV discipline (kind 0 = EOL, kind 1 = NOP, everything else
//! carries a length byte *inclusive* of the kind+length bytes) and the
//! pseudo-header checksum shared with UDP.

use super::{Pdu, SerializeCtx};
use crate::cursor::{checksum_fold, checksum_partial, Reader, Writer};
use crate::endian::Endianness;
use crate::error::{ParseError, Result};
use crate::option::{parse_tlv_options, OptionOwner, PduOption};

pub const FIN: u16 = 1 << 0;
pub const SYN: u16 = 1 << 1;
pub const RST: u16 = 1 << 2;
pub const PSH: u16 = 1 << 3;
pub const ACK: u16 = 1 << 4;
pub const URG: u16 = 1 << 5;
pub const ECE: u16 = 1 << 6;
pub const CWR: u16 = 1 << 7;
pub const NS: u16 = 1 << 8;

pub const OPT_EOL: u8 = 0;
pub const OPT_NOP: u8 = 1;

pub struct TcpOptionOwner;
impl OptionOwner for TcpOptionOwner {
    fn endianness() -> Endianness {
        Endianness::Big
    }
}

pub type TcpOption = PduOption<u8, TcpOptionOwner>;

fn round_up4(n: usize) -> usize {
    (n + 3) & !3
}

fn option_wire_len(opt: &TcpOption) -> usize {
    match opt.option() {
        OPT_EOL | OPT_NOP => 1,
        _ => 2 + opt.data_size(),
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tcp {
    pub sport: u16,
    pub dport: u16,
    pub seq: u32,
    pub ack_seq: u32,
    pub flags: u16,
    pub window: u16,
    pub urgent_ptr: u16,
    pub options: Vec<TcpOption>,
}

impl Tcp {
    pub fn new(sport: u16, dport: u16) -> Tcp {
        Tcp {
            sport,
            dport,
            seq: 0,
            ack_seq: 0,
            flags: 0,
            window: 0,
            urgent_ptr: 0,
            options: Vec::new(),
        }
    }

    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    fn options_len(&self) -> usize {
        self.options.iter().map(option_wire_len).sum()
    }

    pub fn header_size(&self) -> usize {
        20 + round_up4(self.options_len())
    }

    pub fn add_option(&mut self, option: TcpOption) {
        self.options.push(option);
    }

    pub fn search_option(&self, tag: u8) -> Option<&TcpOption> {
        self.options.iter().find(|o| o.option() == tag)
    }

    pub fn remove_option(&mut self, tag: u8) -> bool {
        let before = self.options.len();
        self.options.retain(|o| o.option() != tag);
        self.options.len() != before
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let hs = self.header_size();
        if hs > 0xF * 4 {
            return Err(ParseError::SerializationError(
                "TCP header too large to express in a 4-bit data offset".into(),
            ));
        }
        let (head, rest) = buf.split_at_mut(hs);
        {
            let mut w = Writer::new(head);
            w.write_u16(self.sport, Endianness::Big)?;
            w.write_u16(self.dport, Endianness::Big)?;
            w.write_u32(self.seq, Endianness::Big)?;
            w.write_u32(self.ack_seq, Endianness::Big)?;
            let data_offset = (hs / 4) as u8;
            let ns = ((self.flags >> 8) & 1) as u8;
            w.write_u8((data_offset << 4) | ns)?;
            w.write_u8((self.flags & 0xFF) as u8)?;
            w.write_u16(self.window, Endianness::Big)?;
            w.write_u16(0, Endianness::Big)?; // checksum, patched below
            w.write_u16(self.urgent_ptr, Endianness::Big)?;
            for opt in &self.options {
                match opt.option() {
                    OPT_EOL | OPT_NOP => w.write_u8(opt.option())?,
                    tag => {
                        w.write_u8(tag)?;
                        w.write_u8((2 + opt.data_size()) as u8)?;
                        w.write_bytes(opt.data_ptr())?;
                    }
                }
            }
            let written = self.options_len();
            w.fill(round_up4(written) - written, OPT_NOP)?;
        }

        inner.write_into(rest, ctx)?;

        let mut sum = match (&ctx.ipv4_pseudo, &ctx.ipv6_pseudo) {
            (Some(p), _) => p.checksum_seed(),
            (None, Some(p)) => p.checksum_seed(),
            (None, None) => 0,
        };
        sum = checksum_partial(head, sum);
        sum = checksum_partial(rest, sum);
        let sum = checksum_fold(sum);
        head[16..18].copy_from_slice(&sum.to_be_bytes());
        Ok(())
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let sport = r.read_u16(Endianness::Big)?;
    let dport = r.read_u16(Endianness::Big)?;
    let seq = r.read_u32(Endianness::Big)?;
    let ack_seq = r.read_u32(Endianness::Big)?;
    let byte12 = r.read_u8()?;
    let data_offset = (byte12 >> 4) as usize * 4;
    let ns = u16::from(byte12 & 1);
    let flag_byte = r.read_u8()?;
    let flags = (ns << 8) | u16::from(flag_byte);
    let window = r.read_u16(Endianness::Big)?;
    let _checksum = r.read_u16(Endianness::Big)?;
    let urgent_ptr = r.read_u16(Endianness::Big)?;

    if data_offset < 20 {
        return Err(ParseError::MalformedPacket(format!(
            "TCP data offset too small: {data_offset} bytes"
        )));
    }
    let opts_len = data_offset - 20;
    let mut opt_reader = r.narrow(opts_len)?;
    let mut options = Vec::new();
    while opt_reader.remaining() > 0 {
        let tag = opt_reader.read_u8()?;
        match tag {
            OPT_EOL => break,
            OPT_NOP => continue,
            _ => {
                let len = opt_reader.read_u8()? as usize;
                if len < 2 {
                    return Err(ParseError::MalformedOption(format!(
                        "TCP option length {len} smaller than the kind+length bytes"
                    )));
                }
                let payload = opt_reader.read_bytes(len - 2)?;
                options.push(TcpOption::new(tag, payload.to_vec())?);
            }
        }
    }

    let inner = Box::new(Pdu::Raw(super::raw::RawPdu::from_slice(r.rest())));
    Ok(Pdu::Tcp(
        Tcp {
            sport,
            dport,
            seq,
            ack_seq,
            flags,
            window,
            urgent_ptr,
            options,
        },
        inner,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Ipv4Address;
    use crate::pdu::ipv4::Ipv4;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn checksum_and_ports_survive_ip_wrapped_roundtrip() {
        // S6: IP / TCP / RawPDU -- TCP checksum folds to 0xFFFF under a
        // correctly-set-up pseudo header, and a re-parse yields the same
        // stack.
        let ip = Ipv4::new(
            Ipv4Address::from_bytes([1, 2, 3, 4]),
            Ipv4Address::from_bytes([5, 6, 7, 8]),
        );
        let mut tcp = Tcp::new(1234, 80);
        tcp.flags = SYN;
        let stack = Pdu::Ipv4(
            ip,
            Box::new(Pdu::Tcp(
                tcp,
                Box::new(Pdu::Raw(RawPdu::from_slice(b"abcdef"))),
            )),
        );
        let bytes = stack.serialize().unwrap();
        let parsed = crate::pdu::ipv4::parse(&bytes).unwrap();
        match parsed {
            Pdu::Ipv4(_, inner) => match *inner {
                Pdu::Tcp(t, _) => {
                    assert_eq!(t.sport, 1234);
                    assert_eq!(t.dport, 80);
                    assert!(t.has_flag(SYN));
                }
                _ => panic!("expected Tcp"),
            },
            _ => panic!("expected Ipv4"),
        }
    }

    #[test]
    fn options_padded_with_nops_to_4_byte_boundary() {
        let mut tcp = Tcp::new(1, 2);
        tcp.add_option(TcpOption::new(8, vec![0u8; 8]).unwrap()); // timestamp-shaped, 10 bytes
        assert_eq!(tcp.header_size() % 4, 0);
    }
}
