//! BSD loopback / null encapsulation (`DLT_NULL`/`DLT_LOOP`): a 4-byte
//! address-family value ahead of the payload, in the capturing host's
//! native byte order. We read it little-endian, which matches the
//! overwhelming majority of captures (x86/ARM hosts); preserving the
//! exact 4 bytes rather than reinterpreting them keeps re-serialization
//! byte-identical regardless of which order the original writer used.
//!
//! Grounded in `examples/original_source/include/tins/loopback.h`.

use super::{Pdu, SerializeCtx};
use crate::cursor::{Reader, Writer};
use crate::error::Result;

const AF_INET: u32 = 2;
const AF_INET6_BSD: u32 = 28;
const AF_INET6_LINUX: u32 = 10;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Loopback {
    pub family_bytes: [u8; 4],
}

impl Loopback {
    pub fn header_size(&self) -> usize {
        4
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let (head, rest) = buf.split_at_mut(4);
        Writer::new(head).write_bytes(&self.family_bytes)?;
        inner.write_into(rest, ctx)
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let family_bytes = r.read_array::<4>()?;
    let family_le = u32::from_le_bytes(family_bytes);

    let rest = r.rest();
    let inner = Box::new(match family_le {
        AF_INET => super::ipv4::parse(rest)?,
        AF_INET6_BSD | AF_INET6_LINUX => super::ipv6::parse(rest)?,
        _ => super::parse_by_ip_version(rest)?,
    });
    Ok(Pdu::Loopback(Loopback { family_bytes }, inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::ipv4::Ipv4;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn roundtrips_ipv4_payload() {
        let lo = Loopback {
            family_bytes: AF_INET.to_le_bytes(),
        };
        let ip = Ipv4::new("127.0.0.1".parse().unwrap(), "127.0.0.1".parse().unwrap());
        let stack = Pdu::Loopback(
            lo,
            Box::new(Pdu::Ipv4(ip, Box::new(Pdu::Raw(RawPdu::from_slice(b"hi"))))),
        );
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Loopback(_, inner) => assert!(matches!(*inner, Pdu::Ipv4(..))),
            _ => panic!("expected Loopback"),
        }
    }
}
