//! ICMP (spec §4.6): fixed 8-byte header, a 4-byte type-specific field,
//! and — for destination-unreachable/time-exceeded/parameter-problem —
//! an optional extensions structure appended as a trailer.
//!
//! Grounded in `examples/original_source/include/tins/icmp.h` and
//! `icmp_extension.h`. The extensions structure's own checksum covers
//! only the structure itself (version/reserved/checksum zeroed + every
//! object), and `validate_extensions` MUST be checked before the
//! objects are trusted.

use super::{Pdu, SerializeCtx};
use crate::cursor::{checksum, checksum_fold, checksum_partial, Reader, Writer};
use crate::error::{ParseError, Result};
use crate::endian::Endianness;

pub const ECHO_REPLY: u8 = 0;
pub const DEST_UNREACHABLE: u8 = 3;
pub const ECHO_REQUEST: u8 = 8;
pub const TIME_EXCEEDED: u8 = 11;
pub const PARAM_PROBLEM: u8 = 12;
pub const TIMESTAMP_REQUEST: u8 = 13;
pub const TIMESTAMP_REPLY: u8 = 14;
pub const INFO_REQUEST: u8 = 15;
pub const INFO_REPLY: u8 = 16;
pub const ADDR_MASK_REQUEST: u8 = 17;
pub const ADDR_MASK_REPLY: u8 = 18;

/// MPLS extension object class/type (RFC 4950).
pub const MPLS_CLASS: u8 = 1;
pub const MPLS_TYPE: u8 = 1;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IcmpExtensionObject {
    pub class: u8,
    pub ext_type: u8,
    pub payload: Vec<u8>,
}

impl IcmpExtensionObject {
    fn wire_len(&self) -> usize {
        4 + self.payload.len()
    }

    /// Decodes this object's payload as an MPLS label stack (RFC 4950):
    /// a sequence of 4-byte label stack entries.
    pub fn mpls_label_stack(&self) -> Result<Vec<u32>> {
        if self.class != MPLS_CLASS || self.ext_type != MPLS_TYPE {
            return Err(ParseError::BadCast {
                expected: "MPLS extension object",
                found: "a different extension object class/type",
            });
        }
        self.payload
            .chunks_exact(4)
            .map(|c| Ok(u32::from_be_bytes(c.try_into().unwrap())))
            .collect()
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IcmpExtensionsStructure {
    pub version: u8,
    pub objects: Vec<IcmpExtensionObject>,
}

impl IcmpExtensionsStructure {
    fn wire_len(&self) -> usize {
        4 + self.objects.iter().map(IcmpExtensionObject::wire_len).sum::<usize>()
    }

    fn write_into(&self, buf: &mut [u8]) -> Result<()> {
        {
            let mut w = Writer::new(buf);
            w.write_u8(self.version << 4)?;
            w.write_u8(0)?;
            w.write_u16(0, Endianness::Big)?; // checksum, patched below
            for obj in &self.objects {
                w.write_u16(obj.wire_len() as u16, Endianness::Big)?;
                w.write_u8(obj.class)?;
                w.write_u8(obj.ext_type)?;
                w.write_bytes(&obj.payload)?;
            }
        }
        let sum = checksum(buf);
        buf[2..4].copy_from_slice(&sum.to_be_bytes());
        Ok(())
    }

    /// Parses and validates an extensions structure occupying the whole
    /// of `buf`. The checksum MUST be verified before any object is
    /// trusted (spec §4.6).
    fn parse(buf: &[u8]) -> Result<IcmpExtensionsStructure> {
        if buf.len() < 4 {
            return Err(ParseError::MalformedPacket(
                "ICMP extensions structure shorter than its fixed header".into(),
            ));
        }
        if checksum(buf) != 0 {
            return Err(ParseError::MalformedPacket(
                "ICMP extensions structure checksum mismatch".into(),
            ));
        }
        let mut r = Reader::new(buf);
        let version = r.read_u8()? >> 4;
        let _reserved = r.read_u8()?;
        let _checksum = r.read_u16(Endianness::Big)?;
        let mut objects = Vec::new();
        while r.remaining() >= 4 {
            let len = r.read_u16(Endianness::Big)? as usize;
            let class = r.read_u8()?;
            let ext_type = r.read_u8()?;
            if len < 4 || len - 4 > r.remaining() {
                return Err(ParseError::MalformedPacket(
                    "ICMP extension object length extends past the structure".into(),
                ));
            }
            let payload = r.read_bytes(len - 4)?.to_vec();
            objects.push(IcmpExtensionObject {
                class,
                ext_type,
                payload,
            });
        }
        Ok(IcmpExtensionsStructure { version, objects })
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Icmp {
    pub icmp_type: u8,
    pub code: u8,
    /// The type-specific 4 bytes following the checksum: echo
    /// identifier+sequence, a gateway address, or unused.
    pub rest_of_header: u32,
    pub extensions: Option<IcmpExtensionsStructure>,
}

impl Icmp {
    pub fn echo_request(id: u16, seq: u16) -> Icmp {
        Icmp {
            icmp_type: ECHO_REQUEST,
            code: 0,
            rest_of_header: (u32::from(id) << 16) | u32::from(seq),
            extensions: None,
        }
    }

    pub fn header_size(&self) -> usize {
        8
    }

    /// Padding appended after the inner PDU so the "original datagram"
    /// portion lands on a 4-byte boundary before the extensions
    /// structure, per RFC 4884 §4.3. Zero when there are no extensions.
    fn padding_len(&self, payload_len: usize) -> usize {
        if self.extensions.is_some() {
            (4 - payload_len % 4) % 4
        } else {
            0
        }
    }

    pub fn trailer_size(&self, inner: &Pdu) -> usize {
        match &self.extensions {
            None => 0,
            Some(ext) => self.padding_len(inner.size()) + ext.wire_len(),
        }
    }

    /// Pairs an echo/timestamp/info/address-mask request with its reply.
    pub fn matches_response(&self, other: &Icmp) -> bool {
        let pair_ok = matches!(
            (self.icmp_type, other.icmp_type),
            (ECHO_REQUEST, ECHO_REPLY)
                | (TIMESTAMP_REQUEST, TIMESTAMP_REPLY)
                | (INFO_REQUEST, INFO_REPLY)
                | (ADDR_MASK_REQUEST, ADDR_MASK_REPLY)
        );
        pair_ok && self.rest_of_header == other.rest_of_header
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        _ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let hs = self.header_size();
        let payload_len = inner.size();
        let pad_len = self.padding_len(payload_len);
        let (head, rest) = buf.split_at_mut(hs);
        let (payload_buf, rest2) = rest.split_at_mut(payload_len);
        let (pad_buf, ext_buf) = rest2.split_at_mut(pad_len);

        let rest_of_header = if self.extensions.is_some() {
            let words = (payload_len + pad_len) / 4;
            if words > 0xFF {
                return Err(ParseError::SerializationError(
                    "ICMP original-datagram length exceeds the RFC 4884 length field".into(),
                ));
            }
            with_length_field(self.rest_of_header, words as u8)
        } else {
            self.rest_of_header
        };

        {
            let mut w = Writer::new(head);
            w.write_u8(self.icmp_type)?;
            w.write_u8(self.code)?;
            w.write_u16(0, Endianness::Big)?; // checksum, patched below
            w.write_u32(rest_of_header, Endianness::Big)?;
        }
        inner.write_into(payload_buf, &mut SerializeCtx::default())?;
        pad_buf.fill(0);
        if let Some(ext) = &self.extensions {
            ext.write_into(ext_buf)?;
        }

        let mut sum = checksum_partial(head, 0);
        sum = checksum_partial(payload_buf, sum);
        sum = checksum_partial(pad_buf, sum);
        sum = checksum_partial(ext_buf, sum);
        let folded = checksum_fold(sum);
        head[2..4].copy_from_slice(&folded.to_be_bytes());
        Ok(())
    }
}

/// The RFC 4884 "length" byte occupies the second byte of `rest_of_header`
/// (the fields either side are left for type-specific use, e.g. the
/// next-hop MTU in a code-4 Destination Unreachable).
fn length_field(rest_of_header: u32) -> u8 {
    ((rest_of_header >> 16) & 0xFF) as u8
}

fn with_length_field(rest_of_header: u32, words: u8) -> u32 {
    (rest_of_header & 0xFF00_FFFF) | (u32::from(words) << 16)
}

fn carries_extensions(icmp_type: u8) -> bool {
    matches!(icmp_type, DEST_UNREACHABLE | TIME_EXCEEDED | PARAM_PROBLEM)
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let icmp_type = r.read_u8()?;
    let code = r.read_u8()?;
    let _checksum = r.read_u16(Endianness::Big)?;
    let rest_of_header = r.read_u32(Endianness::Big)?;

    let body = r.rest();
    let (payload, extensions) = if carries_extensions(icmp_type) {
        let len_words = length_field(rest_of_header) as usize;
        if len_words > 0 {
            // RFC 4884: the length field gives the exact size, in
            // 32-bit words, of the padded original-datagram portion
            // that precedes the extensions structure.
            let payload_len = len_words * 4;
            if payload_len <= body.len() {
                match IcmpExtensionsStructure::parse(&body[payload_len..]) {
                    Ok(ext) => (&body[..payload_len], Some(ext)),
                    Err(_) => (body, None),
                }
            } else {
                (body, None)
            }
        } else {
            // Older senders may leave the length field unset; fall back
            // to treating the tail as an extensions structure only if
            // it validates under its own checksum.
            match IcmpExtensionsStructure::parse(body) {
                Ok(ext) => (&body[0..0], Some(ext)),
                Err(_) => (body, None),
            }
        }
    } else {
        (body, None)
    };

    let inner = Box::new(Pdu::Raw(super::raw::RawPdu::from_slice(payload)));
    Ok(Pdu::Icmp(
        Icmp {
            icmp_type,
            code,
            rest_of_header,
            extensions,
        },
        inner,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    #[test]
    fn echo_request_reply_match() {
        let req = Icmp::echo_request(1, 1);
        let mut reply = req.clone();
        reply.icmp_type = ECHO_REPLY;
        assert!(req.matches_response(&reply));
    }

    #[test]
    fn time_exceeded_with_extensions_splits_on_the_rfc4884_length_field() {
        let icmp = Icmp {
            icmp_type: TIME_EXCEEDED,
            code: 0,
            rest_of_header: 0,
            extensions: Some(IcmpExtensionsStructure {
                version: 2,
                objects: vec![IcmpExtensionObject {
                    class: MPLS_CLASS,
                    ext_type: MPLS_TYPE,
                    payload: vec![0, 0, 0x10, 0x01],
                }],
            }),
        };
        // 7 bytes of original datagram -> padded to 8 (2 words) by the
        // length field, not 7, since RFC 4884 requires 4-byte alignment.
        let stack = Pdu::Icmp(icmp, Box::new(Pdu::Raw(RawPdu::from_slice(b"abcdefg"))));
        let bytes = stack.serialize().unwrap();

        let rest_of_header = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(length_field(rest_of_header), 2);

        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Icmp(h, inner) => {
                assert_eq!(h.icmp_type, TIME_EXCEEDED);
                assert!(h.extensions.is_some());
                match *inner {
                    // The trailing pad byte comes back as part of the
                    // raw payload -- the length field describes the
                    // padded original datagram, not the MSDU itself.
                    Pdu::Raw(r) => assert_eq!(&r.data[..], b"abcdefg\0"),
                    _ => panic!("expected Raw"),
                }
            }
            _ => panic!("expected Icmp"),
        }
    }

    #[test]
    fn roundtrips_through_parse() {
        let icmp = Icmp::echo_request(0x1234, 1);
        let stack = Pdu::Icmp(icmp, Box::new(Pdu::Raw(RawPdu::from_slice(b"ping"))));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Icmp(h, inner) => {
                assert_eq!(h.icmp_type, ECHO_REQUEST);
                match *inner {
                    Pdu::Raw(r) => assert_eq!(&r.data[..], b"ping"),
                    _ => panic!("expected Raw"),
                }
            }
            _ => panic!("expected Icmp"),
        }
    }
}
