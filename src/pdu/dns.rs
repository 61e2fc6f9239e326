//! DNS (spec §4.6): a 12-byte packed-flags header, three record
//! sections, and label compression via pointers into the message.
//!
//! Grounded in `examples/original_source/include/tins/dns.h`. Unlike
//! every other PDU here, a DNS message is self-contained — there's no
//! further protocol nested inside it, so [`Dns`] always wraps an empty
//! [`super::raw::RawPdu`]. Resource-record data is decoded eagerly into
//! a closed [`RData`] per common type (A/AAAA/CNAME/NS/PTR/MX/SOA);
//! anything else stays as raw bytes. Decoding follows compression
//! pointers (the top two bits of a length byte); encoding always writes
//! full uncompressed labels, which is wire-valid but not
//! space-optimal.

use super::{Pdu, SerializeCtx};
use crate::address::{Ipv4Address, Ipv6Address};
use crate::error::{ParseError, Result};

pub const TYPE_A: u16 = 1;
pub const TYPE_NS: u16 = 2;
pub const TYPE_CNAME: u16 = 5;
pub const TYPE_SOA: u16 = 6;
pub const TYPE_PTR: u16 = 12;
pub const TYPE_MX: u16 = 15;
pub const TYPE_AAAA: u16 = 28;

pub const CLASS_IN: u16 = 1;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RData {
    A(Ipv4Address),
    Aaaa(Ipv6Address),
    Cname(String),
    Ns(String),
    Ptr(String),
    Mx { preference: u16, exchange: String },
    Soa {
        mname: String,
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum_ttl: u32,
    },
    Raw(Vec<u8>),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ResourceRecord {
    pub name: String,
    pub rtype: u16,
    pub rclass: u16,
    pub ttl: u32,
    pub rdata: RData,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Dns {
    pub id: u16,
    pub flags: u16,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl Dns {
    pub fn query(id: u16, name: impl Into<String>, qtype: u16) -> Dns {
        Dns {
            id,
            flags: 0x0100, // RD set
            questions: vec![Question {
                name: name.into(),
                qtype,
                qclass: CLASS_IN,
            }],
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    pub fn qr(&self) -> bool {
        self.flags & 0x8000 != 0
    }

    pub fn opcode(&self) -> u8 {
        ((self.flags >> 11) & 0x0F) as u8
    }

    pub fn aa(&self) -> bool {
        self.flags & 0x0400 != 0
    }

    pub fn tc(&self) -> bool {
        self.flags & 0x0200 != 0
    }

    pub fn rd(&self) -> bool {
        self.flags & 0x0100 != 0
    }

    pub fn ra(&self) -> bool {
        self.flags & 0x0080 != 0
    }

    pub fn rcode(&self) -> u8 {
        (self.flags & 0x0F) as u8
    }

    /// Wire offset of the start of the answer section, i.e. just past
    /// the fixed header and the fully-encoded question section.
    pub fn answers_offset(&self) -> usize {
        12 + self
            .questions
            .iter()
            .map(|q| encode_name(&q.name).len() + 4)
            .sum::<usize>()
    }

    /// Wire offset of the start of the authority section.
    pub fn authority_offset(&self) -> usize {
        self.answers_offset() + self.answers.iter().map(encoded_rr_len).sum::<usize>()
    }

    /// Wire offset of the start of the additional section.
    pub fn additional_offset(&self) -> usize {
        self.authority_offset() + self.authority.iter().map(encoded_rr_len).sum::<usize>()
    }

    /// Appends `rr` to the answer section and returns the wire offset
    /// it will be encoded at. Record-insertion counterpart to the three
    /// section-offset accessors above: a caller building a message
    /// record-by-record (e.g. to cross-reference a record's own offset
    /// from a compression pointer elsewhere) needs the offset *before*
    /// the push changes `authority_offset()`'s answer.
    pub fn push_answer(&mut self, rr: ResourceRecord) -> usize {
        let offset = self.authority_offset();
        self.answers.push(rr);
        offset
    }

    /// Appends `rr` to the authority section and returns its wire offset.
    pub fn push_authority(&mut self, rr: ResourceRecord) -> usize {
        let offset = self.additional_offset();
        self.authority.push(rr);
        offset
    }

    /// Appends `rr` to the additional section and returns its wire offset.
    pub fn push_additional(&mut self, rr: ResourceRecord) -> usize {
        let offset =
            self.additional_offset() + self.additional.iter().map(encoded_rr_len).sum::<usize>();
        self.additional.push(rr);
        offset
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.id.to_be_bytes());
        out.extend_from_slice(&self.flags.to_be_bytes());
        out.extend_from_slice(&(self.questions.len() as u16).to_be_bytes());
        out.extend_from_slice(&(self.answers.len() as u16).to_be_bytes());
        out.extend_from_slice(&(self.authority.len() as u16).to_be_bytes());
        out.extend_from_slice(&(self.additional.len() as u16).to_be_bytes());
        for q in &self.questions {
            out.extend(encode_name(&q.name));
            out.extend_from_slice(&q.qtype.to_be_bytes());
            out.extend_from_slice(&q.qclass.to_be_bytes());
        }
        for rr in self
            .answers
            .iter()
            .chain(self.authority.iter())
            .chain(self.additional.iter())
        {
            encode_rr(rr, &mut out);
        }
        out
    }

    pub fn header_size(&self) -> usize {
        self.encode().len()
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        buf.copy_from_slice(&self.encode());
        inner.write_into(&mut [], ctx)
    }
}

fn encode_name(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    if !name.is_empty() {
        for label in name.split('.') {
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
    }
    out.push(0);
    out
}

fn encode_rr(rr: &ResourceRecord, out: &mut Vec<u8>) {
    out.extend(encode_name(&rr.name));
    out.extend_from_slice(&rr.rtype.to_be_bytes());
    out.extend_from_slice(&rr.rclass.to_be_bytes());
    out.extend_from_slice(&rr.ttl.to_be_bytes());
    let rdata = encode_rdata(&rr.rdata);
    out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    out.extend_from_slice(&rdata);
}

fn encoded_rr_len(rr: &ResourceRecord) -> usize {
    let mut out = Vec::new();
    encode_rr(rr, &mut out);
    out.len()
}

fn encode_rdata(rdata: &RData) -> Vec<u8> {
    match rdata {
        RData::A(a) => a.octets().to_vec(),
        RData::Aaaa(a) => a.octets().to_vec(),
        RData::Cname(name) | RData::Ns(name) | RData::Ptr(name) => encode_name(name),
        RData::Mx { preference, exchange } => {
            let mut out = preference.to_be_bytes().to_vec();
            out.extend(encode_name(exchange));
            out
        }
        RData::Soa {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum_ttl,
        } => {
            let mut out = encode_name(mname);
            out.extend(encode_name(rname));
            out.extend_from_slice(&serial.to_be_bytes());
            out.extend_from_slice(&refresh.to_be_bytes());
            out.extend_from_slice(&retry.to_be_bytes());
            out.extend_from_slice(&expire.to_be_bytes());
            out.extend_from_slice(&minimum_ttl.to_be_bytes());
            out
        }
        RData::Raw(bytes) => bytes.clone(),
    }
}

/// Decodes a domain name starting at `pos` in the full message,
/// following compression pointers. Returns the name and the position
/// just after the name's own bytes at `pos` (not after a followed
/// pointer's target).
fn decode_name(msg: &[u8], mut pos: usize) -> Result<(String, usize)> {
    let mut labels = Vec::new();
    let mut end_pos = None;
    let mut jumps = 0;
    loop {
        let len = *msg
            .get(pos)
            .ok_or_else(|| ParseError::InvalidDomainName("ran off the end of the message".into()))?;
        if len == 0 {
            pos += 1;
            if end_pos.is_none() {
                end_pos = Some(pos);
            }
            break;
        }
        if len & 0xC0 == 0xC0 {
            let lo = *msg.get(pos + 1).ok_or_else(|| {
                ParseError::InvalidDomainName("truncated compression pointer".into())
            })?;
            if end_pos.is_none() {
                end_pos = Some(pos + 2);
            }
            jumps += 1;
            if jumps > 20 {
                return Err(ParseError::InvalidDomainName(
                    "too many compression pointer jumps".into(),
                ));
            }
            pos = ((usize::from(len) & 0x3F) << 8) | usize::from(lo);
            continue;
        }
        let len = usize::from(len);
        pos += 1;
        let label = msg
            .get(pos..pos + len)
            .ok_or_else(|| ParseError::InvalidDomainName("label runs past the message".into()))?;
        labels.push(String::from_utf8_lossy(label).into_owned());
        pos += len;
    }
    Ok((labels.join("."), end_pos.unwrap()))
}

fn decode_rdata(rtype: u16, raw: &[u8], msg: &[u8], raw_start: usize) -> Result<RData> {
    Ok(match rtype {
        TYPE_A if raw.len() == 4 => RData::A(Ipv4Address::from_bytes(raw.try_into().unwrap())),
        TYPE_AAAA if raw.len() == 16 => RData::Aaaa(Ipv6Address::from_bytes(raw.try_into().unwrap())),
        TYPE_CNAME => RData::Cname(decode_name(msg, raw_start)?.0),
        TYPE_NS => RData::Ns(decode_name(msg, raw_start)?.0),
        TYPE_PTR => RData::Ptr(decode_name(msg, raw_start)?.0),
        TYPE_MX if raw.len() >= 2 => {
            let preference = u16::from_be_bytes([raw[0], raw[1]]);
            let (exchange, _) = decode_name(msg, raw_start + 2)?;
            RData::Mx { preference, exchange }
        }
        TYPE_SOA => {
            let (mname, after_mname) = decode_name(msg, raw_start)?;
            let (rname, after_rname) = decode_name(msg, after_mname)?;
            let tail = msg
                .get(after_rname..after_rname + 20)
                .ok_or_else(|| ParseError::MalformedPacket("SOA record truncated".into()))?;
            RData::Soa {
                mname,
                rname,
                serial: u32::from_be_bytes(tail[0..4].try_into().unwrap()),
                refresh: u32::from_be_bytes(tail[4..8].try_into().unwrap()),
                retry: u32::from_be_bytes(tail[8..12].try_into().unwrap()),
                expire: u32::from_be_bytes(tail[12..16].try_into().unwrap()),
                minimum_ttl: u32::from_be_bytes(tail[16..20].try_into().unwrap()),
            }
        }
        _ => RData::Raw(raw.to_vec()),
    })
}

fn parse_rr(msg: &[u8], pos: &mut usize) -> Result<ResourceRecord> {
    let (name, new_pos) = decode_name(msg, *pos)?;
    *pos = new_pos;
    let field = |p: &mut usize, n: usize| -> Result<&[u8]> {
        let s = msg
            .get(*p..*p + n)
            .ok_or_else(|| ParseError::MalformedPacket("resource record truncated".into()))?;
        *p += n;
        Ok(s)
    };
    let rtype = u16::from_be_bytes(field(pos, 2)?.try_into().unwrap());
    let rclass = u16::from_be_bytes(field(pos, 2)?.try_into().unwrap());
    let ttl = u32::from_be_bytes(field(pos, 4)?.try_into().unwrap());
    let rdlength = u16::from_be_bytes(field(pos, 2)?.try_into().unwrap()) as usize;
    let raw_start = *pos;
    let raw = field(pos, rdlength)?;
    let rdata = decode_rdata(rtype, raw, msg, raw_start)?;
    Ok(ResourceRecord {
        name,
        rtype,
        rclass,
        ttl,
        rdata,
    })
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    if data.len() < 12 {
        return Err(ParseError::MalformedPacket(
            "DNS message shorter than its fixed header".into(),
        ));
    }
    let id = u16::from_be_bytes([data[0], data[1]]);
    let flags = u16::from_be_bytes([data[2], data[3]]);
    let qdcount = u16::from_be_bytes([data[4], data[5]]) as usize;
    let ancount = u16::from_be_bytes([data[6], data[7]]) as usize;
    let nscount = u16::from_be_bytes([data[8], data[9]]) as usize;
    let arcount = u16::from_be_bytes([data[10], data[11]]) as usize;

    let mut pos = 12;
    let mut questions = Vec::with_capacity(qdcount);
    for _ in 0..qdcount {
        let (name, new_pos) = decode_name(data, pos)?;
        pos = new_pos;
        let qtype = u16::from_be_bytes(
            data.get(pos..pos + 2)
                .ok_or_else(|| ParseError::MalformedPacket("question truncated".into()))?
                .try_into()
                .unwrap(),
        );
        let qclass = u16::from_be_bytes(
            data.get(pos + 2..pos + 4)
                .ok_or_else(|| ParseError::MalformedPacket("question truncated".into()))?
                .try_into()
                .unwrap(),
        );
        pos += 4;
        questions.push(Question { name, qtype, qclass });
    }

    let mut answers = Vec::with_capacity(ancount);
    for _ in 0..ancount {
        answers.push(parse_rr(data, &mut pos)?);
    }
    let mut authority = Vec::with_capacity(nscount);
    for _ in 0..nscount {
        authority.push(parse_rr(data, &mut pos)?);
    }
    let mut additional = Vec::with_capacity(arcount);
    for _ in 0..arcount {
        additional.push(parse_rr(data, &mut pos)?);
    }

    Ok(Pdu::Dns(
        Dns {
            id,
            flags,
            questions,
            answers,
            authority,
            additional,
        },
        Box::new(Pdu::Raw(super::raw::RawPdu::empty())),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_with_single_a_answer_roundtrips() {
        // S1: a query for www.example.com A IN, with one A answer.
        let mut dns = Dns::query(0x13, "www.example.com", TYPE_A);
        dns.flags = 0x8180;
        dns.answers.push(ResourceRecord {
            name: "www.example.com".to_string(),
            rtype: TYPE_A,
            rclass: CLASS_IN,
            ttl: 0x1234,
            rdata: RData::A("192.168.0.1".parse().unwrap()),
        });

        let stack = Pdu::Dns(dns, Box::new(Pdu::Raw(super::super::raw::RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Dns(h, _) => {
                assert_eq!(h.id, 0x13);
                assert_eq!(h.flags, 0x8180);
                assert_eq!(h.questions.len(), 1);
                assert_eq!(h.questions[0].name, "www.example.com");
                assert_eq!(h.answers.len(), 1);
                assert_eq!(h.answers[0].ttl, 0x1234);
                assert_eq!(h.answers[0].rdata, RData::A("192.168.0.1".parse().unwrap()));
            }
            _ => panic!("expected Dns"),
        }
    }

    #[test]
    fn push_answer_returns_the_offset_the_record_lands_at() {
        let mut dns = Dns::query(1, "example.com", TYPE_A);
        let expected = dns.answers_offset();
        let offset = dns.push_answer(ResourceRecord {
            name: "example.com".to_string(),
            rtype: TYPE_A,
            rclass: CLASS_IN,
            ttl: 60,
            rdata: RData::A("10.0.0.1".parse().unwrap()),
        });
        assert_eq!(offset, expected);

        // The second answer must land right after the first's encoded bytes.
        let second_expected = dns.authority_offset();
        let second_offset = dns.push_answer(ResourceRecord {
            name: "example.com".to_string(),
            rtype: TYPE_A,
            rclass: CLASS_IN,
            ttl: 60,
            rdata: RData::A("10.0.0.2".parse().unwrap()),
        });
        assert_eq!(second_offset, second_expected);
        assert!(second_offset > offset);

        let stack = Pdu::Dns(dns, Box::new(Pdu::Raw(super::super::raw::RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        // The second answer's name starts exactly at its reported offset.
        assert_eq!(bytes[second_offset], 7); // label length of "example"
    }

    #[test]
    fn compression_pointer_decodes_repeated_name() {
        // Build a message where the answer's name is a pointer back to
        // the question's name at offset 12.
        let mut msg = Vec::new();
        msg.extend_from_slice(&0u16.to_be_bytes()); // id
        msg.extend_from_slice(&0u16.to_be_bytes()); // flags
        msg.extend_from_slice(&1u16.to_be_bytes()); // qdcount
        msg.extend_from_slice(&1u16.to_be_bytes()); // ancount
        msg.extend_from_slice(&0u16.to_be_bytes()); // nscount
        msg.extend_from_slice(&0u16.to_be_bytes()); // arcount
        msg.extend(encode_name("example.com")); // starts at offset 12
        msg.extend_from_slice(&TYPE_A.to_be_bytes());
        msg.extend_from_slice(&CLASS_IN.to_be_bytes());
        msg.extend_from_slice(&[0xC0, 12]); // pointer to offset 12
        msg.extend_from_slice(&TYPE_A.to_be_bytes());
        msg.extend_from_slice(&CLASS_IN.to_be_bytes());
        msg.extend_from_slice(&100u32.to_be_bytes());
        msg.extend_from_slice(&4u16.to_be_bytes());
        msg.extend_from_slice(&[1, 2, 3, 4]);

        let parsed = parse(&msg).unwrap();
        match parsed {
            Pdu::Dns(h, _) => assert_eq!(h.answers[0].name, "example.com"),
            _ => panic!("expected Dns"),
        }
    }
}
