//! EAPOL (spec §4.6 + §4.9): EAP over LAN, the carrier for the WPA2
//! 4-way handshake. The 802.1X common header (version, packet_type,
//! length) is followed by a one-byte descriptor type that selects the
//! RC4 or RSN key-descriptor body; `length` is the size of everything
//! from the descriptor type byte onward.
//!
//! Grounded in `examples/original_source/include/tins/eapol.h`. The RSN
//! key-info bitfield (key_mic/key_ack/secure/install/...) is exactly
//! what [`crate::wpa2`] reads to classify handshake messages 1-4.

use super::{Pdu, SerializeCtx};
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::{ParseError, Result};

pub const DESC_RC4: u8 = 1;
pub const DESC_RSN: u8 = 2;
pub const DESC_WPA: u8 = 254;

const RC4_BODY_LEN: usize = 2 + 8 + 16 + 1 + 16; // key_length, replay_counter, key_iv, index+flag, key_sign
const RSN_BODY_LEN: usize = 2 + 2 + 8 + 32 + 16 + 8 + 8 + 16 + 2; // key_info .. wpa_length

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Rc4Eapol {
    pub key_length: u16,
    pub replay_counter: u64,
    pub key_iv: [u8; 16],
    pub key_index: u8,
    pub key_flag: bool,
    pub key_sign: [u8; 16],
    pub key: Vec<u8>,
}

/// The RSN EAPOL-Key info field, bit-for-bit per IEEE 802.11i: bits
/// 0-2 key descriptor version, bit 3 key type, bits 4-5 key index, bit
/// 6 install, bit 7 key ack, bit 8 key MIC, bit 9 secure, bit 10
/// error, bit 11 request, bit 12 encrypted.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RsnEapol {
    pub key_descriptor_version: u8,
    pub key_type: bool,
    pub key_index: u8,
    pub install: bool,
    pub key_ack: bool,
    pub key_mic: bool,
    pub secure: bool,
    pub error: bool,
    pub request: bool,
    pub encrypted: bool,
    pub key_length: u16,
    pub replay_counter: u64,
    pub nonce: [u8; 32],
    pub key_iv: [u8; 16],
    pub rsc: [u8; 8],
    pub id: [u8; 8],
    pub mic: [u8; 16],
    pub key_data: Vec<u8>,
}

impl RsnEapol {
    fn key_info(&self) -> u16 {
        (u16::from(self.key_descriptor_version) & 0x7)
            | (u16::from(self.key_type) << 3)
            | (u16::from(self.key_index & 0x3) << 4)
            | (u16::from(self.install) << 6)
            | (u16::from(self.key_ack) << 7)
            | (u16::from(self.key_mic) << 8)
            | (u16::from(self.secure) << 9)
            | (u16::from(self.error) << 10)
            | (u16::from(self.request) << 11)
            | (u16::from(self.encrypted) << 12)
    }

    fn from_key_info(info: u16) -> (u8, bool, u8, bool, bool, bool, bool, bool, bool, bool) {
        (
            (info & 0x7) as u8,
            (info >> 3) & 1 != 0,
            ((info >> 4) & 0x3) as u8,
            (info >> 6) & 1 != 0,
            (info >> 7) & 1 != 0,
            (info >> 8) & 1 != 0,
            (info >> 9) & 1 != 0,
            (info >> 10) & 1 != 0,
            (info >> 11) & 1 != 0,
            (info >> 12) & 1 != 0,
        )
    }

    /// Which of the 4-way handshake's messages this frame is, per spec
    /// §4.9. Message 2 and 4 share the same ack/mic/install bits; they're
    /// told apart by the `secure` bit, which the authenticator sets once
    /// the pairwise key is installed (message 4 is sent in response to
    /// message 3, after secure is set).
    pub fn handshake_message(&self) -> Option<u8> {
        match (self.key_ack, self.key_mic, self.install, self.secure) {
            (true, false, _, _) => Some(1),
            (false, true, false, false) => Some(2),
            (true, true, true, true) => Some(3),
            (false, true, false, true) => Some(4),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Eapol {
    Rc4 {
        version: u8,
        packet_type: u8,
        body: Rc4Eapol,
    },
    Rsn {
        version: u8,
        packet_type: u8,
        body: RsnEapol,
    },
}

impl Eapol {
    pub fn pdu_type(&self) -> super::PduType {
        match self {
            Eapol::Rc4 { .. } => super::PduType::EapolRc4,
            Eapol::Rsn { .. } => super::PduType::EapolRsn,
        }
    }

    pub fn header_size(&self) -> usize {
        let body_len = match self {
            Eapol::Rc4 { body, .. } => RC4_BODY_LEN + body.key.len(),
            Eapol::Rsn { body, .. } => RSN_BODY_LEN + body.key_data.len(),
        };
        4 + 1 + body_len
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let hs = self.header_size();
        let (head, rest) = buf.split_at_mut(hs);
        let (version, packet_type) = match self {
            Eapol::Rc4 { version, packet_type, .. } => (*version, *packet_type),
            Eapol::Rsn { version, packet_type, .. } => (*version, *packet_type),
        };
        let mut w = Writer::new(head);
        w.write_u8(version)?;
        w.write_u8(packet_type)?;
        w.write_u16((hs - 4) as u16, Endianness::Big)?;
        match self {
            Eapol::Rc4 { body, .. } => {
                w.write_u8(DESC_RC4)?;
                w.write_u16(body.key_length, Endianness::Big)?;
                w.write_u64(body.replay_counter, Endianness::Big)?;
                w.write_bytes(&body.key_iv)?;
                w.write_u8((body.key_index & 0x7F) | (u8::from(body.key_flag) << 7))?;
                w.write_bytes(&body.key_sign)?;
                w.write_bytes(&body.key)?;
            }
            Eapol::Rsn { body, .. } => {
                w.write_u8(DESC_RSN)?;
                w.write_u16(body.key_info(), Endianness::Big)?;
                w.write_u16(body.key_length, Endianness::Big)?;
                w.write_u64(body.replay_counter, Endianness::Big)?;
                w.write_bytes(&body.nonce)?;
                w.write_bytes(&body.key_iv)?;
                w.write_bytes(&body.rsc)?;
                w.write_bytes(&body.id)?;
                w.write_bytes(&body.mic)?;
                w.write_u16(body.key_data.len() as u16, Endianness::Big)?;
                w.write_bytes(&body.key_data)?;
            }
        }
        inner.write_into(rest, ctx)
    }
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let version = r.read_u8()?;
    let packet_type = r.read_u8()?;
    let _length = r.read_u16(Endianness::Big)?;
    let descriptor = r.read_u8()?;

    let eapol = match descriptor {
        DESC_RC4 => {
            let key_length = r.read_u16(Endianness::Big)?;
            let replay_counter = r.read_u64(Endianness::Big)?;
            let key_iv = r.read_array::<16>()?;
            let byte = r.read_u8()?;
            let key_index = byte & 0x7F;
            let key_flag = byte >> 7 != 0;
            let key_sign = r.read_array::<16>()?;
            let key = r.rest().to_vec();
            Eapol::Rc4 {
                version,
                packet_type,
                body: Rc4Eapol {
                    key_length,
                    replay_counter,
                    key_iv,
                    key_index,
                    key_flag,
                    key_sign,
                    key,
                },
            }
        }
        DESC_RSN | DESC_WPA => {
            let info = r.read_u16(Endianness::Big)?;
            let (kdv, key_type, key_index, install, key_ack, key_mic, secure, error, request, encrypted) =
                RsnEapol::from_key_info(info);
            let key_length = r.read_u16(Endianness::Big)?;
            let replay_counter = r.read_u64(Endianness::Big)?;
            let nonce = r.read_array::<32>()?;
            let key_iv = r.read_array::<16>()?;
            let rsc = r.read_array::<8>()?;
            let id = r.read_array::<8>()?;
            let mic = r.read_array::<16>()?;
            let wpa_length = r.read_u16(Endianness::Big)? as usize;
            let key_data = r.read_bytes(wpa_length.min(r.remaining()))?.to_vec();
            Eapol::Rsn {
                version,
                packet_type,
                body: RsnEapol {
                    key_descriptor_version: kdv,
                    key_type,
                    key_index,
                    install,
                    key_ack,
                    key_mic,
                    secure,
                    error,
                    request,
                    encrypted,
                    key_length,
                    replay_counter,
                    nonce,
                    key_iv,
                    rsc,
                    id,
                    mic,
                    key_data,
                },
            }
        }
        other => {
            return Err(ParseError::MalformedPacket(format!(
                "unrecognized EAPOL descriptor type {other}"
            )))
        }
    };

    let inner = Box::new(Pdu::Raw(super::raw::RawPdu::empty()));
    Ok(Pdu::Eapol(eapol, inner))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(key_ack: bool, key_mic: bool, install: bool, secure: bool) -> RsnEapol {
        RsnEapol {
            key_descriptor_version: 2,
            key_type: true,
            key_index: 0,
            install,
            key_ack,
            key_mic,
            secure,
            error: false,
            request: false,
            encrypted: false,
            key_length: 16,
            replay_counter: 1,
            nonce: [0; 32],
            key_iv: [0; 16],
            rsc: [0; 8],
            id: [0; 8],
            mic: [0; 16],
            key_data: Vec::new(),
        }
    }

    #[test]
    fn classifies_all_four_handshake_messages() {
        assert_eq!(msg(true, false, false, false).handshake_message(), Some(1));
        assert_eq!(msg(false, true, false, false).handshake_message(), Some(2));
        assert_eq!(msg(true, true, true, true).handshake_message(), Some(3));
        assert_eq!(msg(false, true, false, true).handshake_message(), Some(4));
    }

    #[test]
    fn roundtrips_rsn_fields_through_key_info() {
        let body = msg(true, true, true, true);
        let eapol = Eapol::Rsn {
            version: 2,
            packet_type: 3,
            body,
        };
        let stack = Pdu::Eapol(eapol, Box::new(Pdu::Raw(super::super::raw::RawPdu::empty())));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Eapol(Eapol::Rsn { body, .. }, _) => {
                assert!(body.key_ack);
                assert!(body.install);
                assert_eq!(body.handshake_message(), Some(3));
            }
            _ => panic!("expected Rsn"),
        }
    }
}
