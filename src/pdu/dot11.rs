//! IEEE 802.11 (spec §4.6 + §4.9): the MAC header that carries beacons
//! (for access-point discovery), the EAPOL 4-way handshake, and
//! CCMP/TKIP-protected data frames.
//!
//! No `dot11.h` ships in `examples/original_source` (it was filtered
//! out upstream), so this module follows the IEEE 802.11-2016 frame
//! format directly; the information-element layout it decodes beacons
//! with (SSID tag 0, RSN tag 48) is cross-checked against
//! `examples/original_source/include/tins/rsn_information.h` and the
//! literal beacon bytes in
//! `examples/original_source/tests/src/wpa2_decrypt_test.cpp`.

use super::{Pdu, SerializeCtx};
use super::ethernet::MacAddress;
use crate::cursor::{Reader, Writer};
use crate::endian::Endianness;
use crate::error::{ParseError, Result};

pub const TYPE_MANAGEMENT: u8 = 0;
pub const TYPE_CONTROL: u8 = 1;
pub const TYPE_DATA: u8 = 2;

pub const SUBTYPE_BEACON: u8 = 8;
pub const SUBTYPE_DATA: u8 = 0;
pub const SUBTYPE_QOS_DATA: u8 = 8;

pub const IE_SSID: u8 = 0;
pub const IE_RSN: u8 = 48;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FrameControl {
    pub version: u8,
    pub type_: u8,
    pub subtype: u8,
    pub to_ds: bool,
    pub from_ds: bool,
    pub more_frag: bool,
    pub retry: bool,
    pub power_mgmt: bool,
    pub more_data: bool,
    pub protected: bool,
    pub order: bool,
}

impl FrameControl {
    pub(crate) fn to_bytes(self) -> [u8; 2] {
        let byte0 = (self.version & 0x3) | ((self.type_ & 0x3) << 2) | ((self.subtype & 0xF) << 4);
        let byte1 = (self.to_ds as u8)
            | ((self.from_ds as u8) << 1)
            | ((self.more_frag as u8) << 2)
            | ((self.retry as u8) << 3)
            | ((self.power_mgmt as u8) << 4)
            | ((self.more_data as u8) << 5)
            | ((self.protected as u8) << 6)
            | ((self.order as u8) << 7);
        [byte0, byte1]
    }

    fn from_bytes(b: [u8; 2]) -> FrameControl {
        FrameControl {
            version: b[0] & 0x3,
            type_: (b[0] >> 2) & 0x3,
            subtype: (b[0] >> 4) & 0xF,
            to_ds: b[1] & 1 != 0,
            from_ds: (b[1] >> 1) & 1 != 0,
            more_frag: (b[1] >> 2) & 1 != 0,
            retry: (b[1] >> 3) & 1 != 0,
            power_mgmt: (b[1] >> 4) & 1 != 0,
            more_data: (b[1] >> 5) & 1 != 0,
            protected: (b[1] >> 6) & 1 != 0,
            order: (b[1] >> 7) & 1 != 0,
        }
    }

    fn has_qos_ctrl(&self) -> bool {
        self.type_ == TYPE_DATA && self.subtype & 0x8 != 0
    }

    fn has_body_addrs(&self) -> bool {
        self.type_ != TYPE_CONTROL
    }
}

/// A single information element (tag, length, value) from a management
/// frame body, e.g. SSID or RSN.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct InformationElement {
    pub tag: u8,
    pub data: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Dot11 {
    pub fc: FrameControl,
    pub duration_id: u16,
    pub addr1: MacAddress,
    pub addr2: Option<MacAddress>,
    pub addr3: Option<MacAddress>,
    pub seq_ctrl: Option<u16>,
    pub addr4: Option<MacAddress>,
    pub qos_ctrl: Option<u16>,
}

impl Dot11 {
    pub fn header_size(&self) -> usize {
        let mut size = 2 + 2 + 6; // frame control, duration, addr1
        if self.addr2.is_some() {
            size += 6;
        }
        if self.addr3.is_some() {
            size += 6;
        }
        if self.seq_ctrl.is_some() {
            size += 2;
        }
        if self.addr4.is_some() {
            size += 6;
        }
        if self.qos_ctrl.is_some() {
            size += 2;
        }
        size
    }

    pub fn is_data(&self) -> bool {
        self.fc.type_ == TYPE_DATA
    }

    pub fn is_beacon(&self) -> bool {
        self.fc.type_ == TYPE_MANAGEMENT && self.fc.subtype == SUBTYPE_BEACON
    }

    pub(crate) fn write_into(
        &self,
        inner: &Pdu,
        buf: &mut [u8],
        ctx: &mut SerializeCtx,
    ) -> Result<()> {
        let hs = self.header_size();
        let (head, rest) = buf.split_at_mut(hs);
        {
            let mut w = Writer::new(head);
            w.write_bytes(&self.fc.to_bytes())?;
            w.write_u16(self.duration_id, Endianness::Little)?;
            w.write_bytes(&self.addr1.octets())?;
            if let Some(a) = &self.addr2 {
                w.write_bytes(&a.octets())?;
            }
            if let Some(a) = &self.addr3 {
                w.write_bytes(&a.octets())?;
            }
            if let Some(s) = self.seq_ctrl {
                w.write_u16(s, Endianness::Little)?;
            }
            if let Some(a) = &self.addr4 {
                w.write_bytes(&a.octets())?;
            }
            if let Some(q) = self.qos_ctrl {
                w.write_u16(q, Endianness::Little)?;
            }
        }
        inner.write_into(rest, ctx)
    }
}

/// Parses the TLV information-element list of a management frame body
/// (spec §4.9: used to pull the SSID and RSN IEs out of a beacon).
/// `body` should start right after the fixed fields (timestamp,
/// beacon interval, capability info for a beacon).
pub fn parse_information_elements(body: &[u8]) -> Result<Vec<InformationElement>> {
    let mut r = Reader::new(body);
    let mut elements = Vec::new();
    while r.remaining() >= 2 {
        let tag = r.read_u8()?;
        let len = r.read_u8()? as usize;
        let data = r.read_bytes(len)?.to_vec();
        elements.push(InformationElement { tag, data });
    }
    Ok(elements)
}

pub fn find_ssid(elements: &[InformationElement]) -> Option<String> {
    elements
        .iter()
        .find(|e| e.tag == IE_SSID)
        .map(|e| String::from_utf8_lossy(&e.data).into_owned())
}

/// Strips a radiotap pseudo-header (used by the `IEEE802_11_RADIO`
/// link type) and returns the 802.11 frame that follows it. The
/// header's own `length` field (bytes 2-3, little-endian) covers
/// itself plus every radio metadata field; none of those fields are
/// needed for dissection, so they're discarded wholesale.
pub fn strip_radiotap(data: &[u8]) -> Result<&[u8]> {
    let mut r = Reader::new(data);
    let _version = r.read_u8()?;
    let _pad = r.read_u8()?;
    let length = r.read_u16(Endianness::Little)? as usize;
    if length < 4 || length > data.len() {
        return Err(ParseError::MalformedPacket(
            "radiotap header length out of bounds".into(),
        ));
    }
    Ok(&data[length..])
}

pub fn parse_radiotap(data: &[u8]) -> Result<Pdu> {
    parse(strip_radiotap(data)?)
}

pub fn parse(data: &[u8]) -> Result<Pdu> {
    let mut r = Reader::new(data);
    let fc = FrameControl::from_bytes(r.read_array::<2>()?);
    let duration_id = r.read_u16(Endianness::Little)?;
    let addr1 = MacAddress::from_bytes(r.read_array::<6>()?);

    let addr2 = if fc.has_body_addrs() {
        Some(MacAddress::from_bytes(r.read_array::<6>()?))
    } else {
        None
    };
    let addr3 = if fc.has_body_addrs() {
        Some(MacAddress::from_bytes(r.read_array::<6>()?))
    } else {
        None
    };
    let seq_ctrl = if fc.has_body_addrs() {
        Some(r.read_u16(Endianness::Little)?)
    } else {
        None
    };
    let addr4 = if fc.to_ds && fc.from_ds {
        Some(MacAddress::from_bytes(r.read_array::<6>()?))
    } else {
        None
    };
    let qos_ctrl = if fc.has_qos_ctrl() {
        Some(r.read_u16(Endianness::Little)?)
    } else {
        None
    };

    if fc.type_ == TYPE_CONTROL {
        return Err(ParseError::MalformedPacket(
            "control frames are out of scope for dissection".into(),
        ));
    }

    let inner = Pdu::Raw(super::raw::RawPdu::from_slice(r.rest()));
    Ok(Pdu::Dot11(
        Dot11 {
            fc,
            duration_id,
            addr1,
            addr2,
            addr3,
            seq_ctrl,
            addr4,
            qos_ctrl,
        },
        Box::new(inner),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::raw::RawPdu;

    fn qos_data_fc() -> FrameControl {
        FrameControl {
            version: 0,
            type_: TYPE_DATA,
            subtype: SUBTYPE_QOS_DATA,
            to_ds: true,
            from_ds: false,
            more_frag: false,
            retry: false,
            power_mgmt: false,
            more_data: false,
            protected: true,
            order: false,
        }
    }

    #[test]
    fn qos_data_frame_roundtrips_with_qos_control() {
        let dot11 = Dot11 {
            fc: qos_data_fc(),
            duration_id: 0x2c,
            addr1: "00:0c:41:82:b2:55".parse().unwrap(),
            addr2: Some("00:0d:93:82:36:3a".parse().unwrap()),
            addr3: Some("00:0c:41:82:b2:55".parse().unwrap()),
            seq_ctrl: Some(0),
            addr4: None,
            qos_ctrl: Some(0),
        };
        let stack = Pdu::Dot11(dot11, Box::new(Pdu::Raw(RawPdu::from_slice(b"ciphertext"))));
        let bytes = stack.serialize().unwrap();
        let parsed = parse(&bytes).unwrap();
        match parsed {
            Pdu::Dot11(h, _) => {
                assert!(h.is_data());
                assert!(h.fc.protected);
                assert_eq!(h.qos_ctrl, Some(0));
            }
            _ => panic!("expected Dot11"),
        }
    }

    #[test]
    fn beacon_information_elements_expose_ssid() {
        // timestamp(8) + beacon_interval(2) + capabilities(2), then IEs.
        let mut body = vec![0u8; 12];
        body.push(IE_SSID);
        body.push(7);
        body.extend_from_slice(b"Coherer");
        let elements = parse_information_elements(&body[12..]).unwrap();
        assert_eq!(find_ssid(&elements).as_deref(), Some("Coherer"));
    }
}
