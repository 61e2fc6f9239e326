//! The packet wrapper the sniffer façade yields to user code (component
//! J, spec §6): an already-dissected [`Pdu`] stack plus its timestamp.

use std::time::SystemTime;

use crate::pdu::Pdu;

#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pdu: Pdu,
    timestamp: Option<SystemTime>,
}

impl Packet {
    pub(crate) fn new(pdu: Pdu, timestamp: Option<SystemTime>) -> Packet {
        Packet { pdu, timestamp }
    }

    pub fn pdu(&self) -> &Pdu {
        &self.pdu
    }

    pub fn into_pdu(self) -> Pdu {
        self.pdu
    }

    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }
}
