//! The terminal leaf of every stack: bytes the registry didn't recognize,
//! or a payload that's opaque to the framework (TCP/UDP application data).

use bytes::Bytes;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RawPdu {
    pub data: Bytes,
}

impl RawPdu {
    pub fn new(data: Bytes) -> RawPdu {
        RawPdu { data }
    }

    pub fn empty() -> RawPdu {
        RawPdu { data: Bytes::new() }
    }

    pub fn from_slice(data: &[u8]) -> RawPdu {
        RawPdu {
            data: Bytes::copy_from_slice(data),
        }
    }
}

impl From<&str> for RawPdu {
    fn from(s: &str) -> RawPdu {
        RawPdu::from_slice(s.as_bytes())
    }
}

impl From<Vec<u8>> for RawPdu {
    fn from(v: Vec<u8>) -> RawPdu {
        RawPdu { data: Bytes::from(v) }
    }
}
