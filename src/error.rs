//! The closed set of errors the core can raise.
//!
//! Every fallible operation in `packetry` (parsing, serializing, option
//! decoding, stream lookup, handshake verification) returns a
//! [`ParseError`]. The variants are deliberately closed — new kinds of
//! failure are modeled as a new variant here, not as a downstream
//! `Box<dyn Error>`.

use thiserror::Error;

/// Every way a PDU stack, option, or WPA2 handshake can fail to make sense.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A bounds-check failed while reading a header or payload.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// A typed option decoder found a payload length incompatible with the
    /// requested type.
    #[error("malformed option: {0}")]
    MalformedOption(String),

    /// A typed accessor could not locate the option it was asked for.
    #[error("option not found: {0}")]
    OptionNotFound(String),

    /// The writer ran out of space, or was asked to serialize a sub-PDU it
    /// doesn't know how to emit.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// An accessor was used on an optional field that isn't present.
    #[error("field not present: {0}")]
    FieldNotPresent(String),

    /// An option payload exceeded 65535 bytes.
    #[error("option payload too large: {0} bytes")]
    OptionPayloadTooLarge(usize),

    /// A textual address failed to parse.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A domain name failed to decode (bad compression pointer, label too
    /// long, etc).
    #[error("invalid domain name: {0}")]
    InvalidDomainName(String),

    /// A cast to a concrete PDU variant was attempted on the wrong variant.
    #[error("bad cast: expected {expected}, found {found}")]
    BadCast {
        expected: &'static str,
        found: &'static str,
    },

    /// The stream follower has no stream matching the requested 4-tuple.
    #[error("stream not found")]
    StreamNotFound,

    /// `rfind_pdu` (or similar) found no layer of the requested type.
    #[error("no such PDU layer in the stack")]
    PduNotFound,

    /// A WPA2 handshake's MIC did not verify, or a nonce/TSC was replayed.
    #[error("invalid handshake: {0}")]
    InvalidHandshake(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;
