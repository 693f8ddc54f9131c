//! Framing and codec error types.
//!
//! This module provides the two error families of the core crate:
//! - [`FrameError`]: RecordIO framing errors
//! - [`CodecError`]: message encode/decode errors
//!
//! Both are fatal by contract: a framing error poisons the decoder for the
//! rest of the connection, and a codec error terminates the channel it
//! occurred in. Retry classification happens a layer up, against the client
//! crate's connection errors, never against these.

/// RecordIO framing errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The length prefix contained something other than ASCII digits.
    #[error("invalid length prefix: unexpected byte 0x{byte:02x} at offset {offset}")]
    InvalidLengthPrefix { byte: u8, offset: usize },

    /// The length prefix had no digits before its terminating newline.
    #[error("invalid length prefix: empty digit run")]
    EmptyLengthPrefix,

    /// The declared record length exceeds the configured ceiling.
    #[error("record length {length} exceeds maximum {max}")]
    RecordTooLarge { length: u64, max: u64 },

    /// The stream ended while a length prefix or record body was buffered.
    #[error("stream truncated with {buffered} unconsumed bytes")]
    Truncated { buffered: usize },
}

/// Message codec errors.
///
/// Codecs are assumed deterministic, so neither variant is transient: a
/// payload that fails to decode will fail again on every attempt.
#[derive(Clone, Debug, thiserror::Error)]
pub enum CodecError {
    /// Encoding an outbound message failed.
    #[error("encode failed: {0}")]
    Encode(String),

    /// Decoding an inbound payload failed.
    #[error("decode failed: {0}")]
    Decode(String),
}
