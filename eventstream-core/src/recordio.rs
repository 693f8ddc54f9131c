//! RecordIO wire framing.
//!
//! The streaming API frames its chunked HTTP response body as a sequence of
//! length-prefixed records:
//!
//! ```text
//! <ASCII decimal length>\n<length bytes of opaque payload>
//! ```
//!
//! A length of `0` is a valid empty record. There is no other delimiter or
//! padding.
//!
//! This module provides [`encode_record`] for writers and [`RecordDecoder`],
//! an incremental parser that accepts bytes in any chunking (one byte at a
//! time, many records at once) and yields complete records in arrival order.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::FrameError;

/// Default ceiling on a single record's declared length.
///
/// Large enough for any realistic state snapshot, small enough to reject a
/// garbage length prefix before buffering gigabytes.
pub const DEFAULT_MAX_RECORD_LEN: u64 = 16 * 1024 * 1024;

/// Frame a payload as one RecordIO record.
pub fn encode_record(payload: &[u8]) -> Bytes {
    let prefix = payload.len().to_string();
    let mut record = Vec::with_capacity(prefix.len() + 1 + payload.len());
    record.extend_from_slice(prefix.as_bytes());
    record.push(b'\n');
    record.extend_from_slice(payload);
    Bytes::from(record)
}

/// Decoder state: either scanning for a length prefix or accumulating the
/// body whose length is already known.
#[derive(Clone, Debug)]
enum DecodeState {
    AwaitingLength,
    AwaitingBody { remaining: usize },
    /// A framing error was hit; the connection must be abandoned. The
    /// decoder does not attempt to resynchronize.
    Failed(FrameError),
}

/// Incremental RecordIO decoder.
///
/// Owned by exactly one connection: bytes go in via [`feed`](Self::feed),
/// complete records come out via [`next_record`](Self::next_record), and
/// [`finish`](Self::finish) distinguishes a clean end-of-stream from a
/// truncated one. The decoder makes no assumptions about chunk boundaries;
/// a record may arrive one byte at a time or interleaved with its neighbors
/// in a single chunk.
///
/// # Example
///
/// ```
/// use eventstream_core::{encode_record, RecordDecoder};
///
/// let mut decoder = RecordDecoder::new();
/// decoder.feed(&encode_record(b"hello"));
///
/// let record = decoder.next_record().unwrap().unwrap();
/// assert_eq!(&record[..], b"hello");
/// assert!(decoder.next_record().unwrap().is_none());
/// decoder.finish().unwrap();
/// ```
#[derive(Debug)]
pub struct RecordDecoder {
    buffer: BytesMut,
    state: DecodeState,
    max_record_len: u64,
}

impl Default for RecordDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordDecoder {
    /// Create a decoder with the default record length ceiling.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_RECORD_LEN)
    }

    /// Create a decoder with a custom record length ceiling.
    pub fn with_limit(max_record_len: u64) -> Self {
        Self {
            buffer: BytesMut::new(),
            state: DecodeState::AwaitingLength,
            max_record_len,
        }
    }

    /// Append a chunk of transport bytes to the accumulation buffer.
    ///
    /// Input arriving after a framing error is discarded: the connection is
    /// already condemned and buffering more of it would be unbounded.
    pub fn feed(&mut self, chunk: &[u8]) {
        if !matches!(self.state, DecodeState::Failed(_)) {
            self.buffer.extend_from_slice(chunk);
        }
    }

    /// Whether a framing error has poisoned this decoder.
    pub fn is_failed(&self) -> bool {
        matches!(self.state, DecodeState::Failed(_))
    }

    /// Number of buffered bytes not yet forming a complete record.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Pull the next complete record out of the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(record))` if a complete record was buffered
    /// - `Ok(None)` if more bytes are needed
    /// - `Err(e)` on a framing error; every later call repeats the error
    pub fn next_record(&mut self) -> Result<Option<Bytes>, FrameError> {
        loop {
            match self.state {
                DecodeState::Failed(ref e) => return Err(e.clone()),
                DecodeState::AwaitingBody { remaining } => {
                    if self.buffer.len() < remaining {
                        return Ok(None);
                    }
                    // Ownership of the record buffer transfers to the caller;
                    // bytes beyond the boundary stay buffered for the next
                    // iteration.
                    let record = self.buffer.split_to(remaining).freeze();
                    self.state = DecodeState::AwaitingLength;
                    return Ok(Some(record));
                }
                DecodeState::AwaitingLength => match self.scan_length()? {
                    None => return Ok(None),
                    Some(0) => return Ok(Some(Bytes::new())),
                    Some(length) => {
                        self.state = DecodeState::AwaitingBody {
                            remaining: length as usize,
                        };
                    }
                },
            }
        }
    }

    /// Signal end-of-stream.
    ///
    /// Clean completion requires the decoder to be between records with an
    /// empty buffer; a partially-buffered length or body is a truncation.
    pub fn finish(&self) -> Result<(), FrameError> {
        match self.state {
            DecodeState::Failed(ref e) => Err(e.clone()),
            DecodeState::AwaitingLength if self.buffer.is_empty() => Ok(()),
            _ => Err(FrameError::Truncated {
                buffered: self.buffer.len(),
            }),
        }
    }

    /// Scan the buffer for a newline-terminated digit run and consume it.
    ///
    /// Returns the parsed length, or `None` if the newline has not arrived.
    /// A non-digit byte fails immediately, without waiting for the newline.
    fn scan_length(&mut self) -> Result<Option<u64>, FrameError> {
        let mut length: u64 = 0;
        let mut outcome = None;
        for (offset, &byte) in self.buffer.iter().enumerate() {
            match byte {
                b'0'..=b'9' => {
                    let next = length
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(u64::from(byte - b'0')));
                    match next {
                        Some(v) if v <= self.max_record_len => length = v,
                        _ => {
                            outcome = Some(Err(FrameError::RecordTooLarge {
                                length: next.unwrap_or(u64::MAX),
                                max: self.max_record_len,
                            }));
                            break;
                        }
                    }
                }
                b'\n' => {
                    outcome = Some(if offset == 0 {
                        Err(FrameError::EmptyLengthPrefix)
                    } else {
                        Ok((length, offset + 1))
                    });
                    break;
                }
                _ => {
                    outcome = Some(Err(FrameError::InvalidLengthPrefix { byte, offset }));
                    break;
                }
            }
        }
        match outcome {
            None => Ok(None),
            Some(Ok((length, consumed))) => {
                self.buffer.advance(consumed);
                Ok(Some(length))
            }
            Some(Err(e)) => Err(self.fail(e)),
        }
    }

    fn fail(&mut self, error: FrameError) -> FrameError {
        self.state = DecodeState::Failed(error.clone());
        self.buffer.clear();
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(decoder: &mut RecordDecoder) -> Vec<Bytes> {
        let mut records = Vec::new();
        while let Some(record) = decoder.next_record().unwrap() {
            records.push(record);
        }
        records
    }

    #[test]
    fn test_encode_record() {
        assert_eq!(&encode_record(b"hello")[..], b"5\nhello");
        assert_eq!(&encode_record(b"")[..], b"0\n");
    }

    #[test]
    fn test_decode_single_record() {
        let mut decoder = RecordDecoder::new();
        decoder.feed(b"5\nhello");

        let records = drain(&mut decoder);
        assert_eq!(records, vec![Bytes::from_static(b"hello")]);
        decoder.finish().unwrap();
    }

    #[test]
    fn test_decode_multiple_records_in_one_chunk() {
        let mut decoder = RecordDecoder::new();
        decoder.feed(b"3\none3\ntwo5\nthree");

        let records = drain(&mut decoder);
        assert_eq!(
            records,
            vec![
                Bytes::from_static(b"one"),
                Bytes::from_static(b"two"),
                Bytes::from_static(b"three"),
            ]
        );
        decoder.finish().unwrap();
    }

    #[test]
    fn test_decode_one_byte_at_a_time() {
        let wire: Vec<u8> = [
            encode_record(b"first"),
            encode_record(b""),
            encode_record(b"second"),
        ]
        .iter()
        .flat_map(|r| r.to_vec())
        .collect();

        let mut decoder = RecordDecoder::new();
        let mut records = Vec::new();
        for byte in wire {
            decoder.feed(&[byte]);
            records.extend(drain(&mut decoder));
        }

        assert_eq!(
            records,
            vec![
                Bytes::from_static(b"first"),
                Bytes::new(),
                Bytes::from_static(b"second"),
            ]
        );
        decoder.finish().unwrap();
    }

    #[test]
    fn test_chunking_invariance() {
        let payloads: Vec<&[u8]> = vec![b"a", b"", b"longer payload with spaces", b"z"];
        let wire: Vec<u8> = payloads
            .iter()
            .flat_map(|p| encode_record(p).to_vec())
            .collect();

        // Every split point of the wire bytes must produce the same records.
        for split in 0..=wire.len() {
            let mut decoder = RecordDecoder::new();
            let mut records = Vec::new();
            decoder.feed(&wire[..split]);
            records.extend(drain(&mut decoder));
            decoder.feed(&wire[split..]);
            records.extend(drain(&mut decoder));

            let expected: Vec<Bytes> = payloads.iter().map(|p| Bytes::copy_from_slice(p)).collect();
            assert_eq!(records, expected, "split at {split}");
            decoder.finish().unwrap();
        }
    }

    #[test]
    fn test_zero_length_record_preserves_boundaries() {
        let mut decoder = RecordDecoder::new();
        decoder.feed(b"0\n4\nnext");

        let records = drain(&mut decoder);
        assert_eq!(records, vec![Bytes::new(), Bytes::from_static(b"next")]);
    }

    #[test]
    fn test_non_digit_in_length_prefix() {
        let mut decoder = RecordDecoder::new();
        decoder.feed(b"12x4\ndata");

        let err = decoder.next_record().unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidLengthPrefix {
                byte: b'x',
                offset: 2
            }
        );

        // Poisoned: no record is ever emitted from this point onward.
        assert!(decoder.is_failed());
        decoder.feed(b"5\nhello");
        assert!(decoder.next_record().is_err());
    }

    #[test]
    fn test_empty_length_prefix() {
        let mut decoder = RecordDecoder::new();
        decoder.feed(b"\nrest");
        assert_eq!(
            decoder.next_record().unwrap_err(),
            FrameError::EmptyLengthPrefix
        );
    }

    #[test]
    fn test_length_over_ceiling_rejected_before_body() {
        let mut decoder = RecordDecoder::with_limit(10);
        // The prefix alone trips the ceiling: no body bytes were ever needed.
        decoder.feed(b"11");
        let err = decoder.next_record().unwrap_err();
        assert_eq!(
            err,
            FrameError::RecordTooLarge {
                length: 11,
                max: 10
            }
        );
    }

    #[test]
    fn test_truncated_body() {
        let mut decoder = RecordDecoder::new();
        decoder.feed(b"10\nonly4");

        assert!(decoder.next_record().unwrap().is_none());
        let err = decoder.finish().unwrap_err();
        assert_eq!(err, FrameError::Truncated { buffered: 5 });
    }

    #[test]
    fn test_truncated_length_prefix() {
        let mut decoder = RecordDecoder::new();
        decoder.feed(b"123");

        assert!(decoder.next_record().unwrap().is_none());
        assert!(matches!(
            decoder.finish(),
            Err(FrameError::Truncated { buffered: 3 })
        ));
    }

    #[test]
    fn test_clean_end_of_stream() {
        let mut decoder = RecordDecoder::new();
        decoder.feed(b"2\nok");
        drain(&mut decoder);
        decoder.finish().unwrap();
    }

    #[test]
    fn test_round_trip_ordering() {
        let payloads: Vec<Vec<u8>> = (0..50).map(|i| format!("payload-{i}").into_bytes()).collect();
        let mut decoder = RecordDecoder::new();
        for p in &payloads {
            decoder.feed(&encode_record(p));
        }

        let records = drain(&mut decoder);
        assert_eq!(records.len(), payloads.len());
        for (record, payload) in records.iter().zip(&payloads) {
            assert_eq!(&record[..], &payload[..]);
        }
    }
}
