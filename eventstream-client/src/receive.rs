//! Receive channel: connection bytes in, typed events out.
//!
//! Two stream adapters do the work:
//! - [`RecordIoStream`]: an arbitrary-chunked byte stream in, complete
//!   RecordIO records out, in arrival order.
//! - [`MessageStream`]: records in, decoded messages out; a codec failure
//!   terminates the stream.
//!
//! [`receive_channel`] composes both with the channel's backpressure policy.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use eventstream_core::{MessageCodec, RecordDecoder, SharedCodec};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use crate::ClientError;
use crate::config::BackpressurePolicy;

/// Stream adapter that frames a chunked byte stream into RecordIO records.
///
/// Chunk boundaries carry no meaning: a record may arrive one byte at a
/// time or packed together with its neighbors. Upstream end-of-stream with
/// an empty decode buffer is a clean completion; anything else is a
/// truncation error.
pub struct RecordIoStream<S> {
    /// The underlying byte stream.
    stream: S,
    /// Incremental framing state.
    decoder: RecordDecoder,
    /// Whether the stream has terminated (cleanly or with an error).
    finished: bool,
}

impl<S> RecordIoStream<S> {
    /// Create a record stream with the default record length ceiling.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: RecordDecoder::new(),
            finished: false,
        }
    }

    /// Create a record stream with a custom record length ceiling.
    pub fn with_limit(stream: S, max_record_len: u64) -> Self {
        Self {
            stream,
            decoder: RecordDecoder::with_limit(max_record_len),
            finished: false,
        }
    }
}

impl<S> Unpin for RecordIoStream<S> where S: Unpin {}

impl<S> Stream for RecordIoStream<S>
where
    S: Stream<Item = Result<Bytes, ClientError>> + Unpin,
{
    type Item = Result<Bytes, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            // Drain buffered records before asking upstream for more bytes.
            match this.decoder.next_record() {
                Ok(Some(record)) => return Poll::Ready(Some(Ok(record))),
                Ok(None) => {}
                Err(e) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e.into())));
                }
            }

            match Pin::new(&mut this.stream).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.decoder.feed(&chunk);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    return match this.decoder.finish() {
                        Ok(()) => Poll::Ready(None),
                        Err(e) => Poll::Ready(Some(Err(e.into()))),
                    };
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Stream adapter that decodes each record into a typed message.
///
/// Decoding is assumed deterministic, so a failure is not retried: it
/// terminates the stream with [`ClientError::Codec`].
pub struct MessageStream<S, T> {
    records: S,
    codec: SharedCodec<T>,
    finished: bool,
}

impl<S, T> MessageStream<S, T> {
    /// Create a message stream decoding with the given codec.
    pub fn new(records: S, codec: SharedCodec<T>) -> Self {
        Self {
            records,
            codec,
            finished: false,
        }
    }
}

impl<S, T> Unpin for MessageStream<S, T> where S: Unpin {}

impl<S, T> Stream for MessageStream<S, T>
where
    S: Stream<Item = Result<Bytes, ClientError>> + Unpin,
    T: 'static,
{
    type Item = Result<T, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.finished {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.records).poll_next(cx) {
            Poll::Ready(Some(Ok(record))) => match this.codec.decode(&record) {
                Ok(message) => Poll::Ready(Some(Ok(message))),
                Err(e) => {
                    this.finished = true;
                    Poll::Ready(Some(Err(e.into())))
                }
            },
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Assemble the receive channel: chunked bytes through framing and decoding,
/// under the channel's backpressure policy.
pub(crate) fn receive_channel<T: Send + 'static>(
    chunks: BoxStream<'static, Result<Bytes, ClientError>>,
    codec: SharedCodec<T>,
    policy: &BackpressurePolicy,
    max_record_len: u64,
) -> BoxStream<'static, Result<T, ClientError>> {
    let records = RecordIoStream::with_limit(chunks, max_record_len);
    let messages = MessageStream::new(records, codec);
    policy.apply(messages.boxed())
}
