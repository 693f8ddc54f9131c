//! Client error taxonomy.
//!
//! Every failure the client can observe is a [`ClientError`] variant, so
//! classification (notably "is this a connection-establishment failure?" on
//! the send path) is a direct tag match rather than source-chain
//! introspection.

use eventstream_core::{CodecError, FrameError};
use http::StatusCode;

/// Errors surfaced by the client.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    /// The receive stream violated the RecordIO framing, or ended mid-frame.
    /// Fatal to the connection; the decoder does not resynchronize.
    #[error("framing error: {0}")]
    Framing(#[from] FrameError),

    /// A payload failed to encode or decode. Codecs are deterministic, so
    /// this is never retried.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The transport failed to establish a connection. This is the one
    /// variant the send-side retry policy treats as transient.
    #[error("connection error: {0}")]
    Connection(String),

    /// A transport failure that is not a connection-establishment failure
    /// (protocol error on an open connection, malformed response, etc.).
    #[error("transport error: {0}")]
    Transport(String),

    /// The subscribe request was rejected by the server. Resubscribing may
    /// need fresh session state, so the client never retries this itself.
    #[error("subscribe rejected with status {status}")]
    Subscribe { status: StatusCode },

    /// A sink call was rejected by the server.
    #[error("call rejected with status {status}")]
    Status { status: StatusCode },

    /// A bounded buffer overflowed under the fail-fast overflow strategy.
    #[error("backpressure buffer overflow: capacity {capacity} exceeded")]
    Overflow { capacity: usize },
}

impl ClientError {
    /// Whether this is a connection-establishment failure.
    ///
    /// Used by [`SendErrorPolicy::RetryConnect`](crate::SendErrorPolicy) to
    /// decide between retrying and suppressing.
    pub fn is_connection(&self) -> bool {
        matches!(self, ClientError::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_connection() {
        assert!(ClientError::Connection("refused".into()).is_connection());
        assert!(!ClientError::Transport("reset mid-body".into()).is_connection());
        assert!(
            !ClientError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR
            }
            .is_connection()
        );
    }

    #[test]
    fn test_from_frame_error() {
        let err: ClientError = FrameError::EmptyLengthPrefix.into();
        assert!(matches!(err, ClientError::Framing(_)));
        assert!(!err.is_connection());
    }

    #[test]
    fn test_display() {
        let err = ClientError::Subscribe {
            status: StatusCode::FORBIDDEN,
        };
        assert_eq!(err.to_string(), "subscribe rejected with status 403 Forbidden");
    }
}
