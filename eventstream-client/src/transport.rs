//! HTTP transport contract and the default hyper implementation.
//!
//! The client needs exactly two things from a transport:
//!
//! 1. [`Transport::open_stream`]: issue the subscribe request and obtain the
//!    long-lived response body as a stream of byte chunks.
//! 2. [`Transport::call`]: issue a one-shot request for a sink operation and
//!    collect the full response.
//!
//! Implementations must report connection-establishment failures as
//! [`ClientError::Connection`]; the send-side retry policy classifies on
//! that tag alone.

mod hyper;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use http::response::Parts;

use crate::ClientError;

pub use hyper::{HyperTransport, HyperTransportBuilder};

// Re-export the rustls config type users need for custom TLS setup.
pub use rustls::ClientConfig as TlsClientConfig;

/// Response body chunks, in arrival order.
pub type ByteChunkStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// Response to a subscribe request: head plus the unbounded body stream.
pub struct StreamingResponse {
    /// Response head (status and headers).
    pub parts: Parts,
    /// The chunked response body.
    pub chunks: ByteChunkStream,
}

impl StreamingResponse {
    /// The response status code.
    pub fn status(&self) -> http::StatusCode {
        self.parts.status
    }
}

/// Response to a one-shot call: head plus the collected body.
#[derive(Debug)]
pub struct CallResponse {
    /// Response head (status and headers).
    pub parts: Parts,
    /// The full response body.
    pub body: Bytes,
}

impl CallResponse {
    /// The response status code.
    pub fn status(&self) -> http::StatusCode {
        self.parts.status
    }
}

/// HTTP transport contract.
pub trait Transport: Send + Sync + 'static {
    /// Issue the subscribe request that opens the long-lived receive
    /// connection. The response body is exposed as a chunk stream with no
    /// chunking guarantees.
    fn open_stream(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'static, Result<StreamingResponse, ClientError>>;

    /// Issue a one-shot request, collecting the full response body.
    fn call(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'static, Result<CallResponse, ClientError>>;
}
