//! Client for master/agent streaming HTTP APIs.
//!
//! A process using this crate issues one SUBSCRIBE call, receives an
//! unbounded chunked response body framed as RecordIO records
//! (`<length>\n<payload>`), reacts to each decoded event, and optionally
//! sends further calls back to the master over an independent HTTP channel.
//!
//! ## Architecture
//!
//! - **Receive channel**: transport bytes → RecordIO framing → message codec
//!   → a pull-shaped stream of typed events, under a configurable
//!   [`BackpressurePolicy`].
//! - **Stream processor**: the caller's reaction logic. It owns the event
//!   stream and emits zero-or-one [`SinkOperation`] per element.
//! - **Send channel**: operations are encoded and dispatched as independent
//!   concurrent requests; completions are unordered and each operation's
//!   callback fires exactly once. A [`SendErrorPolicy`] decides whether a
//!   failed dispatch terminates the subscription, is retried (connection
//!   failures), or is suppressed.
//! - **Controller**: [`EventClient::run`] wires the two channels together
//!   and drives `Idle → Subscribing → Streaming → {Completed | Failed}`.
//!
//! ## Example
//!
//! ```ignore
//! use eventstream_client::{EventClient, SinkOperation, UserAgentEntry};
//! use eventstream_core::JsonCodec;
//! use futures::StreamExt;
//!
//! let client = EventClient::builder()
//!     .endpoint("http://master.example:5050/api/v1/scheduler".parse()?)
//!     .user_agent_entry(UserAgentEntry::new("my-scheduler", "1.0"))
//!     .send_codec(JsonCodec::<Call>::new())
//!     .receive_codec(JsonCodec::<Event>::new())
//!     .subscribe(Call::subscribe())
//!     .process_stream(|events| {
//!         events
//!             .map(|event| match event {
//!                 Event::Heartbeat => None,
//!                 event => Some(SinkOperation::new(Call::acknowledge(&event))),
//!             })
//!             .boxed()
//!     })
//!     .build()?;
//!
//! // Runs until the master closes the stream or the subscription fails.
//! client.run().await?;
//! ```
//!
//! ## Reconnection
//!
//! A completed or failed subscription is terminal. Reconnect-and-resubscribe
//! is left to the caller: a fresh SUBSCRIBE usually needs updated session
//! state (resource versions, failover ids), which only the application has.
//!
//! ## Cancellation
//!
//! Dropping the [`run`](EventClient::run) future unsubscribes. Operations
//! already dispatched on the send channel are not aborted; each runs to its
//! own completion and still fires its callback.

mod builder;
mod client;
pub mod config;
mod error;
mod receive;
mod send;
mod sink;
pub mod transport;
mod user_agent;

pub use builder::{BuildError, ClientBuilder};
pub use client::{EventClient, EventStream, SinkOperationStream, StreamProcessor};
pub use error::ClientError;
pub use sink::{CompletionFn, SinkOperation};
pub use user_agent::{UserAgent, UserAgentEntry};

// Re-export from the config module
pub use config::{
    BackoffPolicy, BackpressurePolicy, ExponentialBackoff, OverflowCallback, OverflowStrategy,
    SendErrorPolicy,
};

// Re-export the receive-side stream adapters for callers that bring their
// own transport
pub use receive::{MessageStream, RecordIoStream};

// Re-export transport types at the top level for convenience
pub use transport::{HyperTransport, HyperTransportBuilder, Transport};

// Re-export core types that users need
pub use eventstream_core::{
    CodecError, DEFAULT_MAX_RECORD_LEN, FrameError, JsonCodec, MessageCodec, ProtoCodec,
    RecordDecoder, SharedCodec, StringCodec, encode_record,
};

// Re-export for record payload handling
pub use bytes::Bytes;
