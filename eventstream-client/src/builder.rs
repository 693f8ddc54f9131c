//! Validating client builder.
//!
//! Every mandatory field is checked at [`build`](ClientBuilder::build) time,
//! before any network activity; a missing field fails with a
//! [`BuildError::MissingField`] naming it. The two backpressure policies and
//! the send-error policy are optional and default to "no special handling":
//! strict demand and fail-fast.

use std::sync::Arc;

use eventstream_core::{DEFAULT_MAX_RECORD_LEN, MessageCodec, SharedCodec};
use http::{HeaderName, Uri};

use crate::client::{Config, EventClient, EventStream, SinkOperationStream, StreamProcessor};
use crate::config::{BackpressurePolicy, SendErrorPolicy};
use crate::transport::{HyperTransport, Transport};
use crate::user_agent::UserAgentEntry;

/// Builder for an [`EventClient`].
///
/// # Example
///
/// ```ignore
/// use eventstream_client::{EventClient, SinkOperation};
/// use eventstream_core::JsonCodec;
/// use futures::StreamExt;
///
/// let client = EventClient::builder()
///     .endpoint("http://master.example:5050/api/v1/scheduler".parse()?)
///     .send_codec(JsonCodec::<Call>::new())
///     .receive_codec(JsonCodec::<Event>::new())
///     .subscribe(Call::subscribe())
///     .process_stream(|events| {
///         events
///             .map(|event| match event {
///                 Event::Heartbeat => None,
///                 event => Some(SinkOperation::new(Call::acknowledge(&event))),
///             })
///             .boxed()
///     })
///     .build()?;
///
/// client.run().await?;
/// ```
pub struct ClientBuilder<S, R> {
    endpoint: Option<Uri>,
    send_codec: Option<SharedCodec<S>>,
    receive_codec: Option<SharedCodec<R>>,
    subscribe: Option<S>,
    processor: Option<StreamProcessor<S, R>>,
    receive_backpressure: BackpressurePolicy,
    send_backpressure: BackpressurePolicy,
    send_error_policy: SendErrorPolicy,
    user_agent_entry: Option<UserAgentEntry>,
    stream_id_header: HeaderName,
    max_record_len: u64,
    transport: Option<Arc<dyn Transport>>,
}

impl<S, R> Default for ClientBuilder<S, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, R> ClientBuilder<S, R> {
    /// Create a builder with default policies.
    pub fn new() -> Self {
        Self {
            endpoint: None,
            send_codec: None,
            receive_codec: None,
            subscribe: None,
            processor: None,
            receive_backpressure: BackpressurePolicy::default(),
            send_backpressure: BackpressurePolicy::default(),
            send_error_policy: SendErrorPolicy::default(),
            user_agent_entry: None,
            stream_id_header: HeaderName::from_static("x-stream-id"),
            max_record_len: DEFAULT_MAX_RECORD_LEN,
            transport: None,
        }
    }

    /// The master endpoint the SUBSCRIBE request is sent to.
    ///
    /// Userinfo in the URI (`user:pass@host`) becomes an
    /// `Authorization: Basic` header on every request.
    pub fn endpoint(mut self, endpoint: Uri) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Codec for outbound (`Send`) messages.
    pub fn send_codec<C: MessageCodec<S>>(mut self, codec: C) -> Self {
        self.send_codec = Some(Arc::new(codec));
        self
    }

    /// Codec for inbound (`Receive`) messages.
    pub fn receive_codec<C: MessageCodec<R>>(mut self, codec: C) -> Self {
        self.receive_codec = Some(Arc::new(codec));
        self
    }

    /// The SUBSCRIBE payload that opens the event stream.
    pub fn subscribe(mut self, subscribe: S) -> Self {
        self.subscribe = Some(subscribe);
        self
    }

    /// The caller's reaction logic.
    ///
    /// The function receives the decoded event stream and returns a stream
    /// of zero-or-one operations per element; `Some` operations are routed
    /// to the send channel, `None` is discarded. The function may transform
    /// the event stream freely (filter, log, aggregate) before deciding.
    pub fn process_stream<F>(mut self, processor: F) -> Self
    where
        F: FnOnce(EventStream<R>) -> SinkOperationStream<S> + Send + 'static,
    {
        self.processor = Some(Box::new(processor));
        self
    }

    /// Backpressure policy for the receive channel. Default: strict demand.
    pub fn receive_backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.receive_backpressure = policy;
        self
    }

    /// Backpressure policy for the send channel. Default: strict demand.
    pub fn send_backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.send_backpressure = policy;
        self
    }

    /// What a failed dispatch does to the send channel. Default: fail fast.
    pub fn on_send_error(mut self, policy: SendErrorPolicy) -> Self {
        self.send_error_policy = policy;
        self
    }

    /// The application's User-Agent entry, prepended to the library's own.
    pub fn user_agent_entry(mut self, entry: UserAgentEntry) -> Self {
        self.user_agent_entry = Some(entry);
        self
    }

    /// The header carrying the subscription's stream id.
    ///
    /// Captured from the subscribe response and echoed on every sink call.
    /// Default: `x-stream-id`.
    pub fn stream_id_header(mut self, name: HeaderName) -> Self {
        self.stream_id_header = name;
        self
    }

    /// Ceiling on a single record's declared length.
    pub fn max_record_len(mut self, max: u64) -> Self {
        self.max_record_len = max;
        self
    }

    /// Use a custom transport instead of the default [`HyperTransport`].
    pub fn transport<T: Transport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Validate the configuration and build the client.
    ///
    /// # Errors
    ///
    /// [`BuildError::MissingField`] when a mandatory field was not set;
    /// [`BuildError::Transport`] when the default transport cannot be
    /// constructed. No I/O happens here.
    pub fn build(self) -> Result<EventClient<S, R>, BuildError> {
        let endpoint = self.endpoint.ok_or(BuildError::MissingField("endpoint"))?;
        let send_codec = self
            .send_codec
            .ok_or(BuildError::MissingField("send_codec"))?;
        let receive_codec = self
            .receive_codec
            .ok_or(BuildError::MissingField("receive_codec"))?;
        let subscribe = self.subscribe.ok_or(BuildError::MissingField("subscribe"))?;
        let processor = self
            .processor
            .ok_or(BuildError::MissingField("process_stream"))?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                HyperTransport::new().map_err(|e| BuildError::Transport(e.to_string()))?,
            ),
        };

        Ok(EventClient::new(Config {
            endpoint,
            send_codec,
            receive_codec,
            subscribe,
            processor,
            receive_backpressure: self.receive_backpressure,
            send_backpressure: self.send_backpressure,
            send_error_policy: self.send_error_policy,
            user_agent: crate::user_agent::UserAgent::for_application(self.user_agent_entry),
            stream_id_header: self.stream_id_header,
            max_record_len: self.max_record_len,
            transport,
        }))
    }
}

impl<S, R> std::fmt::Debug for ClientBuilder<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("send_codec", &self.send_codec.is_some())
            .field("receive_codec", &self.receive_codec.is_some())
            .field("subscribe", &self.subscribe.is_some())
            .field("processor", &self.processor.is_some())
            .field("receive_backpressure", &self.receive_backpressure)
            .field("send_backpressure", &self.send_backpressure)
            .field("send_error_policy", &self.send_error_policy)
            .field("stream_id_header", &self.stream_id_header)
            .field("max_record_len", &self.max_record_len)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

/// Errors raised while validating and building the configuration.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A mandatory builder field was not set.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The default HTTP transport could not be constructed.
    #[error("failed to create HTTP transport: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{CallResponse, StreamingResponse};
    use bytes::Bytes;
    use eventstream_core::StringCodec;
    use futures::StreamExt;
    use futures::future::BoxFuture;

    struct NullTransport;

    impl Transport for NullTransport {
        fn open_stream(
            &self,
            _request: http::Request<Bytes>,
        ) -> BoxFuture<'static, Result<StreamingResponse, crate::ClientError>> {
            Box::pin(async { Err(crate::ClientError::Transport("unused".into())) })
        }

        fn call(
            &self,
            _request: http::Request<Bytes>,
        ) -> BoxFuture<'static, Result<CallResponse, crate::ClientError>> {
            Box::pin(async { Err(crate::ClientError::Transport("unused".into())) })
        }
    }

    fn complete_builder() -> ClientBuilder<String, String> {
        ClientBuilder::new()
            .endpoint(Uri::from_static("http://master.example:5050/api/v1/scheduler"))
            .send_codec(StringCodec)
            .receive_codec(StringCodec)
            .subscribe("SUBSCRIBE".to_string())
            .process_stream(|events| events.map(|_| None).boxed())
            .transport(NullTransport)
    }

    #[test]
    fn test_build_with_all_fields() {
        assert!(complete_builder().build().is_ok());
    }

    #[test]
    fn test_missing_fields_are_named() {
        let err = ClientBuilder::<String, String>::new().build().unwrap_err();
        assert!(matches!(err, BuildError::MissingField("endpoint")));

        let err = ClientBuilder::<String, String>::new()
            .endpoint(Uri::from_static("http://master.example:5050"))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingField("send_codec")));

        let err = ClientBuilder::<String, String>::new()
            .endpoint(Uri::from_static("http://master.example:5050"))
            .send_codec(StringCodec)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingField("receive_codec")));

        let err = ClientBuilder::<String, String>::new()
            .endpoint(Uri::from_static("http://master.example:5050"))
            .send_codec(StringCodec)
            .receive_codec(StringCodec)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingField("subscribe")));

        let err = ClientBuilder::<String, String>::new()
            .endpoint(Uri::from_static("http://master.example:5050"))
            .send_codec(StringCodec)
            .receive_codec(StringCodec)
            .subscribe("SUBSCRIBE".to_string())
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingField("process_stream")));
    }

    #[test]
    fn test_missing_field_error_message() {
        let err = BuildError::MissingField("endpoint");
        assert_eq!(err.to_string(), "missing required field: endpoint");
    }

    #[test]
    fn test_defaults() {
        let builder = ClientBuilder::<String, String>::new();
        assert!(matches!(
            builder.receive_backpressure,
            BackpressurePolicy::StrictDemand
        ));
        assert!(matches!(
            builder.send_backpressure,
            BackpressurePolicy::StrictDemand
        ));
        assert!(matches!(builder.send_error_policy, SendErrorPolicy::FailFast));
        assert_eq!(builder.stream_id_header.as_str(), "x-stream-id");
        assert_eq!(builder.max_record_len, DEFAULT_MAX_RECORD_LEN);
    }

    #[test]
    fn test_fluent_overrides() {
        let builder = ClientBuilder::<String, String>::new()
            .receive_backpressure(BackpressurePolicy::Unbounded)
            .on_send_error(SendErrorPolicy::retry_connect())
            .stream_id_header(HeaderName::from_static("x-master-stream-id"))
            .max_record_len(1024);

        assert!(matches!(
            builder.receive_backpressure,
            BackpressurePolicy::Unbounded
        ));
        assert!(matches!(
            builder.send_error_policy,
            SendErrorPolicy::RetryConnect(_)
        ));
        assert_eq!(builder.stream_id_header.as_str(), "x-master-stream-id");
        assert_eq!(builder.max_record_len, 1024);
    }
}
