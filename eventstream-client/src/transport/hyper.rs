//! Hyper-based HTTP transport.
//!
//! [`HyperTransport`] uses hyper_util's legacy client with a rustls HTTPS
//! connector: HTTP/1.1 and HTTP/2 with ALPN, connection pooling, and native
//! root certificates by default.

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::StreamExt;
use http_body_util::{BodyExt, BodyStream, Full};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;

use super::{CallResponse, StreamingResponse, Transport};
use crate::ClientError;

/// Type alias for the hyper client with HTTPS connector.
type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// HTTP transport using hyper_util's legacy client.
///
/// # Example
///
/// ```ignore
/// use eventstream_client::transport::HyperTransport;
/// use std::time::Duration;
///
/// let transport = HyperTransport::builder()
///     .pool_idle_timeout(Duration::from_secs(60))
///     .build()?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a new transport builder.
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Create a new transport with default settings.
    pub fn new() -> Result<Self, ClientError> {
        Self::builder().build()
    }

    async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Incoming>, ClientError> {
        let (parts, body) = request.into_parts();
        let request = http::Request::from_parts(parts, Full::new(body));
        self.client.request(request).await.map_err(map_client_error)
    }
}

/// Map a hyper_util client error, keeping connection-establishment failures
/// distinguishable for retry classification.
fn map_client_error(e: hyper_util::client::legacy::Error) -> ClientError {
    if e.is_connect() {
        ClientError::Connection(e.to_string())
    } else {
        ClientError::Transport(format!("request failed: {e}"))
    }
}

impl Transport for HyperTransport {
    fn open_stream(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'static, Result<StreamingResponse, ClientError>> {
        let this = self.clone();
        Box::pin(async move {
            let response = this.send(request).await?;
            let (parts, body) = response.into_parts();
            let chunks = BodyStream::new(body)
                .filter_map(|frame| async move {
                    match frame {
                        // Trailer frames carry no body bytes.
                        Ok(frame) => frame.into_data().ok().map(Ok),
                        Err(e) => Some(Err(ClientError::Connection(format!(
                            "response stream failed: {e}"
                        )))),
                    }
                })
                .boxed();
            Ok(StreamingResponse { parts, chunks })
        })
    }

    fn call(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'static, Result<CallResponse, ClientError>> {
        let this = self.clone();
        Box::pin(async move {
            let response = this.send(request).await?;
            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| ClientError::Connection(format!("response body failed: {e}")))?
                .to_bytes();
            Ok(CallResponse { parts, body })
        })
    }
}

/// Builder for [`HyperTransport`].
pub struct HyperTransportBuilder {
    /// Custom TLS configuration.
    tls_config: Option<ClientConfig>,
    /// Force HTTP/2 only (for h2c or when HTTP/2 is required).
    http2_only: bool,
    /// Connection pool idle timeout.
    pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host.
    pool_max_idle_per_host: usize,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransportBuilder {
    /// Create a new transport builder with default settings.
    pub fn new() -> Self {
        Self {
            tls_config: None,
            http2_only: false,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }

    /// Set a custom TLS configuration.
    ///
    /// Use this for custom root certificates or client certificates (mTLS).
    /// Without it, the system's native root certificates are used.
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Enable HTTP/2 only mode.
    ///
    /// Uses HTTP/2 directly without the HTTP/1.1 upgrade handshake. Needed
    /// for h2c masters; HTTPS endpoints negotiate HTTP/2 via ALPN anyway.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Set the connection pool idle timeout.
    ///
    /// Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of idle connections per host.
    ///
    /// Default: 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<HyperTransport, ClientError> {
        let https_builder = match self.tls_config {
            Some(config) => HttpsConnectorBuilder::new().with_tls_config(config),
            None => HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| ClientError::Transport(format!("failed to load native roots: {e}")))?,
        };
        let https_connector = https_builder
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_timer(TokioTimer::new());
        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);
        if self.http2_only {
            builder.http2_only(true);
        }

        Ok(HyperTransport {
            client: builder.build(https_connector),
        })
    }
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("http2_only", &self.http2_only)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = HyperTransportBuilder::new();
        assert!(!builder.http2_only);
        assert_eq!(builder.pool_max_idle_per_host, 32);
        assert!(builder.pool_idle_timeout.is_some());
    }

    #[test]
    fn test_builder_settings() {
        let builder = HyperTransportBuilder::new()
            .http2_only(true)
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(10);
        assert!(builder.http2_only);
        assert_eq!(builder.pool_idle_timeout, Some(Duration::from_secs(60)));
        assert_eq!(builder.pool_max_idle_per_host, 10);
    }

    #[tokio::test]
    async fn test_build_transport() {
        let result = HyperTransportBuilder::new().build();
        assert!(result.is_ok());
    }
}
