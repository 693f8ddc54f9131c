//! Send channel: sink operations out, one independent request each.
//!
//! Every accepted operation is encoded and dispatched as its own spawned
//! request. Dispatch of operation k+1 never waits for completion of
//! operation k; completions arrive in any order, and each operation's
//! callback fires exactly once with that operation's own outcome.
//!
//! Failure handling follows the configured [`SendErrorPolicy`]: fail-fast
//! reports the first dispatch failure back to the controller; the
//! connect-retry policy retries connection failures without bound and
//! suppresses everything else after logging it.

use std::sync::Arc;

use bytes::Bytes;
use eventstream_core::{MessageCodec, SharedCodec};
use http::{HeaderMap, Method, Uri};
use tokio::sync::mpsc;

use crate::ClientError;
use crate::config::SendErrorPolicy;
use crate::sink::{CompletionFn, SinkOperation};
use crate::transport::Transport;

/// The dispatching half of the send channel.
///
/// Owned by the controller; dropped on teardown. Spawned dispatches are
/// deliberately detached: an operation already in flight runs to its own
/// completion or failure and still fires its callback, even after the
/// subscription is gone.
pub(crate) struct SendChannel<S> {
    codec: SharedCodec<S>,
    transport: Arc<dyn Transport>,
    endpoint: Uri,
    headers: HeaderMap,
    policy: SendErrorPolicy,
    /// Unsuppressed dispatch failures, reported back to the controller.
    failures: mpsc::UnboundedSender<ClientError>,
}

impl<S: 'static> SendChannel<S> {
    pub(crate) fn new(
        codec: SharedCodec<S>,
        transport: Arc<dyn Transport>,
        endpoint: Uri,
        headers: HeaderMap,
        policy: SendErrorPolicy,
        failures: mpsc::UnboundedSender<ClientError>,
    ) -> Self {
        Self {
            codec,
            transport,
            endpoint,
            headers,
            policy,
            failures,
        }
    }

    /// Encode and dispatch one operation.
    pub(crate) fn dispatch(&self, operation: SinkOperation<S>) {
        let (payload, callback) = operation.into_parts();

        // Codecs are deterministic: an encode failure is never retried and
        // always terminates the channel.
        let body = match self.codec.encode(&payload) {
            Ok(body) => body,
            Err(e) => {
                let error = ClientError::from(e);
                complete(callback, Err(error.clone()));
                let _ = self.failures.send(error);
                return;
            }
        };

        let call = DispatchCall {
            transport: Arc::clone(&self.transport),
            endpoint: self.endpoint.clone(),
            headers: self.headers.clone(),
            body,
        };
        let policy = self.policy.clone();
        let failures = self.failures.clone();

        tokio::spawn(async move {
            match policy {
                SendErrorPolicy::FailFast => {
                    let result = call.attempt().await;
                    if let Err(e) = &result {
                        let _ = failures.send(e.clone());
                    }
                    complete(callback, result);
                }
                SendErrorPolicy::RetryConnect(backoff_policy) => {
                    let mut backoff = backoff_policy.backoff();
                    loop {
                        match call.attempt().await {
                            Ok(()) => {
                                complete(callback, Ok(()));
                                break;
                            }
                            Err(e) if e.is_connection() => {
                                let delay = backoff.next_delay();
                                tracing::debug!(
                                    error = %e,
                                    attempt = backoff.attempts(),
                                    delay_ms = delay.as_millis() as u64,
                                    "connection failure on send; retrying"
                                );
                                tokio::time::sleep(delay).await;
                            }
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    "send failed with non-connection error; suppressing"
                                );
                                complete(callback, Err(e));
                                break;
                            }
                        }
                    }
                }
            }
        });
    }
}

/// One dispatch, rebuildable per retry attempt.
struct DispatchCall {
    transport: Arc<dyn Transport>,
    endpoint: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl DispatchCall {
    async fn attempt(&self) -> Result<(), ClientError> {
        let mut request = http::Request::new(self.body.clone());
        *request.method_mut() = Method::POST;
        *request.uri_mut() = self.endpoint.clone();
        *request.headers_mut() = self.headers.clone();

        let response = self.transport.call(request).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Status {
                status: response.status(),
            })
        }
    }
}

fn complete(callback: Option<CompletionFn>, result: Result<(), ClientError>) {
    if let Some(callback) = callback {
        callback(result);
    }
}
