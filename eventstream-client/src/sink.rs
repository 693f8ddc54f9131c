//! Sink operations: outbound payloads with completion notification.

use crate::ClientError;

/// Completion callback for a sink operation.
pub type CompletionFn = Box<dyn FnOnce(Result<(), ClientError>) + Send + 'static>;

/// One outbound call: a payload plus an optional completion callback.
///
/// The callback observes the dispatch outcome of this operation alone,
/// independent of any other in-flight operation, and fires at most once;
/// `FnOnce` ownership makes double-signalling unrepresentable.
///
/// # Example
///
/// ```ignore
/// let op = SinkOperation::new(acknowledge_call)
///     .on_completion(|result| match result {
///         Ok(()) => tracing::debug!("acknowledged"),
///         Err(e) => tracing::warn!(error = %e, "acknowledge failed"),
///     });
/// ```
pub struct SinkOperation<S> {
    payload: S,
    on_complete: Option<CompletionFn>,
}

impl<S> SinkOperation<S> {
    /// Create an operation with no completion callback.
    pub fn new(payload: S) -> Self {
        Self {
            payload,
            on_complete: None,
        }
    }

    /// Attach a completion callback, replacing any existing one.
    pub fn on_completion<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Result<(), ClientError>) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// The outbound payload.
    pub fn payload(&self) -> &S {
        &self.payload
    }

    pub(crate) fn into_parts(self) -> (S, Option<CompletionFn>) {
        (self.payload, self.on_complete)
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for SinkOperation<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkOperation")
            .field("payload", &self.payload)
            .field("has_completion", &self.on_complete.is_some())
            .finish()
    }
}
