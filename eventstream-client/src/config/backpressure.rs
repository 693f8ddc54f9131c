//! Backpressure policies for the receive and send channels.
//!
//! Both channels expose their items as pull-shaped streams: one item crosses
//! the boundary only when the consumer polls for it. A [`BackpressurePolicy`]
//! decides what happens between the producer and that demand signal:
//!
//! - [`StrictDemand`](BackpressurePolicy::StrictDemand) (default): no
//!   intermediate buffer; upstream is only polled when the consumer polls.
//! - [`Unbounded`](BackpressurePolicy::Unbounded): an eager buffering task
//!   accepts every item regardless of demand, bounded only by memory.
//! - [`Bounded`](BackpressurePolicy::Bounded): an eager buffer of fixed
//!   capacity with an explicit [`OverflowStrategy`].

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio::sync::Notify;

use crate::ClientError;

/// Callback invoked each time the bounded buffer overflows.
pub type OverflowCallback = Arc<dyn Fn() + Send + Sync>;

/// What a bounded buffer does when an item arrives and no slot is free.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowStrategy {
    /// Terminate the channel with [`ClientError::Overflow`], dropping all
    /// undelivered items.
    Error,
    /// Drop the newly arrived item; buffered items are untouched.
    DropNewest,
    /// Drop the oldest buffered item to make room for the new one.
    DropOldest,
}

/// Backpressure policy for one channel.
#[derive(Clone, Default)]
pub enum BackpressurePolicy {
    /// No buffering; the consumer's poll is the demand signal.
    #[default]
    StrictDemand,
    /// Buffer every item regardless of consumer demand.
    Unbounded,
    /// Buffer up to `capacity` items; overflow is handled per `strategy`,
    /// and every overflow invokes `on_overflow` when present.
    Bounded {
        capacity: usize,
        strategy: OverflowStrategy,
        on_overflow: Option<OverflowCallback>,
    },
}

impl BackpressurePolicy {
    /// A bounded buffer with no overflow callback.
    pub fn bounded(capacity: usize, strategy: OverflowStrategy) -> Self {
        BackpressurePolicy::Bounded {
            capacity,
            strategy,
            on_overflow: None,
        }
    }

    /// A bounded buffer invoking `on_overflow` on every overflow.
    pub fn bounded_with_callback<F>(capacity: usize, strategy: OverflowStrategy, on_overflow: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        BackpressurePolicy::Bounded {
            capacity,
            strategy,
            on_overflow: Some(Arc::new(on_overflow)),
        }
    }

    /// Wrap a stream according to this policy.
    ///
    /// `StrictDemand` is the identity; the buffering policies spawn an eager
    /// producer task and must therefore be applied inside a tokio runtime.
    pub(crate) fn apply<T: Send + 'static>(
        &self,
        stream: BoxStream<'static, Result<T, ClientError>>,
    ) -> BoxStream<'static, Result<T, ClientError>> {
        match self {
            BackpressurePolicy::StrictDemand => stream,
            BackpressurePolicy::Unbounded => {
                BufferedStream::spawn(stream, None, OverflowStrategy::DropOldest, None).boxed()
            }
            BackpressurePolicy::Bounded {
                capacity,
                strategy,
                on_overflow,
            } => BufferedStream::spawn(stream, Some(*capacity), *strategy, on_overflow.clone())
                .boxed(),
        }
    }
}

impl std::fmt::Debug for BackpressurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackpressurePolicy::StrictDemand => write!(f, "StrictDemand"),
            BackpressurePolicy::Unbounded => write!(f, "Unbounded"),
            BackpressurePolicy::Bounded {
                capacity,
                strategy,
                on_overflow,
            } => f
                .debug_struct("Bounded")
                .field("capacity", capacity)
                .field("strategy", strategy)
                .field("has_overflow_callback", &on_overflow.is_some())
                .finish(),
        }
    }
}

struct Shared<T> {
    queue: VecDeque<Result<T, ClientError>>,
    done: bool,
    waker: Option<Waker>,
}

impl<T> Shared<T> {
    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }
}

/// Eagerly buffered stream: a spawned task drains the upstream as fast as it
/// produces, and the consumer pops from the shared queue on its own schedule.
struct BufferedStream<T> {
    shared: Arc<Mutex<Shared<T>>>,
    closed: Arc<Notify>,
}

impl<T: Send + 'static> BufferedStream<T> {
    fn spawn(
        mut upstream: BoxStream<'static, Result<T, ClientError>>,
        capacity: Option<usize>,
        strategy: OverflowStrategy,
        on_overflow: Option<OverflowCallback>,
    ) -> Self {
        let shared = Arc::new(Mutex::new(Shared {
            queue: VecDeque::new(),
            done: false,
            waker: None,
        }));
        let closed = Arc::new(Notify::new());

        let task_shared = Arc::clone(&shared);
        let task_closed = Arc::clone(&closed);
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = task_closed.notified() => None,
                    item = upstream.next() => item,
                };
                let Some(item) = next else { break };

                // Errors are terminal and are never dropped: decode-path
                // failures must reach the consumer even at capacity.
                let is_err = item.is_err();
                let mut stop = is_err;
                let mut overflowed = false;
                {
                    let mut shared = task_shared.lock().unwrap();
                    match capacity {
                        Some(cap) if !is_err && shared.queue.len() >= cap => {
                            overflowed = true;
                            match strategy {
                                OverflowStrategy::Error => {
                                    tracing::debug!(
                                        capacity = cap,
                                        "backpressure buffer overflowed; terminating channel"
                                    );
                                    shared.queue.push_back(Err(ClientError::Overflow {
                                        capacity: cap,
                                    }));
                                    stop = true;
                                }
                                OverflowStrategy::DropNewest => {
                                    tracing::debug!(
                                        capacity = cap,
                                        "backpressure buffer full; dropping newest item"
                                    );
                                }
                                OverflowStrategy::DropOldest => {
                                    tracing::debug!(
                                        capacity = cap,
                                        "backpressure buffer full; dropping oldest item"
                                    );
                                    shared.queue.pop_front();
                                    shared.queue.push_back(item);
                                }
                            }
                        }
                        _ => shared.queue.push_back(item),
                    }
                    shared.wake();
                }
                if overflowed {
                    if let Some(callback) = &on_overflow {
                        callback();
                    }
                }
                if stop {
                    break;
                }
            }
            let mut shared = task_shared.lock().unwrap();
            shared.done = true;
            shared.wake();
        });

        Self { shared, closed }
    }
}

impl<T> Stream for BufferedStream<T> {
    type Item = Result<T, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut shared = self.shared.lock().unwrap();
        if let Some(item) = shared.queue.pop_front() {
            return Poll::Ready(Some(item));
        }
        if shared.done {
            return Poll::Ready(None);
        }
        shared.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl<T> Drop for BufferedStream<T> {
    fn drop(&mut self) {
        // Stop the producer task; without this it would hold the upstream
        // (and with it the connection) open forever.
        self.closed.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn items(values: &[&'static str]) -> BoxStream<'static, Result<&'static str, ClientError>> {
        stream::iter(values.iter().map(|v| Ok(*v)).collect::<Vec<_>>()).boxed()
    }

    async fn settle() {
        // Let the eager producer task drain its upstream before consuming.
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn test_strict_demand_is_identity() {
        let policy = BackpressurePolicy::StrictDemand;
        let out: Vec<_> = policy.apply(items(&["a", "b"])).collect().await;
        let values: Vec<_> = out.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_accepts_everything() {
        let policy = BackpressurePolicy::Unbounded;
        let inputs: Vec<Result<u32, ClientError>> = (0..100).map(Ok).collect();
        let mut buffered = policy.apply(stream::iter(inputs).boxed());
        settle().await;

        let mut seen = Vec::new();
        while let Some(item) = buffered.next().await {
            seen.push(item.unwrap());
        }
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_drop_oldest() {
        // Capacity 2, [A,B,C,D] pushed faster than consumed: the consumer
        // observes [C,D] and the overflow callback fires twice (for A and B).
        let overflows = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&overflows);
        let policy = BackpressurePolicy::bounded_with_callback(2, OverflowStrategy::DropOldest, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut buffered = policy.apply(items(&["A", "B", "C", "D"]));
        settle().await;

        let mut seen = Vec::new();
        while let Some(item) = buffered.next().await {
            seen.push(item.unwrap());
        }
        assert_eq!(seen, vec!["C", "D"]);
        assert_eq!(overflows.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_drop_newest() {
        let policy = BackpressurePolicy::bounded(2, OverflowStrategy::DropNewest);
        let mut buffered = policy.apply(items(&["A", "B", "C", "D"]));
        settle().await;

        let mut seen = Vec::new();
        while let Some(item) = buffered.next().await {
            seen.push(item.unwrap());
        }
        assert_eq!(seen, vec!["A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_fail_fast() {
        // Same input under the fail-fast strategy: [A,B] observed, then the
        // overflow error, with nothing after it.
        let policy = BackpressurePolicy::bounded(2, OverflowStrategy::Error);
        let mut buffered = policy.apply(items(&["A", "B", "C", "D"]));
        settle().await;

        assert_eq!(buffered.next().await.unwrap().unwrap(), "A");
        assert_eq!(buffered.next().await.unwrap().unwrap(), "B");
        let err = buffered.next().await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::Overflow { capacity: 2 }));
        assert!(buffered.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_survives_full_buffer() {
        let inputs: Vec<Result<u32, ClientError>> = vec![
            Ok(1),
            Ok(2),
            Err(ClientError::Transport("reset".into())),
        ];
        let policy = BackpressurePolicy::bounded(2, OverflowStrategy::DropNewest);
        let mut buffered = policy.apply(stream::iter(inputs).boxed());
        settle().await;

        assert_eq!(buffered.next().await.unwrap().unwrap(), 1);
        assert_eq!(buffered.next().await.unwrap().unwrap(), 2);
        assert!(buffered.next().await.unwrap().is_err());
        assert!(buffered.next().await.is_none());
    }

    #[test]
    fn test_policy_debug() {
        let policy = BackpressurePolicy::bounded(8, OverflowStrategy::DropOldest);
        let rendered = format!("{policy:?}");
        assert!(rendered.contains("capacity: 8"));
        assert!(rendered.contains("DropOldest"));
    }
}
