//! Send-error policy and exponential backoff.
//!
//! The send channel dispatches each sink operation as an independent request.
//! [`SendErrorPolicy`] decides what a failed dispatch does to the channel:
//!
//! - [`FailFast`](SendErrorPolicy::FailFast) (default): the first failure
//!   terminates the channel and with it the whole subscription.
//! - [`RetryConnect`](SendErrorPolicy::RetryConnect): connection-establishment
//!   failures are retried without bound on a jittered exponential backoff,
//!   each attempt logged. Any *other* failure is logged, reported to that
//!   operation's completion callback, and then suppressed: the channel keeps
//!   running as if the operation had never existed. The suppression is a
//!   deliberate keep-the-stream-alive trade-off; it is opt-in and never the
//!   default.

use std::time::Duration;

/// Default backoff values.
pub mod defaults {
    use std::time::Duration;

    /// Default initial delay before the first retry.
    pub const BASE_DELAY: Duration = Duration::from_secs(1);

    /// Default multiplier for exponential backoff.
    pub const MULTIPLIER: f64 = 1.6;

    /// Default jitter factor (0.2 means +/- 20%).
    pub const JITTER: f64 = 0.2;

    /// Default maximum delay between retries.
    pub const MAX_DELAY: Duration = Duration::from_secs(120);
}

/// Configuration for the retry backoff schedule.
///
/// There is no attempt cap: the send channel retries connection failures
/// until the dispatch succeeds or the subscription is torn down.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use eventstream_client::BackoffPolicy;
///
/// let policy = BackoffPolicy::new()
///     .base_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_secs(30));
/// ```
#[derive(Clone, Debug)]
pub struct BackoffPolicy {
    /// Initial delay before the first retry.
    pub base_delay: Duration,

    /// Multiplier for exponential backoff. Should be >= 1.0.
    pub multiplier: f64,

    /// Jitter factor between 0.0 and 1.0. A value of 0.2 means the actual
    /// delay lands within +/- 20% of the calculated delay.
    pub jitter: f64,

    /// Maximum delay between retries.
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: defaults::BASE_DELAY,
            multiplier: defaults::MULTIPLIER,
            jitter: defaults::JITTER,
            max_delay: defaults::MAX_DELAY,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial delay before the first retry.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    ///
    /// # Panics
    ///
    /// Panics if `multiplier` is less than 1.0.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        assert!(multiplier >= 1.0, "multiplier must be >= 1.0");
        self.multiplier = multiplier;
        self
    }

    /// Set the jitter factor.
    ///
    /// # Panics
    ///
    /// Panics if `jitter` is not between 0.0 and 1.0.
    pub fn jitter(mut self, jitter: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&jitter),
            "jitter must be between 0.0 and 1.0"
        );
        self.jitter = jitter;
        self
    }

    /// Create an [`ExponentialBackoff`] iterator from this policy.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.clone())
    }
}

/// Exponential backoff iterator with jitter.
///
/// Yields increasing sleep durations following
/// `base * multiplier^attempt`, each randomized by the jitter factor and
/// clamped to the policy's maximum.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    policy: BackoffPolicy,
    /// Current delay without jitter, stored as f64 to avoid rounding errors.
    current_delay_secs: f64,
    /// Number of attempts made.
    attempts: u32,
}

impl ExponentialBackoff {
    /// Create a new backoff iterator from a policy.
    pub fn new(policy: BackoffPolicy) -> Self {
        let current_delay_secs = policy.base_delay.as_secs_f64();
        Self {
            policy,
            current_delay_secs,
            attempts: 0,
        }
    }

    /// Reset the backoff to its initial state.
    pub fn reset(&mut self) {
        self.current_delay_secs = self.policy.base_delay.as_secs_f64();
        self.attempts = 0;
    }

    /// Number of attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Get the next delay duration, applying jitter, and advance the state.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_delay_secs;

        // Apply jitter: delay * (1 + jitter * random(-1, 1))
        let jittered = if self.policy.jitter > 0.0 {
            let jitter_range = self.policy.jitter * 2.0;
            let random_factor = rand::random::<f64>() * jitter_range - self.policy.jitter;
            delay * (1.0 + random_factor)
        } else {
            delay
        };

        // Clamp to max_delay
        let clamped = jittered.min(self.policy.max_delay.as_secs_f64());

        // Update for next iteration
        self.current_delay_secs =
            (self.current_delay_secs * self.policy.multiplier).min(self.policy.max_delay.as_secs_f64());
        self.attempts += 1;

        Duration::from_secs_f64(clamped.max(0.0))
    }
}

/// What the send channel does with a failed dispatch.
#[derive(Clone, Debug, Default)]
pub enum SendErrorPolicy {
    /// The first dispatch failure terminates the channel.
    #[default]
    FailFast,
    /// Retry connection-establishment failures without bound on the given
    /// backoff schedule; suppress every other failure after logging it and
    /// failing that operation's own completion callback.
    RetryConnect(BackoffPolicy),
}

impl SendErrorPolicy {
    /// Retry connection failures with the default backoff schedule.
    pub fn retry_connect() -> Self {
        SendErrorPolicy::RetryConnect(BackoffPolicy::default())
    }
}
