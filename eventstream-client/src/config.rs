//! Channel configuration: backpressure policies and send-error handling.

mod backpressure;
mod retry;

pub use backpressure::{BackpressurePolicy, OverflowCallback, OverflowStrategy};
pub use retry::{BackoffPolicy, ExponentialBackoff, SendErrorPolicy, defaults};
