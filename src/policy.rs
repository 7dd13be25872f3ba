//! Retry decision policy.
//!
//! The policy is a pure function of the retry configuration and the current
//! session bookkeeping. The supervisor owns the attempt counter and the
//! shutdown latch; nothing here has side effects, so every decision is
//! testable in isolation.

/// Ceiling on connection attempts.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryLimit {
    /// No ceiling is ever reached
    #[default]
    Unbounded,
    /// At most this many connection attempts
    Bounded(u32),
}

impl RetryLimit {
    /// Whether `attempts` connection attempts have exhausted this limit.
    #[must_use]
    pub const fn reached(self, attempts: u32) -> bool {
        match self {
            Self::Unbounded => false,
            Self::Bounded(max) => attempts >= max,
        }
    }
}

/// Outcome of a retry evaluation.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule another connection attempt
    Retry,
    /// Transition to the terminal closed state
    Stop,
}

/// Decide whether a failed session should be re-established.
///
/// Returns [`RetryDecision::Stop`] when retries are disabled, when shutdown
/// has been requested, or when a bounded limit is exhausted; otherwise
/// [`RetryDecision::Retry`].
#[must_use]
pub const fn evaluate(
    retry: bool,
    limit: RetryLimit,
    attempts: u32,
    shutdown_requested: bool,
) -> RetryDecision {
    if !retry || shutdown_requested || limit.reached(attempts) {
        RetryDecision::Stop
    } else {
        RetryDecision::Retry
    }
}
