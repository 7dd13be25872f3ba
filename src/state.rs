//! Session lifecycle state machine.
//!
//! States and transitions are plain values: [`transition`] maps a
//! `(state, event)` pair to the next state plus the effects the supervisor
//! must carry out. The table below is the complete behavior; no live
//! transport is needed to exercise it.
//!
//! ```text
//! Disconnected --Dial-----------------> Connecting
//! Connecting   --Opened---------------> Open          [arm pinger]
//! Connecting   --TransportError-------> Disconnected  [record, eval retry]
//! Open         --TransportError-------> Disconnected  [disarm, record, eval retry]
//! Open         --AbnormalClose--------> Disconnected  [disarm, record, eval retry]
//! Open         --CleanClose-----------> Closed        [disarm, finalize]
//! Disconnected --RetryScheduled-------> Connecting    (backoff wait happens here)
//! Disconnected --RetryExhausted-------> Closed        [finalize]
//! any live     --Shutdown-------------> Closing       [disarm, finalize]
//! Closing      --Finalized------------> Closed
//! ```
//!
//! Pairs outside the table are tolerated: the state is unchanged and no
//! effects are produced.

#![expect(
    clippy::module_name_repetitions,
    reason = "Session lifecycle types expose their domain in the name for clarity"
)]

/// Lifecycle state of the supervised session. Exactly one is active.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport exists and no dial is in flight
    Disconnected,
    /// A dial is in flight, or a retry wait is pending before the next dial
    Connecting,
    /// The transport is live and the keepalive pinger is armed
    Open,
    /// Orderly shutdown is in progress
    Closing,
    /// Terminal; reached through exhausted retries, a clean close, or `close()`
    Closed,
}

impl SessionState {
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Observed occurrences the supervisor feeds into [`transition`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A fresh transport is being dialed
    Dial,
    /// The transport handshake completed
    Opened,
    /// The transport reported an error or dropped without a close frame
    TransportError,
    /// The peer closed with a status code outside the clean set
    AbnormalClose,
    /// The peer closed with a status code inside the clean set
    CleanClose,
    /// The retry policy approved another attempt
    RetryScheduled,
    /// The retry policy refused another attempt
    RetryExhausted,
    /// The shutdown latch was observed
    Shutdown,
    /// Orderly shutdown finished
    Finalized,
}

/// Actions the supervisor must perform as part of a transition.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Start the keepalive pinger
    ArmPinger,
    /// Stop the keepalive pinger
    DisarmPinger,
    /// Append the current timestamp to the downtime ledger
    Record,
    /// Consult the retry policy
    EvalRetry,
    /// Close the transport if live and emit the downtime summary
    Finalize,
}

/// The complete transition function: `(state, event) -> (state, effects)`.
#[must_use]
pub fn transition(state: SessionState, event: SessionEvent) -> (SessionState, &'static [Effect]) {
    use Effect::{ArmPinger, DisarmPinger, EvalRetry, Finalize, Record};
    use SessionEvent as E;
    use SessionState as S;

    match (state, event) {
        (S::Disconnected, E::Dial | E::RetryScheduled) => (S::Connecting, &[]),
        (S::Disconnected, E::RetryExhausted) => (S::Closed, &[Finalize]),

        (S::Connecting, E::Opened) => (S::Open, &[ArmPinger]),
        (S::Connecting, E::TransportError | E::AbnormalClose | E::CleanClose) => {
            (S::Disconnected, &[Record, EvalRetry])
        }

        (S::Open, E::TransportError | E::AbnormalClose) => {
            (S::Disconnected, &[DisarmPinger, Record, EvalRetry])
        }
        (S::Open, E::CleanClose) => (S::Closed, &[DisarmPinger, Finalize]),

        (S::Disconnected | S::Connecting | S::Open, E::Shutdown) => {
            (S::Closing, &[DisarmPinger, Finalize])
        }
        (S::Closing, E::Finalized) => (S::Closed, &[]),

        // Anything else is stale or out of order; tolerate it.
        (state, _) => (state, &[]),
    }
}
