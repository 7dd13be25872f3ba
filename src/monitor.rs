use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff as _;
use chrono::{DateTime, Utc};
use futures::stream::SplitSink;
use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::config::MonitorConfig;
use crate::error::SessionError;
use crate::ledger::DowntimeLedger;
use crate::pinger::KeepalivePinger;
use crate::policy::{self, RetryDecision};
use crate::state::{Effect, SessionEvent, SessionState, transition};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Bounded wait inside [`Monitor::close`] so an in-flight retry timer
/// observes the shutdown latch before the caller proceeds.
const CLOSE_GRACE: Duration = Duration::from_millis(100);

/// Close status code reported when the peer sent no code at all.
const NO_STATUS_CODE: u16 = 1005;

#[derive(Debug)]
enum Command {
    SendPing,
}

/// How a live session ended, as seen by the supervision loop.
enum SessionEnd {
    /// The shutdown latch was observed while the session was live
    Shutdown,
    /// The transport failed or the peer closed
    Ended(SessionEvent),
}

/// Supervisor handle for one persistent WebSocket session.
///
/// [`Monitor::connect`] spawns a supervision task that owns the transport,
/// drives the lifecycle state machine, keeps the session alive with periodic
/// pings, and re-establishes the connection after failures according to the
/// configured retry policy. Every detected failure is timestamped in a
/// downtime ledger whose summary is reported exactly once at shutdown.
///
/// The handle is cheap to clone; all clones observe the same session.
///
/// # Example
///
/// ```no_run
/// use ws_sentinel::{Monitor, MonitorConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let monitor = Monitor::connect(MonitorConfig::default())?;
///
///     // ... the session is supervised in the background ...
///
///     let summary = monitor.close().await;
///     println!("downtime: {summary}");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Monitor {
    commands: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<SessionState>,
    shutdown: CancellationToken,
    ledger: Arc<DowntimeLedger>,
}

impl Monitor {
    /// Validate the configuration and start supervising the endpoint.
    ///
    /// Returns `Err` only for configuration violations. Dial failures never
    /// surface here: they are recorded in the downtime ledger and handled by
    /// the retry policy, like any other session failure.
    pub fn connect(config: MonitorConfig) -> Result<Self> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let shutdown = CancellationToken::new();
        let ledger = Arc::new(DowntimeLedger::default());

        let task = SupervisorTask {
            pinger: KeepalivePinger::new(config.ping_interval, tick_tx),
            config,
            state: SessionState::Disconnected,
            state_tx,
            ledger: Arc::clone(&ledger),
            shutdown: shutdown.clone(),
            attempts: 0,
        };
        tokio::spawn(task.run(command_rx, tick_rx));

        Ok(Self {
            commands: command_tx,
            state_rx,
            shutdown,
            ledger,
        })
    }

    /// Send one liveness probe over the live transport.
    ///
    /// A no-op while the session is not open (the keepalive pinger is the
    /// usual caller and is disarmed whenever the state leaves
    /// [`SessionState::Open`]). Returns `Err` once the monitor has reached
    /// its terminal state.
    pub fn send_ping(&self) -> Result<()> {
        if self.state().is_closed() {
            return Err(SessionError::MonitorClosed.into());
        }
        if !self.state().is_open() {
            return Ok(());
        }
        self.commands
            .send(Command::SendPing)
            .map_err(|_e| SessionError::MonitorClosed)?;
        Ok(())
    }

    /// Request orderly shutdown and return the downtime summary.
    ///
    /// The shutdown latch is set synchronously before the first await, so no
    /// retry timer firing afterwards can reconnect. A bounded grace wait
    /// follows, then the call completes once the supervision task has
    /// disarmed the pinger, closed any live transport, and reached
    /// [`SessionState::Closed`]. Safe to call any number of times; only the
    /// first call has effect.
    pub async fn close(&self) -> String {
        if !self.shutdown.is_cancelled() {
            self.shutdown.cancel();
            sleep(CLOSE_GRACE).await;
        }
        let mut state_rx = self.state_rx.clone();
        _ = state_rx.wait_for(|state| state.is_closed()).await;
        self.ledger.summary()
    }

    /// Current lifecycle state of the session.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to lifecycle state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Failure timestamps recorded so far, oldest first.
    #[must_use]
    pub fn downtime(&self) -> Vec<DateTime<Utc>> {
        self.ledger.entries()
    }
}

struct SupervisorTask {
    config: MonitorConfig,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    pinger: KeepalivePinger,
    ledger: Arc<DowntimeLedger>,
    shutdown: CancellationToken,
    /// Failed connection attempts since construction. Never reset.
    attempts: u32,
}

impl SupervisorTask {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut ticks: mpsc::UnboundedReceiver<()>,
    ) {
        let mut backoff = self.config.retry_backoff();

        loop {
            // Check the latch before every dial.
            if self.shutdown.is_cancelled() {
                break;
            }
            if self.state == SessionState::Disconnected {
                self.apply(SessionEvent::Dial);
            }

            let dialed = tokio::select! {
                dialed = connect_async(self.config.endpoint.as_str()) => dialed,
                () = self.shutdown.cancelled() => break,
            };

            let end = match dialed {
                Ok((socket, _response)) => {
                    self.apply(SessionEvent::Opened);
                    tracing::info!(endpoint = %self.config.endpoint, "WebSocket session open");
                    match self.drive(socket, &mut commands, &mut ticks).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Ended(event) => event,
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        endpoint = %self.config.endpoint,
                        error = %SessionError::Connection(error),
                        "connect attempt failed"
                    );
                    SessionEvent::TransportError
                }
            };

            let effects = self.apply(end);
            if effects.contains(&Effect::Finalize) {
                // Clean close: intentional end of session, terminal without
                // consulting the retry policy.
                self.emit_summary();
                return;
            }
            if effects.contains(&Effect::EvalRetry) {
                self.attempts = self.attempts.saturating_add(1);
                let decision = policy::evaluate(
                    self.config.retry,
                    self.config.retry_limit,
                    self.attempts,
                    self.shutdown.is_cancelled(),
                );
                match decision {
                    RetryDecision::Retry => {
                        self.apply(SessionEvent::RetryScheduled);
                        tracing::info!(
                            attempt = self.attempts,
                            limit = ?self.config.retry_limit,
                            delay = ?self.config.retry_delay,
                            "scheduling reconnect"
                        );
                        if let Some(delay) = backoff.next_backoff() {
                            tokio::select! {
                                () = sleep(delay) => {}
                                () = self.shutdown.cancelled() => break,
                            }
                        }
                    }
                    RetryDecision::Stop => {
                        if !self.config.retry {
                            tracing::info!("retry disabled, closing after failure");
                        } else if !self.shutdown.is_cancelled() {
                            tracing::error!(
                                attempts = self.attempts,
                                "retry attempts exhausted, unable to keep the session up"
                            );
                        }
                        self.apply(SessionEvent::RetryExhausted);
                        self.emit_summary();
                        return;
                    }
                }
            }
        }

        // Latch observed: orderly shutdown.
        self.apply(SessionEvent::Shutdown);
        self.apply(SessionEvent::Finalized);
        self.emit_summary();
    }

    /// Pump one live session until it ends or shutdown is requested.
    async fn drive(
        &self,
        socket: WsStream,
        commands: &mut mpsc::UnboundedReceiver<Command>,
        ticks: &mut mpsc::UnboundedReceiver<()>,
    ) -> SessionEnd {
        let (mut sink, mut source) = socket.split();

        // Ticks queued while no session was live belong to a retired timer.
        while ticks.try_recv().is_ok() {}

        loop {
            tokio::select! {
                frame = source.next() => match frame {
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.as_ref().map_or(NO_STATUS_CODE, |f| u16::from(f.code));
                        let reason = frame
                            .as_ref()
                            .map(|f| f.reason.as_str().to_owned())
                            .unwrap_or_default();
                        if self.config.is_clean_close(code) {
                            tracing::info!(code, reason = %reason, "session closed cleanly");
                            return SessionEnd::Ended(SessionEvent::CleanClose);
                        }
                        tracing::warn!(
                            error = %SessionError::AbnormalClose { code },
                            reason = %reason,
                            "session closed abnormally"
                        );
                        return SessionEnd::Ended(SessionEvent::AbnormalClose);
                    }
                    Some(Ok(Message::Text(text))) => {
                        if self.config.debug {
                            tracing::debug!(payload = %text.as_str(), binary = false, "message received");
                        }
                    }
                    Some(Ok(Message::Binary(payload))) => {
                        if self.config.debug {
                            tracing::debug!(bytes = payload.len(), binary = true, "message received");
                        }
                    }
                    Some(Ok(_)) => {
                        // Ping frames are answered by the library; pong acks
                        // carry no state we track.
                    }
                    Some(Err(error)) => {
                        tracing::warn!(
                            error = %SessionError::Connection(error),
                            "transport error"
                        );
                        return SessionEnd::Ended(SessionEvent::TransportError);
                    }
                    None => {
                        tracing::warn!("transport dropped without a close frame");
                        return SessionEnd::Ended(SessionEvent::TransportError);
                    }
                },
                Some(command) = commands.recv() => match command {
                    Command::SendPing => {
                        if let Err(error) = self.probe(&mut sink).await {
                            tracing::warn!(
                                error = %SessionError::Connection(error),
                                "keepalive probe failed"
                            );
                            return SessionEnd::Ended(SessionEvent::TransportError);
                        }
                    }
                },
                Some(()) = ticks.recv() => {
                    if let Err(error) = self.probe(&mut sink).await {
                        tracing::warn!(
                            error = %SessionError::Connection(error),
                            "keepalive probe failed"
                        );
                        return SessionEnd::Ended(SessionEvent::TransportError);
                    }
                },
                () = self.shutdown.cancelled() => {
                    // Orderly close of the live transport; errors past this
                    // point are moot.
                    _ = sink.close().await;
                    return SessionEnd::Shutdown;
                }
            }
        }
    }

    async fn probe(
        &self,
        sink: &mut WsSink,
    ) -> std::result::Result<(), tokio_tungstenite::tungstenite::Error> {
        if self.config.debug {
            tracing::debug!("sending keepalive ping");
        }
        sink.send(Message::Ping(Bytes::new())).await
    }

    /// Advance the state machine and execute the synchronous effects.
    /// `EvalRetry` and `Finalize` involve waits or terminal reporting and are
    /// driven by the run loop instead.
    fn apply(&mut self, event: SessionEvent) -> &'static [Effect] {
        let (next, effects) = transition(self.state, event);
        if next != self.state {
            if self.config.debug {
                tracing::debug!(from = ?self.state, to = ?next, event = ?event, "state transition");
            }
            self.state = next;
            _ = self.state_tx.send(next);
        }
        for effect in effects {
            match effect {
                Effect::ArmPinger => self.pinger.start(),
                Effect::DisarmPinger => self.pinger.stop(),
                Effect::Record => self.ledger.record(Utc::now()),
                Effect::EvalRetry | Effect::Finalize => {}
            }
        }
        effects
    }

    /// Report the downtime ledger. Each terminal path runs this exactly once.
    fn emit_summary(&self) {
        if self.ledger.is_empty() {
            tracing::info!("monitor closed, no downtime observed");
        } else {
            tracing::warn!(
                drops = self.ledger.len(),
                downtime = %self.ledger.summary(),
                "monitor closed with recorded downtime"
            );
        }
    }
}
