#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use backoff::backoff::Constant;
use bon::Builder;
use url::Url;

use crate::Result;
use crate::error::Error;
use crate::policy::RetryLimit;

const DEFAULT_ENDPOINT: &str = "wss://echo.websocket.org";
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_CLEAN_CLOSE_CODES: [u16; 2] = [1000, 1005];

/// Configuration for a supervised WebSocket session.
///
/// All options have defaults; a `MonitorConfig::default()` monitors a public
/// echo endpoint with a 10 second keepalive cadence and unbounded retries.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct MonitorConfig {
    /// Target `ws://` or `wss://` endpoint to supervise
    #[builder(into, default = DEFAULT_ENDPOINT.to_owned())]
    pub endpoint: String,
    /// Keepalive cadence while the session is open. Must be greater than zero.
    #[builder(default = DEFAULT_PING_INTERVAL)]
    pub ping_interval: Duration,
    /// Whether failures trigger reconnection
    #[builder(default = true)]
    pub retry: bool,
    /// Ceiling on connection attempts. [`RetryLimit::Unbounded`] by default.
    #[builder(default)]
    pub retry_limit: RetryLimit,
    /// Fixed wait before redialing after a failure
    #[builder(default = DEFAULT_RETRY_DELAY)]
    pub retry_delay: Duration,
    /// Close status codes treated as an intentional, non-error end of session
    #[builder(default = DEFAULT_CLEAN_CLOSE_CODES.to_vec())]
    pub clean_close_codes: Vec<u16>,
    /// Enables per-frame diagnostic output on top of the lifecycle logs
    #[builder(default = false)]
    pub debug: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MonitorConfig {
    /// Check the construction invariants before the supervisor starts.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.ping_interval.is_zero() {
            return Err(Error::validation(
                "ping interval must be greater than zero",
            ));
        }
        let url = Url::parse(&self.endpoint)?;
        match url.scheme() {
            "ws" | "wss" => Ok(()),
            other => Err(Error::validation(format!(
                "endpoint scheme must be ws or wss, got {other}"
            ))),
        }
    }

    pub(crate) fn is_clean_close(&self, code: u16) -> bool {
        self.clean_close_codes.contains(&code)
    }

    /// The fixed-delay wait strategy used between redials.
    pub(crate) fn retry_backoff(&self) -> Constant {
        Constant::new(self.retry_delay)
    }
}
