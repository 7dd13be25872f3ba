//! Supervise a single WebSocket session until Ctrl-C.
//!
//! The endpoint defaults to a public echo server and can be overridden:
//! ```sh
//! RUST_LOG=info WS_SENTINEL_ENDPOINT=ws://127.0.0.1:9001 \
//!     cargo run --example echo_monitor
//! ```

use std::time::Duration;

use tracing::info;
use ws_sentinel::{Monitor, MonitorConfig, RetryLimit};

const ENDPOINT_VAR: &str = "WS_SENTINEL_ENDPOINT";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let endpoint = std::env::var(ENDPOINT_VAR)
        .unwrap_or_else(|_| "wss://echo.websocket.org".to_owned());

    let config = MonitorConfig::builder()
        .endpoint(endpoint)
        .ping_interval(Duration::from_secs(5))
        .retry_limit(RetryLimit::Bounded(10))
        .retry_delay(Duration::from_secs(2))
        .debug(true)
        .build();
    let monitor = Monitor::connect(config)?;

    // Process-signal wiring stays outside the monitor: the hosting process
    // requests the orderly shutdown exactly once.
    tokio::signal::ctrl_c().await?;
    info!("received Ctrl-C, closing monitor");

    let summary = monitor.close().await;
    info!(%summary, state = ?monitor.state(), "monitor closed");

    Ok(())
}
