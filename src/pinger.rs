use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Repeating keepalive timer, armed only while the session is open.
///
/// The pinger never touches the socket: each tick is delivered to the
/// supervision loop, which sends the actual probe frame. At most one timer
/// task exists per pinger; [`KeepalivePinger::start`] disarms any previous
/// timer before arming a new one, so rapid reconnects cannot stack timers.
#[derive(Debug)]
pub(crate) struct KeepalivePinger {
    interval: Duration,
    ticks: mpsc::UnboundedSender<()>,
    timer: Option<JoinHandle<()>>,
}

impl KeepalivePinger {
    pub(crate) fn new(interval: Duration, ticks: mpsc::UnboundedSender<()>) -> Self {
        Self {
            interval,
            ticks,
            timer: None,
        }
    }

    pub(crate) fn start(&mut self) {
        self.stop();

        let ticks = self.ticks.clone();
        let period = self.interval;
        self.timer = Some(tokio::spawn(async move {
            let mut timer = time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // An interval's first tick completes immediately; consume it so
            // the first probe fires one full period after the session opens.
            timer.tick().await;
            loop {
                timer.tick().await;
                if ticks.send(()).is_err() {
                    break;
                }
            }
        }));
    }

    /// Disarm the timer. Safe to call when already stopped.
    pub(crate) fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    #[cfg(test)]
    fn is_armed(&self) -> bool {
        self.timer.is_some()
    }
}

impl Drop for KeepalivePinger {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::{sleep, timeout};

    use super::*;

    #[tokio::test]
    async fn ticks_arrive_at_the_configured_cadence() {
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
        let mut pinger = KeepalivePinger::new(Duration::from_millis(20), tick_tx);

        pinger.start();
        for _ in 0..3 {
            timeout(Duration::from_millis(200), tick_rx.recv())
                .await
                .expect("tick within deadline")
                .expect("tick channel open");
        }
        pinger.stop();
    }

    #[tokio::test]
    async fn no_ticks_after_stop() {
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
        let mut pinger = KeepalivePinger::new(Duration::from_millis(10), tick_tx);

        pinger.start();
        timeout(Duration::from_millis(200), tick_rx.recv())
            .await
            .expect("tick within deadline")
            .expect("tick channel open");
        pinger.stop();

        // Drain anything already in flight, then verify silence.
        sleep(Duration::from_millis(30)).await;
        while tick_rx.try_recv().is_ok() {}
        sleep(Duration::from_millis(50)).await;
        assert!(tick_rx.try_recv().is_err(), "stopped pinger must not tick");
    }

    #[tokio::test]
    async fn restart_replaces_the_timer() {
        let (tick_tx, _tick_rx) = mpsc::unbounded_channel();
        let mut pinger = KeepalivePinger::new(Duration::from_millis(10), tick_tx);

        pinger.start();
        assert!(pinger.is_armed());
        pinger.start();
        assert!(pinger.is_armed());
        pinger.stop();
        assert!(!pinger.is_armed());
        pinger.stop();
        assert!(!pinger.is_armed());
    }
}
