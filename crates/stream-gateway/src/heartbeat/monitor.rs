//! Heartbeat monitor
//!
//! Each tick, per connection: `ALIVE -> probe sent -> AWAITING_PONG`; a pong
//! restores `ALIVE`, while a connection still awaiting at the next tick is
//! evicted. Detection therefore lags by up to two intervals.

use crate::connection::ConnectionRegistry;
use crate::protocol::CloseCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Outcome of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// Connections sent a new probe
    pub probed: usize,
    /// Connections removed for missing the previous probe
    pub evicted: usize,
}

/// Probes every registered connection on a fixed interval
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
}

impl HeartbeatMonitor {
    /// Create a monitor over `registry`
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Run one probe/evict cycle
    ///
    /// Works on a snapshot, so concurrent disconnects cannot disturb iteration.
    pub fn tick(&self) -> HeartbeatReport {
        let mut report = HeartbeatReport::default();
        let frame = CloseCode::HeartbeatTimeout.frame();

        for connection in self.registry.list_all() {
            if connection.begin_probe() {
                connection.ping();
                report.probed += 1;
                continue;
            }

            tracing::info!(
                connection_id = %connection.connection_id(),
                session_id = %connection.session_id(),
                last_activity = %connection.last_activity(),
                "Terminating inactive connection"
            );

            connection.terminate(frame.clone());
            if self
                .registry
                .unregister(connection.connection_id(), frame.clone())
            {
                report.evicted += 1;
            }
        }

        if report.evicted > 0 {
            tracing::info!(evicted = report.evicted, "Evicted unresponsive connections");
        }

        report
    }

    /// Start ticking in the background until the registry shuts down
    pub fn spawn(self) -> JoinHandle<()> {
        let shutdown = self.registry.shutdown_signal();
        tokio::spawn(async move { self.run(shutdown).await })
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_ms = self.interval.as_millis(), "Heartbeat monitor started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick();
                    tracing::trace!(probed = report.probed, evicted = report.evicted, "Heartbeat tick");
                }
                // Also sees a shutdown that happened before the loop started
                _ = shutdown.wait_for(|stopped| *stopped) => break,
            }
        }

        tracing::info!("Heartbeat monitor stopped");
    }
}
