use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use khmerchat_llm::{GenerativeTransport, Part};
use tokio::time::Instant;

use crate::prompts::PROBE_PROMPT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    /// Minimum spacing between two probes.
    pub check_interval: Duration,
    /// Age after which a send re-probes before touching the transport.
    pub stale_threshold: Duration,
    pub max_consecutive_failures: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            stale_threshold: Duration::from_secs(5 * 60),
            max_consecutive_failures: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub last_checked_at: Instant,
    pub consecutive_failures: u32,
}

impl ConnectionStatus {
    fn healthy(now: Instant) -> Self {
        Self {
            connected: true,
            last_checked_at: now,
            consecutive_failures: 0,
        }
    }
}

/// Tracks whether the remote API is reachable.
///
/// Only this type writes the status. Readers get snapshots and never block a probe.
pub struct HealthMonitor {
    transport: Arc<dyn GenerativeTransport>,
    config: HealthConfig,
    status: ArcSwap<ConnectionStatus>,
}

impl HealthMonitor {
    pub fn new(transport: Arc<dyn GenerativeTransport>, config: HealthConfig) -> Self {
        Self {
            transport,
            config,
            status: ArcSwap::from_pointee(ConnectionStatus::healthy(Instant::now())),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        **self.status.load()
    }

    pub fn is_connected(&self) -> bool {
        self.status.load().connected
    }

    pub fn is_stale(&self) -> bool {
        self.status.load().last_checked_at.elapsed() > self.config.stale_threshold
    }

    /// Probes the API unless the last check is younger than `check_interval`.
    pub async fn check_connection(&self) -> bool {
        let current = self.status();
        if current.last_checked_at.elapsed() < self.config.check_interval {
            tracing::trace!(connected = current.connected, "health check debounced");
            return current.connected;
        }

        match self
            .transport
            .generate(vec![Part::text(PROBE_PROMPT)])
            .await
        {
            Ok(_) => {
                self.record_success();
                true
            }
            Err(error) => {
                let now = Instant::now();
                let previous = self.status.rcu(|status| ConnectionStatus {
                    connected: false,
                    last_checked_at: now,
                    consecutive_failures: status.consecutive_failures.saturating_add(1),
                });
                tracing::warn!(
                    provider = self.transport.id(),
                    consecutive_failures = previous.consecutive_failures.saturating_add(1),
                    error = %error,
                    "connection probe failed"
                );
                false
            }
        }
    }

    pub fn record_success(&self) {
        let previous = self
            .status
            .swap(Arc::new(ConnectionStatus::healthy(Instant::now())));
        if !previous.connected {
            tracing::info!(provider = self.transport.id(), "connection restored");
        }
    }

    /// Counts a network failure seen by a send and returns the new count.
    ///
    /// The connected flag is left for the next probe to decide.
    pub fn record_failure(&self) -> u32 {
        let previous = self.status.rcu(|status| ConnectionStatus {
            consecutive_failures: status.consecutive_failures.saturating_add(1),
            ..**status
        });
        previous.consecutive_failures.saturating_add(1)
    }

    pub fn failure_threshold_reached(&self) -> bool {
        self.status.load().consecutive_failures >= self.config.max_consecutive_failures
    }
}
