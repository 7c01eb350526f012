use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::config::ServerConfig;

/// Default interval between keep-alive pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(10);

/// Default silence after which a connection is considered dead.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-connection keep-alive policy.
///
/// The server sends a Ping every `ping_interval`; any inbound frame
/// (client keep-alive text, Pong, anything) counts as a sign of life.
#[derive(Debug, Clone, Copy)]
pub struct KeepAlive {
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
}

impl KeepAlive {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ws_ping_interval_secs.max(1)),
            idle_timeout: Duration::from_secs(config.ws_idle_timeout_secs.max(1)),
        }
    }

    /// Ping timer for one connection. The first tick fires one full
    /// interval after creation.
    pub fn ticker(&self) -> Interval {
        let mut interval =
            tokio::time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// Whether a connection last heard from at `last_seen` has gone idle.
    pub fn is_expired(&self, last_seen: Instant) -> bool {
        last_seen.elapsed() > self.idle_timeout
    }
}

impl Default for KeepAlive {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticker_waits_a_full_interval() {
        let keepalive = KeepAlive {
            ping_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
        };
        let start = Instant::now();
        let mut ticker = keepalive.ticker();

        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));

        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn expires_only_after_idle_timeout() {
        let keepalive = KeepAlive {
            ping_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
        };
        let last_seen = Instant::now();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!keepalive.is_expired(last_seen));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(keepalive.is_expired(last_seen));
    }
}
