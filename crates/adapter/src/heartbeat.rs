use std::time::{Duration, Instant};

/// Liveness tracking for one connection.
///
/// The server pings every `interval`; any `Pong` refreshes the deadline. A
/// connection silent for longer than `timeout` is considered dead even if the
/// transport has not noticed yet.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    timeout: Duration,
    last_pong: Instant,
    pings_sent: u64,
}

impl Heartbeat {
    pub fn new(interval: Duration, timeout: Duration, now: Instant) -> Self {
        Self {
            interval,
            timeout,
            last_pong: now,
            pings_sent: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn on_ping_sent(&mut self) {
        self.pings_sent += 1;
    }

    pub fn on_pong(&mut self, now: Instant) {
        self.last_pong = now;
    }

    /// True once the silence since the last pong exceeds the timeout.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_pong) > self.timeout
    }

    pub fn pings_sent(&self) -> u64 {
        self.pings_sent
    }
}
