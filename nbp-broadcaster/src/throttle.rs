use std::time::Duration;
use tokio::time::Instant;

/// Minimum-interval gate on outbound sends
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last_send: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_send: None,
        }
    }

    /// Gate is open once strictly more than `min_interval` has elapsed
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_send {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.min_interval,
        }
    }

    pub fn record(&mut self, now: Instant) {
        self.last_send = Some(now);
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_send(&self) -> Option<Instant> {
        self.last_send
    }
}
