use std::time::Duration;

use tokio::time::Instant;

/// Time gate that lets at most one notification through per interval.
///
/// Windows are anchored at grant time: a permitted call moves the window
/// start to that instant, so a burst of chunks collapses into a single
/// event per interval and slow arrivals never over-fire.
#[derive(Debug, Clone)]
pub struct ThrottleGate {
    interval: Duration,
    last_fired: Instant,
}

impl ThrottleGate {
    /// Creates a gate whose first window starts now.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: Instant::now(),
        }
    }

    /// Returns `true` if a full interval elapsed since the last grant.
    pub fn permit(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_fired) < self.interval {
            return false;
        }
        self.last_fired = now;
        true
    }
}
