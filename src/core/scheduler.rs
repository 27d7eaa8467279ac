use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Fixed-period poll timer. Ticks regardless of whether the previous cycle
/// has finished; the first tick fires one period after creation.
pub struct PollScheduler {
    period: Duration,
    interval: Interval,
}

impl PollScheduler {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { period, interval }
    }

    /// Cancel safe, usable as a `select!` branch.
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

/// Delay between reconnect attempts.
///
/// `delay = base * multiplier^(failures - 1)`, capped at `max`. With
/// `base == max` this is a fixed delay.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    /// `failures` counts consecutive failed or dropped connections (1-indexed).
    pub fn next_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}
