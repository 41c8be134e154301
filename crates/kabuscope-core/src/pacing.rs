use std::time::Duration;

use tracing::debug;

/// Random pause before each outbound provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    min: Duration,
    max: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500), Duration::from_millis(3000))
    }
}

impl PacingPolicy {
    /// Bounds are reordered if given backwards.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub const fn disabled() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.max.is_zero()
    }

    /// Uniform draw from `[min, max]` at millisecond resolution.
    pub fn delay(&self) -> Duration {
        let min_ms = duration_millis(self.min);
        let max_ms = duration_millis(self.max);
        Duration::from_millis(fastrand::u64(min_ms..=max_ms))
    }

    pub async fn pause(&self) {
        if self.is_disabled() {
            return;
        }
        let delay = self.delay();
        debug!(delay_ms = delay.as_millis() as u64, "pacing outbound request");
        tokio::time::sleep(delay).await;
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
