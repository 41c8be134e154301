use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::ProviderRole;

/// Which provider a single request should try first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Primary,
    /// First primary attempt after the cooldown; its outcome decides recovery.
    Probe,
    Failover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Primary,
    Failover { since: Instant },
    Probing { since: Instant, started: Instant },
}

/// Point-in-time view of the provider state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderStateSnapshot {
    pub active: ProviderRole,
    /// Time since the last qualifying primary failure, while on failover.
    pub failover_elapsed: Option<Duration>,
    /// Whether the next request would try the primary provider.
    pub primary_available: bool,
}

/// Owned primary/failover switch shared by all fetches of one fetcher.
///
/// After a qualifying primary failure the primary is skipped until
/// `cooldown` elapses. The next request then probes the primary once while
/// concurrent requests stay on failover.
#[derive(Debug)]
pub struct FailoverState {
    cooldown: Duration,
    inner: Mutex<Mode>,
}

impl Default for FailoverState {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60))
    }
}

impl FailoverState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            inner: Mutex::new(Mode::Primary),
        }
    }

    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn lock(&self) -> MutexGuard<'_, Mode> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decides the route for one request, claiming the probe when it is due.
    pub fn select(&self) -> Route {
        let now = Instant::now();
        let mut mode = self.lock();
        match *mode {
            Mode::Primary => Route::Primary,
            Mode::Failover { since } if now.saturating_duration_since(since) >= self.cooldown => {
                *mode = Mode::Probing { since, started: now };
                Route::Probe
            }
            Mode::Failover { .. } => Route::Failover,
            // A probe that never reported back (dropped future) is replaced.
            Mode::Probing { since, started }
                if now.saturating_duration_since(started) >= self.cooldown =>
            {
                *mode = Mode::Probing { since, started: now };
                Route::Probe
            }
            Mode::Probing { .. } => Route::Failover,
        }
    }

    /// Records a successful primary attempt made on `route`.
    ///
    /// Only a successful probe restores the primary. A plain primary request
    /// may have started before a concurrent failure switched to failover, so
    /// its success leaves the current state untouched.
    pub fn record_primary_success(&self, route: Route) {
        if route != Route::Probe {
            return;
        }
        let mut mode = self.lock();
        if let Mode::Probing { .. } = *mode {
            *mode = Mode::Primary;
        }
    }

    /// Records a failed primary attempt made on `route`.
    ///
    /// A triggering failure restarts the cooldown. Any other failure leaves
    /// the state as it was; a failed probe falls back to its previous window.
    pub fn record_primary_failure(&self, route: Route, triggers_failover: bool) {
        let mut mode = self.lock();
        if triggers_failover {
            *mode = Mode::Failover {
                since: Instant::now(),
            };
        } else if route == Route::Probe {
            if let Mode::Probing { since, .. } = *mode {
                *mode = Mode::Failover { since };
            }
        }
    }

    pub fn snapshot(&self) -> ProviderStateSnapshot {
        let now = Instant::now();
        let mode = *self.lock();
        match mode {
            Mode::Primary => ProviderStateSnapshot {
                active: ProviderRole::Primary,
                failover_elapsed: None,
                primary_available: true,
            },
            Mode::Failover { since } => {
                let elapsed = now.saturating_duration_since(since);
                ProviderStateSnapshot {
                    active: ProviderRole::Failover,
                    failover_elapsed: Some(elapsed),
                    primary_available: elapsed >= self.cooldown,
                }
            }
            Mode::Probing { since, .. } => ProviderStateSnapshot {
                active: ProviderRole::Failover,
                failover_elapsed: Some(now.saturating_duration_since(since)),
                primary_available: false,
            },
        }
    }
}
