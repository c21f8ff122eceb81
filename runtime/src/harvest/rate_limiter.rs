//! Optional request throttle shared by every department task.

use crate::config::HarvestSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Caps in-flight requests and spaces them out.
///
/// With no cap and no delay, `acquire` returns immediately.
pub struct RateLimiter {
    semaphore: Option<Arc<Semaphore>>,
    min_delay: Duration,
    last_request: tokio::sync::Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// - `max_in_flight`: maximum concurrent requests, `None` for unbounded
    /// - `min_delay`: minimum time between request starts
    pub fn new(max_in_flight: Option<usize>, min_delay: Duration) -> Self {
        Self {
            semaphore: max_in_flight.map(|n| Arc::new(Semaphore::new(n))),
            min_delay,
            last_request: tokio::sync::Mutex::new(None),
        }
    }

    pub fn from_settings(settings: &HarvestSettings) -> Self {
        Self::new(settings.max_in_flight, settings.request_delay)
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(None, Duration::ZERO)
    }

    /// Wait for a request slot. The slot is held until the guard drops.
    pub async fn acquire(&self) -> RateLimitGuard {
        let permit = match &self.semaphore {
            Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
            None => None,
        };

        if !self.min_delay.is_zero() {
            let mut last = self.last_request.lock().await;
            if let Some(at) = *last {
                let elapsed = at.elapsed();
                if elapsed < self.min_delay {
                    tokio::time::sleep(self.min_delay - elapsed).await;
                }
            }
            *last = Some(Instant::now());
        }

        RateLimitGuard { _permit: permit }
    }

    /// Free request slots, or `None` when unbounded.
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }
}

/// Releases the request slot when dropped.
pub struct RateLimitGuard {
    _permit: Option<OwnedSemaphorePermit>,
}
