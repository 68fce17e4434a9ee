//! Bounded-concurrency admission gate shared by every remote API call.
//!
//! The provider's request quota is global, so every `submit`/`describe`/
//! `terminate` call across every job acquires from the same semaphore. A
//! slot is held for the full duration of a call *and* any throttle-retry
//! jitter sleep it performs, so the gate also bounds how fast the engine
//! can hammer a throttled endpoint.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Shared bounded-concurrency admission controller.
#[derive(Clone)]
pub struct RateGate {
    semaphore: Arc<Semaphore>,
}

impl RateGate {
    pub fn new(width: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(width.max(1))),
        }
    }

    /// Acquire a slot, held until the returned guard drops.
    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        self.semaphore
            .acquire()
            .await
            .expect("RateGate semaphore is never closed")
    }
}

/// Sleep for a uniformly random duration in `[min, max)` seconds. Used both
/// for throttle-retry jitter and for poll pacing.
pub async fn jittered_sleep(min_secs: f64, max_secs: f64) {
    let secs = if max_secs > min_secs {
        rand::thread_rng().gen_range(min_secs..max_secs)
    } else {
        min_secs
    };
    tokio::time::sleep(Duration::from_secs_f64(secs.max(0.0))).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gate_bounds_concurrency() {
        let gate = RateGate::new(1);
        let _permit = gate.acquire().await;
        assert_eq!(gate.semaphore.available_permits(), 0);
    }

    #[tokio::test]
    async fn jittered_sleep_within_bounds() {
        let start = tokio::time::Instant::now();
        jittered_sleep(0.0, 0.01).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
