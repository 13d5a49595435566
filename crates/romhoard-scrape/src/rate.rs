//! Per-backend request spacing.
//!
//! Rate-limited backends get one timer-gated wait shared by every worker:
//! the lock is held through the sleep, so calls serialize no matter how
//! many workers the pool was configured with.

use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};

pub struct RateGate {
  interval:     Duration,
  next_allowed: Mutex<Instant>,
}

impl RateGate {
  pub fn new(interval_ms: u64) -> Self {
    Self {
      interval:     Duration::from_millis(interval_ms),
      next_allowed: Mutex::new(Instant::now()),
    }
  }

  pub fn is_throttled(&self) -> bool { !self.interval.is_zero() }

  /// Wait until the backend may be called again, then reserve the next
  /// slot. Unthrottled gates return immediately.
  pub async fn acquire(&self) {
    if self.interval.is_zero() {
      return;
    }
    let mut next = self.next_allowed.lock().await;
    let now = Instant::now();
    if *next > now {
      tokio::time::sleep_until(*next).await;
    }
    *next = Instant::now() + self.interval;
  }
}
