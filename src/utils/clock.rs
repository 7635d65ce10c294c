use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Source of wall-clock time and tick scheduling for the daemon. Swapping it out lets tests run the
/// tracker against a fixed calendar date.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    /// Wall-clock time. Used for accounting deltas and snapshot timestamps, so it may jump
    /// backwards when the system clock is adjusted.
    fn time(&self) -> DateTime<Utc>;

    /// Monotonic time used for cache expiry and cooldowns.
    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}
