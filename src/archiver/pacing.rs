//! Per-worker pause before each URL.

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

/// Sleep bounds applied by every worker before it starts a URL.
///
/// With `max` above `min` the pause is drawn uniformly from `[min, max]`,
/// otherwise it is exactly `min`. Aggregate request rate therefore scales
/// with the number of workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepInterval {
    min: Duration,
    max: Duration,
}

impl SleepInterval {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Pick the next pause.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::thread_rng().gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Sleep for the next pause. Returns `false` if cancelled first.
    pub async fn pause(&self, cancel: &CancellationToken) -> bool {
        let delay = self.next_delay();
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            () = tokio::time::sleep(delay) => true,
            () = cancel.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_interval() {
        let interval = SleepInterval::new(Duration::from_millis(200), Duration::ZERO);
        assert_eq!(interval.next_delay(), Duration::from_millis(200));
        assert_eq!(SleepInterval::none().next_delay(), Duration::ZERO);
    }

    #[test]
    fn test_randomized_interval_stays_in_bounds() {
        let interval = SleepInterval::new(Duration::from_millis(100), Duration::from_millis(300));
        for _ in 0..100 {
            let delay = interval.next_delay();
            assert!(delay >= Duration::from_millis(100), "{delay:?}");
            assert!(delay <= Duration::from_millis(300), "{delay:?}");
        }
    }

    #[tokio::test]
    async fn test_pause_is_interrupted_by_cancel() {
        let interval = SleepInterval::new(Duration::from_secs(60), Duration::ZERO);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!interval.pause(&cancel).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_completes() {
        let interval = SleepInterval::new(Duration::from_secs(2), Duration::ZERO);
        assert!(interval.pause(&CancellationToken::new()).await);
    }
}
