use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cloneable cancellation flag shared between a worker and its owner.
/// Cancelling is one-way and sticky.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Sleep for `total`, checking the token every 50 ms. Returns `false` if
    /// the sleep was cut short by cancellation.
    pub fn sleep_cancellable(&self, total: Duration) -> bool {
        let tick = Duration::from_millis(50);
        let mut slept = Duration::ZERO;
        while slept < total {
            if self.is_cancelled() {
                return false;
            }
            let step = tick.min(total - slept);
            std::thread::sleep(step);
            slept += step;
        }
        !self.is_cancelled()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn cancellation_is_sticky_and_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn cancelled_sleep_returns_early() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        assert!(!token.sleep_cancellable(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
