use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic millisecond clock used for response times
pub trait Timer: Clone + Send + Sync {
    /// Milliseconds since the timer's origin.
    fn now(&self) -> u64;

    fn elapsed(&self, since: u64) -> Duration {
        Duration::from_millis(self.now().saturating_sub(since))
    }
}

#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Runs `f` and returns its result with the time it took.
    pub fn measure<T>(&self, f: impl FnOnce() -> T) -> (T, Duration) {
        let started = Instant::now();
        let value = f();
        (value, started.elapsed())
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Hand-driven clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ms: Arc<AtomicU64>,
}

impl ManualTimer {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Wall-clock Unix time in milliseconds, used to name export files.
pub fn unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_timer_clones_share_time() {
        let timer = ManualTimer::new(100);
        let observer = timer.clone();
        timer.advance(250);
        assert_eq!(observer.now(), 350);
        assert_eq!(observer.elapsed(100), Duration::from_millis(250));
    }

    #[test]
    fn elapsed_never_underflows() {
        let timer = ManualTimer::new(10);
        assert_eq!(timer.elapsed(50), Duration::ZERO);
    }

    #[test]
    fn high_precision_timer_is_monotonic() {
        let timer = HighPrecisionTimer::new();
        let first = timer.now();
        let ((), took) = timer.measure(|| std::thread::sleep(Duration::from_millis(2)));
        assert!(timer.now() >= first);
        assert!(took >= Duration::from_millis(2));
    }

    #[test]
    fn unix_millis_is_after_2020() {
        assert!(unix_millis() > 1_577_836_800_000);
    }
}
