//! Wall-clock timing for host-side measurement.

use std::time::{Duration, Instant};

/// Simple wall-clock timer spanning kernel submission through read-back.
pub struct WallTimer {
    start: Instant,
}

impl WallTimer {
    /// Start the timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time since `start`.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time in seconds.
    pub fn stop(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

/// Convert an OpenCL profiling interval (nanoseconds) to a `Duration`.
pub fn profiling_interval(start_ns: u64, end_ns: u64) -> Duration {
    Duration::from_nanos(end_ns.saturating_sub(start_ns))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_measures_positive() {
        let timer = WallTimer::start();
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.stop();
        assert!(elapsed >= 0.005, "Timer should measure at least ~10ms (got {elapsed}s)");
    }

    #[test]
    fn test_profiling_interval() {
        assert_eq!(profiling_interval(1_000, 3_500), Duration::from_nanos(2_500));
        // Counters never run backwards, but a bad driver must not panic us.
        assert_eq!(profiling_interval(10, 5), Duration::ZERO);
    }
}
