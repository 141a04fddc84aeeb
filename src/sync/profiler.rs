/*!
 * Lock Contention Profiler
 *
 * Accumulates the time threads spend blocked in `acquire()` and reports
 * locks whose total wait crossed the configured threshold when they are
 * destroyed, together with the stack that created them.
 *
 * # Design: Compiled In or Out as a Whole
 *
 * With the `lock-profiler` feature disabled, `ContentionProfiler` is a
 * zero-sized type whose methods are empty and inline away. Call sites in the
 * lock implementations are identical in both builds.
 */

use serde::Serialize;
use std::time::Duration;

use crate::config::ProfilerConfig;

/// Contention report emitted when a lock is destroyed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentionReport {
    /// Label from the lock's profiler configuration
    pub label: Option<String>,
    /// Total time spent waiting to acquire the lock
    pub waited: Duration,
    /// Rendered creation-time stack
    pub creation_stack: String,
}

impl std::fmt::Display for ContentionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "waited {}.{:06}s in lock",
            self.waited.as_secs(),
            self.waited.subsec_micros()
        )?;
        if let Some(label) = &self.label {
            write!(f, " '{}'", label)?;
        }
        write!(f, ", created at:\n{}", self.creation_stack)
    }
}

#[cfg(feature = "lock-profiler")]
pub use enabled::ContentionProfiler;

#[cfg(not(feature = "lock-profiler"))]
pub use disabled::ContentionProfiler;

#[cfg(feature = "lock-profiler")]
mod enabled {
    use super::ContentionReport;
    use crate::config::ProfilerConfig;
    use crate::sync::backtrace::StackSnapshot;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, Instant};
    use tracing::warn;

    /// Per-lock wait accounting with creation-site attribution
    #[derive(Debug)]
    pub struct ContentionProfiler {
        /// Accumulated wait in nanoseconds
        waited_ns: AtomicU64,
        /// Released by `finish()`, exactly once
        snapshot: Option<StackSnapshot>,
        config: ProfilerConfig,
    }

    impl ContentionProfiler {
        pub fn new(config: ProfilerConfig) -> Self {
            Self {
                waited_ns: AtomicU64::new(0),
                snapshot: Some(StackSnapshot::capture(
                    config.skip_frames,
                    config.stack_depth,
                )),
                config,
            }
        }

        /// Run a blocking acquisition, charging its full duration to the lock
        #[inline]
        pub fn measure<R>(&self, acquire: impl FnOnce() -> R) -> R {
            let start = Instant::now();
            let result = acquire();
            let delta = start.elapsed().as_nanos().min(u64::MAX as u128) as u64;
            self.waited_ns.fetch_add(delta, Ordering::Relaxed);
            result
        }

        /// Total wait accumulated so far
        #[inline]
        pub fn waited(&self) -> Duration {
            Duration::from_nanos(self.waited_ns.load(Ordering::Relaxed))
        }

        /// Release the snapshot, reporting if the wait crossed the threshold
        ///
        /// Returns `None` on every call after the first.
        pub fn finish(&mut self) -> Option<ContentionReport> {
            let snapshot = self.snapshot.take()?;
            let waited = self.waited();

            if waited <= self.config.threshold {
                return None;
            }

            let report = ContentionReport {
                label: self.config.label.clone(),
                waited,
                creation_stack: snapshot.render(),
            };
            warn!(
                waited_us = waited.as_micros() as u64,
                label = report.label.as_deref().unwrap_or(""),
                "{}",
                report
            );
            Some(report)
        }
    }

    impl Drop for ContentionProfiler {
        fn drop(&mut self) {
            self.finish();
        }
    }
}

#[cfg(not(feature = "lock-profiler"))]
mod disabled {
    use super::ContentionReport;
    use crate::config::ProfilerConfig;
    use std::time::Duration;

    /// No-op stand-in used when profiling is compiled out
    #[derive(Debug)]
    pub struct ContentionProfiler;

    impl ContentionProfiler {
        #[inline(always)]
        pub fn new(_config: ProfilerConfig) -> Self {
            Self
        }

        #[inline(always)]
        pub fn measure<R>(&self, acquire: impl FnOnce() -> R) -> R {
            acquire()
        }

        #[inline(always)]
        pub fn waited(&self) -> Duration {
            Duration::ZERO
        }

        #[inline(always)]
        pub fn finish(&mut self) -> Option<ContentionReport> {
            None
        }
    }
}

impl Default for ContentionProfiler {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_format() {
        let report = ContentionReport {
            label: Some("table".into()),
            waited: Duration::from_micros(2_000_042),
            creation_stack: "   2: app::main".into(),
        };
        assert_eq!(
            report.to_string(),
            "waited 2.000042s in lock 'table', created at:\n   2: app::main"
        );
    }

    #[cfg(feature = "lock-profiler")]
    #[test]
    fn test_measure_accumulates() {
        let profiler = ContentionProfiler::default();
        assert_eq!(profiler.waited(), Duration::ZERO);

        profiler.measure(|| std::thread::sleep(Duration::from_millis(2)));
        let first = profiler.waited();
        assert!(first >= Duration::from_millis(2));

        profiler.measure(|| ());
        assert!(profiler.waited() >= first);
    }

    #[cfg(feature = "lock-profiler")]
    #[test]
    fn test_finish_threshold() {
        let mut quiet = ContentionProfiler::default();
        quiet.measure(|| ());
        assert!(quiet.finish().is_none());

        let mut busy = ContentionProfiler::new(ProfilerConfig::default().with_label("busy"));
        busy.measure(|| std::thread::sleep(Duration::from_millis(3)));
        let report = busy.finish().expect("wait above threshold must be reported");
        assert_eq!(report.label.as_deref(), Some("busy"));
        assert!(report.waited >= Duration::from_millis(3));

        // Snapshot is released on the first call
        assert!(busy.finish().is_none());
    }

    #[cfg(not(feature = "lock-profiler"))]
    #[test]
    fn test_disabled_is_noop() {
        let mut profiler = ContentionProfiler::default();
        assert_eq!(std::mem::size_of::<ContentionProfiler>(), 0);
        profiler.measure(|| std::thread::sleep(Duration::from_millis(2)));
        assert_eq!(profiler.waited(), Duration::ZERO);
        assert!(profiler.finish().is_none());
    }
}
