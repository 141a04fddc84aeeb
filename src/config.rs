/*!
 * Profiler Configuration
 *
 * Per-lock settings for contention accounting
 */

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Locks with less accumulated waiting than this are not reported
pub const DEFAULT_THRESHOLD: Duration = Duration::from_micros(1000);

/// Frames kept from the creation-time stack snapshot
pub const DEFAULT_STACK_DEPTH: usize = 16;

/// Extra caller frames dropped after the lock layer's own frames
pub const DEFAULT_SKIP_FRAMES: usize = 0;

const THRESHOLD_ENV: &str = "LOCKWORK_PROFILE_THRESHOLD_US";
const DEPTH_ENV: &str = "LOCKWORK_PROFILE_DEPTH";

/// Contention profiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Report at destruction only when accumulated wait exceeds this
    pub threshold: Duration,
    /// Frames of the creation stack rendered in a report
    pub stack_depth: usize,
    /// Caller frames dropped before rendering, e.g. a wrapper's constructor
    pub skip_frames: usize,
    /// Optional name carried into reports
    pub label: Option<String>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            stack_depth: DEFAULT_STACK_DEPTH,
            skip_frames: DEFAULT_SKIP_FRAMES,
            label: None,
        }
    }
}

impl ProfilerConfig {
    /// Only report locks that waited a full second or more
    pub const fn quiet() -> Self {
        Self {
            threshold: Duration::from_secs(1),
            stack_depth: DEFAULT_STACK_DEPTH,
            skip_frames: DEFAULT_SKIP_FRAMES,
            label: None,
        }
    }

    /// Report any measurable contention with a deep creation stack
    pub const fn verbose() -> Self {
        Self {
            threshold: Duration::ZERO,
            stack_depth: 64,
            skip_frames: DEFAULT_SKIP_FRAMES,
            label: None,
        }
    }

    /// Defaults overridden by environment variables
    ///
    /// - `LOCKWORK_PROFILE_THRESHOLD_US`: report threshold in microseconds
    /// - `LOCKWORK_PROFILE_DEPTH`: rendered stack depth
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(us) = read_env::<u64>(THRESHOLD_ENV) {
            config.threshold = Duration::from_micros(us);
        }
        if let Some(depth) = read_env::<usize>(DEPTH_ENV) {
            config.stack_depth = depth;
        }

        config
    }

    /// Attach a label used to identify the lock in reports
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }
}

fn read_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable profiler setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold() {
        let config = ProfilerConfig::default();
        assert_eq!(config.threshold, Duration::from_micros(1000));
        assert_eq!(config.stack_depth, 16);
        assert!(config.label.is_none());
    }

    #[test]
    fn test_presets() {
        assert!(ProfilerConfig::quiet().threshold > DEFAULT_THRESHOLD);
        assert_eq!(ProfilerConfig::verbose().threshold, Duration::ZERO);
        assert!(ProfilerConfig::verbose().stack_depth > DEFAULT_STACK_DEPTH);
    }

    #[test]
    fn test_builder() {
        let config = ProfilerConfig::default()
            .with_label("queue")
            .with_threshold(Duration::from_millis(5));
        assert_eq!(config.label.as_deref(), Some("queue"));
        assert_eq!(config.threshold, Duration::from_millis(5));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ProfilerConfig = serde_json::from_str(r#"{"stack_depth": 8}"#).unwrap();
        assert_eq!(config.stack_depth, 8);
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
    }
}
