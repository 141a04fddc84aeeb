/*!
 * Tracing Setup
 * Structured diagnostics sink for lock defects and contention reports
 *
 * Every diagnostic the lock layer produces goes through the `tracing` macros:
 * - `error!` for lock/unlock contract violations
 * - `warn!` for contention reports at lock destruction
 * - `trace!` for wait and wake events on condition variables
 */

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable enabling JSON output
const TRACE_JSON_ENV: &str = "LOCKWORK_TRACE_JSON";

/// Initialize structured tracing for an application using the lock layer
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - LOCKWORK_TRACE_JSON: Enable JSON output (default: false)
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_file(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "lock diagnostics tracing initialized");
    }
}

/// Idempotent test subscriber writing through the test harness capture
#[doc(hidden)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(
            tracing_subscriber::fmt::layer()
                .with_test_writer()
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
        init_tracing();
        tracing::debug!("still logging after repeated init");
    }
}
