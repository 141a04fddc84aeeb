/*!
 * Lockwork
 * Plain and recursive locks with a coupled condition variable and optional
 * lock contention profiling
 */

pub mod config;
pub mod errors;
pub mod monitoring;
pub mod sync;

// Re-exports
pub use config::ProfilerConfig;
pub use errors::{LockError, LockKind, LockResult};
pub use monitoring::init_tracing;
pub use sync::{
    CondVar, CondVarType, ContentionReport, Lock, LockGuard, LockType, ThreadToken, WakeResult,
};
