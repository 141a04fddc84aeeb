/*!
 * Synchronization Primitives
 *
 * Uniform locking layer with three primitives:
 * - Plain lock: non-reentrant mutual exclusion
 * - Recursive lock: owner may re-acquire without blocking
 * - Condition variable: wait/notify coupled to either lock type
 *
 * # Architecture
 *
 * Locks are built from a `LockType` selector into a single `Lock` handle
 * (enum dispatch). Both variants share the plain lock's raw mutex, holder
 * record and contention profiler; the recursive variant adds per-thread
 * depth slots. `CondVar` suspends and restores the holder record around
 * every blocking wait.
 *
 * # Contention Profiling
 *
 * With the `lock-profiler` feature (default), each lock accumulates the time
 * spent blocked in `acquire()` and reports itself at destruction if the
 * total exceeds its threshold.
 */

mod backtrace;
mod condvar;
mod lock;
mod plain;
mod profiler;
mod recursive;
mod thread;

// Re-export public API
pub use backtrace::StackSnapshot;
pub use condvar::{CondVar, CondVarType, WakeResult};
pub use lock::{Lock, LockGuard, LockType};
pub use profiler::{ContentionProfiler, ContentionReport};
pub use thread::ThreadToken;

// Variants for callers that never need the type-tagged handle
pub use plain::PlainLock;
pub use recursive::RecursiveLock;
