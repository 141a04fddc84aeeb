/*!
 * Error Types
 * Lock contract violations surfaced with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for lock and condition variable operations
pub type LockResult<T> = Result<T, LockError>;

/// Which lock variant reported a defect
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    Plain,
    Recursive,
}

impl std::fmt::Display for LockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockKind::Plain => f.write_str("plain"),
            LockKind::Recursive => f.write_str("recursive"),
        }
    }
}

/// Programming defects detected by the lock layer
///
/// Every variant is also reported through `tracing::error!` at the point of
/// detection, so a caller that discards the result still leaves a trace.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LockError {
    #[error("{kind} lock released while not held")]
    #[diagnostic(
        code(lock::not_held),
        help("Every release must be paired with a preceding acquire on the same thread.")
    )]
    NotHeld { kind: LockKind },

    #[error("{kind} lock is held by thread {holder:#x}, not the calling thread")]
    #[diagnostic(
        code(lock::not_owner),
        help("Only the thread that acquired the lock may release it or wait with it.")
    )]
    NotOwner { kind: LockKind, holder: usize },

    #[error("{kind} lock re-acquired by the thread already holding it")]
    #[diagnostic(
        code(lock::would_deadlock),
        help("Plain locks are not reentrant. Use LockType::Recursive for nested acquisition.")
    )]
    WouldDeadlock { kind: LockKind },
}

impl LockError {
    /// Kind of lock the defect was detected on
    pub fn kind(&self) -> LockKind {
        match self {
            LockError::NotHeld { kind }
            | LockError::NotOwner { kind, .. }
            | LockError::WouldDeadlock { kind } => *kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LockError::NotOwner {
            kind: LockKind::Recursive,
            holder: 0x10,
        };
        assert_eq!(
            err.to_string(),
            "recursive lock is held by thread 0x10, not the calling thread"
        );
        assert_eq!(err.kind(), LockKind::Recursive);
    }

    #[test]
    fn test_error_serialization() {
        let err = LockError::WouldDeadlock {
            kind: LockKind::Plain,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("would_deadlock"));

        let back: LockError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
