/*!
 * Lock Handle
 *
 * Uniform handle over the plain and recursive variants, selected once at
 * construction by a `LockType` and dispatched through an enum thereafter.
 *
 * # Lifetime
 *
 * `destroy()` consumes the handle, so use after destruction does not
 * compile. Dropping a handle performs the same cleanup. Destroying a lock
 * that is still held is a caller bug, checked in debug builds.
 */

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::time::Duration;

use super::plain::PlainLock;
use super::profiler::ContentionReport;
use super::recursive::RecursiveLock;
use super::thread::ThreadToken;
use crate::config::ProfilerConfig;
use crate::errors::{LockKind, LockResult};

/// Lock type selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    /// Non-reentrant exclusive lock
    #[default]
    Default,
    /// Owner may re-acquire without blocking
    Recursive,
}

/// Lock implementation (enum dispatch, no vtable)
enum LockImpl {
    Plain(PlainLock),
    Recursive(RecursiveLock),
}

/// Mutual exclusion lock created from a `LockType`
///
/// # Examples
///
/// ```
/// use lockwork::{Lock, LockType};
///
/// let lock = Lock::new(LockType::Recursive);
/// {
///     let _outer = lock.lock().unwrap();
///     let _inner = lock.lock().unwrap(); // same thread, no deadlock
///     assert_eq!(lock.depth(), 2);
/// }
/// assert!(!lock.is_locked());
/// lock.destroy();
/// ```
pub struct Lock {
    inner: LockImpl,
}

impl Lock {
    /// Create a lock with the default profiler configuration
    pub fn new(lock_type: LockType) -> Self {
        Self::with_config(lock_type, ProfilerConfig::default())
    }

    /// Create a lock with explicit contention profiler settings
    pub fn with_config(lock_type: LockType, config: ProfilerConfig) -> Self {
        let inner = match lock_type {
            LockType::Default => LockImpl::Plain(PlainLock::new(config)),
            LockType::Recursive => LockImpl::Recursive(RecursiveLock::new(config)),
        };
        Self { inner }
    }

    pub fn lock_type(&self) -> LockType {
        match &self.inner {
            LockImpl::Plain(_) => LockType::Default,
            LockImpl::Recursive(_) => LockType::Recursive,
        }
    }

    /// Block until the calling thread holds the lock
    ///
    /// Recursive locks return immediately when the caller already owns them.
    /// A plain lock re-acquired by its holder fails with `WouldDeadlock`
    /// instead of hanging.
    #[inline]
    pub fn acquire(&self) -> LockResult<()> {
        match &self.inner {
            LockImpl::Plain(l) => l.acquire(),
            LockImpl::Recursive(l) => l.acquire(),
        }
    }

    /// Acquire without blocking, returning whether the lock was taken
    #[inline]
    pub fn try_acquire(&self) -> bool {
        match &self.inner {
            LockImpl::Plain(l) => l.try_acquire(),
            LockImpl::Recursive(l) => l.try_acquire(),
        }
    }

    /// Release one acquisition made by the calling thread
    #[inline]
    pub fn release(&self) -> LockResult<()> {
        match &self.inner {
            LockImpl::Plain(l) => l.release(),
            LockImpl::Recursive(l) => l.release(),
        }
    }

    /// Acquire and return a guard releasing on every exit path
    pub fn lock(&self) -> LockResult<LockGuard<'_>> {
        self.acquire()?;
        Ok(LockGuard::new(self))
    }

    /// Guarded variant of `try_acquire`
    pub fn try_lock(&self) -> Option<LockGuard<'_>> {
        self.try_acquire().then(|| LockGuard::new(self))
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.base().is_locked()
    }

    /// Thread currently owning the lock
    #[inline]
    pub fn owner(&self) -> Option<ThreadToken> {
        self.base().holder()
    }

    /// Acquisitions held by the calling thread (at most 1 for plain locks)
    pub fn depth(&self) -> usize {
        match &self.inner {
            LockImpl::Plain(l) => usize::from(l.holder() == Some(ThreadToken::current())),
            LockImpl::Recursive(l) => l.depth(),
        }
    }

    /// Total time threads spent blocked acquiring this lock
    ///
    /// Always zero when the `lock-profiler` feature is disabled.
    #[inline]
    pub fn waited(&self) -> Duration {
        self.base().waited()
    }

    /// Destroy the lock, returning the contention report if one was emitted
    pub fn destroy(mut self) -> Option<ContentionReport> {
        match &mut self.inner {
            LockImpl::Plain(l) => l.finish(),
            LockImpl::Recursive(l) => l.finish(),
        }
    }

    pub(crate) fn kind(&self) -> LockKind {
        match &self.inner {
            LockImpl::Plain(_) => LockKind::Plain,
            LockImpl::Recursive(_) => LockKind::Recursive,
        }
    }

    pub(crate) fn base(&self) -> &PlainLock {
        match &self.inner {
            LockImpl::Plain(l) => l,
            LockImpl::Recursive(l) => l.base(),
        }
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new(LockType::Default)
    }
}

impl std::fmt::Debug for Lock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            LockImpl::Plain(l) => std::fmt::Debug::fmt(l, f),
            LockImpl::Recursive(l) => std::fmt::Debug::fmt(l, f),
        }
    }
}

/// Scoped acquisition; releases one level of the lock when dropped
///
/// Ownership belongs to the acquiring thread, so the guard cannot be sent
/// to another thread and released there:
///
/// ```compile_fail
/// use lockwork::{Lock, LockType};
///
/// let lock = Lock::new(LockType::Default);
/// std::thread::scope(|s| {
///     let guard = lock.lock().unwrap();
///     s.spawn(move || drop(guard));
/// });
/// ```
#[must_use = "if unused the lock is released immediately"]
pub struct LockGuard<'a> {
    lock: &'a Lock,
    /// Pins the guard to the acquiring thread (`!Send`)
    _not_send: PhantomData<*const ()>,
}

impl<'a> LockGuard<'a> {
    fn new(lock: &'a Lock) -> Self {
        Self {
            lock,
            _not_send: PhantomData,
        }
    }

    /// Lock this guard holds, e.g. to wait on a condition variable
    pub fn lock(&self) -> &'a Lock {
        self.lock
    }

    /// Release now, surfacing any error instead of logging it on drop
    pub fn unlock(self) -> LockResult<()> {
        let lock = self.lock;
        std::mem::forget(self);
        lock.release()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // Defects are already reported through tracing by release()
        let _ = self.lock.release();
    }
}
