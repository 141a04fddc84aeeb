/*!
 * Plain Lock
 *
 * Non-reentrant mutual exclusion over `parking_lot::RawMutex`, with a holder
 * record and optional contention accounting.
 *
 * # Holder Record
 *
 * The holder word is written only by the thread that holds the raw mutex:
 * set right after acquisition, cleared right before release. Any thread can
 * compare it against its own token without synchronization, because the
 * only way to observe its own token there is to have written it.
 */

use parking_lot::lock_api::RawMutex as RawMutexApi;
use parking_lot::RawMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::error;

use super::profiler::{ContentionProfiler, ContentionReport};
use super::thread::ThreadToken;
use crate::config::ProfilerConfig;
use crate::errors::{LockError, LockKind, LockResult};

/// Exclusive lock granting access to one thread at a time
pub struct PlainLock {
    raw: RawMutex,
    /// Token of the holding thread, 0 when free or suspended in a wait
    holder: AtomicUsize,
    profiler: ContentionProfiler,
}

impl PlainLock {
    pub fn new(config: ProfilerConfig) -> Self {
        Self {
            raw: <RawMutex as RawMutexApi>::INIT,
            holder: AtomicUsize::new(0),
            profiler: ContentionProfiler::new(config),
        }
    }

    /// Block until the lock is free, then take it
    pub fn acquire(&self) -> LockResult<()> {
        self.acquire_as(ThreadToken::current(), LockKind::Plain)
    }

    /// Take the lock only if it is free right now
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_as(ThreadToken::current())
    }

    /// Release a lock held by the calling thread
    pub fn release(&self) -> LockResult<()> {
        self.release_as(ThreadToken::current(), LockKind::Plain)
    }

    /// Whether any thread holds the underlying mutex
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Thread currently recorded as holder
    #[inline]
    pub fn holder(&self) -> Option<ThreadToken> {
        ThreadToken::from_word(self.holder.load(Ordering::Relaxed))
    }

    /// Total time spent blocked in `acquire()`
    #[inline]
    pub fn waited(&self) -> Duration {
        self.profiler.waited()
    }

    pub(crate) fn acquire_as(&self, me: ThreadToken, kind: LockKind) -> LockResult<()> {
        if self.holder() == Some(me) {
            error!(%kind, thread = %me, "!!!! LOCK ERROR: re-acquired by holder, your code is buggy !!!!");
            return Err(LockError::WouldDeadlock { kind });
        }

        self.profiler.measure(|| self.raw.lock());
        self.holder.store(me.as_usize(), Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn try_acquire_as(&self, me: ThreadToken) -> bool {
        if !self.raw.try_lock() {
            return false;
        }
        self.holder.store(me.as_usize(), Ordering::Relaxed);
        true
    }

    pub(crate) fn release_as(&self, me: ThreadToken, kind: LockKind) -> LockResult<()> {
        self.check_holder(me, kind)?;
        self.holder.store(0, Ordering::Relaxed);
        // SAFETY: the holder record names the calling thread, so the raw
        // mutex is locked in this context.
        unsafe { self.raw.unlock() };
        Ok(())
    }

    /// Verify that `me` holds the lock, reporting the defect otherwise
    pub(crate) fn check_holder(&self, me: ThreadToken, kind: LockKind) -> LockResult<()> {
        match self.holder() {
            Some(holder) if holder == me => Ok(()),
            Some(holder) => {
                error!(%kind, thread = %me, %holder, "!!!! LOCK ERROR: released by non-holder, your code is buggy !!!!");
                Err(LockError::NotOwner {
                    kind,
                    holder: holder.as_usize(),
                })
            }
            None => {
                error!(%kind, thread = %me, "!!!! UNLOCK ERROR: lock not held, your code is buggy !!!!");
                Err(LockError::NotHeld { kind })
            }
        }
    }

    /// Erase the holder record ahead of a condition variable wait
    pub(crate) fn suspend(&self, me: ThreadToken, kind: LockKind) -> LockResult<()> {
        self.check_holder(me, kind)?;
        self.holder.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Release only the raw mutex, leaving bookkeeping to the caller
    ///
    /// # Safety
    ///
    /// The raw mutex must be locked by the calling thread, with the holder
    /// record already cleared by `suspend()`.
    pub(crate) unsafe fn unlock_raw(&self) {
        self.raw.unlock();
    }

    /// Re-take the raw mutex after a wait and restore the holder record
    ///
    /// Not charged to the profiler: only `acquire()` latency is accounted.
    pub(crate) fn resume(&self, me: ThreadToken) {
        self.raw.lock();
        self.holder.store(me.as_usize(), Ordering::Relaxed);
    }

    pub(crate) fn finish(&mut self) -> Option<ContentionReport> {
        self.profiler.finish()
    }
}

impl Drop for PlainLock {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(!self.raw.is_locked(), "lock destroyed while held");
        }
    }
}

impl std::fmt::Debug for PlainLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainLock")
            .field("locked", &self.is_locked())
            .field("holder", &self.holder())
            .field("waited", &self.waited())
            .finish()
    }
}
