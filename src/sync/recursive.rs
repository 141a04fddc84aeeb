/*!
 * Recursive Lock
 *
 * Reentrant lock layered on `PlainLock`. The owner is the plain lock's
 * holder record; each thread's reentry depth lives in its own slot of a
 * thread-keyed map.
 *
 * # State Machine
 *
 * ```text
 * Unlocked      --acquire(T)-->  LockedBy(T, 1)
 * LockedBy(T,d) --acquire(T)-->  LockedBy(T, d+1)      no blocking, no raw call
 * LockedBy(T,d) --acquire(U)-->  blocks until Unlocked, then LockedBy(U, 1)
 * LockedBy(T,d) --release(T)-->  LockedBy(T, d-1)      d > 1, no raw call
 * LockedBy(T,1) --release(T)-->  Unlocked
 * ```
 *
 * # Per-Thread Depth
 *
 * A thread parked in a condition variable wait keeps its depth slot while
 * the owner record is cleared, so another thread can own the lock in the
 * meantime without disturbing it. Slots are removed when a depth returns to
 * zero, keeping the map bounded by the owner plus parked waiters.
 */

use ahash::RandomState;
use dashmap::DashMap;
use std::time::Duration;

use super::plain::PlainLock;
use super::profiler::ContentionReport;
use super::thread::ThreadToken;
use crate::config::ProfilerConfig;
use crate::errors::{LockKind, LockResult};

/// Lock that its owning thread may re-acquire without blocking
pub struct RecursiveLock {
    base: PlainLock,
    /// Reentry depth keyed by thread token; each thread touches only its key
    depths: DashMap<usize, usize, RandomState>,
}

impl RecursiveLock {
    pub fn new(config: ProfilerConfig) -> Self {
        Self {
            base: PlainLock::new(config),
            depths: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Acquire, or deepen ownership if the calling thread already owns it
    pub fn acquire(&self) -> LockResult<()> {
        let me = ThreadToken::current();

        if self.base.holder() == Some(me) {
            *self.depths.entry(me.as_usize()).or_insert(0) += 1;
            return Ok(());
        }

        self.base.acquire_as(me, LockKind::Recursive)?;
        self.depths.insert(me.as_usize(), 1);
        Ok(())
    }

    /// Non-blocking acquire; always succeeds for the owner
    pub fn try_acquire(&self) -> bool {
        let me = ThreadToken::current();

        if self.base.holder() == Some(me) {
            *self.depths.entry(me.as_usize()).or_insert(0) += 1;
            return true;
        }

        if !self.base.try_acquire_as(me) {
            return false;
        }
        self.depths.insert(me.as_usize(), 1);
        true
    }

    /// Drop one level of ownership, unlocking when the depth reaches zero
    pub fn release(&self) -> LockResult<()> {
        let me = ThreadToken::current();
        self.base.check_holder(me, LockKind::Recursive)?;

        let key = me.as_usize();
        let remaining = match self.depths.get_mut(&key) {
            Some(mut depth) => {
                *depth = (*depth).saturating_sub(1);
                *depth
            }
            None => 0,
        };

        if remaining > 0 {
            return Ok(());
        }

        self.depths.remove(&key);
        self.base.release_as(me, LockKind::Recursive)
    }

    /// Reentry depth of the calling thread (0 if it does not own the lock)
    pub fn depth(&self) -> usize {
        let me = ThreadToken::current();
        self.depths.get(&me.as_usize()).map(|d| *d).unwrap_or(0)
    }

    /// Current owner, if any
    #[inline]
    pub fn owner(&self) -> Option<ThreadToken> {
        self.base.holder()
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.base.is_locked()
    }

    #[inline]
    pub fn waited(&self) -> Duration {
        self.base.waited()
    }

    pub(crate) fn base(&self) -> &PlainLock {
        &self.base
    }

    pub(crate) fn finish(&mut self) -> Option<ContentionReport> {
        self.depths.clear();
        self.base.finish()
    }
}

impl std::fmt::Debug for RecursiveLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecursiveLock")
            .field("owner", &self.owner())
            .field("slots", &self.depths.len())
            .field("waited", &self.waited())
            .finish()
    }
}
