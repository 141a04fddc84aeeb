/*!
 * Condition Variable
 *
 * Wait/notify coupled to either lock variant, parking threads with
 * parking_lot_core on the condition variable's own address.
 *
 * # Ownership Across a Wait
 *
 * Waiting releases the lock's raw mutex behind the lock's own bookkeeping,
 * so the owner record is erased before parking and restored after the mutex
 * is re-taken. Without this, a recursive lock would keep naming the waiter as
 * owner while another thread actually holds it. A recursive waiter's depth
 * stays in its own slot for the whole wait and is untouched on return.
 *
 * # Lost Wakeups
 *
 * The raw mutex is released in `park`'s `before_sleep` callback, after the
 * waiter is already queued under the condition variable's address. A thread
 * that takes the lock after that point and signals is guaranteed to find it.
 */

use parking_lot_core::{
    park, unpark_all, unpark_one, ParkResult, DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

use super::lock::Lock;
use super::thread::ThreadToken;
use crate::errors::LockResult;

/// Condition variable type selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CondVarType {
    #[default]
    Default,
}

/// Result of a wake operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Successfully woke N waiters (N >= 1)
    Woken(usize),
    /// No waiters were waiting
    NoWaiters,
}

impl WakeResult {
    fn from_count(count: usize) -> Self {
        if count == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(count)
        }
    }

    /// Check if any waiters were woken
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    /// Get number of woken waiters (0 if none)
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }
}

/// Condition variable usable with plain and recursive locks
///
/// Wakeups may be spurious and carry no ordering among waiters; re-check the
/// predicate in a loop or use `wait_while`.
pub struct CondVar {
    /// Threads currently parked (diagnostic only); also gives the value a
    /// unique, stable parking address
    waiters: AtomicUsize,
}

impl CondVar {
    pub fn new(cv_type: CondVarType) -> Self {
        match cv_type {
            CondVarType::Default => Self {
                waiters: AtomicUsize::new(0),
            },
        }
    }

    /// Block until signalled, with `lock` released for the duration
    ///
    /// The caller must hold `lock`; otherwise the defect is reported and
    /// returned without waiting.
    pub fn wait(&self, lock: &Lock) -> LockResult<()> {
        self.park_on(lock, None).map(|_| ())
    }

    /// Block until signalled or `timeout` elapses
    ///
    /// Returns `true` if the deadline passed without a wake, `false` if woken
    /// (by a signal or spuriously) before it.
    pub fn timed_wait(&self, lock: &Lock, timeout: Duration) -> LockResult<bool> {
        // An unrepresentable deadline means waiting without one
        let deadline = Instant::now().checked_add(timeout);
        self.park_on(lock, deadline)
    }

    /// `timed_wait` with the timeout given in milliseconds
    pub fn timed_wait_ms(&self, lock: &Lock, timeout_ms: u32) -> LockResult<bool> {
        self.timed_wait(lock, Duration::from_millis(u64::from(timeout_ms)))
    }

    /// Wait while `condition` holds, re-checking it after every wake
    ///
    /// Returns `true` if `timeout` elapsed with the condition still holding.
    pub fn wait_while<F>(
        &self,
        lock: &Lock,
        timeout: Option<Duration>,
        mut condition: F,
    ) -> LockResult<bool>
    where
        F: FnMut() -> bool,
    {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        while condition() {
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return Ok(true);
                    }
                    self.park_on(lock, Some(deadline))?;
                }
                None => self.wait(lock)?,
            }
        }

        Ok(false)
    }

    /// Wake at most one waiter; never blocks
    pub fn signal(&self) -> WakeResult {
        // SAFETY: the callback does not call into parking_lot
        let result = unsafe { unpark_one(self.addr(), |_| DEFAULT_UNPARK_TOKEN) };
        trace!(woken = result.unparked_threads, "condvar signal");
        WakeResult::from_count(result.unparked_threads)
    }

    /// Wake every waiter; never blocks
    pub fn broadcast(&self) -> WakeResult {
        // SAFETY: the key is this condvar's address, used only for parking
        let count = unsafe { unpark_all(self.addr(), DEFAULT_UNPARK_TOKEN) };
        trace!(woken = count, "condvar broadcast");
        WakeResult::from_count(count)
    }

    /// Approximate number of parked waiters (for diagnostics)
    pub fn waiter_count(&self) -> usize {
        self.waiters.load(Ordering::Relaxed)
    }

    /// Release the condition variable
    ///
    /// Waiters borrow the condition variable, so none can remain parked here.
    pub fn destroy(self) {
        debug_assert_eq!(self.waiter_count(), 0, "condvar destroyed with waiters");
    }

    #[inline(always)]
    fn addr(&self) -> usize {
        self as *const Self as usize
    }

    fn park_on(&self, lock: &Lock, deadline: Option<Instant>) -> LockResult<bool> {
        let me = ThreadToken::current();
        let base = lock.base();

        base.suspend(me, lock.kind())?;
        self.waiters.fetch_add(1, Ordering::Relaxed);
        trace!(thread = %me, kind = %lock.kind(), timed = deadline.is_some(), "condvar wait");

        // SAFETY: validate and timed_out do not call into parking_lot. The
        // raw mutex is locked by this thread (checked by suspend) and is
        // released exactly once, after the thread is queued.
        let result = unsafe {
            park(
                self.addr(),
                || true,
                || base.unlock_raw(),
                |_, _| {},
                DEFAULT_PARK_TOKEN,
                deadline,
            )
        };

        self.waiters.fetch_sub(1, Ordering::Relaxed);
        base.resume(me);

        let timed_out = matches!(result, ParkResult::TimedOut);
        trace!(thread = %me, timed_out, "condvar wake");
        Ok(timed_out)
    }
}

impl Default for CondVar {
    fn default() -> Self {
        Self::new(CondVarType::Default)
    }
}

impl std::fmt::Debug for CondVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CondVar")
            .field("waiters", &self.waiter_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LockError;
    use crate::sync::lock::LockType;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_signal_without_waiters() {
        let cv = CondVar::new(CondVarType::Default);
        assert_eq!(cv.signal(), WakeResult::NoWaiters);
        assert_eq!(cv.broadcast(), WakeResult::NoWaiters);
        assert_eq!(cv.signal().count(), 0);
        cv.destroy();
    }

    #[test]
    fn test_wait_requires_holding_lock() {
        let cv = CondVar::default();
        let lock = Lock::new(LockType::Default);
        assert!(matches!(cv.wait(&lock), Err(LockError::NotHeld { .. })));
        assert!(matches!(
            cv.timed_wait_ms(&lock, 10),
            Err(LockError::NotHeld { .. })
        ));
    }

    #[test]
    fn test_timed_wait_times_out() {
        let cv = CondVar::default();
        let lock = Lock::new(LockType::Default);
        lock.acquire().unwrap();

        let start = Instant::now();
        assert!(cv.timed_wait(&lock, Duration::from_millis(20)).unwrap());
        assert!(start.elapsed() >= Duration::from_millis(20));

        // Lock is held again on return
        assert_eq!(lock.owner(), Some(ThreadToken::current()));
        lock.release().unwrap();
    }

    #[test]
    fn test_signal_wakes_waiter() {
        let cv = Arc::new(CondVar::default());
        let lock = Arc::new(Lock::new(LockType::Default));

        let handle = {
            let cv = cv.clone();
            let lock = lock.clone();
            thread::spawn(move || {
                lock.acquire().unwrap();
                let timed_out = cv.timed_wait(&lock, Duration::from_secs(5)).unwrap();
                lock.release().unwrap();
                timed_out
            })
        };

        // Once the waiter parks, the lock is free and it is counted
        while cv.waiter_count() == 0 {
            thread::yield_now();
        }
        lock.acquire().unwrap();
        let woken = cv.signal();
        lock.release().unwrap();

        assert_eq!(woken, WakeResult::Woken(1));
        assert!(!handle.join().unwrap());
    }

    #[test]
    fn test_wait_while_timeout() {
        let cv = CondVar::default();
        let lock = Lock::new(LockType::Recursive);
        lock.acquire().unwrap();

        let timed_out = cv
            .wait_while(&lock, Some(Duration::from_millis(20)), || true)
            .unwrap();
        assert!(timed_out);
        assert_eq!(lock.depth(), 1);

        lock.release().unwrap();
    }
}
