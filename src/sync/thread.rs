/*!
 * Thread Identity
 *
 * Cheap non-zero token for the calling thread, usable as an atomic word.
 * Backed by `parking_lot::RawThreadId` (the address of a thread-local), so
 * tokens are unique among live threads and may be reused after a thread exits.
 */

use parking_lot::lock_api::GetThreadId;
use parking_lot::RawThreadId;
use std::num::NonZeroUsize;

/// Identity of an OS thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadToken(NonZeroUsize);

impl ThreadToken {
    /// Token of the calling thread
    #[inline]
    pub fn current() -> Self {
        Self(RawThreadId.nonzero_thread_id())
    }

    /// Raw word stored in owner fields (never zero)
    #[inline(always)]
    pub fn as_usize(self) -> usize {
        self.0.get()
    }

    /// Decode an owner word, where zero means "no owner"
    #[inline(always)]
    pub(crate) fn from_word(word: usize) -> Option<Self> {
        NonZeroUsize::new(word).map(Self)
    }
}

impl std::fmt::Display for ThreadToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}
