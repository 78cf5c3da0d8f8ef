use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;
use core::mem;

use crate::orphan::Orphan;

// -----------------------------------------------------------------------------
// Borrow state

type BorrowFlag = isize;

const UNUSED: BorrowFlag = 0;
const WRITING: BorrowFlag = -1;

// -----------------------------------------------------------------------------
// LivenessCell

/// State shared by one owner binding and every observer batch issued for it.
///
/// - `alive` is flipped to `false` exactly once, by the owner, when the value
///   of the binding stops being valid.
/// - `borrow` counts observer reads (`> 0`) or marks the owner's exclusive
///   access ([`WRITING`]).
/// - `orphan` keeps a value whose drop was requested while observer reads
///   were alive. It is dropped with the last read.
pub(crate) struct LivenessCell {
    alive: Cell<bool>,
    borrow: Cell<BorrowFlag>,
    orphan: Cell<Option<Orphan>>,
}

impl LivenessCell {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            alive: Cell::new(true),
            borrow: Cell::new(UNUSED),
            orphan: Cell::new(None),
        })
    }

    #[inline]
    pub(crate) fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Marks the binding as dead.
    pub(crate) fn kill(&self) {
        crate::cfg::debug! {
            assert!(self.alive.get(), "liveness cell invalidated twice");
        }
        self.alive.set(false);
    }

    /// Returns `true` if an observer read or the owner's write is active.
    #[inline]
    pub(crate) fn is_borrowed(&self) -> bool {
        self.borrow.get() != UNUSED
    }

    /// Returns `true` if at least one observer read is active.
    #[inline]
    pub(crate) fn is_reading(&self) -> bool {
        self.borrow.get() > UNUSED
    }

    /// Starts a shared read, failing while the owner writes.
    pub(crate) fn try_borrow(&self) -> bool {
        let borrow = self.borrow.get();
        if borrow < UNUSED {
            return false;
        }
        assert!(borrow < BorrowFlag::MAX, "too many observer reads");
        self.borrow.set(borrow + 1);
        true
    }

    /// Ends a shared read. The last read drops a deferred value, if any.
    pub(crate) fn end_borrow(&self) {
        let borrow = self.borrow.get();
        crate::cfg::debug! {
            assert!(borrow > UNUSED, "observer read released twice");
        }
        self.borrow.set(borrow - 1);

        if borrow == 1
            && let Some(orphan) = self.orphan.take()
        {
            log::trace!("dropping value deferred behind observer reads");
            drop(orphan);
        }
    }

    /// Starts the owner's exclusive access, failing while anything reads.
    pub(crate) fn try_borrow_mut(&self) -> bool {
        if self.borrow.get() != UNUSED {
            return false;
        }
        self.borrow.set(WRITING);
        true
    }

    pub(crate) fn end_borrow_mut(&self) {
        crate::cfg::debug! {
            assert_eq!(self.borrow.get(), WRITING, "owner write released twice");
        }
        self.borrow.set(UNUSED);
    }

    /// Keeps `orphan` until the last observer read ends.
    ///
    /// Only valid on a dead cell with active reads.
    pub(crate) fn defer_drop(&self, orphan: Orphan) {
        crate::cfg::debug! {
            assert!(!self.is_alive(), "deferring a drop on a live binding");
            assert!(self.is_reading(), "deferring a drop without observer reads");
        }
        let previous = self.orphan.replace(Some(orphan));
        debug_assert!(previous.is_none());
    }
}

impl Drop for LivenessCell {
    fn drop(&mut self) {
        // Only reachable when an observer read was leaked. The lifetimes
        // inside the value may be over, so it is leaked as well.
        if let Some(orphan) = self.orphan.take() {
            log::warn!("value deferred behind a leaked observer read is leaked");
            mem::forget(orphan);
        }
    }
}

impl fmt::Debug for LivenessCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivenessCell")
            .field("alive", &self.alive.get())
            .field("borrow", &self.borrow.get())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests
