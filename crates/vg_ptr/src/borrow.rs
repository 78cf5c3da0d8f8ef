use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

use crate::liveness::LivenessCell;

// -----------------------------------------------------------------------------
// ObserverRef

/// A shared read of an observed value, returned by
/// [`ObserverPtr::get`](crate::ObserverPtr::get).
///
/// While it is alive the owner cannot hand out mutable access or release the
/// value. If the owner destroys or replaces the value meanwhile, the drop is
/// deferred until the last `ObserverRef` of that value goes away.
pub struct ObserverRef<'a, T: ?Sized> {
    value: NonNull<T>,
    liveness: &'a LivenessCell,
    _marker: PhantomData<&'a T>,
}

impl<'a, T: ?Sized> ObserverRef<'a, T> {
    /// # Safety
    /// - `value` must point to a live value of the binding tracked by `liveness`.
    /// - A shared borrow must already be registered on `liveness`.
    #[inline]
    pub(crate) unsafe fn new(value: NonNull<T>, liveness: &'a LivenessCell) -> Self {
        Self {
            value,
            liveness,
            _marker: PhantomData,
        }
    }

    /// Copies an `ObserverRef`, like [`core::cell::Ref::clone`].
    ///
    /// This is an associated function so that `ObserverRef` can deref to
    /// values that implement `Clone`.
    #[must_use]
    pub fn clone(orig: &Self) -> Self {
        // A live `ObserverRef` means the cell is in reading state.
        let started = orig.liveness.try_borrow();
        debug_assert!(started);
        Self {
            value: orig.value,
            liveness: orig.liveness,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Deref for ObserverRef<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the registered borrow keeps the value from being dropped
        // or mutated until `self` is dropped.
        unsafe { self.value.as_ref() }
    }
}

impl<T: ?Sized> Drop for ObserverRef<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.liveness.end_borrow();
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for ObserverRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized + fmt::Display> fmt::Display for ObserverRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

// -----------------------------------------------------------------------------
// OwningRefMut

/// Exclusive access to an owned value, returned by
/// [`OwningPtr::get_mut`](crate::OwningPtr::get_mut).
///
/// While it is alive, reads through observers fail with
/// [`AccessError::Borrowed`](crate::AccessError::Borrowed).
pub struct OwningRefMut<'a, T: ?Sized> {
    value: NonNull<T>,
    liveness: Option<&'a LivenessCell>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T: ?Sized> OwningRefMut<'a, T> {
    /// # Safety
    /// - `value` must point to the live value owned by the caller, which is
    ///   mutably borrowed for `'a`.
    /// - If `liveness` is set, an exclusive borrow must already be registered on it.
    #[inline]
    pub(crate) unsafe fn new(value: NonNull<T>, liveness: Option<&'a LivenessCell>) -> Self {
        Self {
            value,
            liveness,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Deref for OwningRefMut<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the owner is mutably borrowed and observers are locked out.
        unsafe { self.value.as_ref() }
    }
}

impl<T: ?Sized> DerefMut for OwningRefMut<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the owner is mutably borrowed and observers are locked out.
        unsafe { self.value.as_mut() }
    }
}

impl<T: ?Sized> Drop for OwningRefMut<'_, T> {
    #[inline]
    fn drop(&mut self) {
        if let Some(liveness) = self.liveness {
            liveness.end_borrow_mut();
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for OwningRefMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::ObserverRef;
    use crate::{AccessError, OwningPtr};
    use alloc::format;

    #[test]
    fn cloned_read_keeps_value() {
        let mut owner = OwningPtr::new(7_u32);
        let observer = owner.create_observer();

        let first = observer.get().unwrap();
        let second = ObserverRef::clone(&first);
        drop(first);

        assert_eq!(owner.try_get_mut().err(), Some(AccessError::Borrowed));
        assert_eq!(*second, 7);

        drop(second);
        *owner.get_mut().unwrap() += 1;
        assert_eq!(*observer.get().unwrap(), 8);
    }

    #[test]
    fn guards_format_as_value() {
        let mut owner = OwningPtr::new(12_i32);
        let observer = owner.create_observer();

        assert_eq!(format!("{:?}", observer.get().unwrap()), "12");
        assert_eq!(format!("{}", observer.get().unwrap()), "12");
        assert_eq!(format!("{:?}", owner.get_mut().unwrap()), "12");
    }
}
