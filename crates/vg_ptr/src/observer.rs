use alloc::rc::Rc;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::borrow::ObserverRef;
use crate::error::AccessError;
use crate::liveness::LivenessCell;

// -----------------------------------------------------------------------------
// Batch

/// One `create_observer` call. Its strong count is the number of observer
/// copies sharing it.
struct Batch<T: ?Sized> {
    liveness: Rc<LivenessCell>,
    // `None` if the owner was empty when the batch was created.
    value: Option<NonNull<T>>,
    // Drop-check: observers must not outlive the lifetimes inside `T`, a
    // deferred drop of the value may run when the last read ends.
    _marker: PhantomData<T>,
}

// -----------------------------------------------------------------------------
// ObserverPtr

/// A non-owning view into the value of an [`OwningPtr`](crate::OwningPtr).
///
/// Cloning an observer is cheap; the clones share one count. An observer
/// never keeps the value alive: once the owner destroys, replaces or releases
/// the value, every observer of it reads as absent.
///
/// A default-constructed observer is unbound: it reads as absent and its
/// [`count`](Self::count) is `-1`.
///
/// # Examples
///
/// ```
/// use vg_ptr::{ObserverPtr, OwningPtr};
///
/// let mut unbound = ObserverPtr::<i32>::new();
/// assert_eq!(unbound.count(), -1);
///
/// let owner = OwningPtr::new(34);
/// unbound = owner.create_observer();
/// assert_eq!(unbound.with(|v| *v + 1), Some(35));
///
/// drop(owner);
/// assert!(!unbound.is_alive());
/// ```
///
/// An observer cannot outlive data borrowed by the observed value:
///
/// ```compile_fail
/// use vg_ptr::{ObserverPtr, OwningPtr};
///
/// struct Wrapper<'a>(&'a u32);
///
/// impl Drop for Wrapper<'_> {
///     fn drop(&mut self) {}
/// }
///
/// let observer: ObserverPtr<Wrapper<'_>>;
/// let referent = 7_u32;
/// let owner = OwningPtr::new(Wrapper(&referent));
/// observer = owner.create_observer();
/// core::mem::forget(observer.get());
/// ```
pub struct ObserverPtr<T: ?Sized> {
    batch: Option<Rc<Batch<T>>>,
}

impl<T: ?Sized> ObserverPtr<T> {
    /// The [`count`](Self::count) of an unbound observer.
    pub const UNBOUND_COUNT: isize = -1;

    /// Creates an unbound observer.
    #[inline]
    pub const fn new() -> Self {
        Self { batch: None }
    }

    /// Starts a new batch.
    pub(crate) fn bind(liveness: Rc<LivenessCell>, value: Option<NonNull<T>>) -> Self {
        Self {
            batch: Some(Rc::new(Batch {
                liveness,
                value,
                _marker: PhantomData,
            })),
        }
    }

    /// Returns `true` if the observer was created by an owner.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.batch.is_some()
    }

    /// Returns `true` if the observer is bound and its owner has not
    /// invalidated it.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.batch
            .as_ref()
            .is_some_and(|batch| batch.liveness.is_alive())
    }

    /// Reads the observed value.
    ///
    /// Returns `None` if the observer is unbound or dead, if the owner was
    /// empty when the observer was created, or while the owner holds
    /// mutable access to the value.
    #[inline]
    pub fn get(&self) -> Option<ObserverRef<'_, T>> {
        self.try_get().ok()
    }

    /// Reads the observed value.
    ///
    /// # Errors
    ///
    /// - [`AccessError::InvalidDereference`] if there is no live value to read.
    /// - [`AccessError::Borrowed`] while the owner holds mutable access.
    pub fn try_get(&self) -> Result<ObserverRef<'_, T>, AccessError> {
        let batch = self.batch.as_deref().ok_or(AccessError::InvalidDereference)?;
        if !batch.liveness.is_alive() {
            return Err(AccessError::InvalidDereference);
        }
        let value = batch.value.ok_or(AccessError::InvalidDereference)?;

        if !batch.liveness.try_borrow() {
            return Err(AccessError::Borrowed);
        }

        // SAFETY: the binding is alive, so `value` is the owner's current
        // value, and the shared borrow is registered.
        Ok(unsafe { ObserverRef::new(value, &batch.liveness) })
    }

    /// Calls `f` with the observed value, if it can be read.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.get().map(|value| f(&value))
    }

    /// Returns the number of observers sharing this batch, including `self`,
    /// or [`UNBOUND_COUNT`](Self::UNBOUND_COUNT) if unbound.
    ///
    /// ```
    /// use vg_ptr::OwningPtr;
    ///
    /// let owner = OwningPtr::new(());
    /// let first = owner.create_observer();
    /// let second = first.clone();
    /// let other = owner.create_observer();
    ///
    /// assert_eq!(first.count(), 2);
    /// assert_eq!(second.count(), 2);
    /// assert_eq!(other.count(), 1);
    /// ```
    #[inline]
    pub fn count(&self) -> isize {
        match &self.batch {
            Some(batch) => Rc::strong_count(batch) as isize,
            None => Self::UNBOUND_COUNT,
        }
    }

    /// Unbinds the observer, leaving the rest of its batch untouched.
    #[inline]
    pub fn reset(&mut self) {
        self.batch = None;
    }

    /// Moves the observer out, leaving `self` unbound.
    #[inline]
    pub fn take(&mut self) -> Self {
        Self {
            batch: self.batch.take(),
        }
    }

    /// Returns `true` if both observers belong to the same batch.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.batch, &other.batch) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T: ?Sized> Clone for ObserverPtr<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            batch: self.batch.clone(),
        }
    }
}

impl<T: ?Sized> Default for ObserverPtr<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for ObserverPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverPtr")
            .field("alive", &self.is_alive())
            .field("count", &self.count())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::ObserverPtr;
    use crate::test_utils::{DropSink, Foo};
    use crate::{AccessError, OwningPtr};
    use alloc::boxed::Box;
    use alloc::format;

    struct Fixture {
        bar: OwningPtr<Foo>,
        bar2: OwningPtr<Foo>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                bar: OwningPtr::new(Foo::new(10, 3)),
                bar2: OwningPtr::new(Foo::new(5, 2)),
            }
        }
    }

    #[test]
    fn empty_observer() {
        let obs = ObserverPtr::<Foo>::new();

        assert!(!obs.is_bound());
        assert!(!obs.is_alive());
        assert_eq!(obs.count(), -1);
        assert!(obs.get().is_none());
        assert_eq!(obs.try_get().err(), Some(AccessError::InvalidDereference));
    }

    #[test]
    fn owning_pointer_out_of_scope() {
        let owner = Box::new(OwningPtr::new(Foo::new(34, 1)));
        let obs = owner.create_observer();

        assert!(obs.is_alive());
        assert_eq!(obs.get().unwrap().value, 34);

        drop(owner);

        assert!(obs.is_bound());
        assert!(!obs.is_alive());
        assert!(obs.get().is_none());
    }

    #[test]
    fn creation() {
        let mut fx = Fixture::new();

        let obs1 = fx.bar.create_observer();
        let obs2 = obs1.clone();

        assert_eq!(obs1.get().unwrap().value, 30);
        assert_eq!(obs2.get().unwrap().value, 30);
        assert_eq!(obs1.count(), 2);
        assert_eq!(obs2.count(), 2);
        assert!(obs1.is_alive());
        assert!(obs2.is_alive());

        // Replacing with nothing keeps the value.
        fx.bar.replace(None);

        assert!(obs1.is_alive());
        assert_eq!(obs1.get().unwrap().value, 30);

        // Observers of the moved value follow it, the old ones are dropped.
        let obs3 = fx.bar2.create_observer();
        fx.bar.assign_from(&mut fx.bar2);

        assert!(!obs1.is_alive());
        assert!(obs1.get().is_none());
        assert!(obs3.is_alive());
        assert_eq!(obs3.get().unwrap().value, 10);
        assert!(fx.bar2.is_none());

        // A fresh batch of the new owner shares its liveness with `obs3`.
        let obs4 = fx.bar.create_observer();
        assert_eq!(obs4.get().unwrap().value, 10);
        assert_eq!(obs4.count(), 1);

        fx.bar.destroy();
        assert!(!obs3.is_alive());
        assert!(!obs4.is_alive());
    }

    #[test]
    fn count_follows_copies() {
        let owner = OwningPtr::new(Foo::default());
        let mut obs1 = owner.create_observer();
        let obs2 = obs1.clone();
        {
            let obs3 = obs2.clone();
            assert_eq!(obs3.count(), 3);
        }
        assert_eq!(obs1.count(), 2);

        obs1.reset();
        assert_eq!(obs1.count(), -1);
        assert_eq!(obs2.count(), 1);
        assert!(obs2.is_alive());
    }

    #[test]
    fn clone_from_unbound() {
        let owner = OwningPtr::new(Foo::default());
        let bound = owner.create_observer();
        let mut target = ObserverPtr::new();

        target.clone_from(&bound);
        assert!(target.ptr_eq(&bound));
        assert_eq!(bound.count(), 2);

        target.clone_from(&ObserverPtr::new());
        assert!(!target.is_bound());
        assert_eq!(bound.count(), 1);
    }

    #[test]
    fn take_leaves_unbound() {
        let owner = OwningPtr::new(Foo::default());
        let mut obs = owner.create_observer();

        let moved = obs.take();

        assert!(!obs.is_bound());
        assert_eq!(moved.count(), 1);
        assert_eq!(moved.get().unwrap().value, 5);
    }

    #[test]
    fn batches_are_independent() {
        let owner = OwningPtr::new(Foo::default());
        let first = owner.create_observer();
        let second = owner.create_observer();
        let first_copy = first.clone();

        assert!(!first.ptr_eq(&second));
        assert!(first.ptr_eq(&first_copy));
        assert_eq!(first.count(), 2);
        assert_eq!(second.count(), 1);
    }

    #[test]
    fn every_batch_is_invalidated() {
        let sink = DropSink::new();
        let mut owner = OwningPtr::new(Foo::new(3, 3).tracked(&sink));
        let first = owner.create_observer();
        let second = owner.create_observer();

        owner.replace(Box::new(Foo::new(1, 1)));

        assert_eq!(sink.last(), Some(9));
        assert!(!first.is_alive());
        assert!(!second.is_alive());

        let third = owner.create_observer();
        assert_eq!(third.get().unwrap().value, 1);
    }

    #[test]
    fn observer_of_empty_owner() {
        let mut owner = OwningPtr::<Foo>::empty();
        let obs = owner.create_observer();

        assert!(obs.is_alive());
        assert!(obs.get().is_none());
        assert_eq!(obs.try_get().err(), Some(AccessError::InvalidDereference));

        owner.replace(Box::new(Foo::default()));
        assert!(!obs.is_alive());
    }

    #[test]
    fn observers_survive_rust_moves() {
        let owner = OwningPtr::new(Foo::new(6, 1));
        let obs = owner.create_observer();

        let moved = owner;
        let boxed = Box::new(moved);

        assert_eq!(obs.get().unwrap().value, 6);
        drop(boxed);
        assert!(!obs.is_alive());
    }

    #[test]
    fn release_invalidates() {
        let mut owner = OwningPtr::new(Foo::new(2, 1));
        let obs = owner.create_observer();

        let value = owner.release();

        assert!(!obs.is_alive());
        assert_eq!(value.unwrap().value, 2);
    }

    #[test]
    fn debug_output() {
        let owner = OwningPtr::new(Foo::default());
        let obs = owner.create_observer();

        assert_eq!(format!("{obs:?}"), "ObserverPtr { alive: true, count: 1 }");
        drop(owner);
        assert_eq!(format!("{obs:?}"), "ObserverPtr { alive: false, count: 1 }");
        assert_eq!(
            format!("{:?}", ObserverPtr::<Foo>::new()),
            "ObserverPtr { alive: false, count: -1 }"
        );
    }
}
