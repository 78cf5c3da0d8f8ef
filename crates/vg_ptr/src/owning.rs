use alloc::boxed::Box;
use alloc::rc::Rc;
use core::any::type_name;
use core::cell::OnceCell;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

use crate::borrow::OwningRefMut;
use crate::error::AccessError;
use crate::liveness::LivenessCell;
use crate::observer::ObserverPtr;
use crate::orphan::Orphan;
use crate::upcast::Upcast;

// -----------------------------------------------------------------------------
// OwningPtr

/// An exclusive owner of a heap-allocated `T` that can be observed.
///
/// It behaves like an `Option<Box<T>>`, and additionally hands out
/// [`ObserverPtr`]s. Whenever the owned value stops being valid, through
/// [`destroy`](Self::destroy), [`replace`](Self::replace),
/// [`release`](Self::release) or drop, every observer of that value reads
/// as absent.
///
/// Moving the owner does not invalidate anything: observers follow the value.
///
/// # Examples
///
/// ```
/// use vg_ptr::OwningPtr;
///
/// let mut owner = OwningPtr::new(30);
/// let observer = owner.create_observer();
/// assert_eq!(*observer.get().unwrap(), 30);
///
/// owner.replace(Box::new(4));
///
/// assert_eq!(owner.get(), Some(&4));
/// assert!(!observer.is_alive());
/// ```
pub struct OwningPtr<T> {
    // Not a `Box<T>`: observers alias the allocation.
    value: Option<NonNull<T>>,
    liveness: OnceCell<Rc<LivenessCell>>,
    _marker: PhantomData<T>,
}

#[inline]
fn into_non_null<T>(value: Box<T>) -> NonNull<T> {
    // SAFETY: `Box::into_raw` never returns null.
    unsafe { NonNull::new_unchecked(Box::into_raw(value)) }
}

impl<T> OwningPtr<T> {
    /// Creates an owner that holds nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use vg_ptr::OwningPtr;
    ///
    /// let owner = OwningPtr::<u8>::empty();
    /// assert!(owner.is_none());
    /// assert!(owner.as_ptr().is_null());
    /// ```
    #[inline]
    pub const fn empty() -> Self {
        Self {
            value: None,
            liveness: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    /// Moves `value` to the heap and owns it.
    #[inline]
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }

    /// Takes ownership of a boxed value.
    #[inline]
    pub fn from_box(value: Box<T>) -> Self {
        Self {
            value: Some(into_non_null(value)),
            liveness: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    /// Takes ownership of a raw pointer. A null pointer gives an empty owner.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from [`Box::<T>::into_raw`] and must not be
    /// freed or used mutably elsewhere.
    #[inline]
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self {
            value: NonNull::new(ptr),
            liveness: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    /// Returns `true` if the owner holds a value.
    #[inline]
    pub const fn is_some(&self) -> bool {
        self.value.is_some()
    }

    /// Returns `true` if the owner holds nothing.
    #[inline]
    pub const fn is_none(&self) -> bool {
        self.value.is_none()
    }

    /// Returns the address of the owned value, or null if empty.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        match self.value {
            Some(ptr) => ptr.as_ptr().cast_const(),
            None => ptr::null(),
        }
    }

    /// Returns a reference to the owned value.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: the value is owned by `self`; observers only read it.
        self.value.map(|ptr| unsafe { ptr.as_ref() })
    }

    /// Like [`get`](Self::get), but reports an empty owner as an error.
    #[inline]
    pub fn try_get(&self) -> Result<&T, AccessError> {
        self.get().ok_or(AccessError::InvalidDereference)
    }

    /// Returns exclusive access to the owned value.
    ///
    /// While the returned guard lives, reads through observers fail.
    ///
    /// # Panics
    ///
    /// Panics if the value is currently read through an observer. Use
    /// [`try_get_mut`](Self::try_get_mut) for a non-panicking variant.
    #[track_caller]
    pub fn get_mut(&mut self) -> Option<OwningRefMut<'_, T>> {
        match self.try_get_mut() {
            Ok(guard) => Some(guard),
            Err(AccessError::InvalidDereference) => None,
            Err(err) => panic!("OwningPtr<{}>::get_mut: {err}", type_name::<T>()),
        }
    }

    /// Returns exclusive access to the owned value.
    ///
    /// # Errors
    ///
    /// - [`AccessError::InvalidDereference`] if the owner is empty.
    /// - [`AccessError::Borrowed`] if an observer currently reads the value.
    pub fn try_get_mut(&mut self) -> Result<OwningRefMut<'_, T>, AccessError> {
        let value = self.value.ok_or(AccessError::InvalidDereference)?;
        let liveness = self.liveness.get().map(|cell| &**cell);

        if liveness.is_some_and(|cell| !cell.try_borrow_mut()) {
            return Err(AccessError::Borrowed);
        }

        // SAFETY: `self` is mutably borrowed for the guard's lifetime and the
        // exclusive borrow is registered on the tracked cell.
        Ok(unsafe { OwningRefMut::new(value, liveness) })
    }

    /// Replaces the owned value, dropping the previous one.
    ///
    /// Passing `None` does nothing: the current value and its observers are
    /// kept. Otherwise observers of the previous value are invalidated.
    ///
    /// # Examples
    ///
    /// ```
    /// use vg_ptr::OwningPtr;
    ///
    /// let mut owner = OwningPtr::new(1);
    /// let observer = owner.create_observer();
    ///
    /// owner.replace(None);
    /// assert_eq!(*observer.get().unwrap(), 1);
    ///
    /// owner.replace(Box::new(2));
    /// assert!(observer.get().is_none());
    /// assert_eq!(owner.get(), Some(&2));
    /// ```
    pub fn replace(&mut self, value: impl Into<Option<Box<T>>>) {
        let Some(value) = value.into() else {
            log::trace!(
                "OwningPtr<{}>::replace without a value, keeping the current one",
                type_name::<T>()
            );
            return;
        };
        self.destroy();
        self.value = Some(into_non_null(value));
    }

    /// Stops owning the value and hands it to the caller without dropping it.
    ///
    /// Observers of the value are invalidated.
    ///
    /// # Panics
    ///
    /// Panics if the value is currently read through an observer. Use
    /// [`try_release`](Self::try_release) for a non-panicking variant.
    #[track_caller]
    pub fn release(&mut self) -> Option<Box<T>> {
        match self.try_release() {
            Ok(value) => value,
            Err(err) => panic!("OwningPtr<{}>::release: {err}", type_name::<T>()),
        }
    }

    /// Stops owning the value and hands it to the caller without dropping it.
    ///
    /// # Errors
    ///
    /// [`AccessError::Borrowed`] if an observer currently reads the value.
    /// Nothing is invalidated in that case.
    pub fn try_release(&mut self) -> Result<Option<Box<T>>, AccessError> {
        if self.liveness.get().is_some_and(|cell| cell.is_borrowed()) {
            return Err(AccessError::Borrowed);
        }
        self.invalidate();

        // SAFETY: the value came from `Box::into_raw` and nothing reads it.
        Ok(self.value.take().map(|ptr| unsafe { Box::from_raw(ptr.as_ptr()) }))
    }

    /// Drops the owned value and invalidates its observers.
    ///
    /// If observers currently read the value, it is dropped when the last
    /// read ends.
    pub fn destroy(&mut self) {
        let liveness = self.invalidate();
        let Some(value) = self.value.take() else {
            return;
        };

        match liveness {
            Some(cell) if cell.is_reading() => {
                log::debug!(
                    "OwningPtr<{}> dropped while read through an observer, deferring the drop",
                    type_name::<T>()
                );
                // SAFETY: the value came from `Box::into_raw`, the cell is
                // only referenced by observers of `T` or of an upcast of `T`.
                cell.defer_drop(unsafe { Orphan::new(value) });
            }
            // SAFETY: the value came from `Box::into_raw` and nothing reads it.
            _ => drop(unsafe { Box::from_raw(value.as_ptr()) }),
        }
    }

    /// Creates a new observer batch for the owned value.
    ///
    /// All clones of the returned observer share one count. Every batch of
    /// the current value is invalidated together.
    ///
    /// Observers of an empty owner are alive but read nothing, until the
    /// owner gets a value and invalidates them.
    #[inline]
    pub fn create_observer(&self) -> ObserverPtr<T> {
        self.create_derived_observer::<T>()
    }

    /// Creates a new observer batch that exposes the owned value as a `U`.
    ///
    /// `T` must implement [`Upcast<U>`](Upcast), so a wrong `U` is a compile
    /// error.
    ///
    /// ```compile_fail
    /// use vg_ptr::OwningPtr;
    ///
    /// let owner = OwningPtr::new(5_u32);
    /// let observer = owner.create_derived_observer::<str>();
    /// ```
    pub fn create_derived_observer<U: ?Sized>(&self) -> ObserverPtr<U>
    where
        T: Upcast<U>,
    {
        let liveness = self.liveness.get_or_init(LivenessCell::new);
        // SAFETY: `ptr` points to the live owned value.
        let value = self.value.map(|ptr| unsafe { <T as Upcast<U>>::upcast(ptr) });

        log::trace!(
            "OwningPtr<{}> creates an observer batch of {}",
            type_name::<T>(),
            type_name::<U>()
        );
        ObserverPtr::bind(Rc::clone(liveness), value)
    }

    /// Moves the value and its observers into a new owner, leaving `self`
    /// empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use vg_ptr::OwningPtr;
    ///
    /// let mut owner = OwningPtr::new(3);
    /// let observer = owner.create_observer();
    ///
    /// let moved = owner.take();
    ///
    /// assert!(owner.is_none());
    /// assert_eq!(moved.get(), Some(&3));
    /// assert_eq!(*observer.get().unwrap(), 3);
    /// ```
    #[inline]
    pub fn take(&mut self) -> Self {
        log::trace!("OwningPtr<{}>::take", type_name::<T>());
        mem::take(self)
    }

    /// Moves the value and its observers out of `source` into `self`.
    ///
    /// The previous value of `self` is dropped and its observers are
    /// invalidated. `source` is left empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use vg_ptr::OwningPtr;
    ///
    /// let mut a = OwningPtr::new(1);
    /// let mut b = OwningPtr::new(2);
    /// let of_a = a.create_observer();
    /// let of_b = b.create_observer();
    ///
    /// a.assign_from(&mut b);
    ///
    /// assert!(b.is_none());
    /// assert_eq!(a.get(), Some(&2));
    /// assert!(!of_a.is_alive());
    /// assert_eq!(*of_b.get().unwrap(), 2);
    /// ```
    pub fn assign_from(&mut self, source: &mut Self) {
        let incoming = source.take();
        *self = incoming;
    }

    /// Kills and forgets the tracked cell, if any.
    fn invalidate(&mut self) -> Option<Rc<LivenessCell>> {
        let liveness = self.liveness.take()?;
        log::trace!("OwningPtr<{}> invalidates its observers", type_name::<T>());
        liveness.kill();
        Some(liveness)
    }
}

impl<T> Drop for OwningPtr<T> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<T> Default for OwningPtr<T> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Box<T>> for OwningPtr<T> {
    #[inline]
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for OwningPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwningPtr")
            .field("value", &self.get())
            .field("observed", &self.liveness.get().is_some())
            .finish()
    }
}

impl<T> fmt::Pointer for OwningPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.as_ptr(), f)
    }
}

// -----------------------------------------------------------------------------
// Tests
