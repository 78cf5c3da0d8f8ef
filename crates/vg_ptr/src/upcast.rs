use core::ptr::NonNull;

// -----------------------------------------------------------------------------
// Upcast

/// Views a value of `Self` as a `U`.
///
/// This is the relation required by
/// [`OwningPtr::create_derived_observer`](crate::OwningPtr::create_derived_observer):
/// an owner of `T` can hand out observers of `U` only if `T: Upcast<U>`.
/// Every type upcasts to itself; [`impl_upcast!`](crate::impl_upcast)
/// implements unsizing upcasts such as `Circle => dyn Shape`.
///
/// Observers can only view the value as a supertype or a trait it implements,
/// never downcast it to a more specific type.
///
/// # Safety
///
/// - The returned pointer must point into the same allocation as `ptr`, to a
///   value that is valid for exactly as long as `*ptr` is.
/// - `U` must not outlive any lifetime of `Self`.
///
/// # Examples
///
/// Projecting to an embedded "base" value:
///
/// ```
/// use core::ptr::NonNull;
/// use vg_ptr::{OwningPtr, Upcast};
///
/// struct Base { id: u32 }
/// struct Derived { base: Base, extra: u8 }
///
/// // SAFETY: `base` is a field of the pointee.
/// unsafe impl Upcast<Base> for Derived {
///     unsafe fn upcast(ptr: NonNull<Self>) -> NonNull<Base> {
///         // SAFETY: the caller passes a pointer to a live `Derived`.
///         unsafe { NonNull::new_unchecked(&raw mut (*ptr.as_ptr()).base) }
///     }
/// }
///
/// let owner = OwningPtr::new(Derived { base: Base { id: 9 }, extra: 1 });
/// let observer = owner.create_derived_observer::<Base>();
/// assert_eq!(observer.get().unwrap().id, 9);
/// ```
pub unsafe trait Upcast<U: ?Sized> {
    /// Converts a pointer to `Self` into a pointer to `U`.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live value of type `Self`.
    unsafe fn upcast(ptr: NonNull<Self>) -> NonNull<U>;
}

// SAFETY: identity.
unsafe impl<T: ?Sized> Upcast<T> for T {
    #[inline(always)]
    unsafe fn upcast(ptr: NonNull<Self>) -> NonNull<T> {
        ptr
    }
}

/// Implements [`Upcast`] through an unsizing coercion.
///
/// # Examples
///
/// ```
/// use vg_ptr::{impl_upcast, OwningPtr};
///
/// trait Shape {
///     fn area(&self) -> u32;
/// }
///
/// struct Square(u32);
///
/// impl Shape for Square {
///     fn area(&self) -> u32 {
///         self.0 * self.0
///     }
/// }
///
/// impl_upcast!(Square => dyn Shape);
///
/// let owner = OwningPtr::new(Square(3));
/// let observer = owner.create_derived_observer::<dyn Shape>();
/// assert_eq!(observer.get().unwrap().area(), 9);
/// ```
#[macro_export]
macro_rules! impl_upcast {
    ($($ty:ty => $target:ty),+ $(,)?) => {
        $(
            // SAFETY: an unsizing coercion keeps the address and the allocation.
            unsafe impl $crate::Upcast<$target> for $ty {
                #[inline(always)]
                unsafe fn upcast(
                    ptr: ::core::ptr::NonNull<Self>,
                ) -> ::core::ptr::NonNull<$target> {
                    ptr
                }
            }
        )+
    };
}

// -----------------------------------------------------------------------------
// Tests
