use alloc::boxed::Box;
use core::fmt;
use core::ptr::NonNull;

/// A type-erased boxed value whose drop has been deferred.
///
/// Dropping an `Orphan` drops and deallocates the value, with the concrete
/// type fixed when the orphan was created.
pub(crate) struct Orphan {
    ptr: NonNull<u8>,
    drop_fn: unsafe fn(NonNull<u8>),
}

impl Orphan {
    /// Takes over a value that was leaked from a `Box<T>`.
    ///
    /// # Safety
    /// - `ptr` must come from [`Box::<T>::into_raw`] and must not be freed elsewhere.
    /// - The orphan must be dropped before any lifetime inside `T` ends.
    pub(crate) unsafe fn new<T>(ptr: NonNull<T>) -> Self {
        unsafe fn drop_box<T>(ptr: NonNull<u8>) {
            // SAFETY: `ptr` was created from `Box<T>` in `Orphan::new::<T>`.
            drop(unsafe { Box::from_raw(ptr.cast::<T>().as_ptr()) });
        }

        Self {
            ptr: ptr.cast(),
            drop_fn: drop_box::<T>,
        }
    }
}

impl Drop for Orphan {
    fn drop(&mut self) {
        // SAFETY: `drop_fn` matches the erased type and runs exactly once.
        unsafe { (self.drop_fn)(self.ptr) }
    }
}

impl fmt::Debug for Orphan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Orphan({:p})", self.ptr)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::Orphan;
    use crate::test_utils::{DropSink, Foo};
    use alloc::boxed::Box;
    use core::ptr::NonNull;

    #[test]
    fn drops_exactly_once() {
        let sink = DropSink::new();
        let raw = Box::into_raw(Box::new(Foo::new(6, 7).tracked(&sink)));

        // SAFETY: `raw` comes from `Box::into_raw` and is not used again.
        let orphan = unsafe { Orphan::new(NonNull::new(raw).unwrap()) };
        assert_eq!(sink.last(), None);

        drop(orphan);
        assert_eq!(sink.last(), Some(42));
        assert_eq!(sink.drops(), 1);
    }
}
