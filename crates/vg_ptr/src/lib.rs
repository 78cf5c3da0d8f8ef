//! Exclusive-ownership pointers with liveness-tracking observers.
//!
//! **OwningPtr**
//!
//! [`OwningPtr<T>`] owns a heap-allocated `T`, like a `Box<T>` that may also be
//! empty. It can hand out any number of observers, and it is the single point
//! of truth for whether the value they look at is still valid.
//!
//! **ObserverPtr**
//!
//! [`ObserverPtr<T>`] is a cloneable, non-owning view into an [`OwningPtr`].
//! It never keeps the value alive and never reads freed memory: once the owner
//! destroys, replaces or releases its value, every observer of that value
//! reads as absent.
//!
//! Observers follow the value, not the owner. Moving an [`OwningPtr`], either
//! with a plain Rust move or with [`take`](OwningPtr::take) and
//! [`assign_from`](OwningPtr::assign_from), keeps its observers working.
//!
//! **Upcast**
//!
//! [`OwningPtr::create_derived_observer`] exposes the value through another
//! type, usually a trait object. The relation is checked at compile time
//! through the [`Upcast`] trait.
//!
//! **Borrows**
//!
//! Owner and observers alias the same allocation, so accesses are checked at
//! runtime, like [`RefCell`](core::cell::RefCell): reads through observers
//! ([`ObserverRef`]) exclude mutation through the owner ([`OwningRefMut`]).
//!
//! # Examples
//!
//! ```
//! use vg_ptr::OwningPtr;
//!
//! let mut owner = OwningPtr::new(String::from("hello"));
//! let observer = owner.create_observer();
//! let copy = observer.clone();
//!
//! assert_eq!(copy.count(), 2);
//! assert_eq!(observer.get().as_deref().map(String::as_str), Some("hello"));
//!
//! owner.destroy();
//!
//! assert!(!observer.is_alive());
//! assert!(copy.get().is_none());
//! ```
#![expect(unsafe_code, reason = "Observers read the owned value through raw pointers.")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// Compilation config

/// Some macros used for compilation control.
pub mod cfg {
    vg_cfg::define_alias! {
        #[cfg(all(debug_assertions, feature = "debug"))] => debug,
    }
}

// -----------------------------------------------------------------------------
// no_std support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod borrow;
mod error;
mod liveness;
mod observer;
mod orphan;
mod owning;
mod upcast;

#[cfg(test)]
mod test_utils;

// -----------------------------------------------------------------------------
// Top-level exports

pub use borrow::{ObserverRef, OwningRefMut};
pub use error::AccessError;
pub use observer::ObserverPtr;
pub use owning::OwningPtr;
pub use upcast::Upcast;
