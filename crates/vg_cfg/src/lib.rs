//! Macros for compile-time configuration.
//!
//! Instead of sprinkling `#[cfg(...)]` attributes over every statement, a
//! crate defines short aliases once and then wraps the gated code in them:
//!
//! ```
//! mod cfg {
//!     vg_cfg::define_alias! {
//!         #[cfg(debug_assertions)] => debug,
//!         #[cfg(any())] => never,
//!     }
//! }
//!
//! let mut hits = 0;
//! cfg::never! { hits += 100; }
//! cfg::debug! { hits += 1; }
//!
//! assert_eq!(hits, if cfg::debug!() { 1 } else { 0 });
//! assert!(!cfg::never!());
//! ```
#![no_std]

/// Passes the provided code through unchanged.
///
/// - `enabled!()` expands to `true`.
/// - `enabled!(if { .. } else { .. })` expands to the first branch.
/// - `enabled! { .. }` expands to its contents.
#[doc(hidden)]
#[macro_export]
macro_rules! enabled {
    () => { true };
    (if { $($p:tt)* } else { $($n:tt)* }) => { $($p)* };
    ($($p:tt)*) => { $($p)* };
}

/// Discards the provided code.
///
/// - `disabled!()` expands to `false`.
/// - `disabled!(if { .. } else { .. })` expands to the second branch.
/// - `disabled! { .. }` expands to nothing.
#[doc(hidden)]
#[macro_export]
macro_rules! disabled {
    () => { false };
    (if { $($p:tt)* } else { $($n:tt)* }) => { $($n)* };
    ($($p:tt)*) => {};
}

/// Defines one alias macro per `cfg` predicate.
///
/// Each alias is [`enabled!`] when its predicate holds and [`disabled!`]
/// otherwise.
///
/// ```
/// vg_cfg::define_alias! {
///     #[cfg(all())] => always,
/// }
///
/// assert!(always!());
/// let branch = always!(if { "taken" } else { "skipped" });
/// assert_eq!(branch, "taken");
/// ```
#[macro_export]
macro_rules! define_alias {
    ($(#[cfg($meta:meta)] => $name:ident),+ $(,)?) => {
        $(
            #[cfg($meta)]
            #[doc(inline)]
            #[doc = concat!(
                "Passes the code through because `#[cfg(",
                stringify!($meta),
                ")]` is active."
            )]
            #[allow(unused_imports)]
            pub use $crate::enabled as $name;

            #[cfg(not($meta))]
            #[doc(inline)]
            #[doc = concat!(
                "Discards the code because `#[cfg(",
                stringify!($meta),
                ")]` is not active."
            )]
            #[allow(unused_imports)]
            pub use $crate::disabled as $name;
        )+
    };
}
