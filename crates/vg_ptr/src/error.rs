use thiserror::Error;

// -----------------------------------------------------------------------------
// Error

/// Failure to access the value behind an [`OwningPtr`](crate::OwningPtr)
/// or an [`ObserverPtr`](crate::ObserverPtr).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccessError {
    /// The handle does not point to a live value.
    ///
    /// The owner is empty, or the observer is unbound or outlived the value
    /// it was created for.
    #[error("handle does not point to a live value")]
    InvalidDereference,

    /// The value is already borrowed in a conflicting way.
    #[error("value is already borrowed")]
    Borrowed,
}
