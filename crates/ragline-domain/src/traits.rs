//! Shared trait seams

/// Classification of infrastructure errors for retry loops
///
/// Implemented by every adapter error type so that the stage owning a
/// retry loop can decide whether another attempt makes sense without
/// matching on foreign error variants.
pub trait Retryable {
    /// Whether the failure may succeed if the call is repeated
    fn is_transient(&self) -> bool;
}

impl<T: Retryable + ?Sized> Retryable for &T {
    fn is_transient(&self) -> bool {
        (**self).is_transient()
    }
}
