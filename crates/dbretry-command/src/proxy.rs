//! Access to the object behind a decorator.

/// A decorator that exposes the object it wraps.
///
/// Accessing the wrapped object performs no retry logic and touches no
/// execution member.
pub trait Proxy {
    /// The wrapped type.
    type Underlying;

    /// Borrow the wrapped object.
    fn underlying(&self) -> &Self::Underlying;

    /// Mutably borrow the wrapped object.
    fn underlying_mut(&mut self) -> &mut Self::Underlying;

    /// Unwrap the decorator.
    fn into_underlying(self) -> Self::Underlying;
}
