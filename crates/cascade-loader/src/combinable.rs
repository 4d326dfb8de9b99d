//! Monoid capability for values that chain into one

/// A type with an associative `combine` and an identity element.
///
/// `identity().combine(x)` and `x.combine(&identity())` must both behave like
/// `x`, and `a.combine(&b).combine(&c)` like `a.combine(&b.combine(&c))`.
pub trait Combinable: Sized {
    fn identity() -> Self;

    fn combine(&self, other: &Self) -> Self;

    /// Fold `items` left to right, starting from the identity
    fn combine_all<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        items
            .into_iter()
            .fold(Self::identity(), |acc, next| acc.combine(&next))
    }
}
