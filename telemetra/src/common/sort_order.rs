/// Specifies the direction in which records are ordered.
///
/// # Purpose
/// Defines whether a query orders records in ascending (low to high) or
/// descending (high to low) order. Used by [`crate::cursor::OrderBy`] to pick
/// the comparison operators of a keyset resume predicate.
///
/// # Variants
/// - `Ascending`: smallest to largest value (A to Z, 0 to 9, oldest to newest)
/// - `Descending`: largest to smallest value (Z to A, 9 to 0, newest to oldest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Sort in ascending order
    Ascending,
    /// Sort in descending order
    Descending,
}

impl SortOrder {
    /// Applies this direction to an ascending ordering.
    #[inline]
    pub fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}
