use thiserror::Error;

/// Errors raised by [`Map`](crate::Map) and its positions.
///
/// Every fallible operation checks its inputs before touching the tree, so
/// the map is left unchanged whenever one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A position was past-the-end, stepped out of range, belonged to
    /// another map, or referred to an element that has since been erased.
    #[error("invalid iterator")]
    InvalidIterator,

    /// Bounds-checked access on a key that is not present.
    #[error("index out of bounds")]
    OutOfBounds,
}

pub type Result<T> = std::result::Result<T, Error>;
