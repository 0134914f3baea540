//! An ordered map with unique keys, built on a red-black tree.
//!
//! [`Map`] keeps its entries sorted by a configurable [`Compare`]
//! implementation and supports `O(log n)` lookup, insertion and removal.
//! Alongside the usual `Option`-based API it exposes checked,
//! iterator-style [`Position`]s and a borrowing [`Cursor`], whose misuse is
//! reported through [`Error`] instead of undefined behavior.

pub mod compare;
pub mod cursor;
pub mod error;
pub mod iter;
pub mod map;
mod node;
pub mod rand;
mod redblack;

#[cfg(test)]
mod test_support;

pub use compare::{ByFn, Compare, Natural, Reversed};
pub use cursor::{Cursor, Position};
pub use error::{Error, Result};
pub use map::Map;
pub use redblack::Violation;
