//! # Tulle
//!
//! A counting Bloom filter for pairs of strings. It answers whether the
//! combination `(x, y)` of two correlated attributes has been recorded and
//! can claim that a given pair is
//!
//! * definitely not recorded, or
//! * might be recorded.
//!
//! Unlike a plain Bloom filter, every bucket holds a small counter instead
//! of a single bit, so pairs can be deleted again. The number of live pairs
//! is tracked exactly.
//!
//! ## Tulle in Action
//!
//! ```rust
//! use tulle::{IntersectionFilter, PairFilter};
//!
//! fn main() {
//!     // Up to 500 distinct `x` values and 300 distinct `y` values,
//!     // of which about a quarter of all combinations will be stored
//!     let mut filter =
//!         IntersectionFilter::new(500, 300, 25).expect("couldn't construct filter.");
//!
//!     filter.add("X-cnt1", "Y-cnt1").expect("bucket overflow");
//!     filter.add("X-cnt1", "Y-cnt2").expect("bucket overflow");
//!     filter.add("X-cnt2", "Y-cnt1").expect("bucket overflow");
//!     filter.add("X-cnt2", "Y-cnt2").expect("bucket overflow");
//!     assert_eq!(4, filter.count());
//!
//!     // Recorded pairs are never reported missing
//!     assert!(filter.exists("X-cnt1", "Y-cnt2"));
//!
//!     // Absent or empty values are rejected without an error
//!     assert!(!filter.add(None, "Y-cnt1").unwrap());
//!     assert!(!filter.exists("", "Y-cnt1"));
//!
//!     // Pairs can be removed again
//!     assert!(filter.delete("X-cnt1", "Y-cnt2"));
//!     assert_eq!(3, filter.count());
//!
//!     // Or everything at once
//!     filter.reset();
//!     assert_eq!(0, filter.count());
//!     assert!(!filter.exists("X-cnt2", "Y-cnt2"));
//!
//!     println!("Number of buckets: {}", filter.bucket_count());
//!     println!("Number of hash functions used: {}", filter.hash_fn_count());
//!     println!("Estimated error rate: {}", filter.error_rate());
//! }
//! ```
//!
//! ## Caveats
//!
//! * Pairs are joined with [`KEY_SEPARATOR`] before hashing and the
//!   separator is not escaped, so `("a+b", "c")` and `("a", "b+c")` are the
//!   same entry.
//! * A [`FilterError::BucketOverflow`] from [`PairFilter::add`] leaves the
//!   buckets incremented before the overflowing one in place.
//! * Filters are not `Sync`. Wrap them in a lock to share them between
//!   threads.

use thiserror::Error;

/// An error returned by constructing or mutating a filter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A method is called with invalid parameters.
    #[error("invalid parameters (expected {expected:?}, found: {found:?})")]
    InvalidParameter {
        /// Expected parameter
        expected: &'static str,
        /// Provided parameter
        found: String,
    },
    /// No hash algorithm is registered under `id`.
    #[error("unknown hash algorithm: {id}")]
    UnknownAlgorithm {
        /// Requested algorithm identifier
        id: u16,
    },
    /// Incrementing a bucket exceeded its counter width.
    #[error("bucket overflow: bucket #{bucket}")]
    BucketOverflow {
        /// Index of the saturated bucket
        bucket: usize,
    },
}

impl FilterError {
    /// Whether the error stems from how the filter was configured rather
    /// than from the entries stored in it.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, FilterError::BucketOverflow { .. })
    }
}

/// Approximate membership over pairs of strings.
///
/// Values are passed as anything convertible into `Option<&str>`, so both
/// `"x"` and `None` are accepted. A pair is only valid if both values are
/// present and non-empty. Invalid pairs make every operation return `false`
/// without touching the filter.
pub trait PairFilter {
    /// Records the pair `(x, y)`.
    ///
    /// Returns `Ok(false)` for an invalid pair.
    fn add<'a>(
        &mut self,
        x: impl Into<Option<&'a str>>,
        y: impl Into<Option<&'a str>>,
    ) -> Result<bool, FilterError>;

    /// Removes one occurrence of the pair `(x, y)`.
    ///
    /// Returns `false` for an invalid pair or a pair that isn't recorded.
    fn delete<'a>(&mut self, x: impl Into<Option<&'a str>>, y: impl Into<Option<&'a str>>)
        -> bool;

    /// *Indicates* whether the pair `(x, y)` is recorded.
    fn exists<'a>(&self, x: impl Into<Option<&'a str>>, y: impl Into<Option<&'a str>>) -> bool;

    /// Returns the exact number of live pairs.
    fn count(&self) -> usize;

    /// Empties the filter.
    fn reset(&mut self) -> bool;
}

/// Character joining the two values of a pair into the hashed key.
pub const KEY_SEPARATOR: char = '+';

pub mod hasher;
pub mod intersection;

pub use hasher::{Algorithm, Hasher};
pub use intersection::IntersectionFilter;
