use tracing::{debug, trace, warn};

use crate::hasher::Hasher;
use crate::FilterError::{self, BucketOverflow, InvalidParameter};
use crate::{PairFilter, KEY_SEPARATOR};

/// Number of hash functions used unless configured otherwise.
pub const DEFAULT_HASH_FN_COUNT: usize = 3;
/// Headroom applied to the expected number of pairs to absorb collisions,
/// as `pairs + pairs / FUDGE_DIVISOR` (1.5 times, floored).
pub const FUDGE_DIVISOR: usize = 2;

/// A counting Bloom filter over pairs of strings.
///
/// Every bucket is an 8-bit counter. Adding a pair increments one bucket per
/// hash function, deleting it decrements them again. A pair exists if none
/// of its buckets is empty.
///
/// It never returns false negatives for pairs that were added and not
/// deleted, but may return false positives.
#[derive(Clone, Debug)]
pub struct IntersectionFilter {
    buckets: Box<[u8]>,
    hashers: Vec<Hasher>,
    entry_count: usize,
    capacity: usize,
}

impl PairFilter for IntersectionFilter {
    /// Records the pair `(x, y)` in the `IntersectionFilter`.
    ///
    /// Buckets are incremented one hash function at a time. If a bucket
    /// overflows, the buckets incremented before it in the same call are
    /// **not** rolled back and the pair is not counted.
    fn add<'a>(
        &mut self,
        x: impl Into<Option<&'a str>>,
        y: impl Into<Option<&'a str>>,
    ) -> Result<bool, FilterError> {
        let Some(key) = composite_key(x.into(), y.into()) else {
            return Ok(false);
        };

        for slot in 0..self.hashers.len() {
            let idx = self.bucket_index(slot, &key);
            match self.buckets[idx].checked_add(1) {
                Some(value) => self.buckets[idx] = value,
                None => {
                    warn!(bucket = idx, slot, "bucket overflow");
                    return Err(BucketOverflow { bucket: idx });
                }
            }
        }

        self.entry_count += 1;
        Ok(true)
    }

    /// Removes one occurrence of the pair `(x, y)`.
    ///
    /// A pair colliding with other live pairs may pass the existence check
    /// even though it was never added. Deleting it then takes away counts
    /// that belong to those pairs.
    fn delete<'a>(
        &mut self,
        x: impl Into<Option<&'a str>>,
        y: impl Into<Option<&'a str>>,
    ) -> bool {
        let (x, y): (Option<&str>, Option<&str>) = (x.into(), y.into());
        let Some(key) = composite_key(x, y) else {
            return false;
        };
        if !self.exists(x, y) {
            trace!(key = %key, "delete of missing pair");
            return false;
        }

        for slot in 0..self.hashers.len() {
            let idx = self.bucket_index(slot, &key);
            self.buckets[idx] = self.buckets[idx].wrapping_sub(1);
        }

        self.entry_count = self.entry_count.saturating_sub(1);
        true
    }

    /// *Indicates* whether the pair `(x, y)` is in the `IntersectionFilter`.
    fn exists<'a>(&self, x: impl Into<Option<&'a str>>, y: impl Into<Option<&'a str>>) -> bool {
        let Some(key) = composite_key(x.into(), y.into()) else {
            return false;
        };

        for slot in 0..self.hashers.len() {
            let idx = self.bucket_index(slot, &key);
            if self.buckets[idx] < 1 {
                trace!(key = %key, slot, bucket = idx, "empty bucket");
                return false;
            }
        }

        true
    }

    /// Returns the number of pairs added and not deleted since the last reset.
    fn count(&self) -> usize {
        self.entry_count
    }

    /// Resets the `IntersectionFilter` to its empty state.
    fn reset(&mut self) -> bool {
        self.buckets.fill(0);
        self.entry_count = 0;
        debug!(buckets = self.buckets.len(), "filter reset");

        true
    }
}

impl IntersectionFilter {
    /// Constructs a new `IntersectionFilter` using [`DEFAULT_HASH_FN_COUNT`] hash functions.
    ///
    /// * `max_x`: Number of distinct values expected for `x`
    /// * `max_y`: Number of distinct values expected for `y`
    /// * `usage_percent`: Share of all `max_x * max_y` combinations expected to be stored
    ///
    /// Fails for invalid parameters or if they leave the filter without buckets.
    pub fn new(max_x: usize, max_y: usize, usage_percent: u8) -> Result<Self, FilterError> {
        Self::with_hash_fn_count(max_x, max_y, usage_percent, DEFAULT_HASH_FN_COUNT)
    }

    /// Constructs a new `IntersectionFilter` using `hash_fn_count` hash functions.
    ///
    /// Hash function `i` uses the [`Algorithm`](crate::Algorithm) with id `i`,
    /// so at most four are available.
    pub fn with_hash_fn_count(
        max_x: usize,
        max_y: usize,
        usage_percent: u8,
        hash_fn_count: usize,
    ) -> Result<Self, FilterError> {
        if max_x < 1 {
            return Err(InvalidParameter {
                expected: "1 <= max_x",
                found: max_x.to_string(),
            });
        }
        if max_y < 1 {
            return Err(InvalidParameter {
                expected: "1 <= max_y",
                found: max_y.to_string(),
            });
        }
        if usage_percent > 100 {
            return Err(InvalidParameter {
                expected: "0 <= usage percent <= 100",
                found: usage_percent.to_string(),
            });
        }
        if hash_fn_count < 1 {
            return Err(InvalidParameter {
                expected: "1 <= hash function count",
                found: hash_fn_count.to_string(),
            });
        }

        let capacity = expected_pairs(max_x, max_y, usage_percent)?;
        let bucket_count = with_headroom(capacity)?;
        if bucket_count < 1 {
            return Err(InvalidParameter {
                expected: "1 <= bucket count",
                found: bucket_count.to_string(),
            });
        }

        let hashers = (0..hash_fn_count)
            .map(|id| {
                let id = u16::try_from(id).unwrap_or(u16::MAX);
                Hasher::new(id)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let buckets = zeroed_buckets(bucket_count)?;

        debug!(
            max_x,
            max_y,
            usage_percent,
            capacity,
            bucket_count,
            hash_fn_count,
            "constructed intersection filter"
        );

        Ok(Self {
            buckets,
            hashers,
            entry_count: 0,
            capacity,
        })
    }

    /// Returns the number of counters that constitute the `IntersectionFilter`.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the number of hash functions the `IntersectionFilter` uses.
    pub fn hash_fn_count(&self) -> usize {
        self.hashers.len()
    }

    /// Returns the number of pairs the `IntersectionFilter` was sized for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the ratio of live pairs to [`capacity`](Self::capacity).
    pub fn load_factor(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.entry_count as f64 / self.capacity as f64
    }

    /// Returns the estimated false positive rate at the current number of pairs.
    pub fn error_rate(&self) -> f64 {
        false_positive_rate(
            self.bucket_count() as f64,
            self.entry_count as f64,
            self.hash_fn_count() as f64,
        )
    }

    /// Maps `key` to a bucket with the hash function in `slot`.
    fn bucket_index(&self, slot: usize, key: &str) -> usize {
        let hash = self.hashers[slot].hash(key);
        (hash % self.buckets.len() as i64).unsigned_abs() as usize
    }
}

/// Joins a valid pair into the key its buckets are derived from.
fn composite_key(x: Option<&str>, y: Option<&str>) -> Option<String> {
    if !validate_pair(x, y) {
        return None;
    }
    let (x, y) = (x?, y?);

    let mut key = String::with_capacity(x.len() + y.len() + KEY_SEPARATOR.len_utf8());
    key.push_str(x);
    key.push(KEY_SEPARATOR);
    key.push_str(y);
    Some(key)
}

/// A pair is valid if both values are present and non-empty.
fn validate_pair(x: Option<&str>, y: Option<&str>) -> bool {
    matches!((x, y), (Some(x), Some(y)) if !x.is_empty() && !y.is_empty())
}

/// Number of pairs expected at `usage_percent` of all combinations.
///
/// Integer arithmetic, truncating the percentage.
fn expected_pairs(max_x: usize, max_y: usize, usage_percent: u8) -> Result<usize, FilterError> {
    max_x
        .checked_mul(max_y)
        .and_then(|all| all.checked_mul(usize::from(usage_percent)))
        .map(|scaled| scaled / 100)
        .ok_or_else(|| InvalidParameter {
            expected: "max_x * max_y * usage percent <= usize::MAX",
            found: format!("{max_x} * {max_y} * {usage_percent}"),
        })
}

/// Number of buckets for `capacity` expected pairs.
fn with_headroom(capacity: usize) -> Result<usize, FilterError> {
    capacity
        .checked_add(capacity / FUDGE_DIVISOR)
        .ok_or_else(|| InvalidParameter {
            expected: "bucket count <= usize::MAX",
            found: format!("{capacity} + {capacity} / {FUDGE_DIVISOR}"),
        })
}

/// Allocates `bucket_count` empty counters, failing instead of aborting
/// when the memory isn't available.
fn zeroed_buckets(bucket_count: usize) -> Result<Box<[u8]>, FilterError> {
    let mut buckets = Vec::new();
    if let Err(err) = buckets.try_reserve_exact(bucket_count) {
        warn!(bucket_count, %err, "couldn't allocate buckets");
        return Err(InvalidParameter {
            expected: "allocatable bucket count",
            found: bucket_count.to_string(),
        });
    }
    buckets.resize(bucket_count, 0);

    Ok(buckets.into_boxed_slice())
}

/// Calculates the false positive rate of a counting Bloom filter.
///
/// * `buckets`: The number of counters that constitute the filter
/// * `entries`: The number of entries stored in the filter
/// * `hash_fns_count`: The number of hash functions the filter uses
fn false_positive_rate(buckets: f64, entries: f64, hash_fns_count: f64) -> f64 {
    (1.0 - (-hash_fns_count * entries / buckets).exp()).powf(hash_fns_count)
}
