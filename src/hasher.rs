use std::cell::RefCell;

use crate::FilterError::{self, UnknownAlgorithm};

/// The string hash functions a [`Hasher`] can be configured with.
///
/// All of them walk the UTF-8 bytes of the input, treat every byte as a
/// signed `i8` and wrap on overflow.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Bernstein's djb2: `hash * 33 + byte`, seeded with `5381`.
    Djb2,
    /// sdbm: `byte + (hash << 6) + (hash << 16) - hash`.
    Sdbm,
    /// Fletcher-32 style checksum with both sums packed into one value.
    Fletcher,
    /// Always hashes to `0`.
    Zero,
}

impl Algorithm {
    /// Returns the numeric identifier of the `Algorithm`.
    pub fn id(self) -> u16 {
        match self {
            Algorithm::Djb2 => 0,
            Algorithm::Sdbm => 1,
            Algorithm::Fletcher => 2,
            Algorithm::Zero => 3,
        }
    }

    /// Hashes `target` without any caching.
    pub fn digest(self, target: &str) -> i64 {
        match self {
            Algorithm::Djb2 => djb2(target),
            Algorithm::Sdbm => sdbm(target),
            Algorithm::Fletcher => fletcher(target),
            Algorithm::Zero => 0,
        }
    }
}

impl TryFrom<u16> for Algorithm {
    type Error = FilterError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Algorithm::Djb2),
            1 => Ok(Algorithm::Sdbm),
            2 => Ok(Algorithm::Fletcher),
            3 => Ok(Algorithm::Zero),
            _ => Err(UnknownAlgorithm { id }),
        }
    }
}

#[derive(Clone, Debug)]
struct Memo {
    input: String,
    output: i64,
}

/// Hashes strings with a fixed [`Algorithm`] and remembers the last result.
///
/// The memo holds exactly one entry. Hashing the same string twice in a row
/// only computes it once. Hashing a different string replaces the entry.
#[derive(Clone, Debug)]
pub struct Hasher {
    algorithm: Algorithm,
    memo: RefCell<Option<Memo>>,
}

impl Hasher {
    /// Constructs a `Hasher` for the algorithm registered under `id`.
    ///
    /// Fails if no such algorithm exists.
    pub fn new(id: u16) -> Result<Self, FilterError> {
        Ok(Self::with_algorithm(Algorithm::try_from(id)?))
    }

    /// Constructs a `Hasher` for `algorithm`.
    pub fn with_algorithm(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            memo: RefCell::new(None),
        }
    }

    /// Returns the hash of `target`, reusing the memoized result on a repeat call.
    pub fn hash(&self, target: &str) -> i64 {
        let mut memo = self.memo.borrow_mut();
        if let Some(last) = memo.as_ref() {
            if last.input == target {
                return last.output;
            }
        }

        let output = self.algorithm.digest(target);
        *memo = Some(Memo {
            input: target.to_owned(),
            output,
        });

        output
    }

    /// Returns the `Algorithm` the `Hasher` uses.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

fn signed_bytes(target: &str) -> impl Iterator<Item = i64> + '_ {
    target.bytes().map(|b| b as i8 as i64)
}

fn djb2(target: &str) -> i64 {
    signed_bytes(target).fold(5381_i64, |hash, b| {
        hash.wrapping_shl(5).wrapping_add(hash).wrapping_add(b)
    })
}

fn sdbm(target: &str) -> i64 {
    signed_bytes(target).fold(0_i64, |hash, b| {
        b.wrapping_add(hash.wrapping_shl(6))
            .wrapping_add(hash.wrapping_shl(16))
            .wrapping_sub(hash)
    })
}

fn fletcher(target: &str) -> i64 {
    let (mut sum1, mut sum2) = (0xffff_i64, 0xffff_i64);
    for b in signed_bytes(target) {
        sum1 = sum1.wrapping_add(b);
        sum2 = sum2.wrapping_add(sum1);
    }

    // Two reductions bring both sums down to 16 bits
    for _ in 0..2 {
        sum1 = (sum1 & 0xffff) + (sum1 >> 16);
        sum2 = (sum2 & 0xffff) + (sum2 >> 16);
    }

    sum2.wrapping_shl(16) | sum1
}
