//! Implements Xor8 filters as described in [Xor Filters: Faster and Smaller Than Bloom and Cuckoo Filters].
//!
//! [Xor Filters: Faster and Smaller Than Bloom and Cuckoo Filters]: https://arxiv.org/abs/1912.08258

use crate::{xor_contains_impl, BuildError, Builder, Filter};
use alloc::boxed::Box;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

/// Xor filter using 8-bit fingerprints.
///
/// An `Xor8` filter uses <10 bits per entry of the set it is constructed
/// from, and has a false positive rate of <0.4%. As with other probabilistic
/// filters, a higher number of entries decreases the bits per entry but
/// increases the false positive rate.
///
/// An `Xor8` is constructed from a set of distinct 64-bit unsigned integers
/// and is immutable. Construction fails with
/// [`TooManyIterations`](BuildError::TooManyIterations) if the keys contain a
/// duplicate.
///
/// ```
/// # extern crate alloc;
/// use xorwide::{Builder, Filter, Xor8};
/// # use alloc::vec::Vec;
/// # use rand::Rng;
///
/// # let mut rng = rand::thread_rng();
/// const SAMPLE_SIZE: usize = 1_000_000;
/// let keys: Vec<u64> = (0..SAMPLE_SIZE).map(|_| rng.gen()).collect();
/// let filter = Builder::new().populate(&keys).unwrap();
///
/// // no false negatives
/// for key in keys {
///     assert!(filter.contains(&key));
/// }
///
/// // bits per entry
/// let bpe = (filter.len() as f64) * 8.0 / (SAMPLE_SIZE as f64);
/// assert!(bpe < 10., "Bits per entry is {}", bpe);
/// ```
///
/// Serializing and deserializing `Xor8` filters can be enabled with the
/// [`serde`] feature (or [`bincode`] for bincode).
///
/// [`serde`]: http://serde.rs
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
#[derive(Debug, Clone)]
pub struct Xor8 {
    /// The seed for the filter
    pub seed: u64,
    /// The number of cells in each of the filter's three blocks
    pub block_length: u32,
    /// The fingerprints for the filter
    #[cfg_attr(feature = "serde", serde(with = "serde_bytes"))]
    pub fingerprints: Box<[u8]>,
}

impl Filter<u64> for Xor8 {
    /// Returns `true` if the filter contains the specified key. Has a false positive rate of <0.4%.
    fn contains(&self, key: &u64) -> bool {
        xor_contains_impl!(*key, self, fingerprint u8)
    }

    fn len(&self) -> usize {
        self.fingerprints.len()
    }
}

impl TryFrom<&[u64]> for Xor8 {
    type Error = BuildError;

    fn try_from(keys: &[u64]) -> Result<Self, Self::Error> {
        Builder::new().populate(keys)
    }
}

impl TryFrom<&Vec<u64>> for Xor8 {
    type Error = BuildError;

    fn try_from(v: &Vec<u64>) -> Result<Self, Self::Error> {
        Builder::new().populate(v.as_slice())
    }
}

impl TryFrom<Vec<u64>> for Xor8 {
    type Error = BuildError;

    fn try_from(v: Vec<u64>) -> Result<Self, Self::Error> {
        Builder::new().populate(v.as_slice())
    }
}
