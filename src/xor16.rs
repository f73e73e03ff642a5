//! Implements Xor16 filters as described in [Xor Filters: Faster and Smaller Than Bloom and Cuckoo Filters].
//!
//! [Xor Filters: Faster and Smaller Than Bloom and Cuckoo Filters]: https://arxiv.org/abs/1912.08258

use crate::{xor_contains_impl, BuildError, Builder, Filter};
use alloc::boxed::Box;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

/// Xor filter using 16-bit fingerprints.
///
/// An `Xor16` filter uses <20 bits per entry of the set it is constructed
/// from, and has a false positive rate of <0.002%. As with other
/// probabilistic filters, a higher number of entries decreases the bits per
/// entry but increases the false positive rate.
///
/// An `Xor16` is constructed from a set of distinct 64-bit unsigned integers
/// and is immutable. Construction fails with
/// [`TooManyIterations`](BuildError::TooManyIterations) if the keys contain a
/// duplicate.
///
/// ```
/// # extern crate alloc;
/// use xorwide::{Builder, Filter, Xor16};
/// # use alloc::vec::Vec;
/// # use rand::Rng;
///
/// # let mut rng = rand::thread_rng();
/// const SAMPLE_SIZE: usize = 1_000_000;
/// let keys: Vec<u64> = (0..SAMPLE_SIZE).map(|_| rng.gen()).collect();
/// let filter = Builder::new().populate16(&keys).unwrap();
///
/// // no false negatives
/// for key in keys {
///     assert!(filter.contains(&key));
/// }
/// ```
///
/// Serializing and deserializing `Xor16` filters can be enabled with the
/// [`serde`] feature (or [`bincode`] for bincode).
///
/// [`serde`]: http://serde.rs
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
#[derive(Debug, Clone)]
pub struct Xor16 {
    /// The seed for the filter
    pub seed: u64,
    /// The number of cells in each of the filter's three blocks
    pub block_length: u32,
    /// The fingerprints for the filter
    pub fingerprints: Box<[u16]>,
}

impl Filter<u64> for Xor16 {
    /// Returns `true` if the filter contains the specified key. Has a false positive rate of <0.002%.
    fn contains(&self, key: &u64) -> bool {
        xor_contains_impl!(*key, self, fingerprint u16)
    }

    fn len(&self) -> usize {
        self.fingerprints.len()
    }
}

impl TryFrom<&[u64]> for Xor16 {
    type Error = BuildError;

    fn try_from(keys: &[u64]) -> Result<Self, Self::Error> {
        Builder::new().populate16(keys)
    }
}

impl TryFrom<&Vec<u64>> for Xor16 {
    type Error = BuildError;

    fn try_from(v: &Vec<u64>) -> Result<Self, Self::Error> {
        Builder::new().populate16(v.as_slice())
    }
}

impl TryFrom<Vec<u64>> for Xor16 {
    type Error = BuildError;

    fn try_from(v: Vec<u64>) -> Result<Self, Self::Error> {
        Builder::new().populate16(v.as_slice())
    }
}

#[cfg(test)]
mod test {
    use crate::{Builder, Filter};

    use alloc::vec::Vec;
    use rand::Rng;

    #[test]
    fn test_initialization() {
        const SAMPLE_SIZE: usize = 1_000_000;
        let mut rng = rand::thread_rng();
        let keys: Vec<u64> = (0..SAMPLE_SIZE).map(|_| rng.gen()).collect();

        let filter = Builder::new().populate16(&keys).unwrap();

        for key in keys {
            assert!(filter.contains(&key));
        }
    }

    #[test]
    fn test_bits_per_entry() {
        const SAMPLE_SIZE: usize = 1_000_000;
        let mut rng = rand::thread_rng();
        let keys: Vec<u64> = (0..SAMPLE_SIZE).map(|_| rng.gen()).collect();

        let filter = Builder::new().populate16(&keys).unwrap();
        let bpe = (filter.len() as f64) * 16.0 / (SAMPLE_SIZE as f64);

        assert!(bpe < 20., "Bits per entry is {}", bpe);
    }

    #[test]
    fn test_false_positives() {
        const SAMPLE_SIZE: usize = 10_000;
        const TRIALS: usize = 10_000_000;
        let mut rng = rand::thread_rng();
        let keys: Vec<u64> = (0..SAMPLE_SIZE).map(|_| rng.gen()).collect();

        let filter = Builder::new().populate16(&keys).unwrap();

        let false_positives: usize = (0..TRIALS)
            .map(|_| rng.gen())
            .filter(|n| filter.contains(n))
            .count();
        let per_million: f64 = false_positives as f64 * 1_000_000. / TRIALS as f64;
        assert!(per_million < 20., "False positive rate is {} per million", per_million);
    }
}
