//! Implements Xor32 filters as described in [Xor Filters: Faster and Smaller Than Bloom and Cuckoo Filters].
//!
//! [Xor Filters: Faster and Smaller Than Bloom and Cuckoo Filters]: https://arxiv.org/abs/1912.08258

use crate::{xor_contains_impl, BuildError, Builder, Filter};
use alloc::boxed::Box;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

/// Xor filter using 32-bit fingerprints.
///
/// An `Xor32` filter uses <40 bits per entry of the set it is constructed
/// from, and has a false positive rate of about `2^-32`. It suits key sets
/// that must essentially never report a stranger as a member, at four times
/// the memory of an [`Xor8`](crate::Xor8).
///
/// An `Xor32` is constructed from a set of distinct 64-bit unsigned integers
/// and is immutable. Construction fails with
/// [`TooManyIterations`](BuildError::TooManyIterations) if the keys contain a
/// duplicate.
///
/// Serializing and deserializing `Xor32` filters can be enabled with the
/// [`serde`] feature (or [`bincode`] for bincode).
///
/// [`serde`]: http://serde.rs
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
#[derive(Debug, Clone)]
pub struct Xor32 {
    /// The seed for the filter
    pub seed: u64,
    /// The number of cells in each of the filter's three blocks
    pub block_length: u32,
    /// The fingerprints for the filter
    pub fingerprints: Box<[u32]>,
}

impl Filter<u64> for Xor32 {
    /// Returns `true` if the filter contains the specified key. Has a false positive rate of about `2^-32`.
    fn contains(&self, key: &u64) -> bool {
        xor_contains_impl!(*key, self, fingerprint u32)
    }

    fn len(&self) -> usize {
        self.fingerprints.len()
    }
}

impl TryFrom<&[u64]> for Xor32 {
    type Error = BuildError;

    fn try_from(keys: &[u64]) -> Result<Self, Self::Error> {
        Builder::new().populate32(keys)
    }
}

impl TryFrom<&Vec<u64>> for Xor32 {
    type Error = BuildError;

    fn try_from(v: &Vec<u64>) -> Result<Self, Self::Error> {
        Builder::new().populate32(v.as_slice())
    }
}

impl TryFrom<Vec<u64>> for Xor32 {
    type Error = BuildError;

    fn try_from(v: Vec<u64>) -> Result<Self, Self::Error> {
        Builder::new().populate32(v.as_slice())
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

        let filter = Builder::new().populate32(&keys).unwrap();

        for key in keys {
            assert!(filter.contains(&key));
        }
    }

    #[test]
    fn test_false_positives_vanish() {
        const SAMPLE_SIZE: usize = 10_000;
        const TRIALS: usize = 1_000_000;
        let mut rng = rand::thread_rng();
        let keys: Vec<u64> = (0..SAMPLE_SIZE).map(|_| rng.gen()).collect();

        let filter = Builder::new().populate32(&keys).unwrap();

        // at 2^-32 per query, a million probes should essentially never hit
        let false_positives: usize = (0..TRIALS)
            .map(|_| rng.gen())
            .filter(|n| filter.contains(n))
            .count();
        assert!(false_positives <= 2, "{} false positives", false_positives);
    }
}
