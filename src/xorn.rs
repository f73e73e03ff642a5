//! Implements narrow xor filters with a runtime-chosen fingerprint width.

use crate::prelude::{fingerprint, h0, h1, h2, mix};
use crate::Filter;
use alloc::boxed::Box;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

/// Xor filter over 64-bit keys with a fingerprint width chosen at build time.
///
/// Where [`Xor8`](crate::Xor8) and friends fix the width at a machine word,
/// an `XorN` trades false-positive rate against space one bit at a time: the
/// rate is roughly `2^-bits` for widths of 9 and up. Fingerprints are stored
/// in 32-bit cells; only the low `bits` of each cell are semantic, which is
/// also the form a serializer should pack.
///
/// Built by [`Builder::populate_n`](crate::Builder::populate_n); immutable
/// afterwards.
///
/// ```
/// # extern crate alloc;
/// use xorwide::{Builder, Filter};
/// # use alloc::vec::Vec;
/// # use rand::Rng;
///
/// # let mut rng = rand::thread_rng();
/// let keys: Vec<u64> = (0..10_000).map(|_| rng.gen()).collect();
/// let filter = Builder::new().populate_n(&keys, 12).unwrap();
///
/// for key in keys {
///     assert!(filter.contains(&key));
/// }
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
#[derive(Debug, Clone)]
pub struct XorN {
    /// The seed for the filter
    pub seed: u64,
    /// The number of cells in each of the filter's three blocks
    pub block_length: u32,
    /// Fingerprint width in bits, in `1..=32`
    pub bits: u32,
    /// The fingerprints; only the low `bits` of each entry are semantic
    pub fingerprints: Box<[u32]>,
}

impl XorN {
    /// Mask selecting the semantic low bits of a fingerprint cell.
    pub(crate) fn mask(&self) -> u32 {
        0xffff_ffff >> (32 - self.bits)
    }
}

impl Filter<u64> for XorN {
    /// Returns `true` if the filter contains the specified key. Has a false
    /// positive rate of roughly `2^-bits`.
    fn contains(&self, key: &u64) -> bool {
        let hash = mix(*key, self.seed);
        let fp = fingerprint(hash) & self.mask();
        let bl = self.block_length;

        fp == self.fingerprints[h0(hash, bl) as usize]
            ^ self.fingerprints[(h1(hash, bl) + bl) as usize]
            ^ self.fingerprints[(h2(hash, bl) + 2 * bl) as usize]
    }

    fn len(&self) -> usize {
        self.fingerprints.len()
    }
}

#[cfg(test)]
mod test {
    use crate::{BuildError, Builder, Filter, SplitMix64, XorN};

    use alloc::boxed::Box;
    use alloc::vec::Vec;

    fn empty_with_bits(bits: u32) -> XorN {
        XorN {
            seed: 0,
            block_length: 1,
            bits,
            fingerprints: Box::new([0, 0, 0]),
        }
    }

    #[test]
    fn test_mask() {
        assert_eq!(empty_with_bits(8).mask(), 0xff);
        assert_eq!(empty_with_bits(9).mask(), 0x1ff);
        assert_eq!(empty_with_bits(12).mask(), 0xfff);
        assert_eq!(empty_with_bits(16).mask(), 0xffff);
        assert_eq!(empty_with_bits(24).mask(), 0xff_ffff);
        assert_eq!(empty_with_bits(32).mask(), 0xffff_ffff);
    }

    #[test]
    fn test_every_width_contains_all() {
        let mut rng = SplitMix64::new(17);
        let keys: Vec<u64> = (0..1_000).map(|_| rng.next_u64()).collect();
        let mut builder = Builder::new();
        for bits in 1..=32 {
            let filter = builder.populate_n(&keys, bits).unwrap();
            for key in &keys {
                assert!(filter.contains(key), "width {} lost a key", bits);
            }
            for cell in filter.fingerprints.iter() {
                assert_eq!(cell & !filter.mask(), 0, "width {} wrote above the mask", bits);
            }
        }
    }

    #[test]
    fn test_false_positive_rate_tracks_width() {
        const SAMPLE_SIZE: usize = 10_000;
        const TRIALS: usize = 1_000_000;
        let mut rng = SplitMix64::new(23);
        let keys: Vec<u64> = (0..SAMPLE_SIZE).map(|_| rng.next_u64()).collect();

        let filter = Builder::new().populate_n(&keys, 12).unwrap();

        let false_positives = (0..TRIALS)
            .filter(|_| filter.contains(&rng.next_u64()))
            .count();
        // expect about 2^-12 = 244 per million
        assert!(false_positives < 1_000, "{} false positives", false_positives);
    }

    #[test]
    fn test_rejects_out_of_range_widths() {
        let keys = [1_u64, 2, 3];
        let mut builder = Builder::new();
        assert_eq!(
            builder.populate_n(&keys, 0).unwrap_err(),
            BuildError::InvalidBits { bits: 0 }
        );
        assert_eq!(
            builder.populate_n(&keys, 33).unwrap_err(),
            BuildError::InvalidBits { bits: 33 }
        );
    }
}
