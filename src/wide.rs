//! Implements xor filters over byte-string keys in a 256-bit hash domain.
//!
//! Keys of up to 32 bytes are interpreted as big-endian 256-bit integers and
//! every piece of hash arithmetic - seeding, avalanche mixing, lane rotation,
//! fingerprint folding - runs modulo `2^256`. That keeps the three bucket
//! indices and the fingerprint independent even for key sets whose entropy
//! lives in the high bytes, where a 64-bit truncation would collide.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use primitive_types::U256;

use crate::builder::MAX_ITERATIONS;
use crate::entropy::{default_source, EntropySource};
use crate::murmur3;
use crate::prelude::{capacity, reduce};
use crate::{BuildError, Filter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The key domain in bytes; longer keys are rejected rather than aliased
/// modulo `2^256`.
pub const MAX_KEY_BYTES: usize = 32;

/// The fingerprint folds the top half of the 256-bit domain onto the bottom.
const FP_SHIFT: usize = 128;

/// The hash of a key and the fingerprint cell it was peeled from.
#[derive(Default, Copy, Clone)]
struct KeyIndex {
    hash: U256,
    index: u32,
}

/// A construction bucket in the 256-bit domain.
#[derive(Default, Copy, Clone)]
struct XorSet {
    mask: U256,
    count: u32,
}

fn mix(key: U256, seed: U256) -> U256 {
    murmur3::mix256(key.overflowing_add(seed).0)
}

/// Low 32 bits of the half-domain fold.
fn fp32(hash: U256) -> u32 {
    (hash ^ (hash >> FP_SHIFT)).low_u32()
}

/// Rotation by one third of the domain width, as the narrow variant rotates
/// by 21 of 64 bits.
fn rotl85(x: U256) -> U256 {
    (x << 85usize) | (x >> 171usize)
}

/// Rotation by two thirds of the domain width.
fn rotl170(x: U256) -> U256 {
    (x << 170usize) | (x >> 86usize)
}

fn h0(hash: U256, block_length: u32) -> u32 {
    reduce(hash.low_u32(), block_length)
}

fn h1(hash: U256, block_length: u32) -> u32 {
    reduce(rotl85(hash).low_u32(), block_length)
}

fn h2(hash: U256, block_length: u32) -> u32 {
    reduce(rotl170(hash).low_u32(), block_length)
}

fn key_to_uint(key: &[u8]) -> Result<U256, BuildError> {
    if key.len() > MAX_KEY_BYTES {
        return Err(BuildError::OversizedKey { len: key.len() });
    }
    // shorter keys zero-pad on the left
    Ok(U256::from_big_endian(key))
}

/// Xor filter over byte-string keys, with a fingerprint width chosen at
/// build time.
///
/// A `WideXorN` accepts keys of up to [`MAX_KEY_BYTES`] bytes and hashes them
/// in a 256-bit domain; fingerprint widths run from 9 to 32 bits with a false
/// positive rate of roughly `2^-bits`. Fingerprints are stored in 32-bit
/// cells; only the low `bits` of each cell are semantic.
///
/// Built by [`WideBuilder::populate_wide`]; immutable afterwards.
///
/// ```
/// # extern crate alloc;
/// use xorwide::{Filter, WideBuilder};
/// # use alloc::vec::Vec;
/// # use rand::Rng;
///
/// # let mut rng = rand::thread_rng();
/// let keys: Vec<[u8; 32]> = (0..10_000).map(|_| rng.gen()).collect();
/// let filter = WideBuilder::new().populate_wide(&keys, 12).unwrap();
///
/// for key in &keys {
///     assert!(filter.contains(&key[..]));
/// }
/// ```
///
/// Serializing and deserializing `WideXorN` filters can be enabled with the
/// [`serde`] feature.
///
/// [`serde`]: http://serde.rs
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct WideXorN {
    /// The seed for the filter
    pub seed: U256,
    /// The number of cells in each of the filter's three blocks
    pub block_length: u32,
    /// Fingerprint width in bits, in `9..=32`
    pub bits: u32,
    /// The fingerprints; only the low `bits` of each entry are semantic
    pub fingerprints: Box<[u32]>,
}

impl WideXorN {
    /// Mask selecting the semantic low bits of a fingerprint cell.
    fn mask(&self) -> u32 {
        0xffff_ffff >> (32 - self.bits)
    }
}

impl Filter<[u8]> for WideXorN {
    /// Returns `true` if the filter contains the specified key. Has a false
    /// positive rate of roughly `2^-bits`.
    ///
    /// Keys longer than [`MAX_KEY_BYTES`] can never have been inserted, so
    /// they report `false`.
    fn contains(&self, key: &[u8]) -> bool {
        if key.len() > MAX_KEY_BYTES {
            return false;
        }
        let hash = mix(U256::from_big_endian(key), self.seed);
        let fp = fp32(hash) & self.mask();
        let bl = self.block_length;

        fp == self.fingerprints[h0(hash, bl) as usize]
            ^ self.fingerprints[(h1(hash, bl) + bl) as usize]
            ^ self.fingerprints[(h2(hash, bl) + 2 * bl) as usize]
    }

    fn len(&self) -> usize {
        self.fingerprints.len()
    }
}

/// Builds [`WideXorN`] filters.
///
/// Owns the 256-bit construction arenas and the entropy source, mirroring
/// [`Builder`](crate::Builder) for the wide key domain. Byte keys are parsed
/// and length-checked once per build, then reused across seed retries.
pub struct WideBuilder {
    /// Parsed keys, valid for the duration of one build.
    keys: Vec<U256>,
    /// Holds `stack | q0 | q1 | q2`, carved out per build.
    keyindexes: Vec<KeyIndex>,
    /// Holds `sets0 | sets1 | sets2`, carved out per build.
    sets: Vec<XorSet>,
    rng: Box<dyn EntropySource>,
}

impl Default for WideBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WideBuilder {
    /// Creates a builder with the default entropy source.
    pub fn new() -> Self {
        Self::with_entropy(default_source())
    }

    /// Creates a builder drawing construction seeds from `rng`.
    ///
    /// Injecting a fixed-state [`SplitMix64`](crate::SplitMix64) makes
    /// construction fully deterministic.
    pub fn with_entropy(rng: impl EntropySource + 'static) -> Self {
        WideBuilder {
            keys: Vec::new(),
            keyindexes: Vec::new(),
            sets: Vec::new(),
            rng: Box::new(rng),
        }
    }

    /// Builds a [`WideXorN`] with `bits`-wide fingerprints, `9 <= bits <= 32`.
    ///
    /// The keys must be distinct byte strings of at most [`MAX_KEY_BYTES`]
    /// bytes. Note that distinctness is judged on the 256-bit value: `[1]`
    /// and `[0, 1]` are the same key once zero-padded.
    pub fn populate_wide<K>(&mut self, keys: &[K], bits: u32) -> Result<WideXorN, BuildError>
    where
        K: AsRef<[u8]>,
    {
        if !(9..=32).contains(&bits) {
            return Err(BuildError::InvalidBits { bits });
        }
        self.keys.clear();
        self.keys.reserve(keys.len());
        for key in keys {
            let parsed = key_to_uint(key.as_ref())?;
            self.keys.push(parsed);
        }

        let (cells, block_length) = capacity(keys.len());
        let seed = self.peel(block_length)?;

        let mut filter = WideXorN {
            seed,
            block_length,
            bits,
            fingerprints: vec![0u32; cells].into_boxed_slice(),
        };
        let mask = filter.mask();
        let bl = block_length;
        for ki in self.keyindexes[..keys.len()].iter().rev() {
            let hash = ki.hash;
            let fp = fp32(hash) & mask;
            let c0 = h0(hash, bl) as usize;
            let c1 = (h1(hash, bl) + bl) as usize;
            let c2 = (h2(hash, bl) + 2 * bl) as usize;
            let val = if ki.index < bl {
                fp ^ filter.fingerprints[c1] ^ filter.fingerprints[c2]
            } else if ki.index < 2 * bl {
                fp ^ filter.fingerprints[c0] ^ filter.fingerprints[c2]
            } else {
                fp ^ filter.fingerprints[c0] ^ filter.fingerprints[c1]
            };
            filter.fingerprints[ki.index as usize] = val;
        }
        Ok(filter)
    }

    /// Runs seed attempts until every key peels, returning the successful
    /// seed. On success the first `keys.len()` entries of the keyindex arena
    /// hold the peel order, oldest removal first.
    fn peel(&mut self, block_length: u32) -> Result<U256, BuildError> {
        let size = self.keys.len();
        let bl = block_length as usize;

        let ki_total = size + 3 * bl;
        if self.keyindexes.len() < ki_total {
            self.keyindexes.resize(ki_total, KeyIndex::default());
        }
        if self.sets.len() < 3 * bl {
            self.sets.clear();
            self.sets.resize(3 * bl, XorSet::default());
        } else {
            for set in &mut self.sets[..3 * bl] {
                *set = XorSet::default();
            }
        }

        let keys = &self.keys;
        let (stack, queue_space) = self.keyindexes[..ki_total].split_at_mut(size);
        let (q0, rest) = queue_space.split_at_mut(bl);
        let (q1, q2) = rest.split_at_mut(bl);
        let mut queues = [q0, q1, q2];
        let (sets0, rest) = self.sets[..3 * bl].split_at_mut(bl);
        let (sets1, sets2) = rest.split_at_mut(bl);
        let mut sets = [sets0, sets1, sets2];

        for _ in 0..MAX_ITERATIONS {
            let seed = {
                let mut buf = [0u8; MAX_KEY_BYTES];
                self.rng.fill(&mut buf);
                U256::from_big_endian(&buf)
            };

            for &key in keys.iter() {
                let hash = mix(key, seed);
                let cells = [
                    h0(hash, block_length) as usize,
                    h1(hash, block_length) as usize,
                    h2(hash, block_length) as usize,
                ];
                for side in 0..3 {
                    let set = &mut sets[side][cells[side]];
                    set.mask ^= hash;
                    set.count += 1;
                }
            }

            let mut q_sizes = [0usize; 3];
            for side in 0..3 {
                for idx in 0..bl {
                    if sets[side][idx].count == 1 {
                        queues[side][q_sizes[side]] = KeyIndex {
                            // with only one key left, the mask contains it wholly
                            hash: sets[side][idx].mask,
                            index: idx as u32,
                        };
                        q_sizes[side] += 1;
                    }
                }
            }

            let mut stack_size = 0;
            while q_sizes.iter().sum::<usize>() > 0 {
                macro_rules! drain(
                    (side $s:tt, others being $a:tt via $ha:ident, $b:tt via $hb:ident) => {
                        while q_sizes[$s] > 0 {
                            q_sizes[$s] -= 1;
                            let mut ki = queues[$s][q_sizes[$s]];
                            if sets[$s][ki.index as usize].count == 0 {
                                // stale: the bucket was emptied from another side
                                continue;
                            }

                            let hash = ki.hash;
                            ki.index += $s * block_length;
                            stack[stack_size] = ki;
                            stack_size += 1;

                            let idx = $ha(hash, block_length) as usize;
                            sets[$a][idx].mask ^= hash;
                            sets[$a][idx].count -= 1;
                            if sets[$a][idx].count == 1 {
                                queues[$a][q_sizes[$a]] = KeyIndex {
                                    hash: sets[$a][idx].mask,
                                    index: idx as u32,
                                };
                                q_sizes[$a] += 1;
                            }

                            let idx = $hb(hash, block_length) as usize;
                            sets[$b][idx].mask ^= hash;
                            sets[$b][idx].count -= 1;
                            if sets[$b][idx].count == 1 {
                                queues[$b][q_sizes[$b]] = KeyIndex {
                                    hash: sets[$b][idx].mask,
                                    index: idx as u32,
                                };
                                q_sizes[$b] += 1;
                            }
                        }
                    };
                );

                drain!(side 0, others being 1 via h1, 2 via h2);
                drain!(side 1, others being 0 via h0, 2 via h2);
                drain!(side 2, others being 0 via h0, 1 via h1);
            }

            if stack_size == size {
                return Ok(seed);
            }

            for side in &mut sets {
                for set in side.iter_mut() {
                    *set = XorSet::default();
                }
            }
        }
        Err(BuildError::TooManyIterations)
    }
}

#[cfg(test)]
mod test {
    use super::MAX_KEY_BYTES;
    use crate::{BuildError, Filter, SplitMix64, WideBuilder};

    use alloc::vec;
    use alloc::vec::Vec;
    use rand::Rng;

    fn random_keys(count: usize) -> Vec<[u8; 32]> {
        let mut rng = rand::thread_rng();
        (0..count).map(|_| rng.gen()).collect()
    }

    #[test]
    fn test_initialization() {
        let keys = random_keys(10_000);
        let filter = WideBuilder::new().populate_wide(&keys, 12).unwrap();
        for key in &keys {
            assert!(filter.contains(&key[..]));
        }
    }

    #[test]
    fn test_every_width_contains_all() {
        let keys = random_keys(1_000);
        let mut builder = WideBuilder::new();
        for bits in 9..=32 {
            let filter = builder.populate_wide(&keys, bits).unwrap();
            for key in &keys {
                assert!(filter.contains(&key[..]), "width {} lost a key", bits);
            }
        }
    }

    #[test]
    fn test_short_keys_zero_pad() {
        let keys: &[&[u8]] = &[b"a", b"ab", b"abc", b"\x00z", &[0xff; 32]];
        let filter = WideBuilder::new().populate_wide(keys, 16).unwrap();
        for key in keys {
            assert!(filter.contains(key));
        }
    }

    #[test]
    fn test_false_positives() {
        const TRIALS: usize = 1_000_000;
        let keys = random_keys(10_000);
        let filter = WideBuilder::new().populate_wide(&keys, 12).unwrap();

        let mut rng = rand::thread_rng();
        let false_positives = (0..TRIALS)
            .filter(|_| {
                let probe: [u8; 32] = rng.gen();
                filter.contains(&probe[..])
            })
            .count();
        // expect about 2^-12 = 244 per million; the bound is 0.1%
        let fp_rate = false_positives as f64 * 100. / TRIALS as f64;
        assert!(fp_rate < 0.1, "False positive rate is {}", fp_rate);
    }

    #[test]
    fn test_zero_keys() {
        let keys: &[&[u8]] = &[];
        let filter = WideBuilder::new().populate_wide(keys, 12).unwrap();
        assert!(filter.len() > 0);
        let _ = filter.contains(b"anything");
    }

    #[test]
    fn test_duplicate_keys() {
        let keys: &[&[u8]] = &[b"one", b"two", b"three", b"two"];
        let err = WideBuilder::new().populate_wide(keys, 12).unwrap_err();
        assert_eq!(err, BuildError::TooManyIterations);
    }

    #[test]
    fn test_padding_aliases_are_duplicates() {
        // [1] and [0, 1] are the same 256-bit value
        let keys: &[&[u8]] = &[&[1], &[0, 1]];
        let err = WideBuilder::new().populate_wide(keys, 12).unwrap_err();
        assert_eq!(err, BuildError::TooManyIterations);
    }

    #[test]
    fn test_rejects_oversized_keys() {
        let long = vec![7u8; MAX_KEY_BYTES + 1];
        let keys: [&[u8]; 2] = [long.as_slice(), b"short"];
        let err = WideBuilder::new().populate_wide(&keys, 12).unwrap_err();
        assert_eq!(err, BuildError::OversizedKey { len: MAX_KEY_BYTES + 1 });
    }

    #[test]
    fn test_oversized_query_is_never_a_member() {
        let keys = random_keys(100);
        let filter = WideBuilder::new().populate_wide(&keys, 12).unwrap();
        assert!(!filter.contains(&[0u8; 64][..]));
    }

    #[test]
    fn test_rejects_out_of_range_widths() {
        let keys: &[&[u8]] = &[b"a", b"b"];
        let mut builder = WideBuilder::new();
        assert_eq!(
            builder.populate_wide(keys, 8).unwrap_err(),
            BuildError::InvalidBits { bits: 8 }
        );
        assert_eq!(
            builder.populate_wide(keys, 33).unwrap_err(),
            BuildError::InvalidBits { bits: 33 }
        );
    }

    #[test]
    fn test_deterministic_given_entropy() {
        let keys = random_keys(1_000);
        let a = WideBuilder::with_entropy(SplitMix64::new(5))
            .populate_wide(&keys, 16)
            .unwrap();
        let b = WideBuilder::with_entropy(SplitMix64::new(5))
            .populate_wide(&keys, 16)
            .unwrap();
        assert_eq!(a.seed, b.seed);
        assert_eq!(a.fingerprints, b.fingerprints);
    }
}
