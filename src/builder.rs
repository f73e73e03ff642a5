//! Filter construction: reusable arenas and the peeling engine.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::ops::BitXor;

use crate::entropy::{default_source, EntropySource};
use crate::prelude::{capacity, fingerprint, h0, h1, h2, mix, try_enqueue, KeyIndex, XorSet};
use crate::{BuildError, Xor16, Xor32, Xor8, XorN};

/// Seed attempts before construction gives up with
/// [`TooManyIterations`](BuildError::TooManyIterations).
///
/// At a capacity of `1.23 * n + 32` cells the expected number of attempts is
/// below two, so hitting the limit almost surely means duplicate keys: a
/// duplicated key contributes twice to the same three buckets and can never
/// peel down to a count of one, no matter the seed.
pub const MAX_ITERATIONS: usize = 100;

/// Builds the 64-bit-key filter variants.
///
/// A `Builder` owns the scratch arenas used by the peeling construction and
/// reuses them across builds, so tight construction loops do not reallocate.
/// It also owns the entropy source that seeds each construction attempt.
///
/// A `Builder` serves one build at a time; use one per thread. The filters it
/// emits are independent of it and immutable.
///
/// ```
/// # extern crate alloc;
/// use xorwide::{Builder, Filter};
/// # use alloc::vec::Vec;
/// # use rand::Rng;
///
/// # let mut rng = rand::thread_rng();
/// let mut builder = Builder::new();
/// for _ in 0..100 {
///     let keys: Vec<u64> = (0..64).map(|_| rng.gen()).collect();
///     let filter = builder.populate(&keys).unwrap();
///     assert!(keys.iter().all(|key| filter.contains(key)));
/// }
/// ```
pub struct Builder {
    /// Holds `stack | q0 | q1 | q2`, carved out per build.
    keyindexes: Vec<KeyIndex>,
    /// Holds `sets0 | sets1 | sets2`, carved out per build.
    sets: Vec<XorSet>,
    rng: Box<dyn EntropySource>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a builder with the default entropy source.
    pub fn new() -> Self {
        Self::with_entropy(default_source())
    }

    /// Creates a builder drawing construction seeds from `rng`.
    ///
    /// Injecting a fixed-state [`SplitMix64`](crate::SplitMix64) makes
    /// construction fully deterministic: the same source state and keys
    /// produce a bit-identical filter.
    pub fn with_entropy(rng: impl EntropySource + 'static) -> Self {
        Builder {
            keyindexes: Vec::new(),
            sets: Vec::new(),
            rng: Box::new(rng),
        }
    }

    /// Builds an [`Xor8`] over `keys`. The keys must be distinct.
    pub fn populate(&mut self, keys: &[u64]) -> Result<Xor8, BuildError> {
        let (cells, block_length) = capacity(keys.len());
        let seed = self.peel(keys, block_length)?;
        let mut fingerprints = vec![0u8; cells].into_boxed_slice();
        assign(&self.keyindexes[..keys.len()], block_length, &mut fingerprints, |hash| {
            fingerprint(hash) as u8
        });
        Ok(Xor8 {
            seed,
            block_length,
            fingerprints,
        })
    }

    /// Builds an [`Xor16`] over `keys`. The keys must be distinct.
    pub fn populate16(&mut self, keys: &[u64]) -> Result<Xor16, BuildError> {
        let (cells, block_length) = capacity(keys.len());
        let seed = self.peel(keys, block_length)?;
        let mut fingerprints = vec![0u16; cells].into_boxed_slice();
        assign(&self.keyindexes[..keys.len()], block_length, &mut fingerprints, |hash| {
            fingerprint(hash) as u16
        });
        Ok(Xor16 {
            seed,
            block_length,
            fingerprints,
        })
    }

    /// Builds an [`Xor32`] over `keys`. The keys must be distinct.
    pub fn populate32(&mut self, keys: &[u64]) -> Result<Xor32, BuildError> {
        let (cells, block_length) = capacity(keys.len());
        let seed = self.peel(keys, block_length)?;
        let mut fingerprints = vec![0u32; cells].into_boxed_slice();
        assign(&self.keyindexes[..keys.len()], block_length, &mut fingerprints, |hash| {
            fingerprint(hash)
        });
        Ok(Xor32 {
            seed,
            block_length,
            fingerprints,
        })
    }

    /// Builds an [`XorN`] with `bits`-wide fingerprints, `1 <= bits <= 32`.
    ///
    /// Small widths build fine but query with a correspondingly high
    /// false-positive rate; widths of 9 and up meet the usual `2^-bits`
    /// expectation.
    pub fn populate_n(&mut self, keys: &[u64], bits: u32) -> Result<XorN, BuildError> {
        if !(1..=32).contains(&bits) {
            return Err(BuildError::InvalidBits { bits });
        }
        let (cells, block_length) = capacity(keys.len());
        let seed = self.peel(keys, block_length)?;
        let mut filter = XorN {
            seed,
            block_length,
            bits,
            fingerprints: vec![0u32; cells].into_boxed_slice(),
        };
        let mask = filter.mask();
        assign(&self.keyindexes[..keys.len()], block_length, &mut filter.fingerprints, |hash| {
            fingerprint(hash) & mask
        });
        Ok(filter)
    }

    /// Runs seed attempts until every key peels, returning the successful
    /// seed. On success the first `keys.len()` entries of the keyindex arena
    /// hold the peel order, oldest removal first.
    fn peel(&mut self, keys: &[u64], block_length: u32) -> Result<u64, BuildError> {
        let size = keys.len();
        let bl = block_length as usize;

        let ki_total = size + 3 * bl;
        if self.keyindexes.len() < ki_total {
            self.keyindexes.resize(ki_total, KeyIndex::default());
        }
        // Queues and the stack are size-gated, so only the buckets need a
        // clean slate.
        if self.sets.len() < 3 * bl {
            self.sets.clear();
            self.sets.resize(3 * bl, XorSet::default());
        } else {
            for set in &mut self.sets[..3 * bl] {
                *set = XorSet::default();
            }
        }

        let (stack, queue_space) = self.keyindexes[..ki_total].split_at_mut(size);
        let (q0, rest) = queue_space.split_at_mut(bl);
        let (q1, q2) = rest.split_at_mut(bl);
        let mut queues = [q0, q1, q2];
        let (sets0, rest) = self.sets[..3 * bl].split_at_mut(bl);
        let (sets1, sets2) = rest.split_at_mut(bl);
        let mut sets = [sets0, sets1, sets2];

        for _ in 0..MAX_ITERATIONS {
            let seed = {
                let mut buf = [0u8; 8];
                self.rng.fill(&mut buf);
                u64::from_le_bytes(buf)
            };

            // Accumulate every key into its bucket on each of the three sides.
            for &key in keys {
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

            // Seed the queues with every bucket already down to one key.
            let mut q_sizes = [0usize; 3];
            for side in 0..3 {
                for idx in 0..bl {
                    try_enqueue(&sets[side], idx, &mut queues[side], &mut q_sizes[side]);
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

                            // Remove the key from its other two buckets,
                            // enqueueing any bucket that drops to one key.
                            let idx = $ha(hash, block_length) as usize;
                            sets[$a][idx].mask ^= hash;
                            sets[$a][idx].count -= 1;
                            try_enqueue(&sets[$a], idx, &mut queues[$a], &mut q_sizes[$a]);

                            let idx = $hb(hash, block_length) as usize;
                            sets[$b][idx].mask ^= hash;
                            sets[$b][idx].count -= 1;
                            try_enqueue(&sets[$b], idx, &mut queues[$b], &mut q_sizes[$b]);
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

            // A cycle survived; wipe the buckets and try a fresh seed.
            for side in &mut sets {
                for set in side.iter_mut() {
                    *set = XorSet::default();
                }
            }
        }
        Err(BuildError::TooManyIterations)
    }
}

/// Reverse-plays a peel order into the fingerprint array.
///
/// The stack is walked newest removal first. When a key's cell is written,
/// its other two cells hold either their final value or a provisional one
/// that later writes complete; the query relation `fp == c0 ^ c1 ^ c2` holds
/// by induction over the peel order.
fn assign<F, M>(stack: &[KeyIndex], block_length: u32, fingerprints: &mut [F], fp: M)
where
    F: Copy + BitXor<Output = F>,
    M: Fn(u64) -> F,
{
    let bl = block_length;
    for ki in stack.iter().rev() {
        let hash = ki.hash;
        let c0 = h0(hash, bl) as usize;
        let c1 = (h1(hash, bl) + bl) as usize;
        let c2 = (h2(hash, bl) + 2 * bl) as usize;
        let val = if ki.index < bl {
            fp(hash) ^ fingerprints[c1] ^ fingerprints[c2]
        } else if ki.index < 2 * bl {
            fp(hash) ^ fingerprints[c0] ^ fingerprints[c2]
        } else {
            fp(hash) ^ fingerprints[c0] ^ fingerprints[c1]
        };
        fingerprints[ki.index as usize] = val;
    }
}
