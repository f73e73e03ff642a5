//! Common construction machinery for the 64-bit filter variants.

use crate::murmur3;

/// The hash of a key and the fingerprint cell it was peeled from.
#[derive(Default, Copy, Clone)]
pub struct KeyIndex {
    /// Avalanched key hash.
    pub hash: u64,
    /// Cell index; absolute once the key is on the peel stack.
    pub index: u32,
}

/// A construction bucket. Resident keys are encoded via xor into the mask, so
/// a bucket with a count of one holds the surviving key's hash wholly.
#[derive(Default, Copy, Clone)]
pub struct XorSet {
    /// Xor of the hashes of every key in the bucket.
    pub mask: u64,
    /// Number of keys in the bucket.
    pub count: u32,
}

/// Applies a finalization mix to a randomly-seeded key, resulting in an
/// avalanched hash. This helps avoid high false-positive ratios (see Section
/// 4 in the paper).
#[inline]
pub const fn mix(key: u64, seed: u64) -> u64 {
    murmur3::mix64(key.wrapping_add(seed))
}

/// [A fast alternative to the modulo reduction](http://lemire.me/blog/2016/06/27/a-fast-alternative-to-the-modulo-reduction/)
#[inline]
pub const fn reduce(x: u32, n: u32) -> u32 {
    ((x as u64 * n as u64) >> 32) as u32
}

/// Folds the top half of the domain onto the bottom and keeps 32 bits; the
/// per-variant fingerprint is a truncation or masking of this value.
#[inline]
pub const fn fingerprint(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}

/// Cell index of `hash` within block 0.
#[inline]
pub const fn h0(hash: u64, block_length: u32) -> u32 {
    reduce(hash as u32, block_length)
}

/// Cell index of `hash` within block 1 (relative; the caller adds the block
/// offset where an absolute index is needed).
#[inline]
pub const fn h1(hash: u64, block_length: u32) -> u32 {
    reduce(hash.rotate_left(21) as u32, block_length)
}

/// Cell index of `hash` within block 2 (relative).
#[inline]
pub const fn h2(hash: u64, block_length: u32) -> u32 {
    reduce(hash.rotate_left(42) as u32, block_length)
}

/// Enqueues bucket `idx` if it holds exactly one key.
#[inline]
pub fn try_enqueue(sets: &[XorSet], idx: usize, queue: &mut [KeyIndex], q_size: &mut usize) {
    if sets[idx].count == 1 {
        queue[*q_size] = KeyIndex {
            // with only one key left, the mask contains it wholly
            hash: sets[idx].mask,
            index: idx as u32,
        };
        *q_size += 1;
    }
}

/// Filter sizing shared by every variant: `ceil(1.23 * n) + 32` cells,
/// rounded down to a multiple of three so the array splits into three equal
/// blocks. Returns the total cell count and the per-block length.
pub fn capacity(num_keys: usize) -> (usize, u32) {
    let capacity = 32 + libm::ceil(1.23 * num_keys as f64) as u32;
    let capacity = capacity / 3 * 3;
    (capacity as usize, capacity / 3)
}

/// Creates a `contains(u64)` implementation for a narrow filter of
/// fingerprint type `$fpty`.
#[doc(hidden)]
#[macro_export]
macro_rules! xor_contains_impl(
    ($key:expr, $self:expr, fingerprint $fpty:ty) => {
        {
            use $crate::prelude::{fingerprint, h0, h1, h2, mix};

            let hash = mix($key, $self.seed);
            let fp = fingerprint(hash) as $fpty;
            let bl = $self.block_length;

            fp == $self.fingerprints[h0(hash, bl) as usize]
                ^ $self.fingerprints[(h1(hash, bl) + bl) as usize]
                ^ $self.fingerprints[(h2(hash, bl) + 2 * bl) as usize]
        }
    };
);
