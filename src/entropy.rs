//! Seed randomness for filter construction.
//!
//! Builders draw a fresh seed from an [`EntropySource`] on every construction
//! retry. The source is an injected capability rather than a process global,
//! so tests can pin construction to a deterministic sequence by handing the
//! builder a fixed-state [`SplitMix64`].

/// Yields uniformly random bytes for construction seeds.
///
/// The bytes only seed a Murmur-style avalanche mix, so the source does not
/// need to be cryptographic; it does need to be uniform.
pub trait EntropySource {
    /// Fills `buf` with uniformly random bytes.
    fn fill(&mut self, buf: &mut [u8]);
}

/// Pseudo-RNG using Sebastiano Vigna's [`SplitMix64`] algorithm.
///
/// [`SplitMix64`]: http://xoroshiro.di.unimi.it/splitmix64.c
///
/// Written in 2015 by Sebastiano Vigna (vigna@acm.org)
///
/// To the extent possible under law, the author has dedicated all copyright and related and
/// neighboring rights to this software to the public domain worldwide. This software is
/// distributed without any warranty.
///
/// See <http://creativecommons.org/publicdomain/zero/1.0/>.
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    /// Creates a generator starting from `state`.
    ///
    /// Two generators created from the same state produce the same byte
    /// sequence, which makes filter construction reproducible.
    pub const fn new(state: u64) -> Self {
        SplitMix64 { state }
    }

    /// Creates a generator seeded from operating-system entropy.
    #[cfg(feature = "os-entropy")]
    pub fn from_entropy() -> Self {
        use rand::Rng;
        SplitMix64::new(rand::thread_rng().gen())
    }

    /// Advances the generator and returns its next 64-bit output.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

impl EntropySource for SplitMix64 {
    fn fill(&mut self, buf: &mut [u8]) {
        for chunk in buf.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

/// The builder-default source: seeded from the operating system when the
/// `os-entropy` feature is enabled, otherwise a fixed-state generator.
pub(crate) fn default_source() -> SplitMix64 {
    #[cfg(feature = "os-entropy")]
    {
        SplitMix64::from_entropy()
    }
    #[cfg(not(feature = "os-entropy"))]
    {
        SplitMix64::new(1)
    }
}
