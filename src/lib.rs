//! Implements [xor filters] - compact, immutable approximate-membership
//! structures that are faster and smaller than Bloom and cuckoo filters.
//!
//! A filter is built once from a set of distinct keys and answers membership
//! queries forever after: every key the filter was built from is reported as
//! present, and keys outside the set are reported as present with a small,
//! width-tunable false-positive probability (roughly `2^-w` for `w`-bit
//! fingerprints).
//!
//! Two key domains are supported. The narrow filters ([`Xor8`], [`Xor16`],
//! [`Xor32`], [`XorN`]) take 64-bit unsigned integer keys. The wide filter
//! ([`WideXorN`]) takes arbitrary byte strings of up to 32 bytes, interpreted
//! as big-endian 256-bit integers, and runs all of its hash arithmetic in the
//! 256-bit domain.
//!
//! Construction is randomized and retried with fresh seeds; it fails with
//! [`BuildError::TooManyIterations`] when the key set contains duplicates.
//! Filters are built through a [`Builder`] (or [`WideBuilder`]), which keeps
//! its construction scratch space alive between builds:
//!
//! ```
//! # extern crate alloc;
//! use xorwide::{Builder, Filter};
//! # use alloc::vec::Vec;
//! # use rand::Rng;
//!
//! # let mut rng = rand::thread_rng();
//! let keys: Vec<u64> = (0..10_000).map(|_| rng.gen()).collect();
//!
//! let mut builder = Builder::new();
//! let filter = builder.populate16(&keys).unwrap();
//!
//! // no false negatives
//! for key in keys {
//!     assert!(filter.contains(&key));
//! }
//! ```
//!
//! [xor filters]: https://arxiv.org/abs/1912.08258

#![no_std]
// Configuration attributes
#![warn(missing_docs)]

extern crate alloc;

mod builder;
mod entropy;
mod murmur3;
#[doc(hidden)]
pub mod prelude;
mod wide;
mod xor16;
mod xor32;
mod xor8;
mod xorn;

pub use builder::{Builder, MAX_ITERATIONS};
pub use entropy::{EntropySource, SplitMix64};
pub use wide::{WideBuilder, WideXorN, MAX_KEY_BYTES};
pub use xor16::Xor16;
pub use xor32::Xor32;
pub use xor8::Xor8;
pub use xorn::XorN;

use core::fmt;

/// Methods common to xor filters.
pub trait Filter<Type: ?Sized> {
    /// Returns `true` if the filter probably contains the specified key.
    ///
    /// There are no false negatives: a key the filter was built from is
    /// always reported as present.
    fn contains(&self, key: &Type) -> bool;

    /// Returns the number of fingerprint cells in the filter.
    fn len(&self) -> usize;

    /// Returns `true` if the filter holds no fingerprint cells.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Errors surfaced while building a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// Every seed attempt left an unpeelable cycle behind.
    ///
    /// The predominant cause is a duplicate key: both copies land in the same
    /// three buckets, so neither bucket ever drops to a count of one and no
    /// seed can help.
    TooManyIterations,

    /// The requested fingerprint width is outside the supported range.
    InvalidBits {
        /// The rejected width.
        bits: u32,
    },

    /// A wide key was longer than the 32-byte hash domain.
    OversizedKey {
        /// Length in bytes of the rejected key.
        len: usize,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::TooManyIterations => {
                write!(f, "too many iterations, you probably have duplicate keys")
            }
            BuildError::InvalidBits { bits } => {
                write!(f, "unsupported fingerprint width: {} bits", bits)
            }
            BuildError::OversizedKey { len } => {
                write!(f, "key is {} bytes, wider than the 256-bit hash domain", len)
            }
        }
    }
}

impl core::error::Error for BuildError {}
