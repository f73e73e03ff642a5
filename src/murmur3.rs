//! Finalization mixes for the 64-bit and 256-bit hash domains.

use primitive_types::U256;

/// [`MurmurHash3`]'s finalization mix implementation, causing bits to [avalanche].
///
/// [`MurmurHash3`]: https://github.com/spaolacci/murmur3
/// [avalanche]: https://en.wikipedia.org/wiki/Avalanche_effect
///
/// Copyright 2013, Sébastien Paolacci.
/// All rights reserved.
///
/// Redistribution and use in source and binary forms, with or without
/// modification, are permitted provided that the following conditions are met:
///     * Redistributions of source code must retain the above copyright
///       notice, this list of conditions and the following disclaimer.
///     * Redistributions in binary form must reproduce the above copyright
///       notice, this list of conditions and the following disclaimer in the
///       documentation and/or other materials provided with the distribution.
///     * Neither the name of the library nor the
///       names of its contributors may be used to endorse or promote products
///       derived from this software without specific prior written permission.
///
/// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND
/// ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE IMPLIED
/// WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
/// DISCLAIMED. IN NO EVENT SHALL <COPYRIGHT HOLDER> BE LIABLE FOR ANY
/// DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES
/// (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES;
/// LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND
/// ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
/// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
/// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.
pub const fn mix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

/// The 64-bit Murmur multiplicative constants repeated across all four limbs.
const MIX_A: U256 = U256([0xff51_afd7_ed55_8ccd; 4]);
const MIX_B: U256 = U256([0xc4ce_b9fe_1a85_ec53; 4]);

/// The xorshift distance in [`mix64`] is half the domain width plus one (33
/// of 64 bits); the 256-bit lift preserves that relationship.
const MIX256_SHIFT: usize = 129;

/// [`mix64`] lifted into the 256-bit domain.
///
/// Multiplications keep the low 256 bits of the product, mimicking the
/// overflowing 64-bit multiplies of the narrow mix.
pub fn mix256(k: U256) -> U256 {
    let k = k ^ (k >> MIX256_SHIFT);
    let k = k.overflowing_mul(MIX_A).0;
    let k = k ^ (k >> MIX256_SHIFT);
    let k = k.overflowing_mul(MIX_B).0;
    k ^ (k >> MIX256_SHIFT)
}
