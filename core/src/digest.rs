//! Hash-based token index selection.
//!
//! A bit window is hashed as one byte per bit (`0x00` / `0x01`, in order) and
//! the low six bits of the first digest byte select a table slot. The byte-per-bit
//! encoding is part of the observable behaviour: changing it changes every
//! token emitted for a given presence pattern.

use sha2::{Digest, Sha256};

use pclock_types::Bit;

/// Low six bits: always a valid index into a 64-entry table.
pub const INDEX_MASK: u8 = 0b11_1111;

/// Salt appended to action and keepalive seeds.
pub const SALT: [Bit; 8] = [
    Bit::One,
    Bit::Zero,
    Bit::One,
    Bit::Zero,
    Bit::Zero,
    Bit::One,
    Bit::Zero,
    Bit::One,
];

#[must_use]
pub fn window_digest(bits: &[Bit]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for bit in bits {
        hasher.update([bit.as_byte()]);
    }
    hasher.finalize().into()
}

#[must_use]
pub fn sha_index(bits: &[Bit]) -> usize {
    usize::from(window_digest(bits)[0] & INDEX_MASK)
}

/// Index for `seed` followed by [`SALT`].
#[must_use]
pub fn salted_index(seed: &[Bit]) -> usize {
    let mut salted = Vec::with_capacity(seed.len() + SALT.len());
    salted.extend_from_slice(seed);
    salted.extend_from_slice(&SALT);
    sha_index(&salted)
}
