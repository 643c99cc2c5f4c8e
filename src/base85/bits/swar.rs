//! Serial reference kernel: one byte per step, branch-free SWAR arithmetic.

use super::{DIGITS_PER_BYTE, Fallback, Kernel};

/// Least significant bit of every byte in a word.
pub(super) const LSB8: u64 = 0x0101_0101_0101_0101;
/// Most significant bit of every byte in a word.
pub(super) const MSB8: u64 = LSB8 << 7;
/// Byte `k` (little-endian) keeps only bit `7 - k`.
pub(super) const UNIQUE_BIT: u64 = 0x0102_0408_1020_4080;
/// Added to the masked word, carries each kept bit into its byte's sign bit.
pub(super) const CARRY_SHIFT: u64 = 0x7F7E_7C78_7060_4000;
/// ASCII `'0'` in every byte.
pub(super) const ASCII_ZERO: u64 = LSB8 * b'0' as u64;
/// Gathers the low bit of byte `k` into bit `56 + k` of the product.
const GATHER: u64 = 0x0102_0408_1020_4080;

pub(super) static SERIAL: Kernel = Kernel {
    name: "serial",
    lanes: 1,
    detect: always,
    encode_blocks,
    decode_blocks,
    fallback: Fallback::None,
};

fn always() -> bool {
    true
}

/// Spread the bits of `byte` over eight ASCII digits, MSB first.
#[inline]
pub fn encode_byte(byte: u8) -> [u8; DIGITS_PER_BYTE] {
    let kept = (u64::from(byte) * LSB8) & UNIQUE_BIT;
    let digits = (((kept + CARRY_SHIFT) & MSB8) >> 7) | ASCII_ZERO;
    digits.to_le_bytes()
}

/// Pack the low bit of eight digits back into one byte, first digit as MSB.
#[inline]
pub fn decode_byte(digits: &[u8; DIGITS_PER_BYTE]) -> u8 {
    let bits = u64::from_be_bytes(*digits) & LSB8;
    (bits.wrapping_mul(GATHER) >> 56) as u8
}

/// Load eight bytes as a big-endian word.
#[inline]
pub(super) fn load_be(digits: &[u8]) -> u64 {
    let mut word = [0u8; DIGITS_PER_BYTE];
    word.copy_from_slice(&digits[..DIGITS_PER_BYTE]);
    u64::from_be_bytes(word)
}

fn encode_blocks(input: &[u8], output: &mut [u8]) -> usize {
    for (&byte, out) in input.iter().zip(output.chunks_exact_mut(DIGITS_PER_BYTE)) {
        out.copy_from_slice(&encode_byte(byte));
    }
    input.len()
}

fn decode_blocks(input: &[u8], output: &mut [u8]) -> usize {
    let groups = input.chunks_exact(DIGITS_PER_BYTE);
    let count = groups.len();
    for (group, out) in groups.zip(output.iter_mut()) {
        *out = ((load_be(group) & LSB8).wrapping_mul(GATHER) >> 56) as u8;
    }
    count
}
