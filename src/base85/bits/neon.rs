//! aarch64 NEON kernel, two bytes per step.

use std::arch::aarch64::*;

use super::{Fallback, Kernel};

/// Table lookup spreading byte 0 over the low half and byte 1 over the high half.
const SPREAD: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1];
/// Digit `j` of each half tests bit `7 - j`.
const UNIQUE: [u8; 16] = [
    0x80, 0x40, 0x20, 0x10, 0x08, 0x04, 0x02, 0x01, 0x80, 0x40, 0x20, 0x10, 0x08, 0x04, 0x02, 0x01,
];
/// Shift moving digit `j`'s low bit to bit `7 - j`.
const WEIGHT: [i8; 16] = [7, 6, 5, 4, 3, 2, 1, 0, 7, 6, 5, 4, 3, 2, 1, 0];

pub(super) static NEON: Kernel = Kernel {
    name: "neon",
    lanes: 2,
    detect: has_neon,
    encode_blocks: encode_neon,
    decode_blocks: decode_neon,
    fallback: Fallback::Narrowest,
};

fn has_neon() -> bool {
    std::arch::is_aarch64_feature_detected!("neon")
}

fn encode_neon(input: &[u8], output: &mut [u8]) -> usize {
    // SAFETY: only called through NEON, gated on has_neon().
    unsafe { encode_neon_impl(input, output) }
}

fn decode_neon(input: &[u8], output: &mut [u8]) -> usize {
    // SAFETY: only called through NEON, gated on has_neon().
    unsafe { decode_neon_impl(input, output) }
}

#[target_feature(enable = "neon")]
unsafe fn encode_neon_impl(input: &[u8], output: &mut [u8]) -> usize {
    let steps = input.len() / 2;
    unsafe {
        let spread = vld1q_u8(SPREAD.as_ptr());
        let unique = vld1q_u8(UNIQUE.as_ptr());
        let zero = vdupq_n_u8(b'0');
        let one = vdupq_n_u8(b'1');
        for i in 0..steps {
            let out = &mut output[i * 16..i * 16 + 16];
            let pair = u16::from_le_bytes([input[i * 2], input[i * 2 + 1]]);
            let bytes = vqtbl1q_u8(vreinterpretq_u8_u16(vdupq_n_u16(pair)), spread);
            let set = vtstq_u8(bytes, unique);
            vst1q_u8(out.as_mut_ptr(), vbslq_u8(set, one, zero));
        }
    }
    steps * 2
}

#[target_feature(enable = "neon")]
unsafe fn decode_neon_impl(input: &[u8], output: &mut [u8]) -> usize {
    let steps = input.len() / 16;
    unsafe {
        let weight = vld1q_s8(WEIGHT.as_ptr());
        let low = vdupq_n_u8(1);
        for i in 0..steps {
            let block = &input[i * 16..i * 16 + 16];
            let bits = vshlq_u8(vandq_u8(vld1q_u8(block.as_ptr()), low), weight);
            output[i * 2] = vaddv_u8(vget_low_u8(bits));
            output[i * 2 + 1] = vaddv_u8(vget_high_u8(bits));
        }
    }
    steps * 2
}
