//! x86_64 kernels: BMI2 (1 lane), SSE2 (2 lanes), AVX2 (4 lanes) and,
//! with the `avx512` feature, AVX-512BW (8 lanes).
//!
//! Every safe wrapper below is only reachable through its `Kernel`, which is
//! only handed out after its `detect` function returned true.

use std::arch::x86_64::*;

use super::swar::{ASCII_ZERO, CARRY_SHIFT, LSB8, MSB8, UNIQUE_BIT, load_be};
use super::{DIGITS_PER_BYTE, Fallback, Kernel};

/// Reverses the bytes of each 64-bit element within a 128-bit lane.
const REVERSE_LO: i64 = 0x0001_0203_0405_0607;
const REVERSE_HI: i64 = 0x0809_0A0B_0C0D_0E0F;

pub(super) static BMI2: Kernel = Kernel {
    name: "bmi2",
    lanes: 1,
    detect: has_bmi2,
    encode_blocks: encode_bmi2,
    decode_blocks: decode_bmi2,
    fallback: Fallback::None,
};

pub(super) static SSE2: Kernel = Kernel {
    name: "sse2",
    lanes: 2,
    detect: has_sse2,
    encode_blocks: encode_sse2,
    decode_blocks: decode_sse2,
    fallback: Fallback::Narrowest,
};

pub(super) static AVX2: Kernel = Kernel {
    name: "avx2",
    lanes: 4,
    detect: has_avx2,
    encode_blocks: encode_avx2,
    decode_blocks: decode_avx2,
    fallback: Fallback::Kernel(&SSE2),
};

#[cfg(feature = "avx512")]
pub(super) static AVX512: Kernel = Kernel {
    name: "avx512bw",
    lanes: 8,
    detect: has_avx512bw,
    encode_blocks: encode_avx512,
    decode_blocks: decode_avx512,
    fallback: Fallback::Kernel(&AVX2),
};

fn has_bmi2() -> bool {
    is_x86_feature_detected!("bmi2")
}

fn has_sse2() -> bool {
    is_x86_feature_detected!("sse2")
}

fn has_avx2() -> bool {
    is_x86_feature_detected!("avx2") && has_sse2()
}

#[cfg(feature = "avx512")]
fn has_avx512bw() -> bool {
    is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512bw") && has_avx2()
}

// ── BMI2: bit deposit / extract ─────────────────────────────────────

fn encode_bmi2(input: &[u8], output: &mut [u8]) -> usize {
    // SAFETY: only called through BMI2, gated on has_bmi2().
    unsafe { encode_bmi2_impl(input, output) }
}

fn decode_bmi2(input: &[u8], output: &mut [u8]) -> usize {
    // SAFETY: only called through BMI2, gated on has_bmi2().
    unsafe { decode_bmi2_impl(input, output) }
}

#[target_feature(enable = "bmi2")]
unsafe fn encode_bmi2_impl(input: &[u8], output: &mut [u8]) -> usize {
    for (&byte, out) in input.iter().zip(output.chunks_exact_mut(DIGITS_PER_BYTE)) {
        // Bit i lands in byte i; big-endian store puts bit 7 first.
        let bits = unsafe { _pdep_u64(u64::from(byte), LSB8) };
        out.copy_from_slice(&(bits | ASCII_ZERO).to_be_bytes());
    }
    input.len()
}

#[target_feature(enable = "bmi2")]
unsafe fn decode_bmi2_impl(input: &[u8], output: &mut [u8]) -> usize {
    let groups = input.chunks_exact(DIGITS_PER_BYTE);
    let count = groups.len();
    for (group, out) in groups.zip(output.iter_mut()) {
        *out = unsafe { _pext_u64(load_be(group), LSB8) } as u8;
    }
    count
}

// ── SSE2: two bytes per step ────────────────────────────────────────

fn encode_sse2(input: &[u8], output: &mut [u8]) -> usize {
    // SAFETY: only called through SSE2, gated on has_sse2().
    unsafe { encode_sse2_impl(input, output) }
}

fn decode_sse2(input: &[u8], output: &mut [u8]) -> usize {
    // SAFETY: only called through SSE2, gated on has_sse2().
    unsafe { decode_sse2_impl(input, output) }
}

#[target_feature(enable = "sse2")]
unsafe fn encode_sse2_impl(input: &[u8], output: &mut [u8]) -> usize {
    let steps = input.len() / 2;
    unsafe {
        let unique = _mm_set1_epi64x(UNIQUE_BIT as i64);
        let carry = _mm_set1_epi64x(CARRY_SHIFT as i64);
        let msb = _mm_set1_epi64x(MSB8 as i64);
        let zero = _mm_set1_epi64x(ASCII_ZERO as i64);
        for i in 0..steps {
            let out = &mut output[i * 16..i * 16 + 16];
            let mut v = _mm_set_epi64x(
                (u64::from(input[i * 2 + 1]) * LSB8) as i64,
                (u64::from(input[i * 2]) * LSB8) as i64,
            );
            v = _mm_and_si128(v, unique);
            // Carry the kept bit into each byte's sign bit
            v = _mm_add_epi64(v, carry);
            v = _mm_and_si128(v, msb);
            v = _mm_srli_epi64(v, 7);
            v = _mm_or_si128(v, zero);
            _mm_storeu_si128(out.as_mut_ptr() as *mut __m128i, v);
        }
    }
    steps * 2
}

#[target_feature(enable = "sse2")]
unsafe fn decode_sse2_impl(input: &[u8], output: &mut [u8]) -> usize {
    let steps = input.len() / 16;
    for i in 0..steps {
        let block = &input[i * 16..i * 16 + 16];
        let mask = unsafe {
            let v = _mm_set_epi64x(load_be(&block[8..]) as i64, load_be(block) as i64);
            // Low bit of each byte into its sign bit, then gather
            _mm_movemask_epi8(_mm_slli_epi64(v, 7)) as u16
        };
        output[i * 2..i * 2 + 2].copy_from_slice(&mask.to_le_bytes());
    }
    steps * 2
}

// ── AVX2: four bytes per step ───────────────────────────────────────

fn encode_avx2(input: &[u8], output: &mut [u8]) -> usize {
    // SAFETY: only called through AVX2, gated on has_avx2().
    unsafe { encode_avx2_impl(input, output) }
}

fn decode_avx2(input: &[u8], output: &mut [u8]) -> usize {
    // SAFETY: only called through AVX2, gated on has_avx2().
    unsafe { decode_avx2_impl(input, output) }
}

#[target_feature(enable = "avx2")]
unsafe fn encode_avx2_impl(input: &[u8], output: &mut [u8]) -> usize {
    let steps = input.len() / 4;
    unsafe {
        // Byte k of the broadcast word fills 64-bit element k
        let spread = _mm256_set_epi64x((LSB8 * 3) as i64, (LSB8 * 2) as i64, LSB8 as i64, 0);
        let unique = _mm256_set1_epi64x(UNIQUE_BIT as i64);
        let carry = _mm256_set1_epi64x(CARRY_SHIFT as i64);
        let zero = _mm256_set1_epi8(b'0' as i8);
        let one = _mm256_set1_epi8(b'1' as i8);
        for i in 0..steps {
            let out = &mut output[i * 32..i * 32 + 32];
            let word = u32::from_le_bytes([
                input[i * 4],
                input[i * 4 + 1],
                input[i * 4 + 2],
                input[i * 4 + 3],
            ]);
            let mut v = _mm256_set1_epi32(word as i32);
            v = _mm256_shuffle_epi8(v, spread);
            v = _mm256_and_si256(v, unique);
            v = _mm256_add_epi64(v, carry);
            // Pick '0' or '1' on the sign bit of each byte
            v = _mm256_blendv_epi8(zero, one, v);
            _mm256_storeu_si256(out.as_mut_ptr() as *mut __m256i, v);
        }
    }
    steps * 4
}

#[target_feature(enable = "avx2")]
unsafe fn decode_avx2_impl(input: &[u8], output: &mut [u8]) -> usize {
    let steps = input.len() / 32;
    unsafe {
        let reverse = _mm256_set_epi64x(REVERSE_HI, REVERSE_LO, REVERSE_HI, REVERSE_LO);
        for i in 0..steps {
            let block = &input[i * 32..i * 32 + 32];
            let mut v = _mm256_loadu_si256(block.as_ptr() as *const __m256i);
            v = _mm256_shuffle_epi8(v, reverse);
            v = _mm256_slli_epi64(v, 7);
            let mask = _mm256_movemask_epi8(v) as u32;
            output[i * 4..i * 4 + 4].copy_from_slice(&mask.to_le_bytes());
        }
    }
    steps * 4
}

// ── AVX-512BW: eight bytes per step ─────────────────────────────────

#[cfg(feature = "avx512")]
fn encode_avx512(input: &[u8], output: &mut [u8]) -> usize {
    // SAFETY: only called through AVX512, gated on has_avx512bw().
    unsafe { encode_avx512_impl(input, output) }
}

#[cfg(feature = "avx512")]
fn decode_avx512(input: &[u8], output: &mut [u8]) -> usize {
    // SAFETY: only called through AVX512, gated on has_avx512bw().
    unsafe { decode_avx512_impl(input, output) }
}

#[cfg(feature = "avx512")]
#[target_feature(enable = "avx512f,avx512bw")]
unsafe fn encode_avx512_impl(input: &[u8], output: &mut [u8]) -> usize {
    let steps = input.len() / 8;
    unsafe {
        let spread = _mm512_set_epi64(
            (LSB8 * 7) as i64,
            (LSB8 * 6) as i64,
            (LSB8 * 5) as i64,
            (LSB8 * 4) as i64,
            (LSB8 * 3) as i64,
            (LSB8 * 2) as i64,
            LSB8 as i64,
            0,
        );
        let unique = _mm512_set1_epi64(UNIQUE_BIT as i64);
        let zero = _mm512_set1_epi8(b'0' as i8);
        let one = _mm512_set1_epi8(b'1' as i8);
        for i in 0..steps {
            let out = &mut output[i * 64..i * 64 + 64];
            let v = _mm512_set1_epi64(load_le(&input[i * 8..]) as i64);
            let bytes = _mm512_shuffle_epi8(v, spread);
            let bits = _mm512_test_epi8_mask(bytes, unique);
            let ascii = _mm512_mask_blend_epi8(bits, zero, one);
            _mm512_storeu_epi8(out.as_mut_ptr() as *mut i8, ascii);
        }
    }
    steps * 8
}

#[cfg(feature = "avx512")]
#[target_feature(enable = "avx512f,avx512bw")]
unsafe fn decode_avx512_impl(input: &[u8], output: &mut [u8]) -> usize {
    let steps = input.len() / 64;
    unsafe {
        let reverse = _mm512_set_epi64(
            REVERSE_HI, REVERSE_LO, REVERSE_HI, REVERSE_LO, REVERSE_HI, REVERSE_LO, REVERSE_HI,
            REVERSE_LO,
        );
        let low = _mm512_set1_epi8(1);
        for i in 0..steps {
            let block = &input[i * 64..i * 64 + 64];
            let v = _mm512_loadu_epi8(block.as_ptr() as *const i8);
            let bits = _mm512_test_epi8_mask(_mm512_shuffle_epi8(v, reverse), low);
            output[i * 8..i * 8 + 8].copy_from_slice(&bits.to_le_bytes());
        }
    }
    steps * 8
}

#[cfg(feature = "avx512")]
#[inline]
fn load_le(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(word)
}
