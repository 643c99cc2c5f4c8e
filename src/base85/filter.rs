//! In-place removal of bytes outside the encoded alphabet.
//!
//! Input is scanned in fixed-width blocks. A block made entirely of strict
//! alphabet bytes is moved down in one copy; any other block, and the tail,
//! is compacted byte by byte. Every block width gives the same result.

use super::tuple::{ALPHABET_END, ALPHABET_START, ZERO_TUPLE};

const LSB8: u64 = 0x0101_0101_0101_0101;
const MSB8: u64 = LSB8 << 7;

/// Set of bytes that survive filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alphabet {
    /// `'!'..='u'`, plus `'z'` when shorthand decoding is enabled.
    Radix85 { shorthand: bool },
    /// ASCII `'0'` and `'1'`.
    Binary,
}

impl Alphabet {
    #[inline]
    pub fn accepts(self, b: u8) -> bool {
        match self {
            Alphabet::Radix85 { shorthand } => {
                (ALPHABET_START..=ALPHABET_END).contains(&b) || (shorthand && b == ZERO_TUPLE)
            }
            Alphabet::Binary => b & 0xFE == 0x30,
        }
    }
}

/// Block size used for the bulk scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockWidth {
    /// No blocks, byte at a time.
    Serial,
    /// 8 bytes checked as one `u64`.
    Word,
    /// 16 bytes, SSE2 compares.
    Sse2,
    /// 32 bytes, AVX2 compares.
    Avx2,
}

impl BlockWidth {
    pub fn bytes(self) -> usize {
        match self {
            BlockWidth::Serial => 1,
            BlockWidth::Word => 8,
            BlockWidth::Sse2 => 16,
            BlockWidth::Avx2 => 32,
        }
    }

    pub fn is_available(self) -> bool {
        match self {
            BlockWidth::Serial | BlockWidth::Word => true,
            #[cfg(target_arch = "x86_64")]
            BlockWidth::Sse2 => is_x86_feature_detected!("sse2"),
            #[cfg(target_arch = "x86_64")]
            BlockWidth::Avx2 => is_x86_feature_detected!("avx2"),
            #[cfg(not(target_arch = "x86_64"))]
            BlockWidth::Sse2 | BlockWidth::Avx2 => false,
        }
    }

    /// Widths this CPU supports, widest first.
    pub fn available() -> Vec<BlockWidth> {
        [BlockWidth::Avx2, BlockWidth::Sse2, BlockWidth::Word, BlockWidth::Serial]
            .into_iter()
            .filter(|w| w.is_available())
            .collect()
    }

    pub fn best() -> BlockWidth {
        if BlockWidth::Avx2.is_available() {
            BlockWidth::Avx2
        } else if BlockWidth::Sse2.is_available() {
            BlockWidth::Sse2
        } else {
            BlockWidth::Word
        }
    }
}

/// Compact `bytes` so only bytes accepted by `alphabet` remain at the front,
/// in their input order. Returns the new length.
pub fn filter(bytes: &mut [u8], alphabet: Alphabet) -> usize {
    filter_with(bytes, alphabet, BlockWidth::best())
}

/// [`filter`] with an explicit block width. Unsupported widths fall back to `Word`.
pub fn filter_with(bytes: &mut [u8], alphabet: Alphabet, width: BlockWidth) -> usize {
    let width = if width.is_available() { width } else { BlockWidth::Word };
    let block = width.bytes();
    let mut end = 0;
    let mut i = 0;

    if block > 1 {
        while i + block <= bytes.len() {
            if block_is_clean(&bytes[i..i + block], alphabet, width) {
                bytes.copy_within(i..i + block, end);
                end += block;
            } else {
                end = compact(bytes, i, i + block, end, alphabet);
            }
            i += block;
        }
    }

    compact(bytes, i, bytes.len(), end, alphabet)
}

/// Move accepted bytes of `bytes[from..to]` down to `end`. Returns the new end.
#[inline]
#[allow(clippy::needless_range_loop)] // reads at k and writes at end <= k in one slice
fn compact(bytes: &mut [u8], from: usize, to: usize, mut end: usize, alphabet: Alphabet) -> usize {
    for k in from..to {
        let b = bytes[k];
        if alphabet.accepts(b) {
            bytes[end] = b;
            end += 1;
        }
    }
    end
}

/// True when every byte of `block` is in the strict alphabet (no `'z'`).
#[inline]
fn block_is_clean(block: &[u8], alphabet: Alphabet, width: BlockWidth) -> bool {
    match width {
        BlockWidth::Serial => false,
        BlockWidth::Word => word_is_clean(load_le(block), alphabet),
        #[cfg(target_arch = "x86_64")]
        // SAFETY: filter_with only keeps widths whose CPU feature was detected.
        BlockWidth::Sse2 => unsafe { x86::sse2_is_clean(block, alphabet) },
        #[cfg(target_arch = "x86_64")]
        // SAFETY: as above.
        BlockWidth::Avx2 => unsafe { x86::avx2_is_clean(block, alphabet) },
        #[cfg(not(target_arch = "x86_64"))]
        BlockWidth::Sse2 | BlockWidth::Avx2 => false,
    }
}

#[inline]
fn load_le(block: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&block[..8]);
    u64::from_le_bytes(word)
}

/// SWAR range check over eight bytes.
#[inline]
fn word_is_clean(word: u64, alphabet: Alphabet) -> bool {
    match alphabet {
        Alphabet::Binary => word & (LSB8 * 0xFE) == LSB8 * 0x30,
        Alphabet::Radix85 { .. } => {
            if word & MSB8 != 0 {
                return false;
            }
            // Bytes are below 0x80, so neither sum carries across bytes
            let at_least_start = word + LSB8 * u64::from(0x80 - ALPHABET_START);
            let above_end = word + LSB8 * u64::from(0x7F - ALPHABET_END);
            at_least_start & MSB8 == MSB8 && above_end & MSB8 == 0
        }
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::*;

    use super::super::tuple::{ALPHABET_END, ALPHABET_START};
    use super::Alphabet;

    #[target_feature(enable = "sse2")]
    pub(super) unsafe fn sse2_is_clean(block: &[u8], alphabet: Alphabet) -> bool {
        let block = &block[..16];
        unsafe {
            let v = _mm_loadu_si128(block.as_ptr() as *const __m128i);
            let ok = match alphabet {
                Alphabet::Binary => _mm_cmpeq_epi8(
                    _mm_and_si128(v, _mm_set1_epi8(0xFEu8 as i8)),
                    _mm_set1_epi8(0x30),
                ),
                // Signed compares: bytes >= 0x80 are negative and fail the first test
                Alphabet::Radix85 { .. } => _mm_and_si128(
                    _mm_cmpgt_epi8(v, _mm_set1_epi8((ALPHABET_START - 1) as i8)),
                    _mm_cmplt_epi8(v, _mm_set1_epi8((ALPHABET_END + 1) as i8)),
                ),
            };
            _mm_movemask_epi8(ok) == 0xFFFF
        }
    }

    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn avx2_is_clean(block: &[u8], alphabet: Alphabet) -> bool {
        let block = &block[..32];
        unsafe {
            let v = _mm256_loadu_si256(block.as_ptr() as *const __m256i);
            let ok = match alphabet {
                Alphabet::Binary => _mm256_cmpeq_epi8(
                    _mm256_and_si256(v, _mm256_set1_epi8(0xFEu8 as i8)),
                    _mm256_set1_epi8(0x30),
                ),
                Alphabet::Radix85 { .. } => _mm256_and_si256(
                    _mm256_cmpgt_epi8(v, _mm256_set1_epi8((ALPHABET_START - 1) as i8)),
                    _mm256_cmpgt_epi8(_mm256_set1_epi8((ALPHABET_END + 1) as i8), v),
                ),
            };
            _mm256_movemask_epi8(ok) == -1
        }
    }
}
