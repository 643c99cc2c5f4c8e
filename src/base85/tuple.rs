//! Radix-85 tuple codec.
//!
//! Four bytes, read as a big-endian `u32`, become five printable digits in
//! `'!'..='u'`, most significant digit first.

/// First symbol of the alphabet (digit value 0).
pub const ALPHABET_START: u8 = b'!';
/// Last symbol of the alphabet (digit value 84), also the decode-side pad byte.
pub const ALPHABET_END: u8 = b'u';
/// Shorthand for one all-zero tuple.
pub const ZERO_TUPLE: u8 = b'z';

/// Bytes per decoded tuple.
pub const DECODED_TUPLE: usize = 4;
/// Bytes per encoded tuple.
pub const ENCODED_TUPLE: usize = 5;

/// Powers of 85, most significant digit first.
pub const POW85: [u32; 5] = [52_200_625, 614_125, 7_225, 85, 1];

/// Encode one tuple into its five digits. Never applies the `'z'` shorthand.
#[inline]
pub fn encode_tuple(tuple: u32) -> [u8; ENCODED_TUPLE] {
    let mut out = [0u8; ENCODED_TUPLE];
    for (digit, &pow) in out.iter_mut().zip(POW85.iter()) {
        *digit = ((tuple / pow) % 85) as u8 + ALPHABET_START;
    }
    out
}

/// Decode five digits into one tuple.
///
/// Bytes outside the alphabet produce an unspecified value; the arithmetic
/// wraps instead of panicking.
#[inline]
pub fn decode_tuple(group: &[u8; ENCODED_TUPLE]) -> u32 {
    group
        .iter()
        .zip(POW85.iter())
        .fold(0u32, |sum, (&b, &pow)| {
            sum.wrapping_add(
                u32::from(b)
                    .wrapping_sub(u32::from(ALPHABET_START))
                    .wrapping_mul(pow),
            )
        })
}

/// Encode every complete 4-byte group of `input` into `output`.
/// A trailing partial group is ignored; the caller pads it.
/// Returns the number of bytes written (`input.len() / 4 * 5`).
pub fn encode(input: &[u8], output: &mut [u8]) -> usize {
    let groups = input.chunks_exact(DECODED_TUPLE);
    let written = groups.len() * ENCODED_TUPLE;
    for (chunk, out) in groups.zip(output[..written].chunks_exact_mut(ENCODED_TUPLE)) {
        let tuple = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        out.copy_from_slice(&encode_tuple(tuple));
    }
    written
}

/// Like [`encode`], but all-zero tuples become the single byte `'z'`.
/// Returns the number of bytes written.
pub fn encode_shorthand(input: &[u8], output: &mut [u8]) -> usize {
    let mut wp = 0;
    for chunk in input.chunks_exact(DECODED_TUPLE) {
        let tuple = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if tuple == 0 {
            output[wp] = ZERO_TUPLE;
            wp += 1;
        } else {
            output[wp..wp + ENCODED_TUPLE].copy_from_slice(&encode_tuple(tuple));
            wp += ENCODED_TUPLE;
        }
    }
    wp
}

/// Decode every complete 5-byte group of `input` into `output`.
/// A trailing partial group is ignored; the caller pads it.
/// Returns the number of bytes written (`input.len() / 5 * 4`).
pub fn decode(input: &[u8], output: &mut [u8]) -> usize {
    let groups = input.chunks_exact(ENCODED_TUPLE);
    let written = groups.len() * DECODED_TUPLE;
    for (chunk, out) in groups.zip(output[..written].chunks_exact_mut(DECODED_TUPLE)) {
        let group = [chunk[0], chunk[1], chunk[2], chunk[3], chunk[4]];
        out.copy_from_slice(&decode_tuple(&group).to_be_bytes());
    }
    written
}

/// Decode groups of `input`, expanding `'z'` wherever it starts a group.
///
/// Stops before a trailing group of fewer than five bytes.
/// Returns `(consumed, written)`.
pub fn decode_shorthand(input: &[u8], output: &mut [u8]) -> (usize, usize) {
    let mut rp = 0;
    let mut wp = 0;
    while rp < input.len() {
        if input[rp] == ZERO_TUPLE {
            output[wp..wp + DECODED_TUPLE].fill(0);
            rp += 1;
            wp += DECODED_TUPLE;
            continue;
        }
        let Some(chunk) = input.get(rp..rp + ENCODED_TUPLE) else {
            break;
        };
        let group = [chunk[0], chunk[1], chunk[2], chunk[3], chunk[4]];
        output[wp..wp + DECODED_TUPLE].copy_from_slice(&decode_tuple(&group).to_be_bytes());
        rp += ENCODED_TUPLE;
        wp += DECODED_TUPLE;
    }
    (rp, wp)
}
