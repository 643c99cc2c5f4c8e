use super::*;

use proptest::prelude::*;

/// Bit-by-bit model of the transform.
fn reference_encode(byte: u8) -> [u8; 8] {
    let mut out = [0u8; 8];
    for (j, digit) in out.iter_mut().enumerate() {
        *digit = if (byte >> (7 - j)) & 1 == 1 { b'1' } else { b'0' };
    }
    out
}

fn encode_with(kernel: &Kernel, input: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; input.len() * DIGITS_PER_BYTE];
    kernel.encode(input, &mut out);
    out
}

fn decode_with(kernel: &Kernel, input: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; input.len() / DIGITS_PER_BYTE];
    let n = kernel.decode(input, &mut out);
    out.truncate(n);
    out
}

#[test]
fn test_encode_byte_known_values() {
    assert_eq!(&encode_byte(0x00), b"00000000");
    assert_eq!(&encode_byte(0xFF), b"11111111");
    assert_eq!(&encode_byte(0x80), b"10000000");
    assert_eq!(&encode_byte(0x01), b"00000001");
    assert_eq!(&encode_byte(b'A'), b"01000001");
}

#[test]
fn test_decode_byte_known_values() {
    assert_eq!(decode_byte(b"00000000"), 0x00);
    assert_eq!(decode_byte(b"11111111"), 0xFF);
    assert_eq!(decode_byte(b"10000000"), 0x80);
    assert_eq!(decode_byte(b"01000001"), b'A');
}

#[test]
fn test_serial_matches_reference_all_bytes() {
    for byte in 0..=255u8 {
        assert_eq!(encode_byte(byte), reference_encode(byte), "byte {byte:#04x}");
        assert_eq!(decode_byte(&reference_encode(byte)), byte);
    }
}

#[test]
fn test_every_kernel_encodes_all_bytes_like_serial() {
    let input: Vec<u8> = (0..=255).collect();
    let expected = encode_with(serial(), &input);
    for kernel in available() {
        assert_eq!(encode_with(kernel, &input), expected, "kernel {}", kernel.name());
    }
}

#[test]
fn test_every_kernel_decodes_all_bytes_like_serial() {
    let input: Vec<u8> = (0..=255).collect();
    let digits = encode_with(serial(), &input);
    for kernel in available() {
        assert_eq!(decode_with(kernel, &digits), input, "kernel {}", kernel.name());
    }
}

#[test]
fn test_remainders_fall_through_to_narrower_kernels() {
    // Every length up to a few widest steps, so each fallback link runs
    let data: Vec<u8> = (0..67u32).map(|i| (i * 37 + 11) as u8).collect();
    for kernel in available() {
        for len in 0..data.len() {
            let encoded = encode_with(kernel, &data[..len]);
            assert_eq!(encoded, encode_with(serial(), &data[..len]), "{} len {len}", kernel.name());
            assert_eq!(decode_with(kernel, &encoded), &data[..len], "{} len {len}", kernel.name());
        }
    }
}

#[test]
fn test_decode_ignores_trailing_partial_group() {
    let mut digits = encode_byte(0xA5).to_vec();
    digits.extend_from_slice(b"101");
    for kernel in available() {
        assert_eq!(decode_with(kernel, &digits), vec![0xA5]);
    }
}

#[test]
fn test_empty_input() {
    for kernel in available() {
        assert!(encode_with(kernel, b"").is_empty());
        assert!(decode_with(kernel, b"").is_empty());
    }
}

#[test]
fn test_serial_is_always_available_and_last() {
    let kernels = available();
    assert_eq!(kernels.last().map(|k| k.name()), Some("serial"));
    assert_eq!(best().name(), kernels[0].name());
    assert_eq!(serial().lanes(), 1);
}

#[test]
fn test_narrowest_prefers_bmi2() {
    #[cfg(target_arch = "x86_64")]
    let expected = if is_x86_feature_detected!("bmi2") { "bmi2" } else { "serial" };
    #[cfg(not(target_arch = "x86_64"))]
    let expected = "serial";
    assert_eq!(narrowest().name(), expected);
    assert_eq!(narrowest().lanes(), 1);
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_two_lane_kernel_hands_remainder_to_narrowest() {
    let next = x86::SSE2.fallback.resolve().map(|k| k.name());
    assert_eq!(next, Some(narrowest().name()));
    assert!(x86::BMI2.fallback.resolve().is_none());
}

#[test]
fn test_best_kernel_chain_ends_at_narrowest() {
    let mut kernel = best();
    while let Some(next) = kernel.fallback.resolve() {
        kernel = next;
    }
    assert_eq!(kernel.name(), narrowest().name());

    // Odd lengths reach the width-1 link on the driver path
    let data: Vec<u8> = (0..=255u8).chain(0..3).collect();
    assert_eq!(encode_with(best(), &data), encode_with(serial(), &data));
    let digits = encode_with(serial(), &data);
    assert_eq!(decode_with(best(), &digits), data);
}

#[test]
#[should_panic]
fn test_encode_panics_on_short_output() {
    let mut out = [0u8; 7];
    serial().encode(b"a", &mut out);
}

proptest! {
    #[test]
    fn prop_kernels_agree_on_garbage_digits(digits in proptest::collection::vec(any::<u8>(), 0..300)) {
        // Only the low bit of each digit matters, identically for all widths
        let expected = decode_with(serial(), &digits);
        for kernel in available() {
            prop_assert_eq!(decode_with(kernel, &digits), expected.clone());
        }
    }

    #[test]
    fn prop_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..300)) {
        let mut encoded = vec![0u8; data.len() * DIGITS_PER_BYTE];
        encode(&data, &mut encoded);
        prop_assert!(encoded.iter().all(|&b| b == b'0' || b == b'1'));
        let mut decoded = vec![0u8; data.len()];
        let n = decode(&encoded, &mut decoded);
        prop_assert_eq!(&decoded[..n], &data[..]);
    }
}
