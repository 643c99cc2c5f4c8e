//! Binary-string transform: each byte becomes eight ASCII `'0'`/`'1'` digits,
//! most significant bit first, and back.
//!
//! Several kernels implement the same mapping at different widths. Each one
//! handles as many whole steps as fit and hands the remainder to the
//! next-narrower kernel, ending at a width-1 kernel (BMI2 when the CPU has
//! it, serial otherwise), so all of them produce identical output for any
//! input.

mod swar;

#[cfg(target_arch = "x86_64")]
mod x86;

#[cfg(target_arch = "aarch64")]
mod neon;

#[cfg(test)]
mod tests;

use std::sync::OnceLock;

pub use self::swar::{decode_byte, encode_byte};

/// ASCII digits emitted per input byte.
pub const DIGITS_PER_BYTE: usize = 8;

/// One width-specific implementation of the transform.
pub struct Kernel {
    name: &'static str,
    lanes: usize,
    detect: fn() -> bool,
    /// Encodes whole steps, returns the number of input bytes covered.
    encode_blocks: fn(&[u8], &mut [u8]) -> usize,
    /// Decodes whole steps, returns the number of bytes produced.
    decode_blocks: fn(&[u8], &mut [u8]) -> usize,
    /// Handles whatever the blocks above left over.
    fallback: Fallback,
}

/// Where a kernel sends the input its blocks did not cover.
#[derive(Clone, Copy)]
enum Fallback {
    /// The blocks cover every input length.
    None,
    Kernel(&'static Kernel),
    /// The width-1 kernel picked for this CPU, see [`narrowest`].
    Narrowest,
}

impl Fallback {
    fn resolve(self) -> Option<&'static Kernel> {
        match self {
            Fallback::None => None,
            Fallback::Kernel(next) => Some(next),
            Fallback::Narrowest => Some(narrowest()),
        }
    }
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Input bytes processed per step.
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Encode `input` into `output[..input.len() * 8]`.
    ///
    /// Panics if `output` is shorter than that.
    pub fn encode(&self, input: &[u8], output: &mut [u8]) {
        let output = &mut output[..input.len() * DIGITS_PER_BYTE];
        let done = (self.encode_blocks)(input, output);
        if done < input.len()
            && let Some(next) = self.fallback.resolve()
        {
            next.encode(&input[done..], &mut output[done * DIGITS_PER_BYTE..]);
        }
    }

    /// Decode every complete 8-digit group of `input` into `output`.
    /// A trailing partial group is ignored. Returns the number of bytes written.
    ///
    /// Only the low bit of each digit is read; other bytes decode as garbage.
    pub fn decode(&self, input: &[u8], output: &mut [u8]) -> usize {
        let groups = input.len() / DIGITS_PER_BYTE;
        let input = &input[..groups * DIGITS_PER_BYTE];
        let output = &mut output[..groups];
        let done = (self.decode_blocks)(input, output);
        if done < groups
            && let Some(next) = self.fallback.resolve()
        {
            next.decode(&input[done * DIGITS_PER_BYTE..], &mut output[done..]);
        }
        groups
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("name", &self.name)
            .field("lanes", &self.lanes)
            .finish()
    }
}

/// Kernels supported by this CPU, widest first. The serial kernel is always last.
pub fn available() -> &'static [&'static Kernel] {
    static AVAILABLE: OnceLock<Vec<&'static Kernel>> = OnceLock::new();
    AVAILABLE.get_or_init(|| {
        let mut kernels: Vec<&'static Kernel> = Vec::new();
        #[cfg(all(target_arch = "x86_64", feature = "avx512"))]
        kernels.push(&x86::AVX512);
        #[cfg(target_arch = "x86_64")]
        {
            kernels.push(&x86::AVX2);
            kernels.push(&x86::SSE2);
            kernels.push(&x86::BMI2);
        }
        #[cfg(target_arch = "aarch64")]
        kernels.push(&neon::NEON);
        kernels.retain(|k| (k.detect)());
        kernels.push(&swar::SERIAL);
        log::debug!(
            "bit-string kernels: {:?}, width-1 fallback: {}",
            kernels.iter().map(|k| k.name).collect::<Vec<_>>(),
            narrowest().name
        );
        kernels
    })
}

/// Widest kernel this CPU supports.
#[inline]
pub fn best() -> &'static Kernel {
    available()[0]
}

/// Width-1 kernel that wider kernels hand their remainder to: BMI2 when the
/// CPU supports it, the serial kernel otherwise.
pub fn narrowest() -> &'static Kernel {
    static NARROWEST: OnceLock<&'static Kernel> = OnceLock::new();
    *NARROWEST.get_or_init(|| {
        #[cfg(target_arch = "x86_64")]
        if (x86::BMI2.detect)() {
            return &x86::BMI2;
        }
        &swar::SERIAL
    })
}

/// The serial reference kernel.
#[inline]
pub fn serial() -> &'static Kernel {
    &swar::SERIAL
}

/// Encode with the widest available kernel.
pub fn encode(input: &[u8], output: &mut [u8]) {
    best().encode(input, output)
}

/// Decode with the widest available kernel. Returns the number of bytes written.
pub fn decode(input: &[u8], output: &mut [u8]) -> usize {
    best().decode(input, output)
}
