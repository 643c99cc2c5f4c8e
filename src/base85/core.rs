//! Streaming driver: chunked encode and decode between a reader and a
//! writer, with tail padding, optional `'z'` shorthand and column wrapping.

use std::io::{self, BufWriter, Read, Write};

use log::{debug, warn};

use super::bits::{self, DIGITS_PER_BYTE};
use super::error::{Error, Result};
use super::filter::{self, Alphabet};
use super::tuple::{self, ALPHABET_END, DECODED_TUPLE, ENCODED_TUPLE};
use crate::common::io::{read_full, read_some};
use crate::common::page_size;

/// Default wrap column, as in GNU base64.
pub const DEFAULT_WRAP: usize = 76;

/// Output buffer in front of the sink.
const OUT_BUF_CAPACITY: usize = 256 * 1024;

/// Which transform the driver runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// Radix-85 tuples (4 bytes <-> 5 digits).
    #[default]
    Radix85,
    /// One byte <-> eight ASCII `'0'`/`'1'` digits.
    Binary,
}

impl Format {
    fn alphabet(self, shorthand: bool) -> Alphabet {
        match self {
            Format::Radix85 => Alphabet::Radix85 { shorthand },
            Format::Binary => Alphabet::Binary,
        }
    }
}

/// Settings for one encode or decode run.
#[derive(Clone, Debug)]
pub struct Config {
    pub format: Format,
    pub decode: bool,
    /// Filter out non-alphabet bytes before decoding.
    pub ignore_invalid: bool,
    /// Newline after this many output bytes; 0 disables wrapping.
    pub wrap_width: usize,
    /// Emit and accept `'z'` for all-zero tuples.
    pub shorthand: bool,
    /// Decoded bytes per batch. Rounded down to a multiple of 4.
    /// Affects performance only, never output.
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            format: Format::Radix85,
            decode: false,
            ignore_invalid: false,
            wrap_width: DEFAULT_WRAP,
            shorthand: false,
            chunk_size: page_size(),
        }
    }
}

impl Config {
    fn decoded_chunk(&self) -> usize {
        (self.chunk_size / DECODED_TUPLE * DECODED_TUPLE).max(DECODED_TUPLE)
    }

    fn encoded_chunk(&self) -> usize {
        match self.format {
            Format::Radix85 => self.decoded_chunk() / DECODED_TUPLE * ENCODED_TUPLE,
            Format::Binary => self.decoded_chunk() * DIGITS_PER_BYTE,
        }
    }
}

/// Parse a `--wrap` argument. Negative or non-numeric widths are rejected.
pub fn parse_wrap_width(arg: &str) -> Result<usize> {
    arg.trim()
        .parse::<usize>()
        .map_err(|_| Error::InvalidWrap(arg.to_string()))
}

/// Encode or decode `reader` into `writer`, as `config.decode` selects.
pub fn run(reader: &mut impl Read, writer: &mut impl Write, config: &Config) -> Result<()> {
    if config.decode {
        decode_stream(reader, config, writer)
    } else {
        encode_stream(reader, config, writer)
    }
}

/// Encode an in-memory buffer.
pub fn encode_to_writer(data: &[u8], config: &Config, out: &mut impl Write) -> Result<()> {
    encode_stream(&mut &data[..], config, out)
}

/// Decode an in-memory buffer.
pub fn decode_to_writer(data: &[u8], config: &Config, out: &mut impl Write) -> Result<()> {
    decode_stream(&mut &data[..], config, out)
}

/// Stream-encode from a reader to a writer.
///
/// Reads whole chunks, so only the last one can end in a partial tuple. That
/// tuple is zero-padded, encoded without shorthand, and one output byte is
/// dropped per pad byte.
pub fn encode_stream(
    reader: &mut impl Read,
    config: &Config,
    writer: &mut impl Write,
) -> Result<()> {
    let chunk = config.decoded_chunk();
    let mut input = vec![0u8; chunk];
    let mut encoded = vec![0u8; config.encoded_chunk()];
    let mut wrap_buf = Vec::new();
    let mut out = BufWriter::with_capacity(OUT_BUF_CAPACITY, writer);
    let kernel = bits::best();
    let mut col = 0usize;

    debug!(
        "encode: {:?} chunk={} wrap={} shorthand={} kernel={}",
        config.format,
        chunk,
        config.wrap_width,
        config.shorthand,
        kernel.name()
    );

    loop {
        let n = read_full(reader, &mut input).map_err(Error::Read)?;
        if n == 0 {
            break;
        }

        let produced = match config.format {
            Format::Radix85 => encode_radix85_chunk(&mut input, n, config.shorthand, &mut encoded),
            Format::Binary => {
                kernel.encode(&input[..n], &mut encoded);
                n * DIGITS_PER_BYTE
            }
        };

        col = wrap_write(&mut out, &encoded[..produced], config.wrap_width, col, &mut wrap_buf)
            .map_err(Error::Write)?;

        // Short read means end of input
        if n < chunk {
            break;
        }
    }

    out.flush().map_err(Error::Write)
}

/// Encode `input[..len]`, padding a trailing partial tuple in place.
/// Returns the number of encoded bytes with padding artifacts removed.
fn encode_radix85_chunk(input: &mut [u8], len: usize, shorthand: bool, encoded: &mut [u8]) -> usize {
    let full = len / DECODED_TUPLE * DECODED_TUPLE;
    let mut produced = if shorthand {
        tuple::encode_shorthand(&input[..full], encoded)
    } else {
        tuple::encode(&input[..full], encoded)
    };

    let pad = (DECODED_TUPLE - len % DECODED_TUPLE) % DECODED_TUPLE;
    if pad > 0 {
        input[len..full + DECODED_TUPLE].fill(0);
        produced += tuple::encode(&input[full..full + DECODED_TUPLE], &mut encoded[produced..]);
        produced -= pad;
    }
    produced
}

/// Stream-decode from a reader to a writer.
///
/// Short reads accumulate until the buffer is full; only then (or at end of
/// input) is a batch decoded. Leftover bytes of an incomplete group move to
/// the front of the buffer for the next batch. At end of input a trailing
/// radix-85 group is padded with `'u'` and one output byte is dropped per
/// pad byte.
pub fn decode_stream(
    reader: &mut impl Read,
    config: &Config,
    writer: &mut impl Write,
) -> Result<()> {
    let capacity = config.encoded_chunk();
    let mut input = vec![0u8; capacity];
    let out_len = match config.format {
        // Every 'z' expands to four bytes
        Format::Radix85 if config.shorthand => capacity * DECODED_TUPLE,
        Format::Radix85 => capacity / ENCODED_TUPLE * DECODED_TUPLE,
        Format::Binary => capacity / DIGITS_PER_BYTE,
    };
    let mut output = vec![0u8; out_len];
    let mut out = BufWriter::with_capacity(OUT_BUF_CAPACITY, writer);
    let alphabet = config.format.alphabet(config.shorthand);
    let kernel = bits::best();
    let mut filled = 0usize;

    debug!(
        "decode: {:?} capacity={} ignore_invalid={} filter={:?} shorthand={} kernel={}",
        config.format,
        capacity,
        config.ignore_invalid,
        filter::BlockWidth::best(),
        config.shorthand,
        kernel.name()
    );

    loop {
        let n = read_some(reader, &mut input[filled..]).map_err(Error::Read)?;
        let eof = n == 0;
        if !eof {
            let fresh = &mut input[filled..filled + n];
            filled += if config.ignore_invalid {
                filter::filter(fresh, alphabet)
            } else {
                strip_newlines(fresh)
            };
            if filled < capacity {
                continue;
            }
        }

        let (consumed, written) = match config.format {
            Format::Radix85 if config.shorthand => {
                tuple::decode_shorthand(&input[..filled], &mut output)
            }
            Format::Radix85 => {
                let written = tuple::decode(&input[..filled], &mut output);
                (written / DECODED_TUPLE * ENCODED_TUPLE, written)
            }
            Format::Binary => {
                let written = kernel.decode(&input[..filled], &mut output);
                (written * DIGITS_PER_BYTE, written)
            }
        };
        out.write_all(&output[..written]).map_err(Error::Write)?;

        if eof {
            let tail = &input[consumed..filled];
            if !tail.is_empty() {
                decode_tail(tail, config.format, &mut out)?;
            }
            break;
        }

        input.copy_within(consumed..filled, 0);
        filled -= consumed;
    }

    out.flush().map_err(Error::Write)
}

/// Decode the incomplete group left at end of input.
fn decode_tail(tail: &[u8], format: Format, out: &mut impl Write) -> Result<()> {
    match format {
        Format::Radix85 => {
            let mut group = [ALPHABET_END; ENCODED_TUPLE];
            group[..tail.len()].copy_from_slice(tail);
            let pad = ENCODED_TUPLE - tail.len();
            let bytes = tuple::decode_tuple(&group).to_be_bytes();
            out.write_all(&bytes[..DECODED_TUPLE - pad]).map_err(Error::Write)
        }
        Format::Binary => {
            warn!(
                "dropping {} trailing digit(s) that do not form a whole byte",
                tail.len()
            );
            Ok(())
        }
    }
}

/// Remove line breaks in place. Returns the new length.
fn strip_newlines(buf: &mut [u8]) -> usize {
    let Some(first) = memchr::memchr(b'\n', buf) else {
        return buf.len();
    };
    let mut end = first;
    let mut rp = first + 1;
    while let Some(pos) = memchr::memchr(b'\n', &buf[rp..]) {
        buf.copy_within(rp..rp + pos, end);
        end += pos;
        rp += pos + 1;
    }
    let rest = buf.len() - rp;
    buf.copy_within(rp.., end);
    end + rest
}

/// Write `data` with a newline after every `wrap_col` bytes of output,
/// counting from column `col`. Returns the column after the last byte, so
/// line breaks fall at the same stream offsets however the output is chunked.
/// With `wrap_col == 0` the data is written verbatim and `col` is returned.
pub fn wrap_write(
    out: &mut impl Write,
    data: &[u8],
    wrap_col: usize,
    col: usize,
    wrap_buf: &mut Vec<u8>,
) -> io::Result<usize> {
    if wrap_col == 0 {
        out.write_all(data)?;
        return Ok(col);
    }

    let max = data.len() + data.len() / wrap_col + 1;
    if wrap_buf.len() < max {
        wrap_buf.resize(max, 0);
    }
    let mut col = col.min(wrap_col);
    let wp = build_wrapped_output(data, wrap_col, &mut col, wrap_buf);
    out.write_all(&wrap_buf[..wp])?;
    Ok(col)
}

/// Build wrapped output into a pre-allocated buffer.
/// Returns the number of bytes written to wrap_buf.
/// Updates `col` to track the current column position across calls.
#[inline]
fn build_wrapped_output(
    data: &[u8],
    wrap_col: usize,
    col: &mut usize,
    wrap_buf: &mut [u8],
) -> usize {
    let mut rp = 0;
    let mut wp = 0;

    while rp < data.len() {
        let space = wrap_col - *col;
        let avail = data.len() - rp;

        if avail <= space {
            wrap_buf[wp..wp + avail].copy_from_slice(&data[rp..rp + avail]);
            wp += avail;
            *col += avail;
            if *col == wrap_col {
                wrap_buf[wp] = b'\n';
                wp += 1;
                *col = 0;
            }
            break;
        } else {
            wrap_buf[wp..wp + space].copy_from_slice(&data[rp..rp + space]);
            wp += space;
            wrap_buf[wp] = b'\n';
            wp += 1;
            rp += space;
            *col = 0;
        }
    }

    wp
}
