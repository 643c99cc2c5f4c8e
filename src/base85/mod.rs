//! Radix-85 (ASCII85) transcoding: the tuple codec, the binary-string bit
//! kernels, the alphabet filter and the streaming driver that ties them to
//! byte sources and sinks.

pub mod bits;
pub mod core;
pub mod error;
pub mod filter;
pub mod tuple;


pub use self::core::{
    Config, DEFAULT_WRAP, Format, decode_stream, decode_to_writer, encode_stream,
    encode_to_writer, parse_wrap_width, run, wrap_write,
};
pub use self::error::{Error, Result};
pub use self::filter::{Alphabet, filter};
