//! `fbase85`: a radix-85 (ASCII85) encoder and decoder.

/// Use mimalloc as the global allocator for all binaries.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod base85;
pub mod common;
