//! Variable-width LZW as used by GIF image data.
//!
//! Codes are packed LSB-first, start one bit wider than the minimum code size
//! and grow to at most 12 bits. The first two codes past the literals are the
//! clear code and the end-of-information code.

mod decoder;
mod encoder;

pub use decoder::{DecodeStatus, LzwDecoder};
pub use encoder::LzwEncoder;

use gifkit_core::{LzwError, Result};

/// Widest code GIF allows.
pub const MAX_CODE_WIDTH: u8 = 12;

/// Dictionary capacity implied by [`MAX_CODE_WIDTH`].
pub const MAX_CODES: usize = 1 << MAX_CODE_WIDTH;

/// Smallest minimum code size a GIF may declare.
pub const MIN_CODE_SIZE: u8 = 2;

/// Largest minimum code size a GIF may declare.
pub const MAX_CODE_SIZE: u8 = 8;

/// Minimum code size needed to address every index of a `palette_len` table.
pub fn min_code_size(palette_len: usize) -> u8 {
    let max_index = palette_len.saturating_sub(1);
    let bits = (usize::BITS - max_index.leading_zeros()) as u8;
    bits.clamp(MIN_CODE_SIZE, MAX_CODE_SIZE)
}

pub(crate) fn check_code_size(code_size: u8) -> Result<()> {
    if !(MIN_CODE_SIZE..=MAX_CODE_SIZE).contains(&code_size) {
        return Err(LzwError::InvalidCodeSize(code_size).into());
    }
    Ok(())
}

/// Decode a complete code stream into a new buffer.
///
/// A stream that ends without an end-of-information code yields whatever was
/// decoded up to that point.
pub fn decode(code_size: u8, data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = LzwDecoder::new();
    decoder.begin(code_size)?;
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder.decode(data, |chunk| out.extend_from_slice(chunk))?;
    Ok(out)
}

/// Encode `data` into a new buffer.
pub fn encode(code_size: u8, data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2 + 4);
    LzwEncoder::new().encode(code_size, data, &mut out)?;
    Ok(out)
}
