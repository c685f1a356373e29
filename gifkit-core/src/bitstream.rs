//! LSB-first bit packing.
//!
//! GIF packs variable-width LZW codes least-significant-bit first: the first
//! code occupies the low bits of the first byte and spills into the low bits of
//! the following bytes. Codes are at most 12 bits wide.

use std::io::{self, Write};

/// Widest code either side of the codec packs.
pub const MAX_CODE_BITS: u8 = 16;

/// Incremental LSB-first code reader.
///
/// The reader does not own its input. Bytes are pulled from the front of the
/// slice handed to [`LsbReader::read_code`], and bits left over at the end of
/// one slice carry into the next call. This lets a code straddle two GIF
/// sub-blocks.
#[derive(Debug, Clone, Default)]
pub struct LsbReader {
    bits: u32,
    nbits: u8,
}

impl LsbReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any buffered bits.
    pub fn reset(&mut self) {
        self.bits = 0;
        self.nbits = 0;
    }

    /// Number of bits buffered but not yet returned.
    pub fn pending_bits(&self) -> u8 {
        self.nbits
    }

    /// Read one `width`-bit code.
    ///
    /// Returns `None` when `input` runs out before the code is complete. The
    /// bytes consumed so far stay buffered for the next call.
    pub fn read_code(&mut self, width: u8, input: &mut &[u8]) -> Option<u16> {
        debug_assert!(width > 0 && width <= MAX_CODE_BITS);

        while self.nbits < width {
            let (&byte, rest) = input.split_first()?;
            *input = rest;
            self.bits |= u32::from(byte) << self.nbits;
            self.nbits += 8;
        }

        let code = (self.bits & ((1u32 << width) - 1)) as u16;
        self.bits >>= width;
        self.nbits -= width;
        Some(code)
    }
}

/// LSB-first code writer over any byte sink.
#[derive(Debug)]
pub struct LsbWriter<W: Write> {
    inner: W,
    bits: u32,
    nbits: u8,
}

impl<W: Write> LsbWriter<W> {
    /// Create a writer that emits whole bytes to `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bits: 0,
            nbits: 0,
        }
    }

    /// Append a `width`-bit code.
    pub fn write_code(&mut self, code: u16, width: u8) -> io::Result<()> {
        debug_assert!(width > 0 && width <= MAX_CODE_BITS);
        debug_assert!(u32::from(code) < (1u32 << width));

        self.bits |= u32::from(code) << self.nbits;
        self.nbits += width;
        while self.nbits >= 8 {
            self.inner.write_all(&[self.bits as u8])?;
            self.bits >>= 8;
            self.nbits -= 8;
        }
        Ok(())
    }

    /// Emit the final partial byte, zero-padded in its high bits.
    pub fn flush_partial(&mut self) -> io::Result<()> {
        if self.nbits > 0 {
            self.inner.write_all(&[self.bits as u8])?;
            self.bits = 0;
            self.nbits = 0;
        }
        Ok(())
    }

    /// Get a reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Take the underlying sink. Unflushed partial bits are discarded.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
