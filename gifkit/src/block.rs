//! GIF sub-block framing.
//!
//! Image data and extension payloads travel as a chain of sub-blocks, each a
//! length byte (1-255) followed by that many bytes. A zero length byte ends
//! the chain.

use std::io::{self, Write};

use gifkit_core::{Error, Result};

/// Largest payload a single sub-block can carry.
pub const MAX_SUB_BLOCK_LEN: usize = 255;

/// Iterator over the sub-blocks of one chain.
///
/// Yields each payload as a borrowed slice. A declared length running past the
/// end of the data, or data ending before the terminator, yields a truncation
/// error and ends iteration.
#[derive(Debug, Clone)]
pub struct SubBlocks<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
    terminated: bool,
}

impl<'a> SubBlocks<'a> {
    /// Start reading a chain whose first length byte is at `pos`.
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos,
            done: false,
            terminated: false,
        }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether the zero-length terminator has been consumed.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Consume the remainder of the chain, returning the offset past the terminator.
    pub fn skip_all(mut self) -> Result<usize> {
        for block in self.by_ref() {
            block?;
        }
        Ok(self.pos)
    }
}

impl<'a> Iterator for SubBlocks<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let Some(&len) = self.data.get(self.pos) else {
            self.done = true;
            return Some(Err(Error::truncated(self.pos, 1, 0)));
        };
        let len = len as usize;
        let start = self.pos + 1;

        if len == 0 {
            self.done = true;
            self.terminated = true;
            self.pos = start;
            return None;
        }

        let available = self.data.len().saturating_sub(start);
        if available < len {
            self.done = true;
            return Some(Err(Error::truncated(start, len, available)));
        }

        self.pos = start + len;
        Some(Ok(&self.data[start..start + len]))
    }
}

/// Buffers arbitrary output and emits it as 255-byte sub-blocks.
///
/// Call [`SubBlockWriter::terminate`] to emit the final short block and the
/// zero terminator. The internal buffer can be recovered from `terminate` and
/// handed to the next writer to avoid reallocating per image.
#[derive(Debug)]
pub struct SubBlockWriter<W: Write> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: Write> SubBlockWriter<W> {
    /// Create a writer with a fresh buffer.
    pub fn new(inner: W) -> Self {
        Self::with_buffer(inner, Vec::with_capacity(MAX_SUB_BLOCK_LEN * 2))
    }

    /// Create a writer reusing `buffer`. Its contents are discarded.
    pub fn with_buffer(inner: W, mut buffer: Vec<u8>) -> Self {
        buffer.clear();
        Self { inner, buffer }
    }

    /// Flush the remainder as a final block, write the terminator, and return
    /// the sink together with the emptied buffer.
    pub fn terminate(mut self) -> io::Result<(W, Vec<u8>)> {
        self.write_full_blocks()?;
        if !self.buffer.is_empty() {
            self.inner.write_all(&[self.buffer.len() as u8])?;
            self.inner.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        self.inner.write_all(&[0])?;
        Ok((self.inner, self.buffer))
    }

    fn write_full_blocks(&mut self) -> io::Result<()> {
        let full = self.buffer.len() / MAX_SUB_BLOCK_LEN * MAX_SUB_BLOCK_LEN;
        if full == 0 {
            return Ok(());
        }
        for block in self.buffer[..full].chunks_exact(MAX_SUB_BLOCK_LEN) {
            self.inner.write_all(&[MAX_SUB_BLOCK_LEN as u8])?;
            self.inner.write_all(block)?;
        }
        self.buffer.drain(..full);
        Ok(())
    }
}

impl<W: Write> Write for SubBlockWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.write_full_blocks()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Write `data` as a complete, terminated sub-block chain.
pub fn write_sub_blocks<W: Write>(output: W, data: &[u8]) -> io::Result<W> {
    let mut writer = SubBlockWriter::new(output);
    writer.write_all(data)?;
    writer.terminate().map(|(inner, _)| inner)
}
