use gifkit_core::{LsbReader, LzwError, Result};

use super::{check_code_size, MAX_CODES, MAX_CODE_WIDTH};

/// Decoded bytes are handed to the sink once this many have accumulated.
const FLUSH_THRESHOLD: usize = MAX_CODES;

/// Outcome of feeding input to [`LzwDecoder::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// The end-of-information code was read. Further input is ignored.
    Done,
    /// Input ran out before the end-of-information code.
    NeedMore,
}

/// Streaming GIF LZW decoder.
///
/// The dictionary is stored as parallel prefix/suffix tables. Expansions are
/// written backward into a scratch buffer, so a decode never allocates once
/// the decoder is constructed. One decoder can be reused across images by
/// calling [`LzwDecoder::begin`] before each.
#[derive(Debug, Clone)]
pub struct LzwDecoder {
    code_size: u8,
    width: u8,
    clear: u16,
    end: u16,
    hi: u16,
    overflow: u16,
    last: Option<u16>,
    finished: bool,
    reader: LsbReader,
    suffix: Vec<u8>,
    prefix: Vec<u16>,
    scratch: Vec<u8>,
    output: Vec<u8>,
}

impl Default for LzwDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LzwDecoder {
    /// Create a decoder. Call [`LzwDecoder::begin`] before decoding.
    pub fn new() -> Self {
        Self {
            code_size: 0,
            width: 0,
            clear: 0,
            end: 0,
            hi: 0,
            overflow: 0,
            last: None,
            finished: true,
            reader: LsbReader::new(),
            suffix: vec![0; MAX_CODES],
            prefix: vec![0; MAX_CODES],
            scratch: vec![0; MAX_CODES],
            output: Vec::with_capacity(FLUSH_THRESHOLD * 2),
        }
    }

    /// Reset for a new code stream with the given minimum code size.
    pub fn begin(&mut self, code_size: u8) -> Result<()> {
        check_code_size(code_size)?;
        self.code_size = code_size;
        self.clear = 1 << code_size;
        self.end = self.clear + 1;
        self.reset_table();
        self.finished = false;
        self.reader.reset();
        self.output.clear();
        Ok(())
    }

    /// Whether the end-of-information code has been read.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn reset_table(&mut self) {
        self.width = self.code_size + 1;
        self.hi = self.end;
        self.overflow = 1 << self.width;
        self.last = None;
    }

    /// Decode as much of `input` as possible, passing output to `sink`.
    ///
    /// Bits of a code split across calls are carried over, so the sub-blocks
    /// of one image can be fed one at a time.
    pub fn decode<F>(&mut self, mut input: &[u8], mut sink: F) -> Result<DecodeStatus>
    where
        F: FnMut(&[u8]),
    {
        if self.finished {
            return Ok(DecodeStatus::Done);
        }

        let status = loop {
            let Some(code) = self.reader.read_code(self.width, &mut input) else {
                break DecodeStatus::NeedMore;
            };

            if code == self.clear {
                self.reset_table();
                continue;
            }
            if code == self.end {
                self.finished = true;
                break DecodeStatus::Done;
            }

            if code < self.clear {
                self.output.push(code as u8);
                if let Some(last) = self.last {
                    self.add_entry(last, code as u8);
                }
            } else if code <= self.hi {
                let first = self.expand(code)?;
                if let Some(last) = self.last {
                    self.add_entry(last, first);
                }
            } else {
                self.flush(&mut sink);
                return Err(LzwError::InvalidCode {
                    code,
                    next_free: self.hi,
                }
                .into());
            }

            self.last = Some(code);
            // Once all 4096 slots are defined the table stops growing until
            // the stream sends a clear; every defined code stays valid.
            if !self.is_full() {
                self.hi += 1;
                if self.hi >= self.overflow && self.width < MAX_CODE_WIDTH {
                    self.width += 1;
                    self.overflow <<= 1;
                }
            }

            if self.output.len() >= FLUSH_THRESHOLD {
                self.flush(&mut sink);
            }
        };

        self.flush(&mut sink);
        Ok(status)
    }

    /// Append the expansion of `code` to the output and return its first byte.
    fn expand(&mut self, code: u16) -> Result<u8> {
        let mut i = self.scratch.len();
        let mut c = code;

        if code == self.hi {
            // KwKwK: the previous expansion followed by its own first byte.
            let Some(last) = self.last else {
                return Err(LzwError::InvalidCode {
                    code,
                    next_free: self.hi,
                }
                .into());
            };
            let mut head = last;
            while head >= self.clear {
                head = self.prefix[head as usize];
            }
            i -= 1;
            self.scratch[i] = head as u8;
            c = last;
        }

        while c >= self.clear {
            i -= 1;
            self.scratch[i] = self.suffix[c as usize];
            c = self.prefix[c as usize];
        }
        i -= 1;
        self.scratch[i] = c as u8;

        self.output.extend_from_slice(&self.scratch[i..]);
        Ok(c as u8)
    }

    fn is_full(&self) -> bool {
        usize::from(self.hi) >= MAX_CODES
    }

    fn add_entry(&mut self, prefix: u16, suffix: u8) {
        if self.is_full() {
            return;
        }
        let slot = self.hi as usize;
        self.prefix[slot] = prefix;
        self.suffix[slot] = suffix;
    }

    fn flush<F: FnMut(&[u8])>(&mut self, sink: &mut F) {
        if !self.output.is_empty() {
            sink(&self.output);
            self.output.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gifkit_core::{Error, LsbWriter};

    fn pack(codes: &[(u16, u8)]) -> Vec<u8> {
        let mut writer = LsbWriter::new(Vec::new());
        for &(code, width) in codes {
            writer.write_code(code, width).unwrap();
        }
        writer.flush_partial().unwrap();
        writer.into_inner()
    }

    fn decode_all(code_size: u8, data: &[u8]) -> (Vec<u8>, DecodeStatus) {
        let mut decoder = LzwDecoder::new();
        decoder.begin(code_size).unwrap();
        let mut out = Vec::new();
        let status = decoder.decode(data, |c| out.extend_from_slice(c)).unwrap();
        (out, status)
    }

    #[test]
    fn test_literals() {
        // clear, 1, 1, 1, 1, end with code size 2
        let data = pack(&[(4, 3), (1, 3), (1, 3), (1, 3), (1, 4), (5, 4)]);
        let (out, status) = decode_all(2, &data);
        assert_eq!(out, vec![1, 1, 1, 1]);
        assert_eq!(status, DecodeStatus::Done);
    }

    #[test]
    fn test_kwkwk() {
        // clear, 0, then code 6 (== hi) expands to 0 0
        let data = pack(&[(4, 3), (0, 3), (6, 3), (5, 3)]);
        let (out, _) = decode_all(2, &data);
        assert_eq!(out, vec![0, 0, 0]);
    }

    #[test]
    fn test_dictionary_reference() {
        // 0 1 then code 6 = "0 1"
        let data = pack(&[(4, 3), (0, 3), (1, 3), (6, 3), (5, 4)]);
        let (out, _) = decode_all(2, &data);
        assert_eq!(out, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_invalid_code() {
        let data = pack(&[(4, 3), (0, 3), (7, 3)]);
        let mut decoder = LzwDecoder::new();
        decoder.begin(2).unwrap();
        let mut out = Vec::new();
        let err = decoder
            .decode(&data, |c| out.extend_from_slice(c))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Lzw(LzwError::InvalidCode { code: 7, next_free: 6 })
        ));
        assert_eq!(out, vec![0]);
    }

    #[test]
    fn test_hi_code_right_after_clear() {
        // After a clear, hi == end, so the next code can't reference hi
        let data = pack(&[(4, 3), (6, 3)]);
        let mut decoder = LzwDecoder::new();
        decoder.begin(2).unwrap();
        assert!(decoder.decode(&data, |_| {}).is_err());
    }

    #[test]
    fn test_need_more_then_resume() {
        let data = pack(&[(4, 3), (1, 3), (2, 3), (3, 3), (5, 4)]);
        let mut decoder = LzwDecoder::new();
        decoder.begin(2).unwrap();
        let mut out = Vec::new();

        let (head, tail) = data.split_at(1);
        let status = decoder.decode(head, |c| out.extend_from_slice(c)).unwrap();
        assert_eq!(status, DecodeStatus::NeedMore);
        let status = decoder.decode(tail, |c| out.extend_from_slice(c)).unwrap();
        assert_eq!(status, DecodeStatus::Done);
        assert!(decoder.is_finished());
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn test_input_after_end_ignored() {
        let mut data = pack(&[(4, 3), (2, 3), (5, 3)]);
        data.extend_from_slice(&[0xFF, 0xFF]);
        let (out, status) = decode_all(2, &data);
        assert_eq!(out, vec![2]);
        assert_eq!(status, DecodeStatus::Done);
    }

    /// Clear followed by `count` literal 1s at code size 2, tracking the
    /// code width the decoder expects. Returns the codes and the final width.
    fn literal_ones(count: usize) -> (Vec<(u16, u8)>, u8) {
        let mut codes = vec![(4u16, 3u8)];
        let (mut hi, mut width) = (5u32, 3u8);
        for _ in 0..count {
            codes.push((1, width));
            if hi < 4096 {
                hi += 1;
                if hi >= 1 << width && width < 12 {
                    width += 1;
                }
            }
        }
        (codes, width)
    }

    #[test]
    fn test_full_table_stops_growing() {
        // Literals only, never a second clear: the table fills and the
        // stream continues at width 12.
        let (mut codes, width) = literal_ones(5000);
        assert_eq!(width, 12);
        codes.push((5, width));

        let (out, status) = decode_all(2, &pack(&codes));
        assert_eq!(status, DecodeStatus::Done);
        assert_eq!(out, vec![1u8; 5000]);
    }

    #[test]
    fn test_last_slot_usable_after_table_fills() {
        // 4091 literals define slots 6..=4095, each "1 1". Code 4095 is
        // then an ordinary dictionary reference.
        let (mut codes, width) = literal_ones(4091);
        assert_eq!(width, 12);
        codes.push((4095, 12));
        codes.push((4094, 12));
        codes.push((5, 12));

        let (out, status) = decode_all(2, &pack(&codes));
        assert_eq!(status, DecodeStatus::Done);
        assert_eq!(out, vec![1u8; 4091 + 2 + 2]);
    }

    #[test]
    fn test_clear_after_full_table_resets_width() {
        let (mut codes, _) = literal_ones(4200);
        codes.push((4, 12));
        codes.push((2, 3));
        codes.push((6, 3));
        codes.push((5, 3));

        let (out, status) = decode_all(2, &pack(&codes));
        assert_eq!(status, DecodeStatus::Done);
        let mut expected = vec![1u8; 4200];
        expected.extend_from_slice(&[2, 2, 2]);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_reuse_after_error() {
        let mut decoder = LzwDecoder::new();
        decoder.begin(2).unwrap();
        let bad = pack(&[(4, 3), (7, 3)]);
        assert!(decoder.decode(&bad, |_| {}).is_err());

        decoder.begin(2).unwrap();
        let good = pack(&[(4, 3), (3, 3), (5, 3)]);
        let mut out = Vec::new();
        decoder.decode(&good, |c| out.extend_from_slice(c)).unwrap();
        assert_eq!(out, vec![3]);
    }
}
