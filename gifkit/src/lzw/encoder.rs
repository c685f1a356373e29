use std::io::Write;

use gifkit_core::{LsbWriter, LzwError, Result};

use super::{check_code_size, MAX_CODES};

/// Open-addressed hash table size. Four slots per code keeps probe chains short.
const TABLE_SIZE: usize = 4 * MAX_CODES;
const TABLE_MASK: u32 = TABLE_SIZE as u32 - 1;
const EMPTY: u32 = u32::MAX;
const MAX_CODE: u32 = MAX_CODES as u32 - 1;

/// GIF LZW encoder.
///
/// Dictionary entries are keyed by `(prefix code, next literal)` and stored in
/// an open-addressed table as `key << 12 | code`. When the dictionary reaches
/// 4095 entries a clear code is emitted and the table starts over. The table
/// allocation is kept between calls.
#[derive(Debug, Clone)]
pub struct LzwEncoder {
    table: Vec<u32>,
}

impl Default for LzwEncoder {
    fn default() -> Self {
        Self::new()
    }
}

struct State {
    clear: u32,
    end: u32,
    width: u8,
    hi: u32,
    overflow: u32,
    code_size: u8,
}

impl State {
    fn new(code_size: u8) -> Self {
        let clear = 1u32 << code_size;
        Self {
            clear,
            end: clear + 1,
            width: code_size + 1,
            hi: clear + 1,
            overflow: clear << 1,
            code_size,
        }
    }
}

impl LzwEncoder {
    /// Create an encoder.
    pub fn new() -> Self {
        Self {
            table: vec![EMPTY; TABLE_SIZE],
        }
    }

    /// Encode `data` as one complete code stream written to `output`.
    ///
    /// The stream starts with a clear code and ends with the
    /// end-of-information code, padded to a whole byte. Every byte of `data`
    /// must be below `1 << code_size`.
    pub fn encode<W: Write>(&mut self, code_size: u8, data: &[u8], output: W) -> Result<()> {
        check_code_size(code_size)?;
        let max_literal = (1u32 << code_size) - 1;
        if let Some(&value) = data.iter().find(|&&b| u32::from(b) > max_literal) {
            return Err(LzwError::LiteralOutOfRange { value, code_size }.into());
        }

        self.table.fill(EMPTY);
        let mut state = State::new(code_size);
        let mut writer = LsbWriter::new(output);
        writer.write_code(state.clear as u16, state.width)?;

        let Some((&first, rest)) = data.split_first() else {
            writer.write_code(state.end as u16, state.width)?;
            writer.flush_partial()?;
            return Ok(());
        };

        let mut code = u32::from(first);
        'next: for &byte in rest {
            let literal = u32::from(byte);
            let key = (code << 8) | literal;
            let mut hash = ((key >> 12) ^ key) & TABLE_MASK;

            let mut probe = hash;
            loop {
                let entry = self.table[probe as usize];
                if entry == EMPTY {
                    break;
                }
                if entry >> 12 == key {
                    code = entry & MAX_CODE;
                    continue 'next;
                }
                probe = (probe + 1) & TABLE_MASK;
            }

            writer.write_code(code as u16, state.width)?;
            code = literal;
            if self.inc_hi(&mut state, &mut writer)? {
                continue;
            }

            while self.table[hash as usize] != EMPTY {
                hash = (hash + 1) & TABLE_MASK;
            }
            self.table[hash as usize] = (key << 12) | state.hi;
        }

        writer.write_code(code as u16, state.width)?;
        self.inc_hi(&mut state, &mut writer)?;
        writer.write_code(state.end as u16, state.width)?;
        writer.flush_partial()?;
        Ok(())
    }

    /// Advance the next free code. Returns `true` when the dictionary was
    /// full and a clear code has been emitted.
    fn inc_hi<W: Write>(&mut self, state: &mut State, writer: &mut LsbWriter<W>) -> Result<bool> {
        state.hi += 1;
        if state.hi == state.overflow {
            state.width += 1;
            state.overflow <<= 1;
        }
        if state.hi == MAX_CODE {
            writer.write_code(state.clear as u16, state.width)?;
            *state = State::new(state.code_size);
            self.table.fill(EMPTY);
            return Ok(true);
        }
        Ok(false)
    }
}
