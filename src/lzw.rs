//! Variable-width LZW compression as used by GIF image data
//!
//! Codes are packed least significant bit first. The stream opens with a
//! Clear Code, and another one is emitted each time the code table fills
//! its 4096 entries. Code width starts at `min_code_size + 1` and grows
//! up to 12 bits. The output never depends on anything but the input, so
//! identical index sequences compress to identical bytes.
use std::collections::HashMap;
use std::io::{self, Write};

use crate::error::EncodingError;

const MAX_CODESIZE: u8 = 12;
const MAX_ENTRIES: u16 = 1 << MAX_CODESIZE;
/// GIF caps data sub-blocks at 255 bytes
const MAX_SUB_BLOCK: usize = 0xFF;

/// Compresses `indices` and frames the result as GIF data sub-blocks,
/// including the zero-length terminator.
pub fn compress(indices: &[u8], min_code_size: u8) -> Result<Vec<u8>, EncodingError> {
    let mut enc = LzwEncoder::new(BlockWriter::new(Vec::new()), min_code_size)?;
    enc.encode_bytes(indices)?;
    Ok(enc.finish()?.finish()?)
}

/// Writes bits into bytes, lowest bit first
struct LsbWriter<W: Write> {
    w: W,
    acc: u32,
    bits: u8,
}

impl<W: Write> LsbWriter<W> {
    fn new(w: W) -> LsbWriter<W> {
        LsbWriter { w, acc: 0, bits: 0 }
    }

    fn write_bits(&mut self, code: u16, n: u8) -> io::Result<()> {
        self.acc |= (code as u32) << self.bits;
        self.bits += n;
        while self.bits >= 8 {
            self.w.write_all(&[self.acc as u8])?;
            self.acc >>= 8;
            self.bits -= 8;
        }
        Ok(())
    }

    fn finish(mut self) -> io::Result<W> {
        if self.bits > 0 {
            self.w.write_all(&[self.acc as u8])?;
        }
        Ok(self.w)
    }
}

/// String table keyed by (prefix code, next index)
struct CodeTable {
    map: HashMap<(u16, u8), u16>,
    next_code: u16,
    first_free: u16,
}

impl CodeTable {
    fn new(end_code: u16) -> CodeTable {
        CodeTable {
            map: HashMap::with_capacity(MAX_ENTRIES as usize),
            next_code: end_code + 1,
            first_free: end_code + 1,
        }
    }

    fn reset(&mut self) {
        self.map.clear();
        self.next_code = self.first_free;
    }

    fn get(&self, prefix: u16, k: u8) -> Option<u16> {
        self.map.get(&(prefix, k)).copied()
    }

    fn is_full(&self) -> bool {
        self.next_code >= MAX_ENTRIES
    }

    fn insert(&mut self, prefix: u16, k: u8) {
        self.map.insert((prefix, k), self.next_code);
        self.next_code += 1;
    }
}

/// Streaming LZW encoder
pub struct LzwEncoder<W: Write> {
    w: LsbWriter<W>,
    table: CodeTable,
    min_code_size: u8,
    code_size: u8,
    clear_code: u16,
    end_code: u16,
    prefix: Option<u16>,
}

impl<W: Write> LzwEncoder<W> {
    /// Starts a new code stream and emits the initial Clear Code.
    pub fn new(w: W, min_code_size: u8) -> Result<LzwEncoder<W>, EncodingError> {
        if !(2..=8).contains(&min_code_size) {
            return Err(EncodingError::Lzw("minimum code size must be within 2..=8"));
        }
        let clear_code = 1u16 << min_code_size;
        let end_code = clear_code + 1;
        let mut enc = LzwEncoder {
            w: LsbWriter::new(w),
            table: CodeTable::new(end_code),
            min_code_size,
            code_size: min_code_size + 1,
            clear_code,
            end_code,
            prefix: None,
        };
        enc.w.write_bits(clear_code, enc.code_size)?;
        Ok(enc)
    }

    /// Feeds more indices into the stream. May be called repeatedly.
    pub fn encode_bytes(&mut self, data: &[u8]) -> Result<(), EncodingError> {
        for &k in data {
            if k as u16 >= self.clear_code {
                return Err(EncodingError::IndexOutOfRange {
                    index: k,
                    min_code_size: self.min_code_size,
                });
            }
            let prefix = match self.prefix {
                None => {
                    self.prefix = Some(k as u16);
                    continue;
                }
                Some(prefix) => prefix,
            };
            if let Some(code) = self.table.get(prefix, k) {
                self.prefix = Some(code);
                continue;
            }
            self.w.write_bits(prefix, self.code_size)?;
            if self.table.is_full() {
                self.w.write_bits(self.clear_code, self.code_size)?;
                self.table.reset();
                self.code_size = self.min_code_size + 1;
            } else {
                self.table.insert(prefix, k);
                if self.table.next_code > (1 << self.code_size) && self.code_size < MAX_CODESIZE {
                    self.code_size += 1;
                }
            }
            self.prefix = Some(k as u16);
        }
        Ok(())
    }

    /// Flushes the pending string, writes End-of-Information and returns the sink.
    pub fn finish(mut self) -> Result<W, EncodingError> {
        if let Some(prefix) = self.prefix.take() {
            self.w.write_bits(prefix, self.code_size)?;
            // A decoder adds one more entry on reading the last code and widens
            // before it reads End-of-Information.
            if self.table.next_code >= (1 << self.code_size) && self.code_size < MAX_CODESIZE {
                self.code_size += 1;
            }
        }
        self.w.write_bits(self.end_code, self.code_size)?;
        Ok(self.w.finish()?)
    }
}

/// Frames everything written to it as length-prefixed sub-blocks
pub struct BlockWriter<W: Write> {
    w: W,
    buf: Vec<u8>,
}

impl<W: Write> BlockWriter<W> {
    pub fn new(w: W) -> BlockWriter<W> {
        BlockWriter {
            w,
            buf: Vec::with_capacity(MAX_SUB_BLOCK),
        }
    }

    fn flush_block(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.w.write_all(&[self.buf.len() as u8])?;
            self.w.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    /// Writes the pending partial block and the block terminator.
    pub fn finish(mut self) -> io::Result<W> {
        self.flush_block()?;
        self.w.write_all(&[0])?;
        Ok(self.w)
    }
}

impl<W: Write> Write for BlockWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = data.len().min(MAX_SUB_BLOCK - self.buf.len());
        self.buf.extend_from_slice(&data[..n]);
        if self.buf.len() == MAX_SUB_BLOCK {
            self.flush_block()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.w.flush()
    }
}
