use crate::image_pipeline::common::error::{CompressionError, DngError, Result};
use crate::image_pipeline::reader::bit_reader::BitReader;

/// Canonical JPEG Huffman table (ITU T.81 Annex C / F.2.2.3).
///
/// Codes are assigned in order of increasing length; within a length they
/// are consecutive. `max_code[l]` is the largest code of length `l`, or -1
/// when no code has that length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTable {
    min_code: [i32; 17],
    max_code: [i32; 17],
    val_ptr: [usize; 17],
    values: Vec<u8>,
}

impl HuffmanTable {
    /// `counts[i]` is the number of codes of length `i + 1`.
    pub fn new(counts: &[u8; 16], values: &[u8]) -> std::result::Result<Self, CompressionError> {
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total != values.len() {
            return Err(CompressionError::MalformedHuffmanTable(format!(
                "{} code lengths but {} values",
                total,
                values.len()
            )));
        }

        let mut min_code = [0i32; 17];
        let mut max_code = [-1i32; 17];
        let mut val_ptr = [0usize; 17];
        let mut code: i32 = 0;
        let mut k = 0usize;
        for len in 1..=16 {
            let n = counts[len - 1] as usize;
            if n > 0 {
                val_ptr[len] = k;
                min_code[len] = code;
                code += n as i32;
                k += n;
                if code > (1 << len) {
                    return Err(CompressionError::MalformedHuffmanTable(format!(
                        "too many codes of length {len}"
                    )));
                }
                max_code[len] = code - 1;
            }
            code <<= 1;
        }

        Ok(Self { min_code, max_code, val_ptr, values: values.to_vec() })
    }

    /// Decodes one symbol, reading one bit at a time.
    pub fn decode(&self, bits: &mut BitReader<'_>) -> Result<u8> {
        let mut code = bits.read_bit()? as i32;
        let mut len = 1usize;
        while len <= 16 && code > self.max_code[len] {
            code = (code << 1) | bits.read_bit()? as i32;
            len += 1;
        }
        if len > 16 {
            return Err(DngError::Compression(CompressionError::InvalidHuffmanCode));
        }
        let idx = self.val_ptr[len] + (code - self.min_code[len]) as usize;
        Ok(self.values[idx])
    }

    /// (code, length) for every symbol, in canonical order. Used by the
    /// encoder side of the test fixtures.
    pub fn codes(&self) -> Vec<(u8, u16, u8)> {
        let mut out = Vec::with_capacity(self.values.len());
        for len in 1..=16usize {
            if self.max_code[len] < 0 {
                continue;
            }
            for code in self.min_code[len]..=self.max_code[len] {
                let idx = self.val_ptr[len] + (code - self.min_code[len]) as usize;
                out.push((self.values[idx], code as u16, len as u8));
            }
        }
        out
    }
}
