use crate::image_pipeline::common::error::{DngError, Result};

/// MSB-first bit cursor over a byte buffer.
///
/// With byte stuffing enabled a `0x00` following a `0xFF` is dropped, and
/// a `0xFF` followed by anything else is treated as a marker that ends the
/// stream.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    current: u8,
    bits_left: u8,
    skip_stuffing: bool,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_stuffing(data, false)
    }

    pub fn with_stuffing(data: &'a [u8], skip_stuffing: bool) -> Self {
        Self { data, position: 0, current: 0, bits_left: 0, skip_stuffing }
    }

    fn exhausted(&self, requested: usize) -> DngError {
        DngError::EndOfData { offset: self.position as u64, requested }
    }

    fn next_byte(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.position).ok_or_else(|| self.exhausted(1))?;
        if self.skip_stuffing && byte == 0xFF {
            match self.data.get(self.position + 1) {
                Some(0x00) => self.position += 2,
                _ => return Err(self.exhausted(1)),
            }
        } else {
            self.position += 1;
        }
        Ok(byte)
    }

    pub fn read_bit(&mut self) -> Result<u32> {
        if self.bits_left == 0 {
            self.current = self.next_byte()?;
            self.bits_left = 8;
        }
        self.bits_left -= 1;
        Ok(((self.current >> self.bits_left) & 1) as u32)
    }

    /// Reads `n <= 32` bits as an unsigned value.
    ///
    /// Whole bytes are taken directly once the cursor is byte aligned.
    pub fn read_unsigned_bits(&mut self, mut n: u32) -> Result<u32> {
        debug_assert!(n <= 32);
        let mut value: u64 = 0;
        while self.bits_left > 0 && n > 0 {
            value = (value << 1) | self.read_bit()? as u64;
            n -= 1;
        }
        while n >= 8 {
            value = (value << 8) | self.next_byte()? as u64;
            n -= 8;
        }
        while n > 0 {
            value = (value << 1) | self.read_bit()? as u64;
            n -= 1;
        }
        Ok(value as u32)
    }

    /// Reads an `n`-bit JPEG magnitude-category value.
    ///
    /// Values whose top bit is clear are negative: `v - (2^n - 1)`.
    pub fn read_signed_bits(&mut self, n: u32) -> Result<i32> {
        if n == 0 {
            return Ok(0);
        }
        let bits = self.read_unsigned_bits(n)? as i64;
        if bits & (1 << (n - 1)) == 0 {
            Ok((bits - ((1i64 << n) - 1)) as i32)
        } else {
            Ok(bits as i32)
        }
    }
}
