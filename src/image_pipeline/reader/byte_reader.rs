use crate::image_pipeline::common::error::{DngError, Result};
use super::rational::{Rational, SignedRational};

/// Byte order declared by the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// Seekable, byte-order-aware cursor over the container bytes.
///
/// Every read checks the remaining length first and fails with
/// [`DngError::EndOfData`] instead of panicking.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
    order: ByteOrder,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], order: ByteOrder) -> Self {
        Self { data, position: 0, order }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn seek(&mut self, position: u64) -> Result<()> {
        if position > self.data.len() as u64 {
            return Err(DngError::EndOfData { offset: position, requested: 0 });
        }
        self.position = position as usize;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(DngError::EndOfData { offset: self.position as u64, requested: n })?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Reads `len` bytes at an absolute offset without moving the cursor.
    pub fn slice_at(&self, offset: u64, len: usize) -> Result<&'a [u8]> {
        let start = usize::try_from(offset)
            .map_err(|_| DngError::EndOfData { offset, requested: len })?;
        start
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .map(|end| &self.data[start..end])
            .ok_or(DngError::EndOfData { offset, requested: len })
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_array::<2>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => u16::from_le_bytes(b),
            ByteOrder::BigEndian => u16::from_be_bytes(b),
        })
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_array::<4>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => u32::from_le_bytes(b),
            ByteOrder::BigEndian => u32::from_be_bytes(b),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let b = self.read_array::<8>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => f64::from_le_bytes(b),
            ByteOrder::BigEndian => f64::from_be_bytes(b),
        })
    }

    pub fn read_rational(&mut self) -> Result<Rational> {
        let numerator = self.read_u32()?;
        let denominator = self.read_u32()?;
        Ok(Rational::new(numerator, denominator))
    }

    pub fn read_signed_rational(&mut self) -> Result<SignedRational> {
        let numerator = self.read_i32()?;
        let denominator = self.read_i32()?;
        Ok(SignedRational::new(numerator, denominator))
    }

    /// Reads `count` ASCII bytes; the value ends at the first NUL.
    pub fn read_ascii(&mut self, count: usize) -> Result<String> {
        let bytes = self.read_bytes(count)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}
