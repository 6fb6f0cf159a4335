use crate::image_pipeline::common::error::{DngError, Result};
use crate::image_pipeline::reader::bit_reader::BitReader;
use crate::image_pipeline::reader::byte_reader::ByteOrder;
use super::{CompressionDecoder, SampleGeometry};

/// Plain samples: 8-bit bytes, 16-bit words in the container's byte order,
/// or MSB-first bit packing with every row starting on a byte boundary.
pub struct UncompressedDecoder;

impl UncompressedDecoder {
    /// Inverse of [`CompressionDecoder::decode`] for the same geometry.
    pub fn encode(samples: &[u16], geometry: &SampleGeometry) -> Vec<u8> {
        match geometry.bits_per_sample {
            8 => samples.iter().map(|&s| s as u8).collect(),
            16 => samples
                .iter()
                .flat_map(|&s| match geometry.byte_order {
                    ByteOrder::LittleEndian => s.to_le_bytes(),
                    ByteOrder::BigEndian => s.to_be_bytes(),
                })
                .collect(),
            bits => {
                let bits = bits as u32;
                let row_len = geometry.width * geometry.samples_per_pixel;
                let mut out = Vec::with_capacity(row_bytes(row_len, bits) * geometry.height);
                for row in samples.chunks(row_len.max(1)) {
                    let mut acc: u64 = 0;
                    let mut filled = 0u32;
                    for &s in row {
                        acc = (acc << bits) | (s as u64 & ((1u64 << bits) - 1));
                        filled += bits;
                        while filled >= 8 {
                            filled -= 8;
                            out.push((acc >> filled) as u8);
                        }
                    }
                    if filled > 0 {
                        out.push((acc << (8 - filled)) as u8);
                    }
                }
                out
            }
        }
    }
}

fn row_bytes(samples: usize, bits: u32) -> usize {
    (samples * bits as usize).div_ceil(8)
}

impl CompressionDecoder for UncompressedDecoder {
    fn decode(&self, data: &[u8], geometry: &SampleGeometry) -> Result<Vec<u16>> {
        let expected = geometry.sample_count();
        match geometry.bits_per_sample {
            8 => {
                let bytes = data.get(..expected).ok_or_else(|| DngError::EndOfData {
                    offset: data.len() as u64,
                    requested: expected - data.len(),
                })?;
                Ok(bytes.iter().map(|&b| b as u16).collect())
            }
            16 => {
                let bytes = data.get(..expected * 2).ok_or_else(|| DngError::EndOfData {
                    offset: data.len() as u64,
                    requested: expected * 2 - data.len(),
                })?;
                Ok(bytes
                    .chunks_exact(2)
                    .map(|b| match geometry.byte_order {
                        ByteOrder::LittleEndian => u16::from_le_bytes([b[0], b[1]]),
                        ByteOrder::BigEndian => u16::from_be_bytes([b[0], b[1]]),
                    })
                    .collect())
            }
            bits @ 1..=15 => {
                let row_len = geometry.width * geometry.samples_per_pixel;
                let stride = row_bytes(row_len, bits as u32);
                let mut out = Vec::with_capacity(expected);
                for row in 0..geometry.height {
                    let start = row * stride;
                    let line = data.get(start..start + stride).ok_or(DngError::EndOfData {
                        offset: start as u64,
                        requested: stride,
                    })?;
                    let mut reader = BitReader::new(line);
                    for _ in 0..row_len {
                        out.push(reader.read_unsigned_bits(bits as u32)? as u16);
                    }
                }
                Ok(out)
            }
            other => Err(DngError::UnsupportedFormat(format!("{other} bits per sample"))),
        }
    }
}
