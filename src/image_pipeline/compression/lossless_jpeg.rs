use tracing::trace;

use crate::image_pipeline::common::error::{CompressionError, DngError, Result};
use crate::image_pipeline::reader::bit_reader::BitReader;
use crate::image_pipeline::reader::byte_reader::{ByteOrder, ByteReader};
use super::huffman::HuffmanTable;
use super::{CompressionDecoder, SampleGeometry};

const SOI: u16 = 0xFFD8;
const EOI: u16 = 0xFFD9;
const SOF3: u16 = 0xFFC3;
const DHT: u16 = 0xFFC4;
const SOS: u16 = 0xFFDA;

#[derive(Debug, Clone)]
struct Frame {
    precision: u8,
    lines: usize,
    samples_per_line: usize,
    component_ids: Vec<u8>,
}

/// Lossless JPEG (ITU T.81 process 14) as used by DNG: one frame, one
/// scan, predictor 1, no restart intervals.
pub struct LosslessJpegDecoder;

impl LosslessJpegDecoder {
    /// Decodes a complete JPEG stream into `lines * samples_per_line *
    /// components` samples in interleaved row-major order.
    pub fn decode_stream(data: &[u8]) -> Result<(Vec<u16>, usize)> {
        let mut reader = ByteReader::new(data, ByteOrder::BigEndian);
        if reader.read_u16().ok() != Some(SOI) {
            return Err(CompressionError::MissingStartOfImage.into());
        }

        let mut tables: [Option<HuffmanTable>; 4] = Default::default();
        let mut frame: Option<Frame> = None;

        loop {
            let marker = next_marker(&mut reader)?;
            match marker {
                SOF3 => {
                    let length = reader.read_u16()? as usize;
                    let precision = reader.read_u8()?;
                    let lines = reader.read_u16()? as usize;
                    let samples_per_line = reader.read_u16()? as usize;
                    let components = reader.read_u8()? as usize;
                    if !(2..=16).contains(&precision) {
                        return Err(CompressionError::UnsupportedBitDepth(precision as u16).into());
                    }
                    let mut component_ids = Vec::with_capacity(components);
                    for _ in 0..components {
                        component_ids.push(reader.read_u8()?);
                        reader.skip(2)?;
                    }
                    reader.skip(length.saturating_sub(8 + 3 * components))?;
                    frame = Some(Frame { precision, lines, samples_per_line, component_ids });
                }
                DHT => {
                    let length = reader.read_u16()? as usize;
                    let mut remaining = length.saturating_sub(2);
                    while remaining > 0 {
                        let class_and_id = reader.read_u8()?;
                        let mut counts = [0u8; 16];
                        counts.copy_from_slice(reader.read_bytes(16)?);
                        let total: usize = counts.iter().map(|&c| c as usize).sum();
                        let values = reader.read_bytes(total)?;
                        let table = HuffmanTable::new(&counts, values)?;
                        let id = (class_and_id & 0x0F) as usize;
                        if id >= tables.len() {
                            return Err(CompressionError::MalformedHuffmanTable(format!(
                                "table id {id}"
                            ))
                            .into());
                        }
                        tables[id] = Some(table);
                        remaining = remaining.saturating_sub(17 + total);
                    }
                }
                SOS => {
                    let frame = frame.ok_or(CompressionError::MissingFrameHeader)?;
                    let _length = reader.read_u16()?;
                    let scan_components = reader.read_u8()? as usize;
                    let mut selectors = vec![0u8; frame.component_ids.len()];
                    for _ in 0..scan_components {
                        let component_id = reader.read_u8()?;
                        let table_ids = reader.read_u8()?;
                        let slot = frame
                            .component_ids
                            .iter()
                            .position(|&c| c == component_id)
                            .ok_or(CompressionError::UnknownScanComponent(component_id))?;
                        selectors[slot] = table_ids >> 4;
                    }
                    let predictor = reader.read_u8()?;
                    let _end_of_selection = reader.read_u8()?;
                    let _point_transform = reader.read_u8()?;
                    if predictor != 1 {
                        return Err(CompressionError::UnsupportedPredictor(predictor).into());
                    }

                    let mut decoders = Vec::with_capacity(selectors.len());
                    for &selector in &selectors {
                        let table = tables
                            .get(selector as usize)
                            .and_then(Option::as_ref)
                            .ok_or(CompressionError::MissingHuffmanTable(selector))?;
                        decoders.push(table);
                    }

                    let scan = &data[reader.position()..];
                    let samples = decode_scan(scan, &frame, &decoders)?;
                    let row_width = frame.samples_per_line * frame.component_ids.len();
                    return Ok((samples, row_width));
                }
                EOI => return Err(CompressionError::MissingFrameHeader.into()),
                0xFFC0..=0xFFC2 | 0xFFC5..=0xFFC7 | 0xFFC9..=0xFFCB | 0xFFCD..=0xFFCF => {
                    return Err(CompressionError::UnsupportedMarker(marker).into());
                }
                _ => {
                    // APPn, COM, DQT, DRI and friends carry nothing we need
                    let length = reader.read_u16()? as usize;
                    reader.skip(length.saturating_sub(2))?;
                }
            }
        }
    }
}

impl CompressionDecoder for LosslessJpegDecoder {
    fn decode(&self, data: &[u8], geometry: &SampleGeometry) -> Result<Vec<u16>> {
        let (samples, row_width) = Self::decode_stream(data)?;
        let expected = geometry.sample_count();
        if samples.len() < expected {
            return Err(CompressionError::BitstreamExhausted {
                produced: samples.len(),
                expected,
            }
            .into());
        }
        // DNG frames may pack two image columns per JPEG sample; the
        // interleaved order is already row-major for the tile.
        let tile_row = geometry.width * geometry.samples_per_pixel;
        if row_width != tile_row {
            return Err(CompressionError::FrameGeometryMismatch { row_width, expected: tile_row }.into());
        }
        trace!(row_width, lines = samples.len() / row_width.max(1), "Frame decoded");
        let mut samples = samples;
        samples.truncate(expected);
        Ok(samples)
    }
}

fn next_marker(reader: &mut ByteReader<'_>) -> Result<u16> {
    let mut byte = reader.read_u8()?;
    while byte != 0xFF {
        byte = reader.read_u8()?;
    }
    // fill bytes
    let mut code = reader.read_u8()?;
    while code == 0xFF {
        code = reader.read_u8()?;
    }
    Ok(0xFF00 | code as u16)
}

fn decode_scan(scan: &[u8], frame: &Frame, tables: &[&HuffmanTable]) -> Result<Vec<u16>> {
    let components = frame.component_ids.len();
    let row_len = frame.samples_per_line * components;
    let expected = row_len * frame.lines;
    let mut out = vec![0u16; expected];
    let mut bits = BitReader::with_stuffing(scan, true);
    let initial = 1i32 << (frame.precision - 1);
    let mask = if frame.precision >= 16 { 0xFFFF } else { (1i32 << frame.precision) - 1 };

    let exhausted = |produced: usize| -> DngError {
        CompressionError::BitstreamExhausted { produced, expected }.into()
    };

    for line in 0..frame.lines {
        let row = line * row_len;
        for sample in 0..frame.samples_per_line {
            for comp in 0..components {
                let i = row + sample * components + comp;
                let category = tables[comp].decode(&mut bits).map_err(|e| match e {
                    DngError::EndOfData { .. } => exhausted(i),
                    other => other,
                })?;
                let diff = match category {
                    0 => 0,
                    16 => 32768,
                    n => bits.read_signed_bits(n as u32).map_err(|_| exhausted(i))?,
                };
                let predicted = if sample > 0 {
                    out[i - components] as i32
                } else if line > 0 {
                    out[i - row_len] as i32
                } else {
                    initial
                };
                out[i] = ((predicted + diff) & mask) as u16;
            }
        }
    }
    Ok(out)
}
