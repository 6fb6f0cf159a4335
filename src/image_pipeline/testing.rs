//! In-memory DNG fixtures for unit tests.

use crate::image_pipeline::compression::{HuffmanTable, SampleGeometry, UncompressedDecoder};
use crate::image_pipeline::reader::byte_reader::ByteOrder;
use crate::image_pipeline::reader::{DngFile, ImageFileDirectory};
use crate::image_pipeline::reader::tags::{tag, COMPRESSION_LOSSLESS_JPEG, PHOTOMETRIC_CFA};

/// Value of one fixture entry, already typed.
#[derive(Debug, Clone)]
pub enum FixtureValue {
    Byte(Vec<u8>),
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Undefined(Vec<u8>),
    /// Arbitrary field type id with raw value bytes.
    Raw { field_type: u16, count: u32, bytes: Vec<u8> },
}

impl FixtureValue {
    fn encode(&self, order: ByteOrder) -> (u16, u32, Vec<u8>) {
        fn put16(out: &mut Vec<u8>, v: u16, o: ByteOrder) {
            out.extend_from_slice(&match o {
                ByteOrder::LittleEndian => v.to_le_bytes(),
                ByteOrder::BigEndian => v.to_be_bytes(),
            });
        }
        fn put32(out: &mut Vec<u8>, v: u32, o: ByteOrder) {
            out.extend_from_slice(&match o {
                ByteOrder::LittleEndian => v.to_le_bytes(),
                ByteOrder::BigEndian => v.to_be_bytes(),
            });
        }
        let mut out = Vec::new();
        match self {
            FixtureValue::Byte(v) => (1, v.len() as u32, v.clone()),
            FixtureValue::Ascii(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                (2, bytes.len() as u32, bytes)
            }
            FixtureValue::Short(v) => {
                v.iter().for_each(|&x| put16(&mut out, x, order));
                (3, v.len() as u32, out)
            }
            FixtureValue::Long(v) => {
                v.iter().for_each(|&x| put32(&mut out, x, order));
                (4, v.len() as u32, out)
            }
            FixtureValue::Rational(v) => {
                for &(n, d) in v {
                    put32(&mut out, n, order);
                    put32(&mut out, d, order);
                }
                (5, v.len() as u32, out)
            }
            FixtureValue::SRational(v) => {
                for &(n, d) in v {
                    put32(&mut out, n as u32, order);
                    put32(&mut out, d as u32, order);
                }
                (10, v.len() as u32, out)
            }
            FixtureValue::Float(v) => {
                v.iter().for_each(|&x| put32(&mut out, x.to_bits(), order));
                (11, v.len() as u32, out)
            }
            FixtureValue::Double(v) => {
                for &x in v {
                    let bytes = match order {
                        ByteOrder::LittleEndian => x.to_le_bytes(),
                        ByteOrder::BigEndian => x.to_be_bytes(),
                    };
                    out.extend_from_slice(&bytes);
                }
                (12, v.len() as u32, out)
            }
            FixtureValue::Undefined(v) => (7, v.len() as u32, v.clone()),
            FixtureValue::Raw { field_type, count, bytes } => (*field_type, *count, bytes.clone()),
        }
    }
}

/// Image payload of one fixture directory.
#[derive(Debug, Clone)]
pub enum FixtureData {
    None,
    Strips { rows_per_strip: u32, strips: Vec<Vec<u8>> },
    Tiles { tile_width: u32, tile_length: u32, tiles: Vec<Vec<u8>> },
}

#[derive(Debug, Clone)]
pub struct FixtureIfd {
    pub entries: Vec<(u16, FixtureValue)>,
    pub data: FixtureData,
    pub sub_ifds: Vec<FixtureIfd>,
}

impl FixtureIfd {
    pub fn new() -> Self {
        Self { entries: Vec::new(), data: FixtureData::None, sub_ifds: Vec::new() }
    }

    pub fn with(mut self, tag_id: u16, value: FixtureValue) -> Self {
        self.entries.retain(|(t, _)| *t != tag_id);
        self.entries.push((tag_id, value));
        self
    }

    pub fn without(mut self, tag_id: u16) -> Self {
        self.entries.retain(|(t, _)| *t != tag_id);
        self
    }

    /// A CFA raw directory carrying the usual DNG tags for `samples`.
    pub fn cfa_raw(width: u32, height: u32, bits: u16, pattern: [u8; 4]) -> Self {
        Self::new()
            .with(tag::NEW_SUBFILE_TYPE, FixtureValue::Long(vec![0]))
            .with(tag::IMAGE_WIDTH, FixtureValue::Long(vec![width]))
            .with(tag::IMAGE_LENGTH, FixtureValue::Long(vec![height]))
            .with(tag::BITS_PER_SAMPLE, FixtureValue::Short(vec![bits]))
            .with(tag::COMPRESSION, FixtureValue::Short(vec![1]))
            .with(tag::PHOTOMETRIC_INTERPRETATION, FixtureValue::Short(vec![PHOTOMETRIC_CFA]))
            .with(tag::SAMPLES_PER_PIXEL, FixtureValue::Short(vec![1]))
            .with(tag::PLANAR_CONFIGURATION, FixtureValue::Short(vec![1]))
            .with(tag::CFA_REPEAT_PATTERN_DIM, FixtureValue::Short(vec![2, 2]))
            .with(tag::CFA_PATTERN, FixtureValue::Byte(pattern.to_vec()))
            .with(tag::BLACK_LEVEL, FixtureValue::Long(vec![0]))
            .with(tag::WHITE_LEVEL, FixtureValue::Long(vec![(1u32 << bits) - 1]))
    }

    /// Stores `samples` uncompressed in strips of `rows_per_strip` rows.
    pub fn uncompressed_strips(
        mut self,
        samples: &[u16],
        width: usize,
        bits: u16,
        rows_per_strip: usize,
        order: ByteOrder,
    ) -> Self {
        let strips = samples
            .chunks(width * rows_per_strip)
            .map(|chunk| {
                let geometry = SampleGeometry {
                    width,
                    height: chunk.len() / width,
                    samples_per_pixel: 1,
                    bits_per_sample: bits,
                    byte_order: order,
                };
                UncompressedDecoder::encode(chunk, &geometry)
            })
            .collect();
        self.data = FixtureData::Strips { rows_per_strip: rows_per_strip as u32, strips };
        self
    }

    /// Stores `samples` as lossless JPEG tiles; edge tiles are padded by
    /// repeating the last column and row.
    pub fn ljpeg_tiles(
        mut self,
        samples: &[u16],
        width: usize,
        height: usize,
        tile_width: usize,
        tile_length: usize,
        precision: u8,
    ) -> Self {
        let mut tiles = Vec::new();
        for ty in (0..height).step_by(tile_length) {
            for tx in (0..width).step_by(tile_width) {
                let mut tile = Vec::with_capacity(tile_width * tile_length);
                for y in 0..tile_length {
                    for x in 0..tile_width {
                        let sx = (tx + x).min(width - 1);
                        let sy = (ty + y).min(height - 1);
                        tile.push(samples[sy * width + sx]);
                    }
                }
                tiles.push(encode_lossless_jpeg(&tile, tile_width, tile_length, 1, precision));
            }
        }
        self.data = FixtureData::Tiles {
            tile_width: tile_width as u32,
            tile_length: tile_length as u32,
            tiles,
        };
        self.with(tag::COMPRESSION, FixtureValue::Short(vec![COMPRESSION_LOSSLESS_JPEG]))
    }

    /// Stores `samples` as lossless JPEG strips.
    pub fn ljpeg_strips(mut self, samples: &[u16], width: usize, rows_per_strip: usize, precision: u8) -> Self {
        let strips = samples
            .chunks(width * rows_per_strip)
            .map(|chunk| encode_lossless_jpeg(chunk, width, chunk.len() / width, 1, precision))
            .collect();
        self.data = FixtureData::Strips { rows_per_strip: rows_per_strip as u32, strips };
        self.with(tag::COMPRESSION, FixtureValue::Short(vec![COMPRESSION_LOSSLESS_JPEG]))
    }
}

/// Writes a TIFF/DNG container: header, image payloads, then directories.
pub struct FixtureBuilder {
    order: ByteOrder,
    chain: Vec<FixtureIfd>,
    exif: Option<FixtureIfd>,
}

impl FixtureBuilder {
    pub fn new(order: ByteOrder) -> Self {
        Self { order, chain: Vec::new(), exif: None }
    }

    pub fn ifd(mut self, ifd: FixtureIfd) -> Self {
        self.chain.push(ifd);
        self
    }

    pub fn exif(mut self, ifd: FixtureIfd) -> Self {
        self.exif = Some(ifd);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let order = self.order;
        let mut out = Vec::new();
        out.extend_from_slice(match order {
            ByteOrder::LittleEndian => b"II",
            ByteOrder::BigEndian => b"MM",
        });
        push_u16(&mut out, 42, order);
        push_u32(&mut out, 0, order);

        let exif_offset = self.exif.map(|exif| write_ifd(&mut out, exif, 0, order));

        let mut next = 0u32;
        let mut chain = self.chain;
        if let (Some(offset), Some(first)) = (exif_offset, chain.first_mut()) {
            first.entries.push((tag::EXIF_IFD, FixtureValue::Long(vec![offset])));
        }
        for ifd in chain.into_iter().rev() {
            next = write_ifd(&mut out, ifd, next, order);
        }
        patch_u32(&mut out, 4, next, order);
        out
    }
}

fn push_u16(out: &mut Vec<u8>, v: u16, order: ByteOrder) {
    out.extend_from_slice(&match order {
        ByteOrder::LittleEndian => v.to_le_bytes(),
        ByteOrder::BigEndian => v.to_be_bytes(),
    });
}

fn push_u32(out: &mut Vec<u8>, v: u32, order: ByteOrder) {
    out.extend_from_slice(&match order {
        ByteOrder::LittleEndian => v.to_le_bytes(),
        ByteOrder::BigEndian => v.to_be_bytes(),
    });
}

fn patch_u32(out: &mut [u8], at: usize, v: u32, order: ByteOrder) {
    let bytes = match order {
        ByteOrder::LittleEndian => v.to_le_bytes(),
        ByteOrder::BigEndian => v.to_be_bytes(),
    };
    out[at..at + 4].copy_from_slice(&bytes);
}

fn align(out: &mut Vec<u8>) {
    if out.len() % 2 == 1 {
        out.push(0);
    }
}

/// Appends `ifd` (payload, sub-directories, out-of-line values, entries)
/// and returns its offset.
fn write_ifd(out: &mut Vec<u8>, mut ifd: FixtureIfd, next: u32, order: ByteOrder) -> u32 {
    let mut sub_offsets = Vec::new();
    for sub in std::mem::take(&mut ifd.sub_ifds) {
        sub_offsets.push(write_ifd(out, sub, 0, order));
    }
    if !sub_offsets.is_empty() {
        ifd.entries.push((tag::SUB_IFDS, FixtureValue::Long(sub_offsets)));
    }

    let mut place = |chunks: Vec<Vec<u8>>| -> (Vec<u32>, Vec<u32>) {
        let mut offsets = Vec::new();
        let mut counts = Vec::new();
        for chunk in chunks {
            align(out);
            offsets.push(out.len() as u32);
            counts.push(chunk.len() as u32);
            out.extend_from_slice(&chunk);
        }
        (offsets, counts)
    };
    match std::mem::replace(&mut ifd.data, FixtureData::None) {
        FixtureData::None => {}
        FixtureData::Strips { rows_per_strip, strips } => {
            let (offsets, counts) = place(strips);
            ifd.entries.push((tag::ROWS_PER_STRIP, FixtureValue::Long(vec![rows_per_strip])));
            ifd.entries.push((tag::STRIP_OFFSETS, FixtureValue::Long(offsets)));
            ifd.entries.push((tag::STRIP_BYTE_COUNTS, FixtureValue::Long(counts)));
        }
        FixtureData::Tiles { tile_width, tile_length, tiles } => {
            let (offsets, counts) = place(tiles);
            ifd.entries.push((tag::TILE_WIDTH, FixtureValue::Long(vec![tile_width])));
            ifd.entries.push((tag::TILE_LENGTH, FixtureValue::Long(vec![tile_length])));
            ifd.entries.push((tag::TILE_OFFSETS, FixtureValue::Long(offsets)));
            ifd.entries.push((tag::TILE_BYTE_COUNTS, FixtureValue::Long(counts)));
        }
    }

    ifd.entries.sort_by_key(|(t, _)| *t);
    let encoded: Vec<(u16, u16, u32, Vec<u8>)> = ifd
        .entries
        .iter()
        .map(|(t, v)| {
            let (field_type, count, bytes) = v.encode(order);
            (*t, field_type, count, bytes)
        })
        .collect();

    let mut value_offsets = Vec::with_capacity(encoded.len());
    for (_, _, _, bytes) in &encoded {
        if bytes.len() > 4 {
            align(out);
            value_offsets.push(Some(out.len() as u32));
            out.extend_from_slice(bytes);
        } else {
            value_offsets.push(None);
        }
    }

    align(out);
    let ifd_offset = out.len() as u32;
    push_u16(out, encoded.len() as u16, order);
    for ((t, field_type, count, bytes), value_offset) in encoded.iter().zip(value_offsets) {
        push_u16(out, *t, order);
        push_u16(out, *field_type, order);
        push_u32(out, *count, order);
        match value_offset {
            Some(offset) => push_u32(out, offset, order),
            None => {
                let mut inline = bytes.clone();
                inline.resize(4, 0);
                out.extend_from_slice(&inline);
            }
        }
    }
    push_u32(out, next, order);
    ifd_offset
}

/// Code lengths of the fixture Huffman table: 3 codes of length 2, then
/// one code each for lengths 3..=16, covering categories 0..=16.
pub const FIXTURE_HUFFMAN_COUNTS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1];
pub const FIXTURE_HUFFMAN_VALUES: [u8; 17] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];

struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    filled: u32,
}

impl BitWriter {
    fn put(&mut self, value: u32, bits: u32) {
        for i in (0..bits).rev() {
            self.acc = (self.acc << 1) | ((value >> i) & 1);
            self.filled += 1;
            if self.filled == 8 {
                self.emit();
            }
        }
    }

    fn emit(&mut self) {
        let byte = self.acc as u8;
        self.out.push(byte);
        if byte == 0xFF {
            self.out.push(0x00);
        }
        self.acc = 0;
        self.filled = 0;
    }

    fn finish(mut self) -> Vec<u8> {
        while self.filled != 0 {
            self.put(1, 1);
        }
        self.out
    }
}

/// Encodes interleaved `samples` (lines x samples_per_line x components)
/// as a predictor-1 lossless JPEG stream using the fixture table.
pub fn encode_lossless_jpeg(
    samples: &[u16],
    samples_per_line: usize,
    lines: usize,
    components: usize,
    precision: u8,
) -> Vec<u8> {
    let table = HuffmanTable::new(&FIXTURE_HUFFMAN_COUNTS, &FIXTURE_HUFFMAN_VALUES)
        .expect("fixture table is valid");
    let mut codes = [(0u16, 0u8); 17];
    for (value, code, len) in table.codes() {
        codes[value as usize] = (code, len);
    }

    let mut out = vec![0xFF, 0xD8];
    // DHT
    out.extend_from_slice(&[0xFF, 0xC4]);
    out.extend_from_slice(&((2 + 1 + 16 + 17) as u16).to_be_bytes());
    out.push(0x00);
    out.extend_from_slice(&FIXTURE_HUFFMAN_COUNTS);
    out.extend_from_slice(&FIXTURE_HUFFMAN_VALUES);
    // SOF3
    out.extend_from_slice(&[0xFF, 0xC3]);
    out.extend_from_slice(&((8 + 3 * components) as u16).to_be_bytes());
    out.push(precision);
    out.extend_from_slice(&(lines as u16).to_be_bytes());
    out.extend_from_slice(&(samples_per_line as u16).to_be_bytes());
    out.push(components as u8);
    for c in 0..components {
        out.extend_from_slice(&[c as u8 + 1, 0x11, 0x00]);
    }
    // SOS
    out.extend_from_slice(&[0xFF, 0xDA]);
    out.extend_from_slice(&((6 + 2 * components) as u16).to_be_bytes());
    out.push(components as u8);
    for c in 0..components {
        out.extend_from_slice(&[c as u8 + 1, 0x00]);
    }
    out.extend_from_slice(&[1, 0, 0]);

    let row_len = samples_per_line * components;
    let mut bits = BitWriter { out: Vec::new(), acc: 0, filled: 0 };
    for line in 0..lines {
        for sample in 0..samples_per_line {
            for comp in 0..components {
                let i = line * row_len + sample * components + comp;
                let predicted = if sample > 0 {
                    samples[i - components] as i32
                } else if line > 0 {
                    samples[i - row_len] as i32
                } else {
                    1 << (precision - 1)
                };
                let mut diff = (samples[i] as i32 - predicted).rem_euclid(65536);
                if diff > 32768 {
                    diff -= 65536;
                }
                let category = if diff == 32768 { 16 } else { 32 - diff.unsigned_abs().leading_zeros() };
                let (code, len) = codes[category as usize];
                bits.put(code as u32, len as u32);
                if category > 0 && category < 16 {
                    let extra = if diff > 0 { diff } else { diff + (1 << category) - 1 };
                    bits.put(extra as u32, category);
                }
            }
        }
    }
    out.extend_from_slice(&bits.finish());
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// Deterministic pseudo-random samples below `1 << bits`.
pub fn noise(count: usize, bits: u32, seed: u32) -> Vec<u16> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..count)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & ((1u32 << bits) - 1)) as u16
        })
        .collect()
}

/// Smooth gradient with some texture, in 16-bit range.
pub fn gradient(width: usize, height: usize) -> Vec<u16> {
    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let base = (x * 40_000 / width.max(1) + y * 20_000 / height.max(1)) as i64;
            let texture = (((x * 7 + y * 13) % 17) as i64 - 8) * 300;
            out.push((base + texture).clamp(0, 65_535) as u16);
        }
    }
    out
}

/// Signed rationals with a fixed denominator, as camera profiles store them.
pub fn srationals(values: &[f64]) -> FixtureValue {
    FixtureValue::SRational(values.iter().map(|v| ((v * 1_000_000.0).round() as i32, 1_000_000)).collect())
}

pub fn rationals(values: &[f64]) -> FixtureValue {
    FixtureValue::Rational(values.iter().map(|v| ((v * 1_000_000.0).round() as u32, 1_000_000)).collect())
}

pub const COLOR_MATRIX_A: [f64; 9] = [0.5309, -0.0229, -0.0336, -0.6241, 1.3265, 0.3337, -0.0817, 0.1215, 0.6664];
pub const COLOR_MATRIX_D65: [f64; 9] = [0.4716, 0.0603, -0.0830, -0.7798, 1.5474, 0.2480, -0.1496, 0.1937, 0.6651];
pub const FORWARD_MATRIX_A: [f64; 9] = [0.7868, 0.0092, 0.1683, 0.2291, 0.8615, -0.0906, 0.0027, -0.4752, 1.2976];
pub const FORWARD_MATRIX_D65: [f64; 9] = [0.7637, 0.0805, 0.1201, 0.2649, 0.9179, -0.1828, 0.0137, -0.2456, 1.0570];

/// Adds a dual-illuminant (standard light A and D65) camera profile.
pub fn with_profile(ifd: FixtureIfd) -> FixtureIfd {
    ifd.with(tag::COLOR_MATRIX_1, srationals(&COLOR_MATRIX_A))
        .with(tag::COLOR_MATRIX_2, srationals(&COLOR_MATRIX_D65))
        .with(tag::CALIBRATION_ILLUMINANT_1, FixtureValue::Short(vec![17]))
        .with(tag::CALIBRATION_ILLUMINANT_2, FixtureValue::Short(vec![21]))
        .with(tag::AS_SHOT_NEUTRAL, rationals(&[0.473, 1.0, 0.632]))
}

/// Parses `ifd` as the only directory of a little-endian container.
pub fn directory(ifd: FixtureIfd) -> ImageFileDirectory {
    let file = DngFile::from_bytes(FixtureBuilder::new(ByteOrder::LittleEndian).ifd(ifd).build()).unwrap();
    file.zeroth().unwrap().clone()
}
