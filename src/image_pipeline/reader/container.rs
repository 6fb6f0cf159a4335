use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::image_pipeline::common::error::{DngError, Result};
use crate::image_pipeline::compression::{decoder_for, SampleGeometry};
use crate::image_pipeline::types::RawImageData;
use super::byte_reader::{ByteOrder, ByteReader};
use super::directory::{DirectoryKind, ImageFileDirectory};
use super::tags::{
    tag, NEW_SUBFILE_TYPE_HIGH_RESOLUTION, PHOTOMETRIC_CFA, PHOTOMETRIC_LINEAR_RAW, PHOTOMETRIC_RGB,
    PLANAR_CONFIGURATION_CHUNKY,
};

const TIFF_MAGIC: u16 = 42;

/// Upper bound on the top-level chain; guards against offset loops.
const MAX_CHAIN_LENGTH: usize = 256;

/// An opened DNG container.
///
/// The whole file is held in memory. The top-level directory chain is
/// parsed on open; SubIFDs and the EXIF directory are parsed when asked for.
#[derive(Debug, Clone)]
pub struct DngFile {
    data: Vec<u8>,
    byte_order: ByteOrder,
    directories: Vec<ImageFileDirectory>,
}

impl DngFile {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let (byte_order, first_offset) = read_header(&data)?;
        let mut reader = ByteReader::new(&data, byte_order);

        let mut directories = Vec::new();
        let mut offset = first_offset;
        while offset != 0 {
            if directories.len() >= MAX_CHAIN_LENGTH {
                return Err(DngError::format(offset as u64, "directory chain does not terminate"));
            }
            let ifd = ImageFileDirectory::parse(&mut reader, offset as u64, DirectoryKind::Baseline)?;
            offset = ifd.next_offset();
            directories.push(ifd);
        }

        info!(
            byte_order = ?byte_order,
            directories = directories.len(),
            bytes = data.len(),
            "Parsed DNG container"
        );
        Ok(Self { data, byte_order, directories })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Top-level directory chain in file order.
    pub fn directories(&self) -> &[ImageFileDirectory] {
        &self.directories
    }

    pub fn zeroth(&self) -> Result<&ImageFileDirectory> {
        self.directories
            .first()
            .ok_or_else(|| DngError::format(0, "container has no image directory"))
    }

    fn reader(&self) -> ByteReader<'_> {
        ByteReader::new(&self.data, self.byte_order)
    }

    /// Directories referenced by the SubIFDs tag of `ifd`.
    pub fn sub_directories(&self, ifd: &ImageFileDirectory) -> Result<Vec<ImageFileDirectory>> {
        let mut reader = self.reader();
        ifd.sub_ifd_offsets()
            .into_iter()
            .filter(|&offset| offset != 0)
            .map(|offset| ImageFileDirectory::parse(&mut reader, offset as u64, DirectoryKind::Sub))
            .collect()
    }

    /// The EXIF directory of the 0th directory, if present.
    pub fn exif(&self) -> Result<Option<ImageFileDirectory>> {
        let zeroth = self.zeroth()?;
        match zeroth.exif_offset() {
            Some(offset) if offset != 0 => {
                let mut reader = self.reader();
                ImageFileDirectory::parse(&mut reader, offset as u64, DirectoryKind::Exif).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// The top-level chain followed by every sub-directory and the EXIF
    /// directory.
    pub fn all_directories(&self) -> Result<Vec<ImageFileDirectory>> {
        let mut all = self.directories.clone();
        for ifd in &self.directories {
            all.extend(self.sub_directories(ifd)?);
        }
        if let Some(exif) = self.exif()? {
            all.push(exif);
        }
        Ok(all)
    }

    /// The full-resolution raw image directory: the first directory, in
    /// depth-first order, whose NewSubfileType is 0.
    pub fn raw_directory(&self) -> Result<ImageFileDirectory> {
        for ifd in &self.directories {
            if is_main_image(ifd) {
                return Ok(ifd.clone());
            }
            if let Some(sub) = self.sub_directories(ifd)?.into_iter().find(is_main_image) {
                return Ok(sub);
            }
        }
        Err(DngError::UnsupportedFormat("no full-resolution raw image directory".to_string()))
    }

    /// Decodes the raw directory's samples.
    pub fn raw_image(&self, parallel: bool) -> Result<RawImageData> {
        let ifd = self.raw_directory()?;
        self.decode_raster(&ifd, parallel)
    }

    /// Assembles the strips or tiles of `ifd` into one row-major buffer.
    ///
    /// With `parallel` the strips or tiles are decoded on the rayon pool;
    /// the result is identical either way.
    #[instrument(skip_all, fields(offset = ifd.offset, parallel))]
    pub fn decode_raster(&self, ifd: &ImageFileDirectory, parallel: bool) -> Result<RawImageData> {
        let width = ifd.width()?;
        let height = ifd.height()?;
        let samples_per_pixel = ifd.samples_per_pixel();
        let bits_per_sample = ifd.bits_per_sample();

        match ifd.photometric_interpretation() {
            Some(PHOTOMETRIC_CFA) | Some(PHOTOMETRIC_LINEAR_RAW) | Some(PHOTOMETRIC_RGB) | None => {}
            Some(other) => {
                return Err(DngError::UnsupportedFormat(format!(
                    "photometric interpretation {other}"
                )));
            }
        }
        if ifd.planar_configuration() != PLANAR_CONFIGURATION_CHUNKY {
            return Err(DngError::UnsupportedFormat(format!(
                "planar configuration {}",
                ifd.planar_configuration()
            )));
        }

        let decoder = decoder_for(ifd.compression())?;
        let row_len = width * samples_per_pixel;
        let mut samples = vec![0u16; row_len * height];

        if let Some(tile_width) = ifd.tile_width() {
            let tile_length = ifd.tile_length().ok_or(DngError::MissingTag(tag::TILE_LENGTH))?;
            let offsets = ifd.tile_offsets().ok_or(DngError::MissingTag(tag::TILE_OFFSETS))?;
            let counts = ifd
                .tile_byte_counts()
                .ok_or(DngError::MissingTag(tag::TILE_BYTE_COUNTS))?;
            if tile_width == 0 || tile_length == 0 {
                return Err(DngError::format(ifd.offset, "zero tile dimension"));
            }
            let across = width.div_ceil(tile_width);
            let down = height.div_ceil(tile_length);
            if offsets.len() < across * down || counts.len() < offsets.len() {
                return Err(DngError::CountMismatch {
                    tag: tag::TILE_OFFSETS,
                    expected: across * down,
                    actual: offsets.len().min(counts.len()),
                });
            }
            debug!(across, down, tile_width, tile_length, "Decoding tiles");

            let geometry = SampleGeometry {
                width: tile_width,
                height: tile_length,
                samples_per_pixel,
                bits_per_sample,
                byte_order: self.byte_order,
            };
            let chunks = self.chunks(&offsets[..across * down], &counts)?;
            let decode = |bytes: &&[u8]| decoder.decode(bytes, &geometry);
            let tiles: Vec<Vec<u16>> = if parallel {
                chunks.par_iter().map(decode).collect::<Result<_>>()?
            } else {
                chunks.iter().map(decode).collect::<Result<_>>()?
            };

            let tile_row = tile_width * samples_per_pixel;
            for (index, tile) in tiles.iter().enumerate() {
                let x0 = (index % across) * tile_width;
                let y0 = (index / across) * tile_length;
                let copy_w = (width - x0).min(tile_width) * samples_per_pixel;
                let copy_h = (height - y0).min(tile_length);
                for row in 0..copy_h {
                    let src = &tile[row * tile_row..row * tile_row + copy_w];
                    let dst = (y0 + row) * row_len + x0 * samples_per_pixel;
                    samples[dst..dst + copy_w].copy_from_slice(src);
                }
            }
        } else {
            let offsets = ifd
                .strip_offsets()
                .ok_or(DngError::MissingTag(tag::STRIP_OFFSETS))?;
            let counts = ifd
                .strip_byte_counts()
                .ok_or(DngError::MissingTag(tag::STRIP_BYTE_COUNTS))?;
            let rows_per_strip = ifd
                .rows_per_strip()
                .map(|r| (r as usize).clamp(1, height.max(1)))
                .unwrap_or(height.max(1));
            let strip_count = height.div_ceil(rows_per_strip);
            if offsets.len() < strip_count || counts.len() < strip_count {
                return Err(DngError::CountMismatch {
                    tag: tag::STRIP_OFFSETS,
                    expected: strip_count,
                    actual: offsets.len().min(counts.len()),
                });
            }
            debug!(strip_count, rows_per_strip, "Decoding strips");

            let chunks = self.chunks(&offsets[..strip_count], &counts)?;
            let byte_order = self.byte_order;
            let decode = |(index, bytes): (usize, &&[u8])| {
                let rows = rows_per_strip.min(height - index * rows_per_strip);
                let geometry = SampleGeometry {
                    width,
                    height: rows,
                    samples_per_pixel,
                    bits_per_sample,
                    byte_order,
                };
                decoder.decode(bytes, &geometry)
            };
            let strips: Vec<Vec<u16>> = if parallel {
                chunks.par_iter().enumerate().map(decode).collect::<Result<_>>()?
            } else {
                chunks.iter().enumerate().map(decode).collect::<Result<_>>()?
            };

            let mut position = 0;
            for strip in strips {
                let end = (position + strip.len()).min(samples.len());
                samples[position..end].copy_from_slice(&strip[..end - position]);
                position = end;
            }
        }

        Ok(RawImageData::new(width, height, samples, bits_per_sample as u32))
    }

    fn chunks(&self, offsets: &[u32], counts: &[u32]) -> Result<Vec<&[u8]>> {
        let reader = self.reader();
        offsets
            .iter()
            .zip(counts)
            .map(|(&offset, &count)| reader.slice_at(offset as u64, count as usize))
            .collect()
    }
}

fn is_main_image(ifd: &ImageFileDirectory) -> bool {
    ifd.new_subfile_type() == Some(NEW_SUBFILE_TYPE_HIGH_RESOLUTION)
}

/// Byte order and first directory offset from the 8-byte header.
fn read_header(data: &[u8]) -> Result<(ByteOrder, u32)> {
    let byte_order = match data.get(0..2) {
        Some(b"II") => ByteOrder::LittleEndian,
        Some(b"MM") => ByteOrder::BigEndian,
        Some(other) => {
            return Err(DngError::format(0, format!("invalid byte order mark {other:02X?}")));
        }
        None => return Err(DngError::EndOfData { offset: 0, requested: 2 }),
    };
    let mut reader = ByteReader::new(data, byte_order);
    reader.seek(2)?;
    let magic = reader.read_u16()?;
    if magic != TIFF_MAGIC {
        return Err(DngError::format(2, format!("invalid magic number {magic}")));
    }
    let first_offset = reader.read_u32()?;
    Ok((byte_order, first_offset))
}
