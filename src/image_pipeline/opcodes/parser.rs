use tracing::debug;

use crate::image_pipeline::common::error::{DngError, Result};
use crate::image_pipeline::reader::byte_reader::{ByteOrder, ByteReader};
use super::types::*;

/// Parses a whole OpcodeList tag value.
pub fn parse_opcode_list(bytes: &[u8]) -> Result<Vec<OpcodeRecord>> {
    let mut reader = ByteReader::new(bytes, ByteOrder::BigEndian);
    let count = reader.read_u32()? as usize;
    // each record header alone is 16 bytes
    if count > bytes.len() / 16 {
        return Err(DngError::format(0, format!("opcode list claims {count} entries")));
    }

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let id = reader.read_u32()?;
        let dng_version = reader.read_u32()?;
        let flags = reader.read_u32()?;
        let byte_count = reader.read_u32()? as usize;
        let payload = reader.read_bytes(byte_count)?;
        let opcode = parse_opcode(id, payload)?;
        debug!(id, name = opcode.name(), flags, byte_count, "Parsed opcode");
        records.push(OpcodeRecord { dng_version, flags, opcode });
    }
    Ok(records)
}

/// Parses the payload of a single opcode with the given id.
pub fn parse_opcode(id: u32, payload: &[u8]) -> Result<Opcode> {
    let mut r = ByteReader::new(payload, ByteOrder::BigEndian);
    let opcode = match id {
        1 => {
            let planes = r.read_u32()?;
            let planes = checked_count(&r, planes, 6 * 8)?;
            let mut coefficients = Vec::with_capacity(planes);
            for _ in 0..planes {
                coefficients.push(read_f64s::<6>(&mut r)?);
            }
            Opcode::WarpRectilinear(WarpRectilinear {
                coefficients,
                center_x: r.read_f64()?,
                center_y: r.read_f64()?,
            })
        }
        2 => {
            let planes = r.read_u32()?;
            let planes = checked_count(&r, planes, 4 * 8)?;
            let mut coefficients = Vec::with_capacity(planes);
            for _ in 0..planes {
                coefficients.push(read_f64s::<4>(&mut r)?);
            }
            Opcode::WarpFisheye(WarpFisheye {
                coefficients,
                center_x: r.read_f64()?,
                center_y: r.read_f64()?,
            })
        }
        3 => Opcode::FixVignetteRadial(FixVignetteRadial {
            k: read_f64s::<5>(&mut r)?,
            center_x: r.read_f64()?,
            center_y: r.read_f64()?,
        }),
        4 => Opcode::FixBadPixelsConstant(FixBadPixelsConstant {
            constant: r.read_u32()?,
            bayer_phase: r.read_u32()?,
        }),
        5 => {
            let bayer_phase = r.read_u32()?;
            let point_count = r.read_u32()? as usize;
            let rect_count = r.read_u32()? as usize;
            if point_count.saturating_mul(8).saturating_add(rect_count.saturating_mul(16))
                > remaining(&r)
            {
                return Err(DngError::EndOfData {
                    offset: r.position() as u64,
                    requested: point_count * 8 + rect_count * 16,
                });
            }
            let mut bad_points = Vec::with_capacity(point_count);
            for _ in 0..point_count {
                bad_points.push([r.read_u32()?, r.read_u32()?]);
            }
            let mut bad_rects = Vec::with_capacity(rect_count);
            for _ in 0..rect_count {
                bad_rects.push([r.read_u32()?, r.read_u32()?, r.read_u32()?, r.read_u32()?]);
            }
            Opcode::FixBadPixelsList(FixBadPixelsList { bayer_phase, bad_points, bad_rects })
        }
        6 => Opcode::TrimBounds(TrimBounds {
            top: r.read_u32()?,
            left: r.read_u32()?,
            bottom: r.read_u32()?,
            right: r.read_u32()?,
        }),
        7 => {
            let area = read_area(&mut r)?;
            let size = r.read_u32()?;
            let size = checked_count(&r, size, 2)?;
            let table = (0..size).map(|_| r.read_u16()).collect::<Result<_>>()?;
            Opcode::MapTable(MapTable { area, table })
        }
        8 => {
            let area = read_area(&mut r)?;
            let degree = r.read_u32()?;
            let terms = checked_count(&r, degree.saturating_add(1), 8)?;
            let coefficients = (0..terms).map(|_| r.read_f64()).collect::<Result<_>>()?;
            Opcode::MapPolynomial(MapPolynomial { area, coefficients })
        }
        9 => {
            let area = read_area(&mut r)?;
            let points_v = r.read_u32()?;
            let points_h = r.read_u32()?;
            let spacing_v = r.read_f64()?;
            let spacing_h = r.read_f64()?;
            let origin_v = r.read_f64()?;
            let origin_h = r.read_f64()?;
            let map_planes = r.read_u32()?;
            let total = (points_v as u64) * (points_h as u64) * (map_planes as u64);
            let total = checked_count(&r, u32::try_from(total).unwrap_or(u32::MAX), 4)?;
            let gains = (0..total).map(|_| r.read_f32()).collect::<Result<_>>()?;
            Opcode::GainMap(GainMap {
                area,
                points_v,
                points_h,
                spacing_v,
                spacing_h,
                origin_v,
                origin_h,
                map_planes,
                gains,
            })
        }
        10..=13 => {
            let area = read_area(&mut r)?;
            let count = r.read_u32()?;
            let count = checked_count(&r, count, 4)?;
            let values = (0..count).map(|_| r.read_f32()).collect::<Result<_>>()?;
            let per_line = PerLineOpcode { area, values };
            match id {
                10 => Opcode::DeltaPerRow(per_line),
                11 => Opcode::DeltaPerColumn(per_line),
                12 => Opcode::ScalePerRow(per_line),
                _ => Opcode::ScalePerColumn(per_line),
            }
        }
        other => return Err(DngError::UnknownOpcode(other)),
    };
    Ok(opcode)
}

fn remaining(r: &ByteReader<'_>) -> usize {
    r.len().saturating_sub(r.position())
}

/// Rejects element counts the payload cannot possibly hold.
fn checked_count(r: &ByteReader<'_>, count: u32, element_size: usize) -> Result<usize> {
    let count = count as usize;
    if count.saturating_mul(element_size) > remaining(r) {
        return Err(DngError::EndOfData {
            offset: r.position() as u64,
            requested: count.saturating_mul(element_size),
        });
    }
    Ok(count)
}

fn read_f64s<const N: usize>(r: &mut ByteReader<'_>) -> Result<[f64; N]> {
    let mut out = [0.0; N];
    for v in &mut out {
        *v = r.read_f64()?;
    }
    Ok(out)
}

fn read_area(r: &mut ByteReader<'_>) -> Result<OpcodeArea> {
    Ok(OpcodeArea {
        top: r.read_u32()?,
        left: r.read_u32()?,
        bottom: r.read_u32()?,
        right: r.read_u32()?,
        plane: r.read_u32()?,
        planes: r.read_u32()?,
        row_pitch: r.read_u32()?,
        col_pitch: r.read_u32()?,
    })
}
