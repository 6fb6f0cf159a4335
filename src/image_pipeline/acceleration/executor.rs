use rayon::prelude::*;

use super::strategy::{ChunkSchedule, Dispatch};

/// Runs `op(pixel_index, pixel)` over every pixel of `data`, where a pixel is
/// `channels` consecutive values.
///
/// Chunks never overlap and `op` only sees its own pixel, so every schedule
/// produces identical output.
pub fn for_each_pixel<T, F>(schedule: ChunkSchedule, data: &mut [T], channels: usize, op: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    let channels = channels.max(1);
    let chunk_pixels = schedule.chunk_len.unwrap_or(data.len() / channels).max(1);
    let chunk_values = chunk_pixels * channels;

    let run_chunk = |(chunk_idx, chunk): (usize, &mut [T])| {
        let base = chunk_idx * chunk_pixels;
        match schedule.inner {
            Dispatch::Sequential => chunk
                .chunks_mut(channels)
                .enumerate()
                .for_each(|(i, pixel)| op(base + i, pixel)),
            Dispatch::Parallel => chunk
                .par_chunks_mut(channels)
                .enumerate()
                .for_each(|(i, pixel)| op(base + i, pixel)),
        }
    };

    match schedule.outer {
        Dispatch::Sequential => data.chunks_mut(chunk_values).enumerate().for_each(run_chunk),
        Dispatch::Parallel => data.par_chunks_mut(chunk_values).enumerate().for_each(run_chunk),
    }
}

/// Fills `out` row by row, with `row_len` values per row. `fill(y, row)`
/// must only write its own row.
pub fn for_each_row<T, F>(dispatch: Dispatch, out: &mut [T], row_len: usize, fill: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    if row_len == 0 {
        return;
    }
    match dispatch {
        Dispatch::Sequential => out.chunks_mut(row_len).enumerate().for_each(|(y, row)| fill(y, row)),
        Dispatch::Parallel => out.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| fill(y, row)),
    }
}
