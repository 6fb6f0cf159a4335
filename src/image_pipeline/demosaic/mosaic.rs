use crate::image_pipeline::acceleration::executor::for_each_row;
use crate::image_pipeline::acceleration::strategy::Dispatch;
use crate::image_pipeline::common::math::translate;
use crate::image_pipeline::reader::BayerLayout;

/// Read-only view of a single-channel `f32` plane with clamped reads.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    data: &'a [f32],
    width: usize,
    height: usize,
}

impl<'a> Plane<'a> {
    pub fn new(data: &'a [f32], width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { data, width, height }
    }

    /// Value at `(x, y)`; coordinates outside the plane are clamped onto it.
    #[inline]
    pub fn at(&self, x: isize, y: isize) -> f32 {
        self.data[translate(y, self.height) * self.width + translate(x, self.width)]
    }

    /// Like [`Plane::at`], but coordinates are reflected around the border
    /// so that offsets of one keep their Bayer parity.
    #[inline]
    pub fn reflected(&self, x: isize, y: isize) -> f32 {
        self.at(reflect(x, self.width), reflect(y, self.height))
    }
}

/// Reflects `coord` around the first and last index, keeping its parity.
#[inline]
pub fn reflect(coord: isize, len: usize) -> isize {
    let last = len as isize - 1;
    if coord < 0 {
        -coord
    } else if coord > last {
        2 * last - coord
    } else {
        coord
    }
}

/// Which filter covers a given sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Red,
    /// Green in a row that also carries red samples
    GreenRed,
    /// Green in a row that also carries blue samples
    GreenBlue,
    Blue,
}

impl Site {
    #[inline]
    pub fn is_green(self) -> bool {
        matches!(self, Site::GreenRed | Site::GreenBlue)
    }
}

/// Bayer mosaic of linear samples.
///
/// `full_scale` is the value of a saturated sample: 65535 on the CPU path
/// and 1.0 for normalised device textures.
#[derive(Debug, Clone, Copy)]
pub struct Mosaic<'a> {
    pub plane: Plane<'a>,
    pub layout: BayerLayout,
    pub full_scale: f32,
}

impl<'a> Mosaic<'a> {
    pub fn new(data: &'a [f32], width: usize, height: usize, layout: BayerLayout, full_scale: f32) -> Self {
        Self { plane: Plane::new(data, width, height), layout, full_scale }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.plane.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.plane.height
    }

    #[inline]
    pub fn at(&self, x: isize, y: isize) -> f32 {
        self.plane.at(x, y)
    }

    #[inline]
    pub fn reflected(&self, x: isize, y: isize) -> f32 {
        self.plane.reflected(x, y)
    }

    #[inline]
    pub fn site(&self, x: usize, y: usize) -> Site {
        let idx = BayerLayout::index(x, y);
        if idx == self.layout.red {
            Site::Red
        } else if idx == self.layout.blue {
            Site::Blue
        } else if idx == self.layout.green_red_row {
            Site::GreenRed
        } else {
            Site::GreenBlue
        }
    }
}

/// Evaluates `pixel(x, y)` for every position and returns the interleaved
/// RGB result.
pub fn fill_rgb<F>(width: usize, height: usize, dispatch: Dispatch, pixel: F) -> Vec<f32>
where
    F: Fn(isize, isize) -> [f32; 3] + Sync,
{
    let mut out = vec![0.0; width * height * 3];
    for_each_row(dispatch, &mut out, width * 3, |y, row| {
        for (x, rgb) in row.chunks_exact_mut(3).enumerate() {
            rgb.copy_from_slice(&pixel(x as isize, y as isize));
        }
    });
    out
}

/// Evaluates `value(x, y)` for every position into a single plane.
pub fn fill_plane<F>(width: usize, height: usize, dispatch: Dispatch, value: F) -> Vec<f32>
where
    F: Fn(isize, isize) -> f32 + Sync,
{
    let mut out = vec![0.0; width * height];
    for_each_row(dispatch, &mut out, width, |y, row| {
        for (x, v) in row.iter_mut().enumerate() {
            *v = value(x as isize, y as isize);
        }
    });
    out
}

/// Replicates a plane into all three channels.
pub fn grey_to_rgb(plane: &[f32]) -> Vec<f32> {
    plane.iter().flat_map(|&v| [v, v, v]).collect()
}
