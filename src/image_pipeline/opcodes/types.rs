/// Rectangle, plane selection and pitch shared by the area opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpcodeArea {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
    pub plane: u32,
    pub planes: u32,
    pub row_pitch: u32,
    pub col_pitch: u32,
}

impl OpcodeArea {
    /// Whether `(x, y)` lies inside the area and on its row/column pitch.
    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        let (x, y) = (x as u32, y as u32);
        x >= self.left
            && x < self.right
            && y >= self.top
            && y < self.bottom
            && (y - self.top) % self.row_pitch.max(1) == 0
            && (x - self.left) % self.col_pitch.max(1) == 0
    }

    /// Single-channel rasters only carry plane 0.
    pub fn covers_plane_zero(&self) -> bool {
        self.plane == 0 && self.planes > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarpRectilinear {
    /// Per plane: kr0..kr3, kt0, kt1.
    pub coefficients: Vec<[f64; 6]>,
    pub center_x: f64,
    pub center_y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarpFisheye {
    /// Per plane: kr0..kr3.
    pub coefficients: Vec<[f64; 4]>,
    pub center_x: f64,
    pub center_y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixVignetteRadial {
    pub k: [f64; 5],
    pub center_x: f64,
    pub center_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixBadPixelsConstant {
    pub constant: u32,
    pub bayer_phase: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixBadPixelsList {
    pub bayer_phase: u32,
    /// (row, column)
    pub bad_points: Vec<[u32; 2]>,
    /// (top, left, bottom, right)
    pub bad_rects: Vec<[u32; 4]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimBounds {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapTable {
    pub area: OpcodeArea,
    pub table: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapPolynomial {
    pub area: OpcodeArea,
    /// `degree + 1` coefficients, constant term first.
    pub coefficients: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GainMap {
    pub area: OpcodeArea,
    pub points_v: u32,
    pub points_h: u32,
    pub spacing_v: f64,
    pub spacing_h: f64,
    pub origin_v: f64,
    pub origin_h: f64,
    pub map_planes: u32,
    /// `[v][h][plane]`, row-major.
    pub gains: Vec<f32>,
}

impl GainMap {
    #[inline]
    pub fn gain(&self, v: usize, h: usize, plane: usize) -> f32 {
        let planes = self.map_planes.max(1) as usize;
        self.gains[(v * self.points_h as usize + h) * planes + plane]
    }
}

/// DeltaPerRow, DeltaPerColumn, ScalePerRow and ScalePerColumn share one
/// layout: an area followed by one float per row or column.
#[derive(Debug, Clone, PartialEq)]
pub struct PerLineOpcode {
    pub area: OpcodeArea,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    WarpRectilinear(WarpRectilinear),
    WarpFisheye(WarpFisheye),
    FixVignetteRadial(FixVignetteRadial),
    FixBadPixelsConstant(FixBadPixelsConstant),
    FixBadPixelsList(FixBadPixelsList),
    TrimBounds(TrimBounds),
    MapTable(MapTable),
    MapPolynomial(MapPolynomial),
    GainMap(GainMap),
    DeltaPerRow(PerLineOpcode),
    DeltaPerColumn(PerLineOpcode),
    ScalePerRow(PerLineOpcode),
    ScalePerColumn(PerLineOpcode),
}

impl Opcode {
    pub fn id(&self) -> u32 {
        match self {
            Opcode::WarpRectilinear(_) => 1,
            Opcode::WarpFisheye(_) => 2,
            Opcode::FixVignetteRadial(_) => 3,
            Opcode::FixBadPixelsConstant(_) => 4,
            Opcode::FixBadPixelsList(_) => 5,
            Opcode::TrimBounds(_) => 6,
            Opcode::MapTable(_) => 7,
            Opcode::MapPolynomial(_) => 8,
            Opcode::GainMap(_) => 9,
            Opcode::DeltaPerRow(_) => 10,
            Opcode::DeltaPerColumn(_) => 11,
            Opcode::ScalePerRow(_) => 12,
            Opcode::ScalePerColumn(_) => 13,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Opcode::WarpRectilinear(_) => "WarpRectilinear",
            Opcode::WarpFisheye(_) => "WarpFisheye",
            Opcode::FixVignetteRadial(_) => "FixVignetteRadial",
            Opcode::FixBadPixelsConstant(_) => "FixBadPixelsConstant",
            Opcode::FixBadPixelsList(_) => "FixBadPixelsList",
            Opcode::TrimBounds(_) => "TrimBounds",
            Opcode::MapTable(_) => "MapTable",
            Opcode::MapPolynomial(_) => "MapPolynomial",
            Opcode::GainMap(_) => "GainMap",
            Opcode::DeltaPerRow(_) => "DeltaPerRow",
            Opcode::DeltaPerColumn(_) => "DeltaPerColumn",
            Opcode::ScalePerRow(_) => "ScalePerRow",
            Opcode::ScalePerColumn(_) => "ScalePerColumn",
        }
    }
}

/// One entry of an opcode list together with its record header.
#[derive(Debug, Clone, PartialEq)]
pub struct OpcodeRecord {
    pub dng_version: u32,
    pub flags: u32,
    pub opcode: Opcode,
}

impl OpcodeRecord {
    pub const FLAG_OPTIONAL: u32 = 1;

    /// Readers may skip optional opcodes they cannot apply.
    pub fn is_optional(&self) -> bool {
        self.flags & Self::FLAG_OPTIONAL != 0
    }
}
