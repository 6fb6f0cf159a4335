//! DNG opcode lists
//!
//! OpcodeList1/2/3 are stored as big-endian records regardless of the
//! container's byte order. Every known opcode is parsed into a typed value;
//! the point-wise ones can also be applied to a single-channel raster.

mod apply;
mod parser;
mod types;


pub use apply::{apply_opcodes, ApplyOpcode};
pub use parser::{parse_opcode, parse_opcode_list};
pub use types::{
    FixBadPixelsConstant, FixBadPixelsList, FixVignetteRadial, GainMap, MapPolynomial, MapTable,
    Opcode, OpcodeArea, OpcodeRecord, PerLineOpcode, TrimBounds, WarpFisheye, WarpRectilinear,
};
