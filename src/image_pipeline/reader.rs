//! DNG container reading
//!
//! Byte and bit level cursors, tag directories, and the container that
//! ties them together and hands decoded samples to the pipeline.

pub mod bit_reader;
pub mod byte_reader;
pub mod cfa;
pub mod container;
pub mod directory;
pub mod field_type;
pub mod rational;
pub mod tags;


pub use bit_reader::BitReader;
pub use byte_reader::{ByteOrder, ByteReader};
pub use cfa::{BayerLayout, CfaPattern};
pub use container::DngFile;
pub use directory::{DirectoryKind, ImageFileDirectory};
pub use field_type::FieldType;
pub use rational::{Rational, SignedRational};
pub use tags::{tag, TagEntry, TagValue};
