use thiserror::Error;

/// Failures raised while decoding a compressed strip or tile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompressionError {
    #[error("Missing start-of-image marker")]
    MissingStartOfImage,

    #[error("Unsupported JPEG marker 0x{0:04X}")]
    UnsupportedMarker(u16),

    #[error("Scan references undefined Huffman table {0}")]
    MissingHuffmanTable(u8),

    #[error("Scan references component {0} absent from the frame header")]
    UnknownScanComponent(u8),

    #[error("Frame rows hold {row_width} samples, expected {expected}")]
    FrameGeometryMismatch { row_width: usize, expected: usize },

    #[error("Malformed Huffman table: {0}")]
    MalformedHuffmanTable(String),

    #[error("Bitstream contains no valid Huffman code")]
    InvalidHuffmanCode,

    #[error("Bitstream exhausted after {produced} of {expected} samples")]
    BitstreamExhausted { produced: usize, expected: usize },

    #[error("Unsupported predictor {0} (only predictor 1 is supported)")]
    UnsupportedPredictor(u8),

    #[error("Frame header is missing or precedes no scan")]
    MissingFrameHeader,

    #[error("Unsupported bits per sample: {0}")]
    UnsupportedBitDepth(u16),
}

#[derive(Error, Debug)]
pub enum DngError {
    #[error("Malformed container at offset {offset}: {message}")]
    Format { offset: u64, message: String },

    #[error("Unknown field type {field_type} in tag {tag}")]
    UnknownFieldType { tag: u16, field_type: u16 },

    #[error("Tag {tag} has {actual} values, expected {expected}")]
    CountMismatch { tag: u16, expected: usize, actual: usize },

    #[error("Missing required tag {0}")]
    MissingTag(u16),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown opcode id {0}")]
    UnknownOpcode(u32),

    #[error("Failed to decompress image data: {0}")]
    Compression(#[from] CompressionError),

    #[error("Unexpected end of data at offset {offset} (requested {requested} bytes)")]
    EndOfData { offset: u64, requested: usize },

    #[error("Invalid configuration for stage {stage}: {message}")]
    Configuration { stage: String, message: String },

    #[error("GPU device error: {0}")]
    Device(String),

    #[error("Failed to encode output image: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DngError {
    pub fn format(offset: u64, message: impl Into<String>) -> Self {
        Self::Format { offset, message: message.into() }
    }

    pub fn configuration(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration { stage: stage.into(), message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, DngError>;
