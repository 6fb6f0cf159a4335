//! Common utilities module
//!
//! Errors, the per-run timing context and small numeric helpers shared by
//! every stage of the pipeline.

pub mod error;
pub mod math;
pub mod timing;

pub use error::{CompressionError, DngError, Result};
pub use timing::RunTimer;
