//! QR-code recognition: binarisation, finder-pattern detection, grid
//! assembly, and ISO/IEC 18004 symbol decoding.
//!
//! The pipeline is a straight line of independent stages (Section 4):
//! threshold, region labelling, capstone detection, grid assembly,
//! sampling, and bitstream decoding. [`Context`] owns the mutable state
//! for the first five; [`decode`] is a pure function over the last one.

pub mod bitstream;
pub mod capstone;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod format;
pub mod geometry;
pub mod grid;
pub mod region;
pub mod rs;
pub mod sample;
pub mod tables;
pub mod threshold;
pub(crate) mod util;

pub use config::Config;
pub use context::{decode, Context};
pub use data::{Code, Data, DataType, EccLevel, Mode, Segment};
pub use error::{DecodeError, Error};
pub use geometry::Point;
