use std::collections::TryReserveError;

use thiserror::Error;

/// Errors from the context-level API (`resize`, `begin`, `extract`).
///
/// These are distinct from [`DecodeError`], which is returned from the pure
/// `decode` function and never touches context state.
#[derive(Error, Debug)]
pub enum Error {
    #[error("out of memory while resizing to {0}x{1}")]
    Alloc(usize, usize, #[source] TryReserveError),
    #[error("invalid dimensions {0}x{1}")]
    InvalidDimensions(usize, usize),
    #[error("grid index {0} out of bounds (count is {1})")]
    GridIndexOutOfBounds(usize, usize),
}

/// The decode error taxonomy from ISO/IEC 18004 symbol recovery.
///
/// A recognition failure (no finder patterns found, a rejected capstone
/// triplet, ...) is never represented here: those simply result in fewer
/// grids reported by [`crate::context::Context::count`]. This enum only
/// covers failures discovered once a [`crate::data::Code`] has been
/// extracted and handed to [`crate::context::decode`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid grid size")]
    InvalidGridSize,
    #[error("invalid version")]
    InvalidVersion,
    #[error("format data ECC failure")]
    FormatEcc,
    #[error("ECC failure")]
    DataEcc,
    #[error("unknown data type")]
    UnknownDataType,
    #[error("data overflow")]
    DataOverflow,
    #[error("data underflow")]
    DataUnderflow,
}

impl DecodeError {
    /// Mirrors the C original's `quirc_strerror` lookup table.
    pub fn strerror(self) -> &'static str {
        match self {
            DecodeError::InvalidGridSize => "Invalid grid size",
            DecodeError::InvalidVersion => "Invalid version",
            DecodeError::FormatEcc => "Format data ECC failure",
            DecodeError::DataEcc => "ECC failure",
            DecodeError::UnknownDataType => "Unknown data type",
            DecodeError::DataOverflow => "Data overflow",
            DecodeError::DataUnderflow => "Data underflow",
        }
    }
}
