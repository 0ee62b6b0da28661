//! Error types for duke-calc-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Addressing and naming errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// A row or column index past the last one a sheet has
    #[error("{axis} index {index} is past the last {axis} ({max})")]
    OutOfBounds {
        axis: &'static str,
        index: u32,
        max: u32,
    },

    #[error("No sheet at index {index} ({count} sheets)")]
    SheetIndex { index: usize, count: usize },

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Empty, too long, or containing `[]:*?/\`
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// A defined name that is empty or could be read as a cell reference
    #[error("Invalid defined name: {0}")]
    InvalidName(String),
}

impl Error {
    pub fn row(index: u32, max: u32) -> Self {
        Error::OutOfBounds {
            axis: "row",
            index,
            max,
        }
    }

    pub fn column(index: u32, max: u32) -> Self {
        Error::OutOfBounds {
            axis: "column",
            index,
            max,
        }
    }
}
