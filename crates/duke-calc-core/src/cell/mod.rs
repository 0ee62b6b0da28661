//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - The literal value of a non-formula cell
//! - [`CellAddress`] - A cell's location (e.g., "A1", "$B$2")
//! - [`CellRange`] - A normalized block of cells (e.g., "A1:B10")
//! - [`CellKey`] - (workbook, sheet, row, column) coordinate

mod address;
mod key;
mod value;

pub use address::{CellAddress, CellRange};
pub use key::CellKey;
pub use value::{CellError, CellValue, SharedString};
