//! # duke-calc-core
//!
//! Core data structures for the duke-calc formula evaluation engine.
//!
//! This crate provides the fundamental types used throughout duke-calc:
//! - [`CellValue`] and [`CellError`] - Literal cell values and spreadsheet error values
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing with absolute markers
//! - [`CellKey`] - The identity of one cell across every loaded workbook
//!
//! ## Example
//!
//! ```rust
//! use duke_calc_core::{CellAddress, CellKey, CellRange};
//!
//! let addr = CellAddress::parse("$B$2").unwrap();
//! assert!(addr.row_absolute && addr.col_absolute);
//!
//! let range = CellRange::parse("C5:A1").unwrap();
//! assert_eq!(range.to_a1_string(), "A1:C5");
//!
//! let key = CellKey::new(0, 0, addr.row, addr.col);
//! assert_eq!(key.row, 1);
//! ```

pub mod cell;
pub mod error;

pub use cell::{CellAddress, CellError, CellKey, CellRange, CellValue, SharedString};
pub use error::{Error, Result};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
