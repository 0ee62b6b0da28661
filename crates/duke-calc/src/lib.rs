//! # duke-calc
//!
//! Spreadsheet formula evaluation with a dependency-aware result cache.
//!
//! A [`WorkbookEvaluator`] evaluates formula cells on demand. Every result is
//! cached together with the cells it read, so that after a cell update only
//! the results computed from that cell are cleared.
//!
//! ## Features
//!
//! - Lazy, cached evaluation of formula cells
//! - Exact invalidation through consumer edges, observable with an
//!   [`EvaluationListener`]
//! - Circular reference detection
//! - References into other workbooks
//! - Row, column and sheet edits that rewrite stored formulas
//!
//! ## Example
//!
//! ```rust
//! use duke_calc::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! workbook.set_cell_value(0, "A1", 10.0).unwrap();
//! workbook.set_cell_value(0, "A2", 20.0).unwrap();
//! workbook.set_cell_formula(0, "A3", "=SUM(A1:A2)").unwrap();
//!
//! let mut evaluator = WorkbookEvaluator::new(workbook);
//! let a3 = evaluator.cell_key("Sheet1", "A3").unwrap();
//! assert_eq!(evaluator.evaluate(a3).unwrap(), CellValue::Number(30.0));
//!
//! // Insert a row above row 2; the formula follows its inputs
//! evaluator
//!     .edit_workbook(0, |wb: &mut Workbook| wb.shift_rows(0, 1, 2, 1))
//!     .unwrap()
//!     .unwrap();
//! let wb = evaluator.workbook_as::<Workbook>(0).unwrap();
//! assert_eq!(wb.cell_formula(0, "A4").unwrap().as_deref(), Some("=SUM(A1:A3)"));
//! ```

pub mod cache;
pub mod error;
pub mod evaluator;
pub mod listener;
pub mod options;
pub mod prelude;
pub mod tracker;
pub mod workbook;

pub use cache::{CacheEntry, CellUpdate, EntryId, EntryKind, EvaluationCache};
pub use error::{Error, Result};
pub use evaluator::WorkbookEvaluator;
pub use listener::{EvaluationListener, NullListener};
pub use options::EvaluatorOptions;
pub use tracker::EvaluationTracker;
pub use workbook::{CellContent, EvaluationWorkbook, FormulaCell, Workbook, Worksheet};

// Re-export core types
pub use duke_calc_core::{CellAddress, CellError, CellKey, CellRange, CellValue};

// Re-export formula types
pub use duke_calc_formula::{
    parse_formula, Formula, FormulaError, FormulaShifter, FunctionDef, FunctionImpl,
    FunctionRegistry, ShiftResult, SheetLookup,
};
