//! Error types for duke-calc

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while evaluating workbooks
#[derive(Debug, Error)]
pub enum Error {
    /// Core error (addresses, sheets)
    #[error(transparent)]
    Core(#[from] duke_calc_core::Error),

    /// Formula error outside of an evaluation (parsing, shifting, registration)
    #[error(transparent)]
    Formula(#[from] duke_calc_formula::FormulaError),

    /// Fatal failure while evaluating a cell
    #[error("Error evaluating {cell}: {source}")]
    Evaluation {
        /// The cell whose evaluation was requested, e.g. `Sheet1!A1`
        cell: String,
        #[source]
        source: duke_calc_formula::FormulaError,
    },

    /// A workbook name that is not registered with the evaluator
    #[error("Workbook not found: {0}")]
    WorkbookNotFound(String),

    /// Two referenced workbooks with the same name
    #[error("Duplicate workbook name: {0}")]
    DuplicateWorkbook(String),

    /// A structural edit on a workbook type the evaluator cannot edit
    #[error("Unsupported workbook: {0}")]
    UnsupportedWorkbook(String),
}
