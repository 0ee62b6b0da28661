//! Formula error types
//!
//! These are the fatal conditions of parsing, compiling and evaluating a
//! formula. Spreadsheet errors such as `#DIV/0!` are not represented here:
//! they are ordinary values (see [`FormulaValue::Error`](crate::FormulaValue::Error)).

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unknown function, or a known one nobody registered an implementation for
    #[error("Function not implemented: {0}")]
    NotImplemented(String),

    #[error("{function} takes {expected} arguments, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// A sheet index with no sheet behind it
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Token sequence the interpreter cannot run
    #[error("Corrupt formula: {0}")]
    CorruptFormula(String),

    /// External reference to a workbook that is not loaded
    #[error("Workbook not found: {0}")]
    WorkbookNotFound(String),

    /// Registration through the wrong registry, or over an implemented function
    #[error("Function registration rejected: {0}")]
    Registration(String),

    /// Row, column or sheet edit with arguments outside the sheet
    #[error("Invalid shift: {0}")]
    InvalidShift(String),
}
