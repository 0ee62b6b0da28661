//! Prelude module - common imports for duke-calc users
//!
//! ```rust
//! use duke_calc::prelude::*;
//! ```

pub use crate::{
    // Cell types
    CellAddress,
    CellError,
    CellKey,
    CellRange,
    CellValue,

    // Error types
    Error,
    Result,

    // Evaluation
    EvaluationListener,
    EvaluationWorkbook,
    EvaluatorOptions,
    WorkbookEvaluator,

    // Formula types
    Formula,
    FormulaShifter,
    FunctionRegistry,

    // Main types
    Workbook,
    Worksheet,
};
