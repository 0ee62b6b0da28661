//! # duke-calc-formula
//!
//! Formula front end and interpreter for duke-calc.
//!
//! This crate provides:
//! - Formula parsing (text → AST) and compilation (AST → RPN tokens)
//! - Rendering tokens back to text
//! - An RPN interpreter that reads cells through a [`ReferenceResolver`]
//! - A function registry with a small built-in library
//! - Reference shifting for row, column and sheet edits
//!
//! ## Example
//!
//! ```rust
//! use duke_calc_formula::{Formula, FormulaShifter};
//!
//! let sheets = vec!["Sheet1".to_string()];
//! let mut formula = Formula::parse("=SUM(A1:A10)", &sheets).unwrap();
//!
//! // Insert two rows above row 5
//! let shifter = FormulaShifter::row_shift(0, 4, 1_048_573, 2).unwrap();
//! formula.adjust(&shifter, 0);
//! assert_eq!(formula.render(&sheets).unwrap(), "=SUM(A1:A12)");
//! ```

pub mod ast;
mod compile;
pub mod error;
pub mod functions;
pub mod interpreter;
pub mod operators;
pub mod parser;
mod render;
pub mod shifter;
pub mod token;
pub mod value;

pub use ast::{
    BinaryOperator, CellReference, FormulaExpr, RangeReference, SheetQualifier, UnaryOperator,
};
pub use error::{FormulaError, FormulaResult};
pub use functions::{FunctionDef, FunctionImpl, FunctionRegistry};
pub use interpreter::{evaluate, EvaluationContext, ReferenceResolver};
pub use parser::parse_formula;
pub use shifter::{FormulaShifter, ShiftResult};
pub use token::{Formula, SheetLookup, SheetRef, Token};
pub use value::{AreaValue, FormulaValue, RefValue};
