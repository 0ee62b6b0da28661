//! Operand values and coercion rules

use duke_calc_core::{CellError, CellKey, CellRange, CellValue};
use lazy_regex::regex_is_match;
use std::cmp::Ordering;

/// A single-cell reference together with the value read through it
#[derive(Debug, Clone, PartialEq)]
pub struct RefValue {
    pub key: CellKey,
    pub value: CellValue,
}

/// A lazily read rectangle of cells, possibly spanning several sheets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaValue {
    pub book: usize,
    pub first_sheet: usize,
    pub last_sheet: usize,
    pub range: CellRange,
}

impl AreaValue {
    /// Whether the area covers exactly one cell on one sheet
    pub fn is_single_cell(&self) -> bool {
        self.first_sheet == self.last_sheet && self.range.is_single_cell()
    }

    /// Keys of every cell of the area, sheet by sheet, row-major
    pub fn keys(&self) -> impl Iterator<Item = CellKey> {
        let (book, range) = (self.book, self.range);
        (self.first_sheet..=self.last_sheet).flat_map(move |sheet| {
            (range.start.row..=range.end.row).flat_map(move |row| {
                (range.start.col..=range.end.col)
                    .map(move |col| CellKey::new(book, sheet, row, col))
            })
        })
    }
}

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    /// Blank cell
    Empty,
    /// Omitted function argument
    Missing,
    /// Single-cell reference
    Ref(RefValue),
    /// Area reference
    Area(AreaValue),
    Array(Vec<Vec<FormulaValue>>),
}

/// Parse a number the way formulas coerce text: optional sign, digits,
/// decimal point and exponent, surrounding whitespace allowed
pub fn parse_number(text: &str) -> Option<f64> {
    if !regex_is_match!(r"^\s*[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?\s*$", text) {
        return None;
    }
    text.trim().parse().ok()
}

/// Format a number like a spreadsheet's general format (no trailing zeros)
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl FormulaValue {
    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Get the error if this is one
    pub fn error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Whether the value is a reference (to a cell or an area)
    pub fn is_reference(&self) -> bool {
        matches!(self, FormulaValue::Ref(_) | FormulaValue::Area(_))
    }

    /// Coerce to a number: blank is 0, booleans are 1/0, numeric text parses
    pub fn to_number(&self) -> Result<f64, CellError> {
        match self {
            FormulaValue::Number(n) => Ok(*n),
            FormulaValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            FormulaValue::String(s) => parse_number(s).ok_or(CellError::Value),
            FormulaValue::Empty | FormulaValue::Missing => Ok(0.0),
            FormulaValue::Error(e) => Err(*e),
            FormulaValue::Ref(r) => FormulaValue::from(r.value.clone()).to_number(),
            FormulaValue::Area(_) | FormulaValue::Array(_) => Err(CellError::Value),
        }
    }

    /// Coerce to text: blank is `""`, numbers use the general format
    pub fn to_text(&self) -> Result<String, CellError> {
        match self {
            FormulaValue::Number(n) => Ok(format_number(*n)),
            FormulaValue::String(s) => Ok(s.clone()),
            FormulaValue::Boolean(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
            FormulaValue::Empty | FormulaValue::Missing => Ok(String::new()),
            FormulaValue::Error(e) => Err(*e),
            FormulaValue::Ref(r) => FormulaValue::from(r.value.clone()).to_text(),
            FormulaValue::Area(_) | FormulaValue::Array(_) => Err(CellError::Value),
        }
    }

    /// Coerce to a boolean; blank yields `None`
    pub fn to_bool(&self) -> Result<Option<bool>, CellError> {
        match self {
            FormulaValue::Boolean(b) => Ok(Some(*b)),
            FormulaValue::Number(n) => Ok(Some(*n != 0.0)),
            FormulaValue::String(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Ok(Some(true))
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Ok(Some(false))
                } else {
                    Err(CellError::Value)
                }
            }
            FormulaValue::Empty | FormulaValue::Missing => Ok(None),
            FormulaValue::Error(e) => Err(*e),
            FormulaValue::Ref(r) => FormulaValue::from(r.value.clone()).to_bool(),
            FormulaValue::Area(_) | FormulaValue::Array(_) => Err(CellError::Value),
        }
    }

    /// Spreadsheet ordering of two scalars
    ///
    /// Any boolean is greater than any number, and any number greater than any
    /// string. Blank takes the type of the other side (0, `""` or FALSE).
    /// Strings compare case-insensitively. An error on either side (left
    /// first) is returned as the error.
    pub fn compare(&self, other: &FormulaValue) -> Result<Ordering, CellError> {
        use FormulaValue::*;

        if let Error(e) = self {
            return Err(*e);
        }
        if let Error(e) = other {
            return Err(*e);
        }

        let blank = |v: &FormulaValue| matches!(v, Empty | Missing);
        let left = if blank(self) { blank_like(other) } else { self.clone() };
        let right = if blank(other) { blank_like(&left) } else { other.clone() };

        fn rank(v: &FormulaValue) -> u8 {
            match v {
                FormulaValue::String(_) => 0,
                FormulaValue::Number(_) => 1,
                _ => 2,
            }
        }

        Ok(match (&left, &right) {
            (Number(l), Number(r)) => l.partial_cmp(r).unwrap_or(Ordering::Equal),
            (String(l), String(r)) => l.to_uppercase().cmp(&r.to_uppercase()),
            (Boolean(l), Boolean(r)) => l.cmp(r),
            (l, r) => rank(l).cmp(&rank(r)),
        })
    }
}

/// The blank stand-in of the same type as `other`
fn blank_like(other: &FormulaValue) -> FormulaValue {
    match other {
        FormulaValue::String(_) => FormulaValue::String(String::new()),
        FormulaValue::Boolean(_) => FormulaValue::Boolean(false),
        _ => FormulaValue::Number(0.0),
    }
}

impl From<CellValue> for FormulaValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(n),
            CellValue::String(s) => FormulaValue::String(s.as_str().to_string()),
            CellValue::Boolean(b) => FormulaValue::Boolean(b),
            CellValue::Error(e) => FormulaValue::Error(e),
        }
    }
}

impl From<CellError> for FormulaValue {
    fn from(e: CellError) -> Self {
        FormulaValue::Error(e)
    }
}

impl From<f64> for FormulaValue {
    fn from(n: f64) -> Self {
        FormulaValue::Number(n)
    }
}

impl From<bool> for FormulaValue {
    fn from(b: bool) -> Self {
        FormulaValue::Boolean(b)
    }
}

impl From<&str> for FormulaValue {
    fn from(s: &str) -> Self {
        FormulaValue::String(s.to_string())
    }
}
