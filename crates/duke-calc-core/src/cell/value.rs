//! Literal cell values and spreadsheet errors

use std::fmt;
use std::sync::Arc;

/// What a cell holds once any formula in it has been evaluated
///
/// Plain cells store one of these directly; formula cells cache one as their
/// result. A formula result is never `Empty`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellValue {
    /// Blank
    #[default]
    Empty,
    Boolean(bool),
    Number(f64),
    String(SharedString),
    Error(CellError),
}

impl CellValue {
    pub fn string<S: AsRef<str>>(s: S) -> Self {
        CellValue::String(SharedString::new(s))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(true) => f.write_str("TRUE"),
            CellValue::Boolean(false) => f.write_str("FALSE"),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::String(s) => f.write_str(s.as_str()),
            CellValue::Error(e) => f.write_str(e.as_str()),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::string(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(SharedString(Arc::from(s)))
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

/// In-band error values
///
/// Errors flow through operators and functions like any other value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellError {
    /// `#NULL!`
    Null,
    /// `#DIV/0!`
    Div0,
    /// `#VALUE!`
    Value,
    /// `#REF!`, also what a reference deleted by a row or column edit reads as
    Ref,
    /// `#NAME?`
    Name,
    /// `#NUM!`
    Num,
    /// `#N/A`
    Na,
    /// A formula that reads itself, directly or through other cells
    ///
    /// Produced by the evaluator; a formula cannot spell it.
    CircularRef,
}

/// Error literals accepted in formula text, in `CellError` order
const LITERALS: [(&str, CellError); 7] = [
    ("#NULL!", CellError::Null),
    ("#DIV/0!", CellError::Div0),
    ("#VALUE!", CellError::Value),
    ("#REF!", CellError::Ref),
    ("#NAME?", CellError::Name),
    ("#NUM!", CellError::Num),
    ("#N/A", CellError::Na),
];

impl CellError {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::CircularRef => "~CIRCULAR~REF~",
            other => LITERALS
                .iter()
                .find(|(_, e)| e == other)
                .map_or("#VALUE!", |(text, _)| text),
        }
    }

    /// The error a literal such as `#n/a` denotes (case-insensitive)
    pub fn from_literal(text: &str) -> Option<Self> {
        LITERALS
            .iter()
            .find(|(literal, _)| literal.eq_ignore_ascii_case(text))
            .map(|(_, e)| *e)
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable string shared by workbooks, the cache and results without copying
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub struct SharedString(Arc<str>);

impl SharedString {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString(Arc::from(s))
    }
}

impl From<SharedString> for String {
    fn from(s: SharedString) -> Self {
        s.0.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_conversions() {
        assert_eq!(CellValue::from(42.0), CellValue::Number(42.0));
        assert_eq!(CellValue::from(true), CellValue::Boolean(true));
        assert_eq!(CellValue::from("hi"), CellValue::from(String::from("hi")));
        assert!(CellValue::from(CellError::Na).is_error());
        assert!(CellValue::default().is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(CellValue::Number(6.0).to_string(), "6");
        assert_eq!(CellValue::Number(-2.5).to_string(), "-2.5");
        assert_eq!(CellValue::Boolean(false).to_string(), "FALSE");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn test_error_literals() {
        assert_eq!(CellError::Div0.to_string(), "#DIV/0!");
        assert_eq!(CellError::Na.as_str(), "#N/A");
        assert_eq!(CellError::CircularRef.to_string(), "~CIRCULAR~REF~");
        assert_eq!(CellError::from_literal("#n/a"), Some(CellError::Na));
        assert_eq!(CellError::from_literal("#name?"), Some(CellError::Name));
        assert_eq!(CellError::from_literal("~CIRCULAR~REF~"), None);
    }

    #[test]
    fn test_shared_string_equality_ignores_allocation() {
        let a = SharedString::new("text");
        let b = SharedString::from(String::from("text"));
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(String::from(a), "text");
    }
}
