//! Cell address and range types

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g., "A1", "$B$2")
///
/// Rows and columns are 0-based internally. The `$` markers are kept because
/// they decide how a reference behaves when a formula is copied: absolute
/// coordinates stay pinned, relative ones follow the formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., XFD=16383)
    pub col: u16,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a new cell address with relative references
    pub fn new(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, false, false)
    }

    /// Create a new cell address with specified absolute/relative flags
    pub fn with_absolute(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Create an absolute cell address ($A$1 style)
    pub fn absolute(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, true, true)
    }

    /// Parse a cell address from A1-style notation, keeping `$` markers
    ///
    /// # Examples
    /// ```
    /// use duke_calc_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("C$7").unwrap();
    /// assert_eq!((addr.row, addr.col), (6, 2));
    /// assert!(addr.row_absolute);
    /// assert!(!addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let text = s.trim();
        let invalid = |why: &str| Error::InvalidAddress(format!("{} in '{}'", why, text));

        let (col_absolute, rest) = match text.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let split = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let (letters, rest) = rest.split_at(split);
        if letters.is_empty() {
            return Err(invalid("no column letters"));
        }
        let col = Self::letters_to_column(letters)?;

        let (row_absolute, digits) = match rest.strip_prefix('$') {
            Some(digits) => (true, digits),
            None => (false, rest),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("invalid row number"));
        }
        // Row numbers are 1-based in A1 notation
        let row = match digits.parse::<u32>() {
            Ok(0) => return Err(invalid("row 0")),
            Ok(n) => n - 1,
            Err(_) => return Err(Error::row(u32::MAX, MAX_ROWS - 1)),
        };
        if row >= MAX_ROWS {
            return Err(Error::row(row, MAX_ROWS - 1));
        }

        Ok(Self::with_absolute(row, col, row_absolute, col_absolute))
    }

    /// Column letters of a 0-based index (`0` is `A`, `26` is `AA`)
    pub fn column_to_letters(col: u16) -> String {
        let mut rest = u32::from(col) + 1;
        let mut letters = String::new();
        while rest > 0 {
            let digit = (rest - 1) % 26;
            letters.insert(0, char::from(b'A' + digit as u8));
            rest = (rest - 1) / 26;
        }
        letters
    }

    /// 0-based index of column letters, case-insensitive
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(Error::InvalidAddress(format!(
                "invalid column letters '{}'",
                letters
            )));
        }
        let mut number: u32 = 0;
        for b in letters.bytes() {
            number = number * 26 + u32::from(b.to_ascii_uppercase() - b'A') + 1;
            if number > u32::from(MAX_COLS) {
                return Err(Error::column(number - 1, u32::from(MAX_COLS) - 1));
            }
        }
        Ok((number - 1) as u16)
    }

    /// Format as A1-style string, including `$` markers
    pub fn to_a1_string(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.col_absolute { "$" } else { "" },
            Self::column_to_letters(self.col),
            if self.row_absolute { "$" } else { "" },
            self.row + 1
        )
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular range of cells (e.g., "A1:B10")
///
/// A range is always normalized so that `start` is the top-left corner and
/// `end` the bottom-right one. When normalization swaps two rows (or two
/// columns), their absolute markers travel with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRange {
    /// Top-left corner
    pub start: CellAddress,
    /// Bottom-right corner
    pub end: CellAddress,
}

impl CellRange {
    /// Create a new cell range, sorting corners top-left to bottom-right
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        let ((first_row, first_row_abs), (last_row, last_row_abs)) = if start.row <= end.row {
            ((start.row, start.row_absolute), (end.row, end.row_absolute))
        } else {
            ((end.row, end.row_absolute), (start.row, start.row_absolute))
        };

        let ((first_col, first_col_abs), (last_col, last_col_abs)) = if start.col <= end.col {
            ((start.col, start.col_absolute), (end.col, end.col_absolute))
        } else {
            ((end.col, end.col_absolute), (start.col, start.col_absolute))
        };

        Self {
            start: CellAddress::with_absolute(first_row, first_col, first_row_abs, first_col_abs),
            end: CellAddress::with_absolute(last_row, last_col, last_row_abs, last_col_abs),
        }
    }

    /// Create a relative range from row/column indices
    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse a range from A1:B10 notation
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((start, end)) => {
                let start = CellAddress::parse(start)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                let end = CellAddress::parse(end)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                Ok(Self::new(start, end))
            }
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    /// Check if a position is within this range
    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.start.row && row <= self.end.row && col >= self.start.col && col <= self.end.col
    }

    /// Number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Whether the range covers exactly one cell
    pub fn is_single_cell(&self) -> bool {
        self.start.row == self.end.row && self.start.col == self.end.col
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        format!("{}:{}", self.start, self.end)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_letters_roundtrip_at_boundaries() {
        assert_eq!(CellAddress::column_to_letters(0), "A");
        assert_eq!(CellAddress::column_to_letters(25), "Z");
        assert_eq!(CellAddress::column_to_letters(26), "AA");
        assert_eq!(CellAddress::column_to_letters(701), "ZZ");
        assert_eq!(CellAddress::column_to_letters(16383), "XFD");

        assert_eq!(CellAddress::letters_to_column("aa").unwrap(), 26);
        assert_eq!(CellAddress::letters_to_column("XFD").unwrap(), 16383);
        assert!(CellAddress::letters_to_column("XFE").is_err());
        assert!(CellAddress::letters_to_column("ZZZZZZ").is_err());
    }

    #[test]
    fn test_parse_keeps_absolute_markers() {
        let addr = CellAddress::parse("$A1").unwrap();
        assert!(addr.col_absolute);
        assert!(!addr.row_absolute);

        let addr = CellAddress::parse("b$20").unwrap();
        assert_eq!(addr, CellAddress::with_absolute(19, 1, true, false));
        assert_eq!(addr.to_string(), "B$20");
        assert_eq!(CellAddress::absolute(0, 0).to_string(), "$A$1");
    }

    #[test]
    fn test_parse_rejects_malformed_addresses() {
        assert!(CellAddress::parse("").is_err());
        assert!(CellAddress::parse("A").is_err());
        assert!(CellAddress::parse("12").is_err());
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("A1B").is_err());
        assert!(CellAddress::parse("A1048577").is_err());
    }

    #[test]
    fn test_range_normalization_moves_absolute_flags_with_values() {
        // A$20:A10 -> A10:A$20
        let range = CellRange::new(
            CellAddress::with_absolute(19, 0, true, false),
            CellAddress::new(9, 0),
        );
        assert_eq!(range.start, CellAddress::new(9, 0));
        assert_eq!(range.end, CellAddress::with_absolute(19, 0, true, false));

        // $C1:A2 -> A1:$C2
        let range = CellRange::new(
            CellAddress::with_absolute(0, 2, false, true),
            CellAddress::new(1, 0),
        );
        assert_eq!(range.to_a1_string(), "A1:$C2");
    }

    #[test]
    fn test_range_parse_and_dimensions() {
        let range = CellRange::parse("D4:B2").unwrap();
        assert_eq!(range.to_a1_string(), "B2:D4");
        assert_eq!(range.row_count(), 3);
        assert_eq!(range.col_count(), 3);
        assert!(range.contains(2, 2));
        assert!(!range.contains(0, 0));
        assert!(!range.is_single_cell());

        let single = CellRange::parse("C3").unwrap();
        assert!(single.is_single_cell());
        assert!(CellRange::parse("A1:").is_err());
    }
}
