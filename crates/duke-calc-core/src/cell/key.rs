//! Cell coordinates shared by every loaded workbook

use super::CellAddress;
use std::fmt;

/// Identity of one cell within an evaluation session
///
/// `book` indexes the workbooks registered with an evaluator, `sheet` the
/// sheets of that workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellKey {
    pub book: usize,
    pub sheet: usize,
    pub row: u32,
    pub col: u16,
}

impl CellKey {
    /// Create a new cell key
    pub fn new(book: usize, sheet: usize, row: u32, col: u16) -> Self {
        Self {
            book,
            sheet,
            row,
            col,
        }
    }

    /// Create a key for a cell address in the given book and sheet
    pub fn from_address(book: usize, sheet: usize, addr: &CellAddress) -> Self {
        Self::new(book, sheet, addr.row, addr.col)
    }

    /// The relative A1 address of this cell
    pub fn address(&self) -> CellAddress {
        CellAddress::new(self.row, self.col)
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}!{}", self.book, self.sheet, self.address())
    }
}
