//! Workbooks as the evaluator sees them
//!
//! The evaluator only needs to look cells up by coordinate and tell formulas
//! from literals; [`EvaluationWorkbook`] is that capability. [`Workbook`] is
//! an in-memory implementation that also performs structural edits, rewriting
//! every stored formula with a [`FormulaShifter`].

use crate::error::Result;
use duke_calc_core::{CellAddress, CellValue, MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN};
use duke_calc_formula::{Formula, FormulaShifter, SheetLookup};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A stored formula and the result last saved with it
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaCell {
    pub formula: Arc<Formula>,
    /// Result saved with the document, used when an external workbook is missing
    pub cached: Option<CellValue>,
}

/// What a cell holds
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Value(CellValue),
    Formula(FormulaCell),
}

impl CellContent {
    pub fn is_formula(&self) -> bool {
        matches!(self, CellContent::Formula(_))
    }
}

/// Cell storage the evaluator reads from
///
/// Implementations must notify the evaluator of every change they make
/// outside of [`WorkbookEvaluator`](crate::WorkbookEvaluator) calls.
pub trait EvaluationWorkbook: SheetLookup + Any {
    fn sheet_count(&self) -> usize;

    /// Content of a cell, `None` when it is blank
    fn cell(&self, sheet: usize, row: u32, col: u16) -> Option<&CellContent>;

    fn set_cell(&mut self, sheet: usize, row: u32, col: u16, content: CellContent) -> Result<()>;

    fn remove_cell(&mut self, sheet: usize, row: u32, col: u16);

    /// A defined name visible from `sheet`, sheet scope first
    fn defined_name(&self, sheet: usize, name: &str) -> Option<Arc<Formula>>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A worksheet (single sheet in a workbook)
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<(u32, u16), CellContent>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a cell by row and column indices
    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellContent> {
        self.cells.get(&(row, col))
    }

    /// Non-blank cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u16), &CellContent)> {
        self.cells.iter().map(|(pos, content)| (*pos, content))
    }

    /// Move (or copy) the cells of a block of rows or columns
    ///
    /// Cells at the destination are overwritten; cells pushed off the sheet
    /// are dropped. Copied formulas are rewritten with `copy_shifter`.
    fn relocate(&mut self, edit: BlockEdit, copy_shifter: Option<(&FormulaShifter, usize)>) {
        let BlockEdit {
            rows,
            first,
            last,
            amount,
        } = edit;
        let index_of = |(row, col): (u32, u16)| if rows { row as i64 } else { col as i64 };
        let (dest_first, dest_last) = (first + amount, last + amount);
        let limit = if rows { MAX_ROWS as i64 } else { MAX_COLS as i64 };

        let mut moved = Vec::new();
        let mut kept = BTreeMap::new();
        for (pos, content) in std::mem::take(&mut self.cells) {
            let index = index_of(pos);
            let in_block = first <= index && index <= last;
            if in_block {
                moved.push((pos, content.clone()));
                if copy_shifter.is_some() && !(dest_first <= index && index <= dest_last) {
                    kept.insert(pos, content);
                }
            } else if !(dest_first <= index && index <= dest_last) {
                kept.insert(pos, content);
            }
        }

        for ((row, col), mut content) in moved {
            let index = index_of((row, col)) + amount;
            if index < 0 || index >= limit {
                continue;
            }
            let pos = if rows {
                (index as u32, col)
            } else {
                (row, index as u16)
            };
            if let (Some((shifter, sheet)), CellContent::Formula(cell)) =
                (copy_shifter, &mut content)
            {
                Arc::make_mut(&mut cell.formula).adjust(shifter, sheet);
                cell.cached = None;
            }
            kept.insert(pos, content);
        }
        self.cells = kept;
    }
}

#[derive(Debug, Clone, Copy)]
struct BlockEdit {
    rows: bool,
    first: i64,
    last: i64,
    amount: i64,
}

#[derive(Debug, Clone)]
struct DefinedName {
    name: String,
    /// Sheet index for sheet-scoped names
    scope: Option<usize>,
    formula: Arc<Formula>,
}

/// An in-memory workbook
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    names: Vec<DefinedName>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// Create a new workbook with one worksheet named `Sheet1`
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
            names: Vec::new(),
        }
    }

    /// Create a workbook whose sheets have the given names
    pub fn with_sheets(names: &[&str]) -> Result<Self> {
        let mut wb = Self {
            worksheets: Vec::new(),
            names: Vec::new(),
        };
        for name in names {
            wb.add_worksheet_with_name(name)?;
        }
        Ok(wb)
    }

    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Get a worksheet by index
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Add a new worksheet with specified name
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name)?;
        self.worksheets.push(Worksheet::new(name));
        Ok(self.worksheets.len() - 1)
    }

    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        if name.is_empty()
            || name.chars().count() > MAX_SHEET_NAME_LEN
            || name.contains(|c: char| matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        {
            return Err(duke_calc_core::Error::InvalidSheetName(name.to_string()).into());
        }
        if self.sheet_index(name).is_some() {
            return Err(duke_calc_core::Error::DuplicateSheetName(name.to_string()).into());
        }
        Ok(())
    }

    fn check_sheet(&self, sheet: usize) -> Result<()> {
        if sheet >= self.worksheets.len() {
            return Err(duke_calc_core::Error::SheetIndex {
                index: sheet,
                count: self.worksheets.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(
        &mut self,
        sheet: usize,
        address: &str,
        value: V,
    ) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell(sheet, addr.row, addr.col, CellContent::Value(value.into()))
    }

    /// Set a cell formula by address string, e.g. `=SUM(A1:A3)`
    pub fn set_cell_formula(&mut self, sheet: usize, address: &str, formula: &str) -> Result<()> {
        self.store_formula(sheet, address, formula, None)
    }

    /// Set a formula together with the result saved for it
    pub fn set_cell_formula_with_result<V: Into<CellValue>>(
        &mut self,
        sheet: usize,
        address: &str,
        formula: &str,
        cached: V,
    ) -> Result<()> {
        self.store_formula(sheet, address, formula, Some(cached.into()))
    }

    fn store_formula(
        &mut self,
        sheet: usize,
        address: &str,
        text: &str,
        cached: Option<CellValue>,
    ) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        let text = if text.starts_with('=') {
            text.to_string()
        } else {
            format!("={}", text)
        };
        let formula = Formula::parse(&text, &*self)?;
        self.set_cell(
            sheet,
            addr.row,
            addr.col,
            CellContent::Formula(FormulaCell {
                formula: Arc::new(formula),
                cached,
            }),
        )
    }

    /// Formula text of a cell, `None` for literals and blanks
    pub fn cell_formula(&self, sheet: usize, address: &str) -> Result<Option<String>> {
        let addr = CellAddress::parse(address)?;
        match self.cell(sheet, addr.row, addr.col) {
            Some(CellContent::Formula(cell)) => Ok(Some(cell.formula.render(self)?)),
            _ => Ok(None),
        }
    }

    /// Clear a cell
    pub fn clear_cell(&mut self, sheet: usize, address: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.remove_cell(sheet, addr.row, addr.col);
        Ok(())
    }

    /// Define a workbook-scoped name
    pub fn define_name(&mut self, name: &str, refers_to: &str) -> Result<()> {
        self.store_name(name, None, refers_to)
    }

    /// Define a name visible only from one sheet
    pub fn define_name_for_sheet(&mut self, name: &str, sheet: usize, refers_to: &str) -> Result<()> {
        self.check_sheet(sheet)?;
        self.store_name(name, Some(sheet), refers_to)
    }

    fn store_name(&mut self, name: &str, scope: Option<usize>, refers_to: &str) -> Result<()> {
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
        if !valid {
            return Err(duke_calc_core::Error::InvalidName(name.to_string()).into());
        }
        let formula = Arc::new(Formula::parse(refers_to, &*self)?);
        match self
            .names
            .iter_mut()
            .find(|n| n.scope == scope && n.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.formula = formula,
            None => self.names.push(DefinedName {
                name: name.to_string(),
                scope,
                formula,
            }),
        }
        Ok(())
    }

    // === Structural edits ===

    /// Move rows `first..=last` of a sheet by `amount` rows
    ///
    /// Inserting `n` rows at `r` is `shift_rows(sheet, r, MAX_ROWS - 1 - n, n)`;
    /// deleting rows `r..r+n` is moving the rows below them up by `n`.
    pub fn shift_rows(&mut self, sheet: usize, first: u32, last: u32, amount: i64) -> Result<()> {
        self.check_sheet(sheet)?;
        let shifter = FormulaShifter::row_shift(sheet, first, last, amount)?;
        self.adjust_formulas(&shifter);
        self.worksheets[sheet].relocate(
            BlockEdit {
                rows: true,
                first: first as i64,
                last: last as i64,
                amount,
            },
            None,
        );
        Ok(())
    }

    /// Copy rows `first..=last` of a sheet `amount` rows away
    pub fn copy_rows(&mut self, sheet: usize, first: u32, last: u32, amount: i64) -> Result<()> {
        self.check_sheet(sheet)?;
        let shifter = FormulaShifter::row_copy(sheet, first, last, amount)?;
        self.worksheets[sheet].relocate(
            BlockEdit {
                rows: true,
                first: first as i64,
                last: last as i64,
                amount,
            },
            Some((&shifter, sheet)),
        );
        Ok(())
    }

    /// Move columns `first..=last` of a sheet by `amount` columns
    pub fn shift_columns(&mut self, sheet: usize, first: u16, last: u16, amount: i64) -> Result<()> {
        self.check_sheet(sheet)?;
        let shifter = FormulaShifter::column_shift(sheet, first, last, amount)?;
        self.adjust_formulas(&shifter);
        self.worksheets[sheet].relocate(
            BlockEdit {
                rows: false,
                first: first as i64,
                last: last as i64,
                amount,
            },
            None,
        );
        Ok(())
    }

    /// Copy columns `first..=last` of a sheet `amount` columns away
    pub fn copy_columns(&mut self, sheet: usize, first: u16, last: u16, amount: i64) -> Result<()> {
        self.check_sheet(sheet)?;
        let shifter = FormulaShifter::column_copy(sheet, first, last, amount)?;
        self.worksheets[sheet].relocate(
            BlockEdit {
                rows: false,
                first: first as i64,
                last: last as i64,
                amount,
            },
            Some((&shifter, sheet)),
        );
        Ok(())
    }

    /// Move a worksheet to a new position
    pub fn move_worksheet(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_sheet(from)?;
        self.check_sheet(to)?;
        if from == to {
            return Ok(());
        }
        let shifter = FormulaShifter::sheet_move(from, to)?;
        self.adjust_formulas(&shifter);
        for name in &mut self.names {
            name.scope = name.scope.map(|s| shifter.sheet_index_after(s));
        }
        let worksheet = self.worksheets.remove(from);
        self.worksheets.insert(to, worksheet);
        Ok(())
    }

    fn adjust_formulas(&mut self, shifter: &FormulaShifter) {
        for (index, worksheet) in self.worksheets.iter_mut().enumerate() {
            for content in worksheet.cells.values_mut() {
                if let CellContent::Formula(cell) = content {
                    if Arc::make_mut(&mut cell.formula).adjust(shifter, index) {
                        cell.cached = None;
                    }
                }
            }
        }
        for name in &mut self.names {
            // Unqualified references in a workbook name follow the calling sheet
            let sheet = name.scope.unwrap_or(usize::MAX);
            Arc::make_mut(&mut name.formula).adjust(shifter, sheet);
        }
    }
}

impl SheetLookup for Workbook {
    fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets
            .iter()
            .position(|ws| ws.name.eq_ignore_ascii_case(name))
    }

    fn sheet_name(&self, index: usize) -> Option<&str> {
        self.worksheets.get(index).map(|ws| ws.name.as_str())
    }
}

impl EvaluationWorkbook for Workbook {
    fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    fn cell(&self, sheet: usize, row: u32, col: u16) -> Option<&CellContent> {
        self.worksheets.get(sheet)?.cell_at(row, col)
    }

    fn set_cell(&mut self, sheet: usize, row: u32, col: u16, content: CellContent) -> Result<()> {
        self.check_sheet(sheet)?;
        if row >= MAX_ROWS {
            return Err(duke_calc_core::Error::row(row, MAX_ROWS - 1).into());
        }
        if col >= MAX_COLS {
            return Err(duke_calc_core::Error::column(col as u32, MAX_COLS as u32 - 1).into());
        }
        let cells = &mut self.worksheets[sheet].cells;
        if content == CellContent::Value(CellValue::Empty) {
            cells.remove(&(row, col));
        } else {
            cells.insert((row, col), content);
        }
        Ok(())
    }

    fn remove_cell(&mut self, sheet: usize, row: u32, col: u16) {
        if let Some(worksheet) = self.worksheets.get_mut(sheet) {
            worksheet.cells.remove(&(row, col));
        }
    }

    fn defined_name(&self, sheet: usize, name: &str) -> Option<Arc<Formula>> {
        let matching = |scope: Option<usize>| {
            self.names
                .iter()
                .find(|n| n.scope == scope && n.name.eq_ignore_ascii_case(name))
        };
        matching(Some(sheet))
            .or_else(|| matching(None))
            .map(|n| Arc::clone(&n.formula))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
