//! Workbook evaluator
//!
//! [`WorkbookEvaluator`] owns the evaluation cache of a workbook session and
//! answers `evaluate` requests, reusing cached results until a cell update
//! notification clears them.
//!
//! # Example
//!
//! ```rust
//! use duke_calc::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! workbook.set_cell_value(0, "A1", 20.0).unwrap();
//! workbook.set_cell_formula(0, "B1", "=A1*2+2").unwrap();
//!
//! let mut evaluator = WorkbookEvaluator::new(workbook);
//! let b1 = evaluator.cell_key("Sheet1", "B1").unwrap();
//! assert_eq!(evaluator.evaluate(b1).unwrap(), CellValue::Number(42.0));
//!
//! // Edits go through the evaluator so dependents are cleared
//! let a1 = evaluator.cell_key("Sheet1", "A1").unwrap();
//! evaluator.set_cell_value(a1, 5.0).unwrap();
//! assert_eq!(evaluator.evaluate(b1).unwrap(), CellValue::Number(12.0));
//! ```

use crate::cache::{CellUpdate, EvaluationCache};
use crate::error::{Error, Result};
use crate::listener::{EvaluationListener, NullListener};
use crate::options::EvaluatorOptions;
use crate::tracker::EvaluationTracker;
use crate::workbook::{CellContent, EvaluationWorkbook, FormulaCell};
use duke_calc_core::{CellAddress, CellError, CellKey, CellValue};
use duke_calc_formula::{
    evaluate, EvaluationContext, Formula, FormulaError, FormulaResult, FunctionRegistry,
    ReferenceResolver,
};
use log::{debug, info, trace, warn};
use std::sync::Arc;

/// A workbook registered with the evaluator
struct BookSlot {
    /// Empty while the evaluator's own workbook is unnamed
    name: String,
    workbook: Box<dyn EvaluationWorkbook>,
}

/// Evaluates formula cells of a workbook and of the workbooks it references
///
/// Book index 0 is the evaluator's own workbook; referenced workbooks set up
/// with [`setup_referenced_workbooks`](Self::setup_referenced_workbooks)
/// follow in the order given, and share the evaluator's cache. Once named
/// with [`set_workbook_name`](Self::set_workbook_name), the own workbook can
/// be referenced back from the others as `[Name]Sheet1!A1`.
pub struct WorkbookEvaluator {
    books: Vec<BookSlot>,
    cache: EvaluationCache,
    tracker: EvaluationTracker,
    registry: Arc<FunctionRegistry>,
    options: EvaluatorOptions,
    listener: Box<dyn EvaluationListener>,
}

impl WorkbookEvaluator {
    /// Evaluator with the standard function registry
    pub fn new<W: EvaluationWorkbook + 'static>(workbook: W) -> Self {
        Self::with_registry(workbook, Arc::new(FunctionRegistry::new()))
    }

    /// Evaluator using a caller-supplied function registry
    pub fn with_registry<W: EvaluationWorkbook + 'static>(
        workbook: W,
        registry: Arc<FunctionRegistry>,
    ) -> Self {
        Self::with_options(workbook, registry, EvaluatorOptions::default())
    }

    pub fn with_options<W: EvaluationWorkbook + 'static>(
        workbook: W,
        registry: Arc<FunctionRegistry>,
        options: EvaluatorOptions,
    ) -> Self {
        Self {
            books: vec![BookSlot {
                name: String::new(),
                workbook: Box::new(workbook),
            }],
            cache: EvaluationCache::new(),
            tracker: EvaluationTracker::new(),
            registry,
            options,
            listener: Box::new(NullListener),
        }
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    /// Use the stored cached result of formulas that reference a workbook
    /// which is not set up, instead of failing
    pub fn set_ignore_missing_workbooks(&mut self, ignore: bool) {
        self.options.ignore_missing_workbooks = ignore;
    }

    /// Replace the listener receiving cache events
    pub fn set_listener(&mut self, listener: Box<dyn EvaluationListener>) {
        self.listener = listener;
    }

    /// Name other workbooks use to refer to the evaluator's own workbook
    pub fn set_workbook_name<S: Into<String>>(&mut self, name: S) -> Result<()> {
        let name = name.into();
        if self.books[1..]
            .iter()
            .any(|slot| slot.name.eq_ignore_ascii_case(&name))
        {
            return Err(Error::DuplicateWorkbook(name));
        }
        self.books[0].name = name;
        self.clear_all_cached_result_values();
        Ok(())
    }

    pub fn workbook_name(&self) -> &str {
        &self.books[0].name
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }

    /// The evaluator's own workbook (index 0) or a referenced one
    pub fn workbook(&self, book: usize) -> Option<&dyn EvaluationWorkbook> {
        self.books.get(book).map(|slot| slot.workbook.as_ref())
    }

    /// A workbook downcast to its concrete type
    pub fn workbook_as<W: EvaluationWorkbook>(&self, book: usize) -> Option<&W> {
        self.workbook(book)
            .and_then(|workbook| workbook.as_any().downcast_ref::<W>())
    }

    /// Coordinate of a cell of the evaluator's own workbook
    pub fn cell_key(&self, sheet_name: &str, address: &str) -> Result<CellKey> {
        let sheet = self.books[0]
            .workbook
            .sheet_index(sheet_name)
            .ok_or_else(|| duke_calc_core::Error::SheetNotFound(sheet_name.to_string()))?;
        self.local_key(sheet, address)
    }

    /// Coordinate of a cell of the evaluator's own workbook, by sheet index
    pub fn local_key(&self, sheet: usize, address: &str) -> Result<CellKey> {
        let addr = CellAddress::parse(address)?;
        Ok(CellKey::from_address(0, sheet, &addr))
    }

    /// Value of a cell, evaluating its formula unless a cached result exists
    ///
    /// In-band spreadsheet errors are returned as values. Unregistered
    /// functions, corrupt formulas and missing workbooks fail.
    pub fn evaluate(&mut self, key: CellKey) -> Result<CellValue> {
        self.evaluate_any(key).map_err(|source| Error::Evaluation {
            cell: self.describe(key),
            source,
        })
    }

    /// Record that the content of a cell changed
    ///
    /// Reads the cell's new content from its workbook and clears the cached
    /// results of every formula computed from it.
    pub fn notify_update_cell(&mut self, key: CellKey) {
        let update = match self.content(key) {
            Some(CellContent::Value(value)) => CellUpdate::Plain(value.clone()),
            Some(CellContent::Formula(_)) => CellUpdate::Formula,
            None => CellUpdate::Plain(CellValue::Empty),
        };
        self.cache
            .notify_update_cell(key, update, self.listener.as_mut());
    }

    /// Record that a cell was removed from its workbook
    pub fn notify_delete_cell(&mut self, key: CellKey) {
        self.cache.notify_delete_cell(key, self.listener.as_mut());
    }

    /// Store a literal and clear the results depending on it
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, key: CellKey, value: V) -> Result<()> {
        let value = value.into();
        let workbook = self.workbook_mut(key.book)?;
        if value.is_empty() {
            workbook.remove_cell(key.sheet, key.row, key.col);
        } else {
            workbook.set_cell(key.sheet, key.row, key.col, CellContent::Value(value))?;
        }
        self.notify_update_cell(key);
        Ok(())
    }

    /// Store a formula (text starting with `=`) and clear the results depending on the cell
    pub fn set_cell_formula(&mut self, key: CellKey, text: &str) -> Result<()> {
        let workbook = self.workbook_mut(key.book)?;
        let formula = Formula::parse(text, &*workbook)?;
        workbook.set_cell(
            key.sheet,
            key.row,
            key.col,
            CellContent::Formula(FormulaCell {
                formula: Arc::new(formula),
                cached: None,
            }),
        )?;
        self.notify_update_cell(key);
        Ok(())
    }

    /// Remove a cell from its workbook and forget its cache entry
    pub fn clear_cell(&mut self, key: CellKey) -> Result<()> {
        self.workbook_mut(key.book)?
            .remove_cell(key.sheet, key.row, key.col);
        self.notify_delete_cell(key);
        Ok(())
    }

    /// Destroy every cached result
    pub fn clear_all_cached_result_values(&mut self) {
        self.cache.clear();
        self.listener.on_clear_whole_cache();
    }

    /// Replace the set of workbooks external references resolve to
    ///
    /// Names are matched case-insensitively, as in `[Book2.xlsx]Sheet1!A1`.
    /// The cache is cleared since results may depend on the old set.
    pub fn setup_referenced_workbooks<I, W>(&mut self, workbooks: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, W)>,
        W: EvaluationWorkbook + 'static,
    {
        let own = &self.books[0].name;
        let mut slots: Vec<BookSlot> = Vec::new();
        for (name, workbook) in workbooks {
            let taken = !own.is_empty() && own.eq_ignore_ascii_case(&name);
            if taken || slots.iter().any(|s| s.name.eq_ignore_ascii_case(&name)) {
                return Err(Error::DuplicateWorkbook(name));
            }
            slots.push(BookSlot {
                name,
                workbook: Box::new(workbook),
            });
        }
        debug!("set up {} referenced workbooks", slots.len());

        self.books.truncate(1);
        self.books.extend(slots);
        self.clear_all_cached_result_values();
        Ok(())
    }

    /// Apply a structural edit to a workbook of a known concrete type
    ///
    /// Row/column shifts and sheet moves change what formulas refer to, so
    /// the whole cache is cleared afterwards.
    pub fn edit_workbook<W, R>(&mut self, book: usize, edit: impl FnOnce(&mut W) -> R) -> Result<R>
    where
        W: EvaluationWorkbook,
    {
        let workbook = self
            .workbook_mut(book)?
            .as_any_mut()
            .downcast_mut::<W>()
            .ok_or_else(|| Error::UnsupportedWorkbook(std::any::type_name::<W>().to_string()))?;
        let result = edit(workbook);

        info!("workbook {} edited, clearing all cached results", book);
        self.clear_all_cached_result_values();
        Ok(result)
    }

    fn workbook_mut(&mut self, book: usize) -> Result<&mut dyn EvaluationWorkbook> {
        match self.books.get_mut(book) {
            Some(slot) => Ok(slot.workbook.as_mut()),
            None => Err(Error::WorkbookNotFound(format!("#{}", book))),
        }
    }

    fn content(&self, key: CellKey) -> Option<&CellContent> {
        self.books
            .get(key.book)?
            .workbook
            .cell(key.sheet, key.row, key.col)
    }

    /// `Sheet1!A1`, or `[Book2.xlsx]Sheet1!A1` for a referenced workbook
    fn describe(&self, key: CellKey) -> String {
        let Some(slot) = self.books.get(key.book) else {
            return key.address().to_a1_string();
        };
        let sheet = slot.workbook.sheet_name(key.sheet).unwrap_or("#REF!");
        let cell = format!("{}!{}", sheet, key.address().to_a1_string());
        if key.book == 0 {
            cell
        } else {
            format!("[{}]{}", slot.name, cell)
        }
    }

    fn evaluate_any(&mut self, key: CellKey) -> FormulaResult<CellValue> {
        let Some(slot) = self.books.get(key.book) else {
            return Ok(CellValue::Error(CellError::Ref));
        };
        if key.sheet >= slot.workbook.sheet_count() {
            return Ok(CellValue::Error(CellError::Ref));
        }

        let formula = match slot.workbook.cell(key.sheet, key.row, key.col).cloned() {
            Some(CellContent::Formula(cell)) => cell,
            Some(CellContent::Value(value)) => return Ok(self.read_plain(key, value)),
            None => return Ok(self.read_plain(key, CellValue::Empty)),
        };

        let entry = self.cache.get_or_create_formula(key);
        self.tracker.accept_dependency(entry);
        if let Some(value) = self.cache.value(entry) {
            let value = value.clone();
            trace!("cache hit {}", self.describe(key));
            self.listener.on_cache_hit(key, &value);
            return Ok(value);
        }

        if self.tracker.is_known_circular(entry) || !self.tracker.start_evaluate(entry) {
            return Ok(CellValue::Error(CellError::CircularRef));
        }
        self.listener.on_start_evaluate(key);
        trace!("evaluating {}", self.describe(key));

        let registry = Arc::clone(&self.registry);
        let result = {
            let mut ctx = EvaluationContext::new(key, &registry, self);
            evaluate(&formula.formula, &mut ctx)
        };

        let value = match result {
            Ok(value) => value,
            Err(FormulaError::WorkbookNotFound(name)) if self.options.ignore_missing_workbooks => {
                warn!(
                    "workbook {} not found, using cached result of {}",
                    name,
                    self.describe(key)
                );
                formula
                    .cached
                    .unwrap_or(CellValue::Error(CellError::Ref))
            }
            Err(err) => {
                self.tracker.end_evaluate(entry);
                return Err(err);
            }
        };

        self.tracker.update_cache_result(&mut self.cache, &value);
        self.tracker.end_evaluate(entry);
        self.listener.on_end_evaluate(key, &value);
        trace!("evaluated {} = {:?}", self.describe(key), value);
        Ok(value)
    }

    fn read_plain(&mut self, key: CellKey, value: CellValue) -> CellValue {
        let (entry, created) = self.cache.get_or_create_plain(key, || value.clone());
        if created {
            self.listener.on_read_plain_value(key, &value);
        }
        self.tracker.accept_dependency(entry);
        self.cache.value(entry).cloned().unwrap_or(value)
    }
}

impl ReferenceResolver for WorkbookEvaluator {
    fn cell_value(&mut self, key: CellKey) -> FormulaResult<CellValue> {
        self.evaluate_any(key)
    }

    fn book_index(&self, name: &str) -> FormulaResult<usize> {
        self.books
            .iter()
            .enumerate()
            .find(|(_, slot)| !slot.name.is_empty() && slot.name.eq_ignore_ascii_case(name))
            .map(|(index, _)| index)
            .ok_or_else(|| FormulaError::WorkbookNotFound(name.to_string()))
    }

    fn sheet_index(&self, book: usize, name: &str) -> Option<usize> {
        self.books.get(book)?.workbook.sheet_index(name)
    }

    fn defined_name(&self, book: usize, sheet: usize, name: &str) -> Option<Arc<Formula>> {
        self.books.get(book)?.workbook.defined_name(sheet, name)
    }
}

impl std::fmt::Debug for WorkbookEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkbookEvaluator")
            .field("books", &self.books.len())
            .field("cached", &self.cache.len())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::Workbook;

    fn evaluator(cells: &[(&str, &str)]) -> WorkbookEvaluator {
        let mut workbook = Workbook::new();
        for (address, content) in cells {
            if content.starts_with('=') {
                workbook.set_cell_formula(0, address, content).unwrap();
            } else {
                let value = content
                    .parse::<f64>()
                    .map(CellValue::Number)
                    .unwrap_or_else(|_| CellValue::string(content));
                workbook.set_cell_value(0, address, value).unwrap();
            }
        }
        WorkbookEvaluator::new(workbook)
    }

    #[test]
    fn test_evaluate_records_entries() {
        let mut ev = evaluator(&[("A1", "2"), ("A2", "=A1*3"), ("A3", "=A2+A1+B9")]);
        let a3 = ev.cell_key("Sheet1", "A3").unwrap();
        assert_eq!(ev.evaluate(a3).unwrap(), CellValue::Number(8.0));

        // A1, A2, A3 and the blank B9
        assert_eq!(ev.cache().len(), 4);
        let b9 = ev.cell_key("Sheet1", "B9").unwrap();
        assert_eq!(ev.cache().cached_value(b9), Some(&CellValue::Empty));
    }

    #[test]
    fn test_plain_and_blank_cells() {
        let mut ev = evaluator(&[("A1", "text")]);
        let a1 = ev.cell_key("Sheet1", "A1").unwrap();
        let z1 = ev.cell_key("Sheet1", "Z1").unwrap();
        assert_eq!(ev.evaluate(a1).unwrap(), CellValue::string("text"));
        assert_eq!(ev.evaluate(z1).unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_blank_cell_update_invalidates() {
        let mut ev = evaluator(&[("A1", "=B1+1")]);
        let a1 = ev.cell_key("Sheet1", "A1").unwrap();
        let b1 = ev.cell_key("Sheet1", "B1").unwrap();
        assert_eq!(ev.evaluate(a1).unwrap(), CellValue::Number(1.0));

        ev.set_cell_value(b1, 4.0).unwrap();
        assert_eq!(ev.cache().cached_value(a1), None);
        assert_eq!(ev.evaluate(a1).unwrap(), CellValue::Number(5.0));
    }

    #[test]
    fn test_formula_edit() {
        let mut ev = evaluator(&[("A1", "3"), ("B1", "=A1")]);
        let a1 = ev.cell_key("Sheet1", "A1").unwrap();
        let b1 = ev.cell_key("Sheet1", "B1").unwrap();
        assert_eq!(ev.evaluate(b1).unwrap(), CellValue::Number(3.0));

        ev.set_cell_formula(a1, "=10/4").unwrap();
        assert_eq!(ev.evaluate(b1).unwrap(), CellValue::Number(2.5));

        ev.clear_cell(a1).unwrap();
        assert_eq!(ev.cache().lookup(a1), None);
        assert_eq!(ev.evaluate(b1).unwrap(), CellValue::Number(0.0));
    }

    #[test]
    fn test_fatal_error_names_cell() {
        let mut workbook = Workbook::new();
        workbook.set_cell_formula(0, "A1", "=NOSUCHFN(1)").unwrap();
        workbook.set_cell_formula(0, "A2", "=A1+1").unwrap();
        let mut ev = WorkbookEvaluator::new(workbook);
        let a2 = ev.cell_key("Sheet1", "A2").unwrap();

        match ev.evaluate(a2) {
            Err(Error::Evaluation { cell, source }) => {
                assert_eq!(cell, "Sheet1!A2");
                assert!(matches!(source, FormulaError::NotImplemented(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
        // The stack was unwound
        let a1 = ev.cell_key("Sheet1", "A1").unwrap();
        assert!(ev.evaluate(a1).is_err());
        ev.set_cell_formula(a1, "=1").unwrap();
        assert_eq!(ev.evaluate(a2).unwrap(), CellValue::Number(2.0));
    }

    #[test]
    fn test_unknown_sheet_key() {
        let ev = evaluator(&[]);
        assert!(matches!(
            ev.cell_key("Nope", "A1"),
            Err(Error::Core(duke_calc_core::Error::SheetNotFound(_)))
        ));
    }
}
