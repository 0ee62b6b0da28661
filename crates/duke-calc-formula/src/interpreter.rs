//! Formula interpreter
//!
//! Walks a compiled [`Formula`] left to right with an operand stack. Cell
//! reads go through a [`ReferenceResolver`], which is where a host evaluates
//! referenced formulas, records dependencies and detects cycles.

use crate::ast::BinaryOperator;
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionRegistry;
use crate::operators;
use crate::token::{Formula, SheetRef, Token};
use crate::value::{AreaValue, FormulaValue, RefValue};
use duke_calc_core::{CellError, CellKey, CellRange, CellValue};
use std::sync::Arc;

/// Access to cells and names from inside a formula
pub trait ReferenceResolver {
    /// Value of a cell, evaluating it first if it holds a formula
    ///
    /// Cells on sheets that do not exist read as `#REF!`.
    fn cell_value(&mut self, key: CellKey) -> FormulaResult<CellValue>;

    /// Index of a loaded workbook, [`FormulaError::WorkbookNotFound`] otherwise
    fn book_index(&self, name: &str) -> FormulaResult<usize>;

    /// Index of a sheet within a loaded workbook
    fn sheet_index(&self, book: usize, name: &str) -> Option<usize>;

    /// Formula of a defined name visible from the given sheet
    fn defined_name(&self, book: usize, sheet: usize, name: &str) -> Option<Arc<Formula>>;
}

/// Context for formula evaluation
pub struct EvaluationContext<'a> {
    /// Workbook of the cell being evaluated
    pub book: usize,
    /// Current worksheet index
    pub sheet: usize,
    /// Current cell row (for implicit intersection and `ROW()`)
    pub row: u32,
    /// Current cell column
    pub col: u16,
    registry: &'a FunctionRegistry,
    resolver: &'a mut dyn ReferenceResolver,
    active_names: Vec<String>,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context evaluating the cell at `key`
    pub fn new(
        key: CellKey,
        registry: &'a FunctionRegistry,
        resolver: &'a mut dyn ReferenceResolver,
    ) -> Self {
        Self {
            book: key.book,
            sheet: key.sheet,
            row: key.row,
            col: key.col,
            registry,
            resolver,
            active_names: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'a FunctionRegistry {
        self.registry
    }

    /// Read a cell (recording it as a dependency of the current formula)
    pub fn cell_value(&mut self, key: CellKey) -> FormulaResult<CellValue> {
        self.resolver.cell_value(key)
    }

    /// Every value of an area, sheet by sheet, row-major
    pub fn area_values(&mut self, area: &AreaValue) -> FormulaResult<Vec<CellValue>> {
        area.keys().map(|key| self.resolver.cell_value(key)).collect()
    }

    /// Dereference an operand to a single value
    ///
    /// Areas use implicit intersection with the current cell's row or column;
    /// arrays yield their top-left element.
    pub fn scalar(&mut self, value: FormulaValue) -> FormulaResult<FormulaValue> {
        Ok(match value {
            FormulaValue::Ref(r) => FormulaValue::from(r.value),
            FormulaValue::Area(area) => match self.intersect(&area) {
                Some(key) => FormulaValue::from(self.cell_value(key)?),
                None => FormulaValue::Error(CellError::Value),
            },
            FormulaValue::Array(rows) => rows
                .into_iter()
                .next()
                .and_then(|row| row.into_iter().next())
                .unwrap_or(FormulaValue::Error(CellError::Value)),
            other => other,
        })
    }

    fn intersect(&self, area: &AreaValue) -> Option<CellKey> {
        if area.first_sheet != area.last_sheet {
            return None;
        }
        let range = area.range;
        let (row, col) = if range.is_single_cell() {
            (range.start.row, range.start.col)
        } else if range.col_count() == 1 && (range.start.row..=range.end.row).contains(&self.row) {
            (self.row, range.start.col)
        } else if range.row_count() == 1 && (range.start.col..=range.end.col).contains(&self.col) {
            (range.start.row, self.col)
        } else {
            return None;
        };
        Some(CellKey::new(area.book, area.first_sheet, row, col))
    }

    /// The value a formula cell stores for its final operand
    pub fn to_cell_value(&mut self, value: FormulaValue) -> FormulaResult<CellValue> {
        Ok(match self.scalar(value)? {
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::String(s) => CellValue::string(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            // A formula never evaluates to blank
            FormulaValue::Empty | FormulaValue::Missing => CellValue::Number(0.0),
            _ => CellValue::Error(CellError::Value),
        })
    }

    /// Book and sheet span a reference token points into, `None` for a missing sheet
    fn resolve_sheets(&self, sheet: &SheetRef) -> FormulaResult<Option<(usize, usize, usize)>> {
        Ok(match sheet {
            SheetRef::Local => Some((self.book, self.sheet, self.sheet)),
            SheetRef::Sheet(i) => Some((self.book, *i, *i)),
            SheetRef::SheetRange(first, last) => Some((self.book, *first, *last)),
            SheetRef::External { book, sheet } => {
                let book = self.resolver.book_index(book)?;
                self.resolver
                    .sheet_index(book, sheet)
                    .map(|sheet| (book, sheet, sheet))
            }
        })
    }

    fn evaluate_name(&mut self, name: &str) -> FormulaResult<FormulaValue> {
        let upper = name.to_uppercase();
        if self.active_names.contains(&upper) {
            return Ok(FormulaValue::Error(CellError::CircularRef));
        }
        let Some(formula) = self.resolver.defined_name(self.book, self.sheet, name) else {
            return Ok(FormulaValue::Error(CellError::Name));
        };
        self.active_names.push(upper);
        let result = run(&formula, self);
        self.active_names.pop();
        result
    }
}

/// Evaluate a formula to the value its cell stores
pub fn evaluate(formula: &Formula, ctx: &mut EvaluationContext<'_>) -> FormulaResult<CellValue> {
    let value = run(formula, ctx)?;
    ctx.to_cell_value(value)
}

fn pop(stack: &mut Vec<FormulaValue>) -> FormulaResult<FormulaValue> {
    stack
        .pop()
        .ok_or_else(|| FormulaError::CorruptFormula("operand stack underflow".into()))
}

/// Bounding area of two references on the same sheet(s)
fn range_of(left: &FormulaValue, right: &FormulaValue) -> FormulaValue {
    fn area(value: &FormulaValue) -> Option<AreaValue> {
        match value {
            FormulaValue::Area(a) => Some(*a),
            FormulaValue::Ref(RefValue { key, .. }) => Some(AreaValue {
                book: key.book,
                first_sheet: key.sheet,
                last_sheet: key.sheet,
                range: CellRange::single(key.address()),
            }),
            _ => None,
        }
    }

    if let Some(e) = left.error().or(right.error()) {
        return FormulaValue::Error(e);
    }
    match (area(left), area(right)) {
        (Some(a), Some(b))
            if a.book == b.book && a.first_sheet == b.first_sheet && a.last_sheet == b.last_sheet =>
        {
            FormulaValue::Area(AreaValue {
                range: CellRange::from_indices(
                    a.range.start.row.min(b.range.start.row),
                    a.range.start.col.min(b.range.start.col),
                    a.range.end.row.max(b.range.end.row),
                    a.range.end.col.max(b.range.end.col),
                ),
                ..a
            })
        }
        _ => FormulaValue::Error(CellError::Value),
    }
}

/// Run a formula, returning its final operand undereferenced
pub fn run(formula: &Formula, ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let tokens = formula.tokens();
    let mut stack: Vec<FormulaValue> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Number(n) => stack.push(FormulaValue::Number(*n)),
            Token::String(s) => stack.push(FormulaValue::String(s.clone())),
            Token::Boolean(b) => stack.push(FormulaValue::Boolean(*b)),
            Token::Error(e) => stack.push(FormulaValue::Error(*e)),
            Token::Missing => stack.push(FormulaValue::Missing),

            Token::Ref { sheet, address } => {
                let value = match ctx.resolve_sheets(sheet)? {
                    None => FormulaValue::Error(CellError::Ref),
                    Some((book, first, last)) if first != last => FormulaValue::Area(AreaValue {
                        book,
                        first_sheet: first,
                        last_sheet: last,
                        range: CellRange::single(*address),
                    }),
                    Some((book, sheet, _)) => {
                        let key = CellKey::from_address(book, sheet, address);
                        let value = ctx.cell_value(key)?;
                        FormulaValue::Ref(RefValue { key, value })
                    }
                };
                stack.push(value);
            }

            Token::Area { sheet, range } => {
                let value = match ctx.resolve_sheets(sheet)? {
                    None => FormulaValue::Error(CellError::Ref),
                    Some((book, first_sheet, last_sheet)) => FormulaValue::Area(AreaValue {
                        book,
                        first_sheet,
                        last_sheet,
                        range: *range,
                    }),
                };
                stack.push(value);
            }

            Token::RefError { .. } | Token::AreaError { .. } => {
                stack.push(FormulaValue::Error(CellError::Ref))
            }

            Token::Name(name) => {
                let value = ctx.evaluate_name(name)?;
                stack.push(value);
            }

            Token::Unary(op) => {
                let operand = pop(&mut stack)?;
                let operand = ctx.scalar(operand)?;
                stack.push(operators::unary(*op, &operand));
            }

            Token::Binary(BinaryOperator::Range) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                stack.push(range_of(&left, &right));
            }

            Token::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                let left = ctx.scalar(left)?;
                let right = ctx.scalar(right)?;
                stack.push(operators::binary(*op, &left, &right));
            }

            Token::Function { name, argc } => {
                let def = ctx.registry().get(name)?;
                def.check_arg_count(*argc)?;
                if stack.len() < *argc {
                    return Err(FormulaError::CorruptFormula(format!(
                        "{} expects {} operands, stack holds {}",
                        name,
                        argc,
                        stack.len()
                    )));
                }
                let args = stack.split_off(stack.len() - argc);
                let result = (def.implementation)(&args, ctx)?;
                stack.push(result);
            }

            Token::AttrIf { skip } => {
                let condition = pop(&mut stack)?;
                let condition = ctx.scalar(condition)?;
                let false_branch = i + skip + 1;
                match condition.to_bool() {
                    Ok(Some(true)) => {}
                    Err(e) => {
                        // Skip both branches and the IF itself
                        let Some(Token::AttrSkip { skip }) = tokens.get(false_branch - 1) else {
                            return Err(FormulaError::CorruptFormula(
                                "IF condition jump does not land after a skip".into(),
                            ));
                        };
                        stack.push(FormulaValue::Error(e));
                        i = false_branch + skip;
                        continue;
                    }
                    Ok(_) => {
                        if let Some(Token::Function { name, .. }) = tokens.get(false_branch) {
                            if name == "IF" {
                                // IF(c, t) without a false branch
                                stack.push(FormulaValue::Boolean(false));
                                i = false_branch + 1;
                                continue;
                            }
                        }
                        i = false_branch;
                        continue;
                    }
                }
            }

            Token::AttrSkip { skip } => {
                i += skip + 1;
                continue;
            }

            Token::Array(rows) => stack.push(FormulaValue::Array(
                rows.iter()
                    .map(|row| row.iter().cloned().map(FormulaValue::from).collect())
                    .collect(),
            )),
        }
        i += 1;
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(value), true) => Ok(value),
        _ => Err(FormulaError::CorruptFormula(
            "formula does not reduce to a single value".into(),
        )),
    }
}
