//! Lookup and reference functions

use super::{number_arg, FunctionDef, FunctionRegistry};
use crate::error::FormulaResult;
use crate::interpreter::EvaluationContext;
use crate::value::{AreaValue, FormulaValue, RefValue};
use duke_calc_core::{CellAddress, CellError, CellKey, CellRange};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for def in [
        FunctionDef::new("INDEX", 2, Some(3), fn_index),
        FunctionDef::new("ROWS", 1, Some(1), fn_rows),
        FunctionDef::new("COLUMNS", 1, Some(1), fn_columns),
    ] {
        registry.insert(def);
    }
}

fn as_area(value: &FormulaValue) -> Option<AreaValue> {
    match value {
        FormulaValue::Area(area) => Some(*area),
        FormulaValue::Ref(r) => Some(AreaValue {
            book: r.key.book,
            first_sheet: r.key.sheet,
            last_sheet: r.key.sheet,
            range: CellRange::single(r.key.address()),
        }),
        _ => None,
    }
}

/// A 1-based index argument; negative is `#VALUE!`
fn index_arg(
    args: &[FormulaValue],
    index: usize,
    ctx: &mut EvaluationContext<'_>,
) -> FormulaResult<Result<u32, CellError>> {
    Ok(match number_arg(args, index, 0.0, ctx)? {
        Ok(n) if n < 0.0 => Err(CellError::Value),
        Ok(n) => Ok(n.trunc() as u32),
        Err(e) => Err(e),
    })
}

/// INDEX(reference, row_num, [column_num])
///
/// Returns a reference, so `INDEX(...)` can feed functions like `ROW`. A zero
/// row (column) selects the whole column (row) of the area.
pub fn fn_index(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let mut row = try_value!(index_arg(args, 1, ctx)?);
    let mut col = try_value!(index_arg(args, 2, ctx)?);

    if let FormulaValue::Array(rows) = &args[0] {
        let width = rows.first().map_or(0, Vec::len) as u32;
        if args.len() == 2 && rows.len() == 1 {
            (row, col) = (1, row);
        } else if args.len() == 2 && width == 1 {
            col = 1;
        }
        return Ok(rows
            .get(row.wrapping_sub(1) as usize)
            .and_then(|r| r.get(col.wrapping_sub(1) as usize))
            .cloned()
            .unwrap_or(FormulaValue::Error(CellError::Ref)));
    }

    if let Some(e) = args[0].error() {
        return Ok(FormulaValue::Error(e));
    }
    let Some(area) = as_area(&args[0]) else {
        return Ok(FormulaValue::Error(CellError::Value));
    };
    if area.first_sheet != area.last_sheet {
        return Ok(FormulaValue::Error(CellError::Value));
    }

    let range = area.range;
    // A one-row area is indexed by column when only one index is given
    if args.len() == 2 && range.row_count() == 1 {
        (row, col) = (1, row);
    } else if args.len() == 2 && range.col_count() == 1 {
        col = 1;
    }
    if row > range.row_count() || col > range.col_count() as u32 {
        return Ok(FormulaValue::Error(CellError::Ref));
    }

    let (first_row, last_row) = match row {
        0 => (range.start.row, range.end.row),
        r => (range.start.row + r - 1, range.start.row + r - 1),
    };
    let (first_col, last_col) = match col {
        0 => (range.start.col, range.end.col),
        c => (range.start.col + c as u16 - 1, range.start.col + c as u16 - 1),
    };

    if first_row == last_row && first_col == last_col {
        let key = CellKey::new(area.book, area.first_sheet, first_row, first_col);
        let value = ctx.cell_value(key)?;
        return Ok(FormulaValue::Ref(RefValue { key, value }));
    }
    Ok(FormulaValue::Area(AreaValue {
        range: CellRange::new(
            CellAddress::new(first_row, first_col),
            CellAddress::new(last_row, last_col),
        ),
        ..area
    }))
}

fn dimensions(value: &FormulaValue) -> Result<(usize, usize), CellError> {
    match value {
        FormulaValue::Error(e) => Err(*e),
        FormulaValue::Array(rows) => Ok((rows.len(), rows.first().map_or(0, Vec::len))),
        other => match as_area(other) {
            Some(area) => Ok((
                area.range.row_count() as usize,
                area.range.col_count() as usize,
            )),
            None => Ok((1, 1)),
        },
    }
}

pub fn fn_rows(args: &[FormulaValue], _ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let (rows, _) = try_value!(dimensions(&args[0]));
    Ok(FormulaValue::Number(rows as f64))
}

pub fn fn_columns(args: &[FormulaValue], _ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let (_, cols) = try_value!(dimensions(&args[0]));
    Ok(FormulaValue::Number(cols as f64))
}
