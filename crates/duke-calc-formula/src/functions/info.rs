//! Information functions

use super::{scalar_arg, FunctionDef, FunctionRegistry};
use crate::error::FormulaResult;
use crate::interpreter::EvaluationContext;
use crate::value::FormulaValue;
use duke_calc_core::CellError;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for def in [
        FunctionDef::new("ISBLANK", 1, Some(1), fn_isblank),
        FunctionDef::new("ISNUMBER", 1, Some(1), fn_isnumber),
        FunctionDef::new("ISTEXT", 1, Some(1), fn_istext),
        FunctionDef::new("ISERROR", 1, Some(1), fn_iserror),
        FunctionDef::new("ISNA", 1, Some(1), fn_isna),
        FunctionDef::new("ISLOGICAL", 1, Some(1), fn_islogical),
        FunctionDef::new("NA", 0, Some(0), fn_na),
        FunctionDef::new("ROW", 0, Some(1), fn_row),
        FunctionDef::new("COLUMN", 0, Some(1), fn_column),
    ] {
        registry.insert(def);
    }
}

fn test_value(
    args: &[FormulaValue],
    ctx: &mut EvaluationContext<'_>,
    predicate: fn(&FormulaValue) -> bool,
) -> FormulaResult<FormulaValue> {
    let value = scalar_arg(args, 0, ctx)?;
    Ok(FormulaValue::Boolean(predicate(&value)))
}

pub fn fn_isblank(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    test_value(args, ctx, |v| matches!(v, FormulaValue::Empty))
}

pub fn fn_isnumber(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    test_value(args, ctx, |v| matches!(v, FormulaValue::Number(_)))
}

pub fn fn_istext(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    test_value(args, ctx, |v| matches!(v, FormulaValue::String(_)))
}

pub fn fn_iserror(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    test_value(args, ctx, FormulaValue::is_error)
}

pub fn fn_isna(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    test_value(args, ctx, |v| v.error() == Some(CellError::Na))
}

pub fn fn_islogical(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    test_value(args, ctx, |v| matches!(v, FormulaValue::Boolean(_)))
}

pub fn fn_na(_args: &[FormulaValue], _ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Error(CellError::Na))
}

/// ROW([reference]) - 1-based row of the reference, or of the formula's cell
pub fn fn_row(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let row = match args.first() {
        None => ctx.row,
        Some(FormulaValue::Ref(r)) => r.key.row,
        Some(FormulaValue::Area(area)) => area.range.start.row,
        Some(FormulaValue::Error(e)) => return Ok(FormulaValue::Error(*e)),
        Some(_) => return Ok(FormulaValue::Error(CellError::Value)),
    };
    Ok(FormulaValue::Number(row as f64 + 1.0))
}

/// COLUMN([reference]) - 1-based column of the reference, or of the formula's cell
pub fn fn_column(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let col = match args.first() {
        None => ctx.col,
        Some(FormulaValue::Ref(r)) => r.key.col,
        Some(FormulaValue::Area(area)) => area.range.start.col,
        Some(FormulaValue::Error(e)) => return Ok(FormulaValue::Error(*e)),
        Some(_) => return Ok(FormulaValue::Error(CellError::Value)),
    };
    Ok(FormulaValue::Number(col as f64 + 1.0))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::testing::{eval, TestSheet};
    use crate::value::FormulaValue;
    use duke_calc_core::CellError;

    #[test]
    fn test_is_functions() {
        let sheet = TestSheet::new()
            .with("A1", 1.0)
            .with("A2", "t")
            .with("A3", CellError::Na)
            .with("A4", false);

        assert_eq!(sheet.eval("=ISBLANK(B1)"), FormulaValue::Boolean(true));
        assert_eq!(sheet.eval("=ISBLANK(A1)"), FormulaValue::Boolean(false));
        assert_eq!(sheet.eval("=ISNUMBER(A1)"), FormulaValue::Boolean(true));
        assert_eq!(sheet.eval("=ISTEXT(A2)"), FormulaValue::Boolean(true));
        assert_eq!(sheet.eval("=ISNA(A3)"), FormulaValue::Boolean(true));
        assert_eq!(sheet.eval("=ISERROR(A3)"), FormulaValue::Boolean(true));
        assert_eq!(sheet.eval("=ISERROR(A2)"), FormulaValue::Boolean(false));
        assert_eq!(sheet.eval("=ISLOGICAL(A4)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=ISERROR(1/0)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=NA()"), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_row_and_column() {
        let sheet = TestSheet::new();
        assert_eq!(sheet.eval("=ROW(C5)"), FormulaValue::Number(5.0));
        assert_eq!(sheet.eval("=COLUMN(C5:E9)"), FormulaValue::Number(3.0));
        // The formula's own cell is A1
        assert_eq!(sheet.eval("=ROW()"), FormulaValue::Number(1.0));
        assert_eq!(sheet.eval("=COLUMN()"), FormulaValue::Number(1.0));
        assert_eq!(eval("=ROW(1)"), FormulaValue::Error(CellError::Value));
    }
}
