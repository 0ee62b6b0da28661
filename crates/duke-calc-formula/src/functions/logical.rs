//! Logical functions

use super::{flatten_args, scalar_arg, FunctionDef, FunctionRegistry};
use crate::error::FormulaResult;
use crate::interpreter::EvaluationContext;
use crate::value::FormulaValue;
use duke_calc_core::CellError;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for def in [
        FunctionDef::new("IF", 2, Some(3), fn_if),
        FunctionDef::new("AND", 1, None, fn_and),
        FunctionDef::new("OR", 1, None, fn_or),
        FunctionDef::new("NOT", 1, Some(1), fn_not),
        FunctionDef::new("TRUE", 0, Some(0), fn_true),
        FunctionDef::new("FALSE", 0, Some(0), fn_false),
    ] {
        registry.insert(def);
    }
}

/// IF(condition, value_if_true, [value_if_false])
///
/// Compiled formulas evaluate `IF` lazily through jump tokens; this is the
/// eager form used when the arguments are already on the stack.
pub fn fn_if(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let condition = try_value!(scalar_arg(args, 0, ctx)?.to_bool()).unwrap_or(false);
    if condition {
        return Ok(args[1].clone());
    }
    match args.get(2) {
        Some(value) => Ok(value.clone()),
        None => Ok(FormulaValue::Boolean(false)),
    }
}

/// Truth values of a logical argument list (text through references is skipped)
fn logical_values(
    args: &[FormulaValue],
    ctx: &mut EvaluationContext<'_>,
) -> FormulaResult<Result<Vec<bool>, CellError>> {
    let mut values = Vec::new();
    for (value, direct) in flatten_args(args, ctx)? {
        match value {
            FormulaValue::Boolean(b) => values.push(b),
            FormulaValue::Number(n) => values.push(n != 0.0),
            FormulaValue::Error(e) => return Ok(Err(e)),
            FormulaValue::String(_) if direct => match value.to_bool() {
                Ok(b) => values.extend(b),
                Err(e) => return Ok(Err(e)),
            },
            _ => {}
        }
    }
    Ok(Ok(values))
}

/// AND function
pub fn fn_and(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let values = try_value!(logical_values(args, ctx)?);
    if values.is_empty() {
        return Ok(FormulaValue::Error(CellError::Value));
    }
    Ok(FormulaValue::Boolean(values.iter().all(|&b| b)))
}

/// OR function
pub fn fn_or(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let values = try_value!(logical_values(args, ctx)?);
    if values.is_empty() {
        return Ok(FormulaValue::Error(CellError::Value));
    }
    Ok(FormulaValue::Boolean(values.iter().any(|&b| b)))
}

/// NOT function
pub fn fn_not(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let value = try_value!(scalar_arg(args, 0, ctx)?.to_bool()).unwrap_or(false);
    Ok(FormulaValue::Boolean(!value))
}

pub fn fn_true(_args: &[FormulaValue], _ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(true))
}

pub fn fn_false(_args: &[FormulaValue], _ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(false))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::testing::{eval, TestSheet};
    use crate::value::FormulaValue;
    use duke_calc_core::CellError;

    #[test]
    fn test_if() {
        assert_eq!(eval("=IF(TRUE,1,2)"), FormulaValue::Number(1.0));
        assert_eq!(eval("=IF(0,1,2)"), FormulaValue::Number(2.0));
        assert_eq!(eval("=IF(FALSE,1)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=IF(\"true\",\"y\",\"n\")"), FormulaValue::from("y"));
        assert_eq!(eval("=IF(\"maybe\",1,2)"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=IF(#N/A,1,2)"), FormulaValue::Error(CellError::Na));
        // Blank chosen branch is zero
        assert_eq!(eval("=IF(TRUE,)"), FormulaValue::Number(0.0));
        assert_eq!(eval("=IF(1>0,IF(2>3,\"a\",\"b\"),\"c\")"), FormulaValue::from("b"));
    }

    #[test]
    fn test_and_or_not() {
        assert_eq!(eval("=AND(TRUE,1)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=AND(TRUE,0)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=OR(FALSE,0)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=OR(FALSE,\"TRUE\")"), FormulaValue::Boolean(true));
        assert_eq!(eval("=OR(\"x\")"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=NOT(0)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=TRUE()"), FormulaValue::Boolean(true));
        assert_eq!(eval("=FALSE()"), FormulaValue::Boolean(false));

        let sheet = TestSheet::new().with("A1", "text").with("A2", true);
        assert_eq!(sheet.eval("=AND(A1:A3)"), FormulaValue::Boolean(true));
        assert_eq!(sheet.eval("=OR(A1)"), FormulaValue::Error(CellError::Value));
    }
}
