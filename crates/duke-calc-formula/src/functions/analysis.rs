//! Analysis ToolPak functions

use super::{number_arg, scalar_arg, FunctionDef, FunctionRegistry};
use crate::error::FormulaResult;
use crate::interpreter::EvaluationContext;
use crate::value::FormulaValue;
use duke_calc_core::CellError;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for def in [
        FunctionDef::new("ISEVEN", 1, Some(1), fn_iseven),
        FunctionDef::new("ISODD", 1, Some(1), fn_isodd),
        FunctionDef::new("MROUND", 2, Some(2), fn_mround),
        FunctionDef::new("QUOTIENT", 2, Some(2), fn_quotient),
        FunctionDef::new("IFERROR", 2, Some(2), fn_iferror),
    ] {
        registry.insert(def);
    }
}

fn is_even(n: f64) -> bool {
    n.trunc() % 2.0 == 0.0
}

pub fn fn_iseven(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let n = try_value!(number_arg(args, 0, 0.0, ctx)?);
    Ok(FormulaValue::Boolean(is_even(n)))
}

pub fn fn_isodd(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let n = try_value!(number_arg(args, 0, 0.0, ctx)?);
    Ok(FormulaValue::Boolean(!is_even(n)))
}

/// MROUND(number, multiple) - nearest multiple, halves away from zero
pub fn fn_mround(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let number = try_value!(number_arg(args, 0, 0.0, ctx)?);
    let multiple = try_value!(number_arg(args, 1, 0.0, ctx)?);
    if multiple == 0.0 {
        return Ok(FormulaValue::Number(0.0));
    }
    if number * multiple < 0.0 {
        return Ok(FormulaValue::Error(CellError::Num));
    }
    Ok(FormulaValue::Number((number / multiple).round() * multiple))
}

/// QUOTIENT(numerator, denominator) - integer part of the division
pub fn fn_quotient(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let numerator = try_value!(number_arg(args, 0, 0.0, ctx)?);
    let denominator = try_value!(number_arg(args, 1, 0.0, ctx)?);
    if denominator == 0.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    Ok(FormulaValue::Number((numerator / denominator).trunc()))
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let value = scalar_arg(args, 0, ctx)?;
    if value.is_error() {
        return Ok(args[1].clone());
    }
    Ok(value)
}
