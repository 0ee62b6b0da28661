//! Math and aggregate functions

use super::{collect_numbers, flatten_args, number_arg, FunctionDef, FunctionRegistry};
use crate::error::FormulaResult;
use crate::interpreter::EvaluationContext;
use crate::value::FormulaValue;
use duke_calc_core::CellError;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for def in [
        FunctionDef::new("SUM", 1, None, fn_sum),
        FunctionDef::new("AVERAGE", 1, None, fn_average),
        FunctionDef::new("MIN", 1, None, fn_min),
        FunctionDef::new("MAX", 1, None, fn_max),
        FunctionDef::new("COUNT", 1, None, fn_count),
        FunctionDef::new("COUNTA", 1, None, fn_counta),
        FunctionDef::new("PRODUCT", 1, None, fn_product),
        FunctionDef::new("ABS", 1, Some(1), fn_abs),
        FunctionDef::new("ROUND", 2, Some(2), fn_round),
        FunctionDef::new("INT", 1, Some(1), fn_int),
        FunctionDef::new("MOD", 2, Some(2), fn_mod),
        FunctionDef::new("SQRT", 1, Some(1), fn_sqrt),
        FunctionDef::new("POWER", 2, Some(2), fn_power),
        FunctionDef::new("PI", 0, Some(0), fn_pi),
        FunctionDef::new("SIGN", 1, Some(1), fn_sign),
    ] {
        registry.insert(def);
    }
}

/// SUM function
pub fn fn_sum(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let numbers = try_value!(collect_numbers(args, ctx)?);
    Ok(FormulaValue::Number(numbers.iter().sum()))
}

/// AVERAGE function
pub fn fn_average(
    args: &[FormulaValue],
    ctx: &mut EvaluationContext<'_>,
) -> FormulaResult<FormulaValue> {
    let numbers = try_value!(collect_numbers(args, ctx)?);
    if numbers.is_empty() {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    Ok(FormulaValue::Number(
        numbers.iter().sum::<f64>() / numbers.len() as f64,
    ))
}

/// MIN function (0 when there are no numbers)
pub fn fn_min(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let numbers = try_value!(collect_numbers(args, ctx)?);
    let min = numbers.into_iter().reduce(f64::min);
    Ok(FormulaValue::Number(min.unwrap_or(0.0)))
}

/// MAX function (0 when there are no numbers)
pub fn fn_max(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let numbers = try_value!(collect_numbers(args, ctx)?);
    let max = numbers.into_iter().reduce(f64::max);
    Ok(FormulaValue::Number(max.unwrap_or(0.0)))
}

/// COUNT function - counts numbers, never propagates errors
pub fn fn_count(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let count = flatten_args(args, ctx)?
        .into_iter()
        .filter(|(value, direct)| match value {
            FormulaValue::Number(_) => true,
            FormulaValue::Boolean(_) => *direct,
            FormulaValue::String(s) => *direct && crate::value::parse_number(s).is_some(),
            _ => false,
        })
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// COUNTA function - counts non-blank values
pub fn fn_counta(
    args: &[FormulaValue],
    ctx: &mut EvaluationContext<'_>,
) -> FormulaResult<FormulaValue> {
    let count = flatten_args(args, ctx)?
        .into_iter()
        .filter(|(value, _)| !matches!(value, FormulaValue::Empty | FormulaValue::Missing))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// PRODUCT function
pub fn fn_product(
    args: &[FormulaValue],
    ctx: &mut EvaluationContext<'_>,
) -> FormulaResult<FormulaValue> {
    let numbers = try_value!(collect_numbers(args, ctx)?);
    if numbers.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    Ok(FormulaValue::Number(numbers.iter().product()))
}

pub fn fn_abs(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let n = try_value!(number_arg(args, 0, 0.0, ctx)?);
    Ok(FormulaValue::Number(n.abs()))
}

/// ROUND(number, num_digits), half away from zero
pub fn fn_round(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let number = try_value!(number_arg(args, 0, 0.0, ctx)?);
    let num_digits = try_value!(number_arg(args, 1, 0.0, ctx)?).trunc() as i32;

    let multiplier = 10_f64.powi(num_digits);
    let result = if number >= 0.0 {
        (number * multiplier + 0.5).floor() / multiplier
    } else {
        (number * multiplier - 0.5).ceil() / multiplier
    };

    Ok(FormulaValue::Number(result))
}

/// INT(number) - rounds down to the nearest integer
pub fn fn_int(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let n = try_value!(number_arg(args, 0, 0.0, ctx)?);
    Ok(FormulaValue::Number(n.floor()))
}

/// MOD(number, divisor) - the result has the sign of the divisor
pub fn fn_mod(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let number = try_value!(number_arg(args, 0, 0.0, ctx)?);
    let divisor = try_value!(number_arg(args, 1, 0.0, ctx)?);
    if divisor == 0.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    Ok(FormulaValue::Number(number - divisor * (number / divisor).floor()))
}

pub fn fn_sqrt(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let n = try_value!(number_arg(args, 0, 0.0, ctx)?);
    if n < 0.0 {
        return Ok(FormulaValue::Error(CellError::Num));
    }
    Ok(FormulaValue::Number(n.sqrt()))
}

pub fn fn_power(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let base = try_value!(number_arg(args, 0, 0.0, ctx)?);
    let exponent = try_value!(number_arg(args, 1, 0.0, ctx)?);
    Ok(crate::operators::binary(
        crate::ast::BinaryOperator::Power,
        &FormulaValue::Number(base),
        &FormulaValue::Number(exponent),
    ))
}

pub fn fn_pi(_args: &[FormulaValue], _ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(std::f64::consts::PI))
}

pub fn fn_sign(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let n = try_value!(number_arg(args, 0, 0.0, ctx)?);
    let sign = if n > 0.0 {
        1.0
    } else if n < 0.0 {
        -1.0
    } else {
        0.0
    };
    Ok(FormulaValue::Number(sign))
}
