//! Text functions

use super::{number_arg, scalar_arg, FunctionDef, FunctionRegistry};
use crate::error::FormulaResult;
use crate::interpreter::EvaluationContext;
use crate::value::FormulaValue;
use duke_calc_core::CellError;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for def in [
        FunctionDef::new("CONCATENATE", 1, None, fn_concatenate),
        FunctionDef::new("LEN", 1, Some(1), fn_len),
        FunctionDef::new("LEFT", 1, Some(2), fn_left),
        FunctionDef::new("RIGHT", 1, Some(2), fn_right),
        FunctionDef::new("MID", 3, Some(3), fn_mid),
        FunctionDef::new("UPPER", 1, Some(1), fn_upper),
        FunctionDef::new("LOWER", 1, Some(1), fn_lower),
        FunctionDef::new("TRIM", 1, Some(1), fn_trim),
    ] {
        registry.insert(def);
    }
}

fn text_arg(
    args: &[FormulaValue],
    index: usize,
    ctx: &mut EvaluationContext<'_>,
) -> FormulaResult<Result<String, CellError>> {
    Ok(scalar_arg(args, index, ctx)?.to_text())
}

/// Character count argument: omitted means 1, negative is `#VALUE!`
fn count_arg(
    args: &[FormulaValue],
    index: usize,
    ctx: &mut EvaluationContext<'_>,
) -> FormulaResult<Result<usize, CellError>> {
    Ok(match number_arg(args, index, 1.0, ctx)? {
        Ok(n) if n < 0.0 => Err(CellError::Value),
        Ok(n) => Ok(n.trunc() as usize),
        Err(e) => Err(e),
    })
}

/// CONCATENATE function
pub fn fn_concatenate(
    args: &[FormulaValue],
    ctx: &mut EvaluationContext<'_>,
) -> FormulaResult<FormulaValue> {
    let mut result = String::new();
    for index in 0..args.len() {
        result.push_str(&try_value!(text_arg(args, index, ctx)?));
    }
    Ok(FormulaValue::String(result))
}

/// LEN function - length in characters
pub fn fn_len(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let text = try_value!(text_arg(args, 0, ctx)?);
    Ok(FormulaValue::Number(text.chars().count() as f64))
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let text = try_value!(text_arg(args, 0, ctx)?);
    let count = try_value!(count_arg(args, 1, ctx)?);
    Ok(FormulaValue::String(text.chars().take(count).collect()))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let text = try_value!(text_arg(args, 0, ctx)?);
    let count = try_value!(count_arg(args, 1, ctx)?);
    let len = text.chars().count();
    Ok(FormulaValue::String(
        text.chars().skip(len.saturating_sub(count)).collect(),
    ))
}

/// MID(text, start_num, num_chars) - `start_num` is 1-based
pub fn fn_mid(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let text = try_value!(text_arg(args, 0, ctx)?);
    let start = try_value!(number_arg(args, 1, 1.0, ctx)?);
    let count = try_value!(number_arg(args, 2, 0.0, ctx)?);
    if start < 1.0 || count < 0.0 {
        return Ok(FormulaValue::Error(CellError::Value));
    }
    Ok(FormulaValue::String(
        text.chars()
            .skip(start.trunc() as usize - 1)
            .take(count.trunc() as usize)
            .collect(),
    ))
}

pub fn fn_upper(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let text = try_value!(text_arg(args, 0, ctx)?);
    Ok(FormulaValue::String(text.to_uppercase()))
}

pub fn fn_lower(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let text = try_value!(text_arg(args, 0, ctx)?);
    Ok(FormulaValue::String(text.to_lowercase()))
}

/// TRIM function - strips leading/trailing spaces and collapses inner runs
pub fn fn_trim(args: &[FormulaValue], ctx: &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let text = try_value!(text_arg(args, 0, ctx)?);
    let trimmed: Vec<&str> = text.split(' ').filter(|s| !s.is_empty()).collect();
    Ok(FormulaValue::String(trimmed.join(" ")))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::testing::{eval, TestSheet};
    use crate::value::FormulaValue;
    use duke_calc_core::CellError;

    fn s(text: &str) -> FormulaValue {
        FormulaValue::from(text)
    }

    #[test]
    fn test_concatenate_and_len() {
        assert_eq!(eval("=CONCATENATE(\"a\",1,TRUE)"), s("a1TRUE"));
        assert_eq!(eval("=LEN(\"héllo\")"), FormulaValue::Number(5.0));
        assert_eq!(eval("=LEN(12.5)"), FormulaValue::Number(4.0));

        let sheet = TestSheet::new().with("A1", "x");
        assert_eq!(sheet.eval("=CONCATENATE(A1,B1,\"!\")"), s("x!"));
        assert_eq!(
            eval("=CONCATENATE(\"a\",#REF!)"),
            FormulaValue::Error(CellError::Ref)
        );
    }

    #[test]
    fn test_substrings() {
        assert_eq!(eval("=LEFT(\"Hello\",2)"), s("He"));
        assert_eq!(eval("=LEFT(\"Hello\")"), s("H"));
        assert_eq!(eval("=RIGHT(\"Hello\",3)"), s("llo"));
        assert_eq!(eval("=RIGHT(\"Hi\",10)"), s("Hi"));
        assert_eq!(eval("=MID(\"Hello\",2,3)"), s("ell"));
        assert_eq!(eval("=MID(\"Hello\",9,3)"), s(""));
        assert_eq!(eval("=MID(\"Hello\",0,3)"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=LEFT(\"Hello\",-1)"), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(eval("=UPPER(\"abc\")"), s("ABC"));
        assert_eq!(eval("=LOWER(\"ABC\")"), s("abc"));
        assert_eq!(eval("=TRIM(\"  a   b  \")"), s("a b"));
    }
}
