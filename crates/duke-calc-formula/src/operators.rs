//! Scalar operator semantics
//!
//! Operands reaching these functions are already dereferenced scalars. Errors
//! are values: the left operand's error wins, then the right one's.

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::value::FormulaValue;
use duke_calc_core::CellError;
use std::cmp::Ordering;

fn number_result(n: f64) -> FormulaValue {
    if n.is_finite() {
        FormulaValue::Number(n)
    } else {
        FormulaValue::Error(CellError::Num)
    }
}

fn arithmetic(op: BinaryOperator, l: f64, r: f64) -> FormulaValue {
    match op {
        BinaryOperator::Add => number_result(l + r),
        BinaryOperator::Subtract => number_result(l - r),
        BinaryOperator::Multiply => number_result(l * r),
        BinaryOperator::Divide if r == 0.0 => FormulaValue::Error(CellError::Div0),
        BinaryOperator::Divide => number_result(l / r),
        BinaryOperator::Power if l == 0.0 && r == 0.0 => FormulaValue::Error(CellError::Num),
        BinaryOperator::Power => number_result(l.powf(r)),
        _ => FormulaValue::Error(CellError::Value),
    }
}

/// Apply a binary operator (other than the range operator) to two scalars
pub fn binary(op: BinaryOperator, left: &FormulaValue, right: &FormulaValue) -> FormulaValue {
    match op {
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Power => {
            let l = match left.to_number() {
                Ok(n) => n,
                Err(e) => return FormulaValue::Error(e),
            };
            let r = match right.to_number() {
                Ok(n) => n,
                Err(e) => return FormulaValue::Error(e),
            };
            arithmetic(op, l, r)
        }

        BinaryOperator::Concat => match (left.to_text(), right.to_text()) {
            (Ok(l), Ok(r)) => FormulaValue::String(l + &r),
            (Err(e), _) | (_, Err(e)) => FormulaValue::Error(e),
        },

        BinaryOperator::Equal
        | BinaryOperator::NotEqual
        | BinaryOperator::LessThan
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqual => match left.compare(right) {
            Ok(ord) => FormulaValue::Boolean(match op {
                BinaryOperator::Equal => ord == Ordering::Equal,
                BinaryOperator::NotEqual => ord != Ordering::Equal,
                BinaryOperator::LessThan => ord == Ordering::Less,
                BinaryOperator::LessEqual => ord != Ordering::Greater,
                BinaryOperator::GreaterThan => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }),
            Err(e) => FormulaValue::Error(e),
        },

        // Needs reference operands; the interpreter handles it before dereferencing
        BinaryOperator::Range => FormulaValue::Error(CellError::Value),
    }
}

/// Apply a unary operator to a scalar
pub fn unary(op: UnaryOperator, operand: &FormulaValue) -> FormulaValue {
    let n = match operand.to_number() {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    match op {
        // -0 never escapes a negation
        UnaryOperator::Negate if n == 0.0 => FormulaValue::Number(0.0),
        UnaryOperator::Negate => FormulaValue::Number(-n),
        UnaryOperator::Percent => FormulaValue::Number(n / 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> FormulaValue {
        FormulaValue::Number(n)
    }

    fn bits(v: FormulaValue) -> u64 {
        match v {
            FormulaValue::Number(n) => n.to_bits(),
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(binary(BinaryOperator::Add, &num(1.0), &num(2.0)), num(3.0));
        assert_eq!(binary(BinaryOperator::Subtract, &num(5.0), &num(3.0)), num(2.0));
        assert_eq!(binary(BinaryOperator::Multiply, &num(4.0), &num(3.0)), num(12.0));
        assert_eq!(binary(BinaryOperator::Divide, &num(10.0), &num(4.0)), num(2.5));
        assert_eq!(binary(BinaryOperator::Power, &num(2.0), &num(10.0)), num(1024.0));
        assert_eq!(
            binary(BinaryOperator::Add, &FormulaValue::from(" 2 "), &FormulaValue::Boolean(true)),
            num(3.0)
        );
        assert_eq!(binary(BinaryOperator::Add, &FormulaValue::Empty, &num(1.0)), num(1.0));
    }

    #[test]
    fn test_arithmetic_errors() {
        assert_eq!(
            binary(BinaryOperator::Divide, &num(1.0), &num(0.0)),
            FormulaValue::Error(CellError::Div0)
        );
        assert_eq!(
            binary(BinaryOperator::Divide, &num(1.0), &FormulaValue::Empty),
            FormulaValue::Error(CellError::Div0)
        );
        assert_eq!(
            binary(BinaryOperator::Power, &num(-1.0), &num(0.5)),
            FormulaValue::Error(CellError::Num)
        );
        assert_eq!(
            binary(BinaryOperator::Multiply, &num(1e308), &num(10.0)),
            FormulaValue::Error(CellError::Num)
        );
        assert_eq!(
            binary(BinaryOperator::Add, &FormulaValue::from("abc"), &num(1.0)),
            FormulaValue::Error(CellError::Value)
        );
        // Left error wins
        assert_eq!(
            binary(
                BinaryOperator::Add,
                &FormulaValue::Error(CellError::Ref),
                &FormulaValue::Error(CellError::Na)
            ),
            FormulaValue::Error(CellError::Ref)
        );
        assert_eq!(
            binary(BinaryOperator::Divide, &FormulaValue::Error(CellError::Na), &num(0.0)),
            FormulaValue::Error(CellError::Na)
        );
    }

    #[test]
    fn test_negative_zero() {
        let neg_zero = num(-0.0);
        let zero = num(0.0);

        assert_eq!(bits(unary(UnaryOperator::Negate, &zero)), 0.0f64.to_bits());
        assert_eq!(bits(unary(UnaryOperator::Negate, &neg_zero)), 0.0f64.to_bits());
        assert_eq!(
            bits(binary(BinaryOperator::Subtract, &neg_zero, &zero)),
            (-0.0f64).to_bits()
        );
        assert_eq!(
            bits(binary(BinaryOperator::Add, &neg_zero, &zero)),
            0.0f64.to_bits()
        );
    }

    #[test]
    fn test_comparison_and_concat() {
        assert_eq!(
            binary(BinaryOperator::Equal, &FormulaValue::from("a"), &FormulaValue::from("A")),
            FormulaValue::Boolean(true)
        );
        assert_eq!(
            binary(BinaryOperator::LessThan, &num(100.0), &FormulaValue::from("1")),
            FormulaValue::Boolean(false)
        );
        assert_eq!(
            binary(BinaryOperator::GreaterThan, &num(1.0), &FormulaValue::from("a")),
            FormulaValue::Boolean(true)
        );
        assert_eq!(
            binary(BinaryOperator::GreaterEqual, &FormulaValue::Boolean(false), &num(1.0)),
            FormulaValue::Boolean(true)
        );
        assert_eq!(
            binary(BinaryOperator::Concat, &FormulaValue::from("x"), &num(1.5)),
            FormulaValue::from("x1.5")
        );
        assert_eq!(
            binary(BinaryOperator::Concat, &FormulaValue::Empty, &FormulaValue::Boolean(true)),
            FormulaValue::from("TRUE")
        );
        assert_eq!(unary(UnaryOperator::Percent, &num(50.0)), num(0.5));
    }
}
