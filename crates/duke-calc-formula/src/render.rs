//! Token to text rendering

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::token::{SheetLookup, SheetRef, Token};
use duke_calc_core::CellValue;

const ATOM: u8 = 9;

fn corrupt(msg: &str) -> FormulaError {
    FormulaError::CorruptFormula(msg.into())
}

fn quote_string(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn sheet_name_text(name: &str) -> String {
    let needs_quotes = name.starts_with(|c: char| c.is_ascii_digit())
        || name.chars().any(|c| !(c.is_alphanumeric() || c == '_'));
    if needs_quotes {
        format!("'{}'", name.replace('\'', "''"))
    } else {
        name.to_string()
    }
}

fn sheet_prefix<S: SheetLookup + ?Sized>(sheet: &SheetRef, sheets: &S) -> FormulaResult<String> {
    let name = |index: usize| {
        sheets
            .sheet_name(index)
            .ok_or_else(|| FormulaError::InvalidReference(format!("no sheet at index {}", index)))
    };
    Ok(match sheet {
        SheetRef::Local => String::new(),
        SheetRef::Sheet(i) => format!("{}!", sheet_name_text(name(*i)?)),
        SheetRef::SheetRange(first, last) => {
            let (first, last) = (name(*first)?, name(*last)?);
            let joined = format!("{}:{}", first, last);
            if sheet_name_text(first) == first && sheet_name_text(last) == last {
                format!("{}!", joined)
            } else {
                format!("'{}'!", joined.replace('\'', "''"))
            }
        }
        SheetRef::External { book, sheet } => {
            let quoted = sheet_name_text(sheet);
            if quoted == *sheet && !book.contains(|c: char| c == '\'' || c == ' ') {
                format!("[{}]{}!", book, sheet)
            } else {
                format!("'[{}]{}'!", book, sheet.replace('\'', "''"))
            }
        }
    })
}

fn literal_text(value: &CellValue) -> String {
    match value {
        CellValue::String(s) => quote_string(s.as_str()),
        other => other.to_string(),
    }
}

/// Render a token sequence as formula text, without the leading `=`
pub(crate) fn render_tokens<S: SheetLookup + ?Sized>(
    tokens: &[Token],
    sheets: &S,
) -> FormulaResult<String> {
    let mut stack: Vec<(String, u8)> = Vec::new();

    for token in tokens {
        let entry = match token {
            Token::Number(n) => (n.to_string(), ATOM),
            Token::String(s) => (quote_string(s), ATOM),
            Token::Boolean(b) => ((if *b { "TRUE" } else { "FALSE" }).to_string(), ATOM),
            Token::Error(e) => (e.as_str().to_string(), ATOM),
            Token::Missing => (String::new(), ATOM),
            Token::Ref { sheet, address } => {
                (format!("{}{}", sheet_prefix(sheet, sheets)?, address), ATOM)
            }
            Token::Area { sheet, range } => {
                (format!("{}{}", sheet_prefix(sheet, sheets)?, range), ATOM)
            }
            Token::RefError { sheet } | Token::AreaError { sheet } => {
                (format!("{}#REF!", sheet_prefix(sheet, sheets)?), ATOM)
            }
            Token::Name(name) => (name.clone(), ATOM),
            Token::AttrIf { .. } | Token::AttrSkip { .. } => continue,

            Token::Unary(op) => {
                let (text, prec) = stack.pop().ok_or_else(|| corrupt("missing operand"))?;
                let operand = if prec < op.precedence() {
                    format!("({})", text)
                } else {
                    text
                };
                match op {
                    UnaryOperator::Negate => (format!("-{}", operand), op.precedence()),
                    UnaryOperator::Percent => (format!("{}%", operand), op.precedence()),
                }
            }

            Token::Binary(op) => {
                let (right, right_prec) = stack.pop().ok_or_else(|| corrupt("missing operand"))?;
                let (left, left_prec) = stack.pop().ok_or_else(|| corrupt("missing operand"))?;
                let prec = op.precedence();
                // ^ associates to the right, everything else to the left
                let (wrap_left, wrap_right) = if *op == BinaryOperator::Power {
                    (left_prec <= prec, right_prec < prec)
                } else {
                    (left_prec < prec, right_prec <= prec)
                };
                let left = if wrap_left { format!("({})", left) } else { left };
                let right = if wrap_right {
                    format!("({})", right)
                } else {
                    right
                };
                (format!("{}{}{}", left, op.symbol(), right), prec)
            }

            Token::Function { name, argc } => {
                if stack.len() < *argc {
                    return Err(corrupt("function has fewer operands than arguments"));
                }
                let args: Vec<String> = stack
                    .split_off(stack.len() - argc)
                    .into_iter()
                    .map(|(text, _)| text)
                    .collect();
                (format!("{}({})", name, args.join(",")), ATOM)
            }

            Token::Array(rows) => {
                let rows: Vec<String> = rows
                    .iter()
                    .map(|row| row.iter().map(literal_text).collect::<Vec<_>>().join(","))
                    .collect();
                (format!("{{{}}}", rows.join(";")), ATOM)
            }
        };
        stack.push(entry);
    }

    match (stack.pop(), stack.is_empty()) {
        (Some((text, _)), true) => Ok(text),
        _ => Err(corrupt("token sequence does not reduce to one expression")),
    }
}

#[cfg(test)]
mod tests {
    use crate::token::{Formula, SheetRef, Token};

    fn sheets() -> Vec<String> {
        vec!["Sheet1".into(), "My Data".into(), "Sheet3".into()]
    }

    fn roundtrip(text: &str) -> String {
        let sheets = sheets();
        Formula::parse(text, &sheets).unwrap().render(&sheets).unwrap()
    }

    #[test]
    fn test_render_keeps_needed_parentheses() {
        assert_eq!(roundtrip("=(1+2)*3"), "=(1+2)*3");
        assert_eq!(roundtrip("=1+(2*3)"), "=1+2*3");
        assert_eq!(roundtrip("=1-(2-3)"), "=1-(2-3)");
        assert_eq!(roundtrip("=(2^3)^2"), "=(2^3)^2");
        assert_eq!(roundtrip("=2^3^2"), "=2^3^2");
        assert_eq!(roundtrip("=-(A1+1)"), "=-(A1+1)");
        assert_eq!(roundtrip("=5%"), "=5%");
    }

    #[test]
    fn test_render_references_and_literals() {
        assert_eq!(roundtrip("=SUM($A$1:B2,'My Data'!C3)"), "=SUM($A$1:B2,'My Data'!C3)");
        assert_eq!(roundtrip("=Sheet1:Sheet3!A1"), "=Sheet1:Sheet3!A1");
        assert_eq!(roundtrip("=[Other.xlsx]Data!A1"), "=[Other.xlsx]Data!A1");
        assert_eq!(roundtrip("=\"say \"\"hi\"\"\"&TRUE"), "=\"say \"\"hi\"\"\"&TRUE");
        assert_eq!(roundtrip("=IF(A1,\"x\",)"), "=IF(A1,\"x\",)");
        assert_eq!(roundtrip("={1,2;3,\"b\"}"), "={1,2;3,\"b\"}");
        assert_eq!(roundtrip("=Rate*2"), "=Rate*2");
        assert_eq!(roundtrip("=0.5+#N/A"), "=0.5+#N/A");
    }

    #[test]
    fn test_render_error_references() {
        let sheets = sheets();
        let formula = Formula::from_tokens(vec![
            Token::RefError {
                sheet: SheetRef::Local,
            },
            Token::AreaError {
                sheet: SheetRef::Sheet(2),
            },
            Token::Function {
                name: "SUM".into(),
                argc: 2,
            },
        ]);
        assert_eq!(formula.render(&sheets).unwrap(), "=SUM(#REF!,Sheet3!#REF!)");
    }

    #[test]
    fn test_render_rejects_corrupt_sequences() {
        let sheets = sheets();
        let formula = Formula::from_tokens(vec![Token::Number(1.0), Token::Number(2.0)]);
        assert!(formula.render(&sheets).is_err());

        let formula = Formula::from_tokens(vec![Token::Ref {
            sheet: SheetRef::Sheet(7),
            address: duke_calc_core::CellAddress::new(0, 0),
        }]);
        assert!(formula.render(&sheets).is_err());
    }
}
