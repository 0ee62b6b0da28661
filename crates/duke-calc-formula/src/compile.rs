//! AST to token compilation

use crate::ast::{FormulaExpr, SheetQualifier, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::token::{SheetLookup, SheetRef, Token};
use duke_calc_core::{CellRange, CellValue};

/// Resolved sheet of a reference, or `None` when the sheet does not exist
fn resolve_sheet<S: SheetLookup + ?Sized>(
    qualifier: Option<&SheetQualifier>,
    sheets: &S,
) -> FormulaResult<Option<SheetRef>> {
    let Some(q) = qualifier else {
        return Ok(Some(SheetRef::Local));
    };

    if let Some(book) = &q.book {
        if q.last.is_some() {
            return Err(FormulaError::Parse(format!(
                "3-D references into external workbook '{}' are not supported",
                book
            )));
        }
        return Ok(Some(SheetRef::External {
            book: book.clone(),
            sheet: q.first.clone(),
        }));
    }

    let Some(first) = sheets.sheet_index(&q.first) else {
        return Ok(None);
    };
    match &q.last {
        None => Ok(Some(SheetRef::Sheet(first))),
        Some(last) => Ok(sheets
            .sheet_index(last)
            .map(|last| SheetRef::SheetRange(first.min(last), first.max(last)))),
    }
}

fn array_element(expr: &FormulaExpr) -> FormulaResult<CellValue> {
    match expr {
        FormulaExpr::Number(n) => Ok(CellValue::Number(*n)),
        FormulaExpr::String(s) => Ok(CellValue::string(s)),
        FormulaExpr::Boolean(b) => Ok(CellValue::Boolean(*b)),
        FormulaExpr::Error(e) => Ok(CellValue::Error(*e)),
        FormulaExpr::UnaryOp {
            op: UnaryOperator::Negate,
            operand,
        } => match operand.as_ref() {
            FormulaExpr::Number(n) => Ok(CellValue::Number(-n)),
            _ => Err(FormulaError::Parse(
                "Array constants may only contain literals".into(),
            )),
        },
        _ => Err(FormulaError::Parse(
            "Array constants may only contain literals".into(),
        )),
    }
}

/// Append the RPN tokens of `expr` to `out`
pub(crate) fn compile_expr<S: SheetLookup + ?Sized>(
    expr: &FormulaExpr,
    sheets: &S,
    out: &mut Vec<Token>,
) -> FormulaResult<()> {
    match expr {
        FormulaExpr::Number(n) => out.push(Token::Number(*n)),
        FormulaExpr::String(s) => out.push(Token::String(s.clone())),
        FormulaExpr::Boolean(b) => out.push(Token::Boolean(*b)),
        FormulaExpr::Error(e) => out.push(Token::Error(*e)),
        FormulaExpr::Missing => out.push(Token::Missing),

        FormulaExpr::CellRef(r) => {
            let token = match resolve_sheet(r.sheet.as_ref(), sheets)? {
                Some(sheet) => Token::Ref {
                    sheet,
                    address: r.address,
                },
                None => Token::RefError {
                    sheet: SheetRef::Local,
                },
            };
            out.push(token);
        }

        FormulaExpr::RangeRef(r) => {
            let token = match resolve_sheet(r.sheet.as_ref(), sheets)? {
                Some(sheet) => Token::Area {
                    sheet,
                    range: CellRange::new(r.range.start, r.range.end),
                },
                None => Token::AreaError {
                    sheet: SheetRef::Local,
                },
            };
            out.push(token);
        }

        FormulaExpr::NameRef(name) => out.push(Token::Name(name.clone())),

        FormulaExpr::BinaryOp { op, left, right } => {
            compile_expr(left, sheets, out)?;
            compile_expr(right, sheets, out)?;
            out.push(Token::Binary(*op));
        }

        FormulaExpr::UnaryOp { op, operand } => {
            compile_expr(operand, sheets, out)?;
            out.push(Token::Unary(*op));
        }

        FormulaExpr::Function { name, args } if name == "IF" && (2..=3).contains(&args.len()) => {
            compile_if(args, sheets, out)?;
        }

        FormulaExpr::Function { name, args } => {
            for arg in args {
                compile_expr(arg, sheets, out)?;
            }
            out.push(Token::Function {
                name: name.to_uppercase(),
                argc: args.len(),
            });
        }

        FormulaExpr::Array(rows) => {
            let width = rows.first().map_or(0, Vec::len);
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                if row.len() != width {
                    return Err(FormulaError::Parse(
                        "Array constant rows must have the same length".into(),
                    ));
                }
                values.push(row.iter().map(array_element).collect::<FormulaResult<Vec<_>>>()?);
            }
            out.push(Token::Array(values));
        }
    }

    Ok(())
}

fn compile_if<S: SheetLookup + ?Sized>(
    args: &[FormulaExpr],
    sheets: &S,
    out: &mut Vec<Token>,
) -> FormulaResult<()> {
    compile_expr(&args[0], sheets, out)?;

    let if_pos = out.len();
    out.push(Token::AttrIf { skip: 0 });
    compile_expr(&args[1], sheets, out)?;
    let true_skip_pos = out.len();
    out.push(Token::AttrSkip { skip: 0 });

    if let Some(if_false) = args.get(2) {
        compile_expr(if_false, sheets, out)?;
        let false_skip_pos = out.len();
        out.push(Token::AttrSkip { skip: 1 });
        out[true_skip_pos] = Token::AttrSkip {
            skip: false_skip_pos - true_skip_pos + 1,
        };
    } else {
        out[true_skip_pos] = Token::AttrSkip { skip: 1 };
    }
    // A false condition resumes right after the true branch's skip
    out[if_pos] = Token::AttrIf {
        skip: true_skip_pos - if_pos,
    };

    out.push(Token::Function {
        name: "IF".into(),
        argc: args.len(),
    });
    Ok(())
}
