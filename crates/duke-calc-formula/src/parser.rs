//! Formula parser
//!
//! A recursive descent parser for Excel formulas with proper operator precedence.
//! References keep their `$` markers, may carry a sheet, a 3-D sheet span or an
//! external workbook, and omitted function arguments are kept as
//! [`FormulaExpr::Missing`].

use crate::ast::{
    BinaryOperator, CellReference, FormulaExpr, RangeReference, SheetQualifier, UnaryOperator,
};
use crate::error::{FormulaError, FormulaResult};
use duke_calc_core::{CellAddress, CellError, CellRange};

/// Parse a formula string into an AST
///
/// # Example
/// ```rust
/// use duke_calc_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(Sheet2!A1:A10)").unwrap();
/// let ast = parse_formula("=IF(A1>0,\"Yes\",)").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let formula = formula.trim();

    let formula = formula
        .strip_prefix('=')
        .ok_or_else(|| FormulaError::Parse("Formula must start with '='".into()))?;

    let mut parser = FormulaParser::new(formula);
    let expr = parser.parse_expression()?;

    if !matches!(parser.current_token(), Lexeme::Eof) {
        return Err(FormulaError::Parse(format!(
            "Unexpected {:?} after expression",
            parser.current_token()
        )));
    }

    Ok(expr)
}

/// Scanner output
#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),

    // Identifiers and references
    Identifier(String),
    CellRef(String),
    SheetPrefix(SheetQualifier),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    Semicolon,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    Unknown(char),
    Eof,
}

struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Lexeme,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> Self {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: Lexeme::Eof,
        };
        parser.advance_token();
        parser
    }

    // === Token scanning ===

    fn advance_token(&mut self) {
        self.current_token = self.scan_token();
    }

    fn scan_token(&mut self) -> Lexeme {
        self.skip_whitespace();

        let Some(c) = self.peek_char() else {
            return Lexeme::Eof;
        };

        let single = match c {
            '+' => Some(Lexeme::Plus),
            '-' => Some(Lexeme::Minus),
            '*' => Some(Lexeme::Star),
            '/' => Some(Lexeme::Slash),
            '^' => Some(Lexeme::Caret),
            '%' => Some(Lexeme::Percent),
            '&' => Some(Lexeme::Ampersand),
            ':' => Some(Lexeme::Colon),
            ',' => Some(Lexeme::Comma),
            ';' => Some(Lexeme::Semicolon),
            '(' => Some(Lexeme::LeftParen),
            ')' => Some(Lexeme::RightParen),
            '{' => Some(Lexeme::LeftBrace),
            '}' => Some(Lexeme::RightBrace),
            '=' => Some(Lexeme::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return token;
        }

        if c == '<' {
            self.advance();
            return match self.peek_char() {
                Some('=') => {
                    self.advance();
                    Lexeme::LessEqual
                }
                Some('>') => {
                    self.advance();
                    Lexeme::NotEqual
                }
                _ => Lexeme::LessThan,
            };
        }

        if c == '>' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Lexeme::GreaterEqual;
            }
            return Lexeme::GreaterThan;
        }

        if c == '"' {
            return self.scan_string();
        }

        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            // A number may still be the start of a sheet name such as `2024!A1`
            if let Some(sheet) = self.try_scan_sheet_prefix() {
                return Lexeme::SheetPrefix(sheet);
            }
            return self.scan_number();
        }

        if c == '\'' || c == '[' || c.is_alphabetic() || c == '_' {
            if let Some(sheet) = self.try_scan_sheet_prefix() {
                return Lexeme::SheetPrefix(sheet);
            }
        }

        if c.is_alphabetic() || c == '_' || c == '$' || c == '#' {
            return self.scan_identifier_or_ref();
        }

        self.advance();
        Lexeme::Unknown(c)
    }

    fn scan_string(&mut self) -> Lexeme {
        self.advance(); // Skip opening quote

        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if c == '"' {
                // Escaped quote ("")
                if self.peek_char_at(1) == Some('"') {
                    s.push('"');
                    self.advance();
                    self.advance();
                } else {
                    break;
                }
            } else {
                s.push(c);
                self.advance();
            }
        }

        if self.peek_char() == Some('"') {
            self.advance();
        }

        Lexeme::String(s)
    }

    fn scan_number(&mut self) -> Lexeme {
        let start = self.pos;

        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek_char().map_or(false, |c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num: f64 = self.input[start..self.pos].parse().unwrap_or(0.0);
        Lexeme::Number(num)
    }

    /// Scan `Sheet!`, `'My Sheet'!`, `Sheet1:Sheet3!` or `[Book]Sheet!`, restoring
    /// the position when the text turns out not to be a sheet prefix
    fn try_scan_sheet_prefix(&mut self) -> Option<SheetQualifier> {
        let start = self.pos;
        let qualifier = if self.peek_char() == Some('\'') {
            self.scan_quoted_sheet_prefix()
        } else {
            self.scan_plain_sheet_prefix()
        };
        if qualifier.is_none() {
            self.pos = start;
        }
        qualifier
    }

    fn scan_quoted_sheet_prefix(&mut self) -> Option<SheetQualifier> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek_char()? {
                '\'' if self.peek_char_at(1) == Some('\'') => {
                    text.push('\'');
                    self.advance();
                    self.advance();
                }
                '\'' => {
                    self.advance();
                    break;
                }
                c => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        if self.peek_char() != Some('!') {
            return None;
        }
        self.advance();

        let (book, sheets) = match text.strip_prefix('[') {
            Some(rest) => {
                let (book, sheets) = rest.split_once(']')?;
                (Some(book.to_string()), sheets.to_string())
            }
            None => (None, text),
        };
        let (first, last) = match sheets.split_once(':') {
            Some((first, last)) => (first.to_string(), Some(last.to_string())),
            None => (sheets, None),
        };
        if first.is_empty() {
            return None;
        }
        Some(SheetQualifier { book, first, last })
    }

    fn scan_plain_sheet_prefix(&mut self) -> Option<SheetQualifier> {
        let mut book = None;
        if self.peek_char() == Some('[') {
            self.advance();
            let start = self.pos;
            while self.peek_char().map_or(false, |c| c != ']') {
                self.advance();
            }
            if self.peek_char() != Some(']') {
                return None;
            }
            book = Some(self.input[start..self.pos].to_string());
            self.advance();
        }

        let first = self.scan_sheet_word()?;
        let mut last = None;
        if self.peek_char() == Some(':') {
            self.advance();
            last = Some(self.scan_sheet_word()?);
        }
        if self.peek_char() != Some('!') {
            return None;
        }
        self.advance();
        Some(SheetQualifier { book, first, last })
    }

    fn scan_sheet_word(&mut self) -> Option<String> {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            self.advance();
        }
        if self.pos == start {
            return None;
        }
        Some(self.input[start..self.pos].to_string())
    }

    fn scan_identifier_or_ref(&mut self) -> Lexeme {
        // Error values first (#VALUE!, #REF!, etc.)
        if self.peek_char() == Some('#') {
            let start = self.pos;
            self.advance();
            while self.peek_char().map_or(false, |c| {
                c.is_ascii_alphanumeric() || c == '!' || c == '/' || c == '?'
            }) {
                self.advance();
            }
            let error_str = &self.input[start..self.pos];
            if let Some(err) = CellError::from_literal(error_str) {
                return Lexeme::Error(err);
            }
            return Lexeme::Identifier(error_str.to_string());
        }

        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.')
        {
            self.advance();
        }
        let text = &self.input[start..self.pos];
        let is_call = self.peek_char_after_whitespace() == Some('(');

        // TRUE( and FALSE( are function calls
        let upper = text.to_uppercase();
        if !is_call && upper == "TRUE" {
            return Lexeme::Boolean(true);
        }
        if !is_call && upper == "FALSE" {
            return Lexeme::Boolean(false);
        }

        // LOG10(100) is a function, not a cell reference
        if !is_call && Self::is_cell_reference(text) {
            return Lexeme::CellRef(text.to_string());
        }

        Lexeme::Identifier(text.to_string())
    }

    fn is_cell_reference(text: &str) -> bool {
        // [$]letters[$]digits
        let bytes = text.as_bytes();
        let mut i = 0;

        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }
        let letter_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        if i == letter_start || i - letter_start > 3 {
            return false;
        }
        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }
        let digit_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i != digit_start && i == bytes.len()
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn peek_char_after_whitespace(&self) -> Option<char> {
        self.input[self.pos..].chars().find(|c| !c.is_whitespace())
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Lexeme {
        &self.current_token
    }

    fn consume(&mut self) -> Lexeme {
        let token = std::mem::replace(&mut self.current_token, Lexeme::Eof);
        self.advance_token();
        token
    }

    fn expect(&mut self, expected: &Lexeme) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    /// Binary operator at the cursor with its precedence
    ///
    /// Unary minus and `%` bind tighter than every binary operator, so
    /// `-2^2` is 4.
    fn binary_operator(&self) -> Option<(BinaryOperator, u8)> {
        let op = match self.current_token() {
            Lexeme::Equal => BinaryOperator::Equal,
            Lexeme::NotEqual => BinaryOperator::NotEqual,
            Lexeme::LessThan => BinaryOperator::LessThan,
            Lexeme::LessEqual => BinaryOperator::LessEqual,
            Lexeme::GreaterThan => BinaryOperator::GreaterThan,
            Lexeme::GreaterEqual => BinaryOperator::GreaterEqual,
            Lexeme::Ampersand => BinaryOperator::Concat,
            Lexeme::Plus => BinaryOperator::Add,
            Lexeme::Minus => BinaryOperator::Subtract,
            Lexeme::Star => BinaryOperator::Multiply,
            Lexeme::Slash => BinaryOperator::Divide,
            Lexeme::Caret => BinaryOperator::Power,
            _ => return None,
        };
        let power = op.precedence();
        Some((op, power))
    }

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_binary(1)
    }

    /// Precedence climbing over operators binding at least `min_power`
    fn parse_binary(&mut self, min_power: u8) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_unary()?;
        while let Some((op, power)) = self.binary_operator() {
            if power < min_power {
                break;
            }
            self.consume();
            // `^` groups to the right
            let next = if op == BinaryOperator::Power { power } else { power + 1 };
            let right = self.parse_binary(next)?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        if matches!(self.current_token(), Lexeme::Minus) {
            self.consume();
            let operand = self.parse_unary()?;
            return Ok(FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }

        // Prefix plus is a no-op
        if matches!(self.current_token(), Lexeme::Plus) {
            self.consume();
            return self.parse_unary();
        }

        let mut expr = self.parse_range()?;

        while matches!(self.current_token(), Lexeme::Percent) {
            self.consume();
            expr = FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        Ok(expr)
    }

    fn parse_range(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_primary()?;

        if !matches!(self.current_token(), Lexeme::Colon) {
            return Ok(left);
        }
        self.consume();
        let right = self.parse_primary()?;

        if let (FormulaExpr::CellRef(start_ref), FormulaExpr::CellRef(end_ref)) = (&left, &right) {
            // Sheet1!A1:B2 - the second corner inherits the sheet of the first
            let sheet = match (&start_ref.sheet, &end_ref.sheet) {
                (sheet, None) => sheet.clone(),
                (Some(a), Some(b)) if a == b => Some(a.clone()),
                _ => {
                    return Err(FormulaError::Parse(
                        "Range references must be on the same sheet".into(),
                    ))
                }
            };
            return Ok(FormulaExpr::RangeRef(RangeReference {
                sheet,
                range: CellRange::new(start_ref.address, end_ref.address),
            }));
        }

        Ok(binary(BinaryOperator::Range, left, right))
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.consume() {
            Lexeme::Number(n) => Ok(FormulaExpr::Number(n)),
            Lexeme::String(s) => Ok(FormulaExpr::String(s)),
            Lexeme::Boolean(b) => Ok(FormulaExpr::Boolean(b)),
            Lexeme::Error(e) => Ok(FormulaExpr::Error(e)),

            Lexeme::LeftParen => {
                let expr = self.parse_expression()?;
                self.expect(&Lexeme::RightParen)?;
                Ok(expr)
            }

            Lexeme::LeftBrace => self.parse_array(),

            Lexeme::SheetPrefix(sheet) => match self.consume() {
                Lexeme::CellRef(ref_str) => self.parse_cell_reference(Some(sheet), &ref_str),
                other => Err(FormulaError::Parse(format!(
                    "Expected cell reference after sheet name, got {:?}",
                    other
                ))),
            },

            Lexeme::CellRef(ref_str) => self.parse_cell_reference(None, &ref_str),

            Lexeme::Identifier(name) => {
                if matches!(self.current_token(), Lexeme::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(FormulaExpr::NameRef(name))
                }
            }

            other => Err(FormulaError::Parse(format!("Unexpected token: {:?}", other))),
        }
    }

    fn parse_array(&mut self) -> FormulaResult<FormulaExpr> {
        let mut rows = Vec::new();
        let mut current_row = Vec::new();

        if !matches!(self.current_token(), Lexeme::RightBrace) {
            current_row.push(self.parse_expression()?);

            loop {
                match self.current_token() {
                    Lexeme::Comma => {
                        self.consume();
                        current_row.push(self.parse_expression()?);
                    }
                    Lexeme::Semicolon => {
                        self.consume();
                        rows.push(std::mem::take(&mut current_row));
                        current_row.push(self.parse_expression()?);
                    }
                    Lexeme::RightBrace => break,
                    _ => {
                        return Err(FormulaError::Parse(
                            "Expected ',' ';' or '}' in array".into(),
                        ))
                    }
                }
            }
        }

        if !current_row.is_empty() {
            rows.push(current_row);
        }

        self.expect(&Lexeme::RightBrace)?;
        Ok(FormulaExpr::Array(rows))
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(&Lexeme::LeftParen)?;

        let mut args = Vec::new();
        if !matches!(self.current_token(), Lexeme::RightParen) {
            args.push(self.parse_argument()?);

            while matches!(self.current_token(), Lexeme::Comma) {
                self.consume();
                args.push(self.parse_argument()?);
            }
        }

        self.expect(&Lexeme::RightParen)?;

        Ok(FormulaExpr::Function {
            name: name.to_uppercase(),
            args,
        })
    }

    fn parse_argument(&mut self) -> FormulaResult<FormulaExpr> {
        if matches!(self.current_token(), Lexeme::Comma | Lexeme::RightParen) {
            return Ok(FormulaExpr::Missing);
        }
        self.parse_expression()
    }

    fn parse_cell_reference(
        &mut self,
        sheet: Option<SheetQualifier>,
        ref_str: &str,
    ) -> FormulaResult<FormulaExpr> {
        let address = CellAddress::parse(ref_str).map_err(|e| {
            FormulaError::Parse(format!("Invalid cell reference '{}': {}", ref_str, e))
        })?;

        Ok(FormulaExpr::CellRef(CellReference { sheet, address }))
    }
}

fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
    FormulaExpr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
