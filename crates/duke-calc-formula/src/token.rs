//! Compiled formula representation
//!
//! A [`Formula`] is the reverse-polish token sequence the interpreter walks.
//! Operands come before their operator, and `IF` is laid out with jump tokens
//! so that only the selected branch is evaluated:
//!
//! ```text
//! IF(c, t, f)  =>  c AttrIf t AttrSkip f AttrSkip IF
//! IF(c, t)     =>  c AttrIf t AttrSkip IF
//! ```

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::FormulaResult;
use crate::parser::parse_formula;
use crate::shifter::FormulaShifter;
use duke_calc_core::{CellAddress, CellError, CellRange, CellValue};

/// Which sheet(s) a reference token points into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetRef {
    /// The sheet of the formula's own cell
    Local,
    /// A sheet of the formula's own workbook
    Sheet(usize),
    /// A 3-D span of sheets, `first <= last`
    SheetRange(usize, usize),
    /// A sheet of another workbook, resolved by name at evaluation time
    External { book: String, sheet: String },
}

impl SheetRef {
    /// Whether the reference names a sheet explicitly
    pub fn is_local(&self) -> bool {
        matches!(self, SheetRef::Local)
    }
}

/// A single operation of a compiled formula
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    /// Placeholder for an omitted function argument
    Missing,

    /// Single-cell reference
    Ref { sheet: SheetRef, address: CellAddress },
    /// Area reference
    Area { sheet: SheetRef, range: CellRange },
    /// A cell reference invalidated by a structural edit (`#REF!`)
    RefError { sheet: SheetRef },
    /// An area reference invalidated by a structural edit (`#REF!`)
    AreaError { sheet: SheetRef },

    /// Defined name
    Name(String),

    Unary(UnaryOperator),
    Binary(BinaryOperator),
    /// Function call consuming `argc` operands
    Function { name: String, argc: usize },

    /// Conditional jump of `IF`: when the condition is false, skip `skip` tokens
    AttrIf { skip: usize },
    /// Unconditional jump over `skip` tokens
    AttrSkip { skip: usize },

    /// Array constant
    Array(Vec<Vec<CellValue>>),
}

impl Token {
    /// Whether this token refers to cells (or did, before an edit invalidated it)
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Token::Ref { .. } | Token::Area { .. } | Token::RefError { .. } | Token::AreaError { .. }
        )
    }
}

/// Sheet name lookup used when compiling and rendering formulas
pub trait SheetLookup {
    /// Index of the sheet with this name (case-insensitive)
    fn sheet_index(&self, name: &str) -> Option<usize>;

    /// Name of the sheet at this index
    fn sheet_name(&self, index: usize) -> Option<&str>;
}

impl SheetLookup for [String] {
    fn sheet_index(&self, name: &str) -> Option<usize> {
        self.iter().position(|s| s.eq_ignore_ascii_case(name))
    }

    fn sheet_name(&self, index: usize) -> Option<&str> {
        self.get(index).map(String::as_str)
    }
}

impl SheetLookup for Vec<String> {
    fn sheet_index(&self, name: &str) -> Option<usize> {
        self.as_slice().sheet_index(name)
    }

    fn sheet_name(&self, index: usize) -> Option<&str> {
        self.as_slice().sheet_name(index)
    }
}

/// A compiled, immutable-by-default formula
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Formula {
    tokens: Vec<Token>,
}

impl Formula {
    /// Parse and compile formula text such as `=SUM(A1:B2)`
    ///
    /// # Example
    /// ```rust
    /// use duke_calc_formula::{Formula, Token};
    ///
    /// let sheets = vec!["Sheet1".to_string()];
    /// let formula = Formula::parse("=1+A1", &sheets).unwrap();
    /// assert_eq!(formula.tokens().len(), 3);
    /// assert_eq!(formula.render(&sheets).unwrap(), "=1+A1");
    /// ```
    pub fn parse<S: SheetLookup + ?Sized>(text: &str, sheets: &S) -> FormulaResult<Self> {
        let expr = parse_formula(text)?;
        Self::compile(&expr, sheets)
    }

    /// Compile a parsed expression, resolving sheet names to indices
    pub fn compile<S: SheetLookup + ?Sized>(expr: &FormulaExpr, sheets: &S) -> FormulaResult<Self> {
        let mut tokens = Vec::new();
        crate::compile::compile_expr(expr, sheets, &mut tokens)?;
        Ok(Self { tokens })
    }

    /// Wrap an existing token sequence without validating it
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut [Token] {
        &mut self.tokens
    }

    /// Render back to formula text, with a leading `=`
    pub fn render<S: SheetLookup + ?Sized>(&self, sheets: &S) -> FormulaResult<String> {
        crate::render::render_tokens(&self.tokens, sheets).map(|body| format!("={}", body))
    }

    /// Rewrite references for a structural edit
    ///
    /// `current_sheet` is the sheet holding the formula. Returns true when
    /// any token changed.
    pub fn adjust(&mut self, shifter: &FormulaShifter, current_sheet: usize) -> bool {
        shifter.adjust_formula(&mut self.tokens, current_sheet)
    }
}
