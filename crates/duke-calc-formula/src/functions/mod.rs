//! Spreadsheet functions
//!
//! The [`FunctionRegistry`] maps function names to implementations. It also
//! knows the full catalogue of built-in and Analysis ToolPak names, so that a
//! host can plug in implementations for functions this crate does not provide.

/// Unwrap a `Result<T, CellError>`, returning the error as the function's value
macro_rules! try_value {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return Ok($crate::value::FormulaValue::Error(e)),
        }
    };
}

pub mod analysis;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod text;

use crate::error::{FormulaError, FormulaResult};
use crate::interpreter::EvaluationContext;
use crate::value::FormulaValue;
use ahash::{AHashMap, AHashSet};
use duke_calc_core::CellError;
use once_cell::sync::Lazy;

/// Function implementation signature
///
/// Arguments arrive unevaluated as references where the formula passed
/// references; the context reads through them (recording dependencies).
pub type FunctionImpl =
    fn(&[FormulaValue], &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue>;

/// Function definition
#[derive(Clone, Copy)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    pub fn new(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            implementation,
        }
    }

    /// Check an argument count against the definition's bounds
    pub fn check_arg_count(&self, actual: usize) -> FormulaResult<()> {
        if actual < self.min_args {
            return Err(FormulaError::ArgumentCount {
                function: self.name.to_string(),
                expected: format!("at least {}", self.min_args),
                actual,
            });
        }
        if let Some(max) = self.max_args {
            if actual > max {
                return Err(FormulaError::ArgumentCount {
                    function: self.name.to_string(),
                    expected: format!("at most {}", max),
                    actual,
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

/// Names of the functions built into the spreadsheet application
static BUILTIN_NAMES: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        // Math
        "ABS", "ACOS", "ASIN", "ATAN", "ATAN2", "CEILING", "COMBIN", "COS", "DEGREES", "EVEN",
        "EXP", "FACT", "FLOOR", "INT", "LN", "LOG", "LOG10", "MOD", "ODD", "PI", "POWER",
        "PRODUCT", "RADIANS", "RAND", "ROUND", "ROUNDDOWN", "ROUNDUP", "SIGN", "SIN", "SQRT",
        "SUM", "SUMIF", "SUMPRODUCT", "SUMSQ", "TAN", "TRUNC",
        // Statistical
        "AVERAGE", "AVERAGEA", "COUNT", "COUNTA", "COUNTBLANK", "COUNTIF", "LARGE", "MAX",
        "MAXA", "MEDIAN", "MIN", "MINA", "MODE", "RANK", "SMALL", "STDEV", "VAR",
        // Logical
        "AND", "FALSE", "IF", "NOT", "OR", "TRUE",
        // Text
        "CHAR", "CLEAN", "CODE", "CONCATENATE", "DOLLAR", "EXACT", "FIND", "FIXED", "LEFT",
        "LEN", "LOWER", "MID", "PROPER", "REPLACE", "REPT", "RIGHT", "SEARCH", "SUBSTITUTE", "T",
        "TEXT", "TRIM", "UPPER", "VALUE",
        // Information
        "CELL", "ERROR.TYPE", "INFO", "ISBLANK", "ISERR", "ISERROR", "ISLOGICAL", "ISNA",
        "ISNONTEXT", "ISNUMBER", "ISREF", "ISTEXT", "N", "NA", "TYPE",
        // Lookup and reference
        "ADDRESS", "AREAS", "CHOOSE", "COLUMN", "COLUMNS", "HLOOKUP", "INDEX", "INDIRECT",
        "LOOKUP", "MATCH", "OFFSET", "ROW", "ROWS", "TRANSPOSE", "VLOOKUP",
        // Date and time
        "DATE", "DATEVALUE", "DAY", "DAYS360", "HOUR", "MINUTE", "MONTH", "NOW", "SECOND",
        "TIME", "TIMEVALUE", "TODAY", "WEEKDAY", "YEAR",
        // Financial
        "FV", "IPMT", "IRR", "NPER", "NPV", "PMT", "PPMT", "PV", "RATE",
    ]
    .into_iter()
    .collect()
});

/// Names of the Analysis ToolPak add-in functions
static ANALYSIS_NAMES: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "ACCRINT", "BIN2DEC", "BIN2HEX", "COMPLEX", "CONVERT", "DEC2BIN", "DEC2HEX", "DELTA",
        "EDATE", "EFFECT", "EOMONTH", "ERF", "FACTDOUBLE", "GCD", "GESTEP", "HEX2BIN",
        "HEX2DEC", "IFERROR", "ISEVEN", "ISODD", "LCM", "MROUND", "MULTINOMIAL", "NETWORKDAYS",
        "NOMINAL", "QUOTIENT", "RANDBETWEEN", "SERIESSUM", "SQRTPI", "WEEKNUM", "WORKDAY",
        "XIRR", "XNPV", "YEARFRAC",
    ]
    .into_iter()
    .collect()
});

/// Function registry
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with the bundled function library
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        math::register(&mut registry);
        logical::register(&mut registry);
        text::register(&mut registry);
        info::register(&mut registry);
        lookup::register(&mut registry);
        analysis::register(&mut registry);

        registry
    }

    /// A registry with no implementations at all
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up the implementation of a function
    ///
    /// Unknown names and known names without an implementation are both
    /// [`FormulaError::NotImplemented`].
    pub fn get(&self, name: &str) -> FormulaResult<&FunctionDef> {
        self.functions
            .get(&name.to_uppercase())
            .ok_or_else(|| FormulaError::NotImplemented(name.to_uppercase()))
    }

    /// Whether an implementation is registered under this name
    pub fn is_implemented(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_uppercase())
    }

    /// Whether the name belongs to the built-in catalogue
    pub fn is_builtin(name: &str) -> bool {
        BUILTIN_NAMES.contains(name.to_uppercase().as_str())
    }

    /// Whether the name belongs to the Analysis ToolPak catalogue
    pub fn is_analysis(name: &str) -> bool {
        ANALYSIS_NAMES.contains(name.to_uppercase().as_str())
    }

    /// Provide an implementation for a built-in function this library lacks
    pub fn register_builtin(&mut self, def: FunctionDef) -> FormulaResult<()> {
        let name = def.name.to_uppercase();
        if Self::is_analysis(&name) {
            return Err(FormulaError::Registration(format!(
                "{} is a function from the Analysis ToolPak; use register_analysis to register it",
                name
            )));
        }
        if !Self::is_builtin(&name) {
            return Err(FormulaError::Registration(format!(
                "{} is not a built-in function",
                name
            )));
        }
        self.register_new(name, def)
    }

    /// Provide an implementation for an Analysis ToolPak function this library lacks
    pub fn register_analysis(&mut self, def: FunctionDef) -> FormulaResult<()> {
        let name = def.name.to_uppercase();
        if Self::is_builtin(&name) {
            return Err(FormulaError::Registration(format!(
                "{} is a built-in function; use register_builtin to register it",
                name
            )));
        }
        if !Self::is_analysis(&name) {
            return Err(FormulaError::Registration(format!(
                "{} is not a function from the Analysis ToolPak",
                name
            )));
        }
        self.register_new(name, def)
    }

    fn register_new(&mut self, name: String, def: FunctionDef) -> FormulaResult<()> {
        if self.functions.contains_key(&name) {
            return Err(FormulaError::Registration(format!(
                "{} is already implemented and cannot be overridden",
                name
            )));
        }
        self.functions.insert(name, def);
        Ok(())
    }

    /// Library registration, bypassing the catalogue checks
    pub(crate) fn insert(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    /// Sorted names of every implemented function
    pub fn supported_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Sorted catalogue names that have no implementation
    pub fn unsupported_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = BUILTIN_NAMES
            .iter()
            .chain(ANALYSIS_NAMES.iter())
            .copied()
            .filter(|name| !self.functions.contains_key(*name))
            .collect();
        names.sort_unstable();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Every value an argument list supplies, with whether it was passed directly
///
/// References, areas and array constants are expanded; their values are
/// marked indirect. Reading them records the cells as dependencies.
pub(crate) fn flatten_args(
    args: &[FormulaValue],
    ctx: &mut EvaluationContext<'_>,
) -> FormulaResult<Vec<(FormulaValue, bool)>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            FormulaValue::Ref(r) => out.push((FormulaValue::from(r.value.clone()), false)),
            FormulaValue::Area(area) => {
                for value in ctx.area_values(area)? {
                    out.push((FormulaValue::from(value), false));
                }
            }
            FormulaValue::Array(rows) => {
                for value in rows.iter().flatten() {
                    out.push((value.clone(), false));
                }
            }
            other => out.push((other.clone(), true)),
        }
    }
    Ok(out)
}

/// Numbers of an aggregate argument list (SUM, AVERAGE, ...)
///
/// Direct arguments are coerced, so `TRUE` and `"3"` count and a
/// non-numeric string is `#VALUE!`. Through references only numbers count.
/// Errors propagate either way.
pub(crate) fn collect_numbers(
    args: &[FormulaValue],
    ctx: &mut EvaluationContext<'_>,
) -> FormulaResult<Result<Vec<f64>, CellError>> {
    let mut numbers = Vec::new();
    for (value, direct) in flatten_args(args, ctx)? {
        match value {
            FormulaValue::Number(n) => numbers.push(n),
            FormulaValue::Error(e) => return Ok(Err(e)),
            other if direct => match other.to_number() {
                Ok(n) => numbers.push(n),
                Err(e) => return Ok(Err(e)),
            },
            _ => {}
        }
    }
    Ok(Ok(numbers))
}

/// Scalar of a single-valued argument
pub(crate) fn scalar_arg(
    args: &[FormulaValue],
    index: usize,
    ctx: &mut EvaluationContext<'_>,
) -> FormulaResult<FormulaValue> {
    match args.get(index) {
        Some(arg) => ctx.scalar(arg.clone()),
        None => Ok(FormulaValue::Missing),
    }
}

/// Number of a single-valued argument, `default` when it is omitted
pub(crate) fn number_arg(
    args: &[FormulaValue],
    index: usize,
    default: f64,
    ctx: &mut EvaluationContext<'_>,
) -> FormulaResult<Result<f64, CellError>> {
    match scalar_arg(args, index, ctx)? {
        FormulaValue::Missing if args.len() <= index => Ok(Ok(default)),
        value => Ok(value.to_number()),
    }
}
