//! Evaluator configuration

/// Options for a [`WorkbookEvaluator`](crate::WorkbookEvaluator)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluatorOptions {
    /// When an external reference names a workbook that was never set up,
    /// use the formula cell's stored result instead of failing
    /// (default: false)
    pub ignore_missing_workbooks: bool,
}

impl EvaluatorOptions {
    /// Options with missing workbooks ignored
    pub fn ignoring_missing_workbooks() -> Self {
        Self {
            ignore_missing_workbooks: true,
        }
    }
}
