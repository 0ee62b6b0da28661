//! Evaluation event hooks
//!
//! An [`EvaluationListener`] observes what the evaluator and its cache do.
//! Every method has an empty default, so a listener only overrides the
//! events it cares about. Tests use this to assert exactly which cached
//! results an update clears.

use duke_calc_core::{CellKey, CellValue};

/// Observer of evaluation and cache events
pub trait EvaluationListener {
    /// A formula result was served from the cache
    fn on_cache_hit(&mut self, _key: CellKey, _value: &CellValue) {}

    /// A plain (non-formula) cell was read and cached
    fn on_read_plain_value(&mut self, _key: CellKey, _value: &CellValue) {}

    /// A formula cell is about to be interpreted
    fn on_start_evaluate(&mut self, _key: CellKey) {}

    /// A formula cell finished evaluating
    fn on_end_evaluate(&mut self, _key: CellKey, _value: &CellValue) {}

    /// Every cached entry was dropped
    fn on_clear_whole_cache(&mut self) {}

    /// The entry of an updated cell was cleared
    fn on_clear_cached_value(&mut self, _key: CellKey, _value: Option<&CellValue>) {}

    /// A dependent formula result was cleared, `depth` edges away from the update
    fn on_clear_dependent_cached_value(
        &mut self,
        _key: CellKey,
        _value: Option<&CellValue>,
        _depth: usize,
    ) {
    }
}

/// A listener that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullListener;

impl EvaluationListener for NullListener {}
