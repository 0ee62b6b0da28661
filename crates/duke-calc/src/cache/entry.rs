//! Cache entries

use duke_calc_core::{CellKey, CellValue};
use indexmap::IndexSet;

/// Handle of an entry in the [`EvaluationCache`](super::EvaluationCache) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) usize);

/// Whether an entry caches a literal or a computed result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Literal value of a non-formula cell
    Plain,
    /// Last computed result of a formula cell
    Formula,
}

/// One cached cell
///
/// `consumed` are the entries the formula read during its most recent
/// evaluation; `consumers` is the inverse relation. Both sets keep insertion
/// order so invalidation visits dependents in the order they were recorded.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CellKey,
    pub kind: EntryKind,
    /// `None` while a formula result is not cached
    pub value: Option<CellValue>,
    pub(crate) consumers: IndexSet<EntryId>,
    pub(crate) consumed: IndexSet<EntryId>,
}

impl CacheEntry {
    pub(crate) fn plain(key: CellKey, value: CellValue) -> Self {
        Self {
            key,
            kind: EntryKind::Plain,
            value: Some(value),
            consumers: IndexSet::new(),
            consumed: IndexSet::new(),
        }
    }

    pub(crate) fn formula(key: CellKey) -> Self {
        Self {
            key,
            kind: EntryKind::Formula,
            value: None,
            consumers: IndexSet::new(),
            consumed: IndexSet::new(),
        }
    }

    pub fn is_formula(&self) -> bool {
        self.kind == EntryKind::Formula
    }

    /// Entries whose cached results were computed from this one
    pub fn consumers(&self) -> impl DoubleEndedIterator<Item = EntryId> + '_ {
        self.consumers.iter().copied()
    }

    /// Entries read by the most recent evaluation of this formula
    pub fn consumed(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.consumed.iter().copied()
    }
}

/// Equality that tells `-0.0` from `0.0`, so such an update still invalidates
pub(crate) fn same_value(a: &CellValue, b: &CellValue) -> bool {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}
