//! Evaluation cache and dependency graph
//!
//! Every cell read during an evaluation gets an entry: plain entries hold the
//! literal of a non-formula cell, formula entries the last computed result.
//! Formula entries record which entries they consumed; the inverse
//! `consumers` edges drive invalidation.
//!
//! # Edge direction
//!
//! ```text
//! A → B  means  "B consumed A"  (A is in B.consumed, B is in A.consumers)
//! ```
//!
//! Edges always describe the most recent evaluation only, so a dependency a
//! formula no longer has never causes it to be cleared.

mod entry;

pub use entry::{CacheEntry, EntryId, EntryKind};

use entry::same_value;

use crate::listener::EvaluationListener;
use ahash::{AHashMap, AHashSet};
use duke_calc_core::{CellKey, CellValue};
use indexmap::IndexSet;
use log::debug;

/// New content of an updated cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellUpdate {
    /// The cell now holds this literal (blank included)
    Plain(CellValue),
    /// The cell now holds a formula
    Formula,
}

/// Arena of cache entries indexed by cell coordinate
#[derive(Debug, Default)]
pub struct EvaluationCache {
    entries: Vec<Option<CacheEntry>>,
    free: Vec<usize>,
    index: AHashMap<CellKey, EntryId>,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry of a cell, if the cell was read since the last clear
    pub fn lookup(&self, key: CellKey) -> Option<EntryId> {
        self.index.get(&key).copied()
    }

    pub fn entry(&self, id: EntryId) -> Option<&CacheEntry> {
        self.entries.get(id.0).and_then(Option::as_ref)
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut CacheEntry> {
        self.entries.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Cached value of an entry (`None` for a formula not yet evaluated)
    pub fn value(&self, id: EntryId) -> Option<&CellValue> {
        self.entry(id).and_then(|e| e.value.as_ref())
    }

    /// Cached value of a cell
    pub fn cached_value(&self, key: CellKey) -> Option<&CellValue> {
        self.lookup(key).and_then(|id| self.value(id))
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn insert(&mut self, entry: CacheEntry) -> EntryId {
        let key = entry.key;
        let id = match self.free.pop() {
            Some(slot) => {
                self.entries[slot] = Some(entry);
                EntryId(slot)
            }
            None => {
                self.entries.push(Some(entry));
                EntryId(self.entries.len() - 1)
            }
        };
        self.index.insert(key, id);
        id
    }

    /// Entry of a plain cell; `read` supplies the literal when the entry is new
    ///
    /// Returns the entry and whether it was created by this call.
    pub fn get_or_create_plain(
        &mut self,
        key: CellKey,
        read: impl FnOnce() -> CellValue,
    ) -> (EntryId, bool) {
        match self.lookup(key) {
            Some(id) => (id, false),
            None => (self.insert(CacheEntry::plain(key, read())), true),
        }
    }

    /// Entry of a formula cell, created without a value
    pub fn get_or_create_formula(&mut self, key: CellKey) -> EntryId {
        match self.lookup(key) {
            Some(id) => id,
            None => self.insert(CacheEntry::formula(key)),
        }
    }

    /// Store a formula result together with the entries it consumed
    ///
    /// The consumed set replaces the previous one and consumer edges are
    /// fixed on both old and new inputs.
    pub fn update_value(&mut self, id: EntryId, value: CellValue, consumed: IndexSet<EntryId>) {
        self.update_consumed(id, consumed);
        if let Some(entry) = self.entry_mut(id) {
            entry.value = Some(value);
        }
    }

    /// Replace the consumed set of an entry without caching a value
    pub fn update_consumed(&mut self, id: EntryId, consumed: IndexSet<EntryId>) {
        let Some(entry) = self.entry_mut(id) else {
            return;
        };
        let old = std::mem::replace(&mut entry.consumed, consumed.clone());

        for input in old.iter().filter(|input| !consumed.contains(*input)) {
            if let Some(input) = self.entry_mut(*input) {
                input.consumers.shift_remove(&id);
            }
        }
        for input in &consumed {
            if let Some(input) = self.entry_mut(*input) {
                input.consumers.insert(id);
            }
        }
    }

    /// Drop the consumed edges of an entry
    fn clear_consumed(&mut self, id: EntryId) {
        self.update_consumed(id, IndexSet::new());
    }

    /// Record a cell's new content and clear every result computed from it
    ///
    /// Updating a plain cell with an identical literal clears nothing.
    pub fn notify_update_cell(
        &mut self,
        key: CellKey,
        update: CellUpdate,
        listener: &mut dyn EvaluationListener,
    ) {
        let Some(id) = self.lookup(key) else {
            return;
        };
        let Some(entry) = self.entry_mut(id) else {
            return;
        };

        match update {
            CellUpdate::Plain(value) => {
                if entry.kind == EntryKind::Plain
                    && entry.value.as_ref().is_some_and(|old| same_value(old, &value))
                {
                    return;
                }
                entry.kind = EntryKind::Plain;
                let old = entry.value.replace(value);
                listener.on_clear_cached_value(key, old.as_ref());
                self.clear_consumed(id);
            }
            CellUpdate::Formula => {
                entry.kind = EntryKind::Formula;
                let old = entry.value.take();
                listener.on_clear_cached_value(key, old.as_ref());
                self.clear_consumed(id);
            }
        }

        self.invalidate_consumers(id, listener);
    }

    /// Clear dependents of a cell, then forget the cell's entry
    pub fn notify_delete_cell(&mut self, key: CellKey, listener: &mut dyn EvaluationListener) {
        let Some(id) = self.lookup(key) else {
            return;
        };
        if let Some(entry) = self.entry_mut(id) {
            let old = entry.value.take();
            listener.on_clear_cached_value(key, old.as_ref());
        }
        self.clear_consumed(id);
        self.invalidate_consumers(id, listener);
        self.remove(id);
    }

    fn remove(&mut self, id: EntryId) {
        let Some(entry) = self.entries.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for consumer in entry.consumers {
            if let Some(consumer) = self.entry_mut(consumer) {
                consumer.consumed.shift_remove(&id);
            }
        }
        self.index.remove(&entry.key);
        self.free.push(id.0);
    }

    /// Depth-first clear of everything reachable through consumer edges
    ///
    /// Iterative with a visited set: the graph may contain cycles and long
    /// chains.
    fn invalidate_consumers(&mut self, root: EntryId, listener: &mut dyn EvaluationListener) {
        let mut visited = AHashSet::new();
        visited.insert(root);

        let mut stack: Vec<(EntryId, usize)> = Vec::new();
        if let Some(entry) = self.entry(root) {
            stack.extend(entry.consumers().rev().map(|c| (c, 1)));
        }
        let mut cleared = 0usize;

        while let Some((id, depth)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(entry) = self.entry_mut(id) else {
                continue;
            };
            let key = entry.key;
            let old = entry.value.take();
            let consumers: Vec<EntryId> = entry.consumers().collect();
            listener.on_clear_dependent_cached_value(key, old.as_ref(), depth);
            cleared += 1;

            self.clear_consumed(id);
            stack.extend(
                consumers
                    .into_iter()
                    .rev()
                    .filter(|c| !visited.contains(c))
                    .map(|c| (c, depth + 1)),
            );
        }

        if cleared > 0 {
            debug!("cleared {} dependent cached results", cleared);
        }
    }

    /// Destroy every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.free.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::NullListener;

    fn key(row: u32) -> CellKey {
        CellKey::new(0, 0, row, 0)
    }

    #[derive(Default)]
    struct Log(Vec<String>);

    impl EvaluationListener for Log {
        fn on_clear_cached_value(&mut self, key: CellKey, _value: Option<&CellValue>) {
            self.0.push(format!("clear {}", key.row));
        }

        fn on_clear_dependent_cached_value(
            &mut self,
            key: CellKey,
            _value: Option<&CellValue>,
            depth: usize,
        ) {
            self.0.push(format!("clear{} {}", depth, key.row));
        }
    }

    fn set(ids: &[EntryId]) -> IndexSet<EntryId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_update_value_replaces_edges() {
        let mut cache = EvaluationCache::new();
        let (a, created) = cache.get_or_create_plain(key(0), || CellValue::Number(1.0));
        assert!(created);
        let (b, _) = cache.get_or_create_plain(key(1), || CellValue::Number(2.0));
        let f = cache.get_or_create_formula(key(2));

        cache.update_value(f, CellValue::Number(3.0), set(&[a, b]));
        assert_eq!(cache.entry(a).unwrap().consumers().collect::<Vec<_>>(), vec![f]);

        cache.update_value(f, CellValue::Number(2.0), set(&[b]));
        assert_eq!(cache.entry(a).unwrap().consumers().count(), 0);
        assert_eq!(cache.entry(b).unwrap().consumers().collect::<Vec<_>>(), vec![f]);
        assert_eq!(cache.value(f), Some(&CellValue::Number(2.0)));

        // A stale input no longer clears the formula
        cache.notify_update_cell(key(0), CellUpdate::Plain(CellValue::Number(9.0)), &mut NullListener);
        assert_eq!(cache.value(f), Some(&CellValue::Number(2.0)));
    }

    #[test]
    fn test_invalidation_order_and_cycles() {
        let mut cache = EvaluationCache::new();
        let (input, _) = cache.get_or_create_plain(key(0), || CellValue::Number(1.0));
        let x = cache.get_or_create_formula(key(1));
        let y = cache.get_or_create_formula(key(2));
        let z = cache.get_or_create_formula(key(3));

        // x <- input, y <- x, z <- x and y, x <- z (cycle)
        cache.update_value(y, CellValue::Number(1.0), set(&[x]));
        cache.update_value(z, CellValue::Number(1.0), set(&[x, y]));
        cache.update_value(x, CellValue::Number(1.0), set(&[input, z]));

        let mut log = Log::default();
        cache.notify_update_cell(key(0), CellUpdate::Plain(CellValue::Number(2.0)), &mut log);
        assert_eq!(log.0, vec!["clear 0", "clear1 1", "clear2 2", "clear3 3"]);
        assert!(cache.value(x).is_none());
        assert!(cache.value(y).is_none());
        assert!(cache.value(z).is_none());
        assert_eq!(cache.value(input), Some(&CellValue::Number(2.0)));
    }

    #[test]
    fn test_equal_plain_update_is_ignored() {
        let mut cache = EvaluationCache::new();
        let (input, _) = cache.get_or_create_plain(key(0), || CellValue::Number(0.0));
        let f = cache.get_or_create_formula(key(1));
        cache.update_value(f, CellValue::Number(0.0), set(&[input]));

        let mut log = Log::default();
        cache.notify_update_cell(key(0), CellUpdate::Plain(CellValue::Number(0.0)), &mut log);
        assert!(log.0.is_empty());
        assert!(cache.value(f).is_some());

        cache.notify_update_cell(key(0), CellUpdate::Plain(CellValue::Number(-0.0)), &mut log);
        assert_eq!(log.0, vec!["clear 0", "clear1 1"]);
    }

    #[test]
    fn test_delete_and_clear() {
        let mut cache = EvaluationCache::new();
        let (input, _) = cache.get_or_create_plain(key(0), || CellValue::Number(1.0));
        let f = cache.get_or_create_formula(key(1));
        cache.update_value(f, CellValue::Number(1.0), set(&[input]));

        cache.notify_delete_cell(key(0), &mut NullListener);
        assert_eq!(cache.lookup(key(0)), None);
        assert!(cache.value(f).is_none());
        assert_eq!(cache.entry(f).unwrap().consumed().count(), 0);
        assert_eq!(cache.len(), 1);

        // The freed slot is reused
        let (again, created) = cache.get_or_create_plain(key(5), || CellValue::Empty);
        assert!(created);
        assert_eq!(again, input);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.lookup(key(1)), None);
    }
}
