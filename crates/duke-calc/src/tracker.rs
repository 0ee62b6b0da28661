//! Evaluation stack
//!
//! One frame per formula cell currently being interpreted. A frame collects
//! the entries its formula reads; when the formula finishes, they become the
//! entry's consumed set. A cell that is already on the stack is a cycle.
//!
//! Circular intermediates are not cached, but they are remembered until the
//! outermost evaluation finishes. Without that, a cycle reached through
//! several paths would be re-walked once per path.

use crate::cache::{EntryId, EvaluationCache};
use ahash::AHashSet;
use duke_calc_core::{CellError, CellValue};
use indexmap::IndexSet;

#[derive(Debug)]
struct Frame {
    entry: EntryId,
    consumed: IndexSet<EntryId>,
}

/// Stack of in-progress evaluations
#[derive(Debug, Default)]
pub struct EvaluationTracker {
    frames: Vec<Frame>,
    in_progress: AHashSet<EntryId>,
    circular: AHashSet<EntryId>,
}

impl EvaluationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame; false when the entry is already being evaluated
    pub fn start_evaluate(&mut self, entry: EntryId) -> bool {
        if !self.in_progress.insert(entry) {
            return false;
        }
        self.frames.push(Frame {
            entry,
            consumed: IndexSet::new(),
        });
        true
    }

    /// Whether `entry` already evaluated to a circular reference during the
    /// current outermost evaluation
    pub fn is_known_circular(&self, entry: EntryId) -> bool {
        self.circular.contains(&entry)
    }

    /// Record that the innermost formula read `entry`
    pub fn accept_dependency(&mut self, entry: EntryId) {
        if let Some(frame) = self.frames.last_mut() {
            frame.consumed.insert(entry);
        }
    }

    /// Store the innermost formula's result
    ///
    /// A circular-reference result below the outermost frame is an
    /// intermediate: only its edges are kept, so the cell is recomputed the
    /// next time it is asked for on its own.
    pub fn update_cache_result(&mut self, cache: &mut EvaluationCache, value: &CellValue) {
        let Some(frame) = self.frames.last() else {
            return;
        };
        let consumed = frame.consumed.clone();
        if *value == CellValue::Error(CellError::CircularRef) && self.frames.len() > 1 {
            cache.update_consumed(frame.entry, consumed);
            self.circular.insert(frame.entry);
        } else {
            cache.update_value(frame.entry, value.clone(), consumed);
        }
    }

    /// Pop the frame of `entry`
    pub fn end_evaluate(&mut self, entry: EntryId) {
        if let Some(position) = self.frames.iter().rposition(|f| f.entry == entry) {
            self.frames.truncate(position);
        }
        self.in_progress.remove(&entry);
        if self.frames.is_empty() {
            self.circular.clear();
        }
    }

    /// Number of formulas currently being evaluated
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
