//! Reference rewriting for structural edits
//!
//! A [`FormulaShifter`] describes one edit: a block of rows (or columns) moved
//! by some amount, a block copied by some amount, or a sheet moved to a new
//! position. Applied to a reference token it leaves it alone, adjusts it in
//! place, or turns it into a `#REF!` token.
//!
//! Deleting rows is a move of the rows below onto the deleted ones; inserting
//! rows is a move of the rows at and below the insertion point.

use crate::error::{FormulaError, FormulaResult};
use crate::token::{SheetRef, Token};
use duke_calc_core::{CellAddress, CellRange, MAX_COLS, MAX_ROWS};

/// Outcome of adjusting one token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftResult {
    Unchanged,
    Adjusted,
    /// The reference was overwritten or pushed off the sheet
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Row,
    Column,
}

impl Axis {
    fn last_index(self) -> i64 {
        match self {
            Axis::Row => MAX_ROWS as i64 - 1,
            Axis::Column => MAX_COLS as i64 - 1,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Axis::Row => "row",
            Axis::Column => "column",
        }
    }

    fn get(self, addr: &CellAddress) -> (i64, bool) {
        match self {
            Axis::Row => (addr.row as i64, addr.row_absolute),
            Axis::Column => (addr.col as i64, addr.col_absolute),
        }
    }

    /// Caller guarantees `0 <= index <= last_index()`
    fn set(self, addr: &mut CellAddress, index: i64) {
        match self {
            Axis::Row => addr.row = index as u32,
            Axis::Column => addr.col = index as u16,
        }
    }
}

/// New extent of a reference along the edited axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    Unchanged,
    Moved(i64, i64),
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Edit {
    Move {
        axis: Axis,
        sheet: usize,
        first: i64,
        last: i64,
        amount: i64,
    },
    Copy {
        axis: Axis,
        amount: i64,
    },
    SheetMove {
        from: usize,
        to: usize,
    },
}

/// One structural edit, ready to be applied to formula tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaShifter {
    edit: Edit,
}

fn validate(axis: Axis, first: i64, last: i64, amount: i64) -> FormulaResult<()> {
    if amount == 0 {
        return Err(FormulaError::InvalidShift(format!(
            "{} shift amount must not be zero",
            axis.name()
        )));
    }
    if first > last {
        return Err(FormulaError::InvalidShift(format!(
            "first {} {} is after last {} {}",
            axis.name(),
            first,
            axis.name(),
            last
        )));
    }
    if last > axis.last_index() {
        return Err(FormulaError::InvalidShift(format!(
            "{} {} is out of bounds",
            axis.name(),
            last
        )));
    }
    Ok(())
}

impl FormulaShifter {
    /// Move rows `first..=last` of `sheet` by `amount` (negative is upward)
    pub fn row_shift(sheet: usize, first: u32, last: u32, amount: i64) -> FormulaResult<Self> {
        Self::shift(Axis::Row, sheet, first as i64, last as i64, amount)
    }

    /// Copy rows `first..=last` by `amount`; applies to the copied formulas
    pub fn row_copy(_sheet: usize, first: u32, last: u32, amount: i64) -> FormulaResult<Self> {
        validate(Axis::Row, first as i64, last as i64, amount)?;
        Ok(Self {
            edit: Edit::Copy {
                axis: Axis::Row,
                amount,
            },
        })
    }

    /// Move columns `first..=last` of `sheet` by `amount` (negative is leftward)
    pub fn column_shift(sheet: usize, first: u16, last: u16, amount: i64) -> FormulaResult<Self> {
        Self::shift(Axis::Column, sheet, first as i64, last as i64, amount)
    }

    /// Copy columns `first..=last` by `amount`
    pub fn column_copy(_sheet: usize, first: u16, last: u16, amount: i64) -> FormulaResult<Self> {
        validate(Axis::Column, first as i64, last as i64, amount)?;
        Ok(Self {
            edit: Edit::Copy {
                axis: Axis::Column,
                amount,
            },
        })
    }

    /// Move the sheet at index `from` so it ends up at index `to`
    pub fn sheet_move(from: usize, to: usize) -> FormulaResult<Self> {
        if from == to {
            return Err(FormulaError::InvalidShift(format!(
                "sheet {} moved onto itself",
                from
            )));
        }
        Ok(Self {
            edit: Edit::SheetMove { from, to },
        })
    }

    fn shift(axis: Axis, sheet: usize, first: i64, last: i64, amount: i64) -> FormulaResult<Self> {
        validate(axis, first, last, amount)?;
        Ok(Self {
            edit: Edit::Move {
                axis,
                sheet,
                first,
                last,
                amount,
            },
        })
    }

    /// Where the sheet at `index` ends up after this edit
    pub fn sheet_index_after(&self, index: usize) -> usize {
        match self.edit {
            Edit::SheetMove { from, to } => remap_index(index, from, to),
            _ => index,
        }
    }

    /// Adjust every reference of a token sequence, true when anything changed
    pub fn adjust_formula(&self, tokens: &mut [Token], current_sheet: usize) -> bool {
        let mut changed = false;
        for token in tokens.iter_mut() {
            if self.adjust_token(token, current_sheet) != ShiftResult::Unchanged {
                changed = true;
            }
        }
        changed
    }

    /// Adjust one token of a formula held on `current_sheet`
    ///
    /// Deleted references become `RefError`/`AreaError` tokens that keep
    /// their sheet.
    pub fn adjust_token(&self, token: &mut Token, current_sheet: usize) -> ShiftResult {
        if let Edit::SheetMove { from, to } = self.edit {
            return remap_sheets(token, from, to);
        }

        let (sheet, span) = match token {
            Token::Ref { sheet, address } => {
                if !self.applies_to(sheet, current_sheet) {
                    return ShiftResult::Unchanged;
                }
                let mut range = CellRange::single(*address);
                let result = self.adjust_range(&mut range, false);
                *address = range.start;
                (sheet.clone(), (result, false))
            }
            Token::Area { sheet, range } => {
                if !self.applies_to(sheet, current_sheet) {
                    return ShiftResult::Unchanged;
                }
                (sheet.clone(), (self.adjust_range(range, true), true))
            }
            _ => return ShiftResult::Unchanged,
        };

        match span {
            (ShiftResult::Deleted, false) => *token = Token::RefError { sheet },
            (ShiftResult::Deleted, true) => *token = Token::AreaError { sheet },
            _ => {}
        }
        span.0
    }

    fn applies_to(&self, sheet: &SheetRef, current_sheet: usize) -> bool {
        match (&self.edit, sheet) {
            (Edit::Copy { .. }, SheetRef::External { .. }) => false,
            (Edit::Copy { .. }, _) => true,
            (Edit::Move { sheet: edited, .. }, SheetRef::Local) => current_sheet == *edited,
            (Edit::Move { sheet: edited, .. }, SheetRef::Sheet(index)) => index == edited,
            _ => false,
        }
    }

    fn adjust_range(&self, range: &mut CellRange, is_area: bool) -> ShiftResult {
        match self.edit {
            Edit::Move { axis, .. } => {
                let (first, _) = axis.get(&range.start);
                let (last, _) = axis.get(&range.end);
                let span = if is_area {
                    self.move_area(first, last)
                } else {
                    self.move_point(first)
                };
                match span {
                    Span::Unchanged => ShiftResult::Unchanged,
                    Span::Deleted => ShiftResult::Deleted,
                    Span::Moved(new_first, new_last) => {
                        if new_first < 0 || new_last > axis.last_index() {
                            return ShiftResult::Deleted;
                        }
                        axis.set(&mut range.start, new_first);
                        axis.set(&mut range.end, new_last);
                        ShiftResult::Adjusted
                    }
                }
            }
            Edit::Copy { axis, amount } => {
                let mut changed = false;
                for corner in [&mut range.start, &mut range.end] {
                    let (index, absolute) = axis.get(corner);
                    if absolute {
                        continue;
                    }
                    let moved = index + amount;
                    if moved < 0 || moved > axis.last_index() {
                        return ShiftResult::Deleted;
                    }
                    axis.set(corner, moved);
                    changed = true;
                }
                if !changed {
                    return ShiftResult::Unchanged;
                }
                *range = CellRange::new(range.start, range.end);
                ShiftResult::Adjusted
            }
            Edit::SheetMove { .. } => ShiftResult::Unchanged,
        }
    }

    fn moved_block(&self) -> (i64, i64, i64) {
        match self.edit {
            Edit::Move {
                first,
                last,
                amount,
                ..
            } => (first, last, amount),
            _ => (0, 0, 0),
        }
    }

    fn move_point(&self, index: i64) -> Span {
        let (first, last, amount) = self.moved_block();
        if first <= index && index <= last {
            return Span::Moved(index + amount, index + amount);
        }
        let (dest_first, dest_last) = (first + amount, last + amount);
        if dest_first <= index && index <= dest_last {
            // Overwritten by the moved block
            return Span::Deleted;
        }
        Span::Unchanged
    }

    fn move_area(&self, a_first: i64, a_last: i64) -> Span {
        let (first, last, amount) = self.moved_block();
        let (dest_first, dest_last) = (first + amount, last + amount);

        // The moved block encloses the whole area
        if first <= a_first && a_last <= last {
            return Span::Moved(a_first + amount, a_last + amount);
        }

        // The moved block lies strictly inside the area
        if a_first < first && last < a_last {
            if dest_first < a_first && a_first <= dest_last {
                return Span::Moved(dest_last + 1, a_last);
            }
            if dest_first <= a_last && a_last < dest_last {
                return Span::Moved(a_first, dest_first - 1);
            }
            return Span::Unchanged;
        }

        // The moved block holds the first index of the area but not the last
        if first <= a_first && a_first <= last {
            if amount < 0 {
                return Span::Moved(a_first + amount, a_last);
            }
            if dest_first > a_last {
                return Span::Unchanged;
            }
            let new_first = a_first + amount;
            if dest_last < a_last {
                return Span::Moved(new_first, a_last);
            }
            // The old top moved deep into the area, exposing the rows below the block
            let remaining_first = last + 1;
            let new_first = if dest_first > remaining_first {
                remaining_first
            } else {
                new_first
            };
            return Span::Moved(new_first, a_last.max(dest_last));
        }

        // The moved block holds the last index of the area but not the first
        if first <= a_last && a_last <= last {
            if amount > 0 {
                return Span::Moved(a_first, a_last + amount);
            }
            if dest_last < a_first {
                return Span::Unchanged;
            }
            let new_last = a_last + amount;
            if dest_first > a_first {
                return Span::Moved(a_first, new_last);
            }
            let remaining_last = first - 1;
            let new_last = if dest_last < remaining_last {
                remaining_last
            } else {
                new_last
            };
            return Span::Moved(a_first.min(dest_first), new_last);
        }

        // The block misses the area; only its destination can clash with it
        if dest_last < a_first || a_last < dest_first {
            return Span::Unchanged;
        }
        if dest_first <= a_first && a_last <= dest_last {
            return Span::Deleted;
        }
        if a_first <= dest_first && dest_last <= a_last {
            return Span::Unchanged;
        }
        if dest_first < a_first && a_first <= dest_last {
            return Span::Moved(dest_last + 1, a_last);
        }
        if dest_first <= a_last && a_last < dest_last {
            return Span::Moved(a_first, dest_first - 1);
        }
        Span::Unchanged
    }
}

fn remap_index(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < to && from < index && index <= to {
        index - 1
    } else if to < from && to <= index && index < from {
        index + 1
    } else {
        index
    }
}

fn remap_sheets(token: &mut Token, from: usize, to: usize) -> ShiftResult {
    let sheet = match token {
        Token::Ref { sheet, .. }
        | Token::Area { sheet, .. }
        | Token::RefError { sheet }
        | Token::AreaError { sheet } => sheet,
        _ => return ShiftResult::Unchanged,
    };
    let remapped = match sheet {
        SheetRef::Sheet(index) => SheetRef::Sheet(remap_index(*index, from, to)),
        SheetRef::SheetRange(first, last) => {
            let (a, b) = (remap_index(*first, from, to), remap_index(*last, from, to));
            SheetRef::SheetRange(a.min(b), a.max(b))
        }
        _ => return ShiftResult::Unchanged,
    };
    if *sheet == remapped {
        return ShiftResult::Unchanged;
    }
    *sheet = remapped;
    ShiftResult::Adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn area(first_row: u32, last_row: u32) -> Token {
        Token::Area {
            sheet: SheetRef::Local,
            range: CellRange::from_indices(first_row, 0, last_row, 0),
        }
    }

    fn rows_of(token: &Token) -> (u32, u32) {
        match token {
            Token::Area { range, .. } => (range.start.row, range.end.row),
            other => panic!("not an area: {:?}", other),
        }
    }

    fn confirm_area_shift(first: u32, last: u32, amount: i64, expected: Option<(u32, u32)>) {
        let shifter = FormulaShifter::row_shift(0, first, last, amount).unwrap();
        let mut token = area(10, 20);
        let result = shifter.adjust_token(&mut token, 0);
        match expected {
            None => {
                assert_eq!(result, ShiftResult::Unchanged);
                assert_eq!(rows_of(&token), (10, 20));
            }
            Some(rows) => {
                assert_eq!(result, ShiftResult::Adjusted);
                assert_eq!(rows_of(&token), rows);
            }
        }
    }

    #[test]
    fn test_area_shift_boundaries() {
        // Block fully inside the area, destination also inside
        confirm_area_shift(13, 16, 3, None);
        // Block holds the last row, destination ends above the area
        confirm_area_shift(18, 22, -15, None);
        // Block holds the last row, moved down: the area grows
        confirm_area_shift(18, 22, 3, Some((10, 23)));
        // Block encloses the area
        confirm_area_shift(5, 25, 2, Some((12, 22)));
        // Block holds the first row, moved up: the area grows upward
        confirm_area_shift(8, 12, -3, Some((7, 20)));
        // Block holds the first row, moved past the last row: ignored
        confirm_area_shift(8, 12, 20, None);
        // Block elsewhere, destination covers the top of the area
        confirm_area_shift(0, 4, 8, Some((13, 20)));
        // Block elsewhere, destination covers the bottom of the area
        confirm_area_shift(30, 34, -12, Some((10, 17)));
        // Block inside, destination sticks out below the area
        confirm_area_shift(14, 15, 6, Some((10, 19)));
        // Block entirely unrelated
        confirm_area_shift(40, 50, 5, None);
    }

    #[test]
    fn test_area_overwritten_by_destination() {
        let shifter = FormulaShifter::row_shift(0, 30, 50, -25).unwrap();
        let mut token = area(10, 20);
        assert_eq!(shifter.adjust_token(&mut token, 0), ShiftResult::Deleted);
        assert_eq!(
            token,
            Token::AreaError {
                sheet: SheetRef::Local
            }
        );
    }

    #[test]
    fn test_cell_shift() {
        let shifter = FormulaShifter::row_shift(0, 5, 9, 2).unwrap();
        let mut token = Token::Ref {
            sheet: SheetRef::Sheet(0),
            address: CellAddress::with_absolute(6, 3, true, false),
        };
        assert_eq!(shifter.adjust_token(&mut token, 1), ShiftResult::Adjusted);
        assert_eq!(
            token,
            Token::Ref {
                sheet: SheetRef::Sheet(0),
                address: CellAddress::with_absolute(8, 3, true, false),
            }
        );

        // Row 10 receives row 8
        let mut token = Token::Ref {
            sheet: SheetRef::Local,
            address: CellAddress::new(10, 0),
        };
        assert_eq!(shifter.adjust_token(&mut token, 0), ShiftResult::Deleted);
        assert_eq!(
            token,
            Token::RefError {
                sheet: SheetRef::Local
            }
        );

        // Other sheets are left alone
        let mut token = Token::Ref {
            sheet: SheetRef::Sheet(2),
            address: CellAddress::new(6, 0),
        };
        assert_eq!(shifter.adjust_token(&mut token, 0), ShiftResult::Unchanged);
    }

    #[test]
    fn test_shift_off_the_sheet() {
        let shifter = FormulaShifter::row_shift(0, 0, 3, -2).unwrap();
        let mut token = Token::Ref {
            sheet: SheetRef::Local,
            address: CellAddress::new(1, 0),
        };
        assert_eq!(shifter.adjust_token(&mut token, 0), ShiftResult::Deleted);
    }

    #[test]
    fn test_column_shift() {
        let shifter = FormulaShifter::column_shift(0, 2, 4, 3).unwrap();
        let mut token = Token::Area {
            sheet: SheetRef::Local,
            range: CellRange::from_indices(0, 0, 5, 3),
        };
        assert_eq!(shifter.adjust_token(&mut token, 0), ShiftResult::Adjusted);
        assert_eq!(
            token,
            Token::Area {
                sheet: SheetRef::Local,
                range: CellRange::from_indices(0, 0, 5, 6),
            }
        );
    }

    fn copy_area(first: CellAddress, last: CellAddress, amount: i64) -> (ShiftResult, Token) {
        let shifter = FormulaShifter::row_copy(0, 0, 0, amount).unwrap();
        let mut token = Token::Area {
            sheet: SheetRef::Local,
            range: CellRange::new(first, last),
        };
        let result = shifter.adjust_token(&mut token, 3);
        (result, token)
    }

    #[test]
    fn test_row_copy() {
        // Absolute first row, relative last row moved above it
        let (result, token) = copy_area(
            CellAddress::with_absolute(10, 0, true, false),
            CellAddress::new(20, 0),
            -15,
        );
        assert_eq!(result, ShiftResult::Adjusted);
        assert_eq!(
            token,
            Token::Area {
                sheet: SheetRef::Local,
                range: CellRange::new(
                    CellAddress::new(5, 0),
                    CellAddress::with_absolute(10, 0, true, false),
                ),
            }
        );

        let (result, token) = copy_area(
            CellAddress::new(10, 0),
            CellAddress::with_absolute(20, 0, true, false),
            20,
        );
        assert_eq!(result, ShiftResult::Adjusted);
        assert_eq!(
            token,
            Token::Area {
                sheet: SheetRef::Local,
                range: CellRange::new(
                    CellAddress::with_absolute(20, 0, true, false),
                    CellAddress::new(30, 0),
                ),
            }
        );

        let (result, _) = copy_area(CellAddress::new(10, 0), CellAddress::new(20, 0), -15);
        assert_eq!(result, ShiftResult::Deleted);

        let (result, _) = copy_area(CellAddress::absolute(10, 0), CellAddress::absolute(20, 0), -15);
        assert_eq!(result, ShiftResult::Unchanged);
    }

    #[test]
    fn test_sheet_move() {
        let shifter = FormulaShifter::sheet_move(0, 2).unwrap();
        let remapped = |index: usize| {
            let mut token = Token::Ref {
                sheet: SheetRef::Sheet(index),
                address: CellAddress::new(0, 0),
            };
            shifter.adjust_token(&mut token, 0);
            match token {
                Token::Ref {
                    sheet: SheetRef::Sheet(i),
                    ..
                } => i,
                other => panic!("unexpected {:?}", other),
            }
        };
        assert_eq!(
            (0..5).map(remapped).collect::<Vec<_>>(),
            vec![2, 0, 1, 3, 4]
        );

        let shifter = FormulaShifter::sheet_move(3, 1).unwrap();
        let mut token = Token::Area {
            sheet: SheetRef::SheetRange(1, 3),
            range: CellRange::from_indices(0, 0, 1, 1),
        };
        assert_eq!(shifter.adjust_token(&mut token, 0), ShiftResult::Adjusted);
        assert_eq!(
            token,
            Token::Area {
                sheet: SheetRef::SheetRange(1, 2),
                range: CellRange::from_indices(0, 0, 1, 1),
            }
        );

        let mut local = Token::Ref {
            sheet: SheetRef::Local,
            address: CellAddress::new(0, 0),
        };
        assert_eq!(shifter.adjust_token(&mut local, 3), ShiftResult::Unchanged);
    }

    #[test]
    fn test_invalid_edits() {
        assert!(matches!(
            FormulaShifter::row_shift(0, 5, 4, 1),
            Err(FormulaError::InvalidShift(_))
        ));
        assert!(matches!(
            FormulaShifter::row_shift(0, 1, 4, 0),
            Err(FormulaError::InvalidShift(_))
        ));
        assert!(matches!(
            FormulaShifter::column_copy(0, 0, MAX_COLS, 1),
            Err(FormulaError::InvalidShift(_))
        ));
        assert!(matches!(
            FormulaShifter::sheet_move(1, 1),
            Err(FormulaError::InvalidShift(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_shift_keeps_areas_ordered(
            a in 0u32..60,
            b in 0u32..60,
            first in 0u32..60,
            len in 0u32..10,
            amount in -40i64..40,
        ) {
            prop_assume!(amount != 0);
            let shifter = FormulaShifter::row_shift(0, first, first + len, amount).unwrap();
            let mut token = area(a.min(b), a.max(b));
            if shifter.adjust_token(&mut token, 0) != ShiftResult::Deleted {
                let (top, bottom) = rows_of(&token);
                prop_assert!(top <= bottom);
            }
        }

        #[test]
        fn prop_copy_keeps_areas_ordered(
            a in 0u32..60,
            b in 0u32..60,
            first_abs: bool,
            last_abs: bool,
            amount in -40i64..40,
        ) {
            prop_assume!(amount != 0);
            let (result, token) = copy_area(
                CellAddress::with_absolute(a, 0, first_abs, false),
                CellAddress::with_absolute(b, 0, last_abs, false),
                amount,
            );
            if result != ShiftResult::Deleted {
                let (top, bottom) = rows_of(&token);
                prop_assert!(top <= bottom);
            }
        }
    }
}
