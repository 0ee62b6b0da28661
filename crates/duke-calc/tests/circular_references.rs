//! Tests for circular reference detection

use duke_calc::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

const CIRCULAR: CellValue = CellValue::Error(CellError::CircularRef);

fn evaluator(cells: &[(&str, &str)]) -> WorkbookEvaluator {
    let mut workbook = Workbook::new();
    for (address, formula) in cells {
        workbook.set_cell_formula(0, address, formula).unwrap();
    }
    WorkbookEvaluator::new(workbook)
}

fn eval(evaluator: &mut WorkbookEvaluator, address: &str) -> CellValue {
    let key = evaluator.cell_key("Sheet1", address).unwrap();
    evaluator.evaluate(key).unwrap()
}

#[test]
fn test_self_reference() {
    let mut ev = evaluator(&[("A1", "=A1")]);
    assert_eq!(eval(&mut ev, "A1"), CIRCULAR);
    // Cached for the outermost cell; a second request is a hit
    let a1 = ev.cell_key("Sheet1", "A1").unwrap();
    assert_eq!(ev.cache().cached_value(a1), Some(&CIRCULAR));
    assert_eq!(eval(&mut ev, "A1"), CIRCULAR);
}

#[test]
fn test_four_cell_cycle() {
    let mut ev = evaluator(&[("A1", "=B1"), ("B1", "=C1"), ("C1", "=D1"), ("D1", "=A1")]);
    assert_eq!(eval(&mut ev, "A1"), CIRCULAR);

    // Cells inside the cycle are not cached, only their edges are kept
    for address in ["B1", "C1", "D1"] {
        let key = ev.cell_key("Sheet1", address).unwrap();
        assert_eq!(ev.cache().cached_value(key), None, "{}", address);
    }
    for address in ["B1", "C1", "D1"] {
        assert_eq!(eval(&mut ev, address), CIRCULAR);
    }
}

#[test]
fn test_cycle_is_recoverable_through_iferror() {
    let mut ev = evaluator(&[("A1", "=IFERROR(B1,7)"), ("B1", "=A1+1")]);
    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(7.0));
    // B1 is recomputed on its own request and sees A1's result
    assert_eq!(eval(&mut ev, "B1"), CellValue::Number(8.0));
}

#[test]
fn test_breaking_the_cycle() {
    let mut ev = evaluator(&[("A1", "=B1*2"), ("B1", "=A1+1")]);
    assert_eq!(eval(&mut ev, "A1"), CIRCULAR);

    let b1 = ev.cell_key("Sheet1", "B1").unwrap();
    ev.set_cell_value(b1, 4.0).unwrap();
    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(8.0));
}

#[test]
fn test_cycle_through_a_range() {
    let mut ev = evaluator(&[("A3", "=SUM(A1:A3)")]);
    assert_eq!(eval(&mut ev, "A3"), CIRCULAR);
}

/// Collects the cells whose formula was interpreted
struct StartLog(Rc<RefCell<Vec<String>>>);

impl EvaluationListener for StartLog {
    fn on_start_evaluate(&mut self, key: CellKey) {
        self.0.borrow_mut().push(key.address().to_a1_string());
    }
}

#[test]
fn test_cycle_reached_through_several_paths_is_walked_once() {
    let mut ev = evaluator(&[
        ("A1", "=B1+B2"),
        ("B1", "=C1+C2"),
        ("B2", "=C1+C2"),
        ("C1", "=A1"),
        ("C2", "=A1"),
    ]);
    let started = Rc::new(RefCell::new(Vec::new()));
    ev.set_listener(Box::new(StartLog(Rc::clone(&started))));

    assert_eq!(eval(&mut ev, "A1"), CIRCULAR);
    assert_eq!(*started.borrow(), vec!["A1", "B1", "C1", "C2", "B2"]);

    // Remembered for one request only; C1 then reads A1's cached result
    started.borrow_mut().clear();
    assert_eq!(eval(&mut ev, "C1"), CIRCULAR);
    assert_eq!(*started.borrow(), vec!["C1"]);
}
