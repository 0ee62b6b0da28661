//! Tests for cached evaluation and dependency-driven invalidation

use duke_calc::prelude::*;
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

/// Listener that writes every event to a shared log
#[derive(Clone, Default)]
struct RecordingListener {
    log: Rc<RefCell<Vec<String>>>,
}

impl RecordingListener {
    fn push(&self, event: String) {
        self.log.borrow_mut().push(event);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }
}

fn a1(key: CellKey) -> String {
    key.address().to_a1_string()
}

impl EvaluationListener for RecordingListener {
    fn on_cache_hit(&mut self, key: CellKey, _value: &CellValue) {
        self.push(format!("hit {}", a1(key)));
    }

    fn on_read_plain_value(&mut self, key: CellKey, _value: &CellValue) {
        self.push(format!("value {}", a1(key)));
    }

    fn on_start_evaluate(&mut self, key: CellKey) {
        self.push(format!("start {}", a1(key)));
    }

    fn on_end_evaluate(&mut self, key: CellKey, value: &CellValue) {
        self.push(format!("end {} {}", a1(key), value));
    }

    fn on_clear_whole_cache(&mut self) {
        self.push("clearAll".to_string());
    }

    fn on_clear_cached_value(&mut self, key: CellKey, _value: Option<&CellValue>) {
        self.push(format!("clear {}", a1(key)));
    }

    fn on_clear_dependent_cached_value(
        &mut self,
        key: CellKey,
        _value: Option<&CellValue>,
        depth: usize,
    ) {
        self.push(format!("clear{} {}", depth, a1(key)));
    }
}

fn setup(cells: &[(&str, &str)]) -> (WorkbookEvaluator, RecordingListener) {
    let mut workbook = Workbook::new();
    for (address, content) in cells {
        if content.starts_with('=') {
            workbook.set_cell_formula(0, address, content).unwrap();
        } else {
            let value = match content.parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::string(content),
            };
            workbook.set_cell_value(0, address, value).unwrap();
        }
    }
    let listener = RecordingListener::default();
    let mut evaluator = WorkbookEvaluator::new(workbook);
    evaluator.set_listener(Box::new(listener.clone()));
    (evaluator, listener)
}

fn key(evaluator: &WorkbookEvaluator, address: &str) -> CellKey {
    evaluator.cell_key("Sheet1", address).unwrap()
}

fn eval(evaluator: &mut WorkbookEvaluator, address: &str) -> CellValue {
    let key = key(evaluator, address);
    evaluator.evaluate(key).unwrap()
}

fn cached(evaluator: &WorkbookEvaluator, address: &str) -> Option<CellValue> {
    evaluator.cache().cached_value(key(evaluator, address)).cloned()
}

/// The grid used by the invalidation tests
fn grid() -> (WorkbookEvaluator, RecordingListener) {
    setup(&[
        ("D1", "12"),
        ("E1", "13"),
        ("D2", "14"),
        ("E2", "15"),
        ("D3", "16"),
        ("E3", "17"),
        ("C1", "=SUM(D1:E2)"),
        ("C2", "=SUM(D2:E3)"),
        ("B1", "=C2-C1"),
        ("B3", "2"),
        ("B2", "=B3*C1-C2"),
        ("A1", "=MAX(B1:B2)"),
    ])
}

#[test]
fn test_update_clears_exactly_the_dependents() {
    let (mut ev, log) = grid();

    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(46.0));
    assert_eq!(cached(&ev, "C1"), Some(CellValue::Number(54.0)));
    assert_eq!(cached(&ev, "C2"), Some(CellValue::Number(62.0)));
    assert_eq!(cached(&ev, "B1"), Some(CellValue::Number(8.0)));
    assert_eq!(cached(&ev, "B2"), Some(CellValue::Number(46.0)));
    log.take();

    let d1 = key(&ev, "D1");
    ev.set_cell_value(d1, 10.0).unwrap();
    assert_eq!(
        log.take(),
        vec!["clear D1", "clear1 C1", "clear2 B1", "clear3 A1", "clear2 B2"]
    );

    // C2 did not read D1 and keeps its result
    assert_eq!(cached(&ev, "C2"), Some(CellValue::Number(62.0)));
    assert_eq!(cached(&ev, "A1"), None);

    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(42.0));
}

#[test]
fn test_evaluation_events() {
    let (mut ev, log) = setup(&[("A1", "=B1*2"), ("B1", "3")]);

    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(6.0));
    assert_eq!(log.take(), vec!["start A1", "value B1", "end A1 6"]);

    // A second request is served from the cache without reading any cell
    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(6.0));
    assert_eq!(log.take(), vec!["hit A1"]);
}

#[test]
fn test_equal_update_keeps_results() {
    let (mut ev, log) = setup(&[("A1", "=B1+1"), ("B1", "1")]);
    eval(&mut ev, "A1");
    log.take();

    let b1 = key(&ev, "B1");
    ev.set_cell_value(b1, 1.0).unwrap();
    assert!(log.take().is_empty());
    assert_eq!(cached(&ev, "A1"), Some(CellValue::Number(2.0)));
}

#[test]
fn test_stale_dependencies_are_pruned() {
    let (mut ev, log) = setup(&[
        ("A1", "=IF(B1,C1,D1)"),
        ("B1", "TRUE"),
        ("C1", "1"),
        ("D1", "2"),
    ]);
    let b1 = key(&ev, "B1");
    ev.set_cell_value(b1, true).unwrap();
    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(1.0));

    ev.set_cell_value(b1, false).unwrap();
    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(2.0));
    log.take();

    // A1 no longer reads C1
    let c1 = key(&ev, "C1");
    ev.set_cell_value(c1, 5.0).unwrap();
    assert_eq!(log.take(), vec!["clear C1"]);
    assert_eq!(cached(&ev, "A1"), Some(CellValue::Number(2.0)));

    let d1 = key(&ev, "D1");
    ev.set_cell_value(d1, 7.0).unwrap();
    assert_eq!(log.take(), vec!["clear D1", "clear1 A1"]);
    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(7.0));
}

#[test]
fn test_blank_cell_that_gets_a_value() {
    let (mut ev, log) = setup(&[("A1", "=SUM(B1:B3)"), ("B1", "1")]);
    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(1.0));
    log.take();

    let b3 = key(&ev, "B3");
    ev.set_cell_value(b3, 4.0).unwrap();
    assert_eq!(log.take(), vec!["clear B3", "clear1 A1"]);
    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(5.0));
}

#[test]
fn test_formula_replaced_by_value() {
    let (mut ev, log) = setup(&[("A1", "=B1+1"), ("B1", "=C1*10"), ("C1", "1")]);
    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(11.0));
    log.take();

    let b1 = key(&ev, "B1");
    ev.set_cell_value(b1, 5.0).unwrap();
    assert_eq!(log.take(), vec!["clear B1", "clear1 A1"]);
    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(6.0));
    log.take();

    // B1 no longer reads C1
    let c1 = key(&ev, "C1");
    ev.set_cell_value(c1, 2.0).unwrap();
    assert_eq!(log.take(), vec!["clear C1"]);
}

#[test]
fn test_delete_cell() {
    let (mut ev, log) = setup(&[("A1", "=B1&\"x\""), ("B1", "a")]);
    assert_eq!(eval(&mut ev, "A1"), CellValue::string("ax"));
    log.take();

    let b1 = key(&ev, "B1");
    ev.clear_cell(b1).unwrap();
    assert_eq!(log.take(), vec!["clear B1", "clear1 A1"]);
    assert_eq!(ev.cache().lookup(b1), None);
    assert_eq!(eval(&mut ev, "A1"), CellValue::string("x"));
}

#[test]
fn test_clear_all_cached_results() {
    let (mut ev, log) = grid();
    eval(&mut ev, "A1");
    assert!(!ev.cache().is_empty());
    log.take();

    ev.clear_all_cached_result_values();
    assert!(ev.cache().is_empty());
    assert_eq!(log.take(), vec!["clearAll"]);
    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(46.0));
}

#[test]
fn test_negative_zero() {
    let (mut ev, log) = setup(&[("A1", "=1/B1"), ("B1", "0"), ("C1", "=-B1")]);
    assert_eq!(eval(&mut ev, "A1"), CellValue::Error(CellError::Div0));
    // Negating zero gives positive zero
    match eval(&mut ev, "C1") {
        CellValue::Number(n) => assert!(n == 0.0 && n.is_sign_positive()),
        other => panic!("unexpected {:?}", other),
    }
    log.take();

    // -0 is a different literal from 0, so dependents are cleared
    let b1 = key(&ev, "B1");
    ev.set_cell_value(b1, -0.0).unwrap();
    assert_eq!(log.take(), vec!["clear B1", "clear1 A1", "clear1 C1"]);
    assert_eq!(eval(&mut ev, "A1"), CellValue::Error(CellError::Div0));

    // but still equal to zero in comparisons
    let d1 = key(&ev, "D1");
    ev.set_cell_formula(d1, "=B1=0").unwrap();
    assert_eq!(eval(&mut ev, "D1"), CellValue::Boolean(true));
}

#[test]
fn test_defined_names_record_dependencies() {
    let mut workbook = Workbook::new();
    workbook.set_cell_value(0, "B1", 2.0).unwrap();
    workbook.set_cell_value(0, "B2", 3.0).unwrap();
    workbook.define_name("Inputs", "=Sheet1!$B$1:$B$2").unwrap();
    workbook.set_cell_formula(0, "A1", "=SUM(Inputs)").unwrap();
    workbook.set_cell_formula(0, "A2", "=Missing+1").unwrap();
    let mut ev = WorkbookEvaluator::new(workbook);

    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(5.0));
    assert_eq!(eval(&mut ev, "A2"), CellValue::Error(CellError::Name));

    let b2 = key(&ev, "B2");
    ev.set_cell_value(b2, 10.0).unwrap();
    assert_eq!(cached(&ev, "A1"), None);
    assert_eq!(eval(&mut ev, "A1"), CellValue::Number(12.0));
}
