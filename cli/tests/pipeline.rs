//! End-to-end runs: surface syntax in, match records out.

use std::cell::RefCell;
use std::rc::Rc;

use symon::automata::{Boolean, DataParametric, Parametric};
use symon::core::{parse_decimal, Rational};
use symon::monitor::{BooleanMonitor, DataParametricMonitor, MatchRecord, ParametricMatch, ParametricMonitor};
use symon::pipeline::Collector;
use symon::poly::{LinearConstraint, LinearExpr};
use symon_cli::dot;
use symon_cli::lang;
use symon_cli::signature::Signature;
use symon_cli::words::TimedWordSource;

/// The low-level rendition of the "copy" monitor: accepts when an `x`
/// destination carrying the bound value is overdue by more than 5 time
/// units.
const COPY_DOT: &str = r#"digraph G {
    graph [
        clock_variable_size = 1
        string_variable_size = 0
        number_variable_size = 1
    ]
    0 [init=1][match=0]
    1 [init=0][match=0]
    2 [init=0][match=0]
    3 [init=0][match=1]
    0 -> 0 [label=0]
    0 -> 1 [label=0][s_constraints="{x0 == 'y'}"][n_update="{x0 := x1}"][reset="{0}"]
    1 -> 1 [label=0][s_constraints="{x0 == 'x'}"][n_constraints="{x0 != x1}"][guard="{x0 < 3}"]
    1 -> 1 [label=0][s_constraints="{x0 != 'x'}"][guard="{x0 < 3}"]
    1 -> 2 [label=0][s_constraints="{x0 == 'x'}"][n_constraints="{x0 == x1}"][guard="{x0 < 3}"]
    2 -> 2 [label=0][s_constraints="{x0 == 'x'}"][n_constraints="{x0 == x1}"][guard="{x0 <= 5}"]
    2 -> 2 [label=0][s_constraints="{x0 != 'x'}"][guard="{x0 <= 5}"]
    2 -> 1 [label=0][s_constraints="{x0 == 'x'}"][n_constraints="{x0 != x1}"][guard="{x0 < 3}"]
    2 -> 3 [label=0][guard="{x0 > 5}"]
}"#;

const COPY_SIGNATURE: &str = "update 1 1\n";

fn boolean_run(word: &str) -> Vec<MatchRecord<Boolean>> {
    let automaton = dot::parse_automaton::<Boolean>(COPY_DOT).unwrap();
    let signature = Signature::from_reader(COPY_SIGNATURE.as_bytes()).unwrap();
    let collector = Collector::new();
    let mut monitor = BooleanMonitor::new(automaton);
    monitor.set_match_observer(collector.clone());
    let monitor = Rc::new(RefCell::new(monitor));
    let mut words = TimedWordSource::<_, f64, f64>::new(word.as_bytes(), signature);
    words.events.set_observer(monitor);
    words.run().unwrap();
    let seen = collector.borrow().seen.clone();
    seen
}

#[test]
fn boolean_copy_no_violation() {
    let matches = boolean_run("update x 100 0.1\nupdate y 200 10\nupdate x 200 15\n");
    assert!(matches.is_empty());
}

#[test]
fn boolean_copy_violation() {
    let matches = boolean_run("update x 100 0.1\nupdate y 200 10\nupdate x 200 12\nupdate z 200 15.5\n");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].index, 3);
    assert_eq!(matches[0].timestamp, 15.5);
}

#[test]
fn unknown_actions_are_skipped() {
    let matches =
        boolean_run("noise 1 2 3\nupdate x 100 0.1\nupdate y 200 10\nupdate x 200 12\nupdate z 200 15.5\n");
    // The bogus line does not shift event indices of the records behind it.
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].index, 3);
}

#[test]
fn data_parametric_copy_via_high_level_syntax() {
    let spec = r#"
        variables { number n; }
        signature update(string dst, number val)

        define bind = update { dst = "y", n := val }
        bind ; update { dst = "x", val = n }
    "#;
    let parsed = lang::parse_spec::<DataParametric>(spec).unwrap();
    let collector = Collector::new();
    let mut monitor = DataParametricMonitor::new(parsed.automaton);
    monitor.set_match_observer(collector.clone());
    let monitor = Rc::new(RefCell::new(monitor));
    let mut words = TimedWordSource::<_, Rational, f64>::new(
        "update y 200 1\nupdate x 200 2\n".as_bytes(),
        parsed.signature,
    );
    words.events.set_observer(monitor);
    words.run().unwrap();

    let seen = collector.borrow().seen.clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].index, 1);
    assert_eq!(seen[0].timestamp, 2.0);
    // The bound value survives in the reported number valuation.
    assert!(seen[0].numbers.entails(&LinearConstraint::eq(
        LinearExpr::variable(1, 0),
        LinearExpr::constant(1, Rational::from_integer(200.into())),
    )));
}

#[test]
fn data_parametric_copy_requires_equal_value() {
    let spec = r#"
        variables { number n; }
        signature update(string dst, number val)
        update { dst = "y", n := val } ; update { dst = "x", val = n }
    "#;
    let parsed = lang::parse_spec::<DataParametric>(spec).unwrap();
    let collector = Collector::new();
    let mut monitor = DataParametricMonitor::new(parsed.automaton);
    monitor.set_match_observer(collector.clone());
    let monitor = Rc::new(RefCell::new(monitor));
    let mut words = TimedWordSource::<_, Rational, f64>::new(
        "update y 200 1\nupdate x 999 2\n".as_bytes(),
        parsed.signature,
    );
    words.events.set_observer(monitor);
    words.run().unwrap();
    assert!(collector.borrow().seen.is_empty());
}

#[test]
fn parametric_deadline_parameter_is_constrained() {
    let spec = r#"
        variables { parameter p; }
        signature a()
        within > p { a }
    "#;
    let parsed = lang::parse_spec::<Parametric>(spec).unwrap();
    let collector: Rc<RefCell<Collector<ParametricMatch>>> = Collector::new();
    let mut monitor = ParametricMonitor::new(parsed.automaton);
    monitor.set_match_observer(collector.clone());
    let monitor = Rc::new(RefCell::new(monitor));
    let mut words =
        TimedWordSource::<_, Rational, Rational>::new("a 5\n".as_bytes(), parsed.signature);
    words.events.set_observer(monitor.clone());
    words.run().unwrap();
    monitor.borrow_mut().finish();

    let seen = collector.borrow().seen.clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].index, 0);
    assert_eq!(seen[0].timestamp, parse_decimal("5").unwrap());
    // Dimensions are (p, clock): the run constrains the parameter below the
    // observed delay.
    assert!(seen[0].clocks.entails(&LinearConstraint::lt(
        LinearExpr::variable(2, 0),
        LinearExpr::constant(2, Rational::from_integer(5.into())),
    )));
    assert!(seen[0].clocks.entails(&LinearConstraint::ge(
        LinearExpr::variable(2, 0),
        LinearExpr::constant(2, Rational::from_integer(0.into())),
    )));
}
