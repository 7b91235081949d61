//! The concrete-time monitor loop, shared by the Boolean and
//! data-parametric modes.

use std::collections::HashSet;

use crate::automata::{Automaton, Boolean, DataParametric, Mode, StateId};
use crate::constraints::{eval_clock_guard, ClockGuard, ClockVector};
use crate::monitor::{DataMode, Event};
use crate::pipeline::{Observer, ObserverRef, SingleSubject};

/// A reported match: the event index and timestamp at which an accepting
/// configuration was reached, with its data valuations.
#[derive(Clone, Debug)]
pub struct MatchRecord<M: DataMode> {
    pub index: usize,
    pub timestamp: f64,
    pub numbers: M::Numbers,
    pub strings: M::Strings,
}

#[derive(Clone, Debug)]
struct Configuration<M: DataMode> {
    state: StateId,
    clocks: ClockVector,
    strings: M::Strings,
    numbers: M::Numbers,
}

impl<M: DataMode> PartialEq for Configuration<M> {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
            && self.clocks == other.clocks
            && self.strings == other.strings
            && self.numbers == other.numbers
    }
}

impl<M: DataMode> Eq for Configuration<M> {}

impl<M: DataMode> std::hash::Hash for Configuration<M> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.state.hash(state);
        self.clocks.hash(state);
        self.strings.hash(state);
        self.numbers.hash(state);
    }
}

/// Monitors a timed data word against an automaton with concrete clocks.
///
/// Push events in with [`Observer::notify`]; matches are forwarded to the
/// observer registered with [`ConcreteMonitor::set_match_observer`].
pub struct ConcreteMonitor<M>
where
    M: DataMode + Mode<Guard = ClockGuard>,
{
    automaton: Automaton<M>,
    configurations: HashSet<Configuration<M>>,
    abs_time: f64,
    index: usize,
    matches: SingleSubject<MatchRecord<M>>,
}

/// Monitor over concrete optional values.
pub type BooleanMonitor = ConcreteMonitor<Boolean>;

/// Monitor over symbolic strings and polyhedral number valuations.
pub type DataParametricMonitor = ConcreteMonitor<DataParametric>;

impl<M> ConcreteMonitor<M>
where
    M: DataMode + Mode<Guard = ClockGuard>,
{
    pub fn new(automaton: Automaton<M>) -> Self {
        let mut configurations = HashSet::with_capacity(automaton.initial.len());
        for &state in &automaton.initial {
            configurations.insert(Configuration {
                state,
                clocks: ClockVector::zeroed(automaton.clock_count),
                strings: M::initial_strings(automaton.string_count),
                numbers: M::initial_numbers(automaton.number_count),
            });
        }
        ConcreteMonitor {
            automaton,
            configurations,
            abs_time: 0.0,
            index: 0,
            matches: SingleSubject::new(),
        }
    }

    pub fn set_match_observer(&mut self, observer: ObserverRef<MatchRecord<M>>) {
        self.matches.set_observer(observer);
    }

    /// Number of live configurations, for diagnostics.
    pub fn configuration_count(&self) -> usize {
        self.configurations.len()
    }
}

impl<M> Observer<Event<M::EventNumber, f64>> for ConcreteMonitor<M>
where
    M: DataMode + Mode<Guard = ClockGuard>,
{
    fn notify(&mut self, event: &Event<M::EventNumber, f64>) {
        let delta = event.timestamp - self.abs_time;
        let mut successors: HashSet<Configuration<M>> = HashSet::new();
        for conf in &self.configurations {
            let Some(transitions) = self.automaton.states[conf.state].next.get(&event.action) else {
                continue;
            };
            let mut clocks = conf.clocks.clone();
            clocks.elapse(delta);
            let mut strings = conf.strings.clone();
            let mut numbers = conf.numbers.clone();
            M::append_payload(&mut strings, &mut numbers, &event.strings, &event.numbers);
            for transition in transitions {
                if !eval_clock_guard(&transition.guard, &clocks) {
                    continue;
                }
                let mut next_strings = strings.clone();
                let mut next_numbers = numbers.clone();
                match M::eval_constraints(
                    &transition.string_constraints,
                    &mut next_strings,
                    &transition.number_constraints,
                    &mut next_numbers,
                ) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        tracing::warn!(index = self.index, "transition dropped: {e}");
                        continue;
                    }
                }
                let mut next_clocks = clocks.clone();
                for &reset in &transition.resets {
                    next_clocks.reset(reset);
                }
                M::apply_update(&transition.update, &mut next_strings, &mut next_numbers);
                M::truncate(
                    &mut next_strings,
                    self.automaton.string_count,
                    &mut next_numbers,
                    self.automaton.number_count,
                );
                if self.automaton.states[transition.target].accepting {
                    self.matches.notify(&MatchRecord {
                        index: self.index,
                        timestamp: event.timestamp,
                        numbers: next_numbers.clone(),
                        strings: next_strings.clone(),
                    });
                }
                successors.insert(Configuration {
                    state: transition.target,
                    clocks: next_clocks,
                    strings: next_strings,
                    numbers: next_numbers,
                });
            }
        }
        self.abs_time = event.timestamp;
        self.index += 1;
        self.configurations = successors;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Rational;
    use crate::monitor::fixtures;
    use crate::pipeline::Collector;
    use crate::poly::{LinearConstraint, LinearExpr, Polyhedron};

    fn run_boolean(events: Vec<Event<f64, f64>>) -> Vec<MatchRecord<Boolean>> {
        let collector = Collector::new();
        let mut monitor = BooleanMonitor::new(fixtures::copy_automaton());
        monitor.set_match_observer(collector.clone());
        for event in &events {
            monitor.notify(event);
        }
        let seen = collector.borrow().seen.clone();
        seen
    }

    fn update_event(string: &str, number: f64, timestamp: f64) -> Event<f64, f64> {
        Event {
            action: crate::core::Action(0),
            strings: vec![string.to_string()],
            numbers: vec![number],
            timestamp,
        }
    }

    #[test]
    fn copy_holds_when_value_is_refreshed() {
        let matches = run_boolean(vec![
            update_event("x", 100.0, 0.1),
            update_event("y", 200.0, 10.0),
            update_event("x", 200.0, 15.0),
        ]);
        assert!(matches.is_empty());
    }

    #[test]
    fn copy_violation_is_reported_once() {
        let matches = run_boolean(vec![
            update_event("x", 100.0, 0.1),
            update_event("y", 200.0, 10.0),
            update_event("x", 200.0, 12.0),
            update_event("z", 200.0, 15.5),
        ]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].index, 3);
        assert_eq!(matches[0].timestamp, 15.5);
    }

    #[test]
    fn non_integer_guard_bounds() {
        let collector = Collector::new();
        let mut monitor = BooleanMonitor::new(fixtures::non_integer_guard_automaton());
        monitor.set_match_observer(collector.clone());
        for (i, t) in [0.0, 1.0, 2.1, 3.3, 4.45].into_iter().enumerate() {
            monitor.notify(&Event {
                action: crate::core::Action(0),
                strings: vec![],
                numbers: vec![i as f64],
                timestamp: t,
            });
        }
        let indices: Vec<usize> = collector.borrow().seen.iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![2, 4]);
        let stamps: Vec<f64> = collector.borrow().seen.iter().map(|m| m.timestamp).collect();
        assert_eq!(stamps, vec![2.1, 4.45]);
    }

    fn symbolic_update_event(string: &str, number: i64, timestamp: f64) -> Event<Rational, f64> {
        Event {
            action: crate::core::Action(0),
            strings: vec![string.to_string()],
            numbers: vec![Rational::from_integer(number.into())],
            timestamp,
        }
    }

    #[test]
    fn data_parametric_copy_violation() {
        let collector = Collector::new();
        let mut monitor = DataParametricMonitor::new(fixtures::data_parametric_copy_automaton());
        monitor.set_match_observer(collector.clone());
        for event in [
            symbolic_update_event("x", 100, 0.1),
            symbolic_update_event("y", 200, 10.0),
            symbolic_update_event("x", 200, 12.0),
            symbolic_update_event("z", 200, 15.5),
        ] {
            monitor.notify(&event);
        }
        let seen = collector.borrow().seen.clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].index, 3);
        assert_eq!(seen[0].timestamp, 15.5);
        // The bound value of the earlier "y" event survives in the match.
        let mut expected = Polyhedron::universe(1);
        expected.add_constraint(LinearConstraint::eq(
            LinearExpr::variable(1, 0),
            LinearExpr::constant(1, Rational::from_integer(200.into())),
        ));
        assert_eq!(seen[0].numbers, expected);
    }

    #[test]
    fn disjunction_matches_when_either_branch_does() {
        use crate::automata::{ops, Automaton, Transition};
        use crate::constraints::{StringAtom, StringConstraint, StringOp};

        let accepts = |literal: &str| {
            let mut a: Automaton<Boolean> = Automaton::new(0, 0, 0, 0);
            let s0 = a.add_state(false);
            let s1 = a.add_state(true);
            a.initial.push(s0);
            let mut t: Transition<Boolean> = Transition::unconstrained(s1, 0, 0);
            t.string_constraints = vec![StringConstraint::new(
                StringAtom::Var(0),
                StringOp::Eq,
                StringAtom::Literal(literal.to_string()),
            )];
            a.add_transition(s0, crate::core::Action(0), t);
            a
        };
        let run = |automaton, payload: &str| {
            let collector = Collector::new();
            let mut monitor = BooleanMonitor::new(automaton);
            monitor.set_match_observer(collector.clone());
            monitor.notify(&Event {
                action: crate::core::Action(0),
                strings: vec![payload.to_string()],
                numbers: vec![],
                timestamp: 1.0,
            });
            let count = collector.borrow().seen.len();
            count
        };

        for payload in ["a", "b", "c"] {
            let separate = run(accepts("a"), payload) + run(accepts("b"), payload);
            let either = run(ops::disjunction(accepts("a"), accepts("b")), payload);
            assert_eq!(either, separate, "payload {payload}");
        }
    }

    #[test]
    fn data_parametric_copy_no_false_positive() {
        let collector = Collector::new();
        let mut monitor = DataParametricMonitor::new(fixtures::data_parametric_copy_automaton());
        monitor.set_match_observer(collector.clone());
        for event in [
            symbolic_update_event("x", 100, 0.1),
            symbolic_update_event("y", 200, 10.0),
            symbolic_update_event("x", 200, 15.0),
        ] {
            monitor.notify(&event);
        }
        assert!(collector.borrow().seen.is_empty());
    }
}
