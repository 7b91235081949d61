//! The fully parametric monitor: polyhedral clock valuations over
//! (parameters, clocks), closure under unobservable transitions between
//! events, and configuration merging.
//!
//! Clock valuations use the dimension layout `0..P` for parameters and
//! `P..P+C` for clocks. During the unobservable closure one extra dimension
//! tracks the time elapsed since the last observed event; it is bounded by
//! the frame's duration and projected away again when a successor rejoins
//! the live configuration set.
//!
//! The automaton must not contain cycles of unobservable transitions; the
//! closure refuses to iterate past the state count.

use std::collections::{HashMap, HashSet};

use crate::automata::{Automaton, Parametric, StateId};
use crate::constraints::{string, SymbolicStrings, TimingGuard};
use crate::core::{Action, Rational};
use crate::monitor::{DataMode, Event};
use crate::pipeline::{Observer, ObserverRef, SingleSubject};
use crate::poly::{LinearConstraint, LinearExpr, Polyhedron, Powerset};

/// A match of the parametric monitor. Unobservable transitions may fire
/// after the last observed event, in which case the reported timestamp is
/// that of the latest event.
#[derive(Clone, Debug)]
pub struct ParametricMatch {
    pub index: usize,
    pub timestamp: Rational,
    pub numbers: Polyhedron,
    pub strings: SymbolicStrings,
    pub clocks: Polyhedron,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct Configuration {
    state: StateId,
    clocks: Polyhedron,
    strings: SymbolicStrings,
    numbers: Polyhedron,
}

pub struct ParametricMonitor {
    automaton: Automaton<Parametric>,
    configurations: HashSet<Configuration>,
    abs_time: Rational,
    index: usize,
    /// Per-dimension rates for time elapse: 0 for parameters, 1 for clocks
    /// and for the elapsed-time dimension of the closure.
    elapse_rates: Vec<Rational>,
    matches: SingleSubject<ParametricMatch>,
    finished: bool,
}

impl ParametricMonitor {
    pub fn new(automaton: Automaton<Parametric>) -> Self {
        let params = automaton.param_count;
        let clocks = automaton.clock_count;
        let dim = params + clocks;
        let mut initial_clocks = Polyhedron::universe(dim);
        let zero = LinearExpr::zero(dim);
        initial_clocks.add_constraints(
            (0..params)
                .map(|i| LinearConstraint::ge(LinearExpr::variable(dim, i), zero.clone()))
                .chain(
                    (params..dim)
                        .map(|i| LinearConstraint::eq(LinearExpr::variable(dim, i), zero.clone())),
                ),
        );
        let mut configurations = HashSet::with_capacity(automaton.initial.len());
        for &state in &automaton.initial {
            configurations.insert(Configuration {
                state,
                clocks: initial_clocks.clone(),
                strings: <Parametric as DataMode>::initial_strings(automaton.string_count),
                numbers: <Parametric as DataMode>::initial_numbers(automaton.number_count),
            });
        }
        let one = Rational::from_integer(1.into());
        let mut elapse_rates = vec![Rational::from_integer(0.into()); params];
        elapse_rates.extend(std::iter::repeat(one).take(clocks + 1));
        ParametricMonitor {
            automaton,
            configurations,
            abs_time: Rational::from_integer(0.into()),
            index: 0,
            elapse_rates,
            matches: SingleSubject::new(),
            finished: false,
        }
    }

    pub fn set_match_observer(&mut self, observer: ObserverRef<ParametricMatch>) {
        self.matches.set_observer(observer);
    }

    /// Number of live configurations, for diagnostics.
    pub fn configuration_count(&self) -> usize {
        self.configurations.len()
    }

    /// Fires the unobservable transitions reachable after the last observed
    /// event, with no bound on the elapsed time. Runs automatically when the
    /// monitor is dropped; call it explicitly while the match observer is
    /// still attached.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let frontier = self.seeded_frontier();
        self.run_closure(frontier, None);
    }

    /// The current configurations, each extended with the elapsed-time
    /// dimension initialized to zero.
    fn seeded_frontier(&self) -> HashSet<Configuration> {
        self.configurations
            .iter()
            .cloned()
            .map(|mut conf| {
                conf.clocks.add_dims_project(1);
                conf
            })
            .collect()
    }

    /// Iterates the unobservable transitions to a fixed point. With a
    /// `budget`, the elapsed time is bounded by it and every successor also
    /// rejoins the live set with the frame's residual time applied.
    fn run_closure(&mut self, mut frontier: HashSet<Configuration>, budget: Option<&Rational>) {
        let params = self.automaton.param_count;
        let clocks = self.automaton.clock_count;
        let dim = params + clocks + 1;
        let mut rounds = 0usize;
        while !frontier.is_empty() {
            rounds += 1;
            if rounds > self.automaton.state_count() {
                tracing::error!(
                    "unobservable closure did not stabilize after {rounds} rounds; \
                     the automaton appears to contain a cycle of unobservable transitions"
                );
                return;
            }
            let mut next_frontier = HashSet::new();
            for conf in &frontier {
                let Some(transitions) = self.automaton.states[conf.state].next.get(&Action::UNOBSERVABLE)
                else {
                    continue;
                };
                let mut elapsed = conf.clocks.clone();
                elapsed.time_elapse_assign(&self.elapse_rates);
                if let Some(delta) = budget {
                    elapsed.add_constraint(LinearConstraint::le(
                        LinearExpr::variable(dim, dim - 1),
                        LinearExpr::constant(dim, delta.clone()),
                    ));
                }
                for transition in transitions {
                    let mut guard = transition.guard.clone();
                    guard.adjust_clock_dimension(params, clocks);
                    guard.add_dims_embed(1);
                    let mut next_clocks = elapsed.clone();
                    next_clocks.intersection_assign(&guard);
                    if next_clocks.is_empty() {
                        continue;
                    }
                    let mut next_strings = conf.strings.clone();
                    let mut next_numbers = conf.numbers.clone();
                    match <Parametric as DataMode>::eval_constraints(
                        &transition.string_constraints,
                        &mut next_strings,
                        &transition.number_constraints,
                        &mut next_numbers,
                    ) {
                        Ok(true) => {}
                        Ok(false) => continue,
                        Err(e) => {
                            tracing::warn!(index = self.index, "unobservable transition dropped: {e}");
                            continue;
                        }
                    }
                    for &reset in &transition.resets {
                        next_clocks.affine_image(params + reset, &LinearExpr::zero(dim));
                    }
                    <Parametric as DataMode>::apply_update(
                        &transition.update,
                        &mut next_strings,
                        &mut next_numbers,
                    );
                    if self.automaton.states[transition.target].accepting {
                        let mut trimmed = next_clocks.clone();
                        trimmed.remove_higher_dims(params + clocks);
                        self.matches.notify(&ParametricMatch {
                            index: self.index,
                            timestamp: self.abs_time.clone(),
                            numbers: next_numbers.clone(),
                            strings: next_strings.clone(),
                            clocks: trimmed,
                        });
                    }
                    if let Some(delta) = budget {
                        // The successor consumes the rest of the frame and
                        // rejoins the live set without the elapsed-time
                        // dimension.
                        let mut residual = next_clocks.clone();
                        for i in 0..clocks {
                            let expr = LinearExpr::variable(dim, params + i)
                                + LinearExpr::constant(dim, delta.clone())
                                - LinearExpr::variable(dim, dim - 1);
                            residual.affine_image(params + i, &expr);
                        }
                        residual.remove_higher_dims(params + clocks);
                        self.configurations.insert(Configuration {
                            state: transition.target,
                            clocks: residual,
                            strings: next_strings.clone(),
                            numbers: next_numbers.clone(),
                        });
                    }
                    next_frontier.insert(Configuration {
                        state: transition.target,
                        clocks: next_clocks,
                        strings: next_strings,
                        numbers: next_numbers,
                    });
                }
            }
            frontier = next_frontier;
        }
    }
}

impl Observer<Event<Rational, Rational>> for ParametricMonitor {
    fn notify(&mut self, event: &Event<Rational, Rational>) {
        let params = self.automaton.param_count;
        let clocks = self.automaton.clock_count;
        let dim = params + clocks;
        let delta = event.timestamp.clone() - self.abs_time.clone();

        let frontier = self.seeded_frontier();
        // Time passes uniformly for the live set; the frontier keeps the
        // pre-elapse valuations and spends the frame through the closure.
        let mut elapsed = HashSet::with_capacity(self.configurations.len());
        for mut conf in self.configurations.drain() {
            for i in 0..clocks {
                let expr =
                    LinearExpr::variable(dim, params + i) + LinearExpr::constant(dim, delta.clone());
                conf.clocks.affine_image(params + i, &expr);
            }
            elapsed.insert(conf);
        }
        self.configurations = elapsed;
        self.run_closure(frontier, Some(&delta));

        let mut merged: HashMap<(StateId, Polyhedron, SymbolicStrings), Powerset> = HashMap::new();
        for conf in &self.configurations {
            let Some(transitions) = self.automaton.states[conf.state].next.get(&event.action) else {
                continue;
            };
            let mut strings = conf.strings.clone();
            let mut numbers = conf.numbers.clone();
            <Parametric as DataMode>::append_payload(&mut strings, &mut numbers, &event.strings, &event.numbers);
            for transition in transitions {
                let mut guard = transition.guard.clone();
                guard.adjust_clock_dimension(params, clocks);
                let mut next_clocks = conf.clocks.clone();
                next_clocks.intersection_assign(&guard);
                if next_clocks.is_empty() {
                    continue;
                }
                let mut next_strings = strings.clone();
                let mut next_numbers = numbers.clone();
                match <Parametric as DataMode>::eval_constraints(
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
                for &reset in &transition.resets {
                    next_clocks.affine_image(params + reset, &LinearExpr::zero(dim));
                }
                <Parametric as DataMode>::apply_update(&transition.update, &mut next_strings, &mut next_numbers);
                <Parametric as DataMode>::truncate(
                    &mut next_strings,
                    self.automaton.string_count,
                    &mut next_numbers,
                    self.automaton.number_count,
                );
                if self.automaton.states[transition.target].accepting {
                    self.matches.notify(&ParametricMatch {
                        index: self.index,
                        timestamp: event.timestamp.clone(),
                        numbers: next_numbers.clone(),
                        strings: next_strings.clone(),
                        clocks: next_clocks.clone(),
                    });
                }
                match merged.entry((transition.target, next_clocks, next_strings)) {
                    std::collections::hash_map::Entry::Occupied(mut e) => {
                        e.get_mut().add_disjunct(next_numbers);
                    }
                    std::collections::hash_map::Entry::Vacant(v) => {
                        v.insert(Powerset::singleton(next_numbers));
                    }
                }
            }
        }
        self.abs_time = event.timestamp.clone();
        self.index += 1;

        // Successors reaching the same state, clock valuation and string
        // valuation pool their number polyhedra; then, per number valuation,
        // the string valuations are merged pairwise where possible.
        let mut by_numbers: HashMap<(StateId, Polyhedron, Polyhedron), Vec<SymbolicStrings>> = HashMap::new();
        for ((state, clock_val, string_val), mut numbers) in merged {
            numbers.pairwise_reduce();
            for disjunct in numbers {
                by_numbers
                    .entry((state, clock_val.clone(), disjunct))
                    .or_default()
                    .push(string_val.clone());
            }
        }
        self.configurations.clear();
        for ((state, clock_val, number_val), mut string_vals) in by_numbers {
            string::pairwise_reduce(&mut string_vals);
            for strings in string_vals {
                self.configurations.insert(Configuration {
                    state,
                    clocks: clock_val.clone(),
                    strings,
                    numbers: number_val.clone(),
                });
            }
        }
    }
}

impl Drop for ParametricMonitor {
    fn drop(&mut self) {
        self.finish();
    }
}
