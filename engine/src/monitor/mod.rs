//! Configuration-set monitors.
//!
//! A configuration is the automaton state together with the clock, string
//! and number valuations of one execution branch; the monitor maintains the
//! set of configurations (a disjunction over branches), advances it on every
//! event and reports each accepting successor as a match.

mod concrete;
mod parametric;

#[cfg(test)]
pub(crate) mod fixtures;

pub use concrete::{BooleanMonitor, ConcreteMonitor, DataParametricMonitor, MatchRecord};
pub use parametric::{ParametricMatch, ParametricMonitor};

use std::fmt::Debug;
use std::hash::Hash;

use crate::automata::Mode;
use crate::constraints::{
    number, string, ConcreteNumbers, ConcreteStrings, EvalError, StringConstraint, StringEntry,
    SymbolicStrings,
};
use crate::core::{Action, Rational};
use crate::poly::{LinearConstraint, LinearExpr, Polyhedron};

/// One event of a timed data word, generic over the payload-number and
/// timestamp representations.
#[derive(Clone, Debug, PartialEq)]
pub struct Event<N, T> {
    pub action: Action,
    pub strings: Vec<String>,
    pub numbers: Vec<N>,
    pub timestamp: T,
}

/// The data-domain operations that vary across the monitoring modes: how
/// valuations start out, how event payloads are appended, and how a
/// transition's constraints and update act on them.
pub trait DataMode: Mode {
    type EventNumber: Clone + Debug;
    type Strings: Clone + Eq + Hash + Debug;
    type Numbers: Clone + Eq + Hash + Debug;

    fn initial_strings(count: usize) -> Self::Strings;
    fn initial_numbers(count: usize) -> Self::Numbers;

    /// Appends the event payload at the indices following the declared
    /// variables, where the transition's constraints can see it.
    fn append_payload(
        strings: &mut Self::Strings,
        numbers: &mut Self::Numbers,
        payload_strings: &[String],
        payload_numbers: &[Self::EventNumber],
    );

    /// Evaluates a transition's data constraints, mutating the candidate
    /// valuations (bindings, exclusions, polyhedron restriction). Callers
    /// pass copies.
    fn eval_constraints(
        string_constraints: &[StringConstraint],
        strings: &mut Self::Strings,
        number_constraints: &[Self::NumberConstraint],
        numbers: &mut Self::Numbers,
    ) -> Result<bool, EvalError>;

    fn apply_update(update: &Self::Update, strings: &mut Self::Strings, numbers: &mut Self::Numbers);

    /// Discards the per-event payload again.
    fn truncate(strings: &mut Self::Strings, string_count: usize, numbers: &mut Self::Numbers, number_count: usize);
}

impl DataMode for crate::automata::Boolean {
    type EventNumber = f64;
    type Strings = ConcreteStrings;
    type Numbers = ConcreteNumbers;

    fn initial_strings(count: usize) -> Self::Strings {
        vec![None; count]
    }

    fn initial_numbers(count: usize) -> Self::Numbers {
        ConcreteNumbers::unset(count)
    }

    fn append_payload(
        strings: &mut Self::Strings,
        numbers: &mut Self::Numbers,
        payload_strings: &[String],
        payload_numbers: &[f64],
    ) {
        strings.extend(payload_strings.iter().cloned().map(Some));
        numbers.extend(payload_numbers.iter().copied().map(Some));
    }

    fn eval_constraints(
        string_constraints: &[StringConstraint],
        strings: &mut Self::Strings,
        number_constraints: &[Self::NumberConstraint],
        numbers: &mut Self::Numbers,
    ) -> Result<bool, EvalError> {
        for c in string_constraints {
            if !string::eval_concrete(c, strings)? {
                return Ok(false);
            }
        }
        Ok(number_constraints.iter().all(|c| c.eval(numbers)))
    }

    fn apply_update(update: &Self::Update, strings: &mut Self::Strings, numbers: &mut Self::Numbers) {
        update.apply(strings, numbers);
    }

    fn truncate(strings: &mut Self::Strings, string_count: usize, numbers: &mut Self::Numbers, number_count: usize) {
        strings.truncate(string_count);
        numbers.truncate(number_count);
    }
}

/// Shared by the two symbolic modes.
fn symbolic_append_payload(
    strings: &mut SymbolicStrings,
    numbers: &mut Polyhedron,
    payload_strings: &[String],
    payload_numbers: &[Rational],
) {
    strings.extend(payload_strings.iter().cloned().map(StringEntry::Concrete));
    let base = numbers.dim();
    numbers.add_dims_embed(payload_numbers.len());
    let dim = numbers.dim();
    numbers.add_constraints(payload_numbers.iter().enumerate().map(|(i, value)| {
        LinearConstraint::eq(
            LinearExpr::variable(dim, base + i),
            LinearExpr::constant(dim, value.clone()),
        )
    }));
}

fn symbolic_eval_constraints(
    string_constraints: &[StringConstraint],
    strings: &mut SymbolicStrings,
    number_constraints: &[LinearConstraint],
    numbers: &mut Polyhedron,
) -> Result<bool, EvalError> {
    for c in string_constraints {
        if !string::eval_symbolic(c, strings)? {
            return Ok(false);
        }
    }
    Ok(number::restrict_symbolic(number_constraints, numbers))
}

macro_rules! impl_symbolic_data_mode {
    ($mode:ty) => {
        impl DataMode for $mode {
            type EventNumber = Rational;
            type Strings = SymbolicStrings;
            type Numbers = Polyhedron;

            fn initial_strings(count: usize) -> Self::Strings {
                vec![StringEntry::default(); count]
            }

            fn initial_numbers(count: usize) -> Self::Numbers {
                Polyhedron::universe(count)
            }

            fn append_payload(
                strings: &mut Self::Strings,
                numbers: &mut Self::Numbers,
                payload_strings: &[String],
                payload_numbers: &[Rational],
            ) {
                symbolic_append_payload(strings, numbers, payload_strings, payload_numbers);
            }

            fn eval_constraints(
                string_constraints: &[StringConstraint],
                strings: &mut Self::Strings,
                number_constraints: &[Self::NumberConstraint],
                numbers: &mut Self::Numbers,
            ) -> Result<bool, EvalError> {
                symbolic_eval_constraints(string_constraints, strings, number_constraints, numbers)
            }

            fn apply_update(update: &Self::Update, strings: &mut Self::Strings, numbers: &mut Self::Numbers) {
                update.apply(strings, numbers);
            }

            fn truncate(
                strings: &mut Self::Strings,
                string_count: usize,
                numbers: &mut Self::Numbers,
                number_count: usize,
            ) {
                strings.truncate(string_count);
                numbers.remove_higher_dims(number_count);
            }
        }
    };
}

impl_symbolic_data_mode!(crate::automata::DataParametric);
impl_symbolic_data_mode!(crate::automata::Parametric);
