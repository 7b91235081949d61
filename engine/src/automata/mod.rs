//! The timed-data-automaton graph: states, transitions, variable spaces.
//!
//! States live in an index-addressed vector owned by the automaton and
//! transitions name their target by [`StateId`], so the graph may contain
//! cycles, cloning an automaton is a deep copy, and no reference counting is
//! involved.

pub mod ops;

use std::collections::BTreeMap;
use std::fmt;

use smallvec::SmallVec;

use crate::collections::IdVec;
use crate::constraints::update::Update as UpdateOps;
use crate::constraints::{
    ClockGuard, ConcreteUpdate, ScalarConstraint, StringConstraint, SymbolicUpdate, TimingGuard,
};
use crate::core::{Action, ClockId};
use crate::create_index_type;
use crate::poly::{LinearConstraint, Polyhedron};

create_index_type!(StateId);

/// The mode-varying pieces of a timed data automaton.
pub trait Mode: Clone + fmt::Debug + 'static {
    type NumberConstraint: Clone + fmt::Debug;
    type Update: UpdateOps;
    type Guard: TimingGuard;
}

/// Concrete values, concrete clocks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Boolean;

/// Symbolic strings and polyhedral number valuations, concrete clocks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DataParametric;

/// Symbolic data plus polyhedral clock valuations over (parameters, clocks).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Parametric;

impl Mode for Boolean {
    type NumberConstraint = ScalarConstraint;
    type Update = ConcreteUpdate;
    type Guard = ClockGuard;
}

impl Mode for DataParametric {
    type NumberConstraint = LinearConstraint;
    type Update = SymbolicUpdate;
    type Guard = ClockGuard;
}

impl Mode for Parametric {
    type NumberConstraint = LinearConstraint;
    type Update = SymbolicUpdate;
    type Guard = Polyhedron;
}

/// A transition of a timed data automaton.
#[derive(Clone, Debug)]
pub struct Transition<M: Mode> {
    pub string_constraints: Vec<StringConstraint>,
    pub number_constraints: Vec<M::NumberConstraint>,
    pub update: M::Update,
    /// The clock variables reset to zero after this transition.
    pub resets: SmallVec<[ClockId; 4]>,
    pub guard: M::Guard,
    pub target: StateId,
}

impl<M: Mode> Transition<M> {
    /// A transition with no constraints, no update, no resets and the
    /// universally true guard.
    pub fn unconstrained(target: StateId, params: usize, clocks: usize) -> Self {
        Transition {
            string_constraints: Vec::new(),
            number_constraints: Vec::new(),
            update: M::Update::default(),
            resets: SmallVec::new(),
            guard: M::Guard::universe(params, clocks),
            target,
        }
    }
}

/// A state of a timed data automaton.
///
/// Because of nondeterminism a state maps each action to a list of
/// transitions.
#[derive(Clone, Debug)]
pub struct State<M: Mode> {
    pub accepting: bool,
    pub next: BTreeMap<Action, Vec<Transition<M>>>,
}

impl<M: Mode> State<M> {
    pub fn new(accepting: bool) -> Self {
        State {
            accepting,
            next: BTreeMap::new(),
        }
    }

    pub fn has_transitions(&self) -> bool {
        self.next.values().any(|ts| !ts.is_empty())
    }
}

/// A timed data automaton with its four variable-space cardinalities.
///
/// `param_count` is zero outside the parametric mode.
#[derive(Clone, Debug)]
pub struct Automaton<M: Mode> {
    pub states: IdVec<StateId, State<M>>,
    pub initial: Vec<StateId>,
    pub clock_count: usize,
    pub param_count: usize,
    pub string_count: usize,
    pub number_count: usize,
}

impl<M: Mode> Automaton<M> {
    pub fn new(clock_count: usize, param_count: usize, string_count: usize, number_count: usize) -> Self {
        Automaton {
            states: IdVec::new(),
            initial: Vec::new(),
            clock_count,
            param_count,
            string_count,
            number_count,
        }
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn add_state(&mut self, accepting: bool) -> StateId {
        self.states.push(State::new(accepting))
    }

    pub fn add_transition(&mut self, source: StateId, action: Action, transition: Transition<M>) {
        self.states[source].next.entry(action).or_default().push(transition);
    }

    pub fn accepting_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states.entries().filter(|(_, s)| s.accepting).map(|(id, _)| id)
    }

    /// An independent copy of the whole graph. Transitions index into the
    /// owning automaton, so a structural clone is already a deep copy.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// Checks the structural invariants: targets and reset lists in range.
    /// Intended for tests and debug assertions.
    pub fn check_consistency(&self) {
        for id in &self.initial {
            assert!(self.states.contains(*id), "initial state out of range");
        }
        for (_, state) in self.states.entries() {
            for transitions in state.next.values() {
                for t in transitions {
                    assert!(self.states.contains(t.target), "dangling transition target");
                    for &r in &t.resets {
                        assert!(r < self.clock_count, "reset of undeclared clock x{r}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state() -> Automaton<Boolean> {
        let mut a = Automaton::new(1, 0, 0, 0);
        let s0 = a.add_state(false);
        let s1 = a.add_state(true);
        a.initial.push(s0);
        a.add_transition(s0, Action(0), Transition::unconstrained(s1, 0, 1));
        a
    }

    #[test]
    fn deep_copy_is_independent() {
        let a = two_state();
        let mut b = a.deep_copy();
        let extra = b.add_state(false);
        b.add_transition(extra, Action(3), Transition::unconstrained(extra, 0, 1));
        b.states[StateId::from(1usize)].accepting = false;

        assert_eq!(a.state_count(), 2);
        assert_eq!(b.state_count(), 3);
        assert!(a.states[StateId::from(1usize)].accepting);
        assert_eq!(a.accepting_states().count(), 1);
        a.check_consistency();
        b.check_consistency();
    }

    #[test]
    fn transition_listing() {
        let a = two_state();
        let s0 = StateId::from(0usize);
        assert!(a.states[s0].has_transitions());
        assert_eq!(a.states[s0].next[&Action(0)].len(), 1);
        assert!(a.states[s0].next.get(&Action(1)).is_none());
    }
}
