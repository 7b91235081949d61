//! The automaton algebra: the operations used to assemble monitors from
//! expression-like specifications.
//!
//! Every operation returns an automaton whose transitions target states of
//! that same automaton. String and number variables (and timing parameters)
//! are global, so operands are expected to agree on them; clock variables are
//! local to each operand and are shifted where necessary.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::automata::{Automaton, Mode, State, StateId, Transition};
use crate::collections::IdVec;
use crate::constraints::update::Update;
use crate::constraints::TimingGuard;
use crate::core::{Action, ClockId};

fn offset_state(id: StateId, offset: usize) -> StateId {
    StateId::from(usize::from(id) + offset)
}

fn full_reset(clock_count: usize) -> SmallVec<[ClockId; 4]> {
    (0..clock_count).collect()
}

/// Drops every state rejected by `keep`, compacting the state vector and
/// remapping all indices. Transitions into dropped states must have been
/// removed beforehand.
fn retain_states<M: Mode>(a: &mut Automaton<M>, keep: impl Fn(StateId) -> bool) {
    let old_len = a.states.len();
    let mut remap: Vec<Option<StateId>> = vec![None; old_len];
    let mut next = 0usize;
    for i in 0..old_len {
        if keep(StateId::from(i)) {
            remap[i] = Some(StateId::from(next));
            next += 1;
        }
    }
    if next == old_len {
        return;
    }
    let old = std::mem::take(&mut a.states);
    let mut states: IdVec<StateId, State<M>> = IdVec::new();
    for (i, mut state) in old.into_values().enumerate() {
        if remap[i].is_none() {
            continue;
        }
        for transitions in state.next.values_mut() {
            for t in transitions.iter_mut() {
                t.target = remap[usize::from(t.target)].expect("transition into a removed state");
            }
        }
        states.push(state);
    }
    a.states = states;
    a.initial.retain(|id| remap[usize::from(*id)].is_some());
    for id in &mut a.initial {
        *id = remap[usize::from(*id)].expect("kept initial state");
    }
}

/// Accepts a word iff `left` or `right` does. The operands are juxtaposed;
/// variable cardinalities are unified by maximum.
pub fn disjunction<M: Mode>(mut left: Automaton<M>, right: Automaton<M>) -> Automaton<M> {
    let offset = left.states.len();
    left.clock_count = left.clock_count.max(right.clock_count);
    left.param_count = left.param_count.max(right.param_count);
    left.string_count = left.string_count.max(right.string_count);
    left.number_count = left.number_count.max(right.number_count);
    for mut state in right.states.into_values() {
        for transitions in state.next.values_mut() {
            for t in transitions.iter_mut() {
                t.target = offset_state(t.target, offset);
            }
        }
        left.states.push(state);
    }
    left.initial
        .extend(right.initial.into_iter().map(|id| offset_state(id, offset)));
    left
}

/// Accepts a word iff both operands do, by lazy product construction.
///
/// Clocks are local, so `right`'s clock space is shifted past `left`'s;
/// string and number variables are shared and unified by maximum.
pub fn conjunction<M: Mode>(left: &Automaton<M>, right: &Automaton<M>) -> Automaton<M> {
    let params = left.param_count.max(right.param_count);
    let mut result: Automaton<M> = Automaton::new(
        left.clock_count + right.clock_count,
        params,
        left.string_count.max(right.string_count),
        left.number_count.max(right.number_count),
    );
    let mut pairs: HashMap<(StateId, StateId), StateId> = HashMap::new();
    let mut waiting: Vec<(StateId, StateId)> = Vec::new();
    for &la in &left.initial {
        for &ra in &right.initial {
            let id = result.add_state(left.states[la].accepting && right.states[ra].accepting);
            pairs.insert((la, ra), id);
            result.initial.push(id);
            waiting.push((la, ra));
        }
    }
    while let Some((sa, sb)) = waiting.pop() {
        let source = pairs[&(sa, sb)];
        for (action, left_transitions) in &left.states[sa].next {
            let Some(right_transitions) = right.states[sb].next.get(action) else {
                continue;
            };
            for lt in left_transitions {
                for rt in right_transitions {
                    let mut string_constraints = lt.string_constraints.clone();
                    string_constraints.extend(rt.string_constraints.iter().cloned());
                    let mut number_constraints = lt.number_constraints.clone();
                    number_constraints.extend(rt.number_constraints.iter().cloned());
                    let mut update = lt.update.clone();
                    update.extend(&rt.update);
                    let mut resets = lt.resets.clone();
                    resets.extend(rt.resets.iter().map(|r| r + left.clock_count));

                    let mut lg = lt.guard.clone();
                    lg.adjust_clock_dimension(params, left.clock_count);
                    let mut rg = rt.guard.clone();
                    rg.adjust_clock_dimension(params, right.clock_count);
                    let guard = lg.conjoin(&rg.shift_clocks(params, left.clock_count));

                    let pair = (lt.target, rt.target);
                    let target = match pairs.get(&pair) {
                        Some(&id) => id,
                        None => {
                            let id = result.add_state(
                                left.states[lt.target].accepting && right.states[rt.target].accepting,
                            );
                            pairs.insert(pair, id);
                            waiting.push(pair);
                            id
                        }
                    };
                    result.add_transition(
                        source,
                        *action,
                        Transition {
                            string_constraints,
                            number_constraints,
                            update,
                            resets,
                            guard,
                            target,
                        },
                    );
                }
            }
        }
    }
    result
}

/// Accepts `uv` iff `left` accepts `u` and `right` accepts `v` (with `v`
/// nonempty). Every transition into a `left`-accepting state is duplicated
/// towards each initial state of `right`, resetting all clocks.
pub fn concatenate<M: Mode>(mut left: Automaton<M>, right: Automaton<M>) -> Automaton<M> {
    left.clock_count = left.clock_count.max(right.clock_count);
    left.param_count = left.param_count.max(right.param_count);
    left.string_count = left.string_count.max(right.string_count);
    left.number_count = left.number_count.max(right.number_count);

    let left_count = left.states.len();
    let left_accepting: Vec<bool> = left.states.values().map(|s| s.accepting).collect();
    let has_out: Vec<bool> = left.states.values().map(State::has_transitions).collect();

    let offset = left_count;
    for mut state in right.states.into_values() {
        for transitions in state.next.values_mut() {
            for t in transitions.iter_mut() {
                t.target = offset_state(t.target, offset);
            }
        }
        left.states.push(state);
    }
    let right_initial: Vec<StateId> = right.initial.iter().map(|id| offset_state(*id, offset)).collect();

    let resets = full_reset(left.clock_count);
    for i in 0..left_count {
        let state = &mut left.states[StateId::from(i)];
        for transitions in state.next.values_mut() {
            let mut kept = Vec::with_capacity(transitions.len());
            let mut added = Vec::new();
            for t in std::mem::take(transitions) {
                let ti = usize::from(t.target);
                if ti < left_count && left_accepting[ti] {
                    for &ri in &right_initial {
                        let mut nt = t.clone();
                        nt.target = ri;
                        nt.resets = resets.clone();
                        added.push(nt);
                    }
                    if has_out[ti] {
                        kept.push(t);
                    }
                } else {
                    kept.push(t);
                }
            }
            kept.extend(added);
            *transitions = kept;
        }
    }
    for i in 0..left_count {
        left.states[StateId::from(i)].accepting = false;
    }
    retain_states(&mut left, |id| {
        let i = usize::from(id);
        !(i < left_count && left_accepting[i] && !has_out[i])
    });
    left
}

/// One or more repetitions: every transition into an accepting state gains a
/// sibling towards each initial state, resetting all clocks.
pub fn kleene_plus<M: Mode>(mut a: Automaton<M>) -> Automaton<M> {
    let accepting: Vec<bool> = a.states.values().map(|s| s.accepting).collect();
    let initial = a.initial.clone();
    let resets = full_reset(a.clock_count);
    for state in a.states.values_mut() {
        for transitions in state.next.values_mut() {
            let mut added = Vec::new();
            for t in transitions.iter() {
                if accepting[usize::from(t.target)] {
                    for &init in &initial {
                        let mut nt = t.clone();
                        nt.target = init;
                        nt.resets = resets.clone();
                        added.push(nt);
                    }
                }
            }
            transitions.extend(added);
        }
    }
    a
}

/// Zero or more repetitions.
pub fn kleene_star<M: Mode>(a: Automaton<M>) -> Automaton<M> {
    empty_or(kleene_plus(a))
}

/// Accepts the empty word in addition to the operand's words, via a fresh
/// accepting initial state with no outgoing transitions.
pub fn empty_or<M: Mode>(mut a: Automaton<M>) -> Automaton<M> {
    let fresh = a.add_state(true);
    a.initial.push(fresh);
    a
}

/// Restricts acceptance to runs whose total duration satisfies `guard` over
/// a fresh clock (index `clock_count`, never reset).
pub fn time_restriction<M: Mode>(mut a: Automaton<M>, guard: M::Guard) -> Automaton<M> {
    a.clock_count += 1;
    let params = a.param_count;
    let clocks = a.clock_count;
    let old_accepting: Vec<bool> = a.states.values().map(|s| s.accepting).collect();
    let has_out: Vec<bool> = a.states.values().map(State::has_transitions).collect();
    let new_final = a.add_state(true);
    let mut g = guard;
    g.adjust_clock_dimension(params, clocks);

    for state in a.states.values_mut() {
        for transitions in state.next.values_mut() {
            let mut kept = Vec::with_capacity(transitions.len());
            let mut added = Vec::new();
            for mut t in std::mem::take(transitions) {
                t.guard.adjust_clock_dimension(params, clocks);
                let ti = usize::from(t.target);
                if ti < old_accepting.len() && old_accepting[ti] {
                    let mut nt = t.clone();
                    nt.guard = g.conjoin(&t.guard);
                    nt.target = new_final;
                    added.push(nt);
                    if has_out[ti] {
                        kept.push(t);
                    }
                } else {
                    kept.push(t);
                }
            }
            kept.extend(added);
            *transitions = kept;
        }
    }
    for (i, acc) in old_accepting.iter().enumerate() {
        if *acc {
            a.states[StateId::from(i)].accepting = false;
        }
    }
    retain_states(&mut a, |id| {
        let i = usize::from(id);
        !(i < old_accepting.len() && old_accepting[i] && !has_out[i])
    });
    a
}

/// Adds unconditional self-loops on every listed action at every state, so
/// those actions can occur anywhere without affecting acceptance.
pub fn ignore_actions<M: Mode>(mut a: Automaton<M>, actions: &[Action]) -> Automaton<M> {
    let params = a.param_count;
    let clocks = a.clock_count;
    let ids: Vec<StateId> = a.states.keys().collect();
    for id in ids {
        for &action in actions {
            a.add_transition(id, action, Transition::unconstrained(id, params, clocks));
        }
    }
    a
}

/// True when no transition resets the automaton's last clock, in which case
/// a time restriction may reuse it instead of adding a dimension.
pub fn no_reset_last_clock<M: Mode>(a: &Automaton<M>) -> bool {
    let Some(last) = a.clock_count.checked_sub(1) else {
        return true;
    };
    a.states
        .values()
        .flat_map(|s| s.next.values())
        .flatten()
        .all(|t| !t.resets.contains(&last))
}
