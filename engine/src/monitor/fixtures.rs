//! Hand-built automata shared by the monitor tests.

use smallvec::smallvec;

use crate::automata::{Automaton, Boolean, DataParametric, Mode, Parametric, StateId, Transition};
use crate::constraints::{
    Cmp, ClockBound, NumberExpr, ScalarConstraint, StringAtom, StringConstraint, StringOp, TimingRel,
};
use crate::core::{Action, Rational};
use crate::poly::{LinearConstraint, LinearExpr, Polyhedron};

fn guard(clock: usize, rel: TimingRel, bound: f64) -> ClockBound {
    ClockBound { clock, rel, bound }
}

fn eq_payload_string(value: &str) -> StringConstraint {
    StringConstraint::new(
        StringAtom::Var(0),
        StringOp::Eq,
        StringAtom::Literal(value.to_string()),
    )
}

fn ne_payload_string(value: &str) -> StringConstraint {
    StringConstraint::new(
        StringAtom::Var(0),
        StringOp::Ne,
        StringAtom::Literal(value.to_string()),
    )
}

fn diff_constraint(cmp: Cmp) -> ScalarConstraint {
    ScalarConstraint {
        expr: NumberExpr::Sub(Box::new(NumberExpr::Var(0)), Box::new(NumberExpr::Var(1))),
        cmp,
        bound: 0.0,
    }
}

fn transition<M: Mode>(target: StateId, g: M::Guard) -> Transition<M> {
    Transition {
        string_constraints: Vec::new(),
        number_constraints: Vec::new(),
        update: Default::default(),
        resets: smallvec![],
        guard: g,
        target,
    }
}

/// The "copy" monitor: an `update` event binds the tracked value on a `y`
/// destination, and acceptance is reached when more than 5 time units pass
/// without the value being refreshed by an `x` destination carrying the same
/// number.
///
/// One clock, no string variables (the event string payload sits at index
/// 0), one number variable (the payload at index 1).
pub fn copy_automaton() -> Automaton<Boolean> {
    let mut a: Automaton<Boolean> = Automaton::new(1, 0, 0, 1);
    let s0 = a.add_state(false);
    let s1 = a.add_state(false);
    let s2 = a.add_state(false);
    let s3 = a.add_state(true);
    a.initial.push(s0);
    let act = Action(0);

    // Waiting for a binding event.
    a.add_transition(s0, act, transition::<Boolean>(s0, vec![]));
    let mut bind = transition::<Boolean>(s1, vec![]);
    bind.string_constraints = vec![eq_payload_string("y")];
    bind.update.numbers = vec![(0, 1)];
    bind.resets = smallvec![0];
    a.add_transition(s0, act, bind);

    // Value bound, within the 3-unit refresh window.
    let mut other_value = transition::<Boolean>(s1, vec![guard(0, TimingRel::Lt, 3.0)]);
    other_value.string_constraints = vec![eq_payload_string("x")];
    other_value.number_constraints = vec![diff_constraint(Cmp::Ne)];
    a.add_transition(s1, act, other_value);
    let mut other_dest = transition::<Boolean>(s1, vec![guard(0, TimingRel::Lt, 3.0)]);
    other_dest.string_constraints = vec![ne_payload_string("x")];
    a.add_transition(s1, act, other_dest);
    let mut refreshed = transition::<Boolean>(s2, vec![guard(0, TimingRel::Lt, 3.0)]);
    refreshed.string_constraints = vec![eq_payload_string("x")];
    refreshed.number_constraints = vec![diff_constraint(Cmp::Eq)];
    a.add_transition(s1, act, refreshed);

    // Value refreshed; still watching the deadline.
    let mut still_same = transition::<Boolean>(s2, vec![guard(0, TimingRel::Le, 5.0)]);
    still_same.string_constraints = vec![eq_payload_string("x")];
    still_same.number_constraints = vec![diff_constraint(Cmp::Eq)];
    a.add_transition(s2, act, still_same);
    let mut unrelated = transition::<Boolean>(s2, vec![guard(0, TimingRel::Le, 5.0)]);
    unrelated.string_constraints = vec![ne_payload_string("x")];
    a.add_transition(s2, act, unrelated);
    let mut diverged = transition::<Boolean>(s1, vec![guard(0, TimingRel::Lt, 3.0)]);
    diverged.string_constraints = vec![eq_payload_string("x")];
    diverged.number_constraints = vec![diff_constraint(Cmp::Ne)];
    a.add_transition(s2, act, diverged);
    a.add_transition(s2, act, transition::<Boolean>(s3, vec![guard(0, TimingRel::Gt, 5.0)]));

    a.check_consistency();
    a
}

fn linear_cmp(cmp: Cmp) -> Vec<LinearConstraint> {
    // Over (number variable, event payload).
    let x0 = || LinearExpr::variable(2, 0);
    let x1 = || LinearExpr::variable(2, 1);
    match cmp {
        Cmp::Eq => vec![LinearConstraint::eq(x0(), x1())],
        Cmp::Lt => vec![LinearConstraint::lt(x0(), x1())],
        Cmp::Gt => vec![LinearConstraint::gt(x0(), x1())],
        _ => unreachable!("only =, <, > are used by the fixture"),
    }
}

/// The data-parametric rendition of [`copy_automaton`]. The disequality
/// check is split into a `<` and a `>` transition, since the polyhedral
/// domain has no single disequality constraint.
pub fn data_parametric_copy_automaton() -> Automaton<DataParametric> {
    let mut a: Automaton<DataParametric> = Automaton::new(1, 0, 0, 1);
    let s0 = a.add_state(false);
    let s1 = a.add_state(false);
    let s2 = a.add_state(false);
    let s3 = a.add_state(true);
    a.initial.push(s0);
    let act = Action(0);

    a.add_transition(s0, act, transition::<DataParametric>(s0, vec![]));
    let mut bind = transition::<DataParametric>(s1, vec![]);
    bind.string_constraints = vec![eq_payload_string("y")];
    bind.update.numbers = vec![(0, LinearExpr::variable(2, 1))];
    bind.resets = smallvec![0];
    a.add_transition(s0, act, bind);

    for cmp in [Cmp::Lt, Cmp::Gt] {
        let mut t = transition::<DataParametric>(s1, vec![guard(0, TimingRel::Lt, 3.0)]);
        t.string_constraints = vec![eq_payload_string("x")];
        t.number_constraints = linear_cmp(cmp);
        a.add_transition(s1, act, t);
    }
    let mut other_dest = transition::<DataParametric>(s1, vec![guard(0, TimingRel::Lt, 3.0)]);
    other_dest.string_constraints = vec![ne_payload_string("x")];
    a.add_transition(s1, act, other_dest);
    let mut refreshed = transition::<DataParametric>(s2, vec![guard(0, TimingRel::Lt, 3.0)]);
    refreshed.string_constraints = vec![eq_payload_string("x")];
    refreshed.number_constraints = linear_cmp(Cmp::Eq);
    a.add_transition(s1, act, refreshed);

    let mut still_same = transition::<DataParametric>(s2, vec![guard(0, TimingRel::Le, 5.0)]);
    still_same.string_constraints = vec![eq_payload_string("x")];
    still_same.number_constraints = linear_cmp(Cmp::Eq);
    a.add_transition(s2, act, still_same);
    let mut unrelated = transition::<DataParametric>(s2, vec![guard(0, TimingRel::Le, 5.0)]);
    unrelated.string_constraints = vec![ne_payload_string("x")];
    a.add_transition(s2, act, unrelated);
    for cmp in [Cmp::Lt, Cmp::Gt] {
        let mut t = transition::<DataParametric>(s1, vec![guard(0, TimingRel::Lt, 3.0)]);
        t.string_constraints = vec![eq_payload_string("x")];
        t.number_constraints = linear_cmp(cmp);
        a.add_transition(s2, act, t);
    }
    a.add_transition(
        s2,
        act,
        transition::<DataParametric>(s3, vec![guard(0, TimingRel::Gt, 5.0)]),
    );

    a.check_consistency();
    a
}

/// Accepts whenever the time since the previous event falls in `[1.1, 1.2)`.
pub fn non_integer_guard_automaton() -> Automaton<Boolean> {
    let mut a: Automaton<Boolean> = Automaton::new(1, 0, 0, 0);
    let s0 = a.add_state(false);
    let s1 = a.add_state(true);
    a.initial.push(s0);
    let mut stay = transition::<Boolean>(s0, vec![]);
    stay.resets = smallvec![0];
    a.add_transition(s0, Action(0), stay);
    a.add_transition(
        s0,
        Action(0),
        transition::<Boolean>(s1, vec![guard(0, TimingRel::Ge, 1.1), guard(0, TimingRel::Lt, 1.2)]),
    );
    a.check_consistency();
    a
}

fn rational(n: i64) -> Rational {
    Rational::from_integer(n.into())
}

/// An unobservable step into a waiting state, then an observable transition
/// guarded by `x0 ∼ 10`. Exercises strictness through the unobservable
/// closure.
pub fn threshold_automaton(cmp: Cmp) -> Automaton<Parametric> {
    let mut a: Automaton<Parametric> = Automaton::new(1, 0, 0, 0);
    let s0 = a.add_state(false);
    let s1 = a.add_state(false);
    let s2 = a.add_state(true);
    a.initial.push(s0);

    a.add_transition(
        s0,
        Action::UNOBSERVABLE,
        transition::<Parametric>(s1, Polyhedron::universe(1)),
    );

    let clock = LinearExpr::variable(1, 0);
    let ten = LinearExpr::constant(1, rational(10));
    let c = match cmp {
        Cmp::Gt => LinearConstraint::gt(clock, ten),
        Cmp::Lt => LinearConstraint::lt(clock, ten),
        _ => unreachable!("only strict comparisons are exercised"),
    };
    let mut g = Polyhedron::universe(1);
    g.add_constraint(c);
    a.add_transition(s1, Action(0), transition::<Parametric>(s2, g));

    a.check_consistency();
    a
}

/// Parametric rendition of [`non_integer_guard_automaton`].
pub fn parametric_non_integer_automaton() -> Automaton<Parametric> {
    let mut a: Automaton<Parametric> = Automaton::new(1, 0, 0, 1);
    let s0 = a.add_state(false);
    let s1 = a.add_state(true);
    a.initial.push(s0);
    let mut stay = transition::<Parametric>(s0, Polyhedron::universe(1));
    stay.resets = smallvec![0];
    a.add_transition(s0, Action(0), stay);
    let mut g = Polyhedron::universe(1);
    g.add_constraints([
        LinearConstraint::ge(
            LinearExpr::variable(1, 0),
            LinearExpr::constant(1, Rational::new(11.into(), 10.into())),
        ),
        LinearConstraint::lt(
            LinearExpr::variable(1, 0),
            LinearExpr::constant(1, Rational::new(12.into(), 10.into())),
        ),
    ]);
    a.add_transition(s0, Action(0), transition::<Parametric>(s1, g));
    a.check_consistency();
    a
}

/// Binds the string payload and pins the number payload: a single observable
/// step into acceptance. No clocks.
pub fn binding_automaton() -> Automaton<Parametric> {
    let mut a: Automaton<Parametric> = Automaton::new(0, 0, 1, 1);
    let s0 = a.add_state(false);
    let s1 = a.add_state(true);
    a.initial.push(s0);
    let mut t = transition::<Parametric>(s1, Polyhedron::universe(0));
    t.string_constraints = vec![StringConstraint::new(
        StringAtom::Var(0),
        StringOp::Eq,
        StringAtom::Var(1),
    )];
    t.number_constraints = vec![LinearConstraint::eq(
        LinearExpr::variable(2, 0),
        LinearExpr::variable(2, 1),
    )];
    a.add_transition(s0, Action(0), t);
    a.check_consistency();
    a
}

/// Watches for a `b` event, then accepts through an unobservable transition
/// exactly 3 time units later.
pub fn delayed_acceptance_automaton() -> Automaton<Parametric> {
    let mut a: Automaton<Parametric> = Automaton::new(1, 0, 0, 0);
    let s0 = a.add_state(false);
    let s1 = a.add_state(false);
    let s2 = a.add_state(true);
    a.initial.push(s0);

    a.add_transition(s0, Action(0), transition::<Parametric>(s0, Polyhedron::universe(1)));
    let mut arm = transition::<Parametric>(s1, Polyhedron::universe(1));
    arm.string_constraints = vec![eq_payload_string("b")];
    arm.resets = smallvec![0];
    a.add_transition(s0, Action(0), arm);

    let mut g = Polyhedron::universe(1);
    g.add_constraint(LinearConstraint::eq(
        LinearExpr::variable(1, 0),
        LinearExpr::constant(1, rational(3)),
    ));
    a.add_transition(s1, Action::UNOBSERVABLE, transition::<Parametric>(s2, g));
    a.check_consistency();
    a
}
