//! Convex polyhedra over rationals, in constraint representation.

use num_traits::{Signed, Zero};

use crate::core::Rational;
use crate::poly::expr::display_joined;
use crate::poly::LinearExpr;

/// Relation of a constraint expression to zero.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ConstraintRel {
    /// `expr == 0`
    Eq,
    /// `expr >= 0`
    Ge,
    /// `expr > 0`
    Gt,
}

/// A single linear constraint `expr REL 0`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LinearConstraint {
    pub expr: LinearExpr,
    pub rel: ConstraintRel,
}

impl LinearConstraint {
    pub fn eq(lhs: LinearExpr, rhs: LinearExpr) -> Self {
        LinearConstraint {
            expr: lhs - rhs,
            rel: ConstraintRel::Eq,
        }
    }

    pub fn ge(lhs: LinearExpr, rhs: LinearExpr) -> Self {
        LinearConstraint {
            expr: lhs - rhs,
            rel: ConstraintRel::Ge,
        }
    }

    pub fn gt(lhs: LinearExpr, rhs: LinearExpr) -> Self {
        LinearConstraint {
            expr: lhs - rhs,
            rel: ConstraintRel::Gt,
        }
    }

    pub fn le(lhs: LinearExpr, rhs: LinearExpr) -> Self {
        Self::ge(rhs, lhs)
    }

    pub fn lt(lhs: LinearExpr, rhs: LinearExpr) -> Self {
        Self::gt(rhs, lhs)
    }

    pub fn dim(&self) -> usize {
        self.expr.dim()
    }

    fn add_dims(&mut self, count: usize) {
        self.expr.add_dims(count);
    }

    /// The negation of this constraint; for equalities only one half
    /// (`expr > 0`), see [`Polyhedron::entails`].
    fn negation_half(&self) -> LinearConstraint {
        let expr = -self.expr.clone();
        let rel = match self.rel {
            ConstraintRel::Ge => ConstraintRel::Gt,
            ConstraintRel::Gt => ConstraintRel::Ge,
            ConstraintRel::Eq => ConstraintRel::Gt,
        };
        LinearConstraint { expr, rel }
    }
}

impl std::fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut lhs = self.expr.clone();
        let rhs = -lhs.constant_term().clone();
        lhs.set_constant(Rational::zero());
        let op = match self.rel {
            ConstraintRel::Eq => "==",
            ConstraintRel::Ge => ">=",
            ConstraintRel::Gt => ">",
        };
        write!(f, "{lhs} {op} {}", LinearExpr::constant(0, rhs))
    }
}

/// Is the constraint variable-free, and if so, does it hold?
fn ground_status(c: &LinearConstraint) -> Option<bool> {
    if !c.expr.is_constant() {
        return None;
    }
    let k = c.expr.constant_term();
    Some(match c.rel {
        ConstraintRel::Eq => k.is_zero(),
        ConstraintRel::Ge => !k.is_negative(),
        ConstraintRel::Gt => k.is_positive(),
    })
}

/// Existentially eliminates dimension `j` by substitution through an equality
/// when one is available and by Fourier–Motzkin combination otherwise.
/// Returns `None` when the system is detected unsatisfiable.
fn eliminate(mut constraints: Vec<LinearConstraint>, j: usize) -> Option<Vec<LinearConstraint>> {
    let pivot_pos = constraints
        .iter()
        .position(|c| c.rel == ConstraintRel::Eq && !c.expr.coeff(j).is_zero());
    if let Some(pos) = pivot_pos {
        let pivot = constraints.swap_remove(pos);
        let pivot_coeff = pivot.expr.coeff(j).clone();
        let mut out = Vec::with_capacity(constraints.len());
        for mut c in constraints {
            let cj = c.expr.coeff(j).clone();
            if !cj.is_zero() {
                c.expr.add_scaled(&pivot.expr, &(-cj / &pivot_coeff));
            }
            match ground_status(&c) {
                Some(true) => {}
                Some(false) => return None,
                None => out.push(c),
            }
        }
        return Some(out);
    }

    let mut lower = Vec::new();
    let mut upper = Vec::new();
    let mut rest = Vec::new();
    for c in constraints {
        let cj = c.expr.coeff(j);
        if cj.is_zero() {
            rest.push(c);
        } else if cj.is_positive() {
            lower.push(c);
        } else {
            upper.push(c);
        }
    }
    for l in &lower {
        for u in &upper {
            let a = l.expr.coeff(j).clone();
            let b = -u.expr.coeff(j).clone();
            let mut expr = l.expr.scaled(&b);
            expr.add_scaled(&u.expr, &a);
            let rel = if l.rel == ConstraintRel::Gt || u.rel == ConstraintRel::Gt {
                ConstraintRel::Gt
            } else {
                ConstraintRel::Ge
            };
            let combined = LinearConstraint { expr, rel };
            match ground_status(&combined) {
                Some(true) => {}
                Some(false) => return None,
                None => rest.push(combined),
            }
        }
    }
    Some(rest)
}

/// Satisfiability of a constraint system over `dim` dimensions.
fn feasible(constraints: &[LinearConstraint], dim: usize) -> bool {
    let mut work = Vec::with_capacity(constraints.len());
    for c in constraints {
        match ground_status(c) {
            Some(true) => {}
            Some(false) => return false,
            None => work.push(c.clone()),
        }
    }
    for j in 0..dim {
        match eliminate(work, j) {
            Some(next) => work = next,
            None => return false,
        }
    }
    true
}

fn entailed_by(constraints: &[LinearConstraint], dim: usize, c: &LinearConstraint) -> bool {
    let check_half = |half: LinearConstraint| {
        let mut system = constraints.to_vec();
        system.push(half);
        !feasible(&system, dim)
    };
    match c.rel {
        ConstraintRel::Eq => {
            let ge = LinearConstraint {
                expr: c.expr.clone(),
                rel: ConstraintRel::Ge,
            };
            let le = LinearConstraint {
                expr: -c.expr.clone(),
                rel: ConstraintRel::Ge,
            };
            check_half(ge.negation_half()) && check_half(le.negation_half())
        }
        _ => check_half(c.negation_half()),
    }
}

/// A convex polyhedron over `dim` rational dimensions, closed under the
/// operations the monitors need: intersection, dimension surgery, affine
/// images, time elapse and projection.
///
/// The constraint system is kept canonical (implicit equalities promoted,
/// equalities in reduced echelon form and substituted away from the
/// inequalities, redundant inequalities removed, scales normalized, sorted),
/// so the derived `Eq`/`Hash` agree with set equality.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Polyhedron {
    dim: usize,
    empty: bool,
    constraints: Vec<LinearConstraint>,
}

impl Polyhedron {
    /// The full space of the given dimension.
    pub fn universe(dim: usize) -> Self {
        Polyhedron {
            dim,
            empty: false,
            constraints: Vec::new(),
        }
    }

    pub fn empty_space(dim: usize) -> Self {
        Polyhedron {
            dim,
            empty: true,
            constraints: Vec::new(),
        }
    }

    pub fn from_constraints(dim: usize, constraints: Vec<LinearConstraint>) -> Self {
        let mut p = Self::universe(dim);
        for c in constraints {
            p.push_constraint(c);
        }
        p.canonicalize();
        p
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn is_universe(&self) -> bool {
        !self.empty && self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    fn set_empty(&mut self) {
        self.empty = true;
        self.constraints.clear();
    }

    fn push_constraint(&mut self, mut c: LinearConstraint) {
        assert!(c.dim() <= self.dim, "constraint dimension exceeds polyhedron");
        c.add_dims(self.dim - c.dim());
        self.constraints.push(c);
    }

    pub fn add_constraint(&mut self, c: LinearConstraint) {
        if self.empty {
            return;
        }
        self.push_constraint(c);
        self.canonicalize();
    }

    pub fn add_constraints(&mut self, cs: impl IntoIterator<Item = LinearConstraint>) {
        if self.empty {
            return;
        }
        for c in cs {
            self.push_constraint(c);
        }
        self.canonicalize();
    }

    pub fn intersection_assign(&mut self, other: &Polyhedron) {
        assert_eq!(self.dim, other.dim, "intersecting polyhedra of unequal dimension");
        if self.empty {
            return;
        }
        if other.empty {
            self.set_empty();
            return;
        }
        self.constraints.extend(other.constraints.iter().cloned());
        self.canonicalize();
    }

    /// Appends `count` unconstrained dimensions.
    pub fn add_dims_embed(&mut self, count: usize) {
        for c in &mut self.constraints {
            c.add_dims(count);
        }
        self.dim += count;
    }

    /// Appends `count` dimensions constrained to zero.
    pub fn add_dims_project(&mut self, count: usize) {
        let old = self.dim;
        self.add_dims_embed(count);
        if self.empty {
            return;
        }
        for i in old..self.dim {
            let expr = LinearExpr::variable(self.dim, i);
            self.constraints.push(LinearConstraint {
                expr,
                rel: ConstraintRel::Eq,
            });
        }
        self.canonicalize();
    }

    /// Inserts `count` unconstrained dimensions starting at position `at`.
    pub fn insert_dims(&mut self, at: usize, count: usize) {
        for c in &mut self.constraints {
            c.expr.insert_dims(at, count);
        }
        self.dim += count;
    }

    /// Projects away every dimension at or above `new_dim`.
    pub fn remove_higher_dims(&mut self, new_dim: usize) {
        assert!(new_dim <= self.dim);
        if self.empty {
            self.dim = new_dim;
            return;
        }
        let mut work = std::mem::take(&mut self.constraints);
        for j in (new_dim..self.dim).rev() {
            match eliminate(work, j) {
                Some(next) => work = next,
                None => {
                    self.dim = new_dim;
                    self.set_empty();
                    return;
                }
            }
        }
        for c in &mut work {
            c.expr.truncate_dims(new_dim);
        }
        self.dim = new_dim;
        self.constraints = work;
        self.canonicalize();
    }

    /// Replaces dimension `var` by the value of `expr` over the *previous*
    /// values of all dimensions.
    pub fn affine_image(&mut self, var: usize, expr: &LinearExpr) {
        assert!(var < self.dim);
        assert!(expr.dim() <= self.dim);
        if self.empty {
            return;
        }
        let old_dim = self.dim;
        self.add_dims_embed(1);
        let mut rhs = expr.clone();
        rhs.add_dims(self.dim - rhs.dim());
        let holder = LinearExpr::variable(self.dim, old_dim);
        self.constraints.push(LinearConstraint::eq(holder, rhs));
        // Forget the previous value of `var`, then move the held value into
        // its place.
        let work = std::mem::take(&mut self.constraints);
        match eliminate(work, var) {
            Some(mut next) => {
                for c in &mut next {
                    c.expr.swap_dims(var, old_dim);
                    c.expr.truncate_dims(old_dim);
                }
                self.dim = old_dim;
                self.constraints = next;
                self.canonicalize();
            }
            None => {
                self.dim = old_dim;
                self.set_empty();
            }
        }
    }

    /// Closes the polyhedron under time elapse: every point may advance by
    /// `λ * rates` for any `λ >= 0`.
    pub fn time_elapse_assign(&mut self, rates: &[Rational]) {
        assert_eq!(rates.len(), self.dim);
        if self.empty {
            return;
        }
        let old_dim = self.dim;
        // Substitute x_i ↦ x_i − λ·r_i, with λ a fresh dimension.
        for c in &mut self.constraints {
            let mut shift = Rational::zero();
            for (i, r) in rates.iter().enumerate() {
                shift -= c.expr.coeff(i) * r;
            }
            c.expr.add_dims(1);
            c.expr.set_coeff(old_dim, shift);
        }
        self.dim += 1;
        self.constraints.push(LinearConstraint {
            expr: LinearExpr::variable(self.dim, old_dim),
            rel: ConstraintRel::Ge,
        });
        self.remove_higher_dims(old_dim);
    }

    /// Does every point of the polyhedron satisfy `c`?
    pub fn entails(&self, c: &LinearConstraint) -> bool {
        if self.empty {
            return true;
        }
        let mut padded = c.clone();
        assert!(padded.dim() <= self.dim);
        padded.add_dims(self.dim - padded.dim());
        entailed_by(&self.constraints, self.dim, &padded)
    }

    /// Is `other` a subset of `self`?
    pub fn contains(&self, other: &Polyhedron) -> bool {
        assert_eq!(self.dim, other.dim);
        if other.empty {
            return true;
        }
        if self.empty {
            return false;
        }
        self.constraints.iter().all(|c| other.entails(c))
    }

    fn canonicalize(&mut self) {
        if self.empty {
            self.constraints.clear();
            return;
        }
        let mut work = Vec::with_capacity(self.constraints.len());
        for c in std::mem::take(&mut self.constraints) {
            match ground_status(&c) {
                Some(true) => {}
                Some(false) => {
                    self.set_empty();
                    return;
                }
                None => work.push(c),
            }
        }
        if !feasible(&work, self.dim) {
            self.set_empty();
            return;
        }
        // Promote inequalities whose reverse is entailed; a strict one cannot
        // be (the system is satisfiable).
        for i in 0..work.len() {
            if work[i].rel == ConstraintRel::Ge {
                let reverse = LinearConstraint {
                    expr: -work[i].expr.clone(),
                    rel: ConstraintRel::Ge,
                };
                if entailed_by(&work, self.dim, &reverse) {
                    work[i].rel = ConstraintRel::Eq;
                }
            }
        }
        let (mut eqs, mut ineqs): (Vec<_>, Vec<_>) =
            work.into_iter().partition(|c| c.rel == ConstraintRel::Eq);
        // Reduced echelon form for the equalities, substituted through the
        // inequalities so each pivot dimension occurs exactly once.
        let mut reduced: Vec<LinearConstraint> = Vec::new();
        for j in 0..self.dim {
            let Some(pos) = eqs.iter().position(|c| !c.expr.coeff(j).is_zero()) else {
                continue;
            };
            let mut pivot = eqs.swap_remove(pos);
            let inv = {
                let c = pivot.expr.coeff(j).clone();
                Rational::from_integer(1.into()) / c
            };
            pivot.expr = pivot.expr.scaled(&inv);
            let mut substitute = |c: &mut LinearConstraint| {
                let cj = c.expr.coeff(j).clone();
                if !cj.is_zero() {
                    c.expr.add_scaled(&pivot.expr, &-cj);
                }
            };
            eqs.iter_mut().for_each(&mut substitute);
            reduced.iter_mut().for_each(&mut substitute);
            ineqs.iter_mut().for_each(&mut substitute);
            reduced.push(pivot);
        }
        // Leftover equalities are ground by construction and true by
        // feasibility.
        ineqs.retain(|c| ground_status(c).is_none());
        // Irredundant inequalities: drop any entailed by the rest.
        let mut i = 0;
        while i < ineqs.len() {
            let candidate = ineqs.remove(i);
            let mut others = reduced.clone();
            others.extend(ineqs.iter().cloned());
            if entailed_by(&others, self.dim, &candidate) {
                continue;
            }
            ineqs.insert(i, candidate);
            i += 1;
        }
        // Scale each inequality so its leading coefficient is ±1.
        for c in &mut ineqs {
            let lead = c.expr.leading_dim().expect("ground inequality survived");
            let lead_coeff = c.expr.coeff(lead).clone();
            let inv = Rational::from_integer(1.into()) / lead_coeff.abs();
            c.expr = c.expr.scaled(&inv);
        }
        let mut result = reduced;
        result.extend(ineqs);
        result.sort();
        result.dedup();
        self.constraints = result;
    }
}

impl std::fmt::Display for Polyhedron {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.empty {
            return write!(f, "false");
        }
        if self.constraints.is_empty() {
            return write!(f, "true");
        }
        write!(f, "{{{}}}", display_joined(&self.constraints))
    }
}

impl std::fmt::Debug for Polyhedron {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Polyhedron[{}]({self})", self.dim)
    }
}
