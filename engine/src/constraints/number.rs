//! Number expressions and constraints for the concrete and symbolic domains.

use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};

use crate::core::VariableId;
use crate::poly::{LinearConstraint, Polyhedron};

/// Comparison operators of the constraint language.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Cmp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl Cmp {
    pub fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Cmp::Lt => left < right,
            Cmp::Le => left <= right,
            Cmp::Eq => left == right,
            Cmp::Ne => left != right,
            Cmp::Ge => left >= right,
            Cmp::Gt => left > right,
        }
    }
}

impl std::fmt::Display for Cmp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Eq => "==",
            Cmp::Ne => "!=",
            Cmp::Ge => ">=",
            Cmp::Gt => ">",
        };
        write!(f, "{s}")
    }
}

/// A concrete-mode number expression.
#[derive(Clone, PartialEq, Debug)]
pub enum NumberExpr {
    Var(VariableId),
    Const(f64),
    Add(Box<NumberExpr>, Box<NumberExpr>),
    Sub(Box<NumberExpr>, Box<NumberExpr>),
}

impl NumberExpr {
    /// Evaluates against a concrete valuation; `None` when any referenced
    /// variable is unset.
    pub fn eval(&self, env: &[Option<f64>]) -> Option<f64> {
        match self {
            NumberExpr::Var(v) => env.get(*v).copied().flatten(),
            NumberExpr::Const(c) => Some(*c),
            NumberExpr::Add(a, b) => Some(a.eval(env)? + b.eval(env)?),
            NumberExpr::Sub(a, b) => Some(a.eval(env)? - b.eval(env)?),
        }
    }
}

/// Concrete-mode number constraint `expr ∼ bound`.
#[derive(Clone, PartialEq, Debug)]
pub struct ScalarConstraint {
    pub expr: NumberExpr,
    pub cmp: Cmp,
    pub bound: f64,
}

impl ScalarConstraint {
    /// A constraint referencing an unset variable is unsatisfiable.
    pub fn eval(&self, env: &[Option<f64>]) -> bool {
        match self.expr.eval(env) {
            Some(value) => self.cmp.holds(value, self.bound),
            None => false,
        }
    }
}

/// Concrete valuation of the number variables; `None` marks an unset slot.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ConcreteNumbers(pub Vec<Option<f64>>);

impl ConcreteNumbers {
    pub fn unset(count: usize) -> Self {
        ConcreteNumbers(vec![None; count])
    }
}

impl Eq for ConcreteNumbers {}

impl Hash for ConcreteNumbers {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for slot in &self.0 {
            match slot {
                None => state.write_u8(0),
                Some(v) => {
                    state.write_u8(1);
                    state.write_u64(v.to_bits());
                }
            }
        }
    }
}

impl Deref for ConcreteNumbers {
    type Target = Vec<Option<f64>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ConcreteNumbers {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Adds the symbolic constraints to the valuation polyhedron; the transition
/// fires only if the result stays nonempty.
pub fn restrict_symbolic(constraints: &[LinearConstraint], env: &mut Polyhedron) -> bool {
    env.add_constraints(constraints.iter().cloned());
    !env.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expression_evaluation() {
        let env = vec![Some(2.0), Some(3.0), None];
        let sum = NumberExpr::Add(Box::new(NumberExpr::Var(0)), Box::new(NumberExpr::Var(1)));
        assert_eq!(sum.eval(&env), Some(5.0));
        let with_unset = NumberExpr::Sub(Box::new(NumberExpr::Var(2)), Box::new(NumberExpr::Const(1.0)));
        assert_eq!(with_unset.eval(&env), None);
        assert_eq!(NumberExpr::Var(7).eval(&env), None);
    }

    #[test]
    fn unset_variable_makes_constraint_unsatisfiable() {
        let c = ScalarConstraint {
            expr: NumberExpr::Var(0),
            cmp: Cmp::Ne,
            bound: 1.0,
        };
        assert!(!c.eval(&[None]));
        assert!(c.eval(&[Some(2.0)]));
    }

    #[test]
    fn difference_against_zero() {
        // x0 != x1, encoded as (x0 - x1) != 0.
        let c = ScalarConstraint {
            expr: NumberExpr::Sub(Box::new(NumberExpr::Var(0)), Box::new(NumberExpr::Var(1))),
            cmp: Cmp::Ne,
            bound: 0.0,
        };
        assert!(c.eval(&[Some(100.0), Some(200.0)]));
        assert!(!c.eval(&[Some(200.0), Some(200.0)]));
    }

    #[test]
    fn concrete_numbers_hash_distinguishes_unset_from_zero() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(ConcreteNumbers(vec![None]));
        set.insert(ConcreteNumbers(vec![Some(0.0)]));
        assert_eq!(set.len(), 2);
        assert!(!set.insert(ConcreteNumbers(vec![Some(0.0)])));
    }

    #[test]
    fn symbolic_restriction_checks_emptiness() {
        use crate::core::Rational;
        use crate::poly::LinearExpr;
        let mut env = Polyhedron::universe(1);
        let ge_two = LinearConstraint::ge(
            LinearExpr::variable(1, 0),
            LinearExpr::constant(1, Rational::from_integer(2.into())),
        );
        assert!(restrict_symbolic(&[ge_two], &mut env));
        let lt_one = LinearConstraint::lt(
            LinearExpr::variable(1, 0),
            LinearExpr::constant(1, Rational::from_integer(1.into())),
        );
        assert!(!restrict_symbolic(&[lt_one], &mut env));
    }
}
