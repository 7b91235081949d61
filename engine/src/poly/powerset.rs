//! Finite disjunctions of polyhedra.

use crate::poly::Polyhedron;

/// A finite union of convex polyhedra of a common dimension.
///
/// Used when merging configurations: number valuations reached along
/// different branches are collected as disjuncts and reduced by containment
/// before being re-inserted into the configuration set.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Powerset {
    dim: usize,
    disjuncts: Vec<Polyhedron>,
}

impl Powerset {
    pub fn singleton(p: Polyhedron) -> Self {
        let dim = p.dim();
        let mut set = Powerset {
            dim,
            disjuncts: Vec::new(),
        };
        set.add_disjunct(p);
        set
    }

    pub fn add_disjunct(&mut self, p: Polyhedron) {
        assert_eq!(p.dim(), self.dim);
        if !p.is_empty() {
            self.disjuncts.push(p);
        }
    }

    pub fn len(&self) -> usize {
        self.disjuncts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disjuncts.is_empty()
    }

    /// Drops every disjunct contained in another one.
    pub fn pairwise_reduce(&mut self) {
        let mut kept: Vec<Polyhedron> = Vec::with_capacity(self.disjuncts.len());
        for p in self.disjuncts.drain(..) {
            if kept.iter().any(|k| k.contains(&p)) {
                continue;
            }
            kept.retain(|k| !p.contains(k));
            kept.push(p);
        }
        self.disjuncts = kept;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Polyhedron> {
        self.disjuncts.iter()
    }
}

impl IntoIterator for Powerset {
    type Item = Polyhedron;
    type IntoIter = std::vec::IntoIter<Polyhedron>;

    fn into_iter(self) -> Self::IntoIter {
        self.disjuncts.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Rational;
    use crate::poly::{LinearConstraint, LinearExpr};

    fn at_least(n: i64) -> Polyhedron {
        let mut p = Polyhedron::universe(1);
        p.add_constraint(LinearConstraint::ge(
            LinearExpr::variable(1, 0),
            LinearExpr::constant(1, Rational::from_integer(n.into())),
        ));
        p
    }

    #[test]
    fn reduce_drops_contained_disjuncts() {
        let mut set = Powerset::singleton(at_least(0));
        set.add_disjunct(at_least(5));
        set.add_disjunct(at_least(2));
        set.pairwise_reduce();
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap(), &at_least(0));
    }

    #[test]
    fn incomparable_disjuncts_survive() {
        let mut le = Polyhedron::universe(1);
        le.add_constraint(LinearConstraint::le(
            LinearExpr::variable(1, 0),
            LinearExpr::constant(1, Rational::from_integer(0.into())),
        ));
        let mut set = Powerset::singleton(at_least(1));
        set.add_disjunct(le);
        set.pairwise_reduce();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn empty_disjuncts_are_ignored() {
        let mut set = Powerset::singleton(Polyhedron::empty_space(1));
        assert!(set.is_empty());
        set.add_disjunct(at_least(3));
        assert_eq!(set.len(), 1);
    }
}
