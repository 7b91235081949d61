//! Variable updates, applied on transition firing.
//!
//! Assignments are applied in listed order, so later assignments observe the
//! writes of earlier ones.

use crate::constraints::number::ConcreteNumbers;
use crate::constraints::string::{deref_concrete, deref_symbolic, ConcreteStrings, StringAtom, SymbolicStrings};
use crate::core::VariableId;
use crate::poly::{LinearExpr, Polyhedron};

/// The update interface the automaton algebra relies on.
pub trait Update: Clone + Default + std::fmt::Debug {
    /// Appends `other`'s assignments after `self`'s.
    fn extend(&mut self, other: &Self);
}

/// Concrete-mode update: string slots are assigned atoms, number slots are
/// copied from other number slots.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct ConcreteUpdate {
    pub strings: Vec<(VariableId, StringAtom)>,
    pub numbers: Vec<(VariableId, VariableId)>,
}

impl Update for ConcreteUpdate {
    fn extend(&mut self, other: &Self) {
        self.strings.extend(other.strings.iter().cloned());
        self.numbers.extend(other.numbers.iter().cloned());
    }
}

impl ConcreteUpdate {
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.numbers.is_empty()
    }

    pub fn apply(&self, strings: &mut ConcreteStrings, numbers: &mut ConcreteNumbers) {
        for (target, atom) in &self.strings {
            let value = deref_concrete(atom, strings);
            strings[*target] = value;
        }
        for (target, source) in &self.numbers {
            let value = numbers[*source];
            numbers[*target] = value;
        }
    }
}

/// Symbolic-mode update: string slots are assigned atoms, number slots take
/// the affine image of a linear expression over the number variables.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct SymbolicUpdate {
    pub strings: Vec<(VariableId, StringAtom)>,
    pub numbers: Vec<(VariableId, LinearExpr)>,
}

impl Update for SymbolicUpdate {
    fn extend(&mut self, other: &Self) {
        self.strings.extend(other.strings.iter().cloned());
        self.numbers.extend(other.numbers.iter().cloned());
    }
}

impl SymbolicUpdate {
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.numbers.is_empty()
    }

    pub fn apply(&self, strings: &mut SymbolicStrings, numbers: &mut Polyhedron) {
        for (target, atom) in &self.strings {
            let value = deref_symbolic(atom, strings);
            strings[*target] = value;
        }
        for (target, expr) in &self.numbers {
            let mut expr = expr.clone();
            // The valuation may carry extra event-payload dimensions.
            expr.add_dims(numbers.dim() - expr.dim());
            numbers.affine_image(*target, &expr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::string::StringEntry;
    use crate::core::Rational;
    use crate::poly::LinearConstraint;

    #[test]
    fn concrete_updates_apply_in_order() {
        let update = ConcreteUpdate {
            strings: vec![(0, StringAtom::Var(1)), (1, StringAtom::Literal("done".into()))],
            numbers: vec![(0, 1), (1, 0)],
        };
        let mut strings: ConcreteStrings = vec![None, Some("payload".into())];
        let mut numbers = ConcreteNumbers(vec![Some(1.0), Some(2.0)]);
        update.apply(&mut strings, &mut numbers);
        assert_eq!(strings[0].as_deref(), Some("payload"));
        assert_eq!(strings[1].as_deref(), Some("done"));
        // The second assignment reads the first one's write.
        assert_eq!(numbers.0, vec![Some(2.0), Some(2.0)]);
    }

    #[test]
    fn symbolic_string_update_copies_entries() {
        let update = SymbolicUpdate {
            strings: vec![(0, StringAtom::Var(1))],
            numbers: vec![],
        };
        let mut strings: SymbolicStrings =
            vec![StringEntry::default(), StringEntry::Concrete("v".into())];
        let mut numbers = Polyhedron::universe(0);
        update.apply(&mut strings, &mut numbers);
        assert_eq!(strings[0], StringEntry::Concrete("v".into()));
    }

    #[test]
    fn symbolic_number_update_takes_affine_image() {
        // x0 := x1 with a payload value pinned in dimension 1.
        let update = SymbolicUpdate {
            strings: vec![],
            numbers: vec![(0, LinearExpr::variable(2, 1))],
        };
        let mut strings: SymbolicStrings = vec![];
        let mut numbers = Polyhedron::universe(2);
        numbers.add_constraint(LinearConstraint::eq(
            LinearExpr::variable(2, 1),
            LinearExpr::constant(2, Rational::from_integer(200.into())),
        ));
        update.apply(&mut strings, &mut numbers);
        assert!(numbers.entails(&LinearConstraint::eq(
            LinearExpr::variable(2, 0),
            LinearExpr::constant(2, Rational::from_integer(200.into())),
        )));
    }
}
