//! String atoms, constraints and the two string-valuation domains.

use crate::constraints::EvalError;
use crate::core::VariableId;

/// A string variable reference or a literal.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum StringAtom {
    Var(VariableId),
    Literal(String),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StringOp {
    Eq,
    Ne,
}

/// `left == right` or `left != right` over string atoms.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct StringConstraint {
    pub left: StringAtom,
    pub right: StringAtom,
    pub op: StringOp,
}

impl StringConstraint {
    pub fn new(left: StringAtom, op: StringOp, right: StringAtom) -> Self {
        StringConstraint { left, op, right }
    }
}

/// Concrete valuation: each variable is either unset or holds a literal.
///
/// The single slot does double duty: `==` against an unset variable binds it,
/// `!=` against an unset variable records the disabled literal in the same
/// slot.
pub type ConcreteStrings = Vec<Option<String>>;

/// One entry of a symbolic string valuation.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum StringEntry {
    /// Bound to a concrete value.
    Concrete(String),
    /// Any value except the listed ones; kept sorted and deduplicated. An
    /// empty list means unconstrained.
    Excluded(Vec<String>),
}

impl Default for StringEntry {
    fn default() -> Self {
        StringEntry::Excluded(Vec::new())
    }
}

/// Symbolic valuation: one [`StringEntry`] per variable.
pub type SymbolicStrings = Vec<StringEntry>;

fn insert_sorted(values: &mut Vec<String>, value: &str) {
    match values.binary_search_by(|v| v.as_str().cmp(value)) {
        Ok(_) => {}
        Err(pos) => values.insert(pos, value.to_string()),
    }
}

/// An atom after dereferencing against a valuation: either still a variable
/// or a concrete string.
enum Resolved {
    Var(VariableId),
    Str(String),
}

fn resolve_concrete(atom: &StringAtom, env: &ConcreteStrings) -> Resolved {
    match atom {
        StringAtom::Literal(s) => Resolved::Str(s.clone()),
        StringAtom::Var(v) => match env.get(*v) {
            Some(Some(s)) => Resolved::Str(s.clone()),
            _ => Resolved::Var(*v),
        },
    }
}

fn resolve_symbolic(atom: &StringAtom, env: &SymbolicStrings) -> Resolved {
    match atom {
        StringAtom::Literal(s) => Resolved::Str(s.clone()),
        StringAtom::Var(v) => match env.get(*v) {
            Some(StringEntry::Concrete(s)) => Resolved::Str(s.clone()),
            _ => Resolved::Var(*v),
        },
    }
}

/// Evaluates the constraint against a concrete valuation, binding or
/// disabling variables as a side effect. Run on a copy of the environment.
pub fn eval_concrete(c: &StringConstraint, env: &mut ConcreteStrings) -> Result<bool, EvalError> {
    let left = resolve_concrete(&c.left, env);
    let right = resolve_concrete(&c.right, env);
    match (c.op, left, right) {
        (_, Resolved::Var(a), Resolved::Var(b)) => Err(EvalError::UnresolvedStringPair(a, b)),
        (StringOp::Eq, Resolved::Str(a), Resolved::Str(b)) => Ok(a == b),
        (StringOp::Eq, Resolved::Var(v), Resolved::Str(s))
        | (StringOp::Eq, Resolved::Str(s), Resolved::Var(v)) => {
            // The variable is unset, so the literal is not disabled.
            env[v] = Some(s);
            Ok(true)
        }
        (StringOp::Ne, Resolved::Str(a), Resolved::Str(b)) => Ok(a != b),
        (StringOp::Ne, Resolved::Var(v), Resolved::Str(s))
        | (StringOp::Ne, Resolved::Str(s), Resolved::Var(v)) => {
            env[v] = Some(s);
            Ok(true)
        }
    }
}

/// Evaluates the constraint against a symbolic valuation, binding variables
/// or extending exclusion sets as a side effect. Run on a copy.
pub fn eval_symbolic(c: &StringConstraint, env: &mut SymbolicStrings) -> Result<bool, EvalError> {
    let left = resolve_symbolic(&c.left, env);
    let right = resolve_symbolic(&c.right, env);
    match (c.op, left, right) {
        (_, Resolved::Var(a), Resolved::Var(b)) => Err(EvalError::UnresolvedStringPair(a, b)),
        (StringOp::Eq, Resolved::Str(a), Resolved::Str(b)) => Ok(a == b),
        (StringOp::Eq, Resolved::Var(v), Resolved::Str(s))
        | (StringOp::Eq, Resolved::Str(s), Resolved::Var(v)) => {
            let StringEntry::Excluded(disabled) = &env[v] else {
                unreachable!("a bound variable resolves to its value");
            };
            if disabled.binary_search(&s).is_ok() {
                Ok(false)
            } else {
                env[v] = StringEntry::Concrete(s);
                Ok(true)
            }
        }
        (StringOp::Ne, Resolved::Str(a), Resolved::Str(b)) => Ok(a != b),
        (StringOp::Ne, Resolved::Var(v), Resolved::Str(s))
        | (StringOp::Ne, Resolved::Str(s), Resolved::Var(v)) => {
            let StringEntry::Excluded(disabled) = &mut env[v] else {
                unreachable!("a bound variable resolves to its value");
            };
            insert_sorted(disabled, &s);
            Ok(true)
        }
    }
}

/// Dereferences an atom for an update's right-hand side.
pub fn deref_concrete(atom: &StringAtom, env: &ConcreteStrings) -> Option<String> {
    match atom {
        StringAtom::Literal(s) => Some(s.clone()),
        StringAtom::Var(v) => env.get(*v).cloned().flatten(),
    }
}

/// Dereferences an atom for an update's right-hand side; a symbolic variable
/// is copied entry-wise.
pub fn deref_symbolic(atom: &StringAtom, env: &SymbolicStrings) -> StringEntry {
    match atom {
        StringAtom::Literal(s) => StringEntry::Concrete(s.clone()),
        StringAtom::Var(v) => env[*v].clone(),
    }
}

/// Merges two symbolic valuations into one describing exactly the union of
/// the values they allow, when such a valuation exists.
///
/// Per index: equal entries merge to themselves; `x ∉ S` and `x ∉ S'` merge
/// to `x ∉ S ∩ S'`; `x == s` and `x ∉ S` with `s ∈ S` merge to
/// `x ∉ S \ {s}`; anything else fails.
pub fn merge(left: &SymbolicStrings, right: &SymbolicStrings) -> Option<SymbolicStrings> {
    assert_eq!(left.len(), right.len());
    let mut result = Vec::with_capacity(left.len());
    for (l, r) in left.iter().zip(right) {
        if l == r {
            result.push(l.clone());
            continue;
        }
        match (l, r) {
            (StringEntry::Concrete(_), StringEntry::Concrete(_)) => return None,
            (StringEntry::Concrete(value), StringEntry::Excluded(excluded))
            | (StringEntry::Excluded(excluded), StringEntry::Concrete(value)) => {
                let pos = excluded.binary_search(value).ok()?;
                let mut remaining = excluded.clone();
                remaining.remove(pos);
                result.push(StringEntry::Excluded(remaining));
            }
            (StringEntry::Excluded(a), StringEntry::Excluded(b)) => {
                let intersection = a.iter().filter(|s| b.binary_search(s).is_ok()).cloned().collect();
                result.push(StringEntry::Excluded(intersection));
            }
        }
    }
    Some(result)
}

/// Greedily merges the valuations in place, keeping one representative per
/// mergeable group.
pub fn pairwise_reduce(valuations: &mut Vec<SymbolicStrings>) {
    let mut result: Vec<SymbolicStrings> = Vec::with_capacity(valuations.len());
    for v in valuations.drain(..) {
        let mut merged = false;
        for r in &mut result {
            if let Some(m) = merge(&v, r) {
                *r = m;
                merged = true;
                break;
            }
        }
        if !merged {
            result.push(v);
        }
    }
    *valuations = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> StringAtom {
        StringAtom::Literal(s.to_string())
    }

    fn var(v: VariableId) -> StringAtom {
        StringAtom::Var(v)
    }

    fn excluded(items: &[&str]) -> StringEntry {
        let mut v: Vec<String> = items.iter().map(|s| s.to_string()).collect();
        v.sort();
        StringEntry::Excluded(v)
    }

    #[test]
    fn concrete_eq_binds_unset_variable() {
        let c = StringConstraint::new(var(0), StringOp::Eq, lit("a"));
        let mut env: ConcreteStrings = vec![None];
        assert_eq!(eval_concrete(&c, &mut env), Ok(true));
        assert_eq!(env[0].as_deref(), Some("a"));
    }

    #[test]
    fn concrete_eq_on_bound_variable_compares() {
        let c = StringConstraint::new(var(0), StringOp::Eq, lit("a"));
        let mut env: ConcreteStrings = vec![Some("a".to_string())];
        assert_eq!(eval_concrete(&c, &mut env), Ok(true));
        env[0] = Some("b".to_string());
        assert_eq!(eval_concrete(&c, &mut env), Ok(false));
    }

    #[test]
    fn concrete_ne_disables() {
        let c = StringConstraint::new(var(0), StringOp::Ne, lit("a"));
        let mut env: ConcreteStrings = vec![None];
        assert_eq!(eval_concrete(&c, &mut env), Ok(true));
        assert_eq!(env[0].as_deref(), Some("a"));
    }

    #[test]
    fn two_unresolved_variables_are_rejected() {
        let c = StringConstraint::new(var(0), StringOp::Eq, var(1));
        let mut env: ConcreteStrings = vec![None, None];
        assert_eq!(eval_concrete(&c, &mut env), Err(EvalError::UnresolvedStringPair(0, 1)));
        // A bound left side resolves first, so no error.
        let mut env: ConcreteStrings = vec![Some("x".into()), None];
        assert_eq!(eval_concrete(&c, &mut env), Ok(true));
        assert_eq!(env[1].as_deref(), Some("x"));
    }

    #[test]
    fn symbolic_eq_respects_exclusions() {
        let c = StringConstraint::new(var(0), StringOp::Eq, lit("a"));
        let mut env: SymbolicStrings = vec![excluded(&["a", "b"])];
        assert_eq!(eval_symbolic(&c, &mut env), Ok(false));
        let mut env: SymbolicStrings = vec![excluded(&["b"])];
        assert_eq!(eval_symbolic(&c, &mut env), Ok(true));
        assert_eq!(env[0], StringEntry::Concrete("a".to_string()));
    }

    #[test]
    fn symbolic_ne_extends_exclusion_set() {
        let c = StringConstraint::new(lit("a"), StringOp::Ne, var(0));
        let mut env: SymbolicStrings = vec![excluded(&["b"])];
        assert_eq!(eval_symbolic(&c, &mut env), Ok(true));
        assert_eq!(env[0], excluded(&["a", "b"]));
        // Inserting again does not duplicate.
        assert_eq!(eval_symbolic(&c, &mut env), Ok(true));
        assert_eq!(env[0], excluded(&["a", "b"]));
    }

    #[test]
    fn merge_intersects_exclusion_sets() {
        let left = vec![excluded(&["a", "b"])];
        let right = vec![excluded(&["b", "c"])];
        assert_eq!(merge(&left, &right), Some(vec![excluded(&["b"])]));
    }

    #[test]
    fn merge_concrete_into_exclusion() {
        let left = vec![StringEntry::Concrete("a".to_string())];
        let right = vec![excluded(&["a", "b"])];
        assert_eq!(merge(&left, &right), Some(vec![excluded(&["b"])]));
        // The union really is "anything but b": `a` comes from the left
        // valuation, everything else from the right.
        let stranger = vec![StringEntry::Concrete("c".to_string())];
        assert_eq!(merge(&stranger, &right), None);
    }

    #[test]
    fn merge_distinct_concretes_fails() {
        let left = vec![StringEntry::Concrete("a".to_string())];
        let right = vec![StringEntry::Concrete("b".to_string())];
        assert_eq!(merge(&left, &right), None);
        assert_eq!(merge(&left, &left), Some(left.clone()));
    }

    #[test]
    fn reduce_merges_greedily() {
        let mut vals = vec![
            vec![excluded(&["a", "b"])],
            vec![excluded(&["b", "c"])],
            vec![StringEntry::Concrete("z".to_string())],
        ];
        pairwise_reduce(&mut vals);
        assert_eq!(
            vals,
            vec![vec![excluded(&["b"])], vec![StringEntry::Concrete("z".to_string())]]
        );
    }
}
