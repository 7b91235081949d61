//! The per-transition constraint language and its three evaluation domains.
//!
//! Transitions carry string constraints, number constraints and updates.
//! Their syntax is shared where possible (string constraints are identical in
//! every mode); evaluation is defined against the valuation domain of the
//! selected monitoring mode.

pub mod number;
pub mod string;
pub mod timing;
pub mod update;

pub use number::{Cmp, ConcreteNumbers, NumberExpr, ScalarConstraint};
pub use string::{ConcreteStrings, StringAtom, StringConstraint, StringEntry, StringOp, SymbolicStrings};
pub use timing::{eval_clock_guard, ClockBound, ClockGuard, ClockVector, TimingGuard, TimingRel};
pub use update::{ConcreteUpdate, SymbolicUpdate, Update};

use crate::core::VariableId;

/// Failure raised while evaluating a transition's data constraints.
///
/// The monitors report these and treat the affected transition as disabled;
/// other configurations are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("cannot relate two unresolved string variables x{0} and x{1}")]
    UnresolvedStringPair(VariableId, VariableId),
}
