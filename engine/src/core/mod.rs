//! Fundamental identifiers and numeric types shared across the engine.

mod num;

pub use num::{format_decimal, parse_decimal, to_f64, NumError, Rational};

/// Identifier of an event kind.
///
/// Actions are assigned densely from 0 by the signature; the single reserved
/// value is [`Action::UNOBSERVABLE`], the label of transitions that fire
/// between observed events.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Action(pub u32);

impl Action {
    /// Label of unobservable transitions.
    pub const UNOBSERVABLE: Action = Action(127);

    pub fn is_unobservable(self) -> bool {
        self == Self::UNOBSERVABLE
    }
}

impl From<u32> for Action {
    fn from(id: u32) -> Self {
        Action(id)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into one of the per-automaton variable spaces (strings, numbers).
pub type VariableId = usize;

/// Index of a clock variable.
pub type ClockId = usize;
