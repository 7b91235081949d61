//! Timing guards over concrete clock vectors and (parameter, clock)
//! polyhedra.

use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};

use crate::core::ClockId;
use crate::poly::Polyhedron;

/// Comparison in an atomic clock constraint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TimingRel {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl TimingRel {
    pub fn holds(self, value: f64, bound: f64) -> bool {
        match self {
            TimingRel::Lt => value < bound,
            TimingRel::Le => value <= bound,
            TimingRel::Eq => value == bound,
            TimingRel::Ge => value >= bound,
            TimingRel::Gt => value > bound,
        }
    }
}

/// Atomic clock constraint `x<clock> ∼ bound`.
#[derive(Clone, PartialEq, Debug)]
pub struct ClockBound {
    pub clock: ClockId,
    pub rel: TimingRel,
    pub bound: f64,
}

impl ClockBound {
    pub fn satisfied(&self, clocks: &[f64]) -> bool {
        self.rel.holds(clocks[self.clock], self.bound)
    }
}

/// Conjunction of atomic clock constraints; the concrete-time guard domain.
pub type ClockGuard = Vec<ClockBound>;

pub fn eval_clock_guard(guard: &ClockGuard, clocks: &[f64]) -> bool {
    guard.iter().all(|g| g.satisfied(clocks))
}

/// The primitive guard operators required by the automaton algebra.
pub trait TimingGuard: Clone + std::fmt::Debug {
    /// The guard satisfied by every valuation.
    fn universe(params: usize, clocks: usize) -> Self;

    /// Prepends `width` fresh clock dimensions (after the parameter block),
    /// so the guard refers to the later clock indices.
    fn shift_clocks(&self, params: usize, width: usize) -> Self;

    /// Conjunction.
    fn conjoin(&self, other: &Self) -> Self;

    /// Extends or truncates the guard to exactly `clocks` clock dimensions.
    fn adjust_clock_dimension(&mut self, params: usize, clocks: usize);
}

impl TimingGuard for ClockGuard {
    fn universe(_params: usize, _clocks: usize) -> Self {
        Vec::new()
    }

    fn shift_clocks(&self, _params: usize, width: usize) -> Self {
        self.iter()
            .map(|b| ClockBound {
                clock: b.clock + width,
                rel: b.rel,
                bound: b.bound,
            })
            .collect()
    }

    fn conjoin(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.extend(other.iter().cloned());
        result
    }

    fn adjust_clock_dimension(&mut self, _params: usize, clocks: usize) {
        self.retain(|b| b.clock < clocks);
    }
}

impl TimingGuard for Polyhedron {
    fn universe(params: usize, clocks: usize) -> Self {
        Polyhedron::universe(params + clocks)
    }

    fn shift_clocks(&self, params: usize, width: usize) -> Self {
        let mut result = self.clone();
        result.insert_dims(params, width);
        result
    }

    fn conjoin(&self, other: &Self) -> Self {
        let mut left = self.clone();
        let mut right = other.clone();
        if left.dim() < right.dim() {
            left.add_dims_embed(right.dim() - left.dim());
        } else if right.dim() < left.dim() {
            right.add_dims_embed(left.dim() - right.dim());
        }
        left.intersection_assign(&right);
        left
    }

    fn adjust_clock_dimension(&mut self, params: usize, clocks: usize) {
        let target = params + clocks;
        if self.dim() < target {
            self.add_dims_embed(target - self.dim());
        } else if self.dim() > target {
            self.remove_higher_dims(target);
        }
    }
}

/// Concrete clock valuation. Time passes uniformly for every clock.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ClockVector(pub Vec<f64>);

impl ClockVector {
    pub fn zeroed(count: usize) -> Self {
        ClockVector(vec![0.0; count])
    }

    pub fn elapse(&mut self, delta: f64) {
        for c in &mut self.0 {
            *c += delta;
        }
    }

    pub fn reset(&mut self, clock: ClockId) {
        self.0[clock] = 0.0;
    }
}

impl Eq for ClockVector {}

impl Hash for ClockVector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in &self.0 {
            state.write_u64(c.to_bits());
        }
    }
}

impl Deref for ClockVector {
    type Target = Vec<f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ClockVector {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::{LinearConstraint, LinearExpr};

    fn bound(clock: ClockId, rel: TimingRel, value: f64) -> ClockBound {
        ClockBound {
            clock,
            rel,
            bound: value,
        }
    }

    #[test]
    fn guard_evaluation() {
        let guard = vec![bound(0, TimingRel::Ge, 1.1), bound(0, TimingRel::Lt, 1.2)];
        assert!(eval_clock_guard(&guard, &[1.1]));
        assert!(eval_clock_guard(&guard, &[1.15]));
        assert!(!eval_clock_guard(&guard, &[1.2]));
        assert!(!eval_clock_guard(&guard, &[1.0]));
        assert!(eval_clock_guard(&ClockGuard::universe(0, 1), &[42.0]));
    }

    #[test]
    fn equality_guard() {
        let guard = vec![bound(0, TimingRel::Eq, 3.0)];
        assert!(eval_clock_guard(&guard, &[3.0]));
        assert!(!eval_clock_guard(&guard, &[3.5]));
    }

    #[test]
    fn shift_and_adjust() {
        let guard = vec![bound(0, TimingRel::Le, 5.0), bound(1, TimingRel::Gt, 2.0)];
        let shifted = guard.shift_clocks(0, 3);
        assert_eq!(shifted[0].clock, 3);
        assert_eq!(shifted[1].clock, 4);
        let mut truncated = guard.clone();
        truncated.adjust_clock_dimension(0, 1);
        assert_eq!(truncated.len(), 1);
        assert_eq!(truncated[0].clock, 0);
    }

    #[test]
    fn polyhedral_shift_keeps_parameters() {
        // One parameter, one clock: p0 <= x0.
        let mut guard = Polyhedron::universe(2);
        guard.add_constraint(LinearConstraint::le(
            LinearExpr::variable(2, 0),
            LinearExpr::variable(2, 1),
        ));
        let shifted = guard.shift_clocks(1, 1);
        assert_eq!(shifted.dim(), 3);
        // The clock moved from dimension 1 to dimension 2.
        assert!(shifted.entails(&LinearConstraint::le(
            LinearExpr::variable(3, 0),
            LinearExpr::variable(3, 2),
        )));
    }

    #[test]
    fn clock_vector_elapse_and_reset() {
        let mut clocks = ClockVector::zeroed(2);
        clocks.elapse(1.5);
        assert_eq!(*clocks, vec![1.5, 1.5]);
        clocks.reset(0);
        assert_eq!(*clocks, vec![0.0, 1.5]);
    }
}
