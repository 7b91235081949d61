//! Exact linear arithmetic: expressions, constraints, convex polyhedra and
//! finite disjunctions thereof.
//!
//! The symbolic monitoring modes describe number valuations, clock valuations
//! and timing guards as convex polyhedra over arbitrary-precision rationals,
//! with both strict and non-strict inequalities. [`Polyhedron`] keeps its
//! constraint system in a canonical form at all times, so structural equality
//! and hashing coincide with set equality and configurations can be
//! deduplicated in hash sets.

mod expr;
mod polyhedron;
mod powerset;

pub use expr::LinearExpr;
pub use polyhedron::{ConstraintRel, LinearConstraint, Polyhedron};
pub use powerset::Powerset;
