//! Online monitoring of timed data words against timed data automata.
//!
//! A *timed data word* is a stream of events, each carrying an action, string
//! and number payloads, and a timestamp. A *timed data automaton* is a timed
//! automaton whose transitions additionally carry string constraints, number
//! constraints and variable updates. The monitors in this crate consume one
//! event at a time, maintain the set of configurations the automaton may be
//! in, and report every accepting configuration as a match.
//!
//! Three monitoring modes share this semantics and differ only in what a
//! valuation is:
//!
//!  - [`automata::Boolean`]: concrete optional values, concrete clocks;
//!  - [`automata::DataParametric`]: symbolic strings (concrete value or
//!    exclusion set) and a convex polyhedron over the number variables;
//!  - [`automata::Parametric`]: additionally, symbolic timing parameters and
//!    polyhedral clock valuations, with closure under unobservable
//!    transitions between events.
//!
//! The crate is organized bottom-up: [`poly`] provides exact linear
//! arithmetic, [`constraints`] the per-mode constraint domains, [`automata`]
//! the automaton graph and the algebra used to assemble monitors from
//! expression-like specifications, and [`monitor`] the configuration-set
//! monitors themselves. Everything is single-threaded and synchronous; see
//! [`pipeline`] for the push-based event plumbing.

pub mod automata;
pub mod collections;
pub mod constraints;
pub mod core;
pub mod monitor;
pub mod pipeline;
pub mod poly;
