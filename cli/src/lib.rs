//! Front end of the monitoring engine: the signature and timed-word
//! readers, the two automaton surface syntaxes, the match printers and the
//! command-line driver.

// Disable clippy lint about module inception
#![allow(clippy::module_inception)]

pub mod ast;
pub mod cli;
pub mod dot;
pub mod lang;
pub mod printer;
pub mod signature;
pub mod words;
