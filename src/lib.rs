//! # hsp-lang
//!
//! An interpreter for a small HSP-family scripting language.
//!
//! A script runs through a textual preprocessor, a tokenizer, a
//! recursive-descent parser, a bytecode generator, and finally a stack
//! virtual machine that mutates a shared variable store. The dynamic
//! types are integer, floating point, and string; variables are
//! one-dimensional typed arrays with an implicit element zero.
//!
//! ```no_run
//! use hsp::mach::{LoadOptions, Machine};
//! use hsp::term::StdConsole;
//!
//! let mut machine = Machine::load("mes \"hello\"", &LoadOptions::default()).unwrap();
//! machine.execute(&mut StdConsole::new()).unwrap();
//! ```

#[macro_use]
pub mod lang;
pub mod mach;
pub mod term;
