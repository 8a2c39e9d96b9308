//! An embeddable Forth virtual machine.
//!
//! A `VM` owns a fixed arena of 16-bit cells holding its dictionary, data
//! stack and return stack. The host feeds it source text from a stream or a
//! string and reads its output from a writer:
//!
//! ```
//! use libforth::{Config, VM};
//!
//! let mut out = Vec::new();
//! {
//!     let mut vm = VM::new(Config::default(), std::io::empty(), &mut out).unwrap();
//!     vm.evaluate(": square dup * ; 3 square .").unwrap();
//! }
//! assert_eq!(out, b"9 ");
//! ```
//!
//! The first fault poisons a machine for good. Its registers and memory are
//! left as they were for inspection.

pub mod compiler;
pub mod config;
pub mod core;
pub mod dictionary;
pub mod dump;
pub mod env;
pub mod exception;
pub mod input;
pub mod memory;
pub mod output;
pub mod parser;
pub mod registers;
pub mod stack;
pub mod tools;
pub mod vm;
pub mod word;

pub use crate::config::Config;
pub use crate::exception::{Error, Exception};
pub use crate::memory::Cell;
pub use crate::registers::{Registers, State};
pub use crate::vm::VM;
