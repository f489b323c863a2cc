//! Reference interpreter for compiled probe programs.
//!
//! Runs a [`Program`](probe_codegen::Program) against a modelled address
//! space so the semantics of generated code can be checked without the real
//! execution target.
//!
//! # Address space
//!
//! | Region        | Direct load | Direct store | Helper read |
//! |---------------|:-----------:|:------------:|:-----------:|
//! | stack         |      x      |      x       |      x      |
//! | context block |      x      |              |      x      |
//! | map values    |      x      |      x       |      x      |
//! | target memory |             |              |      x      |
//!
//! Target memory stands for arbitrary kernel or user memory: generated code
//! may only reach it through the bounds-checked read helpers, so a direct
//! load from it is an error here just as the verifier would reject it.
//!
//! The stack is filled with [`STACK_POISON`] before every run, which makes
//! reads of bytes the program never wrote visible in test results.

mod error;
mod machine;
mod maps;
mod memory;

pub use error::EvalError;
pub use machine::Machine;
pub use maps::MapStore;
pub use memory::{Memory, RegionKind};

/// Byte the stack is filled with before a run.
pub const STACK_POISON: u8 = 0xAA;

/// Value left in `r1..r5` after a helper call.
pub const CLOBBER: u64 = 0xDEAD_BEEF_DEAD_BEEF;

/// `-EFAULT`, returned by the read helpers on a bad source address.
pub const EFAULT: i64 = -14;

/// `-ENOENT`, returned when deleting an absent key.
pub const ENOENT: i64 = -2;
