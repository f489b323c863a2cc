//! Diagnostic records for the probe compiler.
//!
//! Compilation phases never print. They return error values that convert to
//! a [`Diagnostic`] on request: an [`ErrorCode`] for searchability, a
//! message naming the offending expression and types, and a primary
//! [`Label`] at the node's span. Rendering is left to the embedder.

mod diagnostic;
mod error_code;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
