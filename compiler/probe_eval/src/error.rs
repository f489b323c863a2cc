use probe_codegen::{Insn, MapId};

/// A program did something the verifier-checked target would not allow,
/// or the machine was set up inconsistently.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("direct {op} of {size} bytes at {addr:#x} is outside safe memory")]
    UnsafeAccess {
        op: &'static str,
        addr: u64,
        size: usize,
    },

    #[error("map handle {0:#x} does not name a declared map")]
    UnknownMap(u64),

    #[error("register r{0} used as a map handle")]
    NotAMap(usize),

    #[error("map {map:?} expects {expected}-byte {what}, got {found}")]
    SizeMismatch {
        map: MapId,
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("write to the frame pointer in `{0}`")]
    FramePointerWrite(Insn),

    #[error("program fell off the end without `exit`")]
    FellOffEnd,
}
