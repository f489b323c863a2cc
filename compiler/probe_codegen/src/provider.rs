//! Identifier provider.
//!
//! Identifiers other than maps belong to whatever attaches the probe: it
//! knows what `arg0` or `pid` mean at that attach point. The code generator
//! asks a [`Provider`] for their types during inference and for the code
//! that loads them during lowering.

use probe_ir::{Location, Reg, Symbol};
use probe_types::{TypeId, TypeRegistry};

use crate::emit::Emitter;
use crate::insn::{Insn, Operand, Width};

/// Types and loads non-map identifiers.
pub trait Provider {
    /// Type of `name`, or `None` if the identifier is unknown here.
    fn ident_type(&self, name: &str, types: &mut TypeRegistry) -> Option<TypeId>;

    /// Emit code that places the value of `name` into `sym`'s storage.
    ///
    /// The context pointer is in `r6`. Scratch registers `r0..r5` may be
    /// clobbered.
    fn emit_ident(&self, name: &str, sym: &Symbol, emit: &mut Emitter);
}

/// Provider for probes whose context block is an array of 64-bit
/// arguments: argument `i` is read from `ctx + 8 * i`.
///
/// Argument types must be register-sized.
#[derive(Clone, Debug, Default)]
pub struct ContextArgs {
    args: Vec<(String, TypeId)>,
}

impl ContextArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next argument.
    #[must_use]
    pub fn with_arg(mut self, name: impl Into<String>, ty: TypeId) -> Self {
        self.args.push((name.into(), ty));
        self
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.args.iter().position(|(n, _)| n == name)
    }
}

impl Provider for ContextArgs {
    fn ident_type(&self, name: &str, _types: &mut TypeRegistry) -> Option<TypeId> {
        self.position(name).map(|i| self.args[i].1)
    }

    fn emit_ident(&self, name: &str, sym: &Symbol, emit: &mut Emitter) {
        let Some(index) = self.position(name) else {
            unreachable!("identifier `{name}` was typed by another provider")
        };
        let off = (index * 8) as i16;

        match sym.irs.loc {
            Location::Reg(dst) => emit.emit(Insn::Load {
                width: Width::DW,
                dst,
                base: Reg::R6,
                off,
            }),
            Location::Stack(slot) => {
                let Some(width) = Width::from_size(sym.irs.size) else {
                    unreachable!("context argument `{name}` is not register-sized")
                };
                emit.emit(Insn::Load {
                    width: Width::DW,
                    dst: Reg::R0,
                    base: Reg::R6,
                    off,
                });
                emit.emit(Insn::Store {
                    width,
                    base: Reg::BP,
                    off: slot,
                    src: Operand::Reg(Reg::R0),
                });
            }
            Location::Unassigned => {}
        }
    }
}
