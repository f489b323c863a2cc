//! Identifiers, number literals and string literals.

use probe_ir::{ExprGraph, IrsHints, Location, NodeId, Reg};
use probe_types::TypeId;

use super::{Operator, Progress};
use crate::error::{Arity, CodegenError, TypeErrorKind};
use crate::infer::InferCx;
use crate::insn::{Insn, Operand, Width};
use crate::lower::LowerCx;
use crate::maps::is_map_name;

fn ident_name(graph: &ExprGraph, node: NodeId) -> String {
    match graph.node(node).as_ident() {
        Some(name) => name.to_owned(),
        None => unreachable!("identifier hook on a non-identifier"),
    }
}

/// `@map` or a provider identifier.
pub struct Ident;

impl Operator for Ident {
    fn name(&self) -> &'static str {
        ":ident"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(0)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        if cx.ty(node).is_some() {
            return Ok(Progress::Done);
        }
        let name = ident_name(cx.graph, node);

        if is_map_name(&name) {
            // Map handles are loaded by whoever consumes them.
            return match cx.maps.lookup(&name) {
                Some(desc) => {
                    let ty = desc.ty;
                    cx.hint(node, IrsHints::VIRTUAL);
                    cx.done(node, ty)
                }
                None => Ok(Progress::Deferred),
            };
        }

        match cx.provider.ident_type(&name, cx.types) {
            Some(ty) => cx.done(node, ty),
            None => Err(cx.error(node, TypeErrorKind::UnknownIdent { name })),
        }
    }

    fn ir_post(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        let name = ident_name(cx.graph, node);
        if is_map_name(&name) {
            return Ok(());
        }

        cx.init_sym(node)?;
        let sym = cx.sym(node);
        cx.provider.emit_ident(&name, &sym, &mut cx.emit);
        Ok(())
    }
}

/// Integer literal.
pub struct Num;

fn num_value(cx: &LowerCx<'_>, node: NodeId) -> i64 {
    match cx.graph.node(node).as_num() {
        Some(v) => v,
        None => unreachable!("number hook on a non-number"),
    }
}

impl Operator for Num {
    fn name(&self) -> &'static str {
        ":num"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(0)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        if cx.ty(node).is_some() {
            return Ok(Progress::Done);
        }
        let value = cx.graph.node(node).as_num().unwrap_or_default();
        let ty = if i32::try_from(value).is_ok() {
            TypeId::INT
        } else {
            TypeId::S64
        };
        cx.done(node, ty)
    }

    fn ir_post(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        if cx.sym(node).irs.has(IrsHints::VIRTUAL) {
            return Ok(());
        }
        cx.init_sym(node)?;

        let value = num_value(cx, node);
        let sym = cx.sym(node);
        match sym.irs.loc {
            Location::Reg(r) => cx.emit.load_imm(r, value),
            Location::Stack(off) => {
                let Some(width) = Width::from_size(sym.irs.size) else {
                    unreachable!("{}-byte integer literal", sym.irs.size)
                };
                match i32::try_from(value) {
                    Ok(imm) => cx.emit.emit(Insn::Store {
                        width,
                        base: Reg::BP,
                        off,
                        src: Operand::Imm(imm),
                    }),
                    Err(_) => {
                        cx.emit.load_imm(Reg::R0, value);
                        cx.emit.reg_to_sym(&sym, Reg::R0);
                    }
                }
            }
            Location::Unassigned => {}
        }
        Ok(())
    }
}

/// String literal, stored NUL-terminated.
pub struct Str;

impl Operator for Str {
    fn name(&self) -> &'static str {
        ":str"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(0)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        if cx.ty(node).is_some() {
            return Ok(Progress::Done);
        }
        let len = cx.graph.node(node).as_str().map_or(0, str::len);
        let ty = cx.types.array_of(TypeId::CHAR, len + 1);
        cx.done(node, ty)
    }

    fn ir_post(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        if cx.sym(node).irs.has(IrsHints::VIRTUAL) {
            return Ok(());
        }
        cx.hint(node, IrsHints::STACK);
        cx.init_sym(node)?;

        let mut bytes = cx.graph.node(node).as_str().unwrap_or_default().as_bytes().to_vec();
        bytes.resize(cx.sym(node).irs.size, 0);
        let base = cx.stack_of(node);

        let mut pos = 0;
        while pos < bytes.len() {
            let at = base + pos as i16;
            let width = [Width::W, Width::H, Width::B]
                .into_iter()
                .find(|w| {
                    let n = w.bytes();
                    pos + n <= bytes.len() && i32::from(at).rem_euclid(n as i32) == 0
                })
                .unwrap_or(Width::B);

            let mut word = [0u8; 4];
            word[..width.bytes()].copy_from_slice(&bytes[pos..pos + width.bytes()]);
            let imm = match width {
                Width::B => i32::from(word[0]),
                Width::H => i32::from(u16::from_le_bytes([word[0], word[1]])),
                Width::W | Width::DW => i32::from_le_bytes(word),
            };

            cx.emit.emit(Insn::Store {
                width,
                base: Reg::BP,
                off: at,
                src: Operand::Imm(imm),
            });
            pos += width.bytes();
        }
        Ok(())
    }
}
