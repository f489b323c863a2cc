//! Lowering of a typed graph to instructions.
//!
//! A single depth-first walk: `ir_pre` on the way down, `ir_post` on the
//! way up, arguments in order. The body is framed by a prologue that saves
//! the context pointer in `r6` and an epilogue that returns zero; the shared
//! abort label sits on the final `exit`, so a failed helper's status in
//! `r0` becomes the return value.

use probe_ir::{ExprGraph, IrsHints, NodeId, Reg, Symbol};
use probe_types::{TypeId, TypeRegistry};
use smallvec::SmallVec;

use crate::emit::{Emitter, Program};
use crate::error::CodegenError;
use crate::insn::{Insn, Operand};
use crate::maps::{MapId, MapTable};
use crate::ops::Registry;
use crate::provider::Provider;
use crate::stack::ensure_sufficient_stack;
use crate::storage::{Storage, StorageError};
use crate::CodegenConfig;

/// State available to codegen hooks.
pub struct LowerCx<'a> {
    pub graph: &'a mut ExprGraph,
    pub types: &'a TypeRegistry,
    pub maps: &'a MapTable,
    pub provider: &'a dyn Provider,
    pub config: &'a CodegenConfig,
    pub storage: Storage,
    pub emit: Emitter,
    used_maps: Vec<MapId>,
}

impl<'a> LowerCx<'a> {
    pub fn new(
        graph: &'a mut ExprGraph,
        types: &'a TypeRegistry,
        maps: &'a MapTable,
        provider: &'a dyn Provider,
        config: &'a CodegenConfig,
    ) -> Self {
        Self {
            graph,
            types,
            maps,
            provider,
            config,
            storage: Storage::new(config.max_stack),
            emit: Emitter::new(config.check_helper_status),
            used_maps: Vec::new(),
        }
    }

    #[inline]
    pub fn sym(&self, node: NodeId) -> Symbol {
        *self.graph.sym(node)
    }

    /// Resolved type of `node`.
    ///
    /// # Panics
    /// Panics if inference did not type `node`; lowering only runs on a
    /// fully typed graph.
    #[inline]
    #[track_caller]
    pub fn ty(&self, node: NodeId) -> TypeId {
        match self.graph.sym(node).ty {
            Some(ty) => ty,
            None => unreachable!("lowering untyped node {node:?}"),
        }
    }

    pub fn size_of(&self, node: NodeId) -> usize {
        self.types.sizeof(self.ty(node)).unwrap_or(0)
    }

    pub fn hint(&mut self, node: NodeId, hints: IrsHints) {
        self.graph.sym_mut(node).irs.hints |= hints;
    }

    /// Pin `node` to `r10 + off`, forcing it onto the stack.
    pub fn pin(&mut self, node: NodeId, off: i16) {
        let irs = &mut self.graph.sym_mut(node).irs;
        irs.hints |= IrsHints::STACK;
        irs.stack = Some(off);
    }

    /// Stack offset of `node`.
    ///
    /// # Panics
    /// Panics if `node` does not live on the stack.
    #[track_caller]
    pub fn stack_of(&self, node: NodeId) -> i16 {
        match self.graph.sym(node).irs.stack_offset() {
            Some(off) => off,
            None => unreachable!("{node:?} is expected on the stack"),
        }
    }

    fn storage_error(&self, node: NodeId, err: StorageError) -> CodegenError {
        let StorageError::StackExhausted {
            requested,
            used,
            max,
        } = err;
        CodegenError::StackExhausted {
            node,
            span: self.graph.span(node),
            requested,
            used,
            max,
        }
    }

    /// Give `node` storage according to its hints.
    pub fn init_sym(&mut self, node: NodeId) -> Result<(), CodegenError> {
        let ty = self.ty(node);
        let sym = self.graph.sym_mut(node);
        self.storage
            .init_sym(sym, ty, self.types)
            .map_err(|err| self.storage_error(node, err))
    }

    /// Reserve `size` fresh stack bytes on behalf of `node`.
    pub fn reserve(&mut self, node: NodeId, size: usize) -> Result<i16, CodegenError> {
        self.storage
            .reserve(size)
            .map_err(|err| self.storage_error(node, err))
    }

    /// Load the handle of the map named by `node` into `dst`.
    pub fn ldmap(&mut self, dst: Reg, node: NodeId) {
        let Some(name) = self.graph.node(node).as_ident() else {
            unreachable!("map operand is not an identifier")
        };
        let Some(desc) = self.maps.lookup(name) else {
            unreachable!("map {name} was typed but never materialized")
        };
        let id = desc.id;
        if !self.used_maps.contains(&id) {
            self.used_maps.push(id);
        }
        self.emit.ldmap(dst, id);
    }
}

fn walk(registry: &Registry, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
    ensure_sufficient_stack(|| {
        let op = registry.dispatch(cx.graph, node)?;

        tracing::trace!(op = op.name(), ?node, "ir_pre");
        op.ir_pre(cx, node)?;

        let args: SmallVec<[NodeId; 4]> = cx.graph.args(node).iter().copied().collect();
        for arg in args {
            walk(registry, cx, arg)?;
        }

        tracing::trace!(op = op.name(), ?node, "ir_post");
        op.ir_post(cx, node)
    })
}

/// Lower the typed body at `root` to a finished program, plus the maps it
/// references.
pub fn lower(
    registry: &Registry,
    mut cx: LowerCx<'_>,
    root: Option<NodeId>,
) -> Result<(Program, Vec<MapId>), CodegenError> {
    // prologue
    cx.emit.mov(Reg::R6, Operand::Reg(Reg::R1));

    if let Some(root) = root {
        walk(registry, &mut cx, root)?;
    }

    // epilogue
    cx.emit.mov(Reg::R0, Operand::Imm(0));
    let abort = cx.emit.abort_label();
    cx.emit.place_label(abort);
    cx.emit.emit(Insn::Exit);

    let stack_size = cx.storage.frame.used();
    tracing::debug!(
        insns = cx.emit.insns().len(),
        stack = stack_size,
        maps = cx.used_maps.len(),
        "lowered probe body"
    );

    let program = cx.emit.finish(stack_size)?;
    Ok((program, cx.used_maps))
}
