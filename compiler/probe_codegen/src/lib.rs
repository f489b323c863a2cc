//! Expression code generation for probe bodies.
//!
//! Takes an [`ExprGraph`] and turns it into a [`Program`] for the
//! verifier-checked execution target.
//!
//! # Pipeline
//!
//! 1. **validate**: operators exist, arities fit, shapes are legal
//! 2. **rewrite**: desugar (`p->m` becomes `(*p).m`)
//! 3. **infer**: fixed-point, bidirectional type inference
//! 4. **lower**: storage assignment and instruction selection
//! 5. **finish**: resolve labels, check that every jump goes forward
//!
//! # Design
//!
//! A [`Session`] owns everything that outlives one probe body: the type
//! registry, the map table, the configuration and the operator registry.
//! Compiling is all-or-nothing with respect to the map table: maps
//! materialized by a body that fails to compile are forgotten again.
//!
//! # Tracing
//!
//! Enable with `RUST_LOG=probe_codegen=debug` after calling
//! [`init_tracing`].

mod config;
mod emit;
mod error;
mod infer;
mod insn;
mod lower;
mod maps;
mod ops;
mod provider;
mod rewrite;
mod stack;
mod storage;
mod validate;

use std::sync::Once;

use probe_ir::ExprGraph;
use probe_types::TypeRegistry;

pub use config::CodegenConfig;
pub use emit::{EmitError, Emitter, Program};
pub use error::{
    Arity, CodegenError, CodegenWarning, StaticErrorKind, TypeError, TypeErrorKind,
};
pub use infer::{InferCx, InferStats};
pub use insn::{AluOp, Cond, Helper, Insn, Label, Operand, Width};
pub use lower::LowerCx;
pub use maps::{is_map_name, Checkpoint, MapDescriptor, MapId, MapSpec, MapTable};
pub use ops::{Builtin, Operator, Progress, Registry};
pub use provider::{ContextArgs, Provider};
pub use storage::{RegisterPool, StackFrame, Storage, StorageError};

/// Result of compiling one probe body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledProbe {
    pub program: Program,
    /// Every map the program loads a handle for, in first-use order.
    pub maps: Vec<MapSpec>,
    pub warnings: Vec<CodegenWarning>,
    pub stats: InferStats,
}

/// Compilation state shared by the probe bodies of one script.
#[derive(Debug, Default)]
pub struct Session {
    pub types: TypeRegistry,
    pub maps: MapTable,
    pub config: CodegenConfig,
    registry: Registry,
}

impl Session {
    pub fn new(config: CodegenConfig) -> Self {
        Self {
            types: TypeRegistry::new(),
            maps: MapTable::new(),
            config,
            registry: Registry::builtin(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compile the body rooted at `graph.root()`.
    ///
    /// The graph is rewritten and annotated in place: on success every
    /// reachable node carries its type and storage. On failure the map
    /// table is restored to what it was before the call; types registered
    /// meanwhile are kept.
    pub fn compile(
        &mut self,
        graph: &mut ExprGraph,
        provider: &dyn Provider,
    ) -> Result<CompiledProbe, CodegenError> {
        let checkpoint = self.maps.checkpoint();
        let result = self.compile_body(graph, provider);
        if let Err(err) = &result {
            tracing::debug!(%err, "compilation failed, rolling back maps");
            self.maps.rollback(checkpoint);
        }
        result
    }

    fn compile_body(
        &mut self,
        graph: &mut ExprGraph,
        provider: &dyn Provider,
    ) -> Result<CompiledProbe, CodegenError> {
        let mut warnings = Vec::new();
        let mut stats = InferStats::default();

        let root = match graph.root() {
            Some(root) => {
                validate::validate(&self.registry, graph, root)?;
                tracing::debug!(nodes = graph.len(), "validated");

                let root = rewrite::rewrite(&self.registry, graph, root)?;
                tracing::debug!(nodes = graph.len(), "rewritten");

                let mut cx = InferCx {
                    graph: &mut *graph,
                    types: &mut self.types,
                    maps: &mut self.maps,
                    provider,
                    config: &self.config,
                    warnings: &mut warnings,
                };
                stats = infer::infer(&self.registry, &mut cx, root)?;
                tracing::debug!(passes = stats.passes, typed = stats.newly_typed, "inferred");
                Some(root)
            }
            None => None,
        };

        let cx = LowerCx::new(graph, &self.types, &self.maps, provider, &self.config);
        let (program, used) = lower::lower(&self.registry, cx, root)?;
        let maps = used
            .into_iter()
            .map(|id| self.maps.spec(id, &self.types))
            .collect();

        Ok(CompiledProbe {
            program,
            maps,
            warnings,
            stats,
        })
    }
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
