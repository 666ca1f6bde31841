//! Bufferization pass: rewrites tensor-typed IR into buffer (memref) form.
//!
//! The pass drives a dialect conversion with a type converter mapping each
//! tensor type to its memref mirror. Materializations bridge the two worlds
//! with `tensor.to_memref` and `tensor.load`; a fold pattern removes the
//! bridges that cancel out. In partial mode surviving bridge ops are legal
//! and unconverted operations are left in place; in full mode the pass fails
//! if any operation remains illegal.

use std::rc::Rc;

use thiserror::Error;
use trellis_ir::arena::dialect::{core, func, memref, tensor};
use trellis_ir::arena::rewrite::{
    ApplyOutcome, ConversionDriver, ConversionFailed, ConversionMode, ConversionPattern,
    ConversionTarget, MaterializeResult, TypeConverter,
};
use trellis_ir::arena::{DialectOp, IrContext, OpRef, RegionRef, TypeRef};

use crate::patterns::{
    CallPattern, FoldMaterializations, FuncSignaturePattern, ReturnPattern, UnrankedStorePattern,
};

#[derive(Debug, Error)]
pub enum BufferizeError {
    #[error(transparent)]
    Conversion(#[from] ConversionFailed),
}

/// Converts tensor-typed operations and function signatures to buffer form.
pub struct BufferizePass {
    allow_partial_bufferization: bool,
    max_iterations: usize,
    extra_patterns: Vec<Rc<dyn ConversionPattern>>,
    target_config: Vec<Box<dyn Fn(&mut ConversionTarget)>>,
}

impl BufferizePass {
    /// With `allow_partial_bufferization` the pass runs a partial conversion
    /// and keeps the typed bridge ops legal; otherwise it runs a full
    /// conversion and every tensor operation must be rewritten away.
    pub fn new(allow_partial_bufferization: bool) -> Self {
        Self {
            allow_partial_bufferization,
            max_iterations: 10,
            extra_patterns: Vec::new(),
            target_config: Vec::new(),
        }
    }

    /// Register an additional conversion pattern.
    pub fn with_pattern(mut self, pattern: Rc<dyn ConversionPattern>) -> Self {
        self.extra_patterns.push(pattern);
        self
    }

    /// Register a hook that adjusts the conversion target, e.g. to mark
    /// custom operations illegal.
    pub fn with_target_config(mut self, f: impl Fn(&mut ConversionTarget) + 'static) -> Self {
        self.target_config.push(Box::new(f));
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run bufferization over a module.
    pub fn run(
        &self,
        ctx: &mut IrContext,
        module: core::Module,
    ) -> Result<ApplyOutcome, BufferizeError> {
        let mut target = build_target(self.allow_partial_bufferization);
        for f in &self.target_config {
            f(&mut target);
        }
        let mode = if self.allow_partial_bufferization {
            ConversionMode::Partial
        } else {
            ConversionMode::Full
        };
        tracing::info!(?mode, "bufferizing module");

        let mut driver = ConversionDriver::new(target, build_type_converter(), mode)
            .with_max_iterations(self.max_iterations);
        driver.add_pattern(FoldMaterializations);
        driver.add_pattern(FuncSignaturePattern);
        driver.add_pattern(CallPattern);
        driver.add_pattern(ReturnPattern);
        driver.add_pattern(UnrankedStorePattern);
        for pattern in &self.extra_patterns {
            driver.add_boxed_pattern(Box::new(Rc::clone(pattern)));
        }

        let outcome = driver.run(ctx, module)?;
        tracing::debug!(
            applied = outcome.applied,
            iterations = outcome.iterations,
            fixpoint = outcome.reached_fixpoint,
            "bufferization finished"
        );
        Ok(outcome)
    }
}

/// The tensor-to-memref type mapping.
pub fn build_type_converter() -> TypeConverter {
    let mut converter = TypeConverter::new();
    converter.add_conversion(|ctx, ty| memref::bufferized(ctx, ty));
    converter.set_materializer(|ctx, loc, value, from, to| {
        if tensor::is_tensor(ctx, from) && memref::is_memref(ctx, to) {
            let op = tensor::to_memref(ctx, loc, value, to);
            Some(MaterializeResult {
                value: op.result(ctx),
                ops: vec![op.op_ref()],
            })
        } else if memref::is_memref(ctx, from) && tensor::is_tensor(ctx, to) {
            let op = tensor::load(ctx, loc, value, to);
            Some(MaterializeResult {
                value: op.result(ctx),
                ops: vec![op.op_ref()],
            })
        } else {
            None
        }
    });
    converter
}

/// Legality registrations for bufferization.
pub fn build_target(allow_partial_bufferization: bool) -> ConversionTarget {
    let mut target = ConversionTarget::new();
    for dialect in ["scf", "memref", "arith", "shape"] {
        target.add_legal_dialect(dialect);
    }
    target.add_legal_op("core", "module");
    // A cast is welcome while it still bridges a type change; once it
    // becomes foldable it is handed to the cleanup pattern instead.
    target.add_dynamic_legality("core", "unrealized_conversion_cast", cast_is_legal);

    target.add_illegal_dialect("tensor");
    for op in ["generate", "extract", "from_elements", "cast"] {
        target.add_illegal_op("tensor", op);
    }
    if allow_partial_bufferization {
        // Bridge ops may survive a partial bufferization; full mode falls
        // through to the illegal tensor dialect.
        target.add_legal_op("tensor", "load");
        target.add_legal_op("tensor", "to_memref");
    }

    target.add_dynamic_legality("arith", "const", results_are_legal);
    target.add_dynamic_legality("arith", "select", results_are_legal);
    target.add_dynamic_legality("tensor", "store", store_is_legal);
    target.add_dynamic_legality("func", "func", func_is_legal);
    target.add_dynamic_legality("func", "call", types_are_legal);
    target.add_dynamic_legality("func", "return", types_are_legal);
    target.add_dynamic_legality("shape", "dim", types_are_legal);
    target.add_dynamic_legality("shape", "rank", types_are_legal);
    target
}

fn type_is_legal(ctx: &IrContext, ty: TypeRef) -> bool {
    memref::bufferized(ctx, ty).is_none()
}

fn cast_is_legal(ctx: &IrContext, op: OpRef) -> bool {
    crate::patterns::bridge_fold(ctx, op).is_none()
}

fn results_are_legal(ctx: &IrContext, op: OpRef) -> bool {
    ctx.op_result_types(op).iter().all(|&t| type_is_legal(ctx, t))
}

fn types_are_legal(ctx: &IrContext, op: OpRef) -> bool {
    ctx.op_operands(op)
        .iter()
        .all(|&v| type_is_legal(ctx, ctx.value_ty(v)))
        && results_are_legal(ctx, op)
}

/// A store is legal unless it stores an unranked tensor.
fn store_is_legal(ctx: &IrContext, op: OpRef) -> bool {
    match ctx.op_operands(op).first() {
        Some(&stored) => !tensor::is_unranked(ctx, ctx.value_ty(stored)),
        None => true,
    }
}

fn region_types_are_legal(ctx: &IrContext, region: RegionRef) -> bool {
    for &block in &ctx.region(region).blocks {
        if !ctx
            .block_args(block)
            .iter()
            .all(|&v| type_is_legal(ctx, ctx.value_ty(v)))
        {
            return false;
        }
        for &op in &ctx.block(block).ops {
            if !types_are_legal(ctx, op) {
                return false;
            }
            if !ctx.op(op).regions.iter().all(|&r| region_types_are_legal(ctx, r)) {
                return false;
            }
        }
    }
    true
}

/// A function is legal once its signature and every value type in its body
/// are in buffer form.
fn func_is_legal(ctx: &IrContext, op: OpRef) -> bool {
    let Ok(func_op) = func::Func::from_op(ctx, op) else {
        return false;
    };
    let Some(ty) = func_op.ty(ctx) else {
        return false;
    };
    let signature_legal = match (func::fn_inputs(ctx, ty), func::fn_results(ctx, ty)) {
        (Some(inputs), Some(results)) => {
            inputs.iter().all(|&t| type_is_legal(ctx, t))
                && results.iter().all(|&t| type_is_legal(ctx, t))
        }
        _ => false,
    };
    signature_legal && region_types_are_legal(ctx, func_op.body(ctx))
}
