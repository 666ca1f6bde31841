//! Conversion patterns used by bufferization.

use trellis_ir::arena::dialect::{core, func, tensor};
use trellis_ir::arena::rewrite::{ConversionPattern, PatternRewriter};
use trellis_ir::arena::{DialectOp, IrContext, OpRef, TypeRef, ValueDef, ValueRef};

/// Rewrites `func.func` signatures into converted form.
///
/// Entry block arguments are retyped in place so existing uses keep their
/// value identity; body operations are converted separately by the driver.
pub struct FuncSignaturePattern;

impl ConversionPattern for FuncSignaturePattern {
    fn name(&self) -> &'static str {
        "func-signature"
    }

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        _operands: &[ValueRef],
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(func_op) = func::Func::from_op(ctx, op) else {
            return false;
        };
        let (Some(name), Some(ty)) = (func_op.sym_name(ctx), func_op.ty(ctx)) else {
            return false;
        };
        let (Some(inputs), Some(results)) = (func::fn_inputs(ctx, ty), func::fn_results(ctx, ty))
        else {
            return false;
        };
        let Some((new_inputs, new_results)) =
            rewriter
                .type_converter()
                .convert_signature(ctx, &inputs, &results)
        else {
            return false;
        };

        let loc = ctx.op(op).location;
        let body = func_op.body(ctx);
        if let Some(&entry) = ctx.region(body).blocks.first() {
            let arg_count = ctx.block_args(entry).len();
            for (i, &new_ty) in new_inputs.iter().enumerate().take(arg_count) {
                ctx.set_block_arg_type(entry, i as u32, new_ty);
            }
        }

        let new_ty = func::fn_type(ctx, &new_inputs, &new_results);
        ctx.detach_region(body);
        let new_func = func::func(ctx, loc, name, new_ty, body);
        rewriter.replace_op(new_func.op_ref());
        true
    }
}

/// Rebuilds `func.return` with type-converted operands.
pub struct ReturnPattern;

impl ConversionPattern for ReturnPattern {
    fn name(&self) -> &'static str {
        "return-adaptation"
    }

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        operands: &[ValueRef],
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        if !func::Return::matches(ctx, op) {
            return false;
        }
        if operands == ctx.op_operands(op) {
            return false;
        }
        let loc = ctx.op(op).location;
        let new_ret = func::r#return(ctx, loc, operands.to_vec());
        rewriter.replace_op(new_ret.op_ref());
        true
    }
}

/// Rebuilds `func.call` with converted operands and result types. Users of
/// a changed result type are bridged back by the driver's materialization.
pub struct CallPattern;

impl ConversionPattern for CallPattern {
    fn name(&self) -> &'static str {
        "call-adaptation"
    }

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        operands: &[ValueRef],
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(call_op) = func::Call::from_op(ctx, op) else {
            return false;
        };
        let Some(callee) = call_op.callee(ctx) else {
            return false;
        };
        let result_tys: Vec<TypeRef> = ctx.op_result_types(op).to_vec();
        let new_tys: Vec<TypeRef> = result_tys
            .iter()
            .map(|&t| rewriter.type_converter().convert_type_or_identity(ctx, t))
            .collect();
        if operands == ctx.op_operands(op) && new_tys == result_tys {
            return false;
        }
        let loc = ctx.op(op).location;
        let new_call = func::call(ctx, loc, callee, operands.to_vec(), new_tys);
        rewriter.replace_op(new_call.op_ref());
        true
    }
}

/// Collapses a store of an unranked tensor into a freshly allocated buffer.
///
/// When the destination buffer is used only by the store, the allocation is
/// redundant: the bufferized form of the stored value replaces it and both
/// the store and the allocation are erased.
pub struct UnrankedStorePattern;

impl ConversionPattern for UnrankedStorePattern {
    fn name(&self) -> &'static str {
        "unranked-store-collapse"
    }

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        operands: &[ValueRef],
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(store) = tensor::Store::from_op(ctx, op) else {
            return false;
        };
        let stored = store.tensor(ctx);
        if !tensor::is_unranked(ctx, ctx.value_ty(stored)) {
            return false;
        }
        let dest = store.memref(ctx);
        let ValueDef::OpResult(def_op, _) = ctx.value_def(dest) else {
            return false;
        };
        // The destination must feed nothing but this store, and the
        // defining op must have no other live results.
        let uses = ctx.uses(dest);
        if uses.len() != 1 || uses[0].user != op {
            return false;
        }
        if ctx
            .op_results(def_op)
            .iter()
            .any(|&r| r != dest && ctx.has_uses(r))
        {
            return false;
        }
        let Some(&bufferized) = operands.first() else {
            return false;
        };

        rewriter.erase_op(vec![]);
        rewriter.replace_value(dest, bufferized);
        rewriter.also_erase(def_op);
        true
    }
}

/// Folds materialization bridges (`tensor.load`, `tensor.to_memref`,
/// `core.unrealized_conversion_cast`): dead bridges, identity bridges, and
/// inverse pairs that round-trip back to the original type.
pub struct FoldMaterializations;

fn is_bridge(ctx: &IrContext, op: OpRef) -> bool {
    tensor::Load::matches(ctx, op)
        || tensor::ToMemref::matches(ctx, op)
        || core::UnrealizedConversionCast::matches(ctx, op)
}

/// How a bridge op can be folded away, if at all.
pub(crate) enum BridgeFold {
    /// The result is unused; the bridge can simply be erased.
    Dead,
    /// Source and result types agree; uses fall through to the source.
    Identity,
    /// The operand is itself a bridge from the carried value, which already
    /// has the result type.
    RoundTrip(ValueRef),
}

/// Classify a bridge op's foldability. `None` for non-bridge ops and for
/// bridges that still carry a value across a type change.
pub(crate) fn bridge_fold(ctx: &IrContext, op: OpRef) -> Option<BridgeFold> {
    if !is_bridge(ctx, op) {
        return None;
    }
    let result = ctx.op_result(op, 0);
    let operand = ctx.op_operands(op)[0];

    if !ctx.has_uses(result) {
        return Some(BridgeFold::Dead);
    }
    if ctx.value_ty(result) == ctx.value_ty(operand) {
        return Some(BridgeFold::Identity);
    }
    if let Some(inner) = ctx.value_def(operand).defining_op()
        && is_bridge(ctx, inner)
    {
        let inner_source = ctx.op_operands(inner)[0];
        if ctx.value_ty(inner_source) == ctx.value_ty(result) {
            return Some(BridgeFold::RoundTrip(inner_source));
        }
    }
    None
}

impl ConversionPattern for FoldMaterializations {
    fn benefit(&self) -> u16 {
        10
    }

    fn name(&self) -> &'static str {
        "fold-materializations"
    }

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        _operands: &[ValueRef],
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        match bridge_fold(ctx, op) {
            Some(BridgeFold::Dead) => rewriter.erase_op(vec![]),
            Some(BridgeFold::Identity) => {
                let source = ctx.op_operands(op)[0];
                rewriter.erase_op(vec![source]);
            }
            Some(BridgeFold::RoundTrip(carried)) => rewriter.erase_op(vec![carried]),
            None => return false,
        }
        true
    }
}
