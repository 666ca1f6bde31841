//! Pattern rewriter: records mutations during a match, applies them on commit.
//!
//! Patterns never mutate blocks directly. They record intents on a
//! [`PatternRewriter`] and the driver applies the whole set at once after the
//! pattern reports a match, so a declined match leaves the block untouched.

use crate::arena::context::IrContext;
use crate::arena::dialect::core;
use crate::arena::ops::DialectOp;
use crate::arena::refs::{OpRef, TypeRef, ValueRef};
use crate::arena::rewrite::type_converter::TypeConverter;
use crate::arena::types::Location;

/// Mutation recorder handed to patterns.
pub struct PatternRewriter<'a> {
    type_converter: &'a TypeConverter,
    prefix_ops: Vec<OpRef>,
    replacement: Option<OpRef>,
    erase_values: Option<Vec<ValueRef>>,
    replaced_values: Vec<(ValueRef, ValueRef)>,
    extra_erase: Vec<OpRef>,
}

/// Recorded mutations, detached from the rewriter for application.
pub(crate) struct Mutations {
    prefix_ops: Vec<OpRef>,
    replacement: Option<OpRef>,
    erase_values: Option<Vec<ValueRef>>,
    replaced_values: Vec<(ValueRef, ValueRef)>,
    extra_erase: Vec<OpRef>,
}

impl<'a> PatternRewriter<'a> {
    /// `prefix_ops` are detached operations to insert before the matched op
    /// on commit; the driver seeds them with operand materializations.
    pub(crate) fn new(type_converter: &'a TypeConverter, prefix_ops: Vec<OpRef>) -> Self {
        Self {
            type_converter,
            prefix_ops,
            replacement: None,
            erase_values: None,
            replaced_values: Vec::new(),
            extra_erase: Vec::new(),
        }
    }

    /// The driver's type converter, for patterns that convert types inline.
    pub fn type_converter(&self) -> &TypeConverter {
        self.type_converter
    }

    /// Insert a detached operation before the matched op on commit.
    pub fn insert_op(&mut self, op: OpRef) {
        self.prefix_ops.push(op);
    }

    /// Replace the matched op with `op`. Results are rewired pairwise; where
    /// a result type changed and the old value still has uses, a
    /// materialization bridges the two types.
    pub fn replace_op(&mut self, op: OpRef) {
        debug_assert!(self.replacement.is_none(), "replace_op called twice");
        self.replacement = Some(op);
    }

    /// Erase the matched op, replacing its i-th result with `values[i]`.
    /// Pass an empty vec when the op has no results (or none with uses).
    pub fn erase_op(&mut self, values: Vec<ValueRef>) {
        debug_assert!(self.erase_values.is_none(), "erase_op called twice");
        self.erase_values = Some(values);
    }

    /// Replace all uses of `old` with `new` on commit.
    pub fn replace_value(&mut self, old: ValueRef, new: ValueRef) {
        self.replaced_values.push((old, new));
    }

    /// Erase an additional operation (beyond the matched one) on commit.
    /// Applied last, after all value replacements.
    pub fn also_erase(&mut self, op: OpRef) {
        self.extra_erase.push(op);
    }

    /// Whether the pattern recorded an actual rewrite. Prefix ops alone do
    /// not count: operand materializations are only committed alongside a
    /// real mutation.
    pub fn has_rewrite(&self) -> bool {
        self.replacement.is_some()
            || self.erase_values.is_some()
            || !self.replaced_values.is_empty()
            || !self.extra_erase.is_empty()
    }

    pub(crate) fn into_mutations(self) -> Mutations {
        Mutations {
            prefix_ops: self.prefix_ops,
            replacement: self.replacement,
            erase_values: self.erase_values,
            replaced_values: self.replaced_values,
            extra_erase: self.extra_erase,
        }
    }
}

/// Bridge `value` to `to_ty`, preferring the converter's materializer and
/// falling back to `core.unrealized_conversion_cast`. Returns the bridged
/// value and the detached ops producing it.
pub(crate) fn materialize_or_cast(
    ctx: &mut IrContext,
    converter: &TypeConverter,
    loc: Location,
    value: ValueRef,
    to_ty: TypeRef,
) -> (ValueRef, Vec<OpRef>) {
    if let Some(m) = converter.materialize(ctx, loc, value, to_ty) {
        return (m.value, m.ops);
    }
    let cast = core::unrealized_conversion_cast(ctx, loc, value, to_ty);
    (cast.result(ctx), vec![cast.op_ref()])
}

/// Apply recorded mutations around `original`, which must be attached to a
/// block. Called by the driver after a successful match.
pub(crate) fn apply_mutations(
    ctx: &mut IrContext,
    converter: &TypeConverter,
    original: OpRef,
    mutations: Mutations,
) {
    let block = ctx
        .op(original)
        .parent_block
        .expect("apply_mutations: matched op must be attached to a block");
    let loc = ctx.op(original).location;

    let prefix_ops = mutations.prefix_ops;
    for op in &prefix_ops {
        ctx.insert_op_before(block, original, *op);
    }

    if let Some(new_op) = mutations.replacement {
        ctx.insert_op_before(block, original, new_op);

        let old_results: Vec<ValueRef> = ctx.op_results(original).to_vec();
        let new_results: Vec<ValueRef> = ctx.op_results(new_op).to_vec();
        let mut anchor = new_op;
        for (old_v, new_v) in old_results.into_iter().zip(new_results) {
            let old_ty = ctx.value_ty(old_v);
            if ctx.value_ty(new_v) != old_ty && ctx.has_uses(old_v) {
                // Remaining users still expect the old type; bridge back.
                let (bridged, bridge_ops) =
                    materialize_or_cast(ctx, converter, loc, new_v, old_ty);
                for b in bridge_ops {
                    ctx.insert_op_after(block, anchor, b);
                    anchor = b;
                }
                ctx.replace_all_uses(old_v, bridged);
            } else {
                ctx.replace_all_uses(old_v, new_v);
            }
        }
        ctx.remove_op_from_block(block, original);
        ctx.remove_op(original);
    } else if let Some(values) = mutations.erase_values {
        let old_results: Vec<ValueRef> = ctx.op_results(original).to_vec();
        for (i, old_v) in old_results.into_iter().enumerate() {
            let Some(&new_v) = values.get(i) else {
                continue;
            };
            let old_ty = ctx.value_ty(old_v);
            if ctx.value_ty(new_v) != old_ty && ctx.has_uses(old_v) {
                let (bridged, bridge_ops) =
                    materialize_or_cast(ctx, converter, loc, new_v, old_ty);
                for b in bridge_ops {
                    ctx.insert_op_before(block, original, b);
                }
                ctx.replace_all_uses(old_v, bridged);
            } else {
                ctx.replace_all_uses(old_v, new_v);
            }
        }
        ctx.remove_op_from_block(block, original);
        ctx.remove_op(original);
    }

    for (old, new) in mutations.replaced_values {
        ctx.replace_all_uses(old, new);
    }

    for op in mutations.extra_erase {
        if let Some(b) = ctx.op(op).parent_block {
            ctx.remove_op_from_block(b, op);
        }
        ctx.remove_op(op);
    }

    // Operand materializations the committed rewrite did not consume are
    // dead; drop them instead of leaving unused bridge ops behind.
    for op in prefix_ops.into_iter().rev() {
        if ctx.op_results(op).iter().all(|&v| !ctx.has_uses(v)) {
            ctx.remove_op_from_block(block, op);
            ctx.remove_op(op);
        }
    }
}
