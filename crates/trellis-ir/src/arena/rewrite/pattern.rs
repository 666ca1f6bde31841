//! Conversion pattern trait.

use std::rc::Rc;

use crate::arena::context::IrContext;
use crate::arena::refs::{OpRef, ValueRef};
use crate::arena::rewrite::rewriter::PatternRewriter;

/// A single rewrite rule applied by the conversion driver.
///
/// `operands` holds the operation's operands after operand type conversion:
/// where the type converter changed an operand's type, the slice carries the
/// materialized value of the new type instead of the original. Patterns that
/// care about original operands can still read them from `ctx`.
///
/// Returning `true` without recording any mutation on the rewriter counts as
/// no match. Patterns must not create operations unless they commit a
/// rewrite; operations created on a declined match leak into the arena.
pub trait ConversionPattern {
    /// Patterns with higher benefit are tried first. Ties keep
    /// registration order.
    fn benefit(&self) -> u16 {
        1
    }

    /// Name used in trace output.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Attempt to match `op` and record the rewrite on `rewriter`.
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        operands: &[ValueRef],
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool;
}

/// Shared patterns can be registered on several drivers.
impl ConversionPattern for Rc<dyn ConversionPattern> {
    fn benefit(&self) -> u16 {
        (**self).benefit()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        operands: &[ValueRef],
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        (**self).match_and_rewrite(ctx, op, operands, rewriter)
    }
}
