//! Pre-order traversal over nested operations.
//!
//! A walk visits an operation before anything inside its regions. The
//! callback steers the walk through its return value: `Break` aborts the
//! whole traversal, `Continue(Skip)` prunes the current operation's regions,
//! `Continue(Advance)` descends into them.

use std::ops::ControlFlow;

use super::context::IrContext;
use super::ops::DialectOp;
use super::refs::{BlockRef, OpRef, RegionRef};

/// What to do with the regions of the operation just visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Descend into nested regions.
    Advance,
    /// Prune nested regions and move to the next sibling.
    Skip,
}

/// Visit every operation in `region`, pre-order.
pub fn walk_region<B>(
    ctx: &IrContext,
    region: RegionRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &block in &ctx.region(region).blocks {
        walk_block(ctx, block, f)?;
    }
    ControlFlow::Continue(())
}

/// Visit every operation in `block`, pre-order.
pub fn walk_block<B>(
    ctx: &IrContext,
    block: BlockRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &op in &ctx.block(block).ops {
        walk_op(ctx, op, f)?;
    }
    ControlFlow::Continue(())
}

/// Visit `op`, then (unless pruned) everything in its regions.
pub fn walk_op<B>(
    ctx: &IrContext,
    op: OpRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    if f(op)? == WalkAction::Skip {
        return ControlFlow::Continue(());
    }
    for &region in &ctx.op(op).regions {
        walk_region(ctx, region, f)?;
    }
    ControlFlow::Continue(())
}

/// Visit every operation in `region` that downcasts to `T`, pre-order.
/// Other operations are traversed through but not reported.
pub fn walk_typed<T, B>(
    ctx: &IrContext,
    region: RegionRef,
    f: &mut dyn FnMut(T) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()>
where
    T: DialectOp,
{
    walk_region(ctx, region, &mut |op| match T::from_op(ctx, op) {
        Ok(typed) => f(typed),
        Err(_) => ControlFlow::Continue(WalkAction::Advance),
    })
}
