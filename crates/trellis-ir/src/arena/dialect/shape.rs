//! Shape dialect: runtime queries over shaped values. These ops accept both
//! tensor and memref operands, so they stay legal across bufferization as
//! long as their scalar types are.

use crate::arena::context::{IrContext, OperationDataBuilder};
use crate::arena::ops::def_op;
use crate::arena::refs::{TypeRef, ValueRef};
use crate::arena::types::Location;
use crate::ir::Symbol;

def_op! {
    /// Runtime extent of one dimension of a shaped value.
    Dim => "shape" . "dim"
}

pub fn dim(
    ctx: &mut IrContext,
    loc: Location,
    source: ValueRef,
    index: ValueRef,
    result_ty: TypeRef,
) -> Dim {
    let data = OperationDataBuilder::new(loc, Symbol::new("shape"), Symbol::new("dim"))
        .operand(source)
        .operand(index)
        .result(result_ty)
        .build(ctx);
    Dim(ctx.create_op(data))
}

impl Dim {
    pub fn source(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn index(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[1]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

def_op! {
    /// Runtime rank of a shaped value.
    Rank => "shape" . "rank"
}

pub fn rank(ctx: &mut IrContext, loc: Location, source: ValueRef, result_ty: TypeRef) -> Rank {
    let data = OperationDataBuilder::new(loc, Symbol::new("shape"), Symbol::new("rank"))
        .operand(source)
        .result(result_ty)
        .build(ctx);
    Rank(ctx.create_op(data))
}

impl Rank {
    pub fn source(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}
