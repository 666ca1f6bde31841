//! Arith dialect: constants and simple value selection.

use crate::arena::context::{IrContext, OperationDataBuilder};
use crate::arena::ops::def_op;
use crate::arena::refs::{TypeRef, ValueRef};
use crate::arena::types::{Attribute, Location};
use crate::ir::Symbol;
use crate::symbols;

symbols! {
    VALUE => "value",
}

def_op! {
    /// Constant with its payload in a `value` attribute.
    Const => "arith" . "const"
}

/// Create an `arith.const` with the given payload attribute and result type.
pub fn r#const(ctx: &mut IrContext, loc: Location, value: Attribute, result_ty: TypeRef) -> Const {
    let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("const"))
        .attr(VALUE(), value)
        .result(result_ty)
        .build(ctx);
    Const(ctx.create_op(data))
}

impl Const {
    pub fn value<'a>(&self, ctx: &'a IrContext) -> Option<&'a Attribute> {
        ctx.op(self.0).attributes.get(&VALUE())
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

def_op! {
    /// Select between two values based on an i1 condition.
    Select => "arith" . "select"
}

pub fn select(
    ctx: &mut IrContext,
    loc: Location,
    condition: ValueRef,
    true_value: ValueRef,
    false_value: ValueRef,
    result_ty: TypeRef,
) -> Select {
    let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("select"))
        .operand(condition)
        .operand(true_value)
        .operand(false_value)
        .result(result_ty)
        .build(ctx);
    Select(ctx.create_op(data))
}

impl Select {
    pub fn condition(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn true_value(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[1]
    }

    pub fn false_value(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[2]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}
