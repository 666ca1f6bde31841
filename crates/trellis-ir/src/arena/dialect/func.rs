//! Func dialect: functions, calls, and returns.
//!
//! Function types are encoded as `func.fn` with the input types as type
//! params and the result types in a `results` attribute.

use crate::arena::context::{IrContext, OperationDataBuilder};
use crate::arena::ops::def_op;
use crate::arena::refs::{RegionRef, TypeRef, ValueRef};
use crate::arena::types::{Attribute, Location, TypeDataBuilder};
use crate::ir::Symbol;
use crate::symbols;

symbols! {
    SYM_NAME => "sym_name",
    TYPE => "type",
    CALLEE => "callee",
    RESULTS => "results",
}

// ============================================================================
// Function type
// ============================================================================

/// Intern a `func.fn` type with the given inputs and results.
pub fn fn_type(ctx: &mut IrContext, inputs: &[TypeRef], results: &[TypeRef]) -> TypeRef {
    let results_attr = Attribute::List(results.iter().map(|&t| Attribute::Type(t)).collect());
    ctx.types.intern(
        TypeDataBuilder::new(Symbol::new("func"), Symbol::new("fn"))
            .params(inputs.iter().copied())
            .attr(RESULTS(), results_attr)
            .build(),
    )
}

/// Check if a type is a `func.fn` type.
pub fn is_fn_type(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types
        .is_dialect(ty, Symbol::new("func"), Symbol::new("fn"))
}

/// Get the input types of a `func.fn` type.
pub fn fn_inputs(ctx: &IrContext, ty: TypeRef) -> Option<Vec<TypeRef>> {
    if !is_fn_type(ctx, ty) {
        return None;
    }
    Some(ctx.types.get(ty).params.to_vec())
}

/// Get the result types of a `func.fn` type.
pub fn fn_results(ctx: &IrContext, ty: TypeRef) -> Option<Vec<TypeRef>> {
    if !is_fn_type(ctx, ty) {
        return None;
    }
    match ctx.types.get(ty).attrs.get(&RESULTS()) {
        Some(Attribute::List(items)) => items
            .iter()
            .map(|a| match a {
                Attribute::Type(t) => Some(*t),
                _ => None,
            })
            .collect(),
        _ => Some(vec![]),
    }
}

// ============================================================================
// func.func
// ============================================================================

def_op! {
    /// Function definition. Carries its signature in a `type` attribute and
    /// its body in a single region.
    Func => "func" . "func"
}

/// Create a `func.func` with the given symbol name, `func.fn` type, and body.
pub fn func(
    ctx: &mut IrContext,
    loc: Location,
    sym_name: Symbol,
    ty: TypeRef,
    body: RegionRef,
) -> Func {
    let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("func"))
        .attr(SYM_NAME(), Attribute::Symbol(sym_name))
        .attr(TYPE(), Attribute::Type(ty))
        .region(body)
        .build(ctx);
    Func(ctx.create_op(data))
}

impl Func {
    pub fn sym_name(&self, ctx: &IrContext) -> Option<Symbol> {
        match ctx.op(self.0).attributes.get(&SYM_NAME()) {
            Some(Attribute::Symbol(s)) => Some(*s),
            _ => None,
        }
    }

    /// The function's `func.fn` signature type.
    pub fn ty(&self, ctx: &IrContext) -> Option<TypeRef> {
        match ctx.op(self.0).attributes.get(&TYPE()) {
            Some(Attribute::Type(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }
}

// ============================================================================
// func.call
// ============================================================================

def_op! {
    /// Direct call to a named function.
    Call => "func" . "call"
}

/// Create a `func.call` to `callee` with the given arguments and result types.
pub fn call(
    ctx: &mut IrContext,
    loc: Location,
    callee: Symbol,
    args: Vec<ValueRef>,
    result_tys: Vec<TypeRef>,
) -> Call {
    let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("call"))
        .attr(CALLEE(), Attribute::Symbol(callee))
        .operands(args)
        .results(result_tys)
        .build(ctx);
    Call(ctx.create_op(data))
}

impl Call {
    pub fn callee(&self, ctx: &IrContext) -> Option<Symbol> {
        match ctx.op(self.0).attributes.get(&CALLEE()) {
            Some(Attribute::Symbol(s)) => Some(*s),
            _ => None,
        }
    }

    pub fn args<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }

    pub fn result(&self, ctx: &IrContext, index: u32) -> ValueRef {
        ctx.op_result(self.0, index)
    }
}

// ============================================================================
// func.return
// ============================================================================

def_op! {
    /// Function terminator returning zero or more values.
    Return => "func" . "return"
}

/// Create a `func.return` with the given operand values.
pub fn r#return(ctx: &mut IrContext, loc: Location, values: Vec<ValueRef>) -> Return {
    let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("return"))
        .operands(values)
        .build(ctx);
    Return(ctx.create_op(data))
}

impl Return {
    pub fn values<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }
}
