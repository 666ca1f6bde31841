//! Core dialect: module container, scalar types, and the generic bridge cast.

use crate::arena::context::{IrContext, OperationDataBuilder};
use crate::arena::ops::{DialectOp, def_op};
use crate::arena::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueRef};
use crate::arena::types::{Attribute, Location, TypeDataBuilder};
use crate::ir::Symbol;
use crate::symbols;

symbols! {
    SYM_NAME => "sym_name",
}

// ============================================================================
// Types
// ============================================================================

/// Intern a signless integer type (`core.i32` etc.).
pub fn int_type(ctx: &mut IrContext, bits: u16) -> TypeRef {
    let name = match bits {
        1 => Symbol::new("i1"),
        8 => Symbol::new("i8"),
        16 => Symbol::new("i16"),
        32 => Symbol::new("i32"),
        64 => Symbol::new("i64"),
        _ => Symbol::from_dynamic(&format!("i{bits}")),
    };
    ctx.types
        .intern(TypeDataBuilder::new(Symbol::new("core"), name).build())
}

/// Intern a float type (`core.f32` or `core.f64`).
pub fn float_type(ctx: &mut IrContext, bits: u16) -> TypeRef {
    let name = match bits {
        32 => Symbol::new("f32"),
        64 => Symbol::new("f64"),
        _ => Symbol::from_dynamic(&format!("f{bits}")),
    };
    ctx.types
        .intern(TypeDataBuilder::new(Symbol::new("core"), name).build())
}

/// Intern the platform-width index type (`core.index`).
pub fn index_type(ctx: &mut IrContext) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(Symbol::new("core"), Symbol::new("index")).build())
}

// ============================================================================
// core.module
// ============================================================================

def_op! {
    /// Top-level module container. Holds one region with a single block of
    /// top-level operations.
    Module => "core" . "module"
}

/// Create a `core.module` op owning the given body region.
pub fn module(ctx: &mut IrContext, loc: Location, name: Symbol, body: RegionRef) -> Module {
    let data = OperationDataBuilder::new(loc, Symbol::new("core"), Symbol::new("module"))
        .attr(SYM_NAME(), Attribute::Symbol(name))
        .region(body)
        .build(ctx);
    Module(ctx.create_op(data))
}

impl Module {
    /// Wrap an existing op, verifying it is a `core.module`.
    pub fn new(ctx: &IrContext, op: OpRef) -> Option<Self> {
        Self::from_op(ctx, op).ok()
    }

    /// Get the module's body region.
    pub fn body(self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    /// Get the first block of the module body.
    pub fn first_block(self, ctx: &IrContext) -> Option<BlockRef> {
        ctx.region(self.body(ctx)).blocks.first().copied()
    }

    /// Get all top-level operations in the module's first block.
    pub fn ops(self, ctx: &IrContext) -> Vec<OpRef> {
        match self.first_block(ctx) {
            Some(block) => ctx.block(block).ops.to_vec(),
            None => vec![],
        }
    }

    /// Get the module name (from `sym_name` attribute).
    pub fn name(self, ctx: &IrContext) -> Option<Symbol> {
        match ctx.op(self.0).attributes.get(&SYM_NAME()) {
            Some(Attribute::Symbol(s)) => Some(*s),
            _ => None,
        }
    }
}

// ============================================================================
// core.unrealized_conversion_cast
// ============================================================================

def_op! {
    /// Generic bridge cast inserted by the conversion driver when no typed
    /// materialization applies. Carries a value across a type boundary
    /// during incremental conversion.
    UnrealizedConversionCast => "core" . "unrealized_conversion_cast"
}

/// Create a `core.unrealized_conversion_cast` from `value` to `result_ty`.
pub fn unrealized_conversion_cast(
    ctx: &mut IrContext,
    loc: Location,
    value: ValueRef,
    result_ty: TypeRef,
) -> UnrealizedConversionCast {
    let data = OperationDataBuilder::new(
        loc,
        Symbol::new("core"),
        Symbol::new("unrealized_conversion_cast"),
    )
    .operand(value)
    .result(result_ty)
    .build(ctx);
    UnrealizedConversionCast(ctx.create_op(data))
}

impl UnrealizedConversionCast {
    pub fn operand(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}
