//! Tensor dialect: value-semantics shaped types and the ops that produce,
//! inspect, and bridge them.
//!
//! `tensor.load` and `tensor.to_memref` are the typed bridge ops used as
//! materializations during bufferization: `load` reads a buffer back into a
//! tensor value, `to_memref` casts a tensor value to its buffer form.

use crate::arena::context::{IrContext, OperationDataBuilder};
use crate::arena::ops::def_op;
use crate::arena::refs::{RegionRef, TypeRef, ValueRef};
use crate::arena::types::{Attribute, Location, TypeDataBuilder};
use crate::ir::Symbol;
use crate::symbols;

symbols! {
    SHAPE => "shape",
}

// ============================================================================
// Types
// ============================================================================

/// A single dimension of a ranked shaped type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dim {
    /// Statically known extent.
    Fixed(u64),
    /// Dynamic extent, unknown until runtime.
    Dynamic,
}

pub(crate) fn shape_attr(dims: &[Dim]) -> Attribute {
    Attribute::List(
        dims.iter()
            .map(|d| match d {
                Dim::Fixed(n) => Attribute::IntBits(*n),
                Dim::Dynamic => Attribute::Unit,
            })
            .collect(),
    )
}

/// Intern a ranked tensor type with the given element type and dims.
pub fn ranked(ctx: &mut IrContext, element: TypeRef, dims: &[Dim]) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(Symbol::new("tensor"), Symbol::new("ranked"))
            .param(element)
            .attr(SHAPE(), shape_attr(dims))
            .build(),
    )
}

/// Intern an unranked tensor type with the given element type.
pub fn unranked(ctx: &mut IrContext, element: TypeRef) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(Symbol::new("tensor"), Symbol::new("unranked"))
            .param(element)
            .build(),
    )
}

/// Check if a type belongs to the tensor dialect.
pub fn is_tensor(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.get(ty).dialect == Symbol::new("tensor")
}

/// Check if a type is a ranked tensor.
pub fn is_ranked(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types
        .is_dialect(ty, Symbol::new("tensor"), Symbol::new("ranked"))
}

/// Check if a type is an unranked tensor.
pub fn is_unranked(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types
        .is_dialect(ty, Symbol::new("tensor"), Symbol::new("unranked"))
}

/// Get the element type of a tensor type.
pub fn element_type(ctx: &IrContext, ty: TypeRef) -> Option<TypeRef> {
    if is_tensor(ctx, ty) {
        ctx.types.get(ty).params.first().copied()
    } else {
        None
    }
}

/// Get the dims of a ranked shaped type (tensor or memref).
pub fn dims(ctx: &IrContext, ty: TypeRef) -> Option<Vec<Dim>> {
    match ctx.types.get(ty).attrs.get(&SHAPE()) {
        Some(Attribute::List(items)) => items
            .iter()
            .map(|a| match a {
                Attribute::IntBits(n) => Some(Dim::Fixed(*n)),
                Attribute::Unit => Some(Dim::Dynamic),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

// ============================================================================
// Ops
// ============================================================================

def_op! {
    /// Materialize a tensor from a per-element generator region.
    Generate => "tensor" . "generate"
}

/// Create a `tensor.generate` with dynamic extents and a generator body.
pub fn generate(
    ctx: &mut IrContext,
    loc: Location,
    dynamic_extents: Vec<ValueRef>,
    body: RegionRef,
    result_ty: TypeRef,
) -> Generate {
    let data = OperationDataBuilder::new(loc, Symbol::new("tensor"), Symbol::new("generate"))
        .operands(dynamic_extents)
        .region(body)
        .result(result_ty)
        .build(ctx);
    Generate(ctx.create_op(data))
}

impl Generate {
    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

def_op! {
    /// Build a small tensor from scalar elements.
    FromElements => "tensor" . "from_elements"
}

pub fn from_elements(
    ctx: &mut IrContext,
    loc: Location,
    elements: Vec<ValueRef>,
    result_ty: TypeRef,
) -> FromElements {
    let data = OperationDataBuilder::new(loc, Symbol::new("tensor"), Symbol::new("from_elements"))
        .operands(elements)
        .result(result_ty)
        .build(ctx);
    FromElements(ctx.create_op(data))
}

impl FromElements {
    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

def_op! {
    /// Read one scalar element at the given indices.
    Extract => "tensor" . "extract"
}

pub fn extract(
    ctx: &mut IrContext,
    loc: Location,
    source: ValueRef,
    indices: Vec<ValueRef>,
    result_ty: TypeRef,
) -> Extract {
    let data = OperationDataBuilder::new(loc, Symbol::new("tensor"), Symbol::new("extract"))
        .operand(source)
        .operands(indices)
        .result(result_ty)
        .build(ctx);
    Extract(ctx.create_op(data))
}

impl Extract {
    pub fn source(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

def_op! {
    /// Shape-changing cast between tensor types (ranked/unranked).
    Cast => "tensor" . "cast"
}

pub fn cast(ctx: &mut IrContext, loc: Location, source: ValueRef, result_ty: TypeRef) -> Cast {
    let data = OperationDataBuilder::new(loc, Symbol::new("tensor"), Symbol::new("cast"))
        .operand(source)
        .result(result_ty)
        .build(ctx);
    Cast(ctx.create_op(data))
}

impl Cast {
    pub fn source(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

def_op! {
    /// Bridge op: read a buffer into a tensor value (target materialization
    /// in the buffer-to-tensor direction).
    Load => "tensor" . "load"
}

pub fn load(ctx: &mut IrContext, loc: Location, source: ValueRef, result_ty: TypeRef) -> Load {
    let data = OperationDataBuilder::new(loc, Symbol::new("tensor"), Symbol::new("load"))
        .operand(source)
        .result(result_ty)
        .build(ctx);
    Load(ctx.create_op(data))
}

impl Load {
    pub fn source(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

def_op! {
    /// Bridge op: cast a tensor value to its buffer form (tensor-to-buffer
    /// materialization).
    ToMemref => "tensor" . "to_memref"
}

pub fn to_memref(
    ctx: &mut IrContext,
    loc: Location,
    source: ValueRef,
    result_ty: TypeRef,
) -> ToMemref {
    let data = OperationDataBuilder::new(loc, Symbol::new("tensor"), Symbol::new("to_memref"))
        .operand(source)
        .result(result_ty)
        .build(ctx);
    ToMemref(ctx.create_op(data))
}

impl ToMemref {
    pub fn source(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

def_op! {
    /// Write a tensor value into a buffer destination.
    Store => "tensor" . "store"
}

pub fn store(ctx: &mut IrContext, loc: Location, tensor: ValueRef, memref: ValueRef) -> Store {
    let data = OperationDataBuilder::new(loc, Symbol::new("tensor"), Symbol::new("store"))
        .operand(tensor)
        .operand(memref)
        .build(ctx);
    Store(ctx.create_op(data))
}

impl Store {
    /// The stored tensor value.
    pub fn tensor(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    /// The buffer destination.
    pub fn memref(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::dialect::core;
    use crate::location::Span;

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.mlir".to_owned());
        let loc = Location::new(path, Span::new(0, 0));
        (ctx, loc)
    }

    #[test]
    fn ranked_types_intern_by_shape() {
        let (mut ctx, _) = test_ctx();
        let f32_ty = core::float_type(&mut ctx, 32);

        let t2 = ranked(&mut ctx, f32_ty, &[Dim::Fixed(2)]);
        let t2_again = ranked(&mut ctx, f32_ty, &[Dim::Fixed(2)]);
        let t_dyn = ranked(&mut ctx, f32_ty, &[Dim::Dynamic]);

        assert_eq!(t2, t2_again);
        assert_ne!(t2, t_dyn);
        assert!(is_ranked(&ctx, t2));
        assert!(is_tensor(&ctx, t2));
        assert_eq!(element_type(&ctx, t2), Some(f32_ty));
        assert_eq!(dims(&ctx, t2), Some(vec![Dim::Fixed(2)]));
        assert_eq!(dims(&ctx, t_dyn), Some(vec![Dim::Dynamic]));
    }

    #[test]
    fn unranked_has_no_dims() {
        let (mut ctx, _) = test_ctx();
        let f32_ty = core::float_type(&mut ctx, 32);
        let ut = unranked(&mut ctx, f32_ty);

        assert!(is_unranked(&ctx, ut));
        assert!(is_tensor(&ctx, ut));
        assert!(!is_ranked(&ctx, ut));
        assert_eq!(dims(&ctx, ut), None);
        assert_eq!(element_type(&ctx, ut), Some(f32_ty));
    }

    #[test]
    fn store_operand_roles() {
        let (mut ctx, loc) = test_ctx();
        let f32_ty = core::float_type(&mut ctx, 32);
        let ut = unranked(&mut ctx, f32_ty);

        let src = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("src"))
            .result(ut)
            .result(ut)
            .build(&mut ctx);
        let src_op = ctx.create_op(src);
        let t = ctx.op_result(src_op, 0);
        let m = ctx.op_result(src_op, 1);

        let s = store(&mut ctx, loc, t, m);
        assert_eq!(s.tensor(&ctx), t);
        assert_eq!(s.memref(&ctx), m);
    }
}
