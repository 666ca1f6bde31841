//! Memref dialect: buffer types mirroring the tensor shapes, plus allocation.

use crate::arena::context::{IrContext, OperationDataBuilder};
use crate::arena::dialect::tensor::{self, Dim};
use crate::arena::ops::def_op;
use crate::arena::refs::{TypeRef, ValueRef};
use crate::arena::types::{Attribute, Location, TypeData, TypeDataBuilder};
use crate::ir::Symbol;
use crate::symbols;

symbols! {
    SHAPE => "shape",
    LAYOUT => "layout",
}

// ============================================================================
// Types
// ============================================================================

/// Intern a ranked memref type with the given element type and dims.
pub fn ranked(ctx: &mut IrContext, element: TypeRef, dims: &[Dim]) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(Symbol::new("memref"), Symbol::new("ranked"))
            .param(element)
            .attr(SHAPE(), tensor::shape_attr(dims))
            .build(),
    )
}

/// Intern a ranked memref type carrying an explicit layout attribute.
/// Memrefs without a layout use the identity layout implicitly; the two
/// forms intern to distinct types.
pub fn ranked_with_layout(
    ctx: &mut IrContext,
    element: TypeRef,
    dims: &[Dim],
    layout: Attribute,
) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(Symbol::new("memref"), Symbol::new("ranked"))
            .param(element)
            .attr(SHAPE(), tensor::shape_attr(dims))
            .attr(LAYOUT(), layout)
            .build(),
    )
}

/// Intern an unranked memref type with the given element type.
pub fn unranked(ctx: &mut IrContext, element: TypeRef) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(Symbol::new("memref"), Symbol::new("unranked"))
            .param(element)
            .build(),
    )
}

/// Check if a type belongs to the memref dialect.
pub fn is_memref(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.get(ty).dialect == Symbol::new("memref")
}

/// Check if a type is a ranked memref.
pub fn is_ranked(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types
        .is_dialect(ty, Symbol::new("memref"), Symbol::new("ranked"))
}

/// Check if a type is an unranked memref.
pub fn is_unranked(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types
        .is_dialect(ty, Symbol::new("memref"), Symbol::new("unranked"))
}

/// Get the element type of a memref type.
pub fn element_type(ctx: &IrContext, ty: TypeRef) -> Option<TypeRef> {
    if is_memref(ctx, ty) {
        ctx.types.get(ty).params.first().copied()
    } else {
        None
    }
}

/// Compute the buffer form of a tensor type: `tensor.ranked` becomes
/// `memref.ranked` with the same element and shape, `tensor.unranked`
/// becomes `memref.unranked`. Returns `None` for non-tensor types.
///
/// The result is un-interned `TypeData` so callers without `&mut` access
/// can still ask the question; intern it to use it.
pub fn bufferized(ctx: &IrContext, ty: TypeRef) -> Option<TypeData> {
    if !tensor::is_tensor(ctx, ty) {
        return None;
    }
    let data = ctx.types.get(ty);
    Some(TypeData {
        dialect: Symbol::new("memref"),
        name: data.name,
        params: data.params.clone(),
        attrs: data.attrs.clone(),
    })
}

// ============================================================================
// Ops
// ============================================================================

def_op! {
    /// Allocate a fresh buffer of the given memref type.
    Alloc => "memref" . "alloc"
}

pub fn alloc(ctx: &mut IrContext, loc: Location, result_ty: TypeRef) -> Alloc {
    let data = OperationDataBuilder::new(loc, Symbol::new("memref"), Symbol::new("alloc"))
        .result(result_ty)
        .build(ctx);
    Alloc(ctx.create_op(data))
}

impl Alloc {
    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}
