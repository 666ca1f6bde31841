//! Type conversion with materialization hooks.
//!
//! A [`TypeConverter`] holds an ordered list of conversion functions mapping
//! source types to their converted form, plus an optional materializer that
//! builds bridge operations when a value of the old type is still needed
//! under the new type (or vice versa).

use crate::arena::context::IrContext;
use crate::arena::refs::{OpRef, RegionRef, TypeRef, ValueRef};
use crate::arena::types::{Attribute, Location, TypeData};

/// A single type conversion rule.
///
/// Returns the converted form as un-interned [`TypeData`] so legality checks
/// can run without mutable access to the context; `None` means the rule does
/// not apply to this type.
pub type ConversionFn = dyn Fn(&IrContext, TypeRef) -> Option<TypeData>;

/// Builds bridge operations carrying a value from one type to another.
///
/// Arguments are the value to bridge, its current type, and the desired type.
/// `None` means this materializer cannot bridge the pair; the conversion
/// driver then falls back to `core.unrealized_conversion_cast`.
pub type MaterializerFn =
    dyn Fn(&mut IrContext, Location, ValueRef, TypeRef, TypeRef) -> Option<MaterializeResult>;

/// Result of a materialization: the bridged value and the (detached)
/// operations that produce it, in execution order.
pub struct MaterializeResult {
    pub value: ValueRef,
    pub ops: Vec<OpRef>,
}

/// Ordered set of type conversion rules plus a materialization hook.
#[derive(Default)]
pub struct TypeConverter {
    conversions: Vec<Box<ConversionFn>>,
    materializer: Option<Box<MaterializerFn>>,
}

impl TypeConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a conversion rule. Rules are tried in registration order;
    /// the first rule returning `Some` wins.
    pub fn add_conversion(
        &mut self,
        f: impl Fn(&IrContext, TypeRef) -> Option<TypeData> + 'static,
    ) -> &mut Self {
        self.conversions.push(Box::new(f));
        self
    }

    /// Install the materialization hook, replacing any previous one.
    pub fn set_materializer(
        &mut self,
        f: impl Fn(&mut IrContext, Location, ValueRef, TypeRef, TypeRef) -> Option<MaterializeResult>
        + 'static,
    ) -> &mut Self {
        self.materializer = Some(Box::new(f));
        self
    }

    /// Compute the converted form of a type without interning it.
    fn converted_data(&self, ctx: &IrContext, ty: TypeRef) -> Option<TypeData> {
        self.conversions.iter().find_map(|f| f(ctx, ty))
    }

    /// Convert a type, interning the result. Returns `None` if no rule
    /// applies; may return the input type unchanged if a rule maps the
    /// type to itself.
    pub fn convert_type(&self, ctx: &mut IrContext, ty: TypeRef) -> Option<TypeRef> {
        let data = self.converted_data(ctx, ty)?;
        Some(ctx.types.intern(data))
    }

    /// Convert a type, falling back to the input when no rule applies.
    pub fn convert_type_or_identity(&self, ctx: &mut IrContext, ty: TypeRef) -> TypeRef {
        self.convert_type(ctx, ty).unwrap_or(ty)
    }

    /// Convert a function signature. Returns `None` when every input and
    /// result type is already in converted form, so callers can skip
    /// rebuilding unchanged functions.
    pub fn convert_signature(
        &self,
        ctx: &mut IrContext,
        inputs: &[TypeRef],
        results: &[TypeRef],
    ) -> Option<(Vec<TypeRef>, Vec<TypeRef>)> {
        let new_inputs: Vec<TypeRef> = inputs
            .iter()
            .map(|&t| self.convert_type_or_identity(ctx, t))
            .collect();
        let new_results: Vec<TypeRef> = results
            .iter()
            .map(|&t| self.convert_type_or_identity(ctx, t))
            .collect();
        if new_inputs == inputs && new_results == results {
            None
        } else {
            Some((new_inputs, new_results))
        }
    }

    /// A type is legal when no rule would change it or any type nested in
    /// its params or attributes (e.g. a function type over tensor inputs).
    pub fn is_legal_type(&self, ctx: &IrContext, ty: TypeRef) -> bool {
        if let Some(data) = self.converted_data(ctx, ty)
            && data != *ctx.types.get(ty)
        {
            return false;
        }
        let data = ctx.types.get(ty);
        data.params.iter().all(|&p| self.is_legal_type(ctx, p))
            && data.attrs.values().all(|a| self.attr_types_legal(ctx, a))
    }

    fn attr_types_legal(&self, ctx: &IrContext, attr: &Attribute) -> bool {
        match attr {
            Attribute::Type(t) => self.is_legal_type(ctx, *t),
            Attribute::List(items) => items.iter().all(|a| self.attr_types_legal(ctx, a)),
            _ => true,
        }
    }

    /// Check that every type in a slice is legal.
    pub fn is_legal_types(&self, ctx: &IrContext, tys: &[TypeRef]) -> bool {
        tys.iter().all(|&t| self.is_legal_type(ctx, t))
    }

    /// Check that every value type inside a region is legal: block argument
    /// types, operand and result types of every operation, types carried in
    /// operation attributes (function signatures), recursively.
    pub fn is_legal_region(&self, ctx: &IrContext, region: RegionRef) -> bool {
        for &block in &ctx.region(region).blocks {
            for &arg in ctx.block_args(block) {
                if !self.is_legal_type(ctx, ctx.value_ty(arg)) {
                    return false;
                }
            }
            for &op in &ctx.block(block).ops {
                for &v in ctx.op_operands(op) {
                    if !self.is_legal_type(ctx, ctx.value_ty(v)) {
                        return false;
                    }
                }
                if !self.is_legal_types(ctx, ctx.op_result_types(op)) {
                    return false;
                }
                if !ctx
                    .op(op)
                    .attributes
                    .values()
                    .all(|a| self.attr_types_legal(ctx, a))
                {
                    return false;
                }
                for &nested in &ctx.op(op).regions {
                    if !self.is_legal_region(ctx, nested) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Bridge `value` to `to_ty` via the materialization hook.
    ///
    /// Returns the value itself (no ops) when it already has the target
    /// type, and `None` when no hook is installed or the hook declines.
    pub fn materialize(
        &self,
        ctx: &mut IrContext,
        loc: Location,
        value: ValueRef,
        to_ty: TypeRef,
    ) -> Option<MaterializeResult> {
        let from_ty = ctx.value_ty(value);
        if from_ty == to_ty {
            return Some(MaterializeResult {
                value,
                ops: vec![],
            });
        }
        let hook = self.materializer.as_ref()?;
        hook(ctx, loc, value, from_ty, to_ty)
    }
}
