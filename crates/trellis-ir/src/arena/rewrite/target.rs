//! Conversion target: which operations count as legal.
//!
//! Legality can be declared per dialect, per operation, or dynamically per
//! instance via a predicate. More specific declarations win: a dynamic
//! predicate beats an op-level declaration, which beats a dialect-level one.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::ControlFlow;

use crate::arena::context::IrContext;
use crate::arena::refs::{OpRef, RegionRef};
use crate::arena::walk::{WalkAction, walk_region};
use crate::ir::Symbol;

/// Per-instance legality predicate.
pub type DynamicLegalityFn = dyn Fn(&IrContext, OpRef) -> bool;

/// Legality verdict for one operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Legality {
    Legal,
    Illegal,
    /// No declaration covers the operation. The conversion driver still
    /// attempts to convert such operations, and full conversion treats
    /// them as illegal.
    Unknown,
}

/// Declarative description of the legal operation set.
#[derive(Default)]
pub struct ConversionTarget {
    legal_dialects: HashSet<Symbol>,
    illegal_dialects: HashSet<Symbol>,
    legal_ops: HashSet<(Symbol, Symbol)>,
    illegal_ops: HashSet<(Symbol, Symbol)>,
    dynamic: HashMap<(Symbol, Symbol), Box<DynamicLegalityFn>>,
}

impl ConversionTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_legal_dialect(&mut self, dialect: &str) -> &mut Self {
        self.legal_dialects.insert(Symbol::from_dynamic(dialect));
        self
    }

    pub fn add_illegal_dialect(&mut self, dialect: &str) -> &mut Self {
        self.illegal_dialects.insert(Symbol::from_dynamic(dialect));
        self
    }

    pub fn add_legal_op(&mut self, dialect: &str, op: &str) -> &mut Self {
        self.legal_ops
            .insert((Symbol::from_dynamic(dialect), Symbol::from_dynamic(op)));
        self
    }

    pub fn add_illegal_op(&mut self, dialect: &str, op: &str) -> &mut Self {
        self.illegal_ops
            .insert((Symbol::from_dynamic(dialect), Symbol::from_dynamic(op)));
        self
    }

    /// Declare an operation dynamically legal: the predicate decides per
    /// instance. Overrides any op- or dialect-level declaration.
    pub fn add_dynamic_legality(
        &mut self,
        dialect: &str,
        op: &str,
        f: impl Fn(&IrContext, OpRef) -> bool + 'static,
    ) -> &mut Self {
        self.dynamic.insert(
            (Symbol::from_dynamic(dialect), Symbol::from_dynamic(op)),
            Box::new(f),
        );
        self
    }

    /// Decide the legality of one operation instance.
    pub fn legality(&self, ctx: &IrContext, op: OpRef) -> Legality {
        let data = ctx.op(op);
        let key = (data.dialect, data.name);

        if let Some(pred) = self.dynamic.get(&key) {
            return if pred(ctx, op) {
                Legality::Legal
            } else {
                Legality::Illegal
            };
        }
        if self.illegal_ops.contains(&key) {
            return Legality::Illegal;
        }
        if self.legal_ops.contains(&key) {
            return Legality::Legal;
        }
        if self.illegal_dialects.contains(&data.dialect) {
            return Legality::Illegal;
        }
        if self.legal_dialects.contains(&data.dialect) {
            return Legality::Legal;
        }
        Legality::Unknown
    }

    /// Collect every operation in a region that is not legal.
    pub fn verify(&self, ctx: &IrContext, region: RegionRef) -> Vec<IllegalOp> {
        let mut illegal = Vec::new();
        let _ = walk_region::<()>(ctx, region, &mut |op| {
            let legality = self.legality(ctx, op);
            if legality != Legality::Legal {
                let data = ctx.op(op);
                illegal.push(IllegalOp {
                    op,
                    dialect: data.dialect,
                    name: data.name,
                    legality,
                });
            }
            ControlFlow::Continue(WalkAction::Advance)
        });
        illegal
    }
}

/// One operation that failed legality verification.
#[derive(Clone, Copy, Debug)]
pub struct IllegalOp {
    pub op: OpRef,
    pub dialect: Symbol,
    pub name: Symbol,
    pub legality: Legality,
}

impl fmt::Display for IllegalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.dialect, self.name, self.op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::context::{BlockData, OperationDataBuilder, RegionData};
    use crate::arena::types::{Attribute, Location};
    use crate::location::Span;
    use smallvec::smallvec;

    fn test_op(ctx: &mut IrContext, dialect: &str, name: &str) -> OpRef {
        let path = ctx.paths.intern("test.mlir".to_owned());
        let loc = Location::new(path, Span::new(0, 0));
        let data = OperationDataBuilder::new(
            loc,
            Symbol::from_dynamic(dialect),
            Symbol::from_dynamic(name),
        )
        .build(ctx);
        ctx.create_op(data)
    }

    #[test]
    fn precedence_specific_beats_general() {
        let mut ctx = IrContext::new();
        let mut target = ConversionTarget::new();
        target.add_illegal_dialect("tensor");
        target.add_legal_op("tensor", "load");

        let load = test_op(&mut ctx, "tensor", "load");
        let extract = test_op(&mut ctx, "tensor", "extract");

        assert_eq!(target.legality(&ctx, load), Legality::Legal);
        assert_eq!(target.legality(&ctx, extract), Legality::Illegal);
    }

    #[test]
    fn dynamic_beats_op_declaration() {
        let mut ctx = IrContext::new();
        let mut target = ConversionTarget::new();
        target.add_illegal_op("arith", "const");
        target.add_dynamic_legality("arith", "const", |ctx, op| {
            ctx.op(op)
                .attributes
                .contains_key(&Symbol::new("blessed"))
        });

        let plain = test_op(&mut ctx, "arith", "const");
        assert_eq!(target.legality(&ctx, plain), Legality::Illegal);

        let path = ctx.paths.intern("test.mlir".to_owned());
        let loc = Location::new(path, Span::new(0, 0));
        let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("const"))
            .attr("blessed", Attribute::Unit)
            .build(&mut ctx);
        let blessed = ctx.create_op(data);
        assert_eq!(target.legality(&ctx, blessed), Legality::Legal);
    }

    #[test]
    fn unregistered_ops_are_unknown() {
        let mut ctx = IrContext::new();
        let mut target = ConversionTarget::new();
        target.add_legal_dialect("arith");

        let op = test_op(&mut ctx, "mystery", "thing");
        assert_eq!(target.legality(&ctx, op), Legality::Unknown);
    }

    #[test]
    fn verify_reports_non_legal_ops() {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.mlir".to_owned());
        let loc = Location::new(path, Span::new(0, 0));

        let mut target = ConversionTarget::new();
        target.add_legal_dialect("arith");
        target.add_illegal_dialect("tensor");

        let legal = test_op(&mut ctx, "arith", "const");
        let illegal = test_op(&mut ctx, "tensor", "extract");
        let unknown = test_op(&mut ctx, "mystery", "thing");

        let block = ctx.create_block(BlockData::with_args(loc, []));
        ctx.push_op(block, legal);
        ctx.push_op(block, illegal);
        ctx.push_op(block, unknown);
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });

        let report = target.verify(&ctx, region);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].op, illegal);
        assert_eq!(report[0].legality, Legality::Illegal);
        assert_eq!(report[1].op, unknown);
        assert_eq!(report[1].legality, Legality::Unknown);
        assert_eq!(format!("{}", report[0]), format!("tensor.extract ({illegal})"));
    }
}
