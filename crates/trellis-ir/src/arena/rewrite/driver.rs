//! Conversion driver: applies patterns until the target is reached.
//!
//! The driver sweeps the module top-down. For each non-legal operation it
//! converts the operand types through the [`TypeConverter`], then offers the
//! operation to each pattern in benefit order. A committed rewrite ends the
//! sweep for that operation; sweeps repeat until a fixpoint or the iteration
//! cap. Partial conversion accepts whatever remains; full conversion verifies
//! that every operation is legal afterwards.

use thiserror::Error;

use crate::arena::context::IrContext;
use crate::arena::dialect::core;
use crate::arena::refs::{BlockRef, OpRef, RegionRef, ValueRef};
use crate::arena::rewrite::pattern::ConversionPattern;
use crate::arena::rewrite::rewriter::{PatternRewriter, apply_mutations, materialize_or_cast};
use crate::arena::rewrite::target::{ConversionTarget, IllegalOp, Legality};
use crate::arena::rewrite::type_converter::TypeConverter;

/// How strictly the target must be reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionMode {
    /// Leave unconverted operations in place.
    Partial,
    /// Fail if any non-legal operation survives.
    Full,
}

/// Driver configuration.
#[derive(Clone, Copy, Debug)]
pub struct DriverConfig {
    pub mode: ConversionMode,
    /// Cap on fixpoint sweeps over the module.
    pub max_iterations: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            mode: ConversionMode::Partial,
            max_iterations: 10,
        }
    }
}

/// Statistics from a driver run.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApplyOutcome {
    /// Number of sweeps performed.
    pub iterations: usize,
    /// Total pattern applications committed.
    pub applied: usize,
    /// Whether the last sweep made no changes.
    pub reached_fixpoint: bool,
}

/// Full conversion left non-legal operations behind.
#[derive(Debug, Error)]
#[error("conversion failed: {} illegal operation(s) remain", illegal.len())]
pub struct ConversionFailed {
    pub illegal: Vec<IllegalOp>,
}

/// Applies a pattern set against a conversion target.
pub struct ConversionDriver {
    target: ConversionTarget,
    converter: TypeConverter,
    patterns: Vec<Box<dyn ConversionPattern>>,
    config: DriverConfig,
}

impl ConversionDriver {
    pub fn new(target: ConversionTarget, converter: TypeConverter, mode: ConversionMode) -> Self {
        Self {
            target,
            converter,
            patterns: Vec::new(),
            config: DriverConfig {
                mode,
                ..DriverConfig::default()
            },
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn add_pattern(&mut self, pattern: impl ConversionPattern + 'static) -> &mut Self {
        self.patterns.push(Box::new(pattern));
        self
    }

    pub fn add_boxed_pattern(&mut self, pattern: Box<dyn ConversionPattern>) -> &mut Self {
        self.patterns.push(pattern);
        self
    }

    pub fn target(&self) -> &ConversionTarget {
        &self.target
    }

    /// Run the conversion over a module.
    pub fn run(
        &self,
        ctx: &mut IrContext,
        module: core::Module,
    ) -> Result<ApplyOutcome, ConversionFailed> {
        // Stable sort keeps registration order among equal benefits.
        let mut sorted: Vec<&dyn ConversionPattern> =
            self.patterns.iter().map(|p| p.as_ref()).collect();
        sorted.sort_by_key(|p| std::cmp::Reverse(p.benefit()));

        let body = module.body(ctx);
        let mut outcome = ApplyOutcome::default();
        while outcome.iterations < self.config.max_iterations {
            outcome.iterations += 1;
            let applied = self.sweep_region(ctx, body, &sorted);
            tracing::trace!(
                iteration = outcome.iterations,
                applied,
                "conversion sweep"
            );
            outcome.applied += applied;
            if applied == 0 {
                outcome.reached_fixpoint = true;
                break;
            }
        }

        match self.config.mode {
            ConversionMode::Partial => Ok(outcome),
            ConversionMode::Full => {
                let illegal = self.target.verify(ctx, body);
                if illegal.is_empty() {
                    Ok(outcome)
                } else {
                    tracing::warn!(
                        remaining = illegal.len(),
                        "full conversion left illegal operations"
                    );
                    Err(ConversionFailed { illegal })
                }
            }
        }
    }

    fn sweep_region(
        &self,
        ctx: &mut IrContext,
        region: RegionRef,
        sorted: &[&dyn ConversionPattern],
    ) -> usize {
        let blocks: Vec<BlockRef> = ctx.region(region).blocks.to_vec();
        let mut applied = 0;
        for block in blocks {
            applied += self.sweep_block(ctx, block, sorted);
        }
        applied
    }

    fn sweep_block(
        &self,
        ctx: &mut IrContext,
        block: BlockRef,
        sorted: &[&dyn ConversionPattern],
    ) -> usize {
        // Snapshot: patterns may insert or remove ops in this block.
        let ops: Vec<OpRef> = ctx.block(block).ops.to_vec();
        let mut applied = 0;
        for op in ops {
            // Skip ops a previous rewrite in this sweep detached.
            if ctx.op(op).parent_block != Some(block) {
                continue;
            }
            if self.try_convert(ctx, op, sorted) {
                applied += 1;
                continue;
            }
            let regions = ctx.op(op).regions.clone();
            for region in regions {
                applied += self.sweep_region(ctx, region, sorted);
            }
        }
        applied
    }

    /// Offer one operation to the pattern set. Returns true if a rewrite
    /// was committed.
    fn try_convert(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        sorted: &[&dyn ConversionPattern],
    ) -> bool {
        if self.target.legality(ctx, op) == Legality::Legal {
            return false;
        }

        let loc = ctx.op(op).location;
        let operands: Vec<ValueRef> = ctx.op_operands(op).to_vec();
        let mut converted = Vec::with_capacity(operands.len());
        let mut cast_ops: Vec<OpRef> = Vec::new();
        for v in operands {
            let ty = ctx.value_ty(v);
            match self.converter.convert_type(ctx, ty) {
                Some(new_ty) if new_ty != ty => {
                    let (nv, ops) = materialize_or_cast(ctx, &self.converter, loc, v, new_ty);
                    converted.push(nv);
                    cast_ops.extend(ops);
                }
                _ => converted.push(v),
            }
        }

        for pattern in sorted {
            let mut rewriter = PatternRewriter::new(&self.converter, cast_ops.clone());
            if pattern.match_and_rewrite(ctx, op, &converted, &mut rewriter)
                && rewriter.has_rewrite()
            {
                tracing::debug!(pattern = pattern.name(), op = %op, "applied pattern");
                apply_mutations(ctx, &self.converter, op, rewriter.into_mutations());
                return true;
            }
        }

        // No pattern committed: destroy the speculative operand casts so
        // they do not hold uses of live values.
        for cast in cast_ops.into_iter().rev() {
            ctx.remove_op(cast);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::context::{BlockData, OperationDataBuilder, RegionData};
    use crate::arena::types::Location;
    use crate::ir::Symbol;
    use crate::location::Span;
    use smallvec::smallvec;

    /// Renames `from` ops to `to`, keeping operands and result types.
    struct Rename {
        from: &'static str,
        to: &'static str,
        benefit: u16,
    }

    impl ConversionPattern for Rename {
        fn benefit(&self) -> u16 {
            self.benefit
        }

        fn name(&self) -> &'static str {
            "rename"
        }

        fn match_and_rewrite(
            &self,
            ctx: &mut IrContext,
            op: OpRef,
            _operands: &[ValueRef],
            rewriter: &mut PatternRewriter<'_>,
        ) -> bool {
            let data = ctx.op(op);
            if data.dialect != Symbol::new("test") || data.name != Symbol::from_dynamic(self.from) {
                return false;
            }
            let loc = data.location;
            let operands = ctx.op_operands(op).to_vec();
            let results = ctx.op_result_types(op).to_vec();
            let new_data =
                OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::from_dynamic(self.to))
                    .operands(operands)
                    .results(results)
                    .build(ctx);
            let new_op = ctx.create_op(new_data);
            rewriter.replace_op(new_op);
            true
        }
    }

    fn test_module(ctx: &mut IrContext, op_names: &[&str]) -> (core::Module, Vec<OpRef>) {
        let path = ctx.paths.intern("test.mlir".to_owned());
        let loc = Location::new(path, Span::new(0, 0));
        let f32_ty = core::float_type(ctx, 32);

        let block = ctx.create_block(BlockData::with_args(loc, []));
        let mut ops = Vec::new();
        for name in op_names {
            let data =
                OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::from_dynamic(name))
                    .result(f32_ty)
                    .build(ctx);
            let op = ctx.create_op(data);
            ctx.push_op(block, op);
            ops.push(op);
        }
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });
        let module = core::module(ctx, loc, Symbol::new("m"), region);
        (module, ops)
    }

    fn find_ops(ctx: &IrContext, module: core::Module, name: &str) -> Vec<OpRef> {
        module
            .ops(ctx)
            .into_iter()
            .filter(|&op| ctx.op(op).name == Symbol::from_dynamic(name))
            .collect()
    }

    #[test]
    fn rename_reaches_fixpoint() {
        let mut ctx = IrContext::new();
        let (module, ops) = test_module(&mut ctx, &["old", "old", "stable"]);

        // Add a user of the first op's result to check RAUW
        let loc = ctx.op(ops[0]).location;
        let v = ctx.op_result(ops[0], 0);
        let user_data = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("stable"))
            .operand(v)
            .build(&mut ctx);
        let user = ctx.create_op(user_data);
        let block = module.first_block(&ctx).unwrap();
        ctx.push_op(block, user);

        let mut target = ConversionTarget::new();
        target.add_illegal_op("test", "old");
        target.add_legal_dialect("test");
        target.add_legal_dialect("core");

        let mut driver =
            ConversionDriver::new(target, TypeConverter::new(), ConversionMode::Partial);
        driver.add_pattern(Rename {
            from: "old",
            to: "new",
            benefit: 1,
        });

        let outcome = driver.run(&mut ctx, module).unwrap();
        assert_eq!(outcome.applied, 2);
        assert!(outcome.reached_fixpoint);
        assert_eq!(outcome.iterations, 2, "second sweep confirms fixpoint");

        assert!(find_ops(&ctx, module, "old").is_empty());
        let new_ops = find_ops(&ctx, module, "new");
        assert_eq!(new_ops.len(), 2);
        // The user now reads the renamed op's result
        let new_v = ctx.op_result(new_ops[0], 0);
        assert_eq!(ctx.op_operands(user), &[new_v]);
    }

    #[test]
    fn full_mode_rejects_leftover_illegal_ops() {
        let mut ctx = IrContext::new();
        let (module, _) = test_module(&mut ctx, &["unmatched"]);

        let mut target = ConversionTarget::new();
        target.add_illegal_op("test", "unmatched");

        let partial = ConversionDriver::new(
            ConversionTarget::new(),
            TypeConverter::new(),
            ConversionMode::Partial,
        );
        // Partial: nothing matches, run still succeeds
        let outcome = partial.run(&mut ctx, module).unwrap();
        assert_eq!(outcome.applied, 0);
        assert!(outcome.reached_fixpoint);

        let full = ConversionDriver::new(target, TypeConverter::new(), ConversionMode::Full);
        let err = full.run(&mut ctx, module).unwrap_err();
        assert_eq!(err.illegal.len(), 1);
        assert_eq!(err.illegal[0].name, Symbol::new("unmatched"));
    }

    #[test]
    fn unknown_ops_fail_full_conversion() {
        let mut ctx = IrContext::new();
        let (module, _) = test_module(&mut ctx, &["mystery"]);

        // No declaration covers test.mystery at all
        let driver = ConversionDriver::new(
            ConversionTarget::new(),
            TypeConverter::new(),
            ConversionMode::Full,
        );
        let err = driver.run(&mut ctx, module).unwrap_err();
        assert_eq!(err.illegal[0].legality, Legality::Unknown);
    }

    #[test]
    fn higher_benefit_pattern_wins() {
        let mut ctx = IrContext::new();
        let (module, _) = test_module(&mut ctx, &["old"]);

        let mut target = ConversionTarget::new();
        target.add_illegal_op("test", "old");
        target.add_legal_dialect("test");
        target.add_legal_dialect("core");

        let mut driver =
            ConversionDriver::new(target, TypeConverter::new(), ConversionMode::Partial);
        // Registered first but lower benefit
        driver.add_pattern(Rename {
            from: "old",
            to: "low",
            benefit: 1,
        });
        driver.add_pattern(Rename {
            from: "old",
            to: "high",
            benefit: 5,
        });

        driver.run(&mut ctx, module).unwrap();
        assert_eq!(find_ops(&ctx, module, "high").len(), 1);
        assert!(find_ops(&ctx, module, "low").is_empty());
    }

    #[test]
    fn legal_ops_are_never_offered() {
        let mut ctx = IrContext::new();
        let (module, _) = test_module(&mut ctx, &["old"]);

        let mut target = ConversionTarget::new();
        target.add_legal_dialect("test");
        target.add_legal_dialect("core");

        let mut driver =
            ConversionDriver::new(target, TypeConverter::new(), ConversionMode::Partial);
        driver.add_pattern(Rename {
            from: "old",
            to: "new",
            benefit: 1,
        });

        let outcome = driver.run(&mut ctx, module).unwrap();
        assert_eq!(outcome.applied, 0);
        assert_eq!(find_ops(&ctx, module, "old").len(), 1);
    }

    #[test]
    fn iteration_cap_stops_runaway_rewrites() {
        let mut ctx = IrContext::new();
        let (module, _) = test_module(&mut ctx, &["ping"]);

        let mut target = ConversionTarget::new();
        target.add_illegal_op("test", "ping");
        target.add_illegal_op("test", "pong");

        let mut driver =
            ConversionDriver::new(target, TypeConverter::new(), ConversionMode::Partial)
                .with_max_iterations(3);
        driver.add_pattern(Rename {
            from: "ping",
            to: "pong",
            benefit: 1,
        });
        driver.add_pattern(Rename {
            from: "pong",
            to: "ping",
            benefit: 1,
        });

        let outcome = driver.run(&mut ctx, module).unwrap();
        assert_eq!(outcome.iterations, 3);
        assert!(!outcome.reached_fixpoint);
        assert_eq!(outcome.applied, 3);
    }
}
