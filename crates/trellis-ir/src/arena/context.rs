//! Mutable IR storage.
//!
//! [`IrContext`] owns every operation, value, block, and region in a module,
//! each in its own `PrimaryMap` keyed by the handle types from
//! [`refs`](super::refs). Operand and result lists live in shared
//! `ListPool`s, and a use-chain per value records who reads it. The context
//! keeps the use-chain in sync through its own mutation methods; writing
//! operand lists directly through `op_mut` bypasses that bookkeeping.

use std::collections::BTreeMap;

use cranelift_entity::{EntityList, ListPool, PrimaryMap, SecondaryMap};
use smallvec::SmallVec;

use super::refs::*;
use super::types::*;
use crate::ir::Symbol;

/// One reader of a value: the consuming operation and the operand slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: OpRef,
    pub operand_index: u32,
}

/// Payload of an operation: its name, operands, result types, attributes,
/// owned regions, and successor blocks.
///
/// An operation starts out detached (`parent_block` is `None`) and is placed
/// into a block with [`IrContext::push_op`] or one of the insert methods.
pub struct OperationData {
    pub location: Location,
    pub dialect: Symbol,
    pub name: Symbol,
    pub operands: EntityList<ValueRef>,
    pub results: EntityList<TypeRef>,
    pub attributes: BTreeMap<Symbol, Attribute>,
    pub regions: SmallVec<[RegionRef; 4]>,
    pub successors: SmallVec<[BlockRef; 4]>,
    pub parent_block: Option<BlockRef>,
}

impl OperationData {
    /// Bare operation with no operands, results, or attributes. Most call
    /// sites go through [`OperationDataBuilder`] instead.
    pub fn new(location: Location, dialect: Symbol, name: Symbol) -> Self {
        Self {
            location,
            dialect,
            name,
            operands: EntityList::new(),
            results: EntityList::new(),
            attributes: BTreeMap::new(),
            regions: SmallVec::new(),
            successors: SmallVec::new(),
            parent_block: None,
        }
    }
}

/// Payload of an SSA value: where it is defined and its type.
pub struct ValueData {
    pub def: ValueDef,
    pub ty: TypeRef,
}

/// A block argument: its type plus per-argument attributes.
#[derive(Clone, Debug)]
pub struct BlockArgData {
    pub ty: TypeRef,
    pub attrs: BTreeMap<Symbol, Attribute>,
}

impl BlockArgData {
    pub fn of(ty: TypeRef) -> Self {
        Self {
            ty,
            attrs: BTreeMap::new(),
        }
    }
}

/// Payload of a basic block.
pub struct BlockData {
    pub location: Location,
    pub args: Vec<BlockArgData>,
    pub ops: SmallVec<[OpRef; 4]>,
    pub parent_region: Option<RegionRef>,
}

impl BlockData {
    /// Detached empty block taking arguments of the given types.
    pub fn with_args(location: Location, args: impl IntoIterator<Item = TypeRef>) -> Self {
        Self {
            location,
            args: args.into_iter().map(BlockArgData::of).collect(),
            ops: SmallVec::new(),
            parent_region: None,
        }
    }
}

/// Payload of a region: an ordered list of blocks and the owning operation.
pub struct RegionData {
    pub location: Location,
    pub blocks: SmallVec<[BlockRef; 4]>,
    pub parent_op: Option<OpRef>,
}

/// The arena holding a module's IR.
///
/// Creation methods allocate SSA values for results and block arguments and
/// register operand uses; removal methods assert that nothing still points
/// at the entity being removed.
pub struct IrContext {
    ops: PrimaryMap<OpRef, OperationData>,
    values: PrimaryMap<ValueRef, ValueData>,
    blocks: PrimaryMap<BlockRef, BlockData>,
    regions: PrimaryMap<RegionRef, RegionData>,

    // Who reads each value.
    uses: SecondaryMap<ValueRef, SmallVec<[Use; 2]>>,

    pub types: TypeInterner,
    pub paths: PathInterner,

    // Shared backing storage for the EntityLists above.
    pub(crate) value_pool: ListPool<ValueRef>,
    pub(crate) type_pool: ListPool<TypeRef>,

    // Allocated SSA values, per defining site.
    result_values: SecondaryMap<OpRef, EntityList<ValueRef>>,
    block_arg_values: SecondaryMap<BlockRef, EntityList<ValueRef>>,
}

impl IrContext {
    pub fn new() -> Self {
        Self {
            ops: PrimaryMap::new(),
            values: PrimaryMap::new(),
            blocks: PrimaryMap::new(),
            regions: PrimaryMap::new(),
            uses: SecondaryMap::new(),
            types: TypeInterner::new(),
            paths: PathInterner::new(),
            value_pool: ListPool::new(),
            type_pool: ListPool::new(),
            result_values: SecondaryMap::new(),
            block_arg_values: SecondaryMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Allocate an operation, claim its regions, record its operand uses,
    /// and mint one SSA value per result type.
    ///
    /// # Panics
    ///
    /// Panics if `data.parent_block` is preset (operations are created
    /// detached) or if one of `data.regions` is already owned elsewhere.
    pub fn create_op(&mut self, data: OperationData) -> OpRef {
        assert!(
            data.parent_block.is_none(),
            "create_op: parent_block is preset; operations are created \
             detached and placed with push_op",
        );
        let op = self.ops.push(data);

        let owned: SmallVec<[RegionRef; 4]> = self.ops[op].regions.clone();
        for &region in &owned {
            if let Some(owner) = self.regions[region].parent_op {
                panic!("create_op: region {region} is already owned by {owner}");
            }
            self.regions[region].parent_op = Some(op);
        }

        let operands: SmallVec<[ValueRef; 8]> =
            self.ops[op].operands.as_slice(&self.value_pool).into();
        for (slot, &operand) in operands.iter().enumerate() {
            self.uses[operand].push(Use {
                user: op,
                operand_index: slot as u32,
            });
        }

        let result_tys: SmallVec<[TypeRef; 4]> =
            self.ops[op].results.as_slice(&self.type_pool).into();
        let mut minted = EntityList::new();
        for (idx, &ty) in result_tys.iter().enumerate() {
            let v = self.values.push(ValueData {
                def: ValueDef::OpResult(op, idx as u32),
                ty,
            });
            minted.push(v, &mut self.value_pool);
        }
        self.result_values[op] = minted;

        op
    }

    pub fn op(&self, op: OpRef) -> &OperationData {
        &self.ops[op]
    }

    /// Raw mutable access. Touching `operands` here desyncs the use-chain;
    /// go through [`replace_all_uses`](Self::replace_all_uses) or rebuild
    /// the operation instead.
    pub fn op_mut(&mut self, op: OpRef) -> &mut OperationData {
        &mut self.ops[op]
    }

    pub fn op_operands(&self, op: OpRef) -> &[ValueRef] {
        self.ops[op].operands.as_slice(&self.value_pool)
    }

    pub fn op_result_types(&self, op: OpRef) -> &[TypeRef] {
        self.ops[op].results.as_slice(&self.type_pool)
    }

    pub fn op_result(&self, op: OpRef, index: u32) -> ValueRef {
        self.result_values[op].as_slice(&self.value_pool)[index as usize]
    }

    pub fn op_results(&self, op: OpRef) -> &[ValueRef] {
        self.result_values[op].as_slice(&self.value_pool)
    }

    /// Unregister an operation's operand uses, making it garbage.
    ///
    /// # Panics
    ///
    /// Panics if the operation is still in a block (detach with
    /// [`remove_op_from_block`](Self::remove_op_from_block) first) or if
    /// any of its results is still used.
    pub fn remove_op(&mut self, op: OpRef) {
        assert!(
            self.ops[op].parent_block.is_none(),
            "remove_op: {op} is still in {}; detach it first",
            self.ops[op].parent_block.unwrap(),
        );
        let results: SmallVec<[ValueRef; 4]> =
            self.result_values[op].as_slice(&self.value_pool).into();
        for &result in &results {
            assert!(
                self.uses[result].is_empty(),
                "remove_op: {result} is still used ({} use(s))",
                self.uses[result].len(),
            );
        }

        let operands: SmallVec<[ValueRef; 8]> =
            self.ops[op].operands.as_slice(&self.value_pool).into();
        for (slot, &operand) in operands.iter().enumerate() {
            self.uses[operand].retain(|u| u.user != op || u.operand_index != slot as u32);
        }
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    pub fn value(&self, v: ValueRef) -> &ValueData {
        &self.values[v]
    }

    pub fn value_ty(&self, v: ValueRef) -> TypeRef {
        self.values[v].ty
    }

    pub fn value_def(&self, v: ValueRef) -> ValueDef {
        self.values[v].def
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    /// Allocate a block and mint one SSA value per declared argument.
    pub fn create_block(&mut self, data: BlockData) -> BlockRef {
        let arg_tys: SmallVec<[TypeRef; 4]> = data.args.iter().map(|a| a.ty).collect();
        let block = self.blocks.push(data);

        let mut minted = EntityList::new();
        for (idx, &ty) in arg_tys.iter().enumerate() {
            let v = self.values.push(ValueData {
                def: ValueDef::BlockArg(block, idx as u32),
                ty,
            });
            minted.push(v, &mut self.value_pool);
        }
        self.block_arg_values[block] = minted;

        block
    }

    pub fn block(&self, b: BlockRef) -> &BlockData {
        &self.blocks[b]
    }

    pub fn block_mut(&mut self, b: BlockRef) -> &mut BlockData {
        &mut self.blocks[b]
    }

    pub fn block_arg(&self, b: BlockRef, index: u32) -> ValueRef {
        self.block_arg_values[b].as_slice(&self.value_pool)[index as usize]
    }

    pub fn block_args(&self, b: BlockRef) -> &[ValueRef] {
        self.block_arg_values[b].as_slice(&self.value_pool)
    }

    /// Retype a block argument without minting a new value, so existing
    /// uses follow along. This is how signature rewrites adapt entry-block
    /// arguments.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set_block_arg_type(&mut self, b: BlockRef, index: u32, ty: TypeRef) {
        let v = self.block_arg(b, index);
        self.values[v].ty = ty;
        self.blocks[b].args[index as usize].ty = ty;
    }

    /// Append a detached operation at the end of a block.
    ///
    /// # Panics
    ///
    /// Panics if the operation is already in a block.
    pub fn push_op(&mut self, block: BlockRef, op: OpRef) {
        self.assert_detached(op, "push_op");
        self.ops[op].parent_block = Some(block);
        self.blocks[block].ops.push(op);
    }

    /// Insert a detached operation immediately before `anchor`.
    ///
    /// # Panics
    ///
    /// Panics if the operation is already in a block or `anchor` is not in
    /// `block`.
    pub fn insert_op_before(&mut self, block: BlockRef, anchor: OpRef, op: OpRef) {
        self.assert_detached(op, "insert_op_before");
        let at = self.position_of(block, anchor, "insert_op_before");
        self.blocks[block].ops.insert(at, op);
        self.ops[op].parent_block = Some(block);
    }

    /// Insert a detached operation immediately after `anchor`.
    ///
    /// # Panics
    ///
    /// Panics if the operation is already in a block or `anchor` is not in
    /// `block`.
    pub fn insert_op_after(&mut self, block: BlockRef, anchor: OpRef, op: OpRef) {
        self.assert_detached(op, "insert_op_after");
        let at = self.position_of(block, anchor, "insert_op_after");
        self.blocks[block].ops.insert(at + 1, op);
        self.ops[op].parent_block = Some(block);
    }

    /// Take an operation out of a block without destroying it. The handle
    /// and the operation's results stay valid.
    pub fn remove_op_from_block(&mut self, block: BlockRef, op: OpRef) {
        self.blocks[block].ops.retain(|o| *o != op);
        if self.ops[op].parent_block == Some(block) {
            self.ops[op].parent_block = None;
        }
    }

    fn assert_detached(&self, op: OpRef, caller: &str) {
        assert!(
            self.ops[op].parent_block.is_none(),
            "{caller}: {op} is already in {}",
            self.ops[op].parent_block.unwrap(),
        );
    }

    fn position_of(&self, block: BlockRef, anchor: OpRef, caller: &str) -> usize {
        self.blocks[block]
            .ops
            .iter()
            .position(|&o| o == anchor)
            .unwrap_or_else(|| panic!("{caller}: anchor {anchor} is not in {block}"))
    }

    // ------------------------------------------------------------------
    // Regions
    // ------------------------------------------------------------------

    /// Allocate a region and claim its blocks.
    ///
    /// # Panics
    ///
    /// Panics if one of `data.blocks` is already owned by another region.
    pub fn create_region(&mut self, data: RegionData) -> RegionRef {
        let region = self.regions.push(data);
        let claimed: SmallVec<[BlockRef; 4]> = self.regions[region].blocks.clone();
        for &block in &claimed {
            if let Some(owner) = self.blocks[block].parent_region {
                panic!("create_region: {block} is already owned by {owner}");
            }
            self.blocks[block].parent_region = Some(region);
        }
        region
    }

    pub fn region(&self, r: RegionRef) -> &RegionData {
        &self.regions[r]
    }

    pub fn region_mut(&mut self, r: RegionRef) -> &mut RegionData {
        &mut self.regions[r]
    }

    /// Release a region from its owner so a replacement operation can claim
    /// it in `create_op`. The old owner keeps its stale region list; it is
    /// expected to be removed right after.
    pub fn detach_region(&mut self, r: RegionRef) {
        self.regions[r].parent_op = None;
    }

    // ------------------------------------------------------------------
    // Use-chains
    // ------------------------------------------------------------------

    pub fn uses(&self, v: ValueRef) -> &[Use] {
        &self.uses[v]
    }

    pub fn has_uses(&self, v: ValueRef) -> bool {
        !self.uses[v].is_empty()
    }

    /// Redirect every use of `old` to `new`, rewriting operand lists and
    /// moving the use records over. A no-op when `old == new`.
    pub fn replace_all_uses(&mut self, old: ValueRef, new: ValueRef) {
        if old == new {
            return;
        }
        let moved = std::mem::take(&mut self.uses[old]);
        for u in moved {
            let operands = self.ops[u.user]
                .operands
                .as_mut_slice(&mut self.value_pool);
            debug_assert_eq!(operands[u.operand_index as usize], old);
            operands[u.operand_index as usize] = new;
            self.uses[new].push(u);
        }
    }
}

impl Default for IrContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds [`OperationData`] incrementally, packing the collected operands
/// and result types into pool-backed lists on [`build`](Self::build).
pub struct OperationDataBuilder {
    location: Location,
    dialect: Symbol,
    name: Symbol,
    operands: Vec<ValueRef>,
    results: Vec<TypeRef>,
    attributes: BTreeMap<Symbol, Attribute>,
    regions: SmallVec<[RegionRef; 4]>,
    successors: SmallVec<[BlockRef; 4]>,
}

impl OperationDataBuilder {
    pub fn new(location: Location, dialect: Symbol, name: Symbol) -> Self {
        Self {
            location,
            dialect,
            name,
            operands: Vec::new(),
            results: Vec::new(),
            attributes: BTreeMap::new(),
            regions: SmallVec::new(),
            successors: SmallVec::new(),
        }
    }

    pub fn operand(mut self, v: ValueRef) -> Self {
        self.operands.push(v);
        self
    }

    pub fn operands(mut self, vs: impl IntoIterator<Item = ValueRef>) -> Self {
        self.operands.extend(vs);
        self
    }

    pub fn result(mut self, ty: TypeRef) -> Self {
        self.results.push(ty);
        self
    }

    pub fn results(mut self, tys: impl IntoIterator<Item = TypeRef>) -> Self {
        self.results.extend(tys);
        self
    }

    pub fn attr(mut self, key: impl Into<Symbol>, val: Attribute) -> Self {
        self.attributes.insert(key.into(), val);
        self
    }

    pub fn region(mut self, r: RegionRef) -> Self {
        self.regions.push(r);
        self
    }

    pub fn successor(mut self, b: BlockRef) -> Self {
        self.successors.push(b);
        self
    }

    pub fn build(self, ctx: &mut IrContext) -> OperationData {
        let mut operands = EntityList::new();
        for v in self.operands {
            operands.push(v, &mut ctx.value_pool);
        }
        let mut results = EntityList::new();
        for ty in self.results {
            results.push(ty, &mut ctx.type_pool);
        }
        OperationData {
            location: self.location,
            dialect: self.dialect,
            name: self.name,
            operands,
            results,
            attributes: self.attributes,
            regions: self.regions,
            successors: self.successors,
            parent_block: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Symbol;
    use crate::location::Span;
    use smallvec::smallvec;

    fn test_location(ctx: &mut IrContext) -> Location {
        let path = ctx.paths.intern("buffers.mlir".to_owned());
        Location::new(path, Span::new(0, 0))
    }

    fn f32_type(ctx: &mut IrContext) -> TypeRef {
        ctx.types.intern(TypeData {
            dialect: Symbol::new("core"),
            name: Symbol::new("f32"),
            params: smallvec![],
            attrs: BTreeMap::new(),
        })
    }

    #[test]
    fn built_op_reads_back() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let f32_ty = f32_type(&mut ctx);

        let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("const"))
            .result(f32_ty)
            .attr("value", Attribute::IntBits(42))
            .build(&mut ctx);
        let op = ctx.create_op(data);

        assert_eq!(ctx.op(op).dialect, Symbol::new("arith"));
        assert_eq!(ctx.op(op).name, Symbol::new("const"));
        assert_eq!(ctx.op_result_types(op), &[f32_ty]);
        assert_eq!(
            ctx.op(op).attributes.get(&Symbol::new("value")),
            Some(&Attribute::IntBits(42))
        );
    }

    #[test]
    fn results_are_minted_per_type() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let f32_ty = f32_type(&mut ctx);

        let data = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("multi"))
            .result(f32_ty)
            .result(f32_ty)
            .build(&mut ctx);
        let op = ctx.create_op(data);

        assert_eq!(ctx.op_results(op).len(), 2);
        let r0 = ctx.op_result(op, 0);
        let r1 = ctx.op_result(op, 1);
        assert_ne!(r0, r1);
        assert_eq!(ctx.value_ty(r0), f32_ty);
        assert_eq!(ctx.value_def(r0), ValueDef::OpResult(op, 0));
        assert_eq!(ctx.value_def(r1), ValueDef::OpResult(op, 1));
    }

    #[test]
    fn block_args_are_minted_in_order() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let f32_ty = f32_type(&mut ctx);

        let block = ctx.create_block(BlockData::with_args(loc, [f32_ty, f32_ty]));

        assert_eq!(ctx.block_args(block).len(), 2);
        let a0 = ctx.block_arg(block, 0);
        let a1 = ctx.block_arg(block, 1);
        assert_ne!(a0, a1);
        assert_eq!(ctx.value_ty(a0), f32_ty);
        assert_eq!(ctx.value_def(a0), ValueDef::BlockArg(block, 0));
        assert_eq!(ctx.value_def(a1), ValueDef::BlockArg(block, 1));
    }

    #[test]
    fn set_block_arg_type_keeps_identity() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let f32_ty = f32_type(&mut ctx);
        let i64_ty = ctx.types.intern(TypeData {
            dialect: Symbol::new("core"),
            name: Symbol::new("i64"),
            params: smallvec![],
            attrs: BTreeMap::new(),
        });

        let block = ctx.create_block(BlockData::with_args(loc, [f32_ty]));
        let arg = ctx.block_arg(block, 0);

        // A user established before the retype
        let data = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("use"))
            .operand(arg)
            .build(&mut ctx);
        let user = ctx.create_op(data);

        ctx.set_block_arg_type(block, 0, i64_ty);

        assert_eq!(ctx.block_arg(block, 0), arg, "same value after retype");
        assert_eq!(ctx.value_ty(arg), i64_ty);
        assert_eq!(ctx.block(block).args[0].ty, i64_ty);
        assert_eq!(ctx.op_operands(user), &[arg]);
    }

    #[test]
    fn uses_track_user_and_slot() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let f32_ty = f32_type(&mut ctx);

        let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("const"))
            .result(f32_ty)
            .build(&mut ctx);
        let producer = ctx.create_op(data);
        let v = ctx.op_result(producer, 0);
        assert!(!ctx.has_uses(v));

        let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("neg"))
            .operand(v)
            .result(f32_ty)
            .build(&mut ctx);
        let consumer = ctx.create_op(data);

        assert_eq!(
            ctx.uses(v),
            &[Use {
                user: consumer,
                operand_index: 0
            }]
        );
    }

    #[test]
    fn replace_all_uses_rewrites_every_slot() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let f32_ty = f32_type(&mut ctx);

        let mk_const = |ctx: &mut IrContext| {
            let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("const"))
                .result(f32_ty)
                .build(ctx);
            let op = ctx.create_op(data);
            ctx.op_result(op, 0)
        };
        let v_old = mk_const(&mut ctx);
        let v_new = mk_const(&mut ctx);

        // Both operand slots read v_old
        let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("add"))
            .operand(v_old)
            .operand(v_old)
            .result(f32_ty)
            .build(&mut ctx);
        let add = ctx.create_op(data);
        assert_eq!(ctx.uses(v_old).len(), 2);

        ctx.replace_all_uses(v_old, v_new);

        assert!(!ctx.has_uses(v_old));
        assert_eq!(ctx.uses(v_new).len(), 2);
        assert_eq!(ctx.op_operands(add), &[v_new, v_new]);
    }

    #[test]
    fn parents_are_linked_on_attach() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let f32_ty = f32_type(&mut ctx);

        let block = ctx.create_block(BlockData::with_args(loc, []));
        let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("const"))
            .result(f32_ty)
            .build(&mut ctx);
        let op = ctx.create_op(data);
        assert_eq!(ctx.op(op).parent_block, None);

        ctx.push_op(block, op);
        assert_eq!(ctx.op(op).parent_block, Some(block));
        assert_eq!(ctx.block(block).ops.as_slice(), &[op]);

        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });
        assert_eq!(ctx.block(block).parent_region, Some(region));
    }

    #[test]
    fn insertion_respects_anchors() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let f32_ty = f32_type(&mut ctx);

        let block = ctx.create_block(BlockData::with_args(loc, []));
        let mk_op = |ctx: &mut IrContext, name: &'static str| {
            let data = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new(name))
                .result(f32_ty)
                .build(ctx);
            ctx.create_op(data)
        };

        let op_a = mk_op(&mut ctx, "a");
        let op_d = mk_op(&mut ctx, "d");
        ctx.push_op(block, op_a);
        ctx.push_op(block, op_d);

        let op_c = mk_op(&mut ctx, "c");
        ctx.insert_op_before(block, op_d, op_c);
        let op_b = mk_op(&mut ctx, "b");
        ctx.insert_op_after(block, op_a, op_b);

        assert_eq!(ctx.block(block).ops.as_slice(), &[op_a, op_b, op_c, op_d]);
        assert_eq!(ctx.op(op_b).parent_block, Some(block));
        assert_eq!(ctx.op(op_c).parent_block, Some(block));
    }

    #[test]
    fn detaching_from_block_keeps_op_alive() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let f32_ty = f32_type(&mut ctx);

        let block = ctx.create_block(BlockData::with_args(loc, []));
        let data = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("x"))
            .result(f32_ty)
            .build(&mut ctx);
        let op = ctx.create_op(data);
        ctx.push_op(block, op);

        ctx.remove_op_from_block(block, op);
        assert!(ctx.block(block).ops.is_empty());
        assert_eq!(ctx.op(op).parent_block, None);
        assert_eq!(ctx.op_result_types(op), &[f32_ty]);
    }

    #[test]
    fn detached_region_can_be_reclaimed() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);

        let block = ctx.create_block(BlockData::with_args(loc, []));
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });

        let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("func"))
            .region(region)
            .build(&mut ctx);
        let op1 = ctx.create_op(data);
        assert_eq!(ctx.region(region).parent_op, Some(op1));

        ctx.detach_region(region);
        let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("func"))
            .region(region)
            .build(&mut ctx);
        let op2 = ctx.create_op(data);
        assert_eq!(ctx.region(region).parent_op, Some(op2));
    }

    #[test]
    fn entity_ref_display() {
        use cranelift_entity::EntityRef;

        let op = OpRef::new(0);
        assert_eq!(format!("{op}"), "op0");

        let v = ValueRef::new(5);
        assert_eq!(format!("{v}"), "val5");

        let b = BlockRef::new(2);
        assert_eq!(format!("{b}"), "bb2");

        let r = RegionRef::new(1);
        assert_eq!(format!("{r}"), "rgn1");

        let ty = TypeRef::new(3);
        assert_eq!(format!("{ty}"), "type3");

        let p = PathRef::new(0);
        assert_eq!(format!("{p}"), "file0");
    }

    #[test]
    #[should_panic(expected = "is still used")]
    fn remove_op_refuses_live_results() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let f32_ty = f32_type(&mut ctx);

        let data = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("a"))
            .result(f32_ty)
            .build(&mut ctx);
        let producer = ctx.create_op(data);
        let v = ctx.op_result(producer, 0);

        let data = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("b"))
            .operand(v)
            .result(f32_ty)
            .build(&mut ctx);
        let _consumer = ctx.create_op(data);

        ctx.remove_op(producer);
    }

    #[test]
    fn owned_regions_are_claimed() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);

        let block = ctx.create_block(BlockData::with_args(loc, []));
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });
        assert_eq!(ctx.region(region).parent_op, None);

        let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("func"))
            .region(region)
            .build(&mut ctx);
        let op = ctx.create_op(data);
        assert_eq!(ctx.region(region).parent_op, Some(op));
    }

    #[test]
    #[should_panic(expected = "created detached")]
    fn create_op_refuses_preset_parent() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let f32_ty = f32_type(&mut ctx);

        let block = ctx.create_block(BlockData::with_args(loc, []));

        let mut data = OperationData::new(loc, Symbol::new("test"), Symbol::new("x"));
        data.results.push(f32_ty, &mut ctx.type_pool);
        data.parent_block = Some(block);

        ctx.create_op(data);
    }

    #[test]
    #[should_panic(expected = "already owned by")]
    fn regions_cannot_be_claimed_twice() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);

        let block = ctx.create_block(BlockData::with_args(loc, []));
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });

        let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("func"))
            .region(region)
            .build(&mut ctx);
        let _owner = ctx.create_op(data);

        let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("func"))
            .region(region)
            .build(&mut ctx);
        ctx.create_op(data);
    }

    #[test]
    #[should_panic(expected = "already owned by")]
    fn blocks_cannot_be_claimed_twice() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);

        let block = ctx.create_block(BlockData::with_args(loc, []));
        let _first = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });
        ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });
    }
}
