//! Typed handles into the [`IrContext`](crate::arena::IrContext) arenas.
//!
//! All IR entities are addressed by index, never by pointer: a handle is a
//! `u32` newtype tied to exactly one `PrimaryMap`, so an `OpRef` cannot be
//! used where a `BlockRef` is expected. Handles stay valid for the lifetime
//! of the context; removing an operation from a block does not invalidate
//! handles already held elsewhere.

use cranelift_entity::entity_impl;
use std::fmt;

macro_rules! arena_ref {
    ($($(#[$meta:meta])* $name:ident => $tag:literal;)*) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(u32);
            entity_impl!($name, $tag);
        )*
    };
}

arena_ref! {
    /// Handle to an operation.
    OpRef => "op";
    /// Handle to an SSA value (an operation result or a block argument).
    ValueRef => "val";
    /// Handle to a basic block.
    BlockRef => "bb";
    /// Handle to a region, an ordered list of blocks owned by an operation.
    RegionRef => "rgn";
    /// Handle to a structurally interned type.
    TypeRef => "type";
    /// Handle to an interned source file path.
    PathRef => "file";
}

/// The defining site of an SSA value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueDef {
    /// The `n`-th result of an operation.
    OpResult(OpRef, u32),
    /// The `n`-th argument of a block.
    BlockArg(BlockRef, u32),
}

impl ValueDef {
    /// The operation producing this value, if it is an operation result.
    pub fn defining_op(self) -> Option<OpRef> {
        match self {
            ValueDef::OpResult(op, _) => Some(op),
            ValueDef::BlockArg(..) => None,
        }
    }

    /// Result or argument position at the defining site.
    pub fn index(self) -> u32 {
        match self {
            ValueDef::OpResult(_, idx) | ValueDef::BlockArg(_, idx) => idx,
        }
    }
}

impl fmt::Display for ValueDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueDef::OpResult(op, idx) => write!(f, "{op}.res{idx}"),
            ValueDef::BlockArg(block, idx) => write!(f, "{block}.arg{idx}"),
        }
    }
}
