//! Arena-based IR storage and conversion infrastructure.

pub mod context;
pub mod dialect;
pub mod ops;
pub mod refs;
pub mod rewrite;
pub mod types;
pub mod walk;

pub use context::{
    BlockArgData, BlockData, IrContext, OperationData, OperationDataBuilder, RegionData, Use,
};
pub use ops::{DialectOp, OpCastError};
pub use refs::{BlockRef, OpRef, PathRef, RegionRef, TypeRef, ValueDef, ValueRef};
pub use types::{Attribute, Location, PathInterner, TypeData, TypeDataBuilder, TypeInterner};
pub use walk::{WalkAction, walk_block, walk_op, walk_region, walk_typed};
