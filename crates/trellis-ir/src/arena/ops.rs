//! Typed wrappers over raw `OpRef`s.
//!
//! Dialect modules declare one wrapper struct per operation via [`def_op!`],
//! giving callers typed constructors and accessors instead of raw
//! `OperationData` plumbing.

use thiserror::Error;

use super::context::IrContext;
use super::refs::OpRef;
use crate::ir::Symbol;

/// Failed downcast from a raw `OpRef` to a typed dialect operation.
#[derive(Debug, Error)]
#[error("expected {expected}, found {found}")]
pub struct OpCastError {
    pub expected: &'static str,
    pub found: String,
}

/// A typed view of an operation belonging to a specific dialect.
pub trait DialectOp: Sized + Copy {
    /// Dialect name, e.g. `"tensor"`.
    const DIALECT: &'static str;
    /// Operation name within the dialect, e.g. `"store"`.
    const NAME: &'static str;

    /// Downcast a raw op to this operation type.
    fn from_op(ctx: &IrContext, op: OpRef) -> Result<Self, OpCastError>;

    /// Get the underlying `OpRef`.
    fn op_ref(&self) -> OpRef;

    /// Check whether a raw op has this dialect and name.
    fn matches(ctx: &IrContext, op: OpRef) -> bool {
        let data = ctx.op(op);
        data.dialect == Symbol::new(Self::DIALECT) && data.name == Symbol::new(Self::NAME)
    }
}

/// Declares a typed wrapper struct for a single dialect operation.
///
/// Constructors and accessors are written by hand next to the declaration;
/// the macro only provides the struct and the `DialectOp` plumbing.
macro_rules! def_op {
    ($(#[$meta:meta])* $name:ident => $dialect:literal . $op:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $name($crate::arena::refs::OpRef);

        impl $crate::arena::ops::DialectOp for $name {
            const DIALECT: &'static str = $dialect;
            const NAME: &'static str = $op;

            fn from_op(
                ctx: &$crate::arena::context::IrContext,
                op: $crate::arena::refs::OpRef,
            ) -> Result<Self, $crate::arena::ops::OpCastError> {
                if <Self as $crate::arena::ops::DialectOp>::matches(ctx, op) {
                    Ok(Self(op))
                } else {
                    let data = ctx.op(op);
                    Err($crate::arena::ops::OpCastError {
                        expected: concat!($dialect, ".", $op),
                        found: format!("{}.{}", data.dialect, data.name),
                    })
                }
            }

            fn op_ref(&self) -> $crate::arena::refs::OpRef {
                self.0
            }
        }
    };
}

pub(crate) use def_op;
