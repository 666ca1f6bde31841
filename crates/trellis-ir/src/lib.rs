//! Arena-based IR with a dialect-conversion framework.
//!
//! The IR model lives in [`arena`]: operations, values, blocks, and regions
//! are stored in `PrimaryMap` arenas owned by an
//! [`IrContext`](arena::context::IrContext), with use-chains maintained
//! automatically. The [`arena::rewrite`] module provides the conversion
//! machinery: a [`TypeConverter`](arena::rewrite::TypeConverter), a
//! [`ConversionTarget`](arena::rewrite::ConversionTarget) legality oracle,
//! [`ConversionPattern`](arena::rewrite::ConversionPattern)s, and the
//! [`ConversionDriver`](arena::rewrite::ConversionDriver) that applies them
//! to a fixpoint in partial or full mode.

pub mod arena;
pub mod ir;
pub mod location;

pub use ir::Symbol;
pub use location::Span;
