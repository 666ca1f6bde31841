//! Dialect conversion: legality targets, type conversion, patterns, and the
//! driver that applies them.

pub mod driver;
pub mod pattern;
pub mod rewriter;
pub mod target;
pub mod type_converter;

pub use driver::{
    ApplyOutcome, ConversionDriver, ConversionFailed, ConversionMode, DriverConfig,
};
pub use pattern::ConversionPattern;
pub use rewriter::PatternRewriter;
pub use target::{ConversionTarget, IllegalOp, Legality};
pub use type_converter::{MaterializeResult, TypeConverter};
