//! Dialect definitions: typed operation wrappers and type constructors.

pub mod arith;
pub mod core;
pub mod func;
pub mod memref;
pub mod shape;
pub mod tensor;
