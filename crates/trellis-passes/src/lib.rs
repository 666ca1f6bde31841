//! Transformation passes over trellis IR.
//!
//! Currently hosts the bufferization pass, which rewrites tensor-typed IR
//! into its memref (buffer) form through the dialect conversion driver.

pub mod bufferize;
pub mod patterns;

pub use bufferize::{BufferizeError, BufferizePass};
