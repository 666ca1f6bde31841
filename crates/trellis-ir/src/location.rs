//! Byte spans into source text.

/// Half-open byte range `[start, end)` within a source file. Which file is
/// recorded separately, as an interned path on
/// [`Location`](crate::arena::Location).
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
    serde::Deserialize,
)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
