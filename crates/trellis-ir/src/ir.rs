//! Name interning.
//!
//! Dialect names, operation names, and attribute keys are compared constantly
//! while matching and rewriting, so they are interned once into a
//! process-wide table and carried around as 4-byte [`Symbol`] keys. Equality
//! is an integer compare; the text is only resolved for display.

use std::borrow::Cow;
use std::sync::LazyLock;

use lasso::{Rodeo, Spur};
use parking_lot::RwLock;

static SYMBOLS: LazyLock<RwLock<Rodeo>> = LazyLock::new(|| RwLock::new(Rodeo::default()));

/// Key into the process-wide name table.
///
/// Symbols built from the same text anywhere in the process compare equal,
/// so `"tensor"` interned in two crates is one symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(Spur);

impl Symbol {
    /// Intern a string literal. The table borrows `'static` text instead of
    /// copying it, making this the cheap entry point for fixed names.
    pub fn new(text: &'static str) -> Self {
        let mut table = SYMBOLS.upgradable_read();
        match table.get(text) {
            Some(key) => Symbol(key),
            None => Symbol(table.with_upgraded(|t| t.get_or_intern_static(text))),
        }
    }

    /// Intern runtime-built text, copying it into the table on first use.
    pub fn from_dynamic(text: &str) -> Self {
        let mut table = SYMBOLS.upgradable_read();
        match table.get(text) {
            Some(key) => Symbol(key),
            None => Symbol(table.with_upgraded(|t| t.get_or_intern(text))),
        }
    }

    /// Run `f` over the symbol's text without copying it out of the table.
    ///
    /// The table is held under a re-entrant read lock for the duration of
    /// `f`, so the closure may itself compare or format other symbols.
    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(SYMBOLS.read_recursive().resolve(&self.0))
    }
}

impl From<&'static str> for Symbol {
    fn from(text: &'static str) -> Self {
        Symbol::new(text)
    }
}

impl From<Cow<'_, str>> for Symbol {
    fn from(text: Cow<'_, str>) -> Self {
        Symbol::from_dynamic(&text)
    }
}

/// Declares zero-argument functions returning pre-interned symbols, one per
/// entry. Used for attribute keys a dialect refers to repeatedly.
///
/// # Example
/// ```
/// use trellis_ir::symbols;
///
/// symbols! {
///     SHAPE => "shape",
///     CALLEE => "callee",
/// }
/// ```
#[macro_export]
macro_rules! symbols {
    ($($(#[$attr:meta])* $name:ident => $text:literal),* $(,)?) => {
        $(
            $(#[$attr])*
            #[allow(non_snake_case)]
            #[inline]
            pub fn $name() -> $crate::Symbol {
                $crate::Symbol::new($text)
            }
        )*
    };
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.with_str(|s| s == other)
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.with_str(|s| s == *other)
    }
}

impl PartialEq<Symbol> for str {
    fn eq(&self, other: &Symbol) -> bool {
        other.with_str(|s| s == self)
    }
}

impl PartialEq<Symbol> for &str {
    fn eq(&self, other: &Symbol) -> bool {
        other.with_str(|s| s == *self)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.with_str(|s| f.write_str(s))
    }
}
