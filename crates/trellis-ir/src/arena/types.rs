//! Locations, attributes, and structural types.
//!
//! Types are plain data: a dialect, a name, type parameters, and an
//! attribute map. Two types with equal data are the same type, enforced by
//! the deduplicating [`TypeInterner`], so type equality anywhere else in the
//! crate is a `TypeRef` compare. Shaped types keep their dimensions in a
//! `shape` attribute list rather than in dedicated fields.

use std::collections::{BTreeMap, HashMap};

use cranelift_entity::PrimaryMap;
use smallvec::SmallVec;

use super::refs::{PathRef, TypeRef};
use crate::ir::Symbol;
use crate::location::Span;

/// A span within an interned source path. Copyable and lifetime-free so it
/// can sit in every entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub path: PathRef,
    pub span: Span,
}

impl Location {
    pub const fn new(path: PathRef, span: Span) -> Self {
        Self { path, span }
    }
}

/// Attribute values carried by operations, types, and block arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// No payload. Doubles as the dynamic-extent marker in shape lists.
    Unit,
    Bool(bool),
    /// Signless integer stored as raw bits.
    IntBits(u64),
    /// Float stored as raw bits.
    FloatBits(u64),
    String(String),
    Type(TypeRef),
    Symbol(Symbol),
    List(Vec<Attribute>),
}

impl From<i64> for Attribute {
    fn from(value: i64) -> Self {
        Attribute::IntBits(u64::from_ne_bytes(value.to_ne_bytes()))
    }
}

impl From<u64> for Attribute {
    fn from(value: u64) -> Self {
        Attribute::IntBits(value)
    }
}

impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Attribute::Bool(value)
    }
}

impl From<Vec<Attribute>> for Attribute {
    fn from(value: Vec<Attribute>) -> Self {
        Attribute::List(value)
    }
}

impl From<Symbol> for Attribute {
    fn from(value: Symbol) -> Self {
        Attribute::Symbol(value)
    }
}

impl From<TypeRef> for Attribute {
    fn from(value: TypeRef) -> Self {
        Attribute::Type(value)
    }
}

impl From<String> for Attribute {
    fn from(value: String) -> Self {
        Attribute::String(value)
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::String(value.to_string())
    }
}

/// Structural description of a type. Equality over all four fields is type
/// equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeData {
    pub dialect: Symbol,
    pub name: Symbol,
    pub params: SmallVec<[TypeRef; 4]>,
    pub attrs: BTreeMap<Symbol, Attribute>,
}

/// Fluent construction of [`TypeData`]; params and attrs default to empty.
pub struct TypeDataBuilder {
    dialect: Symbol,
    name: Symbol,
    params: SmallVec<[TypeRef; 4]>,
    attrs: BTreeMap<Symbol, Attribute>,
}

impl TypeDataBuilder {
    pub fn new(dialect: Symbol, name: Symbol) -> Self {
        Self {
            dialect,
            name,
            params: SmallVec::new(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn param(mut self, ty: TypeRef) -> Self {
        self.params.push(ty);
        self
    }

    pub fn params(mut self, tys: impl IntoIterator<Item = TypeRef>) -> Self {
        self.params.extend(tys);
        self
    }

    pub fn attr(mut self, key: impl Into<Symbol>, val: Attribute) -> Self {
        self.attrs.insert(key.into(), val);
        self
    }

    pub fn build(self) -> TypeData {
        TypeData {
            dialect: self.dialect,
            name: self.name,
            params: self.params,
            attrs: self.attrs,
        }
    }
}

/// Assigns each distinct [`TypeData`] exactly one [`TypeRef`].
pub struct TypeInterner {
    types: PrimaryMap<TypeRef, TypeData>,
    dedup: HashMap<TypeData, TypeRef>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self {
            types: PrimaryMap::new(),
            dedup: HashMap::default(),
        }
    }

    pub fn intern(&mut self, data: TypeData) -> TypeRef {
        match self.dedup.get(&data) {
            Some(&existing) => existing,
            None => {
                let r = self.types.push(data.clone());
                self.dedup.insert(data, r);
                r
            }
        }
    }

    pub fn get(&self, r: TypeRef) -> &TypeData {
        &self.types[r]
    }

    /// Whether `r` is the `dialect.name` type (ignoring params and attrs).
    pub fn is_dialect(&self, r: TypeRef, dialect: Symbol, name: Symbol) -> bool {
        let data = &self.types[r];
        data.dialect == dialect && data.name == name
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Assigns each distinct source path exactly one [`PathRef`].
pub struct PathInterner {
    paths: PrimaryMap<PathRef, String>,
    dedup: HashMap<String, PathRef>,
}

impl PathInterner {
    pub fn new() -> Self {
        Self {
            paths: PrimaryMap::new(),
            dedup: HashMap::default(),
        }
    }

    pub fn intern(&mut self, path: String) -> PathRef {
        match self.dedup.get(&path) {
            Some(&existing) => existing,
            None => {
                let r = self.paths.push(path.clone());
                self.dedup.insert(path, r);
                r
            }
        }
    }

    pub fn get(&self, r: PathRef) -> &str {
        &self.paths[r]
    }
}

impl Default for PathInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Symbol;

    #[test]
    fn equal_data_interns_to_one_type() {
        let mut interner = TypeInterner::new();
        let f32_data = TypeDataBuilder::new(Symbol::new("core"), Symbol::new("f32")).build();
        let i64_data = TypeDataBuilder::new(Symbol::new("core"), Symbol::new("i64")).build();

        let a = interner.intern(f32_data.clone());
        let b = interner.intern(f32_data);
        let c = interner.intern(i64_data);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(interner.is_dialect(a, Symbol::new("core"), Symbol::new("f32")));
    }

    #[test]
    fn attrs_take_part_in_identity() {
        let mut interner = TypeInterner::new();
        let f32_ref =
            interner.intern(TypeDataBuilder::new(Symbol::new("core"), Symbol::new("f32")).build());

        let shaped = |dims: Vec<Attribute>| {
            TypeDataBuilder::new(Symbol::new("tensor"), Symbol::new("ranked"))
                .param(f32_ref)
                .attr("shape", Attribute::List(dims))
                .build()
        };
        let of_2 = interner.intern(shaped(vec![Attribute::IntBits(2)]));
        let of_3 = interner.intern(shaped(vec![Attribute::IntBits(3)]));
        let of_2_again = interner.intern(shaped(vec![Attribute::IntBits(2)]));

        assert_ne!(of_2, of_3, "shape is part of the type");
        assert_eq!(of_2, of_2_again);
        assert_eq!(interner.get(of_2).params[0], f32_ref);
    }

    #[test]
    fn paths_intern_by_content() {
        let mut interner = PathInterner::new();
        let a = interner.intern("lib/kernel.mlir".to_owned());
        let b = interner.intern("lib/main.mlir".to_owned());
        let a_again = interner.intern("lib/kernel.mlir".to_owned());

        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_eq!(interner.get(a), "lib/kernel.mlir");
        assert_eq!(interner.get(b), "lib/main.mlir");
    }
}
