//! Function descriptors, argument lists and overload signatures.

use std::fmt;

use aerscript_parser::Keyword;
use bitflags::bitflags;
use xxhash_rust::xxh64::xxh64;

use crate::bytecode::InstrList;

/// Declared type of an argument, variable or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Callback,
    Char,
    Int,
    Mixed,
    Object,
    Float,
    Resource,
    String,
    Void,
}

impl DataType {
    /// Map a type keyword. `auto` is treated as `mixed`.
    pub fn from_keyword(kw: Keyword) -> Option<DataType> {
        Some(match kw {
            Keyword::Auto | Keyword::Mixed => DataType::Mixed,
            Keyword::Bool => DataType::Bool,
            Keyword::Callback => DataType::Callback,
            Keyword::Char => DataType::Char,
            Keyword::Int => DataType::Int,
            Keyword::Object => DataType::Object,
            Keyword::Float => DataType::Float,
            Keyword::Resource => DataType::Resource,
            Keyword::String => DataType::String,
            Keyword::Void => DataType::Void,
            _ => return None,
        })
    }

    /// Type code carried by `DECLARE` in `p2`.
    pub fn code(self) -> u32 {
        match self {
            DataType::Bool => 0x0001,
            DataType::Callback => 0x0002,
            DataType::Char => 0x0004,
            DataType::Int => 0x0008,
            DataType::Object => 0x0010,
            DataType::Float => 0x0020,
            DataType::Resource => 0x0040,
            DataType::String => 0x0080,
            DataType::Void => 0x0100,
            DataType::Mixed => 0x0200,
        }
    }

    /// Signature letter.
    pub fn letter(self) -> char {
        match self {
            DataType::Bool => 'b',
            DataType::Callback => 'a',
            DataType::Char => 'c',
            DataType::Int => 'i',
            DataType::Mixed => 'm',
            DataType::Object => 'o',
            DataType::Float => 'f',
            DataType::Resource => 'r',
            DataType::String => 's',
            DataType::Void => 'v',
        }
    }
}

/// Bit added to a type code for array-of-type (`int[]`).
pub const HASHMAP_CODE: u32 = 0x0400;

/// A declared type: a builtin or a class name, possibly as an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeSpec {
    pub kind: TypeKind,
    pub hashmap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Builtin(DataType),
    Class(String),
}

impl TypeSpec {
    pub fn builtin(ty: DataType) -> Self {
        Self {
            kind: TypeKind::Builtin(ty),
            hashmap: false,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Class(name.into()),
            hashmap: false,
        }
    }

    pub fn with_hashmap(mut self, hashmap: bool) -> Self {
        self.hashmap = hashmap;
        self
    }

    pub fn code(&self) -> u32 {
        let base = match &self.kind {
            TypeKind::Builtin(ty) => ty.code(),
            TypeKind::Class(_) => DataType::Object.code(),
        };
        if self.hashmap { base | HASHMAP_CODE } else { base }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Builtin(ty) => write!(f, "{}", format!("{ty:?}").to_lowercase())?,
            TypeKind::Class(name) => f.write_str(name)?,
        }
        if self.hashmap {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

// ============================================================================
// Signatures
// ============================================================================

/// Typed overload signature, one item per argument.
///
/// Only flattened to a string key at the registry boundary:
///
/// ```text
/// (int $a, string[] $b, Point $p)  ->  "iSPoint"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    items: Vec<TypeSpec>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: TypeSpec) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[TypeSpec] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The flattened key: one letter per builtin argument (upper-cased for
    /// arrays) and class names verbatim.
    pub fn key(&self) -> String {
        let mut key = String::new();
        for item in &self.items {
            match &item.kind {
                TypeKind::Class(name) => key.push_str(name),
                TypeKind::Builtin(ty) => {
                    let c = ty.letter();
                    key.push(if item.hashmap { c.to_ascii_uppercase() } else { c });
                }
            }
        }
        key
    }

    /// 64-bit hash of the flattened key, used to index overloads.
    pub fn hash(&self) -> u64 {
        xxh64(self.key().as_bytes(), 0)
    }
}

// ============================================================================
// Arguments
// ============================================================================

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ArgFlags: u8 {
        /// `&$arg`
        const BY_REF = 0x01;
    }
}

/// One declared argument.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncArg {
    pub name: String,
    pub ty: Option<TypeSpec>,
    pub flags: ArgFlags,
    /// Default value sub-program, ending in `DONE`.
    pub default: Option<InstrList>,
}

impl FuncArg {
    pub fn is_by_ref(&self) -> bool {
        self.flags.contains(ArgFlags::BY_REF)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CaptureFlags: u8 {
        const BY_REF = 0x01;
        /// Implicit `$this`; silently skipped when there is no instance.
        const IGNORE = 0x02;
    }
}

/// A variable captured by a closure's `using` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub name: String,
    pub flags: CaptureFlags,
}

/// A `static` variable of a function body.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticVar {
    pub name: String,
    pub ty: TypeSpec,
    pub init: InstrList,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FuncFlags: u8 {
        /// Has a bound environment (`using (...)`).
        const CLOSURE      = 0x01;
        const CLASS_METHOD = 0x02;
        const RETURN_REF   = 0x04;
        /// Anonymous function.
        const ANONYMOUS    = 0x08;
    }
}

/// A compiled function, method or closure.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDesc {
    pub name: String,
    pub args: Vec<FuncArg>,
    pub return_type: TypeSpec,
    pub code: InstrList,
    pub statics: Vec<StaticVar>,
    pub captures: Vec<Capture>,
    /// `None` when an argument is untyped; the function then cannot be
    /// overloaded.
    pub signature: Option<Signature>,
    pub flags: FuncFlags,
    pub line: u32,
}

impl FunctionDesc {
    pub fn new(name: impl Into<String>, return_type: TypeSpec, line: u32) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            return_type,
            code: InstrList::new(),
            statics: Vec::new(),
            captures: Vec::new(),
            signature: None,
            flags: FuncFlags::empty(),
            line,
        }
    }

    pub fn is_closure(&self) -> bool {
        self.flags.contains(FuncFlags::CLOSURE)
    }

    /// The flattened signature key, if the function is overloadable.
    pub fn signature_key(&self) -> Option<String> {
        self.signature.as_ref().map(Signature::key)
    }

    pub fn has_static(&self, name: &str) -> bool {
        self.statics.iter().any(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_types() {
        assert_eq!(DataType::from_keyword(Keyword::Auto), Some(DataType::Mixed));
        assert_eq!(DataType::from_keyword(Keyword::Float), Some(DataType::Float));
        assert_eq!(DataType::from_keyword(Keyword::While), None);
    }

    #[test]
    fn type_codes() {
        assert_eq!(TypeSpec::builtin(DataType::Int).code(), 0x0008);
        assert_eq!(
            TypeSpec::builtin(DataType::Int).with_hashmap(true).code(),
            0x0008 | HASHMAP_CODE
        );
        assert_eq!(TypeSpec::class("Point").code(), DataType::Object.code());
    }

    #[test]
    fn signature_key() {
        let mut sig = Signature::new();
        sig.push(TypeSpec::builtin(DataType::Int));
        sig.push(TypeSpec::builtin(DataType::String).with_hashmap(true));
        sig.push(TypeSpec::class("Point"));
        sig.push(TypeSpec::builtin(DataType::Callback));
        assert_eq!(sig.key(), "iSPointa");
        assert_eq!(sig.len(), 4);
    }

    #[test]
    fn signature_hash_follows_key() {
        let mut a = Signature::new();
        a.push(TypeSpec::builtin(DataType::Int));
        let mut b = Signature::new();
        b.push(TypeSpec::builtin(DataType::Int));
        let mut c = Signature::new();
        c.push(TypeSpec::builtin(DataType::Float));
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn type_display() {
        assert_eq!(TypeSpec::builtin(DataType::Int).to_string(), "int");
        assert_eq!(TypeSpec::class("Point").with_hashmap(true).to_string(), "Point[]");
    }
}
