//! Class and interface descriptors.
//!
//! Inheritance is not resolved at compile time. The base class and the
//! implemented interfaces are kept in a separate [`ClassLink`] record that a
//! `CLASS_INIT`/`INTERFACE_INIT` instruction hands to the VM.

use std::fmt;

use bitflags::bitflags;

use crate::bytecode::InstrList;
use crate::func::{FunctionDesc, TypeSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClassFlags: u8 {
        const FINAL     = 0x01;
        const INTERFACE = 0x02;
        const VIRTUAL   = 0x04;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MemberFlags: u8 {
        const STATIC   = 0x01;
        const CONSTANT = 0x02;
        const VIRTUAL  = 0x04;
        const FINAL    = 0x08;
    }
}

/// An attribute or class constant.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassAttr {
    pub name: String,
    /// `None` for constants.
    pub ty: Option<TypeSpec>,
    pub visibility: Visibility,
    pub flags: MemberFlags,
    /// Initializer sub-program, ending in `DONE`.
    pub init: Option<InstrList>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMethod {
    pub func: FunctionDesc,
    pub visibility: Visibility,
    pub flags: MemberFlags,
}

impl ClassMethod {
    /// Virtual and interface methods have no body.
    pub fn has_body(&self) -> bool {
        !self.func.code.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDesc {
    pub name: String,
    pub flags: ClassFlags,
    pub attrs: Vec<ClassAttr>,
    pub methods: Vec<ClassMethod>,
    pub line: u32,
}

impl ClassDesc {
    pub fn new(name: impl Into<String>, flags: ClassFlags, line: u32) -> Self {
        Self {
            name: name.into(),
            flags,
            attrs: Vec::new(),
            methods: Vec::new(),
            line,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    pub fn attr(&self, name: &str) -> Option<&ClassAttr> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// First method with this name (methods may be overloaded).
    pub fn method(&self, name: &str) -> Option<&ClassMethod> {
        self.methods.iter().find(|m| m.func.name == name)
    }

    pub fn constants(&self) -> impl Iterator<Item = &ClassAttr> {
        self.attrs
            .iter()
            .filter(|a| a.flags.contains(MemberFlags::CONSTANT))
    }
}

/// Inheritance record resolved by the VM.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassLink {
    pub name: String,
    /// Base class, or base interfaces for an interface.
    pub extends: Vec<String>,
    pub implements: Vec<String>,
    pub line: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::func::DataType;

    #[test]
    fn lookups() {
        let mut class = ClassDesc::new("Point", ClassFlags::empty(), 1);
        class.attrs.push(ClassAttr {
            name: "x".into(),
            ty: Some(TypeSpec::builtin(DataType::Int)),
            visibility: Visibility::Public,
            flags: MemberFlags::empty(),
            init: None,
            line: 2,
        });
        class.attrs.push(ClassAttr {
            name: "ORIGIN".into(),
            ty: None,
            visibility: Visibility::Public,
            flags: MemberFlags::CONSTANT,
            init: Some(InstrList::new()),
            line: 3,
        });
        assert!(class.attr("x").is_some());
        assert!(class.attr("y").is_none());
        assert_eq!(class.constants().count(), 1);
        assert!(!class.is_interface());
    }

    #[test]
    fn visibility_display() {
        assert_eq!(Visibility::Protected.to_string(), "protected");
        assert_eq!(Visibility::default(), Visibility::Public);
    }
}
