//! Token types for the AerScript lexer.
//!
//! A token's kind is a bitset rather than a single tag: several spellings
//! belong to more than one class at once (`[` is both a bracket and the
//! subscript operator, `,` both a separator and the comma operator) and the
//! code generator routinely tests for "any of these kinds".

use std::fmt;

use bitflags::bitflags;

use crate::expr::ExprOp;

bitflags! {
    /// Token class bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TokenKind: u32 {
        /// Integer literal in any radix.
        const INTEGER  = 0x0000001;
        /// Real number literal.
        const REAL     = 0x0000002;
        /// Reserved word; the [`Keyword`] is in the payload.
        const KEYWORD  = 0x0000004;
        /// Identifier (also set on `new`, `clone` and `is`).
        const ID       = 0x0000008;
        /// `$`
        const DOLLAR   = 0x0000010;
        /// Operator; the [`ExprOp`] is in the payload.
        const OP       = 0x0000020;
        /// `{`
        const OCB      = 0x0000040;
        /// `}`
        const CCB      = 0x0000080;
        /// `\` namespace separator.
        const NSSEP    = 0x0000100;
        /// `(`
        const LPAREN   = 0x0000200;
        /// `)`
        const RPAREN   = 0x0000400;
        /// `[`
        const OSB      = 0x0000800;
        /// `]`
        const CSB      = 0x0001000;
        /// Double-quoted string, quotes stripped.
        const DSTR     = 0x0002000;
        /// Single-quoted string, quotes stripped.
        const SSTR     = 0x0004000;
        /// `,`
        const COMMA    = 0x0020000;
        /// `;`
        const SEMI     = 0x0040000;
        /// `:`
        const COLON    = 0x0100000;
        /// `&`
        const AMPER    = 0x0200000;
        /// `=`
        const EQUAL    = 0x0400000;
        /// `=>`
        const ARRAY_OP = 0x0800000;
        /// Anything else.
        const OTHER    = 0x1000000;
        /// Raw text of an embedded document, echoed verbatim.
        const RAW      = 0x2000000;

        const NUM = Self::INTEGER.bits() | Self::REAL.bits();
        const STRING = Self::DSTR.bits() | Self::SSTR.bits();
    }
}

/// Reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Data types
    Auto,
    Void,
    Char,
    Bool,
    Int,
    Float,
    String,
    Object,
    Callback,
    Resource,
    Mixed,

    // Control flow
    If,
    Else,
    ElseIf,
    While,
    Do,
    For,
    Foreach,
    As,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Exit,
    Try,
    Catch,
    Throw,

    // Declarations
    Class,
    Interface,
    Extends,
    Implements,
    Virtual,
    Final,
    Static,
    Const,
    Public,
    Private,
    Protected,
    Namespace,
    Using,
    Function,

    // Language constructs
    Import,
    Include,
    Require,
    Eval,
    SelfKw,
    Parent,
    Array,
    List,
}

impl Keyword {
    /// Look up a reserved word.
    pub fn lookup(word: &str) -> Option<Keyword> {
        use Keyword::*;
        Some(match word {
            "auto" => Auto,
            "void" => Void,
            "char" => Char,
            "bool" => Bool,
            "int" => Int,
            "float" => Float,
            "string" => String,
            "object" => Object,
            "callback" => Callback,
            "resource" => Resource,
            "mixed" => Mixed,
            "if" => If,
            "else" => Else,
            "elseif" | "elif" => ElseIf,
            "while" => While,
            "do" => Do,
            "for" => For,
            "foreach" => Foreach,
            "as" => As,
            "switch" => Switch,
            "case" => Case,
            "default" => Default,
            "break" => Break,
            "continue" => Continue,
            "return" => Return,
            "exit" => Exit,
            "try" => Try,
            "catch" => Catch,
            "throw" => Throw,
            "class" => Class,
            "interface" => Interface,
            "extends" => Extends,
            "implements" => Implements,
            "virtual" => Virtual,
            "final" => Final,
            "static" => Static,
            "const" => Const,
            "public" => Public,
            "private" => Private,
            "protected" => Protected,
            "namespace" => Namespace,
            "using" => Using,
            "function" => Function,
            "import" => Import,
            "include" => Include,
            "require" => Require,
            "eval" => Eval,
            "self" => SelfKw,
            "parent" => Parent,
            "array" => Array,
            "list" => List,
            _ => return None,
        })
    }

    /// Data-type keywords, usable in declarations and signatures.
    pub fn is_typedef(self) -> bool {
        use Keyword::*;
        matches!(
            self,
            Auto | Void | Char | Bool | Int | Float | String | Object | Callback | Resource | Mixed
        )
    }

    /// Keywords that compile as a call to a built-in (`include "x"`).
    pub fn is_lang_construct(self) -> bool {
        matches!(
            self,
            Keyword::Import | Keyword::Include | Keyword::Require | Keyword::Eval
        )
    }
}

/// Data attached to a token by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Payload {
    #[default]
    None,
    Keyword(Keyword),
    Op(ExprOp),
}

/// A token from the source code.
///
/// `text` borrows from the source; string tokens exclude their quotes and
/// cast tokens carry a canonical spelling such as `"(int)"`.
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    /// 1-based source line.
    pub line: u32,
    pub payload: Payload,
}

impl<'src> Token<'src> {
    #[inline]
    pub fn new(kind: TokenKind, text: &'src str, line: u32) -> Self {
        Self {
            kind,
            text,
            line,
            payload: Payload::None,
        }
    }

    #[inline]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Whether any of the given kind bits are set.
    #[inline]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind.intersects(kind)
    }

    #[inline]
    pub fn keyword(&self) -> Option<Keyword> {
        match self.payload {
            Payload::Keyword(kw) if self.kind.contains(TokenKind::KEYWORD) => Some(kw),
            _ => None,
        }
    }

    #[inline]
    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.keyword() == Some(kw)
    }

    /// Whether this token is a data-type keyword.
    #[inline]
    pub fn is_typedef(&self) -> bool {
        self.keyword().is_some_and(Keyword::is_typedef)
    }

    #[inline]
    pub fn op(&self) -> Option<ExprOp> {
        match self.payload {
            Payload::Op(op) => Some(op),
            _ => None,
        }
    }

    /// Whether this is an operator token spelled exactly `text`.
    #[inline]
    pub fn is_op_text(&self, text: &str) -> bool {
        self.kind.contains(TokenKind::OP) && self.text == text
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {})", self.kind, self.text, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!(Keyword::lookup("while"), Some(Keyword::While));
        assert_eq!(Keyword::lookup("elif"), Some(Keyword::ElseIf));
        assert_eq!(Keyword::lookup("self"), Some(Keyword::SelfKw));
        assert_eq!(Keyword::lookup("While"), None);
        assert_eq!(Keyword::lookup("new"), None);
    }

    #[test]
    fn typedef_keywords() {
        assert!(Keyword::Int.is_typedef());
        assert!(Keyword::Mixed.is_typedef());
        assert!(!Keyword::Static.is_typedef());
        assert!(Keyword::Include.is_lang_construct());
        assert!(!Keyword::Array.is_lang_construct());
    }

    #[test]
    fn kind_intersection() {
        let tok = Token::new(TokenKind::OSB | TokenKind::OP, "[", 1);
        assert!(tok.is(TokenKind::OSB));
        assert!(tok.is(TokenKind::OP | TokenKind::COMMA));
        assert!(!tok.is(TokenKind::CSB));
    }

    #[test]
    fn payload_accessors() {
        let kw = Token::new(TokenKind::KEYWORD, "if", 3).with_payload(Payload::Keyword(Keyword::If));
        assert!(kw.is_keyword(Keyword::If));
        assert_eq!(kw.op(), None);

        let op = Token::new(TokenKind::OP, "+", 3).with_payload(Payload::Op(ExprOp::Add));
        assert_eq!(op.op(), Some(ExprOp::Add));
        assert!(op.is_op_text("+"));
        assert_eq!(op.keyword(), None);
    }
}
