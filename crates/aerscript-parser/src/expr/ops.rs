//! Operator definitions for AerScript expressions.
//!
//! One flat [`ExprOp`] enum covers every operator the tree builder knows,
//! with precedence and associativity expressed as Pratt binding powers.

use std::fmt;

/// Target type of a `(type)` cast operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastType {
    Int,
    Float,
    Bool,
    String,
    Char,
    Object,
    Callback,
    Resource,
    Void,
}

impl CastType {
    pub fn as_str(self) -> &'static str {
        match self {
            CastType::Int => "(int)",
            CastType::Float => "(float)",
            CastType::Bool => "(bool)",
            CastType::String => "(string)",
            CastType::Char => "(char)",
            CastType::Object => "(object)",
            CastType::Callback => "(callback)",
            CastType::Resource => "(resource)",
            CastType::Void => "(void)",
        }
    }
}

/// Every operator an expression node can carry.
///
/// Organized from tightest to loosest binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprOp {
    // Object creation
    /// `new`
    New,
    /// `clone`
    Clone,

    // Member access
    /// `->`
    Arrow,
    /// `::`
    DoubleColon,

    // Postfix
    /// `[]`
    Subscript,
    /// `f()`
    Call,

    // Unary
    /// `++`
    Incr,
    /// `--`
    Decr,
    /// `~`
    BitNot,
    /// Unary `-`
    Neg,
    /// Unary `+`
    Plus,
    /// `(int)`, `(string)`, ...
    Cast(CastType),
    /// `is`
    Is,
    /// `!`
    LogNot,

    // Binary
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    /// Binary `&`
    BitAnd,
    /// Prefix `&`
    Ref,
    BitXor,
    BitOr,
    /// `&&`
    LogAnd,
    /// `||`
    LogOr,
    /// `^^`
    LogXor,
    /// `??`
    NullCoalesce,
    /// `?:`
    Ternary,

    // Assignment
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,

    /// `,`
    Comma,
}

impl ExprOp {
    /// Look up an operator by its source spelling.
    ///
    /// Ambiguous spellings (`-`, `+`, `&`) resolve to their binary form; the
    /// tree builder converts them when they appear in prefix position.
    pub fn from_symbol(text: &str) -> Option<ExprOp> {
        use ExprOp::*;
        Some(match text {
            "new" => New,
            "clone" => Clone,
            "is" => Is,
            "->" => Arrow,
            "::" => DoubleColon,
            "[" => Subscript,
            "++" => Incr,
            "--" => Decr,
            "~" => BitNot,
            "!" => LogNot,
            "*" => Mul,
            "/" => Div,
            "%" => Mod,
            "+" => Add,
            "-" => Sub,
            "<<" => Shl,
            ">>" => Shr,
            "<" => Lt,
            "<=" => Le,
            ">" => Gt,
            ">=" => Ge,
            "==" => Eq,
            "!=" | "<>" => Ne,
            "&" => BitAnd,
            "^" => BitXor,
            "|" => BitOr,
            "&&" => LogAnd,
            "||" => LogOr,
            "^^" => LogXor,
            "??" => NullCoalesce,
            "?" => Ternary,
            "=" => Assign,
            "+=" => AddAssign,
            "-=" => SubAssign,
            "*=" => MulAssign,
            "/=" => DivAssign,
            "%=" => ModAssign,
            "&=" => AndAssign,
            "|=" => OrAssign,
            "^=" => XorAssign,
            "<<=" => ShlAssign,
            ">>=" => ShrAssign,
            "," => Comma,
            _ => return None,
        })
    }

    /// Binding power for an operator in infix (or postfix) position.
    ///
    /// Returns `(left, right)`; right-associative operators have a right
    /// power lower than their left power.
    pub fn infix_binding_power(&self) -> Option<(u8, u8)> {
        use ExprOp::*;
        Some(match self {
            Comma => (1, 2),
            Assign | AddAssign | SubAssign | MulAssign | DivAssign | ModAssign | AndAssign
            | OrAssign | XorAssign | ShlAssign | ShrAssign => (4, 3),
            Ternary => (6, 5),
            NullCoalesce => (8, 7),
            LogOr => (9, 10),
            LogXor => (11, 12),
            LogAnd => (13, 14),
            BitOr => (15, 16),
            BitXor => (17, 18),
            BitAnd => (19, 20),
            Eq | Ne => (21, 22),
            Lt | Le | Gt | Ge => (23, 24),
            Shl | Shr => (25, 26),
            Add | Sub => (27, 28),
            Mul | Div | Mod => (29, 30),
            Is => (31, 32),
            // Postfix: only the left power matters.
            Incr | Decr | Subscript | Call => (35, 36),
            Arrow | DoubleColon => (37, 38),
            _ => return None,
        })
    }

    /// Binding power of the operand of a prefix operator.
    pub fn prefix_binding_power(&self) -> Option<u8> {
        use ExprOp::*;
        Some(match self {
            // Looser than call so `new Foo(1)` takes the whole call.
            New | Clone => 34,
            Incr | Decr | BitNot | Neg | Plus | Cast(_) | LogNot | Ref => 33,
            _ => return None,
        })
    }

    /// Whether this operator has assignment precedence.
    pub fn is_assignment(&self) -> bool {
        use ExprOp::*;
        matches!(
            self,
            Assign
                | AddAssign
                | SubAssign
                | MulAssign
                | DivAssign
                | ModAssign
                | AndAssign
                | OrAssign
                | XorAssign
                | ShlAssign
                | ShrAssign
        )
    }

    /// The prefix meaning of a spelling that was lexed as binary.
    pub fn as_prefix(self) -> ExprOp {
        match self {
            ExprOp::Sub => ExprOp::Neg,
            ExprOp::Add => ExprOp::Plus,
            ExprOp::BitAnd => ExprOp::Ref,
            other => other,
        }
    }
}

impl fmt::Display for ExprOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ExprOp::*;
        let s = match self {
            New => "new",
            Clone => "clone",
            Arrow => "->",
            DoubleColon => "::",
            Subscript => "[]",
            Call => "()",
            Incr => "++",
            Decr => "--",
            BitNot => "~",
            Neg | Sub => "-",
            Plus | Add => "+",
            Cast(ty) => ty.as_str(),
            Is => "is",
            LogNot => "!",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Shl => "<<",
            Shr => ">>",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
            BitAnd | Ref => "&",
            BitXor => "^",
            BitOr => "|",
            LogAnd => "&&",
            LogOr => "||",
            LogXor => "^^",
            NullCoalesce => "??",
            Ternary => "?",
            Assign => "=",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            DivAssign => "/=",
            ModAssign => "%=",
            AndAssign => "&=",
            OrAssign => "|=",
            XorAssign => "^=",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
            Comma => ",",
        };
        f.write_str(s)
    }
}
