//! Expression tree nodes.
//!
//! Nodes live in a [`bumpalo::Bump`] arena owned by the caller and refer to
//! their source by token index only. Leaves carry no payload: the code
//! generator re-reads the leaf's token range with the compiler that matches
//! its [`LeafKind`].

use bitflags::bitflags;

use super::ExprOp;
use crate::lexer::Keyword;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// `++$x` / `--$x` rather than the postfix form.
        const PRE_INCR = 0x01;
    }
}

/// How a leaf node is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    /// Integer or real literal.
    Number,
    /// Single-quoted string.
    SimpleString,
    /// Double-quoted string, possibly interpolated.
    String,
    /// `$name`, `$$name`, `${expr}`.
    Variable,
    /// Bare identifier, namespaced path, `self`, `parent` or `static`.
    Literal,
    /// `array(...)` or `[...]`.
    Array,
    /// `list(...)`.
    List,
    /// Anonymous function.
    Closure,
    /// `include`, `require`, `import`, `eval`.
    LangConstruct(Keyword),
}

/// One node of an expression tree.
///
/// Field usage by node shape:
///
/// ```text
/// leaf            leaf = Some(kind), token range = the leaf's tokens
/// unary / postfix op, left = operand
/// binary          op, left, right
/// assignment      op, left = value, right = target
/// call            op = Call, left = callee, args
/// subscript       op = Subscript, left = base, args = index (0 or 1)
/// ternary         op = Ternary, cond, left = then, right = else
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ExprNode<'a> {
    pub op: Option<ExprOp>,
    pub leaf: Option<LeafKind>,
    pub left: Option<&'a ExprNode<'a>>,
    pub right: Option<&'a ExprNode<'a>>,
    pub cond: Option<&'a ExprNode<'a>>,
    pub args: &'a [&'a ExprNode<'a>],
    /// First token (absolute index into the token buffer).
    pub start: usize,
    /// One past the last token.
    pub end: usize,
    pub line: u32,
    pub flags: NodeFlags,
}

impl<'a> ExprNode<'a> {
    pub fn leaf(kind: LeafKind, start: usize, end: usize, line: u32) -> Self {
        Self {
            op: None,
            leaf: Some(kind),
            left: None,
            right: None,
            cond: None,
            args: &[],
            start,
            end,
            line,
            flags: NodeFlags::empty(),
        }
    }

    pub fn operator(op: ExprOp, start: usize, end: usize, line: u32) -> Self {
        Self {
            op: Some(op),
            leaf: None,
            left: None,
            right: None,
            cond: None,
            args: &[],
            start,
            end,
            line,
            flags: NodeFlags::empty(),
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }

    #[inline]
    pub fn is_leaf_kind(&self, kind: LeafKind) -> bool {
        self.leaf == Some(kind)
    }

    #[inline]
    pub fn is_op(&self, op: ExprOp) -> bool {
        self.op == Some(op)
    }

    /// Number of tokens covered by this node.
    #[inline]
    pub fn token_len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_node_shape() {
        let node = ExprNode::leaf(LeafKind::Variable, 3, 5, 2);
        assert!(node.is_leaf());
        assert!(node.is_leaf_kind(LeafKind::Variable));
        assert_eq!(node.token_len(), 2);
        assert!(node.op.is_none());
    }

    #[test]
    fn operator_node_shape() {
        let node = ExprNode::operator(ExprOp::Add, 0, 3, 1);
        assert!(!node.is_leaf());
        assert!(node.is_op(ExprOp::Add));
        assert!(node.args.is_empty());
        assert_eq!(node.flags, NodeFlags::empty());
    }
}
