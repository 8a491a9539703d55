//! Tree-shape checks for operands that must be assignable.

use aerscript_parser::{ExprNode, ExprOp, LeafKind};

use crate::codegen::{CodeGen, Result};

/// Shape restriction applied to an expression tree before emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TreeCheck {
    /// `foreach (... as $k => $v)` bindings.
    ForeachTarget,
    /// The operand of `throw`.
    Throwable,
    /// An entry of `list(...)`.
    ListTarget,
    /// The operand of `&` inside `array(...)`.
    ArrayRef,
}

fn is_variable(node: &ExprNode<'_>) -> bool {
    node.is_leaf_kind(LeafKind::Variable)
}

fn is_member_access(node: &ExprNode<'_>) -> bool {
    matches!(
        node.op,
        Some(ExprOp::Subscript | ExprOp::Arrow | ExprOp::DoubleColon)
    )
}

impl CodeGen<'_, '_> {
    /// Report an error when `root` does not have the shape `check` asks for.
    /// Returns whether the tree passed.
    pub(crate) fn check_tree(&mut self, check: TreeCheck, root: &ExprNode<'_>) -> Result<bool> {
        let message = match check {
            TreeCheck::ForeachTarget => {
                (!is_variable(root)).then_some("foreach: Expecting a variable name")
            }
            TreeCheck::Throwable => (!(is_variable(root)
                || is_member_access(root)
                || root.is_op(ExprOp::New)))
            .then_some("throw: Expecting an exception class instance"),
            TreeCheck::ListTarget => (!(is_variable(root) || is_member_access(root)))
                .then_some("list(): Expecting a variable not an expression"),
            TreeCheck::ArrayRef => match (root.op, root.leaf) {
                (Some(op), _) if !(is_member_access(root) || op == ExprOp::Call) => Some(
                    "array(): Expecting a variable/array member/function call after reference operator '&'",
                ),
                (None, Some(leaf)) if leaf != LeafKind::Variable => {
                    Some("array(): Expecting a variable after reference operator '&'")
                }
                _ => None,
            },
        };
        match message {
            Some(message) => {
                self.error(root.line, message)?;
                Ok(false)
            }
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprFlags;
    use crate::expr::test_support::run;

    fn check(src: &str, check: TreeCheck) -> usize {
        run(src, |cg| {
            cg.compile_expr(ExprFlags::empty(), Some(check)).unwrap();
        })
        .diagnostics
        .len()
    }

    #[test]
    fn foreach_requires_variable() {
        assert_eq!(check("$v", TreeCheck::ForeachTarget), 0);
        assert_eq!(check("$v[0]", TreeCheck::ForeachTarget), 1);
    }

    #[test]
    fn throw_accepts_instances() {
        assert_eq!(check("new Exception('x')", TreeCheck::Throwable), 0);
        assert_eq!(check("$e", TreeCheck::Throwable), 0);
        assert_eq!(check("$this->error", TreeCheck::Throwable), 0);
        assert_eq!(check("1 + 2", TreeCheck::Throwable), 1);
    }

    #[test]
    fn list_targets() {
        assert_eq!(check("$a[1]", TreeCheck::ListTarget), 0);
        assert_eq!(check("f()", TreeCheck::ListTarget), 1);
    }

    #[test]
    fn array_reference_operands() {
        assert_eq!(check("$a", TreeCheck::ArrayRef), 0);
        assert_eq!(check("f()", TreeCheck::ArrayRef), 0);
        assert_eq!(check("$a + 1", TreeCheck::ArrayRef), 1);
        assert_eq!(check("'text'", TreeCheck::ArrayRef), 1);
    }
}
