//! Expression tree building using Pratt parsing (precedence climbing).
//!
//! The builder works on a `[start, end)` window of an already tokenized
//! buffer. It recognises the extent of every leaf (literal, variable,
//! array, closure, ...) but does not interpret leaves; that is left to the
//! code generator, which compiles each leaf from its token range.

use std::ops::Range;

use aerscript_core::ParseError;
use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;

use super::{ExprNode, ExprOp, LeafKind, NodeFlags};
use crate::lexer::{Keyword, Token, TokenKind};

/// Build the expression tree for `range` of `tokens`.
///
/// An empty range yields `Ok(None)`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn build_tree<'a>(
    tokens: &[Token<'_>],
    range: Range<usize>,
    arena: &'a Bump,
) -> Result<Option<&'a ExprNode<'a>>, ParseError> {
    ExprBuilder::new(tokens, range, arena).build()
}

pub struct ExprBuilder<'t, 'src, 'a> {
    tokens: &'t [Token<'src>],
    pos: usize,
    end: usize,
    arena: &'a Bump,
}

impl<'t, 'src, 'a> ExprBuilder<'t, 'src, 'a> {
    pub fn new(tokens: &'t [Token<'src>], range: Range<usize>, arena: &'a Bump) -> Self {
        let end = range.end.min(tokens.len());
        Self {
            tokens,
            pos: range.start.min(end),
            end,
            arena,
        }
    }

    pub fn build(mut self) -> Result<Option<&'a ExprNode<'a>>, ParseError> {
        if self.pos >= self.end {
            return Ok(None);
        }
        let root = self.parse_expr(0)?;
        if let Some(tok) = self.peek() {
            return Err(self.unexpected(tok));
        }
        Ok(Some(root))
    }

    // =========================================
    // Cursor helpers
    // =========================================

    fn peek(&self) -> Option<Token<'src>> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Option<Token<'src>> {
        let idx = self.pos + n;
        (idx < self.end).then(|| self.tokens[idx])
    }

    fn line(&self) -> u32 {
        self.peek()
            .or_else(|| self.pos.checked_sub(1).and_then(|i| self.tokens.get(i).copied()))
            .map_or(1, |t| t.line)
    }

    fn unexpected(&self, tok: Token<'src>) -> ParseError {
        ParseError::new(tok.line, format!("Syntax error: Unexpected token '{}'", tok.text))
    }

    fn alloc(&self, node: ExprNode<'a>) -> &'a ExprNode<'a> {
        self.arena.alloc(node)
    }

    /// Index of the token closing the group opened just before `from`, if any.
    fn matching(&self, from: usize, open: TokenKind, close: TokenKind) -> Option<usize> {
        let mut nest = 1i32;
        for idx in from..self.end {
            let tok = &self.tokens[idx];
            if tok.is(open) {
                nest += 1;
            } else if tok.is(close) {
                nest -= 1;
                if nest <= 0 {
                    return Some(idx);
                }
            }
        }
        None
    }

    /// Split `[from, to)` at top-level commas.
    fn split_commas(&self, from: usize, to: usize) -> Vec<(usize, usize)> {
        let mut pieces = Vec::new();
        if from >= to {
            return pieces;
        }
        let mut nest = 0i32;
        let mut start = from;
        for idx in from..to {
            let tok = &self.tokens[idx];
            if tok.is(TokenKind::OCB | TokenKind::OSB | TokenKind::LPAREN) {
                nest += 1;
            } else if tok.is(TokenKind::CCB | TokenKind::CSB | TokenKind::RPAREN) {
                nest -= 1;
            } else if tok.is(TokenKind::COMMA) && nest <= 0 {
                pieces.push((start, idx));
                start = idx + 1;
            }
        }
        pieces.push((start, to));
        pieces
    }

    /// Parse `[from, to)` as one complete sub-expression.
    fn parse_window(&mut self, from: usize, to: usize) -> Result<Option<&'a ExprNode<'a>>, ParseError> {
        if from >= to {
            return Ok(None);
        }
        let saved = (self.pos, self.end);
        self.pos = from;
        self.end = to;
        let result = self.parse_expr(0).and_then(|node| match self.peek() {
            Some(tok) => Err(self.unexpected(tok)),
            None => Ok(node),
        });
        (self.pos, self.end) = saved;
        result.map(Some)
    }

    // =========================================
    // Pratt loop
    // =========================================

    fn parse_expr(&mut self, min_bp: u8) -> Result<&'a ExprNode<'a>, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some(tok) = self.peek() else { break };
            let op = if tok.is(TokenKind::LPAREN) {
                ExprOp::Call
            } else if let Some(op) = tok.op() {
                op
            } else {
                break;
            };
            let Some((l_bp, r_bp)) = op.infix_binding_power() else {
                break;
            };
            if l_bp < min_bp {
                break;
            }

            lhs = match op {
                ExprOp::Call => self.parse_call(lhs)?,
                ExprOp::Subscript => self.parse_subscript(lhs)?,
                ExprOp::Incr | ExprOp::Decr => {
                    self.pos += 1;
                    let mut node = ExprNode::operator(op, lhs.start, self.pos, tok.line);
                    node.left = Some(lhs);
                    self.alloc(node)
                }
                ExprOp::Ternary => self.parse_ternary(lhs, r_bp)?,
                ExprOp::Arrow | ExprOp::DoubleColon => {
                    self.pos += 1;
                    let member = self.parse_member(r_bp)?;
                    let mut node = ExprNode::operator(op, lhs.start, self.pos, tok.line);
                    node.left = Some(lhs);
                    node.right = Some(member);
                    self.alloc(node)
                }
                op if op.is_assignment() => {
                    self.pos += 1;
                    let value = self.parse_operand_of(tok, r_bp)?;
                    let mut node = ExprNode::operator(op, lhs.start, self.pos, tok.line);
                    // Value on the left, target on the right.
                    node.left = Some(value);
                    node.right = Some(lhs);
                    self.alloc(node)
                }
                _ => {
                    self.pos += 1;
                    let rhs = self.parse_operand_of(tok, r_bp)?;
                    let mut node = ExprNode::operator(op, lhs.start, self.pos, tok.line);
                    node.left = Some(lhs);
                    node.right = Some(rhs);
                    self.alloc(node)
                }
            };
        }

        Ok(lhs)
    }

    /// Parse the operand following operator token `op_tok`.
    fn parse_operand_of(&mut self, op_tok: Token<'src>, bp: u8) -> Result<&'a ExprNode<'a>, ParseError> {
        if self.peek().is_none() {
            return Err(ParseError::new(
                op_tok.line,
                format!("Syntax error: Missing operand after '{}'", op_tok.text),
            ));
        }
        self.parse_expr(bp)
    }

    fn parse_call(&mut self, callee: &'a ExprNode<'a>) -> Result<&'a ExprNode<'a>, ParseError> {
        let open = self.pos;
        let line = self.tokens[open].line;
        let close = self
            .matching(open + 1, TokenKind::LPAREN, TokenKind::RPAREN)
            .ok_or_else(|| ParseError::new(line, "Syntax error: Missing closing parenthesis ')'"))?;

        let mut args = BumpVec::new_in(self.arena);
        for (start, end) in self.split_commas(open + 1, close) {
            match self.parse_window(start, end)? {
                Some(arg) => args.push(arg),
                None => {
                    return Err(ParseError::new(line, "Syntax error: Missing function argument"));
                }
            }
        }
        self.pos = close + 1;

        let mut node = ExprNode::operator(ExprOp::Call, callee.start, self.pos, line);
        node.left = Some(callee);
        node.args = args.into_bump_slice();
        Ok(self.alloc(node))
    }

    fn parse_subscript(&mut self, base: &'a ExprNode<'a>) -> Result<&'a ExprNode<'a>, ParseError> {
        let open = self.pos;
        let line = self.tokens[open].line;
        let close = self
            .matching(open + 1, TokenKind::OSB, TokenKind::CSB)
            .ok_or_else(|| ParseError::new(line, "Syntax error: Missing closing square bracket ']'"))?;

        let index = self.parse_window(open + 1, close)?;
        self.pos = close + 1;

        let mut node = ExprNode::operator(ExprOp::Subscript, base.start, self.pos, line);
        node.left = Some(base);
        if let Some(index) = index {
            node.args = self.arena.alloc_slice_copy(&[index]);
        }
        Ok(self.alloc(node))
    }

    fn parse_ternary(&mut self, cond: &'a ExprNode<'a>, r_bp: u8) -> Result<&'a ExprNode<'a>, ParseError> {
        let q = self.tokens[self.pos];
        self.pos += 1;
        let then = self.parse_operand_of(q, 0)?;
        match self.peek() {
            Some(tok) if tok.is(TokenKind::COLON) => self.pos += 1,
            _ => {
                return Err(ParseError::new(
                    q.line,
                    "Syntax error: Missing ':' in ternary expression",
                ));
            }
        }
        let colon = self.tokens[self.pos - 1];
        let otherwise = self.parse_operand_of(colon, r_bp)?;

        let mut node = ExprNode::operator(ExprOp::Ternary, cond.start, self.pos, q.line);
        node.cond = Some(cond);
        node.left = Some(then);
        node.right = Some(otherwise);
        Ok(self.alloc(node))
    }

    /// The right-hand side of `->` or `::`: a bare name (keywords allowed),
    /// a variable, or any tighter-binding expression.
    fn parse_member(&mut self, bp: u8) -> Result<&'a ExprNode<'a>, ParseError> {
        let Some(tok) = self.peek() else {
            return Err(ParseError::new(self.line(), "Syntax error: Missing member name"));
        };
        if tok.is(TokenKind::ID | TokenKind::KEYWORD) {
            let start = self.pos;
            self.pos += 1;
            return Ok(self.alloc(ExprNode::leaf(LeafKind::Literal, start, self.pos, tok.line)));
        }
        self.parse_expr(bp)
    }

    // =========================================
    // Prefix position
    // =========================================

    fn parse_prefix(&mut self) -> Result<&'a ExprNode<'a>, ParseError> {
        let Some(tok) = self.peek() else {
            return Err(ParseError::new(self.line(), "Syntax error: Missing expression"));
        };
        let start = self.pos;

        if tok.is(TokenKind::NUM) {
            self.pos += 1;
            return Ok(self.alloc(ExprNode::leaf(LeafKind::Number, start, self.pos, tok.line)));
        }
        if tok.is(TokenKind::SSTR) {
            self.pos += 1;
            return Ok(self.alloc(ExprNode::leaf(LeafKind::SimpleString, start, self.pos, tok.line)));
        }
        if tok.is(TokenKind::DSTR) {
            self.pos += 1;
            return Ok(self.alloc(ExprNode::leaf(LeafKind::String, start, self.pos, tok.line)));
        }
        if tok.is(TokenKind::DOLLAR) {
            return self.parse_variable();
        }
        if tok.is(TokenKind::LPAREN) {
            return self.parse_group();
        }
        if tok.is(TokenKind::OSB) {
            return self.parse_bracketed(LeafKind::Array, start);
        }
        if let Some(kw) = tok.keyword() {
            return self.parse_keyword(kw, tok);
        }
        if let Some(op) = tok.op() {
            let op = op.as_prefix();
            if let Some(bp) = op.prefix_binding_power() {
                self.pos += 1;
                let operand = self.parse_operand_of(tok, bp)?;
                let mut node = ExprNode::operator(op, start, self.pos, tok.line);
                node.left = Some(operand);
                if matches!(op, ExprOp::Incr | ExprOp::Decr) {
                    node.flags |= NodeFlags::PRE_INCR;
                }
                return Ok(self.alloc(node));
            }
        }
        if tok.is(TokenKind::ID | TokenKind::NSSEP) {
            return Ok(self.parse_literal());
        }
        Err(self.unexpected(tok))
    }

    /// `$name`, `$$name`, `${expr}`.
    fn parse_variable(&mut self) -> Result<&'a ExprNode<'a>, ParseError> {
        let start = self.pos;
        let line = self.tokens[start].line;
        while self.peek().is_some_and(|t| t.is(TokenKind::DOLLAR)) {
            self.pos += 1;
        }
        match self.peek() {
            Some(tok) if tok.is(TokenKind::ID | TokenKind::KEYWORD) => self.pos += 1,
            Some(tok) if tok.is(TokenKind::OCB) => {
                let close = self
                    .matching(self.pos + 1, TokenKind::OCB, TokenKind::CCB)
                    .ok_or_else(|| ParseError::new(line, "Syntax error: Missing closing braces '}'"))?;
                self.pos = close + 1;
            }
            _ => return Err(ParseError::new(line, "Invalid variable name")),
        }
        Ok(self.alloc(ExprNode::leaf(LeafKind::Variable, start, self.pos, line)))
    }

    /// A parenthesized sub-expression.
    fn parse_group(&mut self) -> Result<&'a ExprNode<'a>, ParseError> {
        let open = self.pos;
        let line = self.tokens[open].line;
        let close = self
            .matching(open + 1, TokenKind::LPAREN, TokenKind::RPAREN)
            .ok_or_else(|| ParseError::new(line, "Syntax error: Missing closing parenthesis ')'"))?;
        let inner = self
            .parse_window(open + 1, close)?
            .ok_or_else(|| ParseError::new(line, "Syntax error: Empty expression '()'"))?;
        self.pos = close + 1;
        Ok(inner)
    }

    /// `[ ... ]` from `start` (the opening bracket) through its closer.
    fn parse_bracketed(&mut self, kind: LeafKind, start: usize) -> Result<&'a ExprNode<'a>, ParseError> {
        let line = self.tokens[start].line;
        let close = self
            .matching(start + 1, TokenKind::OSB, TokenKind::CSB)
            .ok_or_else(|| ParseError::new(line, "Syntax error: Missing closing square bracket ']'"))?;
        self.pos = close + 1;
        Ok(self.alloc(ExprNode::leaf(kind, start, self.pos, line)))
    }

    /// `name`, `\ns\name`, `ns\name`.
    fn parse_literal(&mut self) -> &'a ExprNode<'a> {
        let start = self.pos;
        let line = self.tokens[start].line;
        if self.peek().is_some_and(|t| t.is(TokenKind::NSSEP)) {
            self.pos += 1;
        }
        if self.peek().is_some_and(|t| t.is(TokenKind::ID)) {
            self.pos += 1;
        }
        while self.peek().is_some_and(|t| t.is(TokenKind::NSSEP))
            && self.peek_nth(1).is_some_and(|t| t.is(TokenKind::ID))
        {
            self.pos += 2;
        }
        self.alloc(ExprNode::leaf(LeafKind::Literal, start, self.pos, line))
    }

    fn parse_keyword(&mut self, kw: Keyword, tok: Token<'src>) -> Result<&'a ExprNode<'a>, ParseError> {
        let start = self.pos;
        match kw {
            Keyword::Array | Keyword::List => {
                let kind = if kw == Keyword::Array { LeafKind::Array } else { LeafKind::List };
                if !self.peek_nth(1).is_some_and(|t| t.is(TokenKind::LPAREN)) {
                    return Err(ParseError::new(
                        tok.line,
                        format!("Syntax error: Missing '(' after '{}'", tok.text),
                    ));
                }
                let close = self
                    .matching(start + 2, TokenKind::LPAREN, TokenKind::RPAREN)
                    .ok_or_else(|| {
                        ParseError::new(tok.line, format!("{}(): Missing closing parenthesis ')'", tok.text))
                    })?;
                self.pos = close + 1;
                Ok(self.alloc(ExprNode::leaf(kind, start, self.pos, tok.line)))
            }
            Keyword::Function => self.parse_closure(start),
            kw if kw.is_typedef() => {
                let mut after = start + 1;
                if self.tokens.get(after).is_some_and(|t| t.is(TokenKind::OSB))
                    && self.tokens.get(after + 1).is_some_and(|t| t.is(TokenKind::CSB))
                {
                    after += 2;
                }
                if after < self.end && self.tokens[after].is_keyword(Keyword::Function) {
                    self.parse_closure(start)
                } else {
                    Err(ParseError::new(
                        tok.line,
                        format!("Syntax error: Unexpected keyword '{}'", tok.text),
                    ))
                }
            }
            kw if kw.is_lang_construct() => {
                // The operand runs to the next top-level comma.
                let to = self
                    .split_commas(start + 1, self.end)
                    .first()
                    .map_or(self.end, |&(_, end)| end);
                self.pos = to.max(start + 1);
                Ok(self.alloc(ExprNode::leaf(LeafKind::LangConstruct(kw), start, self.pos, tok.line)))
            }
            Keyword::SelfKw | Keyword::Parent | Keyword::Static => {
                self.pos += 1;
                Ok(self.alloc(ExprNode::leaf(LeafKind::Literal, start, self.pos, tok.line)))
            }
            _ => Err(ParseError::new(
                tok.line,
                format!("Syntax error: Unexpected keyword '{}'", tok.text),
            )),
        }
    }

    /// `[type [[]]] function (args) [using (vars)] { body }`.
    fn parse_closure(&mut self, start: usize) -> Result<&'a ExprNode<'a>, ParseError> {
        let line = self.tokens[start].line;
        let mut idx = start;
        while idx < self.end && !self.tokens[idx].is_keyword(Keyword::Function) {
            idx += 1;
        }
        idx += 1;
        // Optional name, ignored.
        if idx < self.end && self.tokens[idx].is(TokenKind::ID) {
            idx += 1;
        }
        if !(idx < self.end && self.tokens[idx].is(TokenKind::LPAREN)) {
            return Err(ParseError::new(line, "Closure: Missing '(' after 'function' keyword"));
        }
        idx = self
            .matching(idx + 1, TokenKind::LPAREN, TokenKind::RPAREN)
            .ok_or_else(|| ParseError::new(line, "Closure: Missing ')' after signature"))?
            + 1;
        if idx < self.end && self.tokens[idx].is_keyword(Keyword::Using) {
            idx += 1;
            if idx < self.end && self.tokens[idx].is(TokenKind::LPAREN) {
                idx = self
                    .matching(idx + 1, TokenKind::LPAREN, TokenKind::RPAREN)
                    .ok_or_else(|| ParseError::new(line, "Closure: Missing ')' after 'using' list"))?
                    + 1;
            }
        }
        if !(idx < self.end && self.tokens[idx].is(TokenKind::OCB)) {
            return Err(ParseError::new(line, "Closure: Missing body '{'"));
        }
        let close = self
            .matching(idx + 1, TokenKind::OCB, TokenKind::CCB)
            .ok_or_else(|| ParseError::new(line, "Closure: Missing closing braces '}'"))?;
        self.pos = close + 1;
        Ok(self.alloc(ExprNode::leaf(LeafKind::Closure, start, self.pos, line)))
    }
}
