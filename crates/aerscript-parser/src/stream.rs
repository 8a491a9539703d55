//! Cursor over a pre-tokenized code span.
//!
//! [`TokenStream`] owns a shared token buffer plus a `[pos, end)` window.
//! Every compiler routine advances `pos`; routines that need to look at a
//! sub-span narrow `end` and put it back afterwards. Besides the cursor it
//! offers the balanced-delimiter and terminator scans the code generator
//! uses to carve statements into pieces.

use std::rc::Rc;

use crate::lexer::{Keyword, Token, TokenKind};

#[derive(Debug, Clone)]
pub struct TokenStream<'src> {
    tokens: Rc<[Token<'src>]>,
    pos: usize,
    end: usize,
}

impl<'src> TokenStream<'src> {
    pub fn new(tokens: Vec<Token<'src>>) -> Self {
        let end = tokens.len();
        Self {
            tokens: tokens.into(),
            pos: 0,
            end,
        }
    }

    /// The full token buffer, independent of the current window.
    #[inline]
    pub fn tokens(&self) -> &[Token<'src>] {
        &self.tokens
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    /// Narrow (or widen) the window's end, returning the previous end.
    #[inline]
    pub fn set_end(&mut self, end: usize) -> usize {
        std::mem::replace(&mut self.end, end.min(self.tokens.len()))
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.end
    }

    /// Tokens left in the window.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    /// The current token, if still inside the window.
    #[inline]
    pub fn peek(&self) -> Option<Token<'src>> {
        self.peek_nth(0)
    }

    /// The token `n` places ahead, if still inside the window.
    #[inline]
    pub fn peek_nth(&self, n: usize) -> Option<Token<'src>> {
        let idx = self.pos + n;
        if idx < self.end {
            self.tokens.get(idx).copied()
        } else {
            None
        }
    }

    /// Any token of the buffer by absolute index.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<Token<'src>> {
        self.tokens.get(idx).copied()
    }

    /// Whether the current token has any of `kind`'s bits.
    #[inline]
    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.is(kind))
    }

    /// Consume and return the current token.
    #[inline]
    pub fn bump(&mut self) -> Option<Token<'src>> {
        let tok = self.peek()?;
        self.pos += 1;
        Some(tok)
    }

    #[inline]
    pub fn advance(&mut self) {
        if self.pos < self.end {
            self.pos += 1;
        }
    }

    /// Consume the current token if it has any of `kind`'s bits.
    #[inline]
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume the current token if it is the keyword `kw`.
    pub fn eat_keyword(&mut self, kw: Keyword) -> bool {
        let found = self.peek().is_some_and(|t| t.is_keyword(kw));
        if found {
            self.pos += 1;
        }
        found
    }

    /// Move to the end of the window.
    #[inline]
    pub fn skip_to_end(&mut self) {
        self.pos = self.end.max(self.pos);
    }

    /// Advance until the current token has any of `kind`'s bits (not consumed)
    /// or the window is exhausted.
    pub fn skip_until(&mut self, kind: TokenKind) {
        while let Some(tok) = self.peek() {
            if tok.is(kind) {
                break;
            }
            self.pos += 1;
        }
    }

    /// Line of the current token, falling back to the last token of the buffer.
    pub fn line(&self) -> u32 {
        self.peek()
            .or_else(|| self.pos.checked_sub(1).and_then(|i| self.get(i)))
            .or_else(|| self.tokens.last().copied())
            .map_or(1, |t| t.line)
    }

    // =========================================
    // Scans
    // =========================================

    /// Find the token closing a nested group.
    ///
    /// `from` is the first token after the opener. Returns the index of the
    /// matching closer, or the window end when the group is unbalanced.
    pub fn delimit_nested(&self, from: usize, open: TokenKind, close: TokenKind) -> usize {
        let mut nest = 1i32;
        let mut idx = from;
        while idx < self.end {
            let tok = &self.tokens[idx];
            if tok.is(open) {
                nest += 1;
            } else if tok.is(close) {
                nest -= 1;
                if nest <= 0 {
                    return idx;
                }
            }
            idx += 1;
        }
        self.end
    }

    /// First index at or after `from` whose token has any of `kind`'s bits,
    /// or the window end.
    pub fn find(&self, from: usize, kind: TokenKind) -> usize {
        (from..self.end)
            .find(|&i| self.tokens[i].is(kind))
            .unwrap_or(self.end)
    }

    /// Delimit an expression starting at `from`.
    ///
    /// The expression ends at the first `;` outside curly braces (closure
    /// bodies may contain semicolons). In comma mode it ends earlier, at the
    /// first `,` outside any bracket pair.
    pub fn expr_end(&self, from: usize, comma_mode: bool) -> usize {
        let mut end = from;
        let mut nest = 0i32;
        while end < self.end {
            let tok = &self.tokens[end];
            if tok.is(TokenKind::OCB) {
                nest += 1;
            } else if tok.is(TokenKind::CCB) {
                nest -= 1;
            } else if tok.is(TokenKind::SEMI) && nest <= 0 {
                break;
            }
            end += 1;
        }
        if comma_mode {
            let mut nest = 0i32;
            for idx in from..end {
                let tok = &self.tokens[idx];
                if tok.is(TokenKind::OCB | TokenKind::OSB | TokenKind::LPAREN) {
                    nest += 1;
                } else if tok.is(TokenKind::CCB | TokenKind::CSB | TokenKind::RPAREN) {
                    nest -= 1;
                } else if tok.is(TokenKind::COMMA) && nest <= 0 {
                    return idx;
                }
            }
        }
        end
    }

    /// Split `[from, to)` at top-level commas.
    ///
    /// Returns the `(start, end)` of each piece; an empty range yields no
    /// pieces, and empty pieces between commas are kept.
    pub fn split_commas(&self, from: usize, to: usize) -> Vec<(usize, usize)> {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn stream(src: &str) -> TokenStream<'_> {
        TokenStream::new(tokenize(src, 1).0)
    }

    #[test]
    fn cursor_moves_within_window() {
        let mut s = stream("a b c");
        assert_eq!(s.bump().unwrap().text, "a");
        let old = s.set_end(2);
        assert_eq!(old, 3);
        assert_eq!(s.bump().unwrap().text, "b");
        assert!(s.is_eof());
        assert!(s.peek().is_none());
        s.set_end(old);
        assert_eq!(s.peek().unwrap().text, "c");
    }

    #[test]
    fn delimit_nested_parens() {
        let s = stream("( a ( b ) c ) d");
        let close = s.delimit_nested(1, TokenKind::LPAREN, TokenKind::RPAREN);
        assert_eq!(close, 6);
        assert_eq!(s.get(close).unwrap().kind, TokenKind::RPAREN);
    }

    #[test]
    fn delimit_nested_unbalanced_returns_end() {
        let s = stream("{ a { b }");
        assert_eq!(s.delimit_nested(1, TokenKind::OCB, TokenKind::CCB), s.end());
    }

    #[test]
    fn expr_end_skips_closure_bodies() {
        let s = stream("$f = function() { return 1; }; $x;");
        let end = s.expr_end(0, false);
        assert_eq!(s.get(end).unwrap().kind, TokenKind::SEMI);
        assert_eq!(s.get(end - 1).unwrap().kind, TokenKind::CCB);
    }

    #[test]
    fn expr_end_comma_mode() {
        let s = stream("f(1, 2), $b;");
        let end = s.expr_end(0, true);
        assert_eq!(end, 6);
        assert!(s.get(end).unwrap().is(TokenKind::COMMA));
    }

    #[test]
    fn split_commas_keeps_nested() {
        let s = stream("a, f(b, c), [d, e]");
        let pieces = s.split_commas(0, s.end());
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[1], (2, 8));
    }

    #[test]
    fn skip_until_stops_on_kind() {
        let mut s = stream("a b ; c");
        s.skip_until(TokenKind::SEMI);
        assert!(s.check(TokenKind::SEMI));
        assert_eq!(s.line(), 1);
    }
}
