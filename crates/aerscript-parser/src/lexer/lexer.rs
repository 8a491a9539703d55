//! Main lexer implementation for AerScript.
//!
//! The [`Lexer`] converts a code span into [`Token`]s borrowing from the
//! source. It dispatches on the first character of each token. Problems are
//! collected rather than returned so that a single bad character never stops
//! the rest of the span from being tokenized.

use aerscript_core::{LexError, Span};

use super::chunks::{ChunkKind, split_embedded};
use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Keyword, Payload, Token, TokenKind};
use crate::expr::{CastType, ExprOp};

/// Lexer for AerScript code.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    errors: Vec<LexError>,
}

impl<'src> Lexer<'src> {
    /// Create a lexer over `source` whose first line is line 1.
    pub fn new(source: &'src str) -> Self {
        Self::with_start_line(source, 1)
    }

    /// Create a lexer over a span that starts at `line` of the enclosing file.
    pub fn with_start_line(source: &'src str, line: u32) -> Self {
        Self {
            cursor: Cursor::new(source, line),
            errors: Vec::new(),
        }
    }

    /// Take accumulated errors, leaving an empty vec.
    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Consume and return the next token, or `None` at the end of input.
    pub fn next_token(&mut self) -> Option<Token<'src>> {
        loop {
            self.skip_whitespace();
            if self.cursor.is_eof() {
                return None;
            }
            if let Some(token) = self.scan_token() {
                return Some(token);
            }
        }
    }

    // =========================================
    // Internal: Token scanning
    // =========================================

    /// Scan one token; `None` means something was skipped (a comment).
    fn scan_token(&mut self) -> Option<Token<'src>> {
        let line = self.cursor.line();
        let start = self.cursor.offset();

        let c = self.cursor.peek()?;
        match c {
            '#' => {
                self.skip_line_comment();
                None
            }
            '/' if self.cursor.check_str("//") => {
                self.skip_line_comment();
                None
            }
            '/' if self.cursor.check_str("/*") => {
                self.skip_block_comment();
                None
            }
            '\'' => Some(self.scan_single_quoted(line)),
            '"' => Some(self.scan_double_quoted(line)),
            c if c.is_ascii_digit() => Some(self.scan_number(line, start)),
            c if is_ident_start(c) => Some(self.scan_identifier(line, start)),
            '(' => Some(self.scan_lparen(line, start)),
            _ => Some(self.scan_operator(line, start)),
        }
    }

    fn skip_whitespace(&mut self) {
        if self.cursor.check_str("\u{FEFF}") {
            self.cursor.advance_bytes(3);
        }
        self.cursor.eat_while(|c| c.is_ascii_whitespace());
    }

    fn skip_line_comment(&mut self) {
        self.cursor.eat_while(|c| c != '\n');
    }

    fn skip_block_comment(&mut self) {
        let span = self.span_here(2);
        self.cursor.advance_bytes(2);
        loop {
            if self.cursor.is_eof() {
                self.errors.push(LexError::UnterminatedComment { span });
                return;
            }
            if self.cursor.check_str("*/") {
                self.cursor.advance_bytes(2);
                return;
            }
            self.cursor.advance();
        }
    }

    fn span_here(&self, len: u32) -> Span {
        Span::new(self.cursor.line(), self.cursor.column(), len)
    }

    fn make_token(&self, kind: TokenKind, line: u32, start: u32) -> Token<'src> {
        Token::new(kind, self.cursor.slice_from(start), line)
    }

    // =========================================
    // Scanning: Strings
    // =========================================

    /// Scan a single-quoted string. Backslash escapes are kept verbatim.
    fn scan_single_quoted(&mut self, line: u32) -> Token<'src> {
        let span = self.span_here(1);
        self.cursor.advance();
        let start = self.cursor.offset();
        let mut terminated = false;
        while let Some(c) = self.cursor.peek() {
            match c {
                '\\' => {
                    self.cursor.advance();
                    self.cursor.advance();
                }
                '\'' => {
                    terminated = true;
                    break;
                }
                _ => {
                    self.cursor.advance();
                }
            }
        }
        let text = self.cursor.slice_from(start);
        if terminated {
            self.cursor.advance();
        } else {
            self.errors.push(LexError::UnterminatedString { span });
        }
        Token::new(TokenKind::SSTR, text, line)
    }

    /// Scan a double-quoted string, keeping `{$ ... }` groups intact even when
    /// they contain quotes.
    fn scan_double_quoted(&mut self, line: u32) -> Token<'src> {
        let span = self.span_here(1);
        self.cursor.advance();
        let start = self.cursor.offset();
        let mut terminated = false;
        while let Some(c) = self.cursor.peek() {
            match c {
                '\\' => {
                    self.cursor.advance();
                    self.cursor.advance();
                }
                '{' if self.cursor.check_str("{$") => {
                    let mut nest = 0u32;
                    while let Some(c) = self.cursor.advance() {
                        match c {
                            '{' => nest += 1,
                            '}' => {
                                nest -= 1;
                                if nest == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                }
                '"' => {
                    terminated = true;
                    break;
                }
                _ => {
                    self.cursor.advance();
                }
            }
        }
        let text = self.cursor.slice_from(start);
        if terminated {
            self.cursor.advance();
        } else {
            self.errors.push(LexError::UnterminatedString { span });
        }
        Token::new(TokenKind::DSTR, text, line)
    }

    // =========================================
    // Scanning: Numbers
    // =========================================

    /// Scan a numeric literal: decimal, `0x` hex, `0b` binary, leading-zero
    /// octal (validated by the constant pool), or a real.
    fn scan_number(&mut self, line: u32, start: u32) -> Token<'src> {
        let span = self.span_here(1);
        let first = self.cursor.advance();

        if first == Some('0') && matches!(self.cursor.peek(), Some('x' | 'X')) {
            self.cursor.advance();
            let digits = self.cursor.eat_while(|c| c.is_ascii_hexdigit());
            if digits.is_empty() {
                self.errors.push(LexError::InvalidNumber {
                    span,
                    detail: "missing hexadecimal digits".to_string(),
                });
            }
            return self.make_token(TokenKind::INTEGER, line, start);
        }
        if first == Some('0') && matches!(self.cursor.peek(), Some('b' | 'B')) {
            self.cursor.advance();
            let digits = self.cursor.eat_while(|c| c == '0' || c == '1');
            if digits.is_empty() {
                self.errors.push(LexError::InvalidNumber {
                    span,
                    detail: "missing binary digits".to_string(),
                });
            }
            return self.make_token(TokenKind::INTEGER, line, start);
        }

        self.cursor.eat_while(|c| c.is_ascii_digit());
        let mut kind = TokenKind::INTEGER;

        if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
            kind = TokenKind::REAL;
        }
        if matches!(self.cursor.peek(), Some('e' | 'E')) {
            let sign = self.cursor.peek_nth(1);
            let after_sign = self.cursor.peek_nth(2);
            let has_exponent = match sign {
                Some('+' | '-') => after_sign.is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if has_exponent {
                self.cursor.advance();
                if matches!(self.cursor.peek(), Some('+' | '-')) {
                    self.cursor.advance();
                }
                self.cursor.eat_while(|c| c.is_ascii_digit());
                kind = TokenKind::REAL;
            }
        }
        self.make_token(kind, line, start)
    }

    // =========================================
    // Scanning: Identifiers and keywords
    // =========================================

    fn scan_identifier(&mut self, line: u32, start: u32) -> Token<'src> {
        self.cursor.eat_while(is_ident_continue);
        let text = self.cursor.slice_from(start);

        if let Some(op @ (ExprOp::New | ExprOp::Clone | ExprOp::Is)) = ExprOp::from_symbol(text) {
            return Token::new(TokenKind::ID | TokenKind::OP, text, line).with_payload(Payload::Op(op));
        }
        match Keyword::lookup(text) {
            Some(kw) => Token::new(TokenKind::KEYWORD, text, line).with_payload(Payload::Keyword(kw)),
            None => Token::new(TokenKind::ID, text, line),
        }
    }

    // =========================================
    // Scanning: Operators and punctuation
    // =========================================

    /// `(` is either a plain parenthesis or the start of a `(type)` cast.
    fn scan_lparen(&mut self, line: u32, start: u32) -> Token<'src> {
        if let Some((cast, len)) = self.peek_cast() {
            self.cursor.advance_bytes(len);
            return Token::new(TokenKind::OP, cast.as_str(), line).with_payload(Payload::Op(ExprOp::Cast(cast)));
        }
        self.cursor.advance();
        self.make_token(TokenKind::LPAREN, line, start)
    }

    /// Look ahead for `( type )`, returning the cast and its byte length.
    fn peek_cast(&self) -> Option<(CastType, usize)> {
        let rest = &self.cursor.source()[self.cursor.offset() as usize..];
        let inner = rest.strip_prefix('(')?;
        let close = inner.find(')')?;
        let word = inner[..close].trim_matches(|c: char| c == ' ' || c == '\t');
        let cast = match word {
            "int" => CastType::Int,
            "float" => CastType::Float,
            "bool" => CastType::Bool,
            "string" => CastType::String,
            "char" => CastType::Char,
            "object" => CastType::Object,
            "callback" => CastType::Callback,
            "resource" => CastType::Resource,
            "void" => CastType::Void,
            _ => return None,
        };
        Some((cast, close + 2))
    }

    fn scan_operator(&mut self, line: u32, start: u32) -> Token<'src> {
        let Some(c) = self.cursor.advance() else {
            return self.make_token(TokenKind::OTHER, line, start);
        };

        let kind = match c {
            '$' => TokenKind::DOLLAR,
            '{' => TokenKind::OCB,
            '}' => TokenKind::CCB,
            ')' => TokenKind::RPAREN,
            '[' => TokenKind::OSB | TokenKind::OP,
            ']' => TokenKind::CSB,
            '\\' => TokenKind::NSSEP,
            ';' => TokenKind::SEMI,
            ',' => TokenKind::COMMA | TokenKind::OP,
            ':' => {
                if self.cursor.eat(':') {
                    TokenKind::OP
                } else {
                    TokenKind::COLON
                }
            }
            '=' => {
                if self.cursor.eat('=') {
                    TokenKind::OP
                } else if self.cursor.eat('>') {
                    TokenKind::ARRAY_OP
                } else {
                    TokenKind::EQUAL | TokenKind::OP
                }
            }
            '&' => {
                if self.cursor.eat('&') || self.cursor.eat('=') {
                    TokenKind::OP
                } else {
                    TokenKind::AMPER | TokenKind::OP
                }
            }
            '!' => {
                self.cursor.eat('=');
                TokenKind::OP
            }
            '|' | '+' => {
                if !self.cursor.eat(c) {
                    self.cursor.eat('=');
                }
                TokenKind::OP
            }
            '-' => {
                if !self.cursor.eat('-') && !self.cursor.eat('>') {
                    self.cursor.eat('=');
                }
                TokenKind::OP
            }
            '*' | '/' | '%' => {
                self.cursor.eat('=');
                TokenKind::OP
            }
            '^' => {
                if !self.cursor.eat('^') {
                    self.cursor.eat('=');
                }
                TokenKind::OP
            }
            '<' | '>' => {
                if self.cursor.eat(c) {
                    self.cursor.eat('=');
                } else if !self.cursor.eat('=') && c == '<' {
                    self.cursor.eat('>');
                }
                TokenKind::OP
            }
            '?' => {
                self.cursor.eat('?');
                TokenKind::OP
            }
            '~' => TokenKind::OP,
            c if c.is_control() => {
                self.errors.push(LexError::UnexpectedChar {
                    ch: c,
                    span: Span::new(line, self.cursor.column().saturating_sub(1), 1),
                });
                TokenKind::OTHER
            }
            _ => TokenKind::OTHER,
        };

        let token = self.make_token(kind, line, start);
        if kind.contains(TokenKind::OP) {
            match ExprOp::from_symbol(token.text) {
                Some(op) => token.with_payload(Payload::Op(op)),
                None => token,
            }
        } else {
            token
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokenize a whole code span.
///
/// Returns the tokens together with any problems found along the way.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn tokenize(source: &str, start_line: u32) -> (Vec<Token<'_>>, Vec<LexError>) {
    let mut lexer = Lexer::with_start_line(source, start_line);
    let tokens: Vec<_> = lexer.by_ref().collect();
    (tokens, lexer.take_errors())
}

/// Tokenize an embedded document.
///
/// Each raw chunk becomes a single `RAW` token. Every chunk is followed by a
/// synthetic `;` so a statement left open at `?>` cannot swallow the text
/// after it.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn tokenize_embedded(source: &str) -> (Vec<Token<'_>>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for chunk in split_embedded(source) {
        match chunk.kind {
            ChunkKind::Raw => tokens.push(Token::new(TokenKind::RAW, chunk.text, chunk.line)),
            ChunkKind::Code => {
                let (code, errs) = tokenize(chunk.text, chunk.line);
                tokens.extend(code);
                errors.extend(errs);
            }
        }
        let line = tokens.last().map_or(chunk.line, |t| t.line);
        tokens.push(Token::new(TokenKind::SEMI, ";", line));
    }
    (tokens, errors)
}
