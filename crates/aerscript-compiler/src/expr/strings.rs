//! Double-quoted strings: escapes and variable interpolation.
//!
//! A string is cut into pieces: runs of literal text (escapes already
//! decoded) become one constant each and interpolated expressions are
//! compiled in place. When more than one piece was loaded an `ADD` with the
//! piece count and the concatenation flag joins them.
//!
//! ```text
//! "id: $id\n"     LOADC "id: "; LOAD $id; LOADC "\n"; ADD 3 1
//! "{$a->b}"       LOAD $a; LOADC b; MEMBER
//! ```

use aerscript_parser::TokenStream;
use aerscript_parser::lexer::tokenize;

use crate::bytecode::{Opcode, Operand};
use crate::codegen::{CodeGen, Result};
use crate::expr::{ExprFlags, ExprStatus};

/// Whether `$` followed by `next` starts an interpolated variable.
fn starts_interpolation(next: u8) -> bool {
    next.is_ascii_alphabetic() || next == b'_' || next == b'{' || next >= 0xC0
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

/// Index just past the bracket closing the one at `open`.
fn skip_balanced(bytes: &[u8], open: usize, left: u8, right: u8) -> usize {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        if bytes[i] == left {
            depth += 1;
        } else if bytes[i] == right {
            depth -= 1;
            if depth == 0 {
                return i + 1;
            }
        }
        i += 1;
    }
    bytes.len()
}

/// End of a simple interpolation starting at the `$` at `start`: a variable
/// name followed by any chain of `->name`, `::name`, one `[...]` or `{...}`.
fn simple_interpolation_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    loop {
        while i < bytes.len() && bytes[i] == b'$' {
            i += 1;
        }
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        let Some(&b) = bytes.get(i) else {
            return i;
        };
        match (b, bytes.get(i + 1)) {
            (b'[', _) => return skip_balanced(bytes, i, b'[', b']'),
            (b'{', _) => return skip_balanced(bytes, i, b'{', b'}'),
            (b'-', Some(b'>')) | (b':', Some(b':')) => i += 2,
            _ => return i,
        }
    }
}

fn hex_value(b: u8) -> Option<u32> {
    (b as char).to_digit(16)
}

/// Decode the escape whose body starts `rest` (the backslash is already
/// consumed) into `out`. Returns the number of bytes consumed.
pub(crate) fn decode_escape(rest: &str, out: &mut String) -> usize {
    let bytes = rest.as_bytes();
    let simple = match bytes.first() {
        None => return 0,
        Some(b'$') => Some('$'),
        Some(b'\\') => Some('\\'),
        Some(b'\'') => Some('\''),
        Some(b'"') => Some('"'),
        Some(b'0') => Some('\0'),
        Some(b'a') => Some('\x07'),
        Some(b'b') => Some('\x08'),
        Some(b'f') => Some('\x0C'),
        Some(b'n') => Some('\n'),
        Some(b'r') => Some('\r'),
        Some(b't') => Some('\t'),
        Some(b'v') => Some('\x0B'),
        _ => None,
    };
    if let Some(c) = simple {
        out.push(c);
        return 1;
    }
    match bytes[0] {
        b'x' if bytes.get(1).and_then(|&b| hex_value(b)).is_some() => {
            let mut value = 0u32;
            let mut used = 1;
            while used < 3 {
                match bytes.get(used).and_then(|&b| hex_value(b)) {
                    Some(digit) => value = value * 16 + digit,
                    None => break,
                }
                used += 1;
            }
            out.extend(char::from_u32(value));
            used
        }
        b'o' if bytes.get(1).is_some_and(|b| (b'0'..=b'7').contains(b)) => {
            let mut value = 0u32;
            let mut used = 1;
            while used < 4 && bytes.get(used).is_some_and(|b| (b'0'..=b'7').contains(b)) {
                value = value * 8 + u32::from(bytes[used] - b'0');
                used += 1;
            }
            if value > 0 {
                out.extend(char::from_u32(value));
            }
            used
        }
        _ => {
            // Unknown escape: keep the character, drop the backslash.
            let c = rest.chars().next().unwrap_or('\\');
            out.push(c);
            c.len_utf8()
        }
    }
}

impl<'src> CodeGen<'src, '_> {
    pub(crate) fn compile_string(&mut self) -> Result<()> {
        let Some(tok) = self.stream.bump() else {
            return Ok(());
        };
        let text: &'src str = tok.text;
        if text.is_empty() {
            let idx = self.program.constants.add_string("");
            self.emitter.emit_loadc(idx);
            return Ok(());
        }
        let bytes = text.as_bytes();
        let mut pieces = 0i32;
        let mut run: Option<String> = None;
        let mut i = 0;
        while i < bytes.len() {
            let run_start = i;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => break,
                    b'{' if bytes.get(i + 1) == Some(&b'$') => break,
                    b'$' if bytes.get(i + 1).is_some_and(|&b| starts_interpolation(b)) => break,
                    _ => i += 1,
                }
            }
            if i > run_start {
                run.get_or_insert_with(String::new)
                    .push_str(&text[run_start..i]);
            }
            if i >= bytes.len() {
                break;
            }
            if bytes[i] == b'\\' {
                i += 1;
                i += decode_escape(&text[i..], run.get_or_insert_with(String::new));
                continue;
            }
            self.flush_text_run(&mut run, &mut pieces);
            let expr = if bytes[i] == b'{' {
                let close = skip_balanced(bytes, i, b'{', b'}');
                let inner_end = if close > i + 1 && bytes.get(close - 1) == Some(&b'}') {
                    close - 1
                } else {
                    close
                };
                let expr = &text[i + 1..inner_end];
                i = close;
                expr
            } else {
                let end = simple_interpolation_end(bytes, i);
                let expr = &text[i..end];
                i = end;
                expr
            };
            if self.compile_interpolated(expr, tok.line)? == ExprStatus::Emitted {
                pieces += 1;
            }
        }
        self.flush_text_run(&mut run, &mut pieces);
        if pieces > 1 {
            self.emitter.emit(Opcode::Add, pieces, 1, Operand::None);
        }
        Ok(())
    }

    fn flush_text_run(&mut self, run: &mut Option<String>, pieces: &mut i32) {
        if let Some(text) = run.take() {
            let idx = self.program.constants.add_string(&text);
            self.emitter.emit_loadc(idx);
            *pieces += 1;
        }
    }

    fn compile_interpolated(&mut self, expr: &'src str, line: u32) -> Result<ExprStatus> {
        let (tokens, errors) = tokenize(expr, line);
        self.report_lex_errors(errors)?;
        self.with_stream(TokenStream::new(tokens), |cg| {
            cg.compile_expr(ExprFlags::empty(), None)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Constant;
    use crate::expr::test_support::{Output, run};

    fn string(src: &str) -> Output {
        run(src, |cg| {
            cg.compile_expr(ExprFlags::empty(), None).unwrap();
        })
    }

    fn loaded_strings(out: &Output) -> Vec<String> {
        out.code
            .iter()
            .filter(|i| i.op == Opcode::Loadc)
            .filter_map(|i| match out.program.constants.get(i.p2) {
                Some(Constant::String(s)) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn escapes() {
        let mut out = String::new();
        assert_eq!(decode_escape("n", &mut out), 1);
        assert_eq!(decode_escape("x41z", &mut out), 3);
        assert_eq!(decode_escape("o101", &mut out), 4);
        assert_eq!(decode_escape("o0", &mut out), 2);
        assert_eq!(decode_escape("q", &mut out), 1);
        assert_eq!(out, "\nAAq");
    }

    #[test]
    fn plain_text_is_one_constant() {
        let out = string(r#""tab\there""#);
        assert_eq!(out.ops(), vec![Opcode::Loadc]);
        assert_eq!(loaded_strings(&out), vec!["tab\there".to_string()]);
    }

    #[test]
    fn simple_interpolation_concatenates() {
        let out = string(r#""id: $id\n""#);
        assert_eq!(
            out.ops(),
            vec![Opcode::Loadc, Opcode::Load, Opcode::Loadc, Opcode::Add]
        );
        let add = out.code.peek().unwrap();
        assert_eq!((add.p1, add.p2), (3, 1));
        assert_eq!(out.code.get(1).unwrap().p3, Operand::Name("id".into()));
    }

    #[test]
    fn member_chain_is_interpolated() {
        let out = string(r#""$user->name!""#);
        assert_eq!(
            out.ops(),
            vec![Opcode::Load, Opcode::Loadc, Opcode::Member, Opcode::Loadc, Opcode::Add]
        );
        assert_eq!(out.code.peek().unwrap().p1, 2);
    }

    #[test]
    fn curly_syntax() {
        let out = string(r#""{$rows[0]}""#);
        assert_eq!(out.ops(), vec![Opcode::Load, Opcode::Loadc, Opcode::LoadIdx]);
    }

    #[test]
    fn lone_dollar_is_text() {
        let out = string(r#""costs $5""#);
        assert_eq!(loaded_strings(&out), vec!["costs $5".to_string()]);
    }

    #[test]
    fn empty_string() {
        let out = string(r#""""#);
        assert_eq!(loaded_strings(&out), vec![String::new()]);
    }
}
