//! Number, single-quoted string and bare-name leaves.

use aerscript_parser::TokenKind;

use crate::bytecode::{FALSE_SLOT, NULL_SLOT, Opcode, Operand, TRUE_SLOT};
use crate::codegen::{CodeGen, Result};

/// An integer literal as written, or the radix it overflows in.
#[derive(Debug, Clone, Copy, PartialEq)]
enum IntLiteral {
    Value(i64),
    Overflow { radix: u32 },
}

/// Parse an integer literal in any of the radixes the lexer accepts.
/// Literals up to `u64::MAX` wrap into the signed range.
fn parse_int(text: &str) -> IntLiteral {
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        (bin, 2)
    } else if text.len() > 1 && text.starts_with('0') && text.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    // `0x` without digits is already a lexer error.
    if digits.is_empty() {
        return IntLiteral::Value(0);
    }
    i64::from_str_radix(digits, radix)
        .ok()
        .or_else(|| u64::from_str_radix(digits, radix).ok().map(|v| v as i64))
        .map_or(IntLiteral::Overflow { radix }, IntLiteral::Value)
}

/// Undo the two escapes a single-quoted string knows about.
pub(crate) fn unescape_simple(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(&next @ ('\\' | '\'')) => {
                    out.push(next);
                    chars.next();
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

impl CodeGen<'_, '_> {
    pub(crate) fn compile_number(&mut self) -> Result<()> {
        let Some(tok) = self.stream.bump() else {
            return Ok(());
        };
        let idx = if tok.is(TokenKind::INTEGER) {
            match parse_int(tok.text) {
                IntLiteral::Value(value) => self.program.constants.add_int(value),
                // Decimal literals too large for an integer become reals.
                IntLiteral::Overflow { radix: 10 } => match tok.text.parse::<f64>() {
                    Ok(value) => self.program.constants.add_real(value),
                    Err(_) => self.number_out_of_range(tok.line, tok.text)?,
                },
                IntLiteral::Overflow { .. } => self.number_out_of_range(tok.line, tok.text)?,
            }
        } else {
            match tok.text.parse::<f64>() {
                Ok(value) => self.program.constants.add_real(value),
                Err(_) => self.number_out_of_range(tok.line, tok.text)?,
            }
        };
        self.emitter.emit_loadc(idx);
        Ok(())
    }

    /// Warn about a literal that has no exact value and load the largest
    /// integer in its place.
    fn number_out_of_range(&mut self, line: u32, text: &str) -> Result<u32> {
        self.warning(line, format!("Numeric literal '{text}' is out of range"))?;
        Ok(self.program.constants.add_int(i64::MAX))
    }

    pub(crate) fn compile_simple_string(&mut self) -> Result<()> {
        let Some(tok) = self.stream.bump() else {
            return Ok(());
        };
        let value = unescape_simple(tok.text);
        let idx = self.program.constants.add_string(&value);
        self.emitter.emit_loadc(idx);
        Ok(())
    }

    /// A bare name: reserved literals and magic constants are folded, any
    /// other name is loaded for run-time resolution.
    pub(crate) fn compile_literal(&mut self) -> Result<()> {
        if self.stream.remaining() > 1 {
            let line = self.line();
            self.namespace_notice(line)?;
            let last = self.stream.end() - 1;
            self.stream.set_pos(last);
        }
        let Some(tok) = self.stream.bump() else {
            return Ok(());
        };
        let name = tok.text;
        if name.eq_ignore_ascii_case("null") {
            self.emitter.emit_loadc(NULL_SLOT);
            return Ok(());
        }
        if name.eq_ignore_ascii_case("true") {
            self.emitter.emit_loadc(TRUE_SLOT);
            return Ok(());
        }
        if name.eq_ignore_ascii_case("false") {
            self.emitter.emit_loadc(FALSE_SLOT);
            return Ok(());
        }
        let folded = match name {
            "__LINE__" => Some(self.program.constants.add_int(i64::from(tok.line))),
            "__FILE__" => {
                let label = self.config.file_label().to_owned();
                Some(self.program.constants.add_string(&label))
            }
            "__DIR__" => {
                let label = self.config.dir_label();
                Some(self.program.constants.add_string(&label))
            }
            "__CLASS__" => Some(match self.current_class() {
                Some(class) => self.program.constants.add_string(&class),
                None => NULL_SLOT,
            }),
            "__FUNCTION__" | "__METHOD__" => Some(match self.current_function() {
                Some((_, None)) if name == "__METHOD__" => NULL_SLOT,
                Some((func, _)) => self.program.constants.add_string(&func),
                None => NULL_SLOT,
            }),
            _ => None,
        };
        match folded {
            Some(idx) => {
                self.emitter.emit_loadc(idx);
            }
            None => {
                let idx = self.program.constants.add_string(name);
                self.emitter.emit(Opcode::Loadc, 1, idx, Operand::None);
            }
        }
        Ok(())
    }
}
