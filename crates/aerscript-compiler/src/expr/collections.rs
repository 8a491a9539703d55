//! `array(...)`, `[...]` and `list(...)`.

use aerscript_parser::{Keyword, TokenKind};

use crate::bytecode::{NULL_SLOT, Opcode, Operand};
use crate::codegen::{CodeGen, Result};
use crate::expr::{ExprFlags, TreeCheck};

impl CodeGen<'_, '_> {
    /// Token range between the delimiters of the collection leaf at the
    /// cursor: `array(` / `list(` / `[` up to the closing token.
    fn collection_body(&self) -> (usize, usize) {
        let pos = self.stream.pos();
        let opener = match self.stream.peek() {
            Some(tok) if tok.is_keyword(Keyword::Array) || tok.is_keyword(Keyword::List) => 2,
            _ => 1,
        };
        let end = self.stream.end().saturating_sub(1);
        ((pos + opener).min(end), end)
    }

    /// The `=>` of an entry, ignoring any inside nested brackets.
    fn entry_arrow(&self, from: usize, to: usize) -> Option<usize> {
        let mut nest = 0i32;
        for idx in from..to {
            let tok = self.token(idx)?;
            if tok.is(TokenKind::OCB | TokenKind::OSB | TokenKind::LPAREN) {
                nest += 1;
            } else if tok.is(TokenKind::CCB | TokenKind::CSB | TokenKind::RPAREN) {
                nest -= 1;
            } else if nest == 0 && tok.is(TokenKind::ARRAY_OP) {
                return Some(idx);
            }
        }
        None
    }

    /// Compile one array key or value occupying `[from, to)`.
    fn compile_entry(&mut self, from: usize, to: usize) -> Result<()> {
        let by_ref = self.token(from).is_some_and(|t| t.is(TokenKind::AMPER));
        if by_ref {
            self.with_span(from + 1, to, |cg| {
                cg.compile_expr(ExprFlags::RDONLY_LOAD, Some(TreeCheck::ArrayRef))
            })?;
            self.emitter.emit_op(Opcode::LoadRef);
            return Ok(());
        }
        self.with_span(from, to, |cg| cg.compile_window_expr(ExprFlags::RDONLY_LOAD))?;
        Ok(())
    }

    /// ```text
    /// array('a' => 1, 2)     LOADC 'a'; LOADC 1; LOADC null; LOADC 2; LOAD_MAP 4
    /// ```
    pub(crate) fn compile_array(&mut self) -> Result<()> {
        let (from, to) = self.collection_body();
        let mut pairs = 0i32;
        for (start, end) in self.stream.split_commas(from, to) {
            if start >= end {
                continue;
            }
            let line = self.token(start).map_or_else(|| self.line(), |t| t.line);
            self.emitter.set_line(line);
            let value_start = match self.entry_arrow(start, end) {
                Some(arrow) if arrow + 1 >= end => {
                    return self.error(line, "array(): Missing entry value");
                }
                Some(arrow) if arrow == start => {
                    self.warning(line, "array(): Missing entry key")?;
                    self.emitter.emit_loadc(NULL_SLOT);
                    arrow + 1
                }
                Some(arrow) => {
                    self.compile_entry(start, arrow)?;
                    arrow + 1
                }
                None => {
                    self.emitter.emit_loadc(NULL_SLOT);
                    start
                }
            };
            self.compile_entry(value_start, end)?;
            pairs += 1;
        }
        self.emitter.emit(Opcode::LoadMap, pairs * 2, 0, Operand::None);
        self.stream.skip_to_end();
        Ok(())
    }

    /// ```text
    /// list($a, , $b)     LOAD $a; LOAD $b; LOAD_LIST 2
    /// ```
    pub(crate) fn compile_list(&mut self) -> Result<()> {
        let (from, to) = self.collection_body();
        let mut count = 0i32;
        for (start, end) in self.stream.split_commas(from, to) {
            if start >= end {
                continue;
            }
            let status = self.with_span(start, end, |cg| {
                cg.compile_expr(ExprFlags::empty(), Some(TreeCheck::ListTarget))
            })?;
            if !status.is_empty() {
                count += 1;
            }
        }
        self.emitter.emit(Opcode::LoadList, count, 0, Operand::None);
        self.stream.skip_to_end();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::{NULL_SLOT, Opcode};
    use crate::expr::ExprFlags;
    use crate::expr::test_support::{Output, run};

    fn expr(src: &str) -> Output {
        run(src, |cg| {
            cg.compile_expr(ExprFlags::empty(), None).unwrap();
        })
    }

    #[test]
    fn keyed_and_positional_entries() {
        let out = expr("array('a' => 1, 2)");
        assert_eq!(
            out.ops(),
            vec![Opcode::Loadc, Opcode::Loadc, Opcode::Loadc, Opcode::Loadc, Opcode::LoadMap]
        );
        assert_eq!(out.code.get(2).unwrap().p2, NULL_SLOT);
        assert_eq!(out.code.peek().unwrap().p1, 4);
    }

    #[test]
    fn short_syntax_and_empty() {
        assert_eq!(expr("[1, 2, 3]").code.peek().unwrap().p1, 6);
        let empty = expr("[]");
        assert_eq!(empty.ops(), vec![Opcode::LoadMap]);
        assert_eq!(empty.code.peek().unwrap().p1, 0);
    }

    #[test]
    fn nested_arrays_keep_their_own_keys() {
        let out = expr("['k' => ['x' => 1]]");
        let maps: Vec<i32> = out
            .code
            .iter()
            .filter(|i| i.op == Opcode::LoadMap)
            .map(|i| i.p1)
            .collect();
        assert_eq!(maps, vec![2, 2]);
    }

    #[test]
    fn entries_load_read_only() {
        let out = expr("[$a]");
        let load = out.code.iter().find(|i| i.op == Opcode::Load).unwrap();
        assert_eq!(load.p1, 1);
    }

    #[test]
    fn missing_key_warns() {
        let out = expr("array(=> 1)");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.code.peek().unwrap().op, Opcode::LoadMap);
    }

    #[test]
    fn missing_value_is_an_error() {
        let out = expr("array('a' =>)");
        assert_eq!(out.diagnostics.len(), 1);
        assert!(!out.ops().contains(&Opcode::LoadMap));
    }

    #[test]
    fn reference_entries() {
        let out = expr("[&$a]");
        assert!(out.diagnostics.is_empty());
        assert_eq!(
            out.ops(),
            vec![Opcode::Loadc, Opcode::Load, Opcode::LoadRef, Opcode::LoadMap]
        );
        let bad = expr("[&1]");
        assert_eq!(bad.diagnostics.len(), 1);
    }

    #[test]
    fn list_targets() {
        let out = expr("list($a, , $b[0])");
        assert_eq!(out.code.peek().unwrap().op, Opcode::LoadList);
        assert_eq!(out.code.peek().unwrap().p1, 2);
        let bad = expr("list(1 + 2)");
        assert_eq!(bad.diagnostics.len(), 1);
    }
}
