//! `if`/`elseif`/`else` and `switch`.

use aerscript_parser::{Keyword, TokenKind};

use crate::block::{BlockData, BlockId, BlockKind};
use crate::bytecode::{InstrList, Opcode, Operand};
use crate::codegen::{CodeGen, Result};
use crate::expr::ExprFlags;
use crate::program::{CaseDesc, SwitchDesc};

impl CodeGen<'_, '_> {
    /// ```text
    /// if (a) A elseif (b) B else C
    ///     a; JMPZ L1; A; JMP Lx
    /// L1: b; JMPZ L2; B; JMP Lx
    /// L2: C
    /// Lx:
    /// ```
    pub(crate) fn compile_if(&mut self) -> Result<()> {
        let block = self
            .blocks
            .enter(BlockKind::COND, self.emitter.len(), BlockData::None);
        self.stream.advance();
        loop {
            let line = self.line();
            if !self.stream.check(TokenKind::LPAREN) {
                self.error(line, "if/else/elseif: Missing '('")?;
                return self.abandon_if(block);
            }
            let Some((open, close)) = self.paren_group() else {
                self.error(line, "if/else/elseif: Missing ')'")?;
                return self.abandon_if(block);
            };
            self.compile_condition(open + 1, close, "")?;
            self.stream.set_pos(close + 1);

            let jmpz = self.emitter.emit_jump(Opcode::Jmpz, 0);
            self.blocks.record_fixup(block, Opcode::Jmpz, jmpz);
            self.compile_block()?;

            let next = self.stream.peek().and_then(|t| t.keyword());
            if !matches!(next, Some(Keyword::Else | Keyword::ElseIf)) {
                break;
            }
            let jmp = self.emitter.emit_jump(Opcode::Jmp, 0);
            self.blocks.record_fixup(block, Opcode::Jmp, jmp);
            if next == Some(Keyword::Else) {
                let else_if = self
                    .stream
                    .peek_nth(1)
                    .is_some_and(|t| t.is_keyword(Keyword::If));
                if !else_if {
                    break;
                }
                self.stream.advance();
            }
            self.stream.advance();
            let here = self.emitter.len();
            self.blocks
                .fix_jumps(block, Some(Opcode::Jmpz), here, self.emitter.code_mut());
        }

        let here = self.emitter.len();
        self.blocks
            .fix_jumps(block, Some(Opcode::Jmpz), here, self.emitter.code_mut());
        if self.stream.peek().is_some_and(|t| t.is_keyword(Keyword::Else)) {
            self.stream.advance();
            self.compile_block()?;
        }
        self.exit_block(block);
        Ok(())
    }

    fn abandon_if(&mut self, block: BlockId) -> Result<()> {
        self.exit_block(block);
        self.synchronize();
        Ok(())
    }

    /// ```text
    /// switch (x) { case 1: A; default: B; }
    ///     x; SWITCH #0
    /// L1: A
    /// L2: B
    /// Lx:
    /// ```
    ///
    /// Case expressions compile into containers of their own and, together
    /// with the entry point of every case body, are recorded in the switch
    /// descriptor the `SWITCH` instruction refers to.
    pub(crate) fn compile_switch(&mut self) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        if !self.stream.check(TokenKind::LPAREN) {
            self.error(line, "Expected '(' after 'switch' keyword")?;
            self.synchronize();
            return Ok(());
        }
        let block = self.blocks.enter(
            BlockKind::LOOP | BlockKind::SWITCH,
            self.emitter.len(),
            BlockData::None,
        );
        let Some((open, close)) = self.paren_group().filter(|(o, c)| c > &(o + 1)) else {
            self.error(line, "Expected expression after 'switch' keyword")?;
            self.exit_block(block);
            self.synchronize();
            return Ok(());
        };
        self.compile_condition(open + 1, close, "Switch: ")?;
        self.stream.set_pos(close + 1);

        let Some(brace) = self.stream.peek().filter(|t| t.is(TokenKind::OCB)) else {
            let text = self.stream.peek().map_or("EOF", |t| t.text);
            self.error(line, format!("Switch: Unexpected token '{text}'"))?;
            self.exit_block(block);
            self.synchronize();
            return Ok(());
        };
        let body_end = self.stream.delimit_nested(
            self.stream.pos() + 1,
            TokenKind::OCB,
            TokenKind::CCB,
        );
        self.stream.advance();

        let id = self.program.add_switch(SwitchDesc::default());
        self.emitter.emit(Opcode::Switch, 0, 0, Operand::Switch(id));
        let mut desc = SwitchDesc::default();
        loop {
            let Some(tok) = self.stream.peek() else {
                self.error(
                    brace.line,
                    "Unexpected end of file, expecting 'case' or 'default' or '}'",
                )?;
                break;
            };
            if tok.is(TokenKind::CCB) {
                self.stream.advance();
                break;
            }
            let at_end = match tok.keyword() {
                Some(Keyword::Default) => {
                    if desc.default_start.is_some() {
                        self.warning(tok.line, "Switch: 'default' case already compiled")?;
                    }
                    self.stream.advance();
                    let (start, at_end) = self.compile_switch_body()?;
                    desc.default_start.get_or_insert(start);
                    at_end
                }
                Some(Keyword::Case) => {
                    self.stream.advance();
                    let Some(expr) = self.compile_case_expr()? else {
                        self.stream.set_pos((body_end + 1).min(self.stream.end()));
                        break;
                    };
                    let (start, at_end) = self.compile_switch_body()?;
                    desc.cases.push(CaseDesc { expr, start });
                    at_end
                }
                _ => {
                    self.error(tok.line, format!("Switch: Unexpected token '{}'", tok.text))?;
                    self.stream.set_pos((body_end + 1).min(self.stream.end()));
                    break;
                }
            };
            if at_end {
                break;
            }
        }

        desc.out = self.emitter.len();
        if let Some(slot) = self.program.switches.get_mut(id as usize) {
            *slot = desc;
        }
        self.exit_block(block);
        Ok(())
    }

    /// The expression of a `case`, up to its `:` or `;`, compiled into a
    /// container of its own.
    fn compile_case_expr(&mut self) -> Result<Option<InstrList>> {
        let line = self.line();
        let from = self.stream.pos();
        let mut nest = 0i32;
        let mut to = from;
        while let Some(tok) = self.token(to).filter(|_| to < self.stream.end()) {
            if tok.is(TokenKind::LPAREN) {
                nest += 1;
            } else if tok.is(TokenKind::RPAREN) {
                nest -= 1;
            } else if nest < 1 && tok.is(TokenKind::SEMI | TokenKind::COLON) {
                break;
            }
            to += 1;
        }
        if to == from {
            self.error(line, "Empty case expression")?;
            return Ok(None);
        }
        let (code, _) = self.with_span(from, to, |cg| cg.compile_sub_program(ExprFlags::empty()))?;
        self.stream.set_pos(to);
        Ok(Some(code))
    }

    /// Compile the statements of one case, from its `:` up to the next
    /// `case`, `default` or the closing `}`. Returns the entry point of the
    /// body and whether the switch's `}` was consumed.
    fn compile_switch_body(&mut self) -> Result<(u32, bool)> {
        while let Some(tok) = self.stream.peek() {
            if tok.is(TokenKind::SEMI | TokenKind::COLON) {
                self.stream.advance();
                break;
            }
            self.error(tok.line, format!("Unexpected token '{}'", tok.text))?;
            self.stream.advance();
        }
        let start = self.emitter.len();
        while let Some(tok) = self.stream.peek() {
            if tok.is(TokenKind::CCB) {
                self.stream.advance();
                return Ok((start, true));
            }
            if tok.is_keyword(Keyword::Case) || tok.is_keyword(Keyword::Default) {
                break;
            }
            self.compile_block()?;
        }
        Ok((start, false))
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::{Opcode, Operand};
    use crate::stmt::test_support::script;

    fn messages(out: &crate::expr::test_support::Output) -> Vec<String> {
        out.diagnostics.iter().map(|d| d.message.clone()).collect()
    }

    #[test]
    fn if_without_else() {
        let out = script("if ($a) { f(); }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(
            out.ops(),
            vec![Opcode::Load, Opcode::Jmpz, Opcode::Loadc, Opcode::Call, Opcode::Pop]
        );
        assert_eq!(out.code.get(1).unwrap().p2, 5);
    }

    #[test]
    fn if_else_chain() {
        let out = script("if ($a) { $x = 1; } elseif ($b) { $x = 2; } else if ($c) { $x = 3; } else { $x = 4; }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let end = out.code.len();
        let jumps: Vec<_> = out
            .code
            .iter()
            .filter(|i| i.op == Opcode::Jmp)
            .map(|i| i.p2)
            .collect();
        assert_eq!(jumps, vec![end, end, end]);

        // Each false condition lands right after the preceding branch's JMP.
        for (idx, instr) in out.code.iter().enumerate() {
            if instr.op == Opcode::Jmpz {
                let target = out.code.get(instr.p2).unwrap();
                let before = out.code.get(instr.p2 - 1).unwrap();
                assert_eq!(before.op, Opcode::Jmp, "jmpz at {idx}");
                assert_ne!(target.op, Opcode::Jmp);
            }
        }
        assert_eq!(out.ops().iter().filter(|&&op| op == Opcode::Store).count(), 4);
    }

    #[test]
    fn if_errors() {
        let out = script("if $a { }");
        assert_eq!(messages(&out), vec!["if/else/elseif: Missing '('"]);
        let out = script("if ($a { }");
        assert_eq!(messages(&out), vec!["if/else/elseif: Missing ')'"]);
        let out = script("if ($a) {} elseif {}");
        assert_eq!(messages(&out), vec!["if/else/elseif: Missing '('"]);
    }

    #[test]
    fn if_leftover_tokens() {
        let out = script("if ($a $b) {}");
        assert!(!out.diagnostics.is_empty());
    }

    #[test]
    fn switch_cases_and_default() {
        let out = script("switch ($x) { case 1: f(); break; case 2: default: g(); }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let switch = out.code.get(1).unwrap();
        assert_eq!(switch.op, Opcode::Switch);
        assert_eq!(switch.p3, Operand::Switch(0));

        let desc = &out.program.switches[0];
        assert_eq!(desc.cases.len(), 2);
        assert_eq!(desc.cases[0].start, 2);
        let case_ops: Vec<_> = desc.cases[0].expr.iter().map(|i| i.op).collect();
        assert_eq!(case_ops, vec![Opcode::Loadc, Opcode::Done]);
        assert_eq!(desc.cases[0].expr.peek().unwrap().p2, 1);
        // Case 2 falls through into default.
        assert_eq!(desc.cases[1].start, desc.default_start.unwrap());
        assert_eq!(desc.out, out.code.len());

        let brk = out.code.iter().find(|i| i.op == Opcode::Jmp).unwrap();
        assert_eq!(brk.p2, desc.out);
    }

    #[test]
    fn continue_in_switch_leaves_it() {
        let out = script("switch ($x) { case 1: continue; }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let jmp = out.code.iter().find(|i| i.op == Opcode::Jmp).unwrap();
        assert_eq!(jmp.p2, out.program.switches[0].out);
    }

    #[test]
    fn duplicate_default_warns() {
        let out = script("switch ($x) { default: f(); default: g(); }");
        assert_eq!(messages(&out), vec!["Switch: 'default' case already compiled"]);
        assert_eq!(out.program.switches[0].default_start, Some(2));
    }

    #[test]
    fn switch_errors() {
        let cases = [
            ("switch $x {}", "Expected '(' after 'switch' keyword"),
            ("switch () {}", "Expected expression after 'switch' keyword"),
            ("switch ($x) ;", "Switch: Unexpected token ';'"),
            ("switch ($x) { case : f(); }", "Empty case expression"),
            ("switch ($x) { return; }", "Switch: Unexpected token 'return'"),
            ("switch ($x) { case 1: ", "Unexpected end of file, expecting 'case' or 'default' or '}'"),
        ];
        for (src, expected) in cases {
            let out = script(src);
            assert_eq!(messages(&out), vec![expected], "{src}");
        }
    }

    #[test]
    fn statements_after_switch_compile() {
        let out = script("switch ($x) { case 1: f(); } $y = 2;");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(out.code.peek().unwrap().op, Opcode::Pop);
        assert_eq!(out.program.switches[0].out, out.code.len() - 3);
    }
}
