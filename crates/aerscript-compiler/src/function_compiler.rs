//! Functions: argument lists, closure captures and bodies.
//!
//! A body compiles into its own instruction container inside a
//! `PROTECTED | FUNC` block, so no `break`, `continue` or `throw` fixup
//! recorded in it can reach a block of the caller.

use aerscript_parser::{Keyword, TokenKind};

use crate::block::{BlockData, BlockKind};
use crate::bytecode::{InstrList, Opcode, Operand};
use crate::codegen::{CodeGen, Result};
use crate::expr::{ExprFlags, ExprStatus};
use crate::func::{
    ArgFlags, Capture, CaptureFlags, DataType, FuncArg, FuncFlags, FunctionDesc, Signature,
    TypeSpec,
};

/// The overload signature of an argument list; `None` when any argument is
/// untyped or there are no arguments.
fn signature_of(args: &[FuncArg]) -> Option<Signature> {
    if args.is_empty() {
        return None;
    }
    let mut sig = Signature::new();
    for arg in args {
        sig.push(arg.ty.clone()?);
    }
    Some(sig)
}

impl<'src> CodeGen<'src, '_> {
    /// Compile a function from the `(` of its argument list: arguments,
    /// the `using` clause of anonymous functions, then the body.
    ///
    /// Returns `None` when the signature is unterminated; the rest of the
    /// window is skipped in that case.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn compile_func(&mut self, mut func: FunctionDesc) -> Result<Option<FunctionDesc>> {
        let line = self.line();
        let open = self.stream.pos();
        let close = self
            .stream
            .delimit_nested(open + 1, TokenKind::LPAREN, TokenKind::RPAREN);
        if close >= self.stream.end() {
            self.error(
                line,
                format!("Missing ')' after function '{}' signature", func.name),
            )?;
            self.stream.skip_to_end();
            return Ok(None);
        }
        self.compile_signature(&mut func, open, close)?;
        self.stream.set_pos(close + 1);

        if func.flags.contains(FuncFlags::ANONYMOUS)
            && self.stream.peek().is_some_and(|t| t.is_keyword(Keyword::Using))
        {
            self.compile_captures(&mut func)?;
        }
        self.compile_func_body(&mut func)?;
        Ok(Some(func))
    }

    /// Collect the arguments between the parentheses at `open` and `close`
    /// and derive the overload signature from them.
    pub(crate) fn compile_signature(
        &mut self,
        func: &mut FunctionDesc,
        open: usize,
        close: usize,
    ) -> Result<()> {
        if close > open + 1 {
            self.with_span(open + 1, close, |cg| cg.collect_args(func))?;
        }
        func.signature = signature_of(&func.args);
        Ok(())
    }

    /// Parse `[type [[]]] [&] $name [= default]` entries of an argument
    /// list. The window is the list without its parentheses. Collection stops
    /// at the first malformed entry.
    fn collect_args(&mut self, func: &mut FunctionDesc) -> Result<()> {
        while let Some(tok) = self.stream.peek() {
            let line = tok.line;
            let mut ty = None;
            if tok.is(TokenKind::KEYWORD) {
                let Some(builtin) = tok.keyword().and_then(DataType::from_keyword) else {
                    return self.error(line, format!("Unknown data type name '{}'", tok.text));
                };
                self.stream.advance();
                ty = Some(TypeSpec::builtin(builtin));
            } else if tok.is(TokenKind::ID) {
                self.stream.advance();
                ty = Some(TypeSpec::class(tok.text));
            }
            if let Some(spec) = ty.take() {
                let hashmap = self.eat_array_suffix();
                ty = Some(spec.with_hashmap(hashmap));
            }

            let mut flags = ArgFlags::empty();
            if self.stream.eat(TokenKind::AMPER) {
                flags |= ArgFlags::BY_REF;
            }
            let name = match (self.stream.peek(), self.stream.peek_nth(1)) {
                (None, _) => return self.error(line, "Missing argument name"),
                (Some(dollar), Some(name))
                    if dollar.is(TokenKind::DOLLAR)
                        && name.is(TokenKind::ID | TokenKind::KEYWORD) =>
                {
                    name.text
                }
                _ => return self.error(line, "Invalid argument name"),
            };
            self.stream.advance();
            self.stream.advance();

            let mut default = None;
            if self.stream.eat(TokenKind::EQUAL) {
                let from = self.stream.pos();
                let to = self.stream.expr_end(from, true);
                if to <= from {
                    return self.error(line, "Missing argument default value");
                }
                default = Some(self.compile_default(from, to)?);
                self.stream.set_pos(to);
            }

            func.args.push(FuncArg {
                name: name.to_owned(),
                ty,
                flags,
                default,
            });
            if let Some(next) = self.stream.peek() {
                if !next.is(TokenKind::COMMA) {
                    return self.error(next.line, format!("Unexpected token '{}'", next.text));
                }
                self.stream.advance();
            }
        }
        Ok(())
    }

    /// Compile the expression at the cursor into a sub-program of its own,
    /// ending in `DONE p1=<non-empty> p2=1`. The cursor is left on the
    /// expression's terminator.
    pub(crate) fn compile_sub_program(&mut self, flags: ExprFlags) -> Result<(InstrList, ExprStatus)> {
        let line = self.line();
        let (code, result) = self.with_container(|cg| {
            let status = cg.compile_expr(flags, None)?;
            cg.emitter.set_line(line);
            cg.emitter
                .emit(Opcode::Done, i32::from(!status.is_empty()), 1, Operand::None);
            Ok(status)
        });
        Ok((code, result?))
    }

    fn compile_default(&mut self, from: usize, to: usize) -> Result<InstrList> {
        let (code, _) = self.with_span(from, to, |cg| cg.compile_sub_program(ExprFlags::empty()))?;
        Ok(code)
    }

    /// `using ($a, &$b)`. `$this` is captured implicitly when not listed.
    fn compile_captures(&mut self, func: &mut FunctionDesc) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        if !self.stream.check(TokenKind::LPAREN) {
            self.error(
                line,
                "Closure: Unexpected token. Expecting a left parenthesis '('",
            )?;
        }
        self.stream.advance();

        let mut got_this = false;
        while let Some(tok) = self.stream.peek() {
            if tok.is(TokenKind::RPAREN) {
                self.stream.advance();
                break;
            }
            let mut flags = CaptureFlags::empty();
            if tok.is(TokenKind::AMPER) {
                flags |= CaptureFlags::BY_REF;
                self.stream.advance();
            }
            let name = match (self.stream.peek(), self.stream.peek_nth(1)) {
                (Some(dollar), Some(name))
                    if dollar.is(TokenKind::DOLLAR)
                        && name.is(TokenKind::ID | TokenKind::KEYWORD) =>
                {
                    name.text
                }
                _ => {
                    let line = self.line();
                    self.error(line, "Closure: Unexpected token. Expecting a variable name")?;
                    self.stream.skip_until(TokenKind::RPAREN);
                    self.stream.advance();
                    break;
                }
            };
            got_this |= name == "this";
            func.captures.push(Capture {
                name: name.to_owned(),
                flags,
            });
            self.stream.advance();
            self.stream.advance();
            while self.stream.eat(TokenKind::COMMA) {}
        }
        if !got_this {
            func.captures.push(Capture {
                name: "this".into(),
                flags: CaptureFlags::IGNORE,
            });
        }
        func.flags |= FuncFlags::CLOSURE;
        Ok(())
    }

    /// Compile the body at the cursor into `func.code`, collecting the
    /// `static` variables it declares.
    pub(crate) fn compile_func_body(&mut self, func: &mut FunctionDesc) -> Result<()> {
        let class = if func.flags.contains(FuncFlags::CLASS_METHOD) {
            self.current_class()
        } else {
            None
        };
        self.blocks.enter(
            BlockKind::PROTECTED | BlockKind::FUNC,
            0,
            BlockData::Function {
                name: func.name.clone(),
                class,
            },
        );
        self.statics.push(Vec::new());
        let (code, result) = self.with_container(|cg| {
            cg.compile_block()?;
            let block = cg.blocks.current();
            let end = cg.emitter.len();
            cg.blocks
                .fix_jumps(block, Some(Opcode::Throw), end, cg.emitter.code_mut());
            cg.emitter.emit(Opcode::Done, 0, 0, Operand::None);
            Ok(())
        });
        let statics = self.statics.pop().unwrap_or_default();
        self.blocks.leave();
        result?;
        func.code = code;
        func.statics = statics;
        Ok(())
    }

    /// `[type [[]]] function [&] name (args) { body }` at statement level.
    pub(crate) fn compile_function_decl(&mut self) -> Result<()> {
        let line = self.line();
        let mut return_type = TypeSpec::builtin(DataType::Mixed);
        if let Some(ty) = self
            .stream
            .peek()
            .and_then(|t| t.keyword())
            .and_then(DataType::from_keyword)
        {
            self.stream.advance();
            let hashmap = self.eat_array_suffix();
            return_type = TypeSpec::builtin(ty).with_hashmap(hashmap);
        }
        // `function`
        self.stream.advance();
        let mut flags = FuncFlags::empty();
        if self.stream.eat(TokenKind::AMPER) {
            flags |= FuncFlags::RETURN_REF;
        }
        let name = match self.stream.peek() {
            Some(tok) if tok.is(TokenKind::ID) => tok.text,
            other => {
                let text = other.map_or("", |t| t.text);
                self.error(line, format!("Invalid function name '{text}'"))?;
                self.skip_declaration();
                return Ok(());
            }
        };
        self.stream.advance();
        if !self.stream.check(TokenKind::LPAREN) {
            self.error(line, format!("Expected '(' after function name '{name}'"))?;
            self.skip_declaration();
            return Ok(());
        }

        let mut func = FunctionDesc::new(name, return_type, line);
        func.flags |= flags;
        let Some(func) = self.compile_func(func)? else {
            return Ok(());
        };
        if self.program.install_function(func).is_err() {
            self.error(
                line,
                format!("Function '{name}()' is already declared with the same signature"),
            )?;
        }
        Ok(())
    }

    /// Skip a malformed declaration: up to its `;`, or past its braced body.
    pub(crate) fn skip_declaration(&mut self) {
        self.stream.skip_until(TokenKind::SEMI | TokenKind::OCB);
        if self.stream.check(TokenKind::OCB) {
            let close =
                self.stream
                    .delimit_nested(self.stream.pos() + 1, TokenKind::OCB, TokenKind::CCB);
            self.stream.set_pos(close + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::test_support::{Output, run};

    fn declare(src: &str) -> Output {
        run(src, |cg| {
            cg.compile_function_decl().unwrap();
        })
    }

    #[test]
    fn typed_arguments_build_a_signature() {
        let out = declare("function area(int $w, float[] $h, Point $p) { return $w; }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let func = out.program.function("area").unwrap();
        assert_eq!(func.args.len(), 3);
        assert_eq!(func.signature_key().as_deref(), Some("iFPoint"));
        assert_eq!(func.args[2].ty, Some(TypeSpec::class("Point")));
    }

    #[test]
    fn untyped_argument_drops_the_signature() {
        let out = declare("function f(int $a, $b) {}");
        let func = out.program.function("f").unwrap();
        assert!(func.signature.is_none());
    }

    #[test]
    fn defaults_compile_into_their_own_container() {
        let out = declare("function f(int $a = 1 + 2, &$b) {}");
        let func = out.program.function("f").unwrap();
        let default = func.args[0].default.as_ref().unwrap();
        let ops: Vec<_> = default.iter().map(|i| i.op).collect();
        assert_eq!(ops, vec![Opcode::Loadc, Opcode::Loadc, Opcode::Add, Opcode::Done]);
        assert_eq!((default.peek().unwrap().p1, default.peek().unwrap().p2), (1, 1));
        assert!(func.args[1].is_by_ref());
        assert!(func.args[1].default.is_none());
    }

    #[test]
    fn body_ends_with_implicit_return() {
        let out = declare("function f() { $x = 1; }");
        let func = out.program.function("f").unwrap();
        let ops: Vec<_> = func.code.iter().map(|i| i.op).collect();
        assert_eq!(ops, vec![Opcode::Loadc, Opcode::Store, Opcode::Pop, Opcode::Done]);
        assert!(out.code.is_empty());
    }

    #[test]
    fn overloads_and_duplicates() {
        let out = run(
            "function f(int $a) {} function f(string $a) {} function f(int $b) {}",
            |cg| {
                for _ in 0..3 {
                    cg.compile_function_decl().unwrap();
                }
            },
        );
        assert_eq!(out.program.overloads("f").count(), 2);
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn malformed_arguments_are_reported() {
        let out = declare("function f(int $a $b) {}");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.program.function("f").unwrap().args.len(), 1);

        let out = declare("function f(int 5) {}");
        assert_eq!(out.diagnostics.len(), 1);

        let out = declare("function f(int $a = ) {}");
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn unterminated_signature() {
        let out = declare("function f(int $a { }");
        assert_eq!(out.diagnostics.len(), 1);
        assert!(out.program.function("f").is_none());
    }

    #[test]
    fn return_type_and_reference() {
        let out = declare("string[] function &names() { return []; }");
        let func = out.program.function("names").unwrap();
        assert!(func.flags.contains(FuncFlags::RETURN_REF));
        assert_eq!(
            func.return_type,
            TypeSpec::builtin(DataType::String).with_hashmap(true)
        );
    }

    #[test]
    fn invalid_name_skips_body() {
        let out = run("function 5() { return 1; } $x;", |cg| {
            cg.compile_function_decl().unwrap();
            assert!(cg.stream.check(TokenKind::DOLLAR));
        });
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn statics_are_collected() {
        let out = declare("function counter() { static int $n = 0; return ++$n; }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let func = out.program.function("counter").unwrap();
        assert!(func.has_static("n"));
    }

    #[test]
    fn abort_inside_a_body_installs_nothing() {
        let src = format!("function f() {{ {} }}", "break; ".repeat(16));
        let out = run(&src, |cg| {
            assert!(cg.compile_function_decl().is_err());
        });
        assert!(out.program.function("f").is_none());
        assert_eq!(out.diagnostics.len(), 17);
    }
}
