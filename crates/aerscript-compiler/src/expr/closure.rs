//! Anonymous functions and language constructs (`include 'x'`).

use aerscript_parser::{Keyword, TokenKind};

use crate::bytecode::{Opcode, Operand};
use crate::codegen::{CodeGen, Result};
use crate::expr::ExprFlags;
use crate::func::{DataType, FuncFlags, FunctionDesc, TypeSpec};

impl CodeGen<'_, '_> {
    /// `[type [[]]] function [name] (args) [using (vars)] { body }`
    ///
    /// A function with a `using` clause is a closure and is loaded with
    /// `LOAD_CLOSURE`; one without is installed under a generated name and
    /// loaded as a callable string.
    pub(crate) fn compile_closure(&mut self) -> Result<()> {
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
        if self.stream.peek().is_some_and(|t| t.is_keyword(Keyword::Function)) {
            self.stream.advance();
        }
        // A name on an anonymous function is ignored.
        if self.stream.check(TokenKind::ID) {
            self.stream.advance();
        }

        let name = self.next_closure_name();
        let mut func = FunctionDesc::new(name, return_type, line);
        func.flags |= FuncFlags::ANONYMOUS;
        let Some(func) = self.compile_func(func)? else {
            return Ok(());
        };
        self.stream.skip_to_end();

        if func.is_closure() {
            let id = self.program.add_closure(func);
            self.emitter
                .emit(Opcode::LoadClosure, 0, 0, Operand::Closure(id));
        } else {
            let name = func.name.clone();
            if self.program.install_function(func).is_err() {
                return self.error(line, format!("Duplicate function name '{name}'"));
            }
            let idx = self.program.constants.add_string_uncached(name);
            self.emitter.emit_loadc(idx);
        }
        Ok(())
    }

    /// `include 'lib.aer'` compiles as a one-argument call to the built-in
    /// of the same name.
    pub(crate) fn compile_lang_construct(&mut self, kw: Keyword) -> Result<()> {
        let Some(tok) = self.stream.bump() else {
            return Ok(());
        };
        debug_assert_eq!(tok.keyword(), Some(kw));
        let status = self.compile_expr(ExprFlags::RDONLY_LOAD, None)?;
        let args = i32::from(!status.is_empty());
        let idx = self.program.constants.add_string(tok.text);
        self.emitter.emit_loadc(idx);
        self.emitter.emit(Opcode::Call, args, 0, Operand::None);
        Ok(())
    }

    /// Consume a `[]` array-type suffix.
    pub(crate) fn eat_array_suffix(&mut self) -> bool {
        let is_suffix = self.stream.check(TokenKind::OSB)
            && self.stream.peek_nth(1).is_some_and(|t| t.is(TokenKind::CSB));
        if is_suffix {
            self.stream.advance();
            self.stream.advance();
        }
        is_suffix
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::{Constant, Opcode, Operand};
    use crate::expr::ExprFlags;
    use crate::expr::test_support::{Output, run};
    use crate::func::{CaptureFlags, DataType, FuncFlags, TypeSpec};

    fn expr(src: &str) -> Output {
        run(src, |cg| {
            cg.compile_expr(ExprFlags::empty(), None).unwrap();
        })
    }

    #[test]
    fn plain_anonymous_function_is_installed() {
        let out = expr("function($x) { return $x; }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(out.ops(), vec![Opcode::Loadc]);
        let func = out.program.function("{closure_0}").unwrap();
        assert!(func.flags.contains(FuncFlags::ANONYMOUS));
        assert!(!func.is_closure());
        assert_eq!(func.return_type, TypeSpec::builtin(DataType::Mixed));
        assert_eq!(
            out.program.constants.get(out.code.peek().unwrap().p2),
            Some(&Constant::String("{closure_0}".into()))
        );
    }

    #[test]
    fn using_clause_makes_a_closure() {
        let out = expr("int[] function() using ($a, &$b) { return [$a, $b]; }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(out.code.peek().unwrap().op, Opcode::LoadClosure);
        assert_eq!(out.code.peek().unwrap().p3, Operand::Closure(0));
        let closure = &out.program.closures[0];
        assert!(closure.is_closure());
        assert_eq!(
            closure.return_type,
            TypeSpec::builtin(DataType::Int).with_hashmap(true)
        );
        let names: Vec<_> = closure.captures.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "this"]);
        assert!(closure.captures[1].flags.contains(CaptureFlags::BY_REF));
        assert!(closure.captures[2].flags.contains(CaptureFlags::IGNORE));
    }

    #[test]
    fn closure_names_do_not_collide() {
        let out = expr("[function() {}, function() {}]");
        assert!(out.program.function("{closure_0}").is_some());
        assert!(out.program.function("{closure_1}").is_some());
    }

    #[test]
    fn lang_construct_calls_builtin() {
        let out = expr("include 'lib.aer'");
        assert_eq!(out.ops(), vec![Opcode::Loadc, Opcode::Loadc, Opcode::Call]);
        let call = out.code.peek().unwrap();
        assert_eq!(call.p1, 1);
        assert_eq!(
            out.program.constants.get(out.code.get(1).unwrap().p2),
            Some(&Constant::String("include".into()))
        );
    }

    #[test]
    fn lang_construct_without_operand() {
        let out = expr("eval");
        assert_eq!(out.ops(), vec![Opcode::Loadc, Opcode::Call]);
        assert_eq!(out.code.peek().unwrap().p1, 0);
    }
}
