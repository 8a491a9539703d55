//! `const`, typed variable declarations, `namespace` and `using`.

use aerscript_parser::{Keyword, TokenKind};

use crate::bytecode::{InstrList, Opcode, Operand};
use crate::codegen::{CodeGen, Result};
use crate::expr::ExprFlags;
use crate::func::{DataType, StaticVar, TypeSpec};
use crate::program::NamedConstant;

/// Constant names the language reserves, compared case-insensitively.
const RESERVED_CONSTANTS: [&str; 3] = ["null", "true", "false"];

impl<'src> CodeGen<'src, '_> {
    /// `const NAME = expr;`
    ///
    /// The value compiles into a container of its own that is expanded
    /// wherever the constant is used. A later definition of the same name
    /// replaces the earlier one.
    pub(crate) fn compile_const(&mut self) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        let Some(tok) = self
            .stream
            .peek()
            .filter(|t| t.is(TokenKind::STRING | TokenKind::ID | TokenKind::KEYWORD))
        else {
            return self.error_recover(line, "const: Invalid constant name");
        };
        let name = tok.text;
        if RESERVED_CONSTANTS
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
        {
            return self.error_recover(
                line,
                format!("const: Cannot redeclare a reserved constant '{name}'"),
            );
        }
        self.stream.advance();
        if !self.stream.eat(TokenKind::EQUAL) {
            return self.error_recover(line, "const: Expected '=' after constant name");
        }
        let (code, _) = self.compile_sub_program(ExprFlags::empty())?;

        let constants = &mut self.program.named_constants;
        match constants.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.code = code,
            None => constants.push(NamedConstant {
                name: name.to_owned(),
                code,
            }),
        }
        Ok(())
    }

    /// `[static] type[[]] $a [= expr], $b ...;`
    ///
    /// The cursor is left on the terminating `;`. Locals compile to
    /// `DECLARE` plus an optional assignment; statics are recorded on the
    /// enclosing function with their initializer in a container of its own.
    pub(crate) fn compile_var(&mut self) -> Result<()> {
        let line = self.line();
        let is_static = self.stream.eat_keyword(Keyword::Static);
        let builtin = self
            .stream
            .peek()
            .and_then(|t| t.keyword())
            .and_then(DataType::from_keyword);
        let Some(builtin) = builtin else {
            let text = self.stream.peek().map_or("EOF", |t| t.text);
            return self.error_recover(line, format!("Unknown data type name '{text}'"));
        };
        self.stream.advance();
        let hashmap = self.eat_array_suffix();
        let ty = TypeSpec::builtin(builtin).with_hashmap(hashmap);

        loop {
            let name = match (self.stream.peek(), self.stream.peek_nth(1)) {
                (Some(dollar), Some(name))
                    if dollar.is(TokenKind::DOLLAR)
                        && name.is(TokenKind::ID | TokenKind::KEYWORD) =>
                {
                    name.text
                }
                (tok, _) => {
                    let text = tok.map_or("EOF", |t| t.text);
                    return self
                        .error_recover(line, format!("Unexpected '{text}', expecting variable"));
                }
            };
            if is_static {
                self.compile_static_var(name, &ty)?;
            } else {
                self.compile_local_var(name, &ty)?;
            }
            match self.stream.peek() {
                None => break,
                Some(tok) if tok.is(TokenKind::SEMI) => break,
                Some(tok) if tok.is(TokenKind::COMMA) => self.stream.advance(),
                Some(tok) => {
                    return self
                        .error_recover(tok.line, format!("Unexpected token '{}'", tok.text));
                }
            }
        }
        Ok(())
    }

    fn compile_local_var(&mut self, name: &str, ty: &TypeSpec) -> Result<()> {
        let line = self.line();
        self.emitter.set_line(line);
        self.emitter
            .emit(Opcode::Declare, 0, ty.code(), Operand::Name(name.to_owned()));
        let assigned = self
            .stream
            .peek_nth(2)
            .is_some_and(|t| t.is(TokenKind::EQUAL));
        if !assigned {
            self.stream.advance();
            self.stream.advance();
            return Ok(());
        }
        let status = self.compile_expr(ExprFlags::COMMA_STATEMENT, None)?;
        if status.is_empty() {
            self.error(line, format!("Variable '{name}' is missing default value"))?;
        } else {
            self.emitter.emit(Opcode::Pop, 1, 0, Operand::None);
        }
        Ok(())
    }

    fn compile_static_var(&mut self, name: &str, ty: &TypeSpec) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        self.stream.advance();
        let mut init = InstrList::new();
        if self.stream.eat(TokenKind::EQUAL) {
            let (code, status) = self.compile_sub_program(ExprFlags::COMMA_STATEMENT)?;
            if status.is_empty() {
                self.error(line, format!("Static variable '{name}' is missing default value"))?;
            }
            init = code;
        }
        match self.statics.last_mut() {
            Some(frame) => frame.push(StaticVar {
                name: name.to_owned(),
                ty: ty.clone(),
                init,
            }),
            None => {
                self.error(
                    line,
                    format!("Static variable '{name}' can only be declared inside a function"),
                )?;
            }
        }
        Ok(())
    }

    /// `namespace a\b { declarations }`
    ///
    /// Namespaces are not supported: the path is ignored and the body is
    /// compiled as global declarations.
    pub(crate) fn compile_namespace(&mut self) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        let allowed = TokenKind::NSSEP
            | TokenKind::ID
            | TokenKind::KEYWORD
            | TokenKind::SEMI
            | TokenKind::OCB;
        if let Some(tok) = self.stream.peek().filter(|t| !t.is(allowed)) {
            self.error(line, format!("Namespace: Unexpected token '{}'", tok.text))?;
            self.skip_declaration();
            return Ok(());
        }
        while self.stream.check(TokenKind::NSSEP | TokenKind::ID | TokenKind::KEYWORD) {
            self.stream.advance();
        }
        if !self.stream.check(TokenKind::OCB) {
            let text = self.stream.peek().map_or("EOF", |t| t.text);
            self.error(
                line,
                format!("Namespace: Unexpected token '{text}',expecting '{{'"),
            )?;
            self.skip_declaration();
            return Ok(());
        }
        let open = self.stream.pos();
        let close = self
            .stream
            .delimit_nested(open + 1, TokenKind::OCB, TokenKind::CCB);
        if close >= self.stream.end() {
            self.error(line, "Namespace: Missing '}' after namespace definition")?;
            self.stream.skip_to_end();
            return Ok(());
        }
        self.namespace_notice(line)?;
        self.with_span(open + 1, close, |cg| cg.compile_global_scope())?;
        self.stream.set_pos(close + 1);
        Ok(())
    }

    /// `using a\b [as c], d\e;` is parsed and ignored.
    pub(crate) fn compile_using(&mut self) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        let path = TokenKind::NSSEP | TokenKind::ID | TokenKind::COMMA;
        while self.stream.check(path) {
            self.stream.advance();
        }
        if self.stream.eat_keyword(Keyword::As) {
            while self.stream.check(path) {
                self.stream.advance();
            }
        }
        if !self.stream.check(TokenKind::SEMI) {
            let text = self.stream.peek().map_or("EOF", |t| t.text);
            return self.error_recover(
                line,
                format!("using statement: Unexpected token '{text}',expecting ';'"),
            );
        }
        self.namespace_notice(line)
    }
}

#[cfg(test)]
mod tests {
    use aerscript_core::Severity;

    use crate::bytecode::{Opcode, Operand};
    use crate::func::{DataType, TypeSpec};
    use crate::stmt::test_support::script;

    fn messages(out: &crate::expr::test_support::Output) -> Vec<String> {
        out.diagnostics.iter().map(|d| d.message.clone()).collect()
    }

    #[test]
    fn const_compiles_its_own_container() {
        let out = script("const LIMIT = 10 * 2;");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert!(out.code.is_empty());
        let constant = out.program.named_constant("LIMIT").unwrap();
        let ops: Vec<_> = constant.code.iter().map(|i| i.op).collect();
        assert_eq!(ops, vec![Opcode::Loadc, Opcode::Loadc, Opcode::Mul, Opcode::Done]);
        let done = constant.code.peek().unwrap();
        assert_eq!((done.p1, done.p2), (1, 1));
    }

    #[test]
    fn const_redefinition_replaces() {
        let out = script("const A = 1; const A = 'x';");
        assert_eq!(out.program.named_constants.len(), 1);
    }

    #[test]
    fn const_errors() {
        let cases = [
            ("const = 1;", "const: Invalid constant name"),
            ("const TRUE = 1;", "const: Cannot redeclare a reserved constant 'TRUE'"),
            ("const null = 1;", "const: Cannot redeclare a reserved constant 'null'"),
            ("const A 1;", "const: Expected '=' after constant name"),
        ];
        for (src, expected) in cases {
            let out = script(src);
            assert_eq!(messages(&out), vec![expected], "{src}");
            assert!(out.program.named_constants.is_empty());
        }
    }

    #[test]
    fn typed_declarations() {
        let out = script("int $a, $b = 2; string[] $names;");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(
            out.ops(),
            vec![
                Opcode::Declare,
                Opcode::Declare,
                Opcode::Loadc,
                Opcode::Store,
                Opcode::Pop,
                Opcode::Declare
            ]
        );
        let first = out.code.get(0).unwrap();
        assert_eq!(first.p2, DataType::Int.code());
        assert_eq!(first.p3, Operand::Name("a".into()));
        assert_eq!(
            out.code.peek().unwrap().p2,
            TypeSpec::builtin(DataType::String).with_hashmap(true).code()
        );
    }

    #[test]
    fn declaration_errors() {
        let out = script("int 5;");
        assert_eq!(messages(&out), vec!["Unexpected '5', expecting variable"]);
        let out = script("int $a $b;");
        assert_eq!(messages(&out), vec!["Unexpected token '$'"]);
        let out = script("static $a;");
        assert_eq!(messages(&out), vec!["Unknown data type name '$'"]);
    }

    #[test]
    fn statics_collect_on_the_function() {
        let out = script("function counter() { static int $n = 0, $m; $n++; }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let func = out.program.function("counter").unwrap();
        assert_eq!(func.statics.len(), 2);
        assert_eq!(func.statics[0].name, "n");
        let init: Vec<_> = func.statics[0].init.iter().map(|i| i.op).collect();
        assert_eq!(init, vec![Opcode::Loadc, Opcode::Done]);
        assert!(func.statics[1].init.is_empty());
        assert!(!func.code.iter().any(|i| i.op == Opcode::Declare));
    }

    #[test]
    fn static_outside_a_function() {
        let out = script("static int $n = 0;");
        assert_eq!(
            messages(&out),
            vec!["Static variable 'n' can only be declared inside a function"]
        );
    }

    #[test]
    fn namespace_body_is_global_scope() {
        let out = script("namespace app\\models { class User {} $x = 1; } $y = 2;");
        let notices: Vec<_> = out
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Notice)
            .collect();
        assert_eq!(notices.len(), 1);
        assert!(out.program.class("User").is_some());
        // `$x = 1` is rejected inside the namespace, `$y = 2` compiles.
        assert_eq!(out.diagnostics.len(), 2);
        assert_eq!(out.ops(), vec![Opcode::Loadc, Opcode::Store, Opcode::Pop]);
    }

    #[test]
    fn namespace_errors() {
        let out = script("namespace app;");
        assert_eq!(
            messages(&out),
            vec!["Namespace: Unexpected token ';',expecting '{'"]
        );
        let out = script("namespace app {");
        assert_eq!(
            messages(&out),
            vec!["Namespace: Missing '}' after namespace definition"]
        );
    }

    #[test]
    fn using_is_ignored() {
        let out = script("using app\\models\\User as U; $a = 1;");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].severity, Severity::Notice);
        assert_eq!(out.ops(), vec![Opcode::Loadc, Opcode::Store, Opcode::Pop]);

        let bad = script("using app 1;");
        assert_eq!(
            messages(&bad),
            vec!["using statement: Unexpected token '1',expecting ';'"]
        );
    }
}
