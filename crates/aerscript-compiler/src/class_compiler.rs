//! Class and interface declarations.
//!
//! A class body is compiled inside a `CLASS` block so method bodies can
//! resolve `self` and `parent`. Any malformed member abandons the whole
//! declaration: nothing is installed and compilation resumes after the
//! closing brace. A well-formed declaration is installed in the program
//! and, when it names a base class or interfaces, followed by a
//! `CLASS_INIT`/`INTERFACE_INIT` instruction carrying its [`ClassLink`].

use aerscript_parser::{Keyword, Token, TokenKind};

use crate::block::{BlockData, BlockKind};
use crate::bytecode::{Opcode, Operand};
use crate::class::{
    ClassAttr, ClassDesc, ClassFlags, ClassLink, ClassMethod, MemberFlags, Visibility,
};
use crate::codegen::{CodeGen, Result};
use crate::expr::ExprFlags;
use crate::func::{DataType, FuncFlags, FunctionDesc, TypeSpec};

const RESERVED_CONSTANTS: [&str; 3] = ["null", "true", "false"];

fn visibility_of(kw: Keyword) -> Option<Visibility> {
    match kw {
        Keyword::Public => Some(Visibility::Public),
        Keyword::Protected => Some(Visibility::Protected),
        Keyword::Private => Some(Visibility::Private),
        _ => None,
    }
}

fn text_of(tok: Option<Token<'_>>) -> &str {
    tok.map_or("EOF", |t| t.text)
}

/// Whether a member compiled cleanly; `Abandon` drops the declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Member {
    Done,
    Abandon,
}

impl<'src> CodeGen<'src, '_> {
    /// `class Name [extends Base] [implements I1, I2] { members }`
    ///
    /// The cursor is on the `class` keyword; a leading `virtual` or `final`
    /// has already been consumed into `flags`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn compile_class(&mut self, flags: ClassFlags) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        let Some(name) = self.stream.peek().filter(|t| t.is(TokenKind::ID)).map(|t| t.text) else {
            self.error(line, "Invalid class name")?;
            self.skip_declaration();
            return Ok(());
        };
        self.stream.advance();

        let mut link = ClassLink {
            name: name.to_owned(),
            line,
            ..ClassLink::default()
        };
        if self.stream.eat_keyword(Keyword::Extends) {
            let Some(bases) = self.name_list() else {
                self.error(
                    line,
                    format!("Expected 'class_name' after 'extends' keyword inside class '{name}'"),
                )?;
                self.skip_declaration();
                return Ok(());
            };
            link.extends = bases;
        }
        if self.stream.eat_keyword(Keyword::Implements) {
            let Some(interfaces) = self.name_list() else {
                self.error(
                    line,
                    format!(
                        "Expected 'interface_name' after 'implements' keyword inside class '{name}' declaration"
                    ),
                )?;
                self.skip_declaration();
                return Ok(());
            };
            link.implements = interfaces;
        }

        let missing_open = format!("Expected opening braces '{{' after class '{name}' declaration");
        let missing_close = format!("Missing closing braces '}}' after class '{name}' definition");
        let Some(close) = self.class_body(line, &missing_open, &missing_close)? else {
            return Ok(());
        };
        let open = self.stream.pos();

        let mut class = ClassDesc::new(name, flags, line);
        self.blocks.enter(
            BlockKind::CLASS,
            self.emitter.len(),
            BlockData::Class(name.to_owned()),
        );
        let result = self.with_span(open + 1, close, |cg| cg.compile_class_members(&mut class));
        self.blocks.leave();
        self.stream.set_pos(close + 1);
        if result? == Member::Abandon {
            return Ok(());
        }

        tracing::trace!(class = name, members = class.attrs.len() + class.methods.len(), "class compiled");
        if self.program.install_class(class).is_err() {
            return self.error(line, format!("Class '{name}' is already declared"));
        }
        if !link.extends.is_empty() || !link.implements.is_empty() {
            let p1 = i32::from(!link.extends.is_empty());
            let p2 = u32::from(!link.implements.is_empty());
            let id = self.program.add_class_link(link);
            self.emitter.set_line(line);
            self.emitter
                .emit(Opcode::ClassInit, p1, p2, Operand::ClassLink(id));
        }
        Ok(())
    }

    /// `interface Name [extends I1, I2] { signatures and constants }`
    pub(crate) fn compile_interface(&mut self) -> Result<()> {
        let line = self.line();
        self.stream.advance();
        let Some(name) = self.stream.peek().filter(|t| t.is(TokenKind::ID)).map(|t| t.text) else {
            self.error(line, "Invalid interface name")?;
            self.skip_declaration();
            return Ok(());
        };
        self.stream.advance();

        let mut link = ClassLink {
            name: name.to_owned(),
            line,
            ..ClassLink::default()
        };
        if self.stream.eat_keyword(Keyword::Extends) {
            let Some(bases) = self.name_list() else {
                self.error(
                    line,
                    format!("Expected 'interface_name' after 'extends' keyword inside interface '{name}'"),
                )?;
                self.skip_declaration();
                return Ok(());
            };
            link.extends = bases;
        }

        let missing_open = format!("Expected '{{' after interface '{name}' definition");
        let missing_close = format!("Missing '}}' after interface '{name}' definition");
        let Some(close) = self.class_body(line, &missing_open, &missing_close)? else {
            return Ok(());
        };
        let open = self.stream.pos();

        let mut class = ClassDesc::new(name, ClassFlags::INTERFACE, line);
        let result = self.with_span(open + 1, close, |cg| cg.compile_interface_members(&mut class));
        self.stream.set_pos(close + 1);
        if result? == Member::Abandon {
            return Ok(());
        }

        if self.program.install_class(class).is_err() {
            return self.error(line, format!("Interface '{name}' is already declared"));
        }
        if !link.extends.is_empty() {
            let id = self.program.add_class_link(link);
            self.emitter.set_line(line);
            self.emitter
                .emit(Opcode::InterfaceInit, 1, 0, Operand::ClassLink(id));
        }
        Ok(())
    }

    /// `Name [, Name]*`; `None` when a name is missing.
    fn name_list(&mut self) -> Option<Vec<String>> {
        let mut names = Vec::new();
        loop {
            let tok = self.stream.peek().filter(|t| t.is(TokenKind::ID))?;
            names.push(tok.text.to_owned());
            self.stream.advance();
            if !self.stream.eat(TokenKind::COMMA) {
                return Some(names);
            }
        }
    }

    /// Locate the braced body at the cursor and return the index of its
    /// closing brace. The cursor stays on the opening brace.
    fn class_body(&mut self, line: u32, missing_open: &str, missing_close: &str) -> Result<Option<usize>> {
        if !self.stream.check(TokenKind::OCB) {
            self.error(line, missing_open)?;
            self.skip_declaration();
            return Ok(None);
        }
        let open = self.stream.pos();
        let close = self
            .stream
            .delimit_nested(open + 1, TokenKind::OCB, TokenKind::CCB);
        if close >= self.stream.end() {
            self.error(line, missing_close)?;
            self.stream.skip_to_end();
            return Ok(None);
        }
        Ok(Some(close))
    }

    /// Member keyword at the cursor, reporting `message` when the cursor is
    /// on anything else.
    fn member_keyword(&mut self, message: impl FnOnce(&str) -> String) -> Result<Option<Keyword>> {
        match self.stream.peek() {
            Some(tok) if tok.is(TokenKind::KEYWORD) => Ok(tok.keyword()),
            tok => {
                let line = tok.map_or_else(|| self.line(), |t| t.line);
                self.error(line, message(text_of(tok)))?;
                Ok(None)
            }
        }
    }

    /// Member type at the cursor, with its optional `[]` suffix.
    fn member_type(&mut self) -> Option<TypeSpec> {
        let ty = self
            .stream
            .peek()
            .and_then(|t| t.keyword())
            .and_then(DataType::from_keyword)?;
        self.stream.advance();
        let hashmap = self.eat_array_suffix();
        Some(TypeSpec::builtin(ty).with_hashmap(hashmap))
    }

    fn compile_class_members(&mut self, class: &mut ClassDesc) -> Result<Member> {
        let cname = class.name.clone();
        loop {
            self.skip_semis();
            if self.stream.is_eof() {
                return Ok(Member::Done);
            }
            let unexpected = |x: &str| {
                format!("Unexpected token '{x}'. Expecting attribute or method declaration inside class '{cname}'")
            };
            let Some(mut kw) = self.member_keyword(unexpected)? else {
                return Ok(Member::Abandon);
            };
            let mut visibility = Visibility::Public;
            let mut flags = MemberFlags::empty();
            if let Some(v) = visibility_of(kw) {
                visibility = v;
                self.stream.advance();
                let Some(next) = self.member_keyword(unexpected)? else {
                    return Ok(Member::Abandon);
                };
                kw = next;
            }

            match kw {
                Keyword::Const => {
                    if self.compile_class_constant(class, visibility)? == Member::Abandon {
                        return Ok(Member::Abandon);
                    }
                    continue;
                }
                Keyword::Static => {
                    flags |= MemberFlags::STATIC;
                    self.stream.advance();
                    let Some(next) = self.member_keyword(|x| {
                        format!("Unexpected token '{x}',Expecting attribute or method declaration inside class '{cname}'")
                    })?
                    else {
                        return Ok(Member::Abandon);
                    };
                    if let Some(v) = visibility_of(next) {
                        visibility = v;
                        self.stream.advance();
                    }
                }
                Keyword::Virtual | Keyword::Final => {
                    let (flag, word) = if kw == Keyword::Virtual {
                        (MemberFlags::VIRTUAL, "virtual")
                    } else {
                        (MemberFlags::FINAL, "final")
                    };
                    flags |= flag;
                    self.stream.advance();
                    if let Some(v) = self.stream.peek().and_then(|t| t.keyword()).and_then(visibility_of) {
                        visibility = v;
                        self.stream.advance();
                    }
                    if self.stream.eat_keyword(Keyword::Static) {
                        flags |= MemberFlags::STATIC;
                    }
                    let is_method = self.stream.peek().is_some_and(|t| {
                        t.is(TokenKind::KEYWORD)
                            && (t.is_typedef()
                                || self.stream.peek_nth(2).is_some_and(|p| p.is(TokenKind::LPAREN)))
                    });
                    if !is_method {
                        let tok = self.stream.peek();
                        self.error(
                            tok.map_or(class.line, |t| t.line),
                            format!(
                                "Unexpected token '{}', expecting method declaration after '{word}' keyword inside class '{cname}'",
                                text_of(tok)
                            ),
                        )?;
                        return Ok(Member::Abandon);
                    }
                }
                _ => {}
            }

            let Some(ty) = self.member_type() else {
                let tok = self.stream.peek();
                self.error(
                    tok.map_or(class.line, |t| t.line),
                    format!(
                        "Unexpected token '{}', expecting data type for attribute or method declaration inside class '{cname}'",
                        text_of(tok)
                    ),
                )?;
                return Ok(Member::Abandon);
            };
            let member = if self.stream.check(TokenKind::DOLLAR) {
                self.compile_class_attr(class, ty, visibility, flags)?
            } else {
                self.compile_class_method(class, ty, visibility, flags, true)?
            };
            if member == Member::Abandon {
                return Ok(Member::Abandon);
            }
        }
    }

    fn compile_interface_members(&mut self, class: &mut ClassDesc) -> Result<Member> {
        let cname = class.name.clone();
        loop {
            self.skip_semis();
            if self.stream.is_eof() {
                return Ok(Member::Done);
            }
            let Some(mut kw) = self.member_keyword(|x| {
                format!("Unexpected token '{x}'. Expecting method signature or constant declaration inside interface '{cname}'")
            })?
            else {
                return Ok(Member::Abandon);
            };
            let expecting_signature = |_: &str| format!("Expecting method signature inside interface '{cname}'");
            if matches!(kw, Keyword::Private | Keyword::Protected) {
                self.warning(self.line(), "interface: Access type must be public")?;
                kw = Keyword::Public;
            }
            if kw == Keyword::Public {
                self.stream.advance();
                let Some(next) = self.member_keyword(expecting_signature)? else {
                    return Ok(Member::Abandon);
                };
                kw = next;
            }
            if kw == Keyword::Const {
                if self.compile_class_constant(class, Visibility::Public)? == Member::Abandon {
                    return Ok(Member::Abandon);
                }
                continue;
            }

            let mut flags = MemberFlags::empty();
            if kw == Keyword::Static {
                flags |= MemberFlags::STATIC;
                self.stream.advance();
                let Some(next) = self.member_keyword(expecting_signature)? else {
                    return Ok(Member::Abandon);
                };
                if let Some(v) = visibility_of(next) {
                    if v != Visibility::Public {
                        self.warning(self.line(), "interface: Access type must be public")?;
                    }
                    self.stream.advance();
                }
            }

            let Some(ty) = self.member_type() else {
                let tok = self.stream.peek();
                self.error(
                    tok.map_or(class.line, |t| t.line),
                    format!(
                        "Unexpected token '{}', expecting data type for method signature inside interface '{cname}'",
                        text_of(tok)
                    ),
                )?;
                return Ok(Member::Abandon);
            };
            if self.stream.check(TokenKind::DOLLAR) {
                self.error_recover(
                    self.line(),
                    format!("Attributes cannot be declared inside interface '{cname}'"),
                )?;
                continue;
            }
            if self.compile_class_method(class, ty, Visibility::Public, flags, false)? == Member::Abandon {
                return Ok(Member::Abandon);
            }
        }
    }

    /// `const NAME = expr [, NAME = expr]*;` with the cursor on `const`.
    fn compile_class_constant(&mut self, class: &mut ClassDesc, visibility: Visibility) -> Result<Member> {
        self.stream.advance();
        loop {
            let line = self.line();
            let Some(name) = self.stream.peek().filter(|t| t.is(TokenKind::ID)).map(|t| t.text) else {
                let text = text_of(self.stream.peek());
                self.error(line, format!("Invalid constant name '{text}' in class '{}'", class.name))?;
                self.recover();
                return Ok(Member::Abandon);
            };
            if RESERVED_CONSTANTS
                .iter()
                .any(|reserved| reserved.eq_ignore_ascii_case(name))
            {
                self.error(line, format!("Cannot redeclare a reserved constant '{name}'"))?;
                self.recover();
                return Ok(Member::Abandon);
            }
            self.stream.advance();
            if !self.stream.eat(TokenKind::EQUAL) {
                self.error(line, format!("Expected '=' after class constant '{name}'"))?;
                self.recover();
                return Ok(Member::Abandon);
            }
            let (init, status) = self.compile_sub_program(ExprFlags::COMMA_STATEMENT)?;
            if status.is_empty() {
                self.error(line, format!("Empty constant '{name}' value"))?;
            }
            class.attrs.push(ClassAttr {
                name: name.to_owned(),
                ty: None,
                visibility,
                flags: MemberFlags::CONSTANT,
                init: Some(init),
                line,
            });
            if !self.stream.eat(TokenKind::COMMA) {
                return Ok(Member::Done);
            }
            if !self.stream.check(TokenKind::ID) {
                let text = text_of(self.stream.peek());
                self.error_recover(
                    line,
                    format!(
                        "Unexpected token '{text}',expecting constant declaration inside class '{}'",
                        class.name
                    ),
                )?;
                return Ok(Member::Done);
            }
        }
    }

    /// `$name [= expr] [, $name [= expr]]*;` with the cursor on the first `$`.
    fn compile_class_attr(
        &mut self,
        class: &mut ClassDesc,
        ty: TypeSpec,
        visibility: Visibility,
        flags: MemberFlags,
    ) -> Result<Member> {
        loop {
            let line = self.line();
            self.stream.advance();
            let Some(name) = self
                .stream
                .peek()
                .filter(|t| t.is(TokenKind::ID | TokenKind::KEYWORD))
                .map(|t| t.text)
            else {
                let text = text_of(self.stream.peek());
                self.error(line, format!("Invalid attribute name '{text}' in class '{}'", class.name))?;
                self.recover();
                return Ok(Member::Abandon);
            };
            self.stream.advance();
            if !self.stream.is_eof()
                && !self.stream.check(TokenKind::EQUAL | TokenKind::SEMI | TokenKind::COMMA)
            {
                self.error(line, format!("Expected '=' or ';' after attribute name '{name}'"))?;
                self.recover();
                return Ok(Member::Abandon);
            }
            let mut init = None;
            if self.stream.eat(TokenKind::EQUAL) {
                let (code, status) = self.compile_sub_program(ExprFlags::COMMA_STATEMENT)?;
                if status.is_empty() {
                    self.error(line, format!("Attribute '{name}': Missing default value"))?;
                }
                init = Some(code);
            }
            class.attrs.push(ClassAttr {
                name: name.to_owned(),
                ty: Some(ty.clone()),
                visibility,
                flags,
                init,
                line,
            });
            if !self.stream.eat(TokenKind::COMMA) {
                return Ok(Member::Done);
            }
            if !self.stream.check(TokenKind::DOLLAR) {
                let text = text_of(self.stream.peek());
                self.error_recover(
                    line,
                    format!(
                        "Unexpected token '{text}',expecting attribute declaration inside class '{}'",
                        class.name
                    ),
                )?;
                return Ok(Member::Done);
            }
        }
    }

    /// `[&] name (args) { body }`, or `;` in place of the body for virtual
    /// and interface methods.
    fn compile_class_method(
        &mut self,
        class: &mut ClassDesc,
        ty: TypeSpec,
        visibility: Visibility,
        flags: MemberFlags,
        mut with_body: bool,
    ) -> Result<Member> {
        let line = self.line();
        let mut func_flags = FuncFlags::CLASS_METHOD;
        if self.stream.eat(TokenKind::AMPER) {
            func_flags |= FuncFlags::RETURN_REF;
        }
        let cname = class.name.clone();
        let Some(name) = self.stream.peek().filter(|t| t.is(TokenKind::ID)).map(|t| t.text) else {
            let text = text_of(self.stream.peek());
            self.error(line, format!("Invalid method name '{text}' in class '{cname}'"))?;
            self.recover();
            return Ok(Member::Abandon);
        };
        self.stream.advance();

        if flags.contains(MemberFlags::VIRTUAL) {
            if visibility == Visibility::Private {
                self.error(
                    line,
                    format!("Virtual method '{cname}::{name}()' cannot be declared private"),
                )?;
            }
            if !class.flags.contains(ClassFlags::VIRTUAL) {
                self.error(
                    line,
                    format!(
                        "Class '{cname}' contains virtual method and must therefore be declared virtual or implement the remaining method '{cname}::{name}()'"
                    ),
                )?;
            }
            with_body = false;
        }

        let Some((open, close)) = self.method_parens(line, &cname, name)? else {
            return Ok(Member::Abandon);
        };
        let mut func = FunctionDesc::new(name, ty, line);
        func.flags |= func_flags;
        self.compile_signature(&mut func, open, close)?;
        self.stream.set_pos(close + 1);

        if with_body {
            if !self.stream.check(TokenKind::OCB) {
                self.error(line, format!("Non-virtual method '{cname}::{name}()' must contain body"))?;
                return Ok(Member::Abandon);
            }
            self.compile_func_body(&mut func)?;
        } else if !self.stream.is_eof() && !self.stream.check(TokenKind::SEMI) {
            self.error(line, format!("Interface method '{cname}::{name}()' cannot contain body"))?;
            return Ok(Member::Abandon);
        }
        class.methods.push(ClassMethod {
            func,
            visibility,
            flags,
        });
        Ok(Member::Done)
    }

    fn method_parens(&mut self, line: u32, class: &str, name: &str) -> Result<Option<(usize, usize)>> {
        if !self.stream.check(TokenKind::LPAREN) {
            self.error(line, format!("Expected '(' after method name '{class}::{name}()'"))?;
            self.recover();
            return Ok(None);
        }
        let open = self.stream.pos();
        let close = self
            .stream
            .delimit_nested(open + 1, TokenKind::LPAREN, TokenKind::RPAREN);
        if close >= self.stream.end() {
            self.error(line, format!("Missing ')' after method '{class}::{name}()' declaration"))?;
            self.stream.skip_to_end();
            return Ok(None);
        }
        Ok(Some((open, close)))
    }
}

#[cfg(test)]
mod tests {
    use aerscript_core::Severity;

    use crate::bytecode::{Opcode, Operand};
    use crate::class::{ClassFlags, MemberFlags, Visibility};
    use crate::expr::test_support::Output;
    use crate::func::{DataType, FuncFlags, TypeSpec};
    use crate::stmt::test_support::script;

    fn messages(out: &Output) -> Vec<String> {
        out.diagnostics.iter().map(|d| d.message.clone()).collect()
    }

    #[test]
    fn members_are_collected() {
        let out = script(
            "class Point {
                const ORIGIN = 0, UNIT = 1;
                public int $x = 0, $y;
                private static string[] $names;
                protected float scale(float $by) { return $this->x * $by; }
                public static void reset() { }
            }",
        );
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let class = out.program.class("Point").unwrap();
        assert_eq!(class.constants().count(), 2);

        let x = class.attr("x").unwrap();
        assert_eq!(x.ty, Some(TypeSpec::builtin(DataType::Int)));
        assert!(x.init.is_some());
        assert!(class.attr("y").unwrap().init.is_none());

        let names = class.attr("names").unwrap();
        assert_eq!(names.visibility, Visibility::Private);
        assert!(names.flags.contains(MemberFlags::STATIC));
        assert_eq!(names.ty, Some(TypeSpec::builtin(DataType::String).with_hashmap(true)));

        let scale = class.method("scale").unwrap();
        assert_eq!(scale.visibility, Visibility::Protected);
        assert!(scale.func.flags.contains(FuncFlags::CLASS_METHOD));
        assert_eq!(scale.func.args.len(), 1);
        assert!(scale.has_body());
        assert!(class.method("reset").unwrap().flags.contains(MemberFlags::STATIC));

        // Nothing to link, so nothing is emitted.
        assert!(out.code.is_empty());
    }

    #[test]
    fn inheritance_emits_class_init() {
        let out = script("class B extends A implements I, J { }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(out.ops(), vec![Opcode::ClassInit]);
        let init = out.code.get(0).unwrap();
        assert_eq!((init.p1, init.p2), (1, 1));
        assert_eq!(init.p3, Operand::ClassLink(0));
        let link = &out.program.class_links[0];
        assert_eq!(link.extends, vec!["A"]);
        assert_eq!(link.implements, vec!["I", "J"]);
    }

    #[test]
    fn method_bodies_know_their_class() {
        let out = script("class C { void f() { $g = function() { }; } }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let f = &out.program.class("C").unwrap().method("f").unwrap().func;
        assert_eq!(f.code.peek().unwrap().op, Opcode::Done);
    }

    #[test]
    fn virtual_methods_have_no_body() {
        let out = script("virtual class Shape { virtual public float area(); }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let class = out.program.class("Shape").unwrap();
        assert!(class.flags.contains(ClassFlags::VIRTUAL));
        let area = class.method("area").unwrap();
        assert!(area.flags.contains(MemberFlags::VIRTUAL));
        assert!(!area.has_body());
    }

    #[test]
    fn virtual_method_rules() {
        let out = script("class Shape { virtual private float area(); }");
        assert_eq!(
            messages(&out),
            vec![
                "Virtual method 'Shape::area()' cannot be declared private",
                "Class 'Shape' contains virtual method and must therefore be declared virtual or implement the remaining method 'Shape::area()'",
            ]
        );
    }

    #[test]
    fn interface_signatures() {
        let out = script(
            "interface Drawable extends Base { const LAYER = 1; private void draw(int $x); static int count(); }",
        );
        assert_eq!(messages(&out), vec!["interface: Access type must be public"]);
        assert_eq!(out.diagnostics[0].severity, Severity::Warning);
        let class = out.program.class("Drawable").unwrap();
        assert!(class.is_interface());
        let draw = class.method("draw").unwrap();
        assert_eq!(draw.visibility, Visibility::Public);
        assert!(!draw.has_body());
        assert_eq!(class.constants().count(), 1);
        assert_eq!(out.ops(), vec![Opcode::InterfaceInit]);
        assert_eq!(out.program.class_links[0].extends, vec!["Base"]);
    }

    #[test]
    fn interface_rejects_attributes_and_bodies() {
        let out = script("interface I { int $x; }");
        assert_eq!(messages(&out), vec!["Attributes cannot be declared inside interface 'I'"]);
        assert!(out.program.class("I").is_some());

        let out = script("interface I { void f() { } }");
        assert_eq!(messages(&out), vec!["Interface method 'I::f()' cannot contain body"]);
        assert!(out.program.class("I").is_none());
    }

    #[test]
    fn malformed_class_headers() {
        let cases = [
            ("class { }", "Invalid class name"),
            ("class A extends { }", "Expected 'class_name' after 'extends' keyword inside class 'A'"),
            (
                "class A implements { }",
                "Expected 'interface_name' after 'implements' keyword inside class 'A' declaration",
            ),
            ("class A;", "Expected opening braces '{' after class 'A' declaration"),
            ("class A { int $x;", "Missing closing braces '}' after class 'A' definition"),
            ("interface { }", "Invalid interface name"),
            ("interface I;", "Expected '{' after interface 'I' definition"),
        ];
        for (src, expected) in cases {
            let out = script(src);
            assert_eq!(messages(&out), vec![expected], "{src}");
            assert!(out.program.classes().is_empty(), "{src}");
        }
    }

    #[test]
    fn malformed_members_abandon_the_class() {
        let cases = [
            ("class A { $x; }", "Unexpected token '$'. Expecting attribute or method declaration inside class 'A'"),
            ("class A { int 5; }", "Invalid method name '5' in class 'A'"),
            ("class A { foo $x; }", "Unexpected token 'foo'. Expecting attribute or method declaration inside class 'A'"),
            ("class A { public mixed $x 1; }", "Expected '=' or ';' after attribute name 'x'"),
            ("class A { const true = 1; }", "Cannot redeclare a reserved constant 'true'"),
            ("class A { const X; }", "Expected '=' after class constant 'X'"),
            ("class A { void f; }", "Expected '(' after method name 'A::f()'"),
            ("class A { void f(); }", "Non-virtual method 'A::f()' must contain body"),
            ("class A { static $x; }", "Unexpected token '$',Expecting attribute or method declaration inside class 'A'"),
        ];
        for (src, expected) in cases {
            let out = script(src);
            assert_eq!(messages(&out), vec![expected], "{src}");
            assert!(out.program.class("A").is_none(), "{src}");
        }
    }

    #[test]
    fn compilation_resumes_after_an_abandoned_class() {
        let out = script("class A { $x; } $b = 1;");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.ops(), vec![Opcode::Loadc, Opcode::Store, Opcode::Pop]);
    }

    #[test]
    fn duplicate_class() {
        let out = script("class A { } class A { }");
        assert_eq!(messages(&out), vec!["Class 'A' is already declared"]);
    }

    #[test]
    fn final_class() {
        let out = script("final class A { final public void f() { } }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let class = out.program.class("A").unwrap();
        assert!(class.flags.contains(ClassFlags::FINAL));
        assert!(class.method("f").unwrap().flags.contains(MemberFlags::FINAL));
    }
}
