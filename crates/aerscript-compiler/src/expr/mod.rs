//! Expression compilation.
//!
//! [`CodeGen::compile_expr`] delimits an expression at the cursor, asks the
//! parser's tree builder for its tree and walks it depth-first, emitting one
//! instruction per operator after its operands. Leaves are compiled by the
//! leaf compilers in the sibling modules, each run over the leaf's own token
//! range.
//!
//! A few operators rewrite what their operands emitted:
//!
//! ```text
//! $a = 1        LOADC 1; LOAD $a; STORE      ->  LOADC 1; STORE $a
//! $a[0] = 1     LOADC 1; LOAD $a; LOADC 0; LOAD_IDX 1 1; STORE
//!                                            ->  ...; STORE_IDX 1
//! new Foo(1)    LOADC 1; LOADC Foo; CALL 1; NEW   ->  ...; LOADC Foo; NEW 1
//! ```

mod closure;
mod collections;
mod literals;
mod strings;
mod validate;
mod variable;

use aerscript_parser::expr::{CastType, NodeFlags, build_tree};
use aerscript_parser::{ExprNode, ExprOp, LeafKind};
use bitflags::bitflags;
use bumpalo::Bump;

pub(crate) use validate::TreeCheck;

use crate::bytecode::{Opcode, Operand};
use crate::codegen::{CodeGen, Result};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct ExprFlags: u8 {
        /// Loads feed a read-only consumer (call arguments, array entries).
        const RDONLY_LOAD     = 0x01;
        /// The subscript being compiled is a store target.
        const LOAD_IDX_STORE  = 0x02;
        /// Stop at the first top-level comma.
        const COMMA_STATEMENT = 0x04;
    }
}

/// Outcome of compiling an expression that did not abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExprStatus {
    /// Code was emitted; the value is on the stack.
    Emitted,
    /// Nothing to compile, or the expression was rejected.
    Empty,
}

impl ExprStatus {
    #[inline]
    pub(crate) fn is_empty(self) -> bool {
        self == ExprStatus::Empty
    }
}

/// Instruction emitted for an operator node, `None` for operators that only
/// sequence their operands.
fn opcode_for(op: ExprOp) -> Option<Opcode> {
    use ExprOp::*;
    Some(match op {
        New => Opcode::New,
        Clone => Opcode::Clone,
        Arrow | DoubleColon => Opcode::Member,
        Subscript => Opcode::LoadIdx,
        Call => Opcode::Call,
        Incr => Opcode::Incr,
        Decr => Opcode::Decr,
        BitNot => Opcode::Bitnot,
        Neg => Opcode::Uminus,
        Plus => Opcode::Uplus,
        Cast(ty) => match ty {
            CastType::Int => Opcode::CvtInt,
            CastType::Float => Opcode::CvtReal,
            CastType::Bool => Opcode::CvtBool,
            CastType::String => Opcode::CvtStr,
            CastType::Char => Opcode::CvtChar,
            CastType::Object => Opcode::CvtObj,
            CastType::Callback => Opcode::CvtCall,
            CastType::Resource => Opcode::CvtRes,
            CastType::Void => Opcode::CvtVoid,
        },
        Is => Opcode::Is,
        LogNot => Opcode::Lnot,
        Mul => Opcode::Mul,
        Div => Opcode::Div,
        Mod => Opcode::Mod,
        Add => Opcode::Add,
        Sub => Opcode::Sub,
        Shl => Opcode::Shl,
        Shr => Opcode::Shr,
        Lt => Opcode::Lt,
        Le => Opcode::Le,
        Gt => Opcode::Gt,
        Ge => Opcode::Ge,
        Eq => Opcode::Eq,
        Ne => Opcode::Neq,
        BitAnd => Opcode::Band,
        Ref => Opcode::LoadRef,
        BitXor => Opcode::Bxor,
        BitOr => Opcode::Bor,
        LogAnd => Opcode::Land,
        LogOr => Opcode::Lor,
        LogXor => Opcode::Lxor,
        NullCoalesce => Opcode::Nullc,
        Assign => Opcode::Store,
        AddAssign => Opcode::AddStore,
        SubAssign => Opcode::SubStore,
        MulAssign => Opcode::MulStore,
        DivAssign => Opcode::DivStore,
        ModAssign => Opcode::ModStore,
        AndAssign => Opcode::BandStore,
        OrAssign => Opcode::BorStore,
        XorAssign => Opcode::BxorStore,
        ShlAssign => Opcode::ShlStore,
        ShrAssign => Opcode::ShrStore,
        Ternary | Comma => return None,
    })
}

impl<'src, 's> CodeGen<'src, 's> {
    /// Compile the expression at the cursor.
    ///
    /// The expression runs to the next `;` outside braces, or to the next
    /// top-level comma with [`ExprFlags::COMMA_STATEMENT`]. The cursor is
    /// left on that terminator. A tree the builder rejects is reported and
    /// treated as empty.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn compile_expr(
        &mut self,
        flags: ExprFlags,
        check: Option<TreeCheck>,
    ) -> Result<ExprStatus> {
        let start = self.stream.pos();
        let end = self
            .stream
            .expr_end(start, flags.contains(ExprFlags::COMMA_STATEMENT));
        if end <= start {
            return Ok(ExprStatus::Empty);
        }
        let arena = Bump::new();
        let tree = build_tree(self.stream.tokens(), start..end, &arena);
        let status = match tree {
            Err(err) => {
                self.error(err.line, err.message)?;
                ExprStatus::Empty
            }
            Ok(None) => ExprStatus::Empty,
            Ok(Some(root)) => {
                if let Some(check) = check {
                    self.check_tree(check, root)?;
                }
                self.with_span(start, end, |cg| cg.emit_expr_code(root, flags))?;
                ExprStatus::Emitted
            }
        };
        self.stream.set_pos(end);
        Ok(status)
    }

    /// Compile the whole current window as one expression.
    pub(crate) fn compile_window_expr(&mut self, flags: ExprFlags) -> Result<ExprStatus> {
        let status = self.compile_expr(flags, None)?;
        if !self.stream.is_eof() {
            // A `;` inside a delimited span.
            let line = self.line();
            self.error(line, "Syntax error: Unexpected token ';'")?;
            self.stream.skip_to_end();
        }
        Ok(status)
    }

    pub(crate) fn emit_expr_code(&mut self, node: &ExprNode<'_>, flags: ExprFlags) -> Result<()> {
        if let Some(leaf) = node.leaf {
            return self.with_span(node.start, node.end, |cg| cg.compile_leaf(leaf, flags));
        }
        let Some(op) = node.op else {
            return Err(aerscript_core::Abort::internal("expression node without operator"));
        };
        self.emitter.set_line(node.line);

        if op == ExprOp::Ternary {
            return self.emit_ternary(node, flags);
        }

        let mut flags = flags;
        let mut vm_op = opcode_for(op);
        let mut p1: i32 = 0;
        let mut p2: u32 = 0;
        let mut p3 = Operand::None;

        if let Some(left) = node.left {
            if op == ExprOp::Call {
                let arg_flags = (flags | ExprFlags::RDONLY_LOAD) - ExprFlags::LOAD_IDX_STORE;
                for arg in node.args {
                    self.emit_expr_code(arg, arg_flags)?;
                }
                p1 = node.args.len() as i32;
            }
            self.emit_expr_code(left, flags)?;
            match op {
                ExprOp::Call => {
                    if let Some(last) = self.emitter.peek_mut() {
                        match last.op {
                            // A callee name must not be expanded as a constant.
                            Opcode::Loadc => last.p1 = 0,
                            Opcode::Member | Opcode::New => last.p2 = 1,
                            _ => {}
                        }
                    }
                }
                ExprOp::Subscript => {
                    if let Some(index) = node.args.first() {
                        self.emit_expr_code(index, flags - ExprFlags::LOAD_IDX_STORE)?;
                        p1 = 1;
                    }
                    if flags.contains(ExprFlags::LOAD_IDX_STORE) {
                        // Create the entry when missing.
                        p2 = 1;
                    }
                }
                ExprOp::Comma => {
                    self.emitter.emit(Opcode::Pop, 1, 0, Operand::None);
                }
                _ => {}
            }
        }

        let mut short_circuit = None;
        if let Some(right) = node.right {
            match op {
                ExprOp::LogAnd => {
                    short_circuit = Some(self.emitter.emit_jump(Opcode::Jmpz, 1));
                }
                ExprOp::LogOr => {
                    short_circuit = Some(self.emitter.emit_jump(Opcode::Jmpnz, 1));
                }
                _ if op.is_assignment() => flags |= ExprFlags::LOAD_IDX_STORE,
                _ => {}
            }
            self.emit_expr_code(right, flags)?;
            if op == ExprOp::Assign {
                match self.emitter.peek().map(|i| i.op) {
                    Some(Opcode::Member) => p2 = 1,
                    Some(Opcode::LoadIdx) => {
                        if let Some(target) = self.emitter.pop() {
                            vm_op = Some(Opcode::StoreIdx);
                            p1 = target.p1;
                        }
                    }
                    Some(_) => {
                        if let Some(target) = self.emitter.pop() {
                            p3 = target.p3;
                        }
                    }
                    None => {}
                }
            }
        }

        let Some(vm_op) = vm_op else {
            return Ok(());
        };
        match vm_op {
            Opcode::Incr | Opcode::Decr => {
                if node.flags.contains(NodeFlags::PRE_INCR) {
                    p1 = 1;
                }
            }
            Opcode::New => {
                let is_call = self.emitter.peek().is_some_and(|i| i.op == Opcode::Call);
                let after_member = self.emitter.peek_prev().is_some_and(|i| i.op == Opcode::Member);
                if is_call && !after_member {
                    if let Some(call) = self.emitter.pop() {
                        p1 = call.p1;
                    }
                }
            }
            Opcode::Member if op == ExprOp::DoubleColon => {
                p1 = 1;
                if self.emitter.peek().is_some_and(|i| i.op == Opcode::Load) {
                    if let Some(load) = self.emitter.pop() {
                        p3 = load.p3;
                    }
                }
            }
            _ => {}
        }
        self.emitter.emit(vm_op, p1, p2, p3);
        if let Some(jump) = short_circuit {
            self.emitter.patch_here(jump);
        }
        Ok(())
    }

    /// ```text
    ///     <cond>
    ///     JMPZ else
    ///     <then>
    ///     JMP out
    /// else:
    ///     <else>
    /// out:
    /// ```
    fn emit_ternary(&mut self, node: &ExprNode<'_>, flags: ExprFlags) -> Result<()> {
        if let Some(cond) = node.cond {
            self.emit_expr_code(cond, flags)?;
        }
        let false_jump = self.emitter.emit_jump(Opcode::Jmpz, 0);
        if let Some(then) = node.left {
            self.emit_expr_code(then, flags)?;
        }
        let out_jump = self.emitter.emit_jump(Opcode::Jmp, 0);
        self.emitter.patch_here(false_jump);
        if let Some(otherwise) = node.right {
            self.emit_expr_code(otherwise, flags)?;
        }
        self.emitter.patch_here(out_jump);
        Ok(())
    }

    /// Dispatch a leaf to its compiler. The window is the leaf's tokens.
    fn compile_leaf(&mut self, leaf: LeafKind, flags: ExprFlags) -> Result<()> {
        match leaf {
            LeafKind::Number => self.compile_number(),
            LeafKind::SimpleString => self.compile_simple_string(),
            LeafKind::String => self.compile_string(),
            LeafKind::Variable => self.compile_variable(flags),
            LeafKind::Literal => self.compile_literal(),
            LeafKind::Array => self.compile_array(),
            LeafKind::List => self.compile_list(),
            LeafKind::Closure => self.compile_closure(),
            LeafKind::LangConstruct(kw) => self.compile_lang_construct(kw),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use aerscript_core::Diagnostic;
    use aerscript_parser::TokenStream;
    use aerscript_parser::lexer::tokenize;

    use crate::bytecode::{InstrList, Opcode};
    use crate::codegen::CodeGen;
    use crate::config::CompilerConfig;
    use crate::program::Program;
    use crate::reporter::Reporter;

    pub(crate) struct Output {
        pub(crate) code: InstrList,
        pub(crate) program: Program,
        pub(crate) diagnostics: Vec<Diagnostic>,
    }

    impl Output {
        pub(crate) fn ops(&self) -> Vec<Opcode> {
            self.code.iter().map(|i| i.op).collect()
        }

        /// Every patched jump, in the generated code and in every program
        /// container, lands inside its own container and not on itself.
        pub(crate) fn assert_jumps_in_bounds(&self) {
            let mut containers = self.program.containers();
            containers[0] = ("main".to_owned(), &self.code);
            for (name, code) in containers {
                for (idx, instr) in code.iter().enumerate() {
                    if instr.op.is_jump() {
                        assert!(instr.p2 <= code.len(), "{name}:{idx} {instr:?}");
                        assert_ne!(instr.p2 as usize, idx, "{name}:{idx} {instr:?}");
                    }
                }
            }
        }
    }

    /// Run `f` over a generator positioned at the start of `src`.
    pub(crate) fn run(src: &str, f: impl FnOnce(&mut CodeGen<'_, '_>)) -> Output {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let (code, program) = {
            let reporter = Reporter::new(&mut diagnostics, None, 15);
            let stream = TokenStream::new(tokenize(src, 1).0);
            let mut cg = CodeGen::new(CompilerConfig::default(), reporter, Program::default(), stream);
            f(&mut cg);
            (cg.emitter.finish(), cg.program)
        };
        Output {
            code,
            program,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::run;
    use super::*;

    fn expr(src: &str) -> super::test_support::Output {
        run(src, |cg| {
            cg.compile_expr(ExprFlags::empty(), None).unwrap();
        })
    }

    #[test]
    fn binary_operands_before_operator() {
        let out = expr("1 + 2 * 3");
        assert_eq!(
            out.ops(),
            vec![Opcode::Loadc, Opcode::Loadc, Opcode::Loadc, Opcode::Mul, Opcode::Add]
        );
    }

    #[test]
    fn plain_store_folds_target_name() {
        let out = expr("$a = 1");
        assert_eq!(out.ops(), vec![Opcode::Loadc, Opcode::Store]);
        assert_eq!(out.code.get(1).unwrap().p3, Operand::Name("a".into()));
    }

    #[test]
    fn subscript_store_becomes_store_idx() {
        let out = expr("$a[0] = 1");
        assert_eq!(
            out.ops(),
            vec![Opcode::Loadc, Opcode::Load, Opcode::Loadc, Opcode::StoreIdx]
        );
        assert_eq!(out.code.get(3).unwrap().p1, 1);
    }

    #[test]
    fn member_store_flags_p2() {
        let out = expr("$this->x = 5");
        let store = out.code.peek().unwrap();
        assert_eq!(store.op, Opcode::Store);
        assert_eq!(store.p2, 1);
    }

    #[test]
    fn call_counts_arguments_and_clears_constant_expansion() {
        let out = expr("f(1, 2)");
        assert_eq!(
            out.ops(),
            vec![Opcode::Loadc, Opcode::Loadc, Opcode::Loadc, Opcode::Call]
        );
        assert_eq!(out.code.get(2).unwrap().p1, 0);
        assert_eq!(out.code.get(3).unwrap().p1, 2);
    }

    #[test]
    fn method_call_flags_member() {
        let out = expr("$o->run(1)");
        let member = out.code.iter().find(|i| i.op == Opcode::Member).unwrap();
        assert_eq!(member.p2, 1);
    }

    #[test]
    fn new_absorbs_constructor_call() {
        let out = expr("new Foo(1, 2)");
        assert_eq!(out.code.peek().unwrap().op, Opcode::New);
        assert_eq!(out.code.peek().unwrap().p1, 2);
        assert!(!out.ops().contains(&Opcode::Call));
    }

    #[test]
    fn static_member_takes_variable_name() {
        let out = expr("Foo::$count");
        let member = out.code.peek().unwrap();
        assert_eq!(member.op, Opcode::Member);
        assert_eq!(member.p1, 1);
        assert_eq!(member.p3, Operand::Name("count".into()));
    }

    #[test]
    fn short_circuit_jumps_past_operator() {
        let out = expr("$a && $b");
        assert_eq!(
            out.ops(),
            vec![Opcode::Load, Opcode::Jmpz, Opcode::Load, Opcode::Land]
        );
        let jump = out.code.get(1).unwrap();
        assert_eq!(jump.p1, 1);
        assert_eq!(jump.p2, 4);
    }

    #[test]
    fn ternary_layout() {
        let out = expr("$a ? 1 : 2");
        assert_eq!(
            out.ops(),
            vec![Opcode::Load, Opcode::Jmpz, Opcode::Loadc, Opcode::Jmp, Opcode::Loadc]
        );
        assert_eq!(out.code.get(1).unwrap().p2, 4);
        assert_eq!(out.code.get(3).unwrap().p2, 5);
    }

    #[test]
    fn increments() {
        let pre = expr("++$i");
        assert_eq!(pre.code.peek().unwrap().p1, 1);
        let post = expr("$i++");
        assert_eq!(post.code.peek().unwrap().p1, 0);
    }

    #[test]
    fn compound_assignment_keeps_load() {
        let out = expr("$a += 2");
        assert_eq!(out.ops(), vec![Opcode::Loadc, Opcode::Load, Opcode::AddStore]);
    }

    #[test]
    fn parse_error_is_reported_and_empty() {
        let out = run("$a $b;", |cg| {
            let status = cg.compile_expr(ExprFlags::empty(), None).unwrap();
            assert!(status.is_empty());
            assert!(cg.stream.check(aerscript_parser::TokenKind::SEMI));
        });
        assert_eq!(out.diagnostics.len(), 1);
        assert!(out.code.is_empty());
    }

    #[test]
    fn comma_mode_stops_at_comma() {
        run("$a = 1, $b = 2;", |cg| {
            cg.compile_expr(ExprFlags::COMMA_STATEMENT, None).unwrap();
            assert!(cg.stream.check(aerscript_parser::TokenKind::COMMA));
        });
    }

    #[test]
    fn casts_map_to_conversions() {
        let out = expr("(int) $x");
        assert_eq!(out.code.peek().unwrap().op, Opcode::CvtInt);
    }
}
