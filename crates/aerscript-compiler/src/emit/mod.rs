//! Instruction emitter with swappable containers.
//!
//! The emitter always appends to its *active* container. Function bodies,
//! default argument values, static initializers, class member initializers
//! and case guards each compile into a container of their own; the swap is
//! scoped by [`Emitter::swap`], which hands the previous container back so
//! the caller restores it on every path.
//!
//! ```ignore
//! let saved = emitter.swap(InstrList::new());
//! let result = compile_body(&mut emitter);
//! let body = emitter.swap(saved);
//! result?;
//! ```

use crate::bytecode::{InstrList, Instruction, Opcode, Operand};

#[derive(Debug, Default)]
pub struct Emitter {
    code: InstrList,
    current_line: u32,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            code: InstrList::new(),
            current_line: 1,
        }
    }

    /// Set the source line attached to subsequent instructions.
    #[inline]
    pub fn set_line(&mut self, line: u32) {
        self.current_line = line;
    }

    #[inline]
    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    // ==========================================================================
    // Emission
    // ==========================================================================

    /// Append an instruction, returning its index.
    #[inline]
    pub fn emit(&mut self, op: Opcode, p1: i32, p2: u32, p3: Operand) -> u32 {
        self.code
            .push(Instruction::new(op, p1, p2, p3, self.current_line))
    }

    /// Append an instruction with no operands.
    #[inline]
    pub fn emit_op(&mut self, op: Opcode) -> u32 {
        self.emit(op, 0, 0, Operand::None)
    }

    /// Append a jump whose target is patched later.
    #[inline]
    pub fn emit_jump(&mut self, op: Opcode, p1: i32) -> u32 {
        self.emit(op, p1, 0, Operand::None)
    }

    /// `LOADC idx`.
    #[inline]
    pub fn emit_loadc(&mut self, idx: u32) -> u32 {
        self.emit(Opcode::Loadc, 0, idx, Operand::None)
    }

    // ==========================================================================
    // Container Access
    // ==========================================================================

    /// Index the next instruction will get.
    #[inline]
    pub fn len(&self) -> u32 {
        self.code.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    #[inline]
    pub fn peek(&self) -> Option<&Instruction> {
        self.code.peek()
    }

    #[inline]
    pub fn peek_mut(&mut self) -> Option<&mut Instruction> {
        self.code.peek_mut()
    }

    #[inline]
    pub fn peek_prev(&self) -> Option<&Instruction> {
        self.code.peek_prev()
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Instruction> {
        self.code.pop()
    }

    #[inline]
    pub fn get_mut(&mut self, idx: u32) -> Option<&mut Instruction> {
        self.code.get_mut(idx)
    }

    /// Set the jump target of an already emitted instruction.
    #[inline]
    pub fn patch_target(&mut self, idx: u32, target: u32) {
        self.code.patch_target(idx, target);
    }

    /// Point the jump at `idx` to the next instruction to be emitted.
    #[inline]
    pub fn patch_here(&mut self, idx: u32) {
        let here = self.code.len();
        self.code.patch_target(idx, here);
    }

    /// The active container, for fixup passes.
    #[inline]
    pub fn code_mut(&mut self) -> &mut InstrList {
        &mut self.code
    }

    /// Install `code` as the active container and return the previous one.
    pub fn swap(&mut self, code: InstrList) -> InstrList {
        std::mem::replace(&mut self.code, code)
    }

    /// Take the active container, leaving an empty one.
    pub fn finish(&mut self) -> InstrList {
        std::mem::take(&mut self.code)
    }
}
