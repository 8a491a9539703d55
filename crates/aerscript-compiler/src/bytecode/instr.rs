//! Instructions and instruction containers.

use std::fmt;

use super::Opcode;

/// The `p3` payload of an instruction.
///
/// Descriptor variants index into the tables of the owning
/// [`Program`](crate::Program).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Operand {
    #[default]
    None,
    /// A variable, attribute or member name.
    Name(String),
    /// Index into `Program::switches`.
    Switch(u32),
    /// Index into `Program::foreach`.
    Foreach(u32),
    /// Index into `Program::exceptions`.
    Exception(u32),
    /// Index into `Program::class_links`.
    ClassLink(u32),
    /// Index into `Program::closures`.
    Closure(u32),
}

impl Operand {
    pub fn is_none(&self) -> bool {
        matches!(self, Operand::None)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Name(name) => write!(f, "${name}"),
            Operand::Switch(id) => write!(f, "switch#{id}"),
            Operand::Foreach(id) => write!(f, "foreach#{id}"),
            Operand::Exception(id) => write!(f, "exception#{id}"),
            Operand::ClassLink(id) => write!(f, "class#{id}"),
            Operand::Closure(id) => write!(f, "closure#{id}"),
        }
    }
}

/// One VM instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub p1: i32,
    pub p2: u32,
    pub p3: Operand,
    /// Source line, for run-time error messages.
    pub line: u32,
}

impl Instruction {
    pub fn new(op: Opcode, p1: i32, p2: u32, p3: Operand, line: u32) -> Self {
        Self { op, p1, p2, p3, line }
    }
}

/// An append-only list of instructions.
///
/// Besides appending, the code generator may peek at or pop the most recent
/// instruction (store and call rewriting) and patch `p2` of any earlier one
/// (jump fixups). Nothing is ever reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrList {
    instrs: Vec<Instruction>,
}

impl InstrList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and return the new instruction's index.
    #[inline]
    pub fn push(&mut self, instr: Instruction) -> u32 {
        let idx = self.instrs.len() as u32;
        self.instrs.push(instr);
        idx
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.instrs.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    #[inline]
    pub fn peek(&self) -> Option<&Instruction> {
        self.instrs.last()
    }

    #[inline]
    pub fn peek_mut(&mut self) -> Option<&mut Instruction> {
        self.instrs.last_mut()
    }

    /// The instruction before the most recent one.
    #[inline]
    pub fn peek_prev(&self) -> Option<&Instruction> {
        self.instrs.len().checked_sub(2).map(|i| &self.instrs[i])
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Instruction> {
        self.instrs.pop()
    }

    #[inline]
    pub fn get(&self, idx: u32) -> Option<&Instruction> {
        self.instrs.get(idx as usize)
    }

    #[inline]
    pub fn get_mut(&mut self, idx: u32) -> Option<&mut Instruction> {
        self.instrs.get_mut(idx as usize)
    }

    /// Set the jump target of instruction `idx`.
    #[inline]
    pub fn patch_target(&mut self, idx: u32, target: u32) {
        if let Some(instr) = self.instrs.get_mut(idx as usize) {
            instr.p2 = target;
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instrs.iter()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.instrs
    }
}

impl<'a> IntoIterator for &'a InstrList {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instrs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instr(op: Opcode) -> Instruction {
        Instruction::new(op, 0, 0, Operand::None, 1)
    }

    #[test]
    fn push_returns_index() {
        let mut list = InstrList::new();
        assert_eq!(list.push(instr(Opcode::Loadc)), 0);
        assert_eq!(list.push(instr(Opcode::Jmp)), 1);
        assert_eq!(list.len(), 2);
        assert_eq!(list.peek_prev().map(|i| i.op), Some(Opcode::Loadc));
    }

    #[test]
    fn patch_target_sets_p2() {
        let mut list = InstrList::new();
        let jmp = list.push(instr(Opcode::Jmpz));
        list.push(instr(Opcode::Pop));
        list.patch_target(jmp, 2);
        assert_eq!(list.get(jmp).unwrap().p2, 2);
        // Out of range is ignored.
        list.patch_target(10, 5);
    }

    #[test]
    fn operand_display() {
        assert_eq!(Operand::Name("x".into()).to_string(), "$x");
        assert_eq!(Operand::Switch(3).to_string(), "switch#3");
        assert_eq!(Operand::None.to_string(), "");
    }
}
