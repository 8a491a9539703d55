//! Compile blocks and jump fixups.
//!
//! Every nested construct (loop, conditional, switch, function body, class
//! body, try block) is tracked by a [`Block`]. Blocks live in an arena and
//! are addressed by [`BlockId`]; parents are ids, never references.
//!
//! Forward jumps whose destination is not known yet are recorded as
//! [`JumpFixup`]s on the block that owns the destination, then patched in
//! one pass once the destination is reached:
//!
//! ```text
//! while ($i < 10) {        enter LOOP, first = 0
//!     if ($i == 5) break;  JMP ?      -> fixup on the loop
//!     $i++;
//! }                        JMP 0
//!                          fix_jumps(loop, any, end)
//! ```

use bitflags::bitflags;
use tracing::trace;

use crate::bytecode::{InstrList, Opcode};

bitflags! {
    /// What a block stands for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlockKind: u16 {
        /// The root block of a compilation unit.
        const GLOBAL    = 0x001;
        /// `while`, `do`, `for`, `foreach` and `switch`.
        const LOOP      = 0x002;
        /// `if`/`elseif`/`else`.
        const COND      = 0x004;
        /// Set together with LOOP on `switch`.
        const SWITCH    = 0x008;
        /// A function, method or closure body.
        const FUNC      = 0x010;
        const CLASS     = 0x020;
        /// `try` and `catch` bodies.
        const EXCEPTION = 0x040;
        /// Control flow may not escape past this block.
        const PROTECTED = 0x080;
        /// A plain `{ ... }` block.
        const STD       = 0x100;
    }
}

/// Stable handle to a block in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

impl BlockId {
    /// The root block.
    pub const ROOT: BlockId = BlockId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Extra information attached to function and class blocks, used to fold
/// `__FUNCTION__`, `__METHOD__` and `__CLASS__`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BlockData {
    #[default]
    None,
    Function {
        name: String,
        class: Option<String>,
    },
    Class(String),
}

/// A jump whose target operand is still unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpFixup {
    /// Opcode of the jump, used to select which fixups a pass resolves.
    pub kind: Opcode,
    /// Index of the jump in the block's container.
    pub instr: u32,
    pub consumed: bool,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub kind: BlockKind,
    pub parent: Option<BlockId>,
    /// Index of the first instruction of the construct; the `continue`
    /// target of loops without post-continue semantics.
    pub first_instr: u32,
    pub data: BlockData,
    fixups: Vec<JumpFixup>,
    /// `Some` when `continue` targets are only known after the body.
    post_continue: Option<Vec<u32>>,
}

impl Block {
    fn new(kind: BlockKind, parent: Option<BlockId>, first_instr: u32, data: BlockData) -> Self {
        Self {
            kind,
            parent,
            first_instr,
            data,
            fixups: Vec::new(),
            post_continue: None,
        }
    }

    /// Whether `continue` jumps are deferred to the post-continue list.
    pub fn has_post_continue(&self) -> bool {
        self.post_continue.is_some()
    }
}

/// The block arena plus the "current block" cursor.
#[derive(Debug, Clone)]
pub struct BlockStack {
    blocks: Vec<Block>,
    current: BlockId,
}

impl Default for BlockStack {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStack {
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::new(BlockKind::GLOBAL, None, 0, BlockData::None)],
            current: BlockId::ROOT,
        }
    }

    #[inline]
    pub fn current(&self) -> BlockId {
        self.current
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    /// Push a new block as a child of the current one.
    pub fn enter(&mut self, kind: BlockKind, first_instr: u32, data: BlockData) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks
            .push(Block::new(kind, Some(self.current), first_instr, data));
        self.current = id;
        trace!(block = id.0, kind = ?kind, first_instr = first_instr, "enter block");
        id
    }

    /// Enter a loop whose `continue` jumps are resolved after the body.
    pub fn enter_post_continue(&mut self, kind: BlockKind, first_instr: u32) -> BlockId {
        let id = self.enter(kind, first_instr, BlockData::None);
        self.get_mut(id).post_continue = Some(Vec::new());
        id
    }

    /// Pop the current block and drop it from the arena. The root block is
    /// never popped.
    pub fn leave(&mut self) {
        let id = self.current;
        let Some(parent) = self.get(id).parent else {
            return;
        };
        self.current = parent;
        trace!(block = id.0, "leave block");
        // Blocks are entered and left in stack order, so the popped block is
        // the last one in the arena.
        self.blocks.truncate(id.index());
    }

    /// Find the enclosing block matching `kind`.
    ///
    /// `level` counts matches from the innermost one; a level below 2 means
    /// the first match. The walk never crosses a function or protected
    /// block, so a `break` in a function body cannot reach a loop of the
    /// caller.
    pub fn find_enclosing(&self, kind: BlockKind, level: u32) -> Option<BlockId> {
        let mut count = if level < 2 { 0 } else { level as i64 };
        let mut id = self.current;
        loop {
            let block = self.get(id);
            if block.kind.intersects(kind) {
                count -= 1;
                if count < 1 {
                    return Some(id);
                }
            }
            if block.kind.intersects(BlockKind::PROTECTED | BlockKind::FUNC) {
                return None;
            }
            id = block.parent?;
        }
    }

    /// Nearest block (current included) with any of `kind`'s bits, or the
    /// root when there is none.
    pub fn find_nearest(&self, kind: BlockKind) -> BlockId {
        let mut id = self.current;
        loop {
            let block = self.get(id);
            if block.kind.intersects(kind) {
                return id;
            }
            match block.parent {
                Some(parent) => id = parent,
                None => return id,
            }
        }
    }

    /// Data of the nearest block matching `kind`.
    pub fn nearest_data(&self, kind: BlockKind) -> Option<&BlockData> {
        let mut id = Some(self.current);
        while let Some(cur) = id {
            let block = self.get(cur);
            if block.kind.intersects(kind) {
                return Some(&block.data);
            }
            id = block.parent;
        }
        None
    }

    /// Record a jump on `block` to be patched later.
    pub fn record_fixup(&mut self, block: BlockId, kind: Opcode, instr: u32) {
        self.get_mut(block).fixups.push(JumpFixup {
            kind,
            instr,
            consumed: false,
        });
    }

    /// Record a `continue` jump to be patched once the loop's re-test point
    /// is known. Returns false when the block has no post-continue list.
    pub fn record_post_continue(&mut self, block: BlockId, instr: u32) -> bool {
        match &mut self.get_mut(block).post_continue {
            Some(list) => {
                list.push(instr);
                true
            }
            None => false,
        }
    }

    /// Patch every unconsumed fixup of `block` matching `kind` (any kind when
    /// `None`) to jump to `target`. Returns the number patched.
    pub fn fix_jumps(
        &mut self,
        block: BlockId,
        kind: Option<Opcode>,
        target: u32,
        code: &mut InstrList,
    ) -> usize {
        let mut fixed = 0;
        for fixup in &mut self.get_mut(block).fixups {
            if fixup.consumed || kind.is_some_and(|k| k != fixup.kind) {
                continue;
            }
            if code.get(fixup.instr).is_some() {
                code.patch_target(fixup.instr, target);
                fixup.consumed = true;
                fixed += 1;
            }
        }
        fixed
    }

    /// Patch the post-continue list of `block` to `target` and clear it.
    pub fn fix_post_continue(&mut self, block: BlockId, target: u32, code: &mut InstrList) -> usize {
        let Some(list) = &mut self.get_mut(block).post_continue else {
            return 0;
        };
        let fixed = list.len();
        for instr in list.drain(..) {
            code.patch_target(instr, target);
        }
        fixed
    }
}
