//! Bytecode operation codes.
//!
//! Every instruction carries three operands besides its opcode: `p1` is a
//! signed integer, `p2` an unsigned integer (most often a jump target or an
//! argument count) and `p3` an [`Operand`](super::Operand) payload.

use std::fmt;

/// Instruction set of the AerScript virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // =========================================================================
    // Program Flow
    // =========================================================================
    /// Return from the current frame. `p1 != 0` when a value is on the stack.
    Done = 1,
    /// Stop the whole program. `p1 != 0` when an exit status is on the stack.
    Halt,
    /// Unconditional jump to `p2`.
    Jmp,
    /// Pop and jump to `p2` when false. `p1 != 0` keeps the value on the stack.
    Jmpz,
    /// Pop and jump to `p2` when true. `p1 != 0` keeps the value on the stack.
    Jmpnz,
    /// No operation.
    Noop,
    /// Discard the top `p1` stack entries.
    Pop,
    /// Send the top of the stack to the output consumer.
    Consume,

    // =========================================================================
    // Loads and Stores
    // =========================================================================
    /// Declare a variable named `p3` of type code `p2`.
    Declare,
    /// Push the variable named `p3`, or the one named by the popped value.
    /// `p1 != 0` means the load is read-only.
    Load,
    /// Push constant `p2`. `p1 != 0` marks an unresolved name to look up.
    Loadc,
    /// Index the value below the top with the top (`p1 != 0`), or append
    /// (`p1 == 0`). `p2 != 0` when the entry is about to be stored.
    LoadIdx,
    /// Build an array from `p1` stacked entries (key/value pairs).
    LoadMap,
    /// Destructure into `p1` stacked targets.
    LoadList,
    /// Instantiate the closure descriptor in `p3`.
    LoadClosure,
    /// Take a reference to the operand.
    LoadRef,
    /// Store the top of the stack into the variable named `p3`.
    Store,
    /// Store into an array entry. `p1 != 0` when a key is on the stack.
    StoreIdx,
    /// Store into an array entry by reference.
    StoreIdxRef,

    // =========================================================================
    // Calls and Objects
    // =========================================================================
    /// Call the callee on the stack with `p1` arguments.
    Call,
    /// Instantiate a class. `p1` is the constructor argument count.
    New,
    /// Clone the object on the stack.
    Clone,
    /// Access a class member. `p1 != 0` for static access (`::`), `p2 != 0`
    /// when the member is about to be called or stored.
    Member,
    /// Class type check (`is`).
    Is,

    // =========================================================================
    // Casts
    // =========================================================================
    CvtInt,
    CvtReal,
    CvtStr,
    CvtBool,
    CvtChar,
    CvtObj,
    CvtCall,
    CvtRes,
    CvtVoid,

    // =========================================================================
    // Arithmetic and Logic
    // =========================================================================
    Uminus,
    Uplus,
    Bitnot,
    Lnot,
    Mul,
    Div,
    Mod,
    /// Addition, or string concatenation of `p1` entries when `p2 != 0`.
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Neq,
    Band,
    Bxor,
    Bor,
    Land,
    Lor,
    Lxor,
    /// Null coalescing (`??`).
    Nullc,
    /// Increment. `p1 != 0` for the prefix form.
    Incr,
    /// Decrement. `p1 != 0` for the prefix form.
    Decr,

    // =========================================================================
    // Compound Assignment
    // =========================================================================
    AddStore,
    SubStore,
    MulStore,
    DivStore,
    ModStore,
    ShlStore,
    ShrStore,
    BandStore,
    BorStore,
    BxorStore,

    // =========================================================================
    // Structured Constructs
    // =========================================================================
    /// Link the class in `p3` to its base class (`p1`) and interfaces (`p2`).
    ClassInit,
    /// Link the interface in `p3` to its base interfaces.
    InterfaceInit,
    /// Start iterating. Jumps to `p2` when the source is empty.
    ForeachInit,
    /// Advance the iterator. Jumps to `p2` when exhausted.
    ForeachStep,
    /// Install the exception handler in `p3`; `p2` is the fall-through exit.
    LoadException,
    /// Remove the innermost exception handler.
    PopException,
    /// Throw the object on the stack; `p2` is the unwind target.
    Throw,
    /// Dispatch on the switch table in `p3`.
    Switch,
}

impl Opcode {
    /// Mnemonic used by the disassembler.
    pub fn as_str(self) -> &'static str {
        use Opcode::*;
        match self {
            Done => "DONE",
            Halt => "HALT",
            Jmp => "JMP",
            Jmpz => "JMPZ",
            Jmpnz => "JMPNZ",
            Noop => "NOOP",
            Pop => "POP",
            Consume => "CONSUME",
            Declare => "DECLARE",
            Load => "LOAD",
            Loadc => "LOADC",
            LoadIdx => "LOAD_IDX",
            LoadMap => "LOAD_MAP",
            LoadList => "LOAD_LIST",
            LoadClosure => "LOAD_CLOSURE",
            LoadRef => "LOAD_REF",
            Store => "STORE",
            StoreIdx => "STORE_IDX",
            StoreIdxRef => "STORE_IDX_REF",
            Call => "CALL",
            New => "NEW",
            Clone => "CLONE",
            Member => "MEMBER",
            Is => "IS",
            CvtInt => "CVT_INT",
            CvtReal => "CVT_REAL",
            CvtStr => "CVT_STR",
            CvtBool => "CVT_BOOL",
            CvtChar => "CVT_CHAR",
            CvtObj => "CVT_OBJ",
            CvtCall => "CVT_CALL",
            CvtRes => "CVT_RES",
            CvtVoid => "CVT_VOID",
            Uminus => "UMINUS",
            Uplus => "UPLUS",
            Bitnot => "BITNOT",
            Lnot => "LNOT",
            Mul => "MUL",
            Div => "DIV",
            Mod => "MOD",
            Add => "ADD",
            Sub => "SUB",
            Shl => "SHL",
            Shr => "SHR",
            Lt => "LT",
            Le => "LE",
            Gt => "GT",
            Ge => "GE",
            Eq => "EQ",
            Neq => "NEQ",
            Band => "BAND",
            Bxor => "BXOR",
            Bor => "BOR",
            Land => "LAND",
            Lor => "LOR",
            Lxor => "LXOR",
            Nullc => "NULLC",
            Incr => "INCR",
            Decr => "DECR",
            AddStore => "ADD_STORE",
            SubStore => "SUB_STORE",
            MulStore => "MUL_STORE",
            DivStore => "DIV_STORE",
            ModStore => "MOD_STORE",
            ShlStore => "SHL_STORE",
            ShrStore => "SHR_STORE",
            BandStore => "BAND_STORE",
            BorStore => "BOR_STORE",
            BxorStore => "BXOR_STORE",
            ClassInit => "CLASS_INIT",
            InterfaceInit => "INTERFACE_INIT",
            ForeachInit => "FOREACH_INIT",
            ForeachStep => "FOREACH_STEP",
            LoadException => "LOAD_EXCEPTION",
            PopException => "POP_EXCEPTION",
            Throw => "THROW",
            Switch => "SWITCH",
        }
    }

    /// Whether `p2` of this opcode is a jump target patched by fixups.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Jmp
                | Opcode::Jmpz
                | Opcode::Jmpnz
                | Opcode::ForeachInit
                | Opcode::ForeachStep
                | Opcode::LoadException
                | Opcode::Throw
        )
    }

    /// Assignment opcodes, whose target is loaded for a store.
    pub fn is_store(self) -> bool {
        matches!(
            self,
            Opcode::Store
                | Opcode::AddStore
                | Opcode::SubStore
                | Opcode::MulStore
                | Opcode::DivStore
                | Opcode::ModStore
                | Opcode::ShlStore
                | Opcode::ShrStore
                | Opcode::BandStore
                | Opcode::BorStore
                | Opcode::BxorStore
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
