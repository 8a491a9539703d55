//! Bytecode types for the AerScript compiler.
//!
//! - [`Opcode`] - the VM instruction set
//! - [`Instruction`] and [`InstrList`] - emitted code and its containers
//! - [`Constant`] and [`ConstantPool`] - program-level literal storage

mod constant;
mod instr;
mod opcode;

pub use constant::{
    Constant, ConstantPool, DEFAULT_CACHE_THRESHOLD, FALSE_SLOT, NULL_SLOT, TRUE_SLOT,
};
pub use instr::{InstrList, Instruction, Operand};
pub use opcode::Opcode;
