//! A64 指令编解码
//!
//! 本模块提供表驱动的指令编解码：
//! - `InstrDef` / `OpcodeTable`: 统一的指令定义，同时用于解码、汇编模板和冲突检测
//! - `Decoder`: 查表解码与按 op0 分派的快速解码
//! - `Instruction`: 指令的语义表示，可修改后重新编码
//! - `OffsetCodec`: 带对齐移位的有符号偏移字段

mod a64_table;
mod add_sub_imm;
mod branch;
mod decoder;
mod error;
mod exp_gen;
mod fields;
mod instr;
mod instr_def;
mod offset;
mod opcode;
mod pc_rel;
mod register;
mod system;

pub use a64_table::{A64_INSTRS, RET_ENCODING};
pub use add_sub_imm::AddSubImm;
pub use branch::Branch;
pub use decoder::Decoder;
pub use error::{CodecError, CodecResult};
pub use exp_gen::ExceptionGen;
pub use fields::*;
pub use instr::{FieldCodec, InstrKind, Instruction, KindTag, Source};
pub use instr_def::{ConflictInfo, InstrDef, OpcodeTable};
pub use offset::{
    COND_BRANCH, OffsetCodec, PAGE_REL, PAGE_SHIFT, PAGE_SIZE, PC_REL, TEST_BRANCH,
    UNCOND_BRANCH, round_down,
};
pub use opcode::{InstrFamily, Opcode};
pub use pc_rel::PcRelAddr;
pub use register::{
    Condition, ExceptionLevel, GeneralRegister, Operand, OperandKind, RegWidth, SystemRegister,
};
pub use system::SystemInstr;

/// 便捷函数：用标准 A64 指令表快速解码一条指令
///
/// 需要反复解码时应自行持有 `OpcodeTable` 并构造 `Decoder`。
pub fn decode(raw: u32) -> Instruction {
    let table = OpcodeTable::a64();
    Decoder::new(&table).fast_decode(raw)
}

#[cfg(test)]
mod tests;
