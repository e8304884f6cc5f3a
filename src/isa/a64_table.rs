//! A64 指令定义表
//!
//! 每条指令的 mask/value 取自 Arm ARM 的编码表；value 同时是汇编模板。

use crate::isa::instr_def::InstrDef;
use crate::isa::opcode::{InstrFamily, Opcode};

// ========== 类型掩码常量 ==========

/// B / BL：检查 op[31] 与 [30:26]
pub const UNCOND_BRANCH_MASK: u32 = 0xFC000000;

/// B.cond：检查 [31:24] 与 o0[4]
pub const COND_BRANCH_MASK: u32 = 0xFF000010;

/// CBZ / CBNZ：检查 sf[31]、[30:25] 与 op[24]
pub const CMP_BRANCH_MASK: u32 = 0xFF000000;

/// TBZ / TBNZ：b5[31] 属于操作数，不检查
pub const TEST_BRANCH_MASK: u32 = 0x7F000000;

/// BR / BLR：只留出 Rn[9:5]
pub const REG_BRANCH_MASK: u32 = 0xFFFFFC1F;

/// 异常生成：检查 opc[23:21] 与 LL[1:0]
pub const EXP_GEN_MASK: u32 = 0xFFE0001F;

/// MRS / MSR (register)：检查 L[21] 与 op0 高位[20]
pub const SYS_REG_MASK: u32 = 0xFFF00000;

/// MSR (immediate)：op1、CRm、op2 为操作数
pub const MSR_IMM_MASK: u32 = 0xFFF8F01F;

/// ADR / ADRP：检查 op[31] 与 [28:24]
pub const PC_REL_MASK: u32 = 0x9F000000;

/// 加减立即数：检查 sf/op/S[31:29] 与 [28:23]
pub const ADD_SUB_IMM_MASK: u32 = 0xFF800000;

/// 精确匹配整个指令
pub const EXACT_MASK: u32 = 0xFFFFFFFF;

/// `ret`（即 `ret x30`）的完整编码
pub const RET_ENCODING: u32 = 0xD65F03C0;

// ========== A64 指令定义表 ==========

/// A64 指令定义表
pub static A64_INSTRS: &[InstrDef] = &[
    // ========== 无条件跳转（立即数）==========
    InstrDef::new(Opcode::B, "B", UNCOND_BRANCH_MASK, 0x14000000, InstrFamily::Branch),
    InstrDef::new(Opcode::Bl, "BL", UNCOND_BRANCH_MASK, 0x94000000, InstrFamily::Branch),

    // ========== 条件跳转 ==========
    InstrDef::new(Opcode::BCond, "B.cond", COND_BRANCH_MASK, 0x54000000, InstrFamily::Branch),

    // ========== 比较并跳转 ==========
    InstrDef::new(Opcode::Cbz32, "CBZ_32", CMP_BRANCH_MASK, 0x34000000, InstrFamily::Branch),
    InstrDef::new(Opcode::Cbnz32, "CBNZ_32", CMP_BRANCH_MASK, 0x35000000, InstrFamily::Branch),
    InstrDef::new(Opcode::Cbz64, "CBZ_64", CMP_BRANCH_MASK, 0xB4000000, InstrFamily::Branch),
    InstrDef::new(Opcode::Cbnz64, "CBNZ_64", CMP_BRANCH_MASK, 0xB5000000, InstrFamily::Branch),

    // ========== 测试位并跳转 ==========
    InstrDef::new(Opcode::Tbz, "TBZ", TEST_BRANCH_MASK, 0x36000000, InstrFamily::Branch),
    InstrDef::new(Opcode::Tbnz, "TBNZ", TEST_BRANCH_MASK, 0x37000000, InstrFamily::Branch),

    // ========== 无条件跳转（寄存器）==========
    InstrDef::new(Opcode::Br, "BR", REG_BRANCH_MASK, 0xD61F0000, InstrFamily::Branch),
    InstrDef::new(Opcode::Blr, "BLR", REG_BRANCH_MASK, 0xD63F0000, InstrFamily::Branch),
    InstrDef::new(Opcode::Ret, "RET", EXACT_MASK, RET_ENCODING, InstrFamily::Branch),

    // ========== 异常生成 ==========
    InstrDef::new(Opcode::Svc, "SVC", EXP_GEN_MASK, 0xD4000001, InstrFamily::System),
    InstrDef::new(Opcode::Hvc, "HVC", EXP_GEN_MASK, 0xD4000002, InstrFamily::System),
    InstrDef::new(Opcode::Smc, "SMC", EXP_GEN_MASK, 0xD4000003, InstrFamily::System),

    // ========== 系统寄存器 ==========
    InstrDef::new(Opcode::Mrs, "MRS", SYS_REG_MASK, 0xD5300000, InstrFamily::System),
    InstrDef::new(Opcode::MsrImm, "MSR_imm", MSR_IMM_MASK, 0xD500401F, InstrFamily::System),
    InstrDef::new(Opcode::MsrReg, "MSR_reg", SYS_REG_MASK, 0xD5100000, InstrFamily::System),

    // ========== PC 相对寻址 ==========
    InstrDef::new(Opcode::Adr, "ADR", PC_REL_MASK, 0x10000000, InstrFamily::DataProcImm),
    InstrDef::new(Opcode::Adrp, "ADRP", PC_REL_MASK, 0x90000000, InstrFamily::DataProcImm),

    // ========== 加减立即数 ==========
    InstrDef::new(Opcode::AddImm32, "ADD_32_imm", ADD_SUB_IMM_MASK, 0x11000000, InstrFamily::DataProcImm),
    InstrDef::new(Opcode::AddsImm32, "ADDS_32_imm", ADD_SUB_IMM_MASK, 0x31000000, InstrFamily::DataProcImm),
    InstrDef::new(Opcode::SubImm32, "SUB_32_imm", ADD_SUB_IMM_MASK, 0x51000000, InstrFamily::DataProcImm),
    InstrDef::new(Opcode::SubsImm32, "SUBS_32_imm", ADD_SUB_IMM_MASK, 0x71000000, InstrFamily::DataProcImm),
    InstrDef::new(Opcode::AddImm64, "ADD_64_imm", ADD_SUB_IMM_MASK, 0x91000000, InstrFamily::DataProcImm),
    InstrDef::new(Opcode::AddsImm64, "ADDS_64_imm", ADD_SUB_IMM_MASK, 0xB1000000, InstrFamily::DataProcImm),
    InstrDef::new(Opcode::SubImm64, "SUB_64_imm", ADD_SUB_IMM_MASK, 0xD1000000, InstrFamily::DataProcImm),
    InstrDef::new(Opcode::SubsImm64, "SUBS_64_imm", ADD_SUB_IMM_MASK, 0xF1000000, InstrFamily::DataProcImm),
];
