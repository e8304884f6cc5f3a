//! 分支指令族
//!
//! B / BL / B.cond / CBZ / CBNZ / TBZ / TBNZ / BR / BLR / RET

use std::fmt;

use super::error::{CodecError, CodecResult};
use super::fields::{
    CmpBranchFields, CondBranchFields, RegBranchFields, TestBranchFields, UncondBranchFields,
};
use super::instr::{FieldCodec, fmt_imm};
use super::offset::{COND_BRANCH, TEST_BRANCH, UNCOND_BRANCH};
use super::opcode::Opcode;
use super::register::{Condition, GeneralRegister, RegWidth};

/// 分支指令的语义字段
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Branch {
    /// 条件码，只对 B.cond 有意义；`Al` 表示无条件
    cond: Condition,
    /// 目标是否为绝对地址
    is_abs: bool,
    /// 绝对目标地址
    target: u64,
    /// 相对当前指令的字节偏移
    offset: i64,
    /// 是否写链接寄存器
    link: bool,
    /// 比较 / 测试的寄存器
    rt: Option<GeneralRegister>,
    /// 跳转目标寄存器
    rn: Option<GeneralRegister>,
    /// TBZ / TBNZ 测试的位号
    test_bit: u8,
}

impl Branch {
    pub fn cond(&self) -> Condition {
        self.cond
    }

    pub fn set_cond(&mut self, cond: Condition) {
        self.cond = cond;
    }

    pub fn has_cond(&self) -> bool {
        self.cond != Condition::Al
    }

    pub fn is_abs(&self) -> bool {
        self.is_abs
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// 设置相对偏移，同时清除绝对目标
    pub fn set_offset(&mut self, offset: i64) {
        self.is_abs = false;
        self.offset = offset;
    }

    /// 设置绝对目标；汇编前需要 `rebase`
    pub fn set_target(&mut self, target: u64) {
        self.is_abs = true;
        self.target = target;
    }

    /// 跳转目标：绝对目标，或 `pc + offset`
    pub fn target(&self, pc: u64) -> u64 {
        if self.is_abs {
            self.target
        } else {
            pc.wrapping_add_signed(self.offset)
        }
    }

    /// 绝对目标换算为相对 `pc` 的偏移；已是相对偏移时不变
    pub fn rebase(&mut self, pc: u64) {
        if self.is_abs {
            self.offset = self.target.wrapping_sub(pc) as i64;
            self.is_abs = false;
        }
    }

    /// 指令从 `old_pc` 移到 `new_pc`，保持跳转目标不变
    pub fn relocate(&mut self, old_pc: u64, new_pc: u64) {
        self.set_target(self.target(old_pc));
        self.rebase(new_pc);
    }

    pub fn is_link(&self) -> bool {
        self.link
    }

    pub fn set_link(&mut self, link: bool) {
        self.link = link;
    }

    pub fn rt(&self) -> Option<GeneralRegister> {
        self.rt
    }

    pub fn set_rt(&mut self, rt: GeneralRegister) {
        self.rt = Some(rt);
    }

    pub fn rn(&self) -> Option<GeneralRegister> {
        self.rn
    }

    pub fn set_rn(&mut self, rn: GeneralRegister) {
        self.rn = Some(rn);
    }

    pub fn test_bit(&self) -> u8 {
        self.test_bit
    }

    pub fn set_test_bit(&mut self, bit: u8) {
        self.test_bit = bit;
    }

    // ========== 共享的字段解码 ==========

    fn decode_uncond(&mut self, raw: u32) {
        let fields = UncondBranchFields(raw);
        self.set_offset(UNCOND_BRANCH.decode(fields.imm26()));
    }

    fn decode_reg_target(&mut self, raw: u32) {
        let fields = RegBranchFields(raw);
        self.rn = Some(GeneralRegister::x(fields.rn()));
    }

    fn relative_offset(&self) -> CodecResult<i64> {
        if self.is_abs {
            return Err(CodecError::UnresolvedTarget {
                target: self.target,
            });
        }
        Ok(self.offset)
    }

    fn require_rt(&self, opcode: Opcode, width: RegWidth) -> CodecResult<u8> {
        let rt = self
            .rt
            .ok_or(CodecError::UnsupportedAssembly { opcode })?;
        rt.expect_width("rt", width)
    }

    pub(crate) fn fmt_asm(&self, opcode: Opcode, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = if self.is_abs {
            format!("{:#x}", self.target)
        } else {
            fmt_imm(self.offset)
        };
        match opcode {
            Opcode::BCond => write!(f, "b.{} {}", self.cond, target),
            Opcode::B | Opcode::Bl => write!(f, "{} {}", opcode.mnemonic(), target),
            Opcode::Cbz32 | Opcode::Cbnz32 | Opcode::Cbz64 | Opcode::Cbnz64 => {
                let rt = self.rt.map(|r| r.to_string()).unwrap_or_default();
                write!(f, "{} {}, {}", opcode.mnemonic(), rt, target)
            }
            Opcode::Tbz | Opcode::Tbnz => {
                let rt = self.rt.map(|r| r.to_string()).unwrap_or_default();
                write!(f, "{} {}, #{}, {}", opcode.mnemonic(), rt, self.test_bit, target)
            }
            Opcode::Br | Opcode::Blr => {
                let rn = self.rn.map(|r| r.to_string()).unwrap_or_default();
                write!(f, "{} {}", opcode.mnemonic(), rn)
            }
            _ => write!(f, "{}", opcode.mnemonic()),
        }
    }
}

impl FieldCodec for Branch {
    fn handles(opcode: Opcode) -> bool {
        matches!(
            opcode,
            Opcode::B
                | Opcode::Bl
                | Opcode::BCond
                | Opcode::Cbz32
                | Opcode::Cbnz32
                | Opcode::Cbz64
                | Opcode::Cbnz64
                | Opcode::Tbz
                | Opcode::Tbnz
                | Opcode::Br
                | Opcode::Blr
                | Opcode::Ret
        )
    }

    fn decode_fields(&mut self, opcode: Opcode, raw: u32) -> CodecResult<()> {
        match opcode {
            Opcode::BCond => {
                let fields = CondBranchFields(raw);
                self.cond = Condition::from_bits(fields.cond());
                self.set_offset(COND_BRANCH.decode(fields.imm19()));
            }
            Opcode::Bl => {
                self.link = true;
                self.decode_uncond(raw);
            }
            Opcode::B => self.decode_uncond(raw),
            Opcode::Ret => {}
            Opcode::Cbz32 | Opcode::Cbnz32 | Opcode::Cbz64 | Opcode::Cbnz64 => {
                let fields = CmpBranchFields(raw);
                self.set_offset(COND_BRANCH.decode(fields.imm19()));
                self.rt = Some(GeneralRegister::with_width(
                    fields.rt(),
                    RegWidth::from_sf(fields.sf()),
                ));
            }
            Opcode::Tbz | Opcode::Tbnz => {
                let fields = TestBranchFields(raw);
                self.set_offset(TEST_BRANCH.decode(fields.imm14()));
                self.test_bit = ((fields.b5() as u8) << 5) | fields.b40();
                self.rt = Some(GeneralRegister::with_width(
                    fields.rt(),
                    RegWidth::from_sf(fields.b5()),
                ));
            }
            Opcode::Blr => {
                self.link = true;
                self.decode_reg_target(raw);
            }
            Opcode::Br => self.decode_reg_target(raw),
            _ => {
                return Err(CodecError::FamilyMismatch {
                    opcode,
                    kind: super::instr::KindTag::Branch,
                });
            }
        }
        Ok(())
    }

    /// 链接标志在 B / BL、BR / BLR 之间选择
    fn encode_opcode(&self, decoded: Opcode) -> Opcode {
        match (decoded, self.link) {
            (Opcode::B | Opcode::Bl, false) => Opcode::B,
            (Opcode::B | Opcode::Bl, true) => Opcode::Bl,
            (Opcode::Br | Opcode::Blr, false) => Opcode::Br,
            (Opcode::Br | Opcode::Blr, true) => Opcode::Blr,
            _ => decoded,
        }
    }

    fn encode_fields(&self, opcode: Opcode, template: u32) -> CodecResult<u32> {
        // 只有 BL / BLR 能链接，只有 B.cond 能带条件
        if self.link && !matches!(opcode, Opcode::Bl | Opcode::Blr) {
            return Err(CodecError::UnsupportedAssembly { opcode });
        }
        if self.has_cond() && opcode != Opcode::BCond {
            return Err(CodecError::UnsupportedAssembly { opcode });
        }
        let word = match opcode {
            Opcode::BCond => {
                let mut fields = CondBranchFields(template);
                fields.set_cond(self.cond.bits());
                fields.set_imm19(COND_BRANCH.encode(self.relative_offset()?)?);
                fields.0
            }
            Opcode::Bl | Opcode::B => {
                let mut fields = UncondBranchFields(template);
                fields.set_imm26(UNCOND_BRANCH.encode(self.relative_offset()?)?);
                fields.0
            }
            Opcode::Ret => template,
            Opcode::Cbz32 | Opcode::Cbnz32 | Opcode::Cbz64 | Opcode::Cbnz64 => {
                let width = RegWidth::from_sf(matches!(opcode, Opcode::Cbz64 | Opcode::Cbnz64));
                let mut fields = CmpBranchFields(template);
                fields.set_rt(self.require_rt(opcode, width)?);
                fields.set_imm19(COND_BRANCH.encode(self.relative_offset()?)?);
                fields.0
            }
            Opcode::Tbz | Opcode::Tbnz => {
                if self.test_bit > 63 {
                    return Err(CodecError::FieldOverflow {
                        field: "b5:b40",
                        value: self.test_bit as i64,
                        bits: 6,
                    });
                }
                let b5 = self.test_bit >= 32;
                let mut fields = TestBranchFields(template);
                fields.set_rt(self.require_rt(opcode, RegWidth::from_sf(b5))?);
                fields.set_b5(b5);
                fields.set_b40(self.test_bit & 0x1F);
                fields.set_imm14(TEST_BRANCH.encode(self.relative_offset()?)?);
                fields.0
            }
            Opcode::Blr | Opcode::Br => {
                let rn = self
                    .rn
                    .ok_or(CodecError::UnsupportedAssembly { opcode })?;
                let mut fields = RegBranchFields(template);
                fields.set_rn(rn.expect_width("rn", RegWidth::X)?);
                fields.0
            }
            _ => return Err(CodecError::UnsupportedAssembly { opcode }),
        };
        Ok(word)
    }
}
