//! 加减立即数：ADD / ADDS / SUB / SUBS (immediate)
//!
//! 8 个 opcode 由 sf / op / S 三个标志位组合而成。解码后修改标志位，
//! 重新编码时会选中对应的 opcode。

use std::fmt;

use super::error::{CodecError, CodecResult};
use super::fields::AddSubImmFields;
use super::instr::{FieldCodec, KindTag, fmt_imm};
use super::opcode::Opcode;
use super::register::{GeneralRegister, Operand, RegWidth};

/// `imm12` 可表示的值个数
const IMM12_LIMIT: i64 = 1 << 12;
/// `sh = 1` 时立即数左移的位数
const IMM_SHIFT: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddSubImm {
    is_sub: bool,
    is_64bit: bool,
    update_flags: bool,
    /// 立即数是否左移 12 位
    shift: bool,
    rd: GeneralRegister,
    /// 寄存器部分为 Rn，立即数部分为移位后的值
    operand: Operand,
}

impl Default for AddSubImm {
    fn default() -> Self {
        Self {
            is_sub: false,
            is_64bit: true,
            update_flags: false,
            shift: false,
            rd: GeneralRegister::x(0),
            operand: Operand::default(),
        }
    }
}

impl AddSubImm {
    pub fn is_sub(&self) -> bool {
        self.is_sub
    }

    pub fn set_sub(&mut self, is_sub: bool) {
        self.is_sub = is_sub;
    }

    pub fn is_64bit(&self) -> bool {
        self.is_64bit
    }

    /// 切换位宽，Rd / Rn 同步换位宽
    pub fn set_64bit(&mut self, is_64bit: bool) {
        self.is_64bit = is_64bit;
        let width = self.width();
        self.rd = self.rd.retag(width);
        self.operand.reg = self.operand.reg.retag(width);
    }

    pub fn update_flags(&self) -> bool {
        self.update_flags
    }

    pub fn set_update_flags(&mut self, update_flags: bool) {
        self.update_flags = update_flags;
    }

    pub fn is_shifted(&self) -> bool {
        self.shift
    }

    pub fn set_shifted(&mut self, shift: bool) {
        self.shift = shift;
    }

    pub fn rd(&self) -> GeneralRegister {
        self.rd
    }

    pub fn set_rd(&mut self, rd: GeneralRegister) {
        self.rd = rd;
    }

    pub fn rn(&self) -> GeneralRegister {
        self.operand.reg
    }

    pub fn set_rn(&mut self, rn: GeneralRegister) {
        self.operand.reg = rn;
    }

    /// 移位后的立即数
    pub fn imm(&self) -> i64 {
        self.operand.shift_extend_imm
    }

    pub fn set_imm(&mut self, imm: i64) {
        self.operand.shift_extend_imm = imm;
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    pub fn width(&self) -> RegWidth {
        RegWidth::from_sf(self.is_64bit)
    }

    /// 当前标志位对应的 opcode
    pub fn opcode(&self) -> Opcode {
        Opcode::add_sub_imm(self.is_64bit, self.is_sub, self.update_flags)
    }

    fn pack_imm12(&self) -> CodecResult<u16> {
        let imm = self.operand.shift_extend_imm;
        let overflow = |bits| CodecError::FieldOverflow {
            field: "imm12",
            value: imm,
            bits,
        };
        if imm < 0 {
            return Err(overflow(if self.shift { 24 } else { 12 }));
        }
        if self.shift {
            if imm & (IMM12_LIMIT - 1) != 0 {
                return Err(CodecError::Misaligned {
                    field: "imm12",
                    value: imm,
                    align: IMM12_LIMIT as u64,
                });
            }
            let scaled = imm >> IMM_SHIFT;
            if scaled >= IMM12_LIMIT {
                return Err(overflow(24));
            }
            Ok(scaled as u16)
        } else {
            if imm >= IMM12_LIMIT {
                return Err(overflow(12));
            }
            Ok(imm as u16)
        }
    }

    pub(crate) fn fmt_asm(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ADDS / SUBS 的 Rd 为 31 时是零寄存器
        let rd = if self.update_flags {
            self.rd.to_string()
        } else {
            self.rd.name_sp()
        };
        write!(
            f,
            "{} {}, {}, {}",
            self.opcode().mnemonic(),
            rd,
            self.operand.reg.name_sp(),
            fmt_imm(self.imm())
        )
    }
}

impl FieldCodec for AddSubImm {
    fn handles(opcode: Opcode) -> bool {
        matches!(
            opcode,
            Opcode::AddImm32
                | Opcode::AddsImm32
                | Opcode::SubImm32
                | Opcode::SubsImm32
                | Opcode::AddImm64
                | Opcode::AddsImm64
                | Opcode::SubImm64
                | Opcode::SubsImm64
        )
    }

    fn decode_fields(&mut self, opcode: Opcode, raw: u32) -> CodecResult<()> {
        if !Self::handles(opcode) {
            return Err(CodecError::FamilyMismatch {
                opcode,
                kind: KindTag::AddSubImm,
            });
        }
        let fields = AddSubImmFields(raw);
        self.is_64bit = fields.sf();
        self.is_sub = fields.op();
        self.update_flags = fields.s();
        self.shift = fields.sh();

        let width = self.width();
        let shift = if self.shift { IMM_SHIFT } else { 0 };
        self.rd = GeneralRegister::with_width(fields.rd(), width);
        self.operand = Operand::immediate(
            GeneralRegister::with_width(fields.rn(), width),
            (fields.imm12() as i64) << shift,
        );
        Ok(())
    }

    fn encode_opcode(&self, _decoded: Opcode) -> Opcode {
        self.opcode()
    }

    fn encode_fields(&self, _opcode: Opcode, template: u32) -> CodecResult<u32> {
        let width = self.width();
        let rd = self.rd.expect_width("rd", width)?;
        let rn = self.operand.reg.expect_width("rn", width)?;
        let imm12 = self.pack_imm12()?;

        let mut fields = AddSubImmFields(template);
        fields.set_sf(self.is_64bit);
        fields.set_op(self.is_sub);
        fields.set_s(self.update_flags);
        fields.set_sh(self.shift);
        fields.set_imm12(imm12);
        fields.set_rn(rn);
        fields.set_rd(rd);
        Ok(fields.0)
    }
}
